//! Extractor: turns an uploaded resume (PDF, DOCX or plain text) into normalized text.
//!
//! Parsing is CPU-bound and runs inside `tokio::task::spawn_blocking`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::ingest::docx::extract_docx_text;

/// The PDF header may be preceded by junk within the first KiB.
const PDF_HEADER_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("uploaded document is empty")]
    Empty,

    #[error("uploaded document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("extraction task failed: {0}")]
    Task(String),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Empty => AppError::Validation(err.to_string()),
            ExtractError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ExtractError::Unsupported(_) => AppError::UnsupportedMediaType(err.to_string()),
            ExtractError::Malformed(_) | ExtractError::InvalidEncoding | ExtractError::NoText => {
                AppError::UnprocessableEntity(err.to_string())
            }
            ExtractError::Task(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::PlainText => "plain_text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::PlainText => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::PlainText => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub text: String,
    pub char_count: usize,
    pub line_count: usize,
}

/// `%PDF-<digit>` at offset 0 or after whitespace within the header window.
fn has_pdf_header(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    head.windows(6).enumerate().any(|(i, w)| {
        w.starts_with(b"%PDF-")
            && w[5].is_ascii_digit()
            && (i == 0 || head[i - 1].is_ascii_whitespace())
    })
}

/// Identifies the document format. Magic bytes take precedence over the
/// client-supplied file name and content type.
pub fn detect_kind(
    bytes: &[u8],
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<DocumentKind, ExtractError> {
    if has_pdf_header(bytes) {
        return Ok(DocumentKind::Pdf);
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return Ok(DocumentKind::Docx);
    }

    let ext = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, e)| e.to_ascii_lowercase());
    let mime = content_type.map(|c| {
        c.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    });

    match (ext.as_deref(), mime.as_deref()) {
        (Some("txt" | "text" | "md"), _) | (_, Some("text/plain" | "text/markdown")) => {
            Ok(DocumentKind::PlainText)
        }
        (Some("pdf"), _) | (_, Some("application/pdf")) => Err(ExtractError::Malformed(
            "file is labelled as PDF but has no PDF header".to_string(),
        )),
        (Some("docx"), _) => Err(ExtractError::Malformed(
            "file is labelled as DOCX but is not a ZIP archive".to_string(),
        )),
        (Some("doc"), _) | (_, Some("application/msword")) => Err(ExtractError::Unsupported(
            "legacy .doc files are not supported, save as .docx or PDF".to_string(),
        )),
        (ext, mime) => Err(ExtractError::Unsupported(
            ext.or(mime).unwrap_or("unknown").to_string(),
        )),
    }
}

/// Extracts and normalizes text for an already-detected document kind.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<ExtractedDocument, ExtractError> {
    let raw = match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes)?,
        DocumentKind::Docx => extract_docx_text(bytes)?,
        DocumentKind::PlainText => decode_plain_text(bytes)?,
    };

    let text = normalize_text(&raw);
    if text.is_empty() {
        return Err(ExtractError::NoText);
    }

    debug!(
        "Extracted {} chars from {} document",
        text.len(),
        kind.as_str()
    );

    Ok(ExtractedDocument {
        kind,
        char_count: text.chars().count(),
        line_count: text.lines().count(),
        text,
    })
}

/// Size-checks, detects and extracts an upload off the async reactor.
pub async fn extract_document(
    bytes: Bytes,
    file_name: Option<String>,
    content_type: Option<String>,
    max_bytes: usize,
) -> Result<ExtractedDocument, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    tokio::task::spawn_blocking(move || {
        let kind = detect_kind(&bytes, file_name.as_deref(), content_type.as_deref())?;
        extract_text(&bytes, kind)
    })
    .await
    .map_err(|e| ExtractError::Task(e.to_string()))?
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Malformed(format!("unreadable PDF: {e}"))),
        Err(_) => {
            warn!("PDF parser panicked on uploaded document");
            Err(ExtractError::Malformed(
                "PDF could not be parsed".to_string(),
            ))
        }
    }
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ExtractError::InvalidEncoding)
}

/// Normalizes extracted text:
/// - CRLF, CR and form feeds become LF
/// - ligatures are expanded, non-breaking and exotic spaces become plain spaces
/// - control and zero-width characters are dropped
/// - whitespace runs inside a line collapse to one space, lines are trimmed
/// - runs of blank lines collapse to a single blank line
pub fn normalize_text(raw: &str) -> String {
    let unified = raw
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_blank = false;
    for line in unified.split('\n') {
        let cleaned = clean_line(line);
        if cleaned.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(&cleaned);
    }
    out
}

fn clean_line(line: &str) -> String {
    let mut s = String::with_capacity(line.len());
    let mut pending_space = false;
    for c in line.chars() {
        match c {
            '\u{FB00}' => push_word(&mut s, &mut pending_space, "ff"),
            '\u{FB01}' => push_word(&mut s, &mut pending_space, "fi"),
            '\u{FB02}' => push_word(&mut s, &mut pending_space, "fl"),
            '\u{FB03}' => push_word(&mut s, &mut pending_space, "ffi"),
            '\u{FB04}' => push_word(&mut s, &mut pending_space, "ffl"),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            c if c.is_whitespace() => pending_space = true,
            c if c.is_control() => {}
            c => {
                let mut buf = [0u8; 4];
                push_word(&mut s, &mut pending_space, c.encode_utf8(&mut buf));
            }
        }
    }
    s
}

fn push_word(s: &mut String, pending_space: &mut bool, piece: &str) {
    if *pending_space && !s.is_empty() {
        s.push(' ');
    }
    *pending_space = false;
    s.push_str(piece);
}
