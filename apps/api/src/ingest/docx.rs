//! DOCX text extraction.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml` as
//! WordprocessingML. Only the text-bearing elements are interpreted.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::ingest::extract::ExtractError;

const DOCUMENT_XML: &str = "word/document.xml";
/// Upper bound on the decompressed body, guards against zip bombs.
const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

/// Extracts the body text of a DOCX archive, one paragraph per line.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Malformed(format!("not a valid DOCX archive: {e}")))?;

    let file = archive.by_name(DOCUMENT_XML).map_err(|_| {
        ExtractError::Malformed(format!("DOCX archive has no {DOCUMENT_XML}"))
    })?;

    if file.size() > MAX_DOCUMENT_XML_BYTES {
        return Err(ExtractError::Malformed(
            "DOCX body exceeds the decompressed size limit".to_string(),
        ));
    }

    let mut xml = String::new();
    file.take(MAX_DOCUMENT_XML_BYTES)
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Malformed(format!("failed to read {DOCUMENT_XML}: {e}")))?;

    Ok(document_xml_to_text(&xml))
}

/// Converts WordprocessingML to plain text.
///
/// - `<w:t>` content is emitted (entities decoded)
/// - `</w:p>` and `<w:p/>` end a line
/// - `<w:br/>` / `<w:cr/>` emit a newline, `<w:tab/>` a tab
/// - tab stops declared inside `<w:pPr>` are ignored
pub fn document_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    let mut in_text = false;
    let mut in_props = false;
    let mut rest = xml;

    while let Some(lt) = rest.find('<') {
        if in_text {
            out.push_str(&decode_entities(&rest[..lt]));
        }
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            break;
        };
        let tag = &after[..gt];
        rest = &after[gt + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");

        match name {
            "w:t" if closing => in_text = false,
            "w:t" if !self_closing => in_text = true,
            "w:pPr" if closing => in_props = false,
            "w:pPr" if !self_closing => in_props = true,
            "w:tab" if !closing && !in_props => out.push('\t'),
            "w:br" | "w:cr" if !closing => out.push('\n'),
            "w:p" if closing || self_closing => out.push('\n'),
            _ => {}
        }
    }

    out
}

/// Decodes the five predefined XML entities plus numeric character references.
/// Unknown entities are passed through unchanged.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCUMENT_XML, FileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Lincoln </w:t></w:r><w:r><w:t>High School</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = document_xml_to_text(xml);
        let lines: Vec<_> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Jane Doe", "Lincoln High School"]);
    }

    #[test]
    fn test_tabs_and_breaks() {
        let xml = "<w:p><w:r><w:t>Skills</w:t><w:tab/><w:t>Rust</w:t><w:br/><w:t>Go</w:t></w:r></w:p>";
        assert_eq!(document_xml_to_text(xml), "Skills\tRust\nGo\n");
    }

    #[test]
    fn test_tab_stops_in_paragraph_properties_ignored() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>A</w:t></w:r></w:p>"#;
        assert_eq!(document_xml_to_text(xml), "A\n");
    }

    #[test]
    fn test_text_outside_runs_is_dropped() {
        let xml = "<w:p><w:instrText>PAGE</w:instrText><w:r><w:t>Body</w:t></w:r></w:p>";
        assert_eq!(document_xml_to_text(xml), "Body\n");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("R&amp;D &lt;team&gt;"), "R&D <team>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_extract_docx_roundtrip_archive() {
        let bytes = build_docx("<w:p><w:r><w:t>GPA: 3.9</w:t></w:r></w:p>");
        assert_eq!(extract_docx_text(&bytes).unwrap(), "GPA: 3.9\n");
    }

    #[test]
    fn test_missing_document_xml_is_malformed() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("other.xml", FileOptions::default()).unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            extract_docx_text(&bytes),
            Err(ExtractError::Malformed(_))
        ));
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        assert!(matches!(
            extract_docx_text(b"PK\x03\x04garbage"),
            Err(ExtractError::Malformed(_))
        ));
    }
}
