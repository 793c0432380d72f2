//! Splits normalized resume text into headed sections.

use serde::{Deserialize, Serialize};

const MAX_HEADING_WORDS: usize = 4;
const MAX_HEADING_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Text before the first recognised heading (name, contact line).
    Header,
    Summary,
    Contact,
    Education,
    Experience,
    Skills,
    Projects,
    Awards,
    Activities,
    Certifications,
}

const HEADINGS: &[(&str, SectionKind)] = &[
    ("education", SectionKind::Education),
    ("academic background", SectionKind::Education),
    ("academics", SectionKind::Education),
    ("education and training", SectionKind::Education),
    ("experience", SectionKind::Experience),
    ("work experience", SectionKind::Experience),
    ("professional experience", SectionKind::Experience),
    ("employment", SectionKind::Experience),
    ("employment history", SectionKind::Experience),
    ("work history", SectionKind::Experience),
    ("skills", SectionKind::Skills),
    ("technical skills", SectionKind::Skills),
    ("core competencies", SectionKind::Skills),
    ("skills and interests", SectionKind::Skills),
    ("skills & interests", SectionKind::Skills),
    ("languages", SectionKind::Skills),
    ("projects", SectionKind::Projects),
    ("personal projects", SectionKind::Projects),
    ("academic projects", SectionKind::Projects),
    ("awards", SectionKind::Awards),
    ("honors", SectionKind::Awards),
    ("honors and awards", SectionKind::Awards),
    ("honors & awards", SectionKind::Awards),
    ("awards and honors", SectionKind::Awards),
    ("achievements", SectionKind::Awards),
    ("activities", SectionKind::Activities),
    ("extracurricular activities", SectionKind::Activities),
    ("extracurriculars", SectionKind::Activities),
    ("leadership", SectionKind::Activities),
    ("leadership and activities", SectionKind::Activities),
    ("leadership and volunteer experience", SectionKind::Activities),
    ("extracurricular and community activities", SectionKind::Activities),
    ("volunteer experience", SectionKind::Activities),
    ("volunteering", SectionKind::Activities),
    ("certifications", SectionKind::Certifications),
    ("certificates", SectionKind::Certifications),
    ("licenses and certifications", SectionKind::Certifications),
    ("summary", SectionKind::Summary),
    ("professional summary", SectionKind::Summary),
    ("objective", SectionKind::Summary),
    ("profile", SectionKind::Summary),
    ("about me", SectionKind::Summary),
    ("contact", SectionKind::Contact),
    ("contact information", SectionKind::Contact),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub heading: Option<&'a str>,
    pub lines: Vec<&'a str>,
}

/// Classifies a line as a section heading.
///
/// A heading is short, optionally decorated (`## Skills`, `SKILLS:`,
/// `— Education —`), and matches the known vocabulary case-insensitively.
pub fn heading_kind(line: &str) -> Option<SectionKind> {
    let trimmed = line
        .trim()
        .trim_matches(|c: char| matches!(c, '#' | '=' | '-' | '—' | '–' | '*' | '_' | ':'))
        .trim();
    let words: Vec<_> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_HEADING_WORDS {
        return None;
    }
    let key = words.join(" ").to_lowercase();
    if key.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    HEADINGS
        .iter()
        .find(|(heading, _)| *heading == key)
        .map(|(_, kind)| *kind)
}

/// Splits text into sections. Non-empty lines are kept trimmed.
/// An inline heading (`Skills: Rust, Go`) opens a section whose first line is
/// the remainder after the colon.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = vec![Section {
        kind: SectionKind::Header,
        heading: None,
        lines: Vec::new(),
    }];

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(kind) = heading_kind(line) {
            sections.push(Section {
                kind,
                heading: Some(line),
                lines: Vec::new(),
            });
            continue;
        }

        if let Some((prefix, rest)) = line.split_once(':') {
            let rest = rest.trim();
            if let Some(kind) = heading_kind(prefix).filter(|_| !rest.is_empty()) {
                sections.push(Section {
                    kind,
                    heading: Some(prefix.trim()),
                    lines: vec![rest],
                });
                continue;
            }
        }

        if let Some(current) = sections.last_mut() {
            current.lines.push(line);
        }
    }

    sections
}

/// All lines belonging to sections of `kind`, in document order.
pub fn lines_of<'a>(sections: &[Section<'a>], kind: SectionKind) -> Vec<&'a str> {
    sections
        .iter()
        .filter(|s| s.kind == kind)
        .flat_map(|s| s.lines.iter().copied())
        .collect()
}

/// Distinct section kinds present with at least one line, header excluded.
pub fn kinds_present(sections: &[Section<'_>]) -> Vec<SectionKind> {
    let mut kinds = Vec::new();
    for section in sections {
        if section.kind != SectionKind::Header
            && !section.lines.is_empty()
            && !kinds.contains(&section.kind)
        {
            kinds.push(section.kind);
        }
    }
    kinds
}
