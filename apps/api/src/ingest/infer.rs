//! Field Inferencer: maps normalized resume text to structured profile fields.
//!
//! Default backend: `RuleBasedInferencer` (pure-Rust, deterministic, fully testable).
//! Optional backend: `LlmInferencer` (see `llm_inferencer`), enabled via config.
//!
//! `AppState` holds an `Arc<dyn FieldInferencer>`, chosen at startup.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ingest::sections::{heading_kind, kinds_present, lines_of, split_sections, SectionKind};
use crate::models::profile::same_skill;

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all inferencer backends)
// ────────────────────────────────────────────────────────────────────────────

/// A value inferred from a document with a confidence in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inferred<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> Inferred<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InferredEducation {
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InferredProfile {
    #[serde(default)]
    pub full_name: Option<Inferred<String>>,
    #[serde(default)]
    pub email: Option<Inferred<String>>,
    #[serde(default)]
    pub phone: Option<Inferred<String>>,
    #[serde(default)]
    pub location: Option<Inferred<String>>,
    #[serde(default)]
    pub high_school: Option<Inferred<String>>,
    #[serde(default)]
    pub gpa: Option<Inferred<f64>>,
    #[serde(default)]
    pub graduation_year: Option<Inferred<i32>>,
    #[serde(default)]
    pub intended_major: Option<Inferred<String>>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<InferredEducation>,
    #[serde(default)]
    pub sections_found: Vec<SectionKind>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The field inferencer trait. Implement this to swap backends without
/// touching the ingest handlers.
#[async_trait]
pub trait FieldInferencer: Send + Sync {
    async fn infer(&self, text: &str) -> Result<InferredProfile, AppError>;

    /// Backend label reported to clients ("rules" | "llm").
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// RuleBasedInferencer
// ────────────────────────────────────────────────────────────────────────────

const EMAIL_CONFIDENCE: f64 = 0.95;
const PHONE_CONFIDENCE: f64 = 0.9;
const INTL_PHONE_CONFIDENCE: f64 = 0.7;
const NAME_CONFIDENCE: f64 = 0.9;
const NAME_ALL_CAPS_CONFIDENCE: f64 = 0.6;
const LOCATION_CONFIDENCE: f64 = 0.7;
const HIGH_SCHOOL_CONFIDENCE: f64 = 0.8;
const EDUCATION_GPA_CONFIDENCE: f64 = 0.85;
const LOOSE_GPA_CONFIDENCE: f64 = 0.7;
const GRADUATION_YEAR_CONFIDENCE: f64 = 0.75;
const EXPECTED_YEAR_CONFIDENCE: f64 = 0.85;
const EXPLICIT_MAJOR_CONFIDENCE: f64 = 0.85;
const FIELD_MAJOR_CONFIDENCE: f64 = 0.6;

const MAX_SKILL_CHARS: usize = 40;

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR",
];

/// Words that end a field-of-study phrase.
const FIELD_STOP_WORDS: &[&str] = &[
    "expected", "gpa", "graduated", "graduation", "class", "minor", "honors", "cum", "magna",
    "summa", "dean's", "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december", "present", "current",
];

/// Pure-Rust, heuristic inferencer. Fast, deterministic, no network calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInferencer;

#[async_trait]
impl FieldInferencer for RuleBasedInferencer {
    async fn infer(&self, text: &str) -> Result<InferredProfile, AppError> {
        let text = text.to_string();
        let inferencer = *self;
        tokio::task::spawn_blocking(move || inferencer.infer_fields(&text))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("inference task failed: {e}")))
    }

    fn backend(&self) -> &'static str {
        "rules"
    }
}

impl RuleBasedInferencer {
    pub fn infer_fields(&self, text: &str) -> InferredProfile {
        let sections = split_sections(text);

        let mut header = lines_of(&sections, SectionKind::Header);
        header.extend(lines_of(&sections, SectionKind::Contact));
        let education = parse_education(&lines_of(&sections, SectionKind::Education));

        let gpa = most_recent(&education, |e| e.gpa)
            .map(|g| Inferred::new(g, EDUCATION_GPA_CONFIDENCE))
            .or_else(|| find_gpa(text).map(|g| Inferred::new(g, LOOSE_GPA_CONFIDENCE)));

        let graduation_year = education
            .iter()
            .filter_map(|e| e.graduation_year)
            .max()
            .map(|y| {
                let expected = expected_year(text) == Some(y);
                let confidence = if expected {
                    EXPECTED_YEAR_CONFIDENCE
                } else {
                    GRADUATION_YEAR_CONFIDENCE
                };
                Inferred::new(y, confidence)
            });

        let intended_major = find_explicit_major(text)
            .map(|m| Inferred::new(m, EXPLICIT_MAJOR_CONFIDENCE))
            .or_else(|| {
                most_recent(&education, |e| e.field_of_study.clone())
                    .map(|m| Inferred::new(m, FIELD_MAJOR_CONFIDENCE))
            });

        let high_school = education
            .iter()
            .find(|e| is_high_school(e))
            .map(|e| Inferred::new(e.institution.clone(), HIGH_SCHOOL_CONFIDENCE));

        InferredProfile {
            full_name: infer_name(&header),
            email: find_email(text).map(|e| Inferred::new(e, EMAIL_CONFIDENCE)),
            phone: find_phone(text),
            location: infer_location(&header).map(|l| Inferred::new(l, LOCATION_CONFIDENCE)),
            high_school,
            gpa,
            graduation_year,
            intended_major,
            skills: parse_skills(&lines_of(&sections, SectionKind::Skills)),
            education,
            sections_found: kinds_present(&sections),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Patterns
// ────────────────────────────────────────────────────────────────────────────

static EMAIL: OnceLock<Regex> = OnceLock::new();
static NA_PHONE: OnceLock<Regex> = OnceLock::new();
static OTHER_PHONE: OnceLock<Regex> = OnceLock::new();
static GPA_PREFIX: OnceLock<Regex> = OnceLock::new();
static GPA_SUFFIX: OnceLock<Regex> = OnceLock::new();
static YEAR: OnceLock<Regex> = OnceLock::new();
static EXPECTED_YEAR: OnceLock<Regex> = OnceLock::new();
static OPEN_RANGE: OnceLock<Regex> = OnceLock::new();
static DEGREE: OnceLock<Regex> = OnceLock::new();
static INSTITUTION: OnceLock<Regex> = OnceLock::new();
static MAJOR: OnceLock<Regex> = OnceLock::new();
static CITY_STATE: OnceLock<Regex> = OnceLock::new();
static NAME_WORD: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Static regex pattern is guaranteed to be valid"))
}

fn email_re() -> &'static Regex {
    regex(&EMAIL, r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9-]+(?:\.[A-Z0-9-]+)*\.[A-Z]{2,}\b")
}

fn na_phone_re() -> &'static Regex {
    regex(
        &NA_PHONE,
        r"(?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}",
    )
}

fn other_phone_re() -> &'static Regex {
    regex(&OTHER_PHONE, r"\+?\(?\d[\d ().-]{8,20}\d")
}

fn gpa_prefix_re() -> &'static Regex {
    regex(
        &GPA_PREFIX,
        r"(?i)\bGPA\b[^0-9\n]{0,12}(\d{1,3}(?:\.\d{1,3})?)(?:\s*(?:/|out of)\s*(\d{1,3}(?:\.\d{1,2})?))?",
    )
}

fn gpa_suffix_re() -> &'static Regex {
    regex(
        &GPA_SUFFIX,
        r"(?i)(\d\.\d{1,3})\s*(?:/\s*(\d{1,3}(?:\.\d{1,2})?))?\s*(?:cumulative\s+|weighted\s+|unweighted\s+)?GPA\b",
    )
}

fn year_re() -> &'static Regex {
    regex(&YEAR, r"\b(19[5-9]\d|20\d{2}|2100)\b")
}

fn expected_year_re() -> &'static Regex {
    regex(
        &EXPECTED_YEAR,
        r"(?i)\b(?:expected|anticipated|class of)\b[^0-9\n]{0,16}(19[5-9]\d|20\d{2}|2100)\b",
    )
}

fn open_range_re() -> &'static Regex {
    regex(
        &OPEN_RANGE,
        r"(?i)\b(?:19[5-9]\d|20\d{2}|2100)\s*(?:-|–|—|to)\s*(?:present|current|now)\b",
    )
}

fn degree_re() -> &'static Regex {
    regex(
        &DEGREE,
        r"(?i)(?:^|[^A-Za-z])(high school diploma|ged|associate(?:'s)?(?: of (?:arts|science|applied science))?|a\.a\.|a\.s\.|bachelor(?:'s)?(?: of (?:arts|science|engineering|fine arts|business administration))?|b\.s\.|b\.a\.|bsc|b\.sc\.|beng|b\.eng\.|master(?:'s)?(?: of (?:arts|science|engineering|business administration|fine arts))?|m\.s\.|m\.a\.|msc|m\.sc\.|mba|m\.b\.a\.|ph\.d\.|phd|doctorate)(?:[^A-Za-z]|$)",
    )
}

fn institution_re() -> &'static Regex {
    regex(
        &INSTITUTION,
        r"(?i)\b(university|college|institute|school|academy|polytechnic)\b",
    )
}

fn major_re() -> &'static Regex {
    regex(
        &MAJOR,
        r"(?im)^\s*(?:intended\s+|prospective\s+)?major\s*[:\-–]\s*(.+?)\s*$",
    )
}

fn city_state_re() -> &'static Regex {
    regex(
        &CITY_STATE,
        r"^([A-Z][A-Za-z.'-]*(?:\s+[A-Z][A-Za-z.'-]*){0,3}),\s*([A-Z]{2})(?:\s+\d{5}(?:-\d{4})?)?$",
    )
}

fn name_word_re() -> &'static Regex {
    regex(&NAME_WORD, r"^[A-Za-z][A-Za-z.'-]*$")
}

// ────────────────────────────────────────────────────────────────────────────
// Contact
// ────────────────────────────────────────────────────────────────────────────

pub fn find_email(text: &str) -> Option<String> {
    email_re().find(text).map(|m| m.as_str().to_lowercase())
}

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// North-American numbers are canonicalized; any other number of 10 to 15
/// digits is returned as written with lower confidence.
pub fn find_phone(text: &str) -> Option<Inferred<String>> {
    for m in na_phone_re().find_iter(text) {
        if touches_digit(text, m.start(), m.end()) {
            continue;
        }
        if let Some(formatted) = format_na_phone(m.as_str()) {
            return Some(Inferred::new(formatted, PHONE_CONFIDENCE));
        }
    }
    other_phone_re()
        .find_iter(text)
        .filter(|m| !touches_digit(text, m.start(), m.end()))
        .map(|m| m.as_str().trim())
        .find(|raw| looks_like_phone(raw))
        .map(|raw| Inferred::new(raw.to_string(), INTL_PHONE_CONFIDENCE))
}

fn touches_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}

/// A bare digit run is an ID, and two years in one run is a date range.
fn looks_like_phone(raw: &str) -> bool {
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    let grouped = raw.starts_with('+') || raw.chars().any(|c| !c.is_ascii_digit());
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
        && grouped
        && year_re().find_iter(raw).count() < 2
}

fn format_na_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let (prefix, local) = match digits.len() {
        10 => ("", digits.as_str()),
        11 if digits.starts_with('1') => ("+1 ", &digits[1..]),
        _ => return None,
    };
    Some(format!(
        "{prefix}({}) {}-{}",
        &local[..3],
        &local[3..6],
        &local[6..]
    ))
}

/// First header segment that looks like a personal name.
fn infer_name(header: &[&str]) -> Option<Inferred<String>> {
    header
        .iter()
        .flat_map(|line| split_segments(line))
        .find_map(|segment| {
            let words: Vec<_> = segment.split_whitespace().collect();
            if !(2..=4).contains(&words.len())
                || !words.iter().all(|w| name_word_re().is_match(w))
                || heading_kind(segment).is_some()
                || institution_re().is_match(segment)
                || degree_re().is_match(segment)
            {
                return None;
            }
            let has_lower = segment.chars().any(|c| c.is_lowercase());
            let title_case = words
                .iter()
                .all(|w| w.chars().next().is_some_and(char::is_uppercase));
            match (has_lower, title_case) {
                (true, true) => Some(Inferred::new(words.join(" "), NAME_CONFIDENCE)),
                (false, _) => Some(Inferred::new(words.join(" "), NAME_ALL_CAPS_CONFIDENCE)),
                (true, false) => None,
            }
        })
}

fn infer_location(header: &[&str]) -> Option<String> {
    header
        .iter()
        .flat_map(|line| split_segments(line))
        .find_map(|segment| {
            let caps = city_state_re().captures(segment)?;
            let state = caps.get(2)?.as_str();
            US_STATES
                .contains(&state)
                .then(|| format!("{}, {}", caps[1].trim(), state))
        })
}

/// Splits a header line on the separators resumes use between contact items.
fn split_segments(line: &str) -> Vec<&str> {
    line.split(['|', '•', '·', '◦', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Education
// ────────────────────────────────────────────────────────────────────────────

/// Groups education lines into entries, one per institution line. Lines seen
/// before the first institution belong to the first entry.
pub fn parse_education(lines: &[&str]) -> Vec<InferredEducation> {
    let mut entries: Vec<(String, Vec<&str>)> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();

    for &line in lines {
        match institution_in(line) {
            Some(institution) => entries.push((institution, vec![line])),
            None => match entries.last_mut() {
                Some((_, entry_lines)) => entry_lines.push(line),
                None => preamble.push(line),
            },
        }
    }

    if let Some((_, first_lines)) = entries.first_mut() {
        first_lines.splice(0..0, preamble);
    }

    entries
        .into_iter()
        .map(|(institution, entry_lines)| {
            let body = entry_lines.join("\n");
            let degree_match = degree_re().captures(&body).and_then(|c| c.get(1));
            let degree = degree_match.map(|m| m.as_str().trim().to_string());
            let field_of_study = degree_match
                .filter(|m| !is_high_school_degree(m.as_str()))
                .and_then(|m| field_after_degree(&body[m.end()..]));
            InferredEducation {
                institution,
                degree,
                field_of_study,
                gpa: find_gpa(&body),
                graduation_year: graduation_year_of(&body),
            }
        })
        .collect()
}

/// The institution named on a line: the first separator-delimited segment
/// containing an institution keyword that is not itself a degree.
fn institution_in(line: &str) -> Option<String> {
    let separators: &[char] = &[',', '|', '–', '—', '\t', '(', ')'];
    line.split(separators)
        .flat_map(|s| s.split(" - "))
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '•' || c == '*'))
        .filter(|s| institution_re().is_match(s))
        .find(|s| !degree_re().is_match(s))
        .map(|s| strip_years(s))
        .filter(|s| s.split_whitespace().count() >= 2)
}

fn strip_years(s: &str) -> String {
    year_re()
        .replace_all(s, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_after_degree(rest: &str) -> Option<String> {
    let rest = rest.split('\n').next().unwrap_or_default();
    let rest = rest
        .trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == ':' || c == '-')
        .trim_start();
    let rest = rest
        .strip_prefix("degree ")
        .unwrap_or(rest)
        .trim_start();
    let rest = rest
        .strip_prefix("in ")
        .or_else(|| rest.strip_prefix("In "))
        .unwrap_or(rest);

    let mut words = Vec::new();
    for raw in rest.split_whitespace() {
        let word = raw.trim_end_matches([',', ';', '.', ')']);
        let lower = word.to_lowercase();
        let connective = matches!(lower.as_str(), "and" | "of" | "&");
        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        if FIELD_STOP_WORDS.contains(&lower.as_str())
            || (!connective && !capitalized)
            || word.chars().any(|c| c.is_ascii_digit())
        {
            break;
        }
        words.push(word);
        if word.len() != raw.len() {
            break;
        }
    }
    while words
        .last()
        .is_some_and(|w| matches!(w.to_lowercase().as_str(), "and" | "of" | "&"))
    {
        words.pop();
    }
    (!words.is_empty()).then(|| words.join(" "))
}

fn is_high_school_degree(degree: &str) -> bool {
    let lower = degree.to_lowercase();
    lower.starts_with("high school") || lower == "ged"
}

fn is_high_school(entry: &InferredEducation) -> bool {
    let name = entry.institution.to_lowercase();
    name.contains("high school")
        || name.contains("academy")
        || name.contains("secondary")
        || entry.degree.as_deref().is_some_and(is_high_school_degree)
}

/// Graduation year of one entry: an explicit "Expected 2026" wins, an open
/// range ("2022 – Present") has none, otherwise the latest year mentioned.
fn graduation_year_of(body: &str) -> Option<i32> {
    if let Some(year) = expected_year(body) {
        return Some(year);
    }
    if open_range_re().is_match(body) {
        return None;
    }
    year_re()
        .captures_iter(body)
        .filter_map(|c| c[1].parse::<i32>().ok())
        .max()
}

fn expected_year(text: &str) -> Option<i32> {
    expected_year_re()
        .captures(text)
        .and_then(|c| c[1].parse().ok())
}

/// The value of `pick` on the most recent entry that has one: latest
/// graduation year first, entries without a year ranked by document order.
fn most_recent<T>(
    education: &[InferredEducation],
    pick: impl Fn(&InferredEducation) -> Option<T>,
) -> Option<T> {
    let mut candidates: Vec<_> = education
        .iter()
        .enumerate()
        .filter_map(|(i, e)| pick(e).map(|v| (e.graduation_year, i, v)))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    candidates.into_iter().next().map(|(_, _, v)| v)
}

// ────────────────────────────────────────────────────────────────────────────
// GPA, major, skills
// ────────────────────────────────────────────────────────────────────────────

/// Finds a GPA and normalizes it to a 4.0 scale (two decimals).
/// A GPA above its scale, or above 4.0 with no stated scale, is ignored.
pub fn find_gpa(text: &str) -> Option<f64> {
    gpa_prefix_re()
        .captures_iter(text)
        .chain(gpa_suffix_re().captures_iter(text))
        .find_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            let scale: f64 = match caps.get(2) {
                Some(s) => s.as_str().parse().ok()?,
                None => 4.0,
            };
            normalize_gpa(value, scale)
        })
}

fn normalize_gpa(value: f64, scale: f64) -> Option<f64> {
    if scale <= 0.0 || !(0.0..=scale).contains(&value) {
        return None;
    }
    Some((value / scale * 4.0 * 100.0).round() / 100.0)
}

fn find_explicit_major(text: &str) -> Option<String> {
    major_re()
        .captures(text)
        .map(|c| c[1].trim_end_matches(['.', ',']).trim().to_string())
        .filter(|m| !m.is_empty() && m.chars().count() <= 80)
}

/// Splits skills lines into items: category prefixes dropped, split on list
/// separators, deduplicated case-insensitively keeping the first spelling.
pub fn parse_skills(lines: &[&str]) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim_start_matches(|c: char| matches!(c, '•' | '-' | '*' | '·' | '◦') || c.is_whitespace());
        let items = match line.split_once(':') {
            Some((prefix, rest)) if prefix.split_whitespace().count() <= 3 => rest,
            _ => line,
        };
        for item in items.split([',', ';', '|', '•', '·']) {
            let item = item.trim().trim_end_matches('.').trim();
            let len = item.chars().count();
            if len == 0 || len > MAX_SKILL_CHARS || item.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if !skills.iter().any(|s| same_skill(s, item)) {
                skills.push(item.to_string());
            }
        }
    }
    skills
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH_SCHOOL_RESUME: &str = "\
Jane Q. Doe
jane.doe@example.com | (555) 123-4567 | Springfield, IL

OBJECTIVE
Aspiring engineer seeking admission to a four-year program.
Intended Major: Mechanical Engineering

EDUCATION
Lincoln High School, Springfield, IL
High School Diploma, Expected May 2026
GPA: 3.85 / 4.0

SKILLS
Languages: Python, Java, python
CAD: SolidWorks; AutoCAD
Public Speaking

ACTIVITIES
Robotics Club Captain, 2023 - Present";

    const COLLEGE_RESUME: &str = "\
JOHN SMITH
+44 20 7946 0958

Education
University of Michigan — Ann Arbor, MI
Bachelor of Science in Computer Science and Mathematics, 2019 - 2023
3.6/4.0 GPA
Washtenaw Community College
Associate of Arts, 2017
Technical Skills
Rust, Go, Kubernetes";

    fn infer(text: &str) -> InferredProfile {
        RuleBasedInferencer.infer_fields(text)
    }

    #[test]
    fn test_high_school_resume_contact() {
        let p = infer(HIGH_SCHOOL_RESUME);
        assert_eq!(p.full_name.unwrap().value, "Jane Q. Doe");
        assert_eq!(p.email.unwrap().value, "jane.doe@example.com");
        assert_eq!(p.phone.unwrap().value, "(555) 123-4567");
        assert_eq!(p.location.unwrap().value, "Springfield, IL");
    }

    #[test]
    fn test_high_school_resume_education() {
        let p = infer(HIGH_SCHOOL_RESUME);
        assert_eq!(p.education.len(), 1);
        let hs = &p.education[0];
        assert_eq!(hs.institution, "Lincoln High School");
        assert_eq!(hs.degree.as_deref(), Some("High School Diploma"));
        assert_eq!(hs.field_of_study, None);
        assert_eq!(hs.gpa, Some(3.85));
        assert_eq!(hs.graduation_year, Some(2026));
        assert_eq!(p.high_school.unwrap().value, "Lincoln High School");
        let year = p.graduation_year.unwrap();
        assert_eq!(year.value, 2026);
        assert!((year.confidence - EXPECTED_YEAR_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(p.gpa.unwrap().value, 3.85);
    }

    #[test]
    fn test_explicit_major_wins() {
        let p = infer(HIGH_SCHOOL_RESUME);
        let major = p.intended_major.unwrap();
        assert_eq!(major.value, "Mechanical Engineering");
        assert!((major.confidence - EXPLICIT_MAJOR_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_skills_deduplicated_and_prefixes_dropped() {
        let p = infer(HIGH_SCHOOL_RESUME);
        assert_eq!(
            p.skills,
            vec!["Python", "Java", "SolidWorks", "AutoCAD", "Public Speaking"]
        );
    }

    #[test]
    fn test_sections_found() {
        let p = infer(HIGH_SCHOOL_RESUME);
        assert_eq!(
            p.sections_found,
            vec![
                SectionKind::Summary,
                SectionKind::Education,
                SectionKind::Skills,
                SectionKind::Activities
            ]
        );
    }

    #[test]
    fn test_college_resume() {
        let p = infer(COLLEGE_RESUME);
        let name = p.full_name.unwrap();
        assert_eq!(name.value, "JOHN SMITH");
        assert!((name.confidence - NAME_ALL_CAPS_CONFIDENCE).abs() < f64::EPSILON);

        let phone = p.phone.unwrap();
        assert_eq!(phone.value, "+44 20 7946 0958");
        assert!((phone.confidence - INTL_PHONE_CONFIDENCE).abs() < f64::EPSILON);

        assert_eq!(p.education.len(), 2);
        let umich = &p.education[0];
        assert_eq!(umich.institution, "University of Michigan");
        assert_eq!(umich.degree.as_deref(), Some("Bachelor of Science"));
        assert_eq!(
            umich.field_of_study.as_deref(),
            Some("Computer Science and Mathematics")
        );
        assert_eq!(umich.gpa, Some(3.6));
        assert_eq!(umich.graduation_year, Some(2023));

        let cc = &p.education[1];
        assert_eq!(cc.institution, "Washtenaw Community College");
        assert_eq!(cc.degree.as_deref(), Some("Associate of Arts"));
        assert_eq!(cc.graduation_year, Some(2017));

        assert!(p.high_school.is_none());
        assert_eq!(p.graduation_year.unwrap().value, 2023);
        assert_eq!(
            p.intended_major.unwrap().value,
            "Computer Science and Mathematics"
        );
        assert_eq!(p.skills, vec!["Rust", "Go", "Kubernetes"]);
        assert!(p.location.is_none());
    }

    #[test]
    fn test_gpa_scales() {
        assert_eq!(find_gpa("GPA: 3.9"), Some(3.9));
        assert_eq!(find_gpa("Cumulative GPA 4.5/5.0"), Some(3.6));
        assert_eq!(find_gpa("GPA: 92 out of 100"), Some(3.68));
        assert_eq!(find_gpa("3.45 GPA"), Some(3.45));
        assert_eq!(find_gpa("Weighted GPA: 4.6"), None);
        assert_eq!(find_gpa("No grades here"), None);
    }

    #[test]
    fn test_phone_formats() {
        assert_eq!(
            find_phone("Call 555.123.4567 today").unwrap().value,
            "(555) 123-4567"
        );
        assert_eq!(
            find_phone("+1 555-123-4567").unwrap().value,
            "+1 (555) 123-4567"
        );
        assert!(find_phone("ID 123456789012345").is_none());
        assert!(find_phone("2019-2023").is_none());
    }

    #[test]
    fn test_phone_without_country_code() {
        let phone = find_phone("Jane Doe | 020 7946 0958 | jane@example.com").unwrap();
        assert_eq!(phone.value, "020 7946 0958");
        assert!((phone.confidence - INTL_PHONE_CONFIDENCE).abs() < f64::EPSILON);

        assert_eq!(
            find_phone("Tel: 06 12 34 56 78").unwrap().value,
            "06 12 34 56 78"
        );
        // Nine digits is too short for a phone number.
        assert!(find_phone("Tel: 06 12 34 56 7").is_none());
        assert!(find_phone("Attended 2015 - 2019 2020 - 2022").is_none());
    }

    #[test]
    fn test_email_lowercased() {
        assert_eq!(
            find_email("Contact: Jane.Doe@Example.COM").as_deref(),
            Some("jane.doe@example.com")
        );
    }

    #[test]
    fn test_words_containing_present_keep_graduation_year() {
        let edu = parse_education(&[
            "Lincoln High School 2021 - 2025",
            "Student Council Representative",
        ]);
        assert_eq!(edu[0].graduation_year, Some(2025));

        let edu = parse_education(&[
            "Stanford University, 2019 - 2023",
            "Presented research at ACM; concurrent enrollment",
        ]);
        assert_eq!(edu[0].graduation_year, Some(2023));
        assert_eq!(graduation_year_of("Oberlin College\n2021 to current"), None);
    }

    #[test]
    fn test_academy_is_high_school() {
        let p = infer("Jane Doe\nEDUCATION\nPhillips Exeter Academy, Exeter, NH\nGPA: 3.9\nClass of 2026");
        assert_eq!(p.high_school.unwrap().value, "Phillips Exeter Academy");
        assert_eq!(p.graduation_year.unwrap().value, 2026);
    }

    #[test]
    fn test_gpa_equal_to_scale() {
        assert_eq!(find_gpa("GPA: 4.0/4.0"), Some(4.0));
        assert_eq!(find_gpa("GPA: 5.0 / 5.0"), Some(4.0));
        assert_eq!(find_gpa("GPA: 4.0"), Some(4.0));
        assert_eq!(find_gpa("GPA: 4.01"), None);
    }

    #[test]
    fn test_skill_length_limit() {
        let forty = "a".repeat(40);
        let forty_one = "b".repeat(41);
        let line = format!("{forty}, {forty_one}, Rust");
        assert_eq!(parse_skills(&[line.as_str()]), vec![forty, "Rust".to_string()]);
    }

    #[test]
    fn test_skills_deduplicated_beyond_ascii() {
        assert_eq!(
            parse_skills(&["Español, ESPAÑOL, español", "Ölçme"]),
            vec!["Español", "Ölçme"]
        );
    }

    #[test]
    fn test_open_range_has_no_graduation_year() {
        assert_eq!(graduation_year_of("Stanford University\n2022 - Present"), None);
        assert_eq!(
            graduation_year_of("Stanford University\n2022 - Present, Expected 2026"),
            Some(2026)
        );
    }

    #[test]
    fn test_degree_abbreviations_not_state_codes() {
        let edu = parse_education(&["Boston University, Boston, MA", "2015 - 2019"]);
        assert_eq!(edu.len(), 1);
        assert_eq!(edu[0].institution, "Boston University");
        assert_eq!(edu[0].degree, None);

        let edu = parse_education(&["B.S. Biology, Boston University"]);
        assert_eq!(edu[0].degree.as_deref(), Some("B.S."));
        assert_eq!(edu[0].field_of_study.as_deref(), Some("Biology"));
    }

    #[test]
    fn test_preamble_lines_join_first_entry() {
        let edu = parse_education(&["Bachelor of Arts in History", "Oberlin College", "2020"]);
        assert_eq!(edu.len(), 1);
        assert_eq!(edu[0].institution, "Oberlin College");
        assert_eq!(edu[0].field_of_study.as_deref(), Some("History"));
        assert_eq!(edu[0].graduation_year, Some(2020));
    }

    #[test]
    fn test_empty_text() {
        let p = infer("");
        assert_eq!(p, InferredProfile::default());
    }

    #[test]
    fn test_inferred_confidence_clamped() {
        assert_eq!(Inferred::new("x", 1.7).confidence, 1.0);
        assert_eq!(Inferred::new("x", -0.2).confidence, 0.0);
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let inferencer: std::sync::Arc<dyn FieldInferencer> =
            std::sync::Arc::new(RuleBasedInferencer);
        let p = inferencer.infer("Jane Doe\nSKILLS\nRust").await.unwrap();
        assert_eq!(inferencer.backend(), "rules");
        assert_eq!(p.skills, vec!["Rust"]);
    }
}
