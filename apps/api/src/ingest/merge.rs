//! Profile Merger: reconciles inferred resume fields with a stored profile.
//!
//! Rules, per scalar field:
//! - empty → filled from the resume, source becomes `resume`
//! - resume-sourced and different → replaced (the newer resume wins)
//! - user-sourced and different → kept, reported as a conflict, unless the
//!   field is listed in `MergeOptions::overwrite`
//! - below `min_confidence` → skipped
//!
//! Skills are unioned, education records are appended or completed. Nothing
//! is ever removed. The merge is pure and idempotent.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ingest::infer::{Inferred, InferredEducation, InferredProfile};
use crate::models::profile::{same_skill, EducationRecord, FieldSource, UserProfile};

/// GPAs closer than this are the same value.
const GPA_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub previous: Option<Value>,
    /// For `skills`, the items added. For `education`, the added or completed record.
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeConflict {
    pub field: String,
    pub current: Value,
    pub proposed: Value,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedField {
    pub field: String,
    pub proposed: Value,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub min_confidence: f64,
    /// User-sourced fields the user agreed to replace with resume values.
    pub overwrite: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeOutcome {
    pub profile: UserProfile,
    pub changes: Vec<FieldChange>,
    pub conflicts: Vec<MergeConflict>,
    pub skipped: Vec<SkippedField>,
}

impl MergeOutcome {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

struct Merger<'a> {
    options: &'a MergeOptions,
    /// Provenance is read from the unmodified profile.
    original: &'a UserProfile,
    sources: BTreeMap<String, FieldSource>,
    changes: Vec<FieldChange>,
    conflicts: Vec<MergeConflict>,
    skipped: Vec<SkippedField>,
}

impl Merger<'_> {
    fn scalar<T>(
        &mut self,
        field: &str,
        slot: &mut Option<T>,
        proposed: Option<&Inferred<T>>,
        same: fn(&T, &T) -> bool,
    ) where
        T: Clone + Serialize,
    {
        let Some(proposed) = proposed else {
            return;
        };

        if proposed.confidence < self.options.min_confidence {
            self.skipped.push(SkippedField {
                field: field.to_string(),
                proposed: json!(proposed.value),
                confidence: proposed.confidence,
            });
            return;
        }

        let source = self.original.source_of(field);

        let replace = match slot.as_ref() {
            None => true,
            Some(current) if same(current, &proposed.value) => false,
            Some(current) => match source {
                Some(FieldSource::User) if !self.options.overwrite.contains(field) => {
                    self.conflicts.push(MergeConflict {
                        field: field.to_string(),
                        current: json!(current),
                        proposed: json!(proposed.value),
                        confidence: proposed.confidence,
                    });
                    false
                }
                _ => true,
            },
        };

        if replace {
            let previous = slot.as_ref().map(|v| json!(v));
            *slot = Some(proposed.value.clone());
            self.sources.insert(field.to_string(), FieldSource::Resume);
            self.changes.push(FieldChange {
                field: field.to_string(),
                previous,
                value: json!(proposed.value),
            });
        }
    }

    fn skills(&mut self, skills: &mut Vec<String>, proposed: &[String]) {
        let previous = json!(skills);
        let mut added = Vec::new();
        for skill in proposed {
            let skill = skill.trim();
            if skill.is_empty() || skills.iter().any(|s| same_skill(s, skill)) {
                continue;
            }
            skills.push(skill.to_string());
            added.push(skill.to_string());
        }
        if !added.is_empty() {
            self.changes.push(FieldChange {
                field: "skills".to_string(),
                previous: Some(previous),
                value: json!(added),
            });
        }
    }

    fn education(&mut self, records: &mut Vec<EducationRecord>, proposed: &[InferredEducation]) {
        for inferred in proposed {
            let key = institution_key(&inferred.institution);
            if key.is_empty() {
                continue;
            }

            match records
                .iter_mut()
                .find(|r| institution_key(&r.institution) == key)
            {
                Some(existing) if existing.source == FieldSource::Resume => {
                    let before = existing.clone();
                    fill(&mut existing.degree, &inferred.degree);
                    fill(&mut existing.field_of_study, &inferred.field_of_study);
                    fill(&mut existing.gpa, &inferred.gpa);
                    fill(&mut existing.graduation_year, &inferred.graduation_year);
                    if *existing != before {
                        self.changes.push(FieldChange {
                            field: "education".to_string(),
                            previous: Some(json!(before)),
                            value: json!(existing),
                        });
                    }
                }
                Some(_) => {}
                None => {
                    let record = EducationRecord {
                        institution: inferred.institution.trim().to_string(),
                        degree: inferred.degree.clone(),
                        field_of_study: inferred.field_of_study.clone(),
                        gpa: inferred.gpa,
                        graduation_year: inferred.graduation_year,
                        source: FieldSource::Resume,
                    };
                    self.changes.push(FieldChange {
                        field: "education".to_string(),
                        previous: None,
                        value: json!(record),
                    });
                    records.push(record);
                }
            }
        }
    }
}

/// Merges `inferred` into a copy of `profile`.
pub fn merge_profile(
    profile: &UserProfile,
    inferred: &InferredProfile,
    options: &MergeOptions,
) -> MergeOutcome {
    let mut merged = profile.clone();
    let mut merger = Merger {
        options,
        original: profile,
        sources: std::mem::take(&mut merged.field_sources),
        changes: Vec::new(),
        conflicts: Vec::new(),
        skipped: Vec::new(),
    };

    merger.scalar("full_name", &mut merged.full_name, inferred.full_name.as_ref(), same_text);
    merger.scalar("email", &mut merged.email, inferred.email.as_ref(), same_text);
    merger.scalar("phone", &mut merged.phone, inferred.phone.as_ref(), same_phone);
    merger.scalar("location", &mut merged.location, inferred.location.as_ref(), same_text);
    merger.scalar(
        "high_school",
        &mut merged.high_school,
        inferred.high_school.as_ref(),
        same_text,
    );
    merger.scalar("gpa", &mut merged.gpa, inferred.gpa.as_ref(), same_gpa);
    merger.scalar(
        "graduation_year",
        &mut merged.graduation_year,
        inferred.graduation_year.as_ref(),
        |a, b| a == b,
    );
    merger.scalar(
        "intended_major",
        &mut merged.intended_major,
        inferred.intended_major.as_ref(),
        same_text,
    );
    merger.skills(&mut merged.skills, &inferred.skills);
    merger.education(&mut merged.education, &inferred.education);

    merged.field_sources = merger.sources;

    MergeOutcome {
        profile: merged,
        changes: merger.changes,
        conflicts: merger.conflicts,
        skipped: merger.skipped,
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

fn normalize_words(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn same_text(a: &String, b: &String) -> bool {
    normalize_words(a) == normalize_words(b)
}

fn same_phone(a: &String, b: &String) -> bool {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let (a, b) = (digits(a), digits(b));
    a == b || a.strip_prefix('1') == Some(b.as_str()) || b.strip_prefix('1') == Some(a.as_str())
}

fn same_gpa(a: &f64, b: &f64) -> bool {
    (a - b).abs() < GPA_EPSILON
}

/// Institution identity: lowercase alphanumeric words, leading "the" dropped.
fn institution_key(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    let words: Vec<_> = cleaned.split_whitespace().collect();
    match words.split_first() {
        Some((&"the", rest)) => rest.join(" "),
        _ => words.join(" "),
    }
}
