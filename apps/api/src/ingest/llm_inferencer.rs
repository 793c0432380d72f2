//! LLM-backed field inferencer. Falls back to the rule-based result when the
//! model call fails, so an upload never errors because of the LLM.

use async_trait::async_trait;
use tracing::warn;

use crate::errors::AppError;
use crate::ingest::infer::{FieldInferencer, Inferred, InferredProfile, RuleBasedInferencer};
use crate::ingest::prompts::{RESUME_INFER_PROMPT, RESUME_INFER_SYSTEM};
use crate::ingest::sections::{kinds_present, split_sections};
use crate::llm_client::LlmClient;
use crate::models::profile::same_skill;

/// Resume text beyond this many characters is not sent to the model.
const MAX_PROMPT_CHARS: usize = 20_000;

pub struct LlmInferencer {
    llm: LlmClient,
    fallback: RuleBasedInferencer,
}

impl LlmInferencer {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            fallback: RuleBasedInferencer,
        }
    }
}

#[async_trait]
impl FieldInferencer for LlmInferencer {
    async fn infer(&self, text: &str) -> Result<InferredProfile, AppError> {
        let truncated: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        let prompt = RESUME_INFER_PROMPT.replace("{resume_text}", &truncated);

        match self
            .llm
            .call_json::<InferredProfile>(&prompt, RESUME_INFER_SYSTEM)
            .await
        {
            Ok(profile) => Ok(sanitize(profile, text)),
            Err(e) => {
                warn!("LLM inference failed, using rule-based fallback: {e}");
                self.fallback.infer(text).await
            }
        }
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

/// Clamps confidences, drops out-of-range values and empty strings, and
/// dedupes skills. Section detection is always local.
fn sanitize(mut profile: InferredProfile, text: &str) -> InferredProfile {
    for field in [
        &mut profile.full_name,
        &mut profile.email,
        &mut profile.phone,
        &mut profile.location,
        &mut profile.high_school,
        &mut profile.intended_major,
    ] {
        *field = field
            .take()
            .map(|f| Inferred::new(f.value.trim().to_string(), f.confidence))
            .filter(|f| !f.value.is_empty());
    }

    profile.gpa = profile
        .gpa
        .filter(|g| (0.0..=4.0).contains(&g.value))
        .map(|g| Inferred::new(g.value, g.confidence));
    profile.graduation_year = profile
        .graduation_year
        .filter(|y| (1950..=2100).contains(&y.value))
        .map(|y| Inferred::new(y.value, y.confidence));

    let mut skills: Vec<String> = Vec::new();
    for skill in profile.skills.drain(..) {
        let skill = skill.trim().to_string();
        if !skill.is_empty() && !skills.iter().any(|s| same_skill(s, &skill)) {
            skills.push(skill);
        }
    }
    profile.skills = skills;

    profile.education.retain(|e| !e.institution.trim().is_empty());
    for record in &mut profile.education {
        record.gpa = record.gpa.filter(|g| (0.0..=4.0).contains(g));
        record.graduation_year = record
            .graduation_year
            .filter(|y| (1950..=2100).contains(y));
    }

    profile.sections_found = kinds_present(&split_sections(text));
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::infer::InferredEducation;

    #[test]
    fn test_sanitize_drops_invalid_values() {
        let raw = InferredProfile {
            full_name: Some(Inferred {
                value: "  Jane Doe ".into(),
                confidence: 1.4,
            }),
            email: Some(Inferred {
                value: "   ".into(),
                confidence: 0.9,
            }),
            gpa: Some(Inferred {
                value: 4.7,
                confidence: 0.9,
            }),
            graduation_year: Some(Inferred {
                value: 1820,
                confidence: 0.9,
            }),
            skills: vec!["Rust".into(), " rust ".into(), "".into(), "SQL".into()],
            education: vec![
                InferredEducation {
                    institution: "".into(),
                    ..Default::default()
                },
                InferredEducation {
                    institution: "Lincoln High School".into(),
                    gpa: Some(9.0),
                    graduation_year: Some(2026),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let clean = sanitize(raw, "SKILLS\nRust");
        let name = clean.full_name.unwrap();
        assert_eq!(name.value, "Jane Doe");
        assert_eq!(name.confidence, 1.0);
        assert!(clean.email.is_none());
        assert!(clean.gpa.is_none());
        assert!(clean.graduation_year.is_none());
        assert_eq!(clean.skills, vec!["Rust", "SQL"]);
        assert_eq!(clean.education.len(), 1);
        assert_eq!(clean.education[0].gpa, None);
        assert_eq!(clean.education[0].graduation_year, Some(2026));
        assert_eq!(
            clean.sections_found,
            vec![crate::ingest::sections::SectionKind::Skills]
        );
    }
}
