// Resume inference LLM prompt templates.

pub const RESUME_INFER_SYSTEM: &str = "\
You are a precise resume data extractor for a college admissions platform. \
You MUST respond with valid JSON only, with no markdown fences and no explanations. \
Only report values that appear in the document. Never guess or invent details. \
Set confidence between 0 and 1 to reflect how clearly the value is stated.";

pub const RESUME_INFER_PROMPT: &str = r#"Extract structured profile fields from the following resume text.

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure, use null for absent values):
{
  "full_name": {"value": "string", "confidence": 0.0} | null,
  "email": {"value": "string", "confidence": 0.0} | null,
  "phone": {"value": "string", "confidence": 0.0} | null,
  "location": {"value": "City, ST", "confidence": 0.0} | null,
  "high_school": {"value": "string", "confidence": 0.0} | null,
  "gpa": {"value": 0.0, "confidence": 0.0} | null,          // normalized to a 4.0 scale
  "graduation_year": {"value": 2026, "confidence": 0.0} | null,
  "intended_major": {"value": "string", "confidence": 0.0} | null,
  "skills": ["string"],
  "education": [
    {"institution": "string", "degree": "string" | null, "field_of_study": "string" | null,
     "gpa": 0.0 | null, "graduation_year": 2026 | null}
  ]
}"#;
