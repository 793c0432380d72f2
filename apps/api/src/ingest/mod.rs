//! Resume ingestion: uploaded document → text → inferred fields → profile merge.

pub mod docx;
pub mod extract;
pub mod handlers;
pub mod infer;
pub mod llm_inferencer;
pub mod merge;
pub mod pending;
pub mod prompts;
pub mod sections;
pub mod storage;
