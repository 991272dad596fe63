use serde::{Deserialize, Serialize};

use super::SemanticError;

/// Structured clinical attributes extracted from one transcript.
///
/// Produced fresh per request and never persisted. `age` is bounded to
/// [0, 120]; `sex` is canonical `"Male"`/`"Female"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtractedProfile {
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub diagnosis: Option<String>,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
}

/// Model provider abstraction (allows mocking).
///
/// A single text-in/text-out operation keeps the multi-model retry logic
/// provider-agnostic.
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, SemanticError>;
}
