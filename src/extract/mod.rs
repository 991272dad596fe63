pub mod age;
pub mod gemini;
pub mod pattern;
pub mod prompt;
pub mod semantic;
pub mod types;

pub use age::extract_age;
pub use gemini::{GeminiClient, MockLlmClient};
pub use pattern::extract_by_pattern;
pub use semantic::SemanticExtractor;
pub use types::{ExtractedProfile, LlmClient};

use thiserror::Error;

/// Failures internal to the semantic extraction path.
///
/// None of these ever crosses the pipeline boundary: every variant
/// degrades to the pattern extractor.
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Cannot reach the model provider at {0}")]
    Connection(String),

    #[error("Model provider returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model response contained no candidates")]
    EmptyResponse,

    #[error("No JSON object in model response")]
    MissingJson,

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("No model candidate succeeded: {0}")]
    AllModelsFailed(String),
}
