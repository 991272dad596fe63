pub mod expression;
pub mod filter;
pub mod registry;
pub mod types;

pub use expression::build_expression;
pub use filter::{age_in_range, sex_matches};
pub use registry::{RegistryClient, RegistryUrls, DEFAULT_MAX_ROWS};
pub use types::{CanonicalTrialRecord, QueryResult};

use thiserror::Error;

/// Per-endpoint failures in the registry fallback chain.
///
/// Any variant advances the chain to the next endpoint; only the
/// all-endpoints-failed aggregate becomes user-visible.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Cannot reach the registry at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Registry returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
