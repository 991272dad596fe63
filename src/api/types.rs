//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::extract::ExtractedProfile;
use crate::trials::{QueryResult, RegistryUrls};

/// Shared context for all API routes.
///
/// Configuration is read-only after startup; the registry URLs are only
/// overridden by tests pointing at local stand-ins.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AppConfig>,
    pub registry_urls: RegistryUrls,
}

impl ApiContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry_urls: RegistryUrls::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_registry_urls(config: AppConfig, registry_urls: RegistryUrls) -> Self {
        Self {
            config: Arc::new(config),
            registry_urls,
        }
    }
}

/// Request body for `/api/extract` and `/api/match`.
#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub extracted: ExtractedProfile,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub extracted: ExtractedProfile,
    pub results: QueryResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_defaults_to_empty_when_missing() {
        let req: TranscriptRequest = serde_json::from_str("{}").unwrap();
        assert!(req.transcript.is_empty());
    }

    #[test]
    fn context_uses_real_registry_by_default() {
        let ctx = ApiContext::new(AppConfig::without_credentials());
        assert!(ctx.registry_urls.study_fields.contains("clinicaltrials.gov"));
    }
}
