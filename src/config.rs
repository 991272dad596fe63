use std::env;

/// Application-level constants
pub const APP_NAME: &str = "TrialScout";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Process-wide configuration, loaded once at startup.
///
/// Passed explicitly into the pipeline — business logic never reads the
/// environment directly, which keeps the extractor testable with injected
/// configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. `None` means the semantic extractor is disabled and
    /// every request degrades to the pattern extractor.
    pub gemini_api_key: Option<String>,
    /// Preferred Gemini model, tried before the built-in fallback list.
    pub gemini_model: String,
    /// HTTP listen port.
    pub port: u16,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PORT: u16 = 8000;

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// An empty `GEMINI_API_KEY` counts as absent. A malformed `PORT`
    /// falls back to the default rather than failing startup.
    pub fn from_env() -> Self {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let gemini_model = env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            gemini_api_key,
            gemini_model,
            port,
        }
    }

    /// Config with no credentials — pattern extraction only.
    pub fn without_credentials() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_trialscout() {
        assert_eq!(APP_NAME, "TrialScout");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn without_credentials_has_no_key() {
        let config = AppConfig::without_credentials();
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn default_log_filter_scopes_crate() {
        let filter = default_log_filter();
        assert!(filter.contains("trialscout=debug"));
    }
}
