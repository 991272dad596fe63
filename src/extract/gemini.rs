use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::SemanticError;

/// Model identifiers tried after the configured model, in order.
pub const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-latest",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upstream call timeout, seconds.
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Gemini HTTP client for hosted model inference.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Client against a specific base URL — used by tests to point at a
    /// local stand-in.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Request body for models/{model}:generateContent
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Low-temperature, near-deterministic sampling for extraction.
#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
        }
    }
}

/// Response body from models/{model}:generateContent
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl LlmClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, SemanticError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key,
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                SemanticError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                SemanticError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                SemanticError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SemanticError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| SemanticError::ResponseParsing(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SemanticError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Mock model client for testing — configurable response and per-model
/// failures.
pub struct MockLlmClient {
    response: String,
    failing_models: Vec<String>,
    fail_all: bool,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failing_models: Vec::new(),
            fail_all: false,
        }
    }

    /// Mock where every model candidate fails.
    pub fn always_failing() -> Self {
        Self {
            response: String::new(),
            failing_models: Vec::new(),
            fail_all: true,
        }
    }

    /// Make specific model identifiers fail; the rest succeed.
    pub fn failing_for(mut self, models: &[&str]) -> Self {
        self.failing_models = models.iter().map(|m| m.to_string()).collect();
        self
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, model: &str, _prompt: &str) -> Result<String, SemanticError> {
        if self.fail_all || self.failing_models.iter().any(|m| m == model) {
            return Err(SemanticError::Provider {
                status: 503,
                body: format!("mock failure for {model}"),
            });
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = GeminiClient::with_base_url("http://localhost:9999/", "key");
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.timeout_secs, REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn request_body_carries_sampling_params() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.2);
        assert_eq!(json["generationConfig"]["topP"], 0.9);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn response_parts_are_concatenated() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"age\": "}, {"text": "68}"}]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "{\"age\": 68}");
    }

    #[test]
    fn empty_candidates_parse_to_empty() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn generate_fails_on_unreachable_host() {
        let client = GeminiClient::with_base_url("http://127.0.0.1:9", "key");
        let result = client.generate("gemini-2.5-flash", "prompt");
        assert!(result.is_err());
    }

    #[test]
    fn mock_returns_configured_response() {
        let mock = MockLlmClient::new("{\"age\": 42}");
        assert_eq!(mock.generate("any", "prompt").unwrap(), "{\"age\": 42}");
    }

    #[test]
    fn mock_fails_for_selected_models() {
        let mock = MockLlmClient::new("ok").failing_for(&["gemini-2.5-flash"]);
        assert!(mock.generate("gemini-2.5-flash", "p").is_err());
        assert_eq!(mock.generate("gemini-1.5-pro", "p").unwrap(), "ok");
    }

    #[test]
    fn always_failing_mock_fails_everywhere() {
        let mock = MockLlmClient::always_failing();
        assert!(mock.generate("gemini-2.5-flash", "p").is_err());
        assert!(mock.generate("gemini-1.5-pro", "p").is_err());
    }

    #[test]
    fn fallback_model_order() {
        assert_eq!(FALLBACK_MODELS[0], "gemini-2.5-flash");
        assert_eq!(*FALLBACK_MODELS.last().unwrap(), "gemini-1.5-pro");
    }
}
