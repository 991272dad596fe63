//! LLM-based transcript extraction with pattern fallback.
//!
//! Orchestrates prompt → model candidates → JSON parse → normalization.
//! Every failure anywhere in that path degrades to the pattern extractor,
//! so callers always get a usable profile.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::age::extract_age;
use super::gemini::{GeminiClient, FALLBACK_MODELS};
use super::pattern::extract_by_pattern;
use super::prompt::build_extraction_prompt;
use super::types::{ExtractedProfile, LlmClient};
use super::SemanticError;
use crate::config::AppConfig;

/// Maximum keywords kept after normalization.
const MAX_KEYWORDS: usize = 10;
/// Maximum locations kept after normalization.
const MAX_LOCATIONS: usize = 5;
/// Plausible patient age bounds, inclusive.
const MAX_AGE: u64 = 120;

static FIRST_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,3})\b").unwrap());

/// Transcript extractor: model-backed when credentials are configured,
/// pattern-only otherwise.
pub struct SemanticExtractor {
    llm: Option<Box<dyn LlmClient + Send + Sync>>,
    model: String,
}

impl SemanticExtractor {
    /// Build from configuration. Without an API key the extractor runs
    /// pattern-only.
    pub fn from_config(config: &AppConfig) -> Self {
        let llm = config.gemini_api_key.as_deref().map(|key| {
            Box::new(GeminiClient::new(key)) as Box<dyn LlmClient + Send + Sync>
        });
        Self {
            llm,
            model: config.gemini_model.clone(),
        }
    }

    /// Build with an injected model client (tests, alternative providers).
    pub fn with_client(llm: Box<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm: Some(llm),
            model: model.to_string(),
        }
    }

    /// Extract a profile from the transcript.
    ///
    /// Never fails: any problem in the semantic path falls back to
    /// `extract_by_pattern` wholesale — partial model results are never
    /// mixed with pattern results.
    pub fn extract(&self, transcript: &str) -> ExtractedProfile {
        let Some(llm) = &self.llm else {
            tracing::debug!("no model credentials configured, using pattern extraction");
            return extract_by_pattern(transcript);
        };

        match self.extract_with_model(llm.as_ref(), transcript) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "semantic extraction failed, falling back to patterns");
                extract_by_pattern(transcript)
            }
        }
    }

    fn extract_with_model(
        &self,
        llm: &dyn LlmClient,
        transcript: &str,
    ) -> Result<ExtractedProfile, SemanticError> {
        let prompt = build_extraction_prompt(transcript);
        let raw = self.generate_with_fallback(llm, &prompt)?;

        let json = locate_json_block(&raw).ok_or(SemanticError::MissingJson)?;
        let parsed: RawProfile = serde_json::from_str(json)
            .map_err(|e| SemanticError::JsonParsing(e.to_string()))?;

        Ok(normalize(parsed, transcript))
    }

    /// Try the configured model, then each fallback; first success wins.
    fn generate_with_fallback(
        &self,
        llm: &dyn LlmClient,
        prompt: &str,
    ) -> Result<String, SemanticError> {
        let mut last_err: Option<SemanticError> = None;
        for model in self.candidate_models() {
            match llm.generate(&model, prompt) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "model candidate failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(SemanticError::AllModelsFailed(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidates attempted".into()),
        ))
    }

    fn candidate_models(&self) -> Vec<String> {
        let mut models = vec![self.model.clone()];
        for m in FALLBACK_MODELS {
            if !models.iter().any(|c| c == m) {
                models.push((*m).to_string());
            }
        }
        models
    }
}

/// Model output with the five expected keys, parsed leniently — field
/// types the model got wrong are normalized or dropped, not errors.
#[derive(Deserialize, Default)]
struct RawProfile {
    #[serde(default)]
    age: Option<Value>,
    #[serde(default)]
    sex: Option<Value>,
    #[serde(default)]
    diagnosis: Option<Value>,
    #[serde(default)]
    keywords: Vec<Value>,
    #[serde(default)]
    locations: Vec<Value>,
}

/// Locate the outermost `{...}` block: models add surrounding prose
/// despite the JSON-only instruction.
fn locate_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn normalize(raw: RawProfile, transcript: &str) -> ExtractedProfile {
    let sex = raw
        .sex
        .as_ref()
        .and_then(Value::as_str)
        .and_then(normalize_sex);

    let age = raw
        .age
        .as_ref()
        .and_then(normalize_age)
        // Model missed the age — backfill from the transcript text.
        .or_else(|| extract_age(transcript).0);

    let diagnosis = raw
        .diagnosis
        .as_ref()
        .and_then(Value::as_str)
        .map(str::to_string);

    ExtractedProfile {
        age,
        sex,
        diagnosis,
        keywords: string_items(&raw.keywords, MAX_KEYWORDS),
        locations: string_items(&raw.locations, MAX_LOCATIONS),
    }
}

/// "female" first — it contains "male" as a substring.
fn normalize_sex(s: &str) -> Option<String> {
    let lower = s.to_lowercase();
    if lower.contains("female") {
        Some("Female".to_string())
    } else if lower.contains("male") {
        Some("Male".to_string())
    } else {
        None
    }
}

/// Accept a JSON number or a string like "58-year-old"; bound to [0, 120].
fn normalize_age(value: &Value) -> Option<u32> {
    let age = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => FIRST_INT
            .captures(s)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())?,
        _ => return None,
    };
    (age <= MAX_AGE).then(|| age as u32)
}

/// Keep string entries, skip anything else the model invented.
fn string_items(values: &[Value], cap: usize) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::gemini::MockLlmClient;

    const TRANSCRIPT: &str =
        "68-year-old male diagnosed with HER2-positive invasive ductal carcinoma.";

    fn model_json() -> &'static str {
        r#"{
            "age": 68,
            "sex": "Male",
            "diagnosis": "HER2-positive invasive ductal carcinoma",
            "keywords": ["her2", "adjuvant"],
            "locations": ["Boston"]
        }"#
    }

    fn extractor_with(mock: MockLlmClient) -> SemanticExtractor {
        SemanticExtractor::with_client(Box::new(mock), "gemini-2.5-flash")
    }

    #[test]
    fn no_credentials_delegates_to_patterns() {
        let extractor = SemanticExtractor::from_config(&AppConfig::without_credentials());
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile, extract_by_pattern(TRANSCRIPT));
    }

    #[test]
    fn strict_json_response_is_parsed() {
        let extractor = extractor_with(MockLlmClient::new(model_json()));
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile.age, Some(68));
        assert_eq!(profile.sex.as_deref(), Some("Male"));
        assert_eq!(
            profile.diagnosis.as_deref(),
            Some("HER2-positive invasive ductal carcinoma"),
        );
        assert_eq!(profile.keywords, vec!["her2", "adjuvant"]);
        assert_eq!(profile.locations, vec!["Boston"]);
    }

    #[test]
    fn json_surrounded_by_prose_is_parsed() {
        let response = format!("Here is the extraction:\n\n{}\n\nLet me know!", model_json());
        let extractor = extractor_with(MockLlmClient::new(&response));
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile.age, Some(68));
        assert_eq!(profile.locations, vec!["Boston"]);
    }

    #[test]
    fn garbage_response_falls_back_to_patterns() {
        let extractor = extractor_with(MockLlmClient::new("I cannot help with that."));
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile, extract_by_pattern(TRANSCRIPT));
    }

    #[test]
    fn malformed_json_falls_back_to_patterns() {
        let extractor = extractor_with(MockLlmClient::new("{not valid json}"));
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile, extract_by_pattern(TRANSCRIPT));
    }

    #[test]
    fn first_failing_model_advances_to_next_candidate() {
        let mock = MockLlmClient::new(model_json()).failing_for(&["gemini-2.5-flash"]);
        let extractor = extractor_with(mock);
        let profile = extractor.extract(TRANSCRIPT);
        // Second candidate served the request.
        assert_eq!(profile.age, Some(68));
        assert_eq!(profile.locations, vec!["Boston"]);
    }

    #[test]
    fn all_models_failing_falls_back_to_patterns() {
        let extractor = extractor_with(MockLlmClient::always_failing());
        let profile = extractor.extract(TRANSCRIPT);
        assert_eq!(profile, extract_by_pattern(TRANSCRIPT));
    }

    #[test]
    fn configured_model_is_not_tried_twice() {
        let extractor = extractor_with(MockLlmClient::new("{}"));
        let candidates = extractor.candidate_models();
        assert_eq!(candidates[0], "gemini-2.5-flash");
        assert_eq!(
            candidates.len(),
            FALLBACK_MODELS.len(),
            "configured model duplicates a fallback entry",
        );
    }

    #[test]
    fn age_as_string_is_normalized() {
        let response = r#"{"age": "58-year-old", "sex": null, "diagnosis": null, "keywords": [], "locations": []}"#;
        let extractor = extractor_with(MockLlmClient::new(response));
        let profile = extractor.extract("no age here");
        assert_eq!(profile.age, Some(58));
    }

    #[test]
    fn out_of_range_age_is_backfilled_from_text() {
        let response = r#"{"age": 300, "sex": null, "diagnosis": null, "keywords": [], "locations": []}"#;
        let extractor = extractor_with(MockLlmClient::new(response));
        let profile = extractor.extract("the patient is a 68-year-old");
        assert_eq!(profile.age, Some(68));
    }

    #[test]
    fn missing_age_is_backfilled_from_text() {
        let response = r#"{"age": null, "sex": "Female", "diagnosis": null, "keywords": [], "locations": []}"#;
        let extractor = extractor_with(MockLlmClient::new(response));
        let profile = extractor.extract("aged 74, here for follow-up");
        assert_eq!(profile.age, Some(74));
        assert_eq!(profile.sex.as_deref(), Some("Female"));
    }

    #[test]
    fn sex_casing_is_canonicalized() {
        assert_eq!(normalize_sex("FEMALE").as_deref(), Some("Female"));
        assert_eq!(normalize_sex("male patient").as_deref(), Some("Male"));
        assert_eq!(normalize_sex("unknown"), None);
    }

    #[test]
    fn keyword_and_location_caps() {
        let keywords: Vec<String> = (0..15).map(|i| format!("\"kw{i}\"")).collect();
        let response = format!(
            r#"{{"age": null, "sex": null, "diagnosis": null, "keywords": [{}], "locations": ["A","B","C","D","E","F","G"]}}"#,
            keywords.join(","),
        );
        let extractor = extractor_with(MockLlmClient::new(&response));
        let profile = extractor.extract("text");
        assert_eq!(profile.keywords.len(), 10);
        assert_eq!(profile.locations.len(), 5);
    }

    #[test]
    fn non_string_list_items_are_skipped() {
        let response = r#"{"age": null, "sex": null, "diagnosis": null, "keywords": ["her2", 42, null], "locations": []}"#;
        let extractor = extractor_with(MockLlmClient::new(response));
        let profile = extractor.extract("text");
        assert_eq!(profile.keywords, vec!["her2"]);
    }

    #[test]
    fn locate_json_block_spans_first_to_last_brace() {
        assert_eq!(locate_json_block("abc {\"a\": {\"b\": 1}} def"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(locate_json_block("no braces"), None);
        assert_eq!(locate_json_block("} reversed {"), None);
    }
}
