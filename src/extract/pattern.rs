//! Pattern-based transcript extraction — the fallback of last resort.
//!
//! Pure text heuristics, no I/O. Runs whenever the semantic extractor is
//! unconfigured or fails, so it must always produce a usable profile.

use std::sync::LazyLock;

use regex::Regex;

use super::age::extract_age;
use super::types::ExtractedProfile;

/// Fixed staging/biomarker/therapy vocabulary scanned for keywords.
const KEYWORD_VOCABULARY: &[&str] = &[
    "stage ii",
    "stage iii",
    "metastatic",
    "recurrent",
    "adjuvant",
    "neoadjuvant",
    "immunotherapy",
    "chemo",
    "radiation",
    "biomarker",
    "egfr",
    "alk",
    "brca",
    "pd-l1",
    "her2",
    // Cardiology
    "heart failure",
    "hfref",
    "reduced ejection fraction",
    "nyha",
    "sglt2",
];

/// Locations kept per profile.
const MAX_LOCATIONS: usize = 3;

static SEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(male|female|man|woman)\b").unwrap());

static DIAGNOSIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"diagnos(?:is|ed)\s*(?:with)?\s*([\w\s\-]+?)(?:\.|,|;|$)").unwrap()
});

static HFREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bhfref\b").unwrap());

/// Capitalized one- or two-word phrases after "in"/"at".
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(in|at)\s+([A-Z][a-zA-Z]+(?:\s[A-Z][a-zA-Z]+)*)\b").unwrap());

/// Extract a profile from `text` using text patterns only.
pub fn extract_by_pattern(text: &str) -> ExtractedProfile {
    let lower = text.to_lowercase();

    let (age, _) = extract_age(text);

    let sex = SEX
        .captures(&lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize_sex(m.as_str()));

    let diagnosis = DIAGNOSIS
        .captures(&lower)
        .and_then(|caps| caps.get(1))
        .map(|m| title_case(m.as_str().trim()))
        .or_else(|| cardiology_diagnosis(&lower));

    let keywords: Vec<String> = KEYWORD_VOCABULARY
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    let mut locations: Vec<String> = Vec::new();
    for caps in LOCATION.captures_iter(text) {
        let Some(loc) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };
        if loc.len() > 2 && !locations.iter().any(|l| l == loc) {
            locations.push(loc.to_string());
        }
    }
    locations.truncate(MAX_LOCATIONS);

    ExtractedProfile {
        age,
        sex,
        diagnosis,
        keywords,
        locations,
    }
}

fn normalize_sex(s: &str) -> Option<String> {
    match s {
        "male" | "man" => Some("Male".to_string()),
        "female" | "woman" => Some("Female".to_string()),
        _ => None,
    }
}

/// Diagnosis heuristics for transcripts without an explicit "diagnosed
/// with" phrase.
fn cardiology_diagnosis(lower: &str) -> Option<String> {
    if !lower.contains("heart failure") {
        return None;
    }
    if lower.contains("reduced ejection fraction") || HFREF.is_match(lower) {
        Some("Heart failure with reduced ejection fraction (HFrEF)".to_string())
    } else {
        Some("Heart failure".to_string())
    }
}

/// Capitalize the first letter of each alphabetic run, lowercasing the
/// rest ("her2-positive" → "Her2-Positive").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
