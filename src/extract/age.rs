//! Age extraction from free text.
//!
//! "68-year-old" and "aged 68" anchor to the patient's current age, while
//! a bare "10 years" often describes a duration ("quit smoking 10 years
//! ago") and is only trusted when nothing more specific occurs earlier.

use std::sync::LazyLock;

use regex::Regex;

/// Plausible patient age bounds, inclusive.
const MAX_AGE: u32 = 120;

/// Specific forms: "68-year-old", "68 yrs old".
static YEAR_OLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*[- ]?(?:year|yr)s?[- ]?old\b").unwrap());

/// Specific form: "aged 68".
static AGED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\baged\s*(\d{1,3})\b").unwrap());

/// Generic forms: "58 years", "58 yo", "58 y/o".
static YEARS_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*(?:years?|yo|y/o)\b").unwrap());

/// Candidate age mention, ranked by text position then specificity.
#[derive(Debug)]
struct AgeMatch {
    position: usize,
    age: u32,
    is_specific: bool,
}

/// Find the most reliable age mention in `text`.
///
/// Returns `(age, is_specific)`. The earliest mention wins; on a position
/// tie a specific phrasing beats a generic one. Ages outside [0, 120] are
/// treated as absent (the specificity flag of the rejected candidate is
/// still reported).
pub fn extract_age(text: &str) -> (Option<u32>, bool) {
    let lower = text.to_lowercase();
    let mut matches: Vec<AgeMatch> = Vec::new();

    for (pattern, is_specific) in [
        (&*YEAR_OLD, true),
        (&*AGED, true),
        (&*YEARS_GENERIC, false),
    ] {
        for caps in pattern.captures_iter(&lower) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Ok(age) = digits.as_str().parse::<u32>() else {
                continue;
            };
            matches.push(AgeMatch {
                position: whole.start(),
                age,
                is_specific,
            });
        }
    }

    // Earliest occurrence first; specific wins a position tie.
    matches.sort_by_key(|m| (m.position, !m.is_specific));

    match matches.first() {
        None => (None, false),
        Some(m) if m.age > MAX_AGE => (None, m.is_specific),
        Some(m) => (Some(m.age), m.is_specific),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_old_form_is_specific() {
        assert_eq!(extract_age("a 68-year-old man"), (Some(68), true));
        assert_eq!(extract_age("a 68 year old man"), (Some(68), true));
        assert_eq!(extract_age("a 68 yrs old man"), (Some(68), true));
    }

    #[test]
    fn aged_form_is_specific() {
        assert_eq!(extract_age("patient aged 74 presented"), (Some(74), true));
        assert_eq!(extract_age("Aged 74."), (Some(74), true));
    }

    #[test]
    fn generic_forms_are_not_specific() {
        assert_eq!(extract_age("she is 58 years"), (Some(58), false));
        assert_eq!(extract_age("58 yo female"), (Some(58), false));
        assert_eq!(extract_age("58 y/o female"), (Some(58), false));
    }

    #[test]
    fn specific_beats_later_duration() {
        let (age, specific) =
            extract_age("The 68-year-old patient quit smoking 10 years ago.");
        assert_eq!(age, Some(68));
        assert!(specific);
    }

    #[test]
    fn earliest_mention_wins() {
        // Position decides first; a later specific mention does not override
        // an earlier generic one.
        let (age, specific) = extract_age("smoked for 30 years; the 68-year-old denies chest pain");
        assert_eq!(age, Some(30));
        assert!(!specific);
    }

    #[test]
    fn position_tie_prefers_specific() {
        // "68 years old" matches both the specific and the generic family
        // at the same offset.
        assert_eq!(extract_age("68 years old male"), (Some(68), true));
    }

    #[test]
    fn out_of_range_age_is_absent() {
        let (age, specific) = extract_age("a 150-year-old oak tree");
        assert_eq!(age, None);
        assert!(specific);
        assert_eq!(extract_age("aged 121").0, None);
    }

    #[test]
    fn boundary_ages_accepted() {
        assert_eq!(extract_age("aged 0").0, Some(0));
        assert_eq!(extract_age("aged 120").0, Some(120));
    }

    #[test]
    fn no_mention_returns_absent() {
        assert_eq!(extract_age("no age in this sentence"), (None, false));
    }
}
