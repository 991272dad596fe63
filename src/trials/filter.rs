//! Local eligibility filtering applied after any successful registry fetch.
//!
//! Filtering only selects or rejects whole records; trial fields are never
//! rewritten.

use std::sync::LazyLock;

use regex::Regex;

/// Leading "<N> <unit>" of an age bound; unit defaults to years.
static AGE_BOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(year|years|month|months|day|days)?").unwrap());

/// Does `age` fall within the trial's textual age bounds?
///
/// An absent profile age always passes. Bounds like "N/A", "None" or empty
/// strings are treated as unbounded.
pub fn age_in_range(age: Option<u32>, min_age: Option<&str>, max_age: Option<&str>) -> bool {
    let Some(age) = age else {
        return true;
    };
    if let Some(min) = bound_to_years(min_age) {
        if age < min {
            return false;
        }
    }
    if let Some(max) = bound_to_years(max_age) {
        if age > max {
            return false;
        }
    }
    true
}

/// Parse "<N> Years" / "<N> Months" / "<N> Days" into whole years.
fn bound_to_years(bound: Option<&str>) -> Option<u32> {
    let s = bound?.trim().to_lowercase();
    if s.is_empty() || s == "n/a" || s == "none" {
        return None;
    }
    let caps = AGE_BOUND.captures(&s)?;
    let val: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(match caps.get(2).map(|m| m.as_str()) {
        Some(unit) if unit.starts_with("month") => val / 12,
        Some(unit) if unit.starts_with("day") => val / 365,
        _ => val,
    })
}

/// Does the profile sex satisfy the trial's gender restriction?
///
/// An absent profile sex, or an absent/"All" trial gender, always passes.
pub fn sex_matches(sex: Option<&str>, trial_gender: Option<&str>) -> bool {
    let Some(sex) = sex else {
        return true;
    };
    let gender = match trial_gender {
        Some(g) if !g.is_empty() => g,
        _ => return true,
    };
    let tg = gender.to_lowercase();
    if tg == "all" {
        return true;
    }
    matches!((sex, tg.as_str()), ("Male", "male") | ("Female", "female"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_age_always_passes() {
        assert!(age_in_range(None, Some("18 Years"), Some("65 Years")));
    }

    #[test]
    fn age_within_textual_bounds() {
        assert!(age_in_range(Some(70), Some("65 Years"), Some("N/A")));
        assert!(age_in_range(Some(18), Some("18 Years"), Some("65 Years")));
        assert!(!age_in_range(Some(17), Some("18 Years"), Some("65 Years")));
        assert!(!age_in_range(Some(66), Some("18 Years"), Some("65 Years")));
    }

    #[test]
    fn month_bounds_floor_to_years() {
        // 18 months → 1 year; an adult never passes that maximum.
        assert!(!age_in_range(Some(70), None, Some("18 Months")));
        assert!(age_in_range(Some(1), None, Some("18 Months")));
    }

    #[test]
    fn day_bounds_floor_to_years() {
        // 6570 days → 18 years.
        assert!(age_in_range(Some(18), Some("6570 Days"), None));
        assert!(!age_in_range(Some(17), Some("6570 Days"), None));
    }

    #[test]
    fn unit_defaults_to_years() {
        assert!(!age_in_range(Some(17), Some("18"), None));
        assert!(age_in_range(Some(18), Some("18"), None));
    }

    #[test]
    fn placeholder_bounds_are_unbounded() {
        assert!(age_in_range(Some(99), Some("N/A"), Some("none")));
        assert!(age_in_range(Some(99), Some(""), None));
        assert!(bound_to_years(Some("unknown")).is_none());
    }

    #[test]
    fn sex_absent_passes() {
        assert!(sex_matches(None, Some("male")));
        assert!(sex_matches(None, None));
    }

    #[test]
    fn trial_open_to_all_passes() {
        assert!(sex_matches(Some("Male"), Some("All")));
        assert!(sex_matches(Some("Female"), Some("ALL")));
        assert!(sex_matches(Some("Female"), Some("")));
        assert!(sex_matches(Some("Female"), None));
    }

    #[test]
    fn sex_must_match_exactly() {
        assert!(sex_matches(Some("Male"), Some("male")));
        assert!(sex_matches(Some("Female"), Some("FEMALE")));
        assert!(!sex_matches(Some("Female"), Some("male")));
        assert!(!sex_matches(Some("Male"), Some("female")));
    }
}
