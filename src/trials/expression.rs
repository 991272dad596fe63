//! Search-expression synthesis with domain synonym expansion.
//!
//! Terms are OR-composed: the registry's condition fields are sparse free
//! text, and AND-composition too often yields zero hits.

use crate::extract::ExtractedProfile;

/// A synonym-expansion rule: when any trigger appears in the diagnosis or
/// keywords, the rule's terms join the expression.
///
/// Hand-curated; extending coverage means adding a row, not new logic.
struct ExpansionRule {
    triggers: &'static [&'static str],
    terms: &'static [&'static str],
}

const EXPANSION_RULES: &[ExpansionRule] = &[
    ExpansionRule {
        triggers: &["breast", "ductal"],
        terms: &["\"breast cancer\"", "\"invasive ductal carcinoma\""],
    },
    ExpansionRule {
        triggers: &["her2"],
        terms: &["\"HER2 positive\"", "HER2"],
    },
    ExpansionRule {
        triggers: &["heart failure"],
        terms: &["\"heart failure\""],
    },
    ExpansionRule {
        triggers: &["hfr", "reduced ejection fraction"],
        terms: &["HFrEF", "\"reduced ejection fraction\""],
    },
];

/// Generic anchors when nothing at all was extracted.
const DEFAULT_TERMS: &[&str] = &["\"breast cancer\"", "HER2"];

/// Keywords appended to the expression at most.
const MAX_EXPRESSION_KEYWORDS: usize = 5;

/// Build the registry search expression for a profile.
pub fn build_expression(profile: &ExtractedProfile) -> String {
    let dx = profile
        .diagnosis
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let kws: Vec<String> = profile.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut terms: Vec<String> = Vec::new();

    for rule in EXPANSION_RULES {
        let triggered = rule
            .triggers
            .iter()
            .any(|t| dx.contains(t) || kws.iter().any(|k| k.contains(t)));
        if triggered {
            for term in rule.terms {
                add_term(&mut terms, term);
            }
        }
    }

    // No expansion hit — fall back to the diagnosis verbatim.
    if terms.is_empty() && !dx.is_empty() {
        add_term(&mut terms, &quote_if_multiword(&dx));
    }

    let mut seen: Vec<&str> = Vec::new();
    for kw in &kws {
        if seen.iter().any(|s| s == kw) {
            continue;
        }
        seen.push(kw);
        if seen.len() > MAX_EXPRESSION_KEYWORDS {
            break;
        }
        add_term(&mut terms, &quote_if_multiword(kw));
    }

    if terms.is_empty() {
        return DEFAULT_TERMS.join(" OR ");
    }
    terms.join(" OR ")
}

fn add_term(terms: &mut Vec<String>, term: &str) {
    if !term.is_empty() && !terms.iter().any(|t| t == term) {
        terms.push(term.to_string());
    }
}

fn quote_if_multiword(term: &str) -> String {
    if term.contains(' ') {
        format!("\"{term}\"")
    } else {
        term.to_string()
    }
}
