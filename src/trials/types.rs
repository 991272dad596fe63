use serde::{Deserialize, Serialize};

/// Normalized trial record.
///
/// The legacy study_fields shape — every field a list of strings — is the
/// canonical wire form; both fallback schemas are mapped into it. Field
/// lists may be empty, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CanonicalTrialRecord {
    #[serde(rename = "NCTId", default)]
    pub nct_id: Vec<String>,
    #[serde(rename = "BriefTitle", default)]
    pub brief_title: Vec<String>,
    #[serde(rename = "Condition", default)]
    pub condition: Vec<String>,
    #[serde(rename = "OverallStatus", default)]
    pub overall_status: Vec<String>,
    #[serde(rename = "BriefSummary", default)]
    pub brief_summary: Vec<String>,
    #[serde(rename = "LocationCity", default)]
    pub location_city: Vec<String>,
    #[serde(rename = "LocationState", default)]
    pub location_state: Vec<String>,
    #[serde(rename = "LocationCountry", default)]
    pub location_country: Vec<String>,
    #[serde(rename = "Gender", default)]
    pub gender: Vec<String>,
    #[serde(rename = "MinimumAge", default)]
    pub minimum_age: Vec<String>,
    #[serde(rename = "MaximumAge", default)]
    pub maximum_age: Vec<String>,
    #[serde(rename = "Phase", default)]
    pub phase: Vec<String>,
    #[serde(rename = "StudyType", default)]
    pub study_type: Vec<String>,
    #[serde(rename = "InterventionName", default)]
    pub intervention_name: Vec<String>,
    #[serde(rename = "DetailedDescription", default)]
    pub detailed_description: Vec<String>,
    #[serde(rename = "EligibilityCriteria", default)]
    pub eligibility_criteria: Vec<String>,
}

impl CanonicalTrialRecord {
    /// Trial gender, from the first element of the list-valued field.
    pub fn primary_gender(&self) -> Option<&str> {
        self.gender.first().map(String::as_str)
    }

    pub fn min_age_bound(&self) -> Option<&str> {
        self.minimum_age.first().map(String::as_str)
    }

    pub fn max_age_bound(&self) -> Option<&str> {
        self.maximum_age.first().map(String::as_str)
    }
}

/// Result of one registry query, returned per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub expr: String,
    pub count: usize,
    pub studies: Vec<CanonicalTrialRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
