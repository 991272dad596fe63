//! ClinicalTrials.gov query engine — three-endpoint fallback chain.
//!
//! The legacy field-query endpoint is tried first; each failure advances
//! to the next, structurally different endpoint. Every response shape is
//! normalized into [`CanonicalTrialRecord`] before local eligibility
//! filtering, so downstream code never sees an upstream schema.

use serde::Deserialize;

use super::expression::build_expression;
use super::filter::{age_in_range, sex_matches};
use super::types::{CanonicalTrialRecord, QueryResult};
use super::RegistryError;
use crate::extract::ExtractedProfile;

/// Legacy field-query endpoint (primary).
pub const STUDY_FIELDS_URL: &str =
    "https://classic.clinicaltrials.gov/api/query/study_fields";
/// Legacy full-study endpoint (first fallback).
pub const FULL_STUDIES_URL: &str =
    "https://classic.clinicaltrials.gov/api/query/full_studies";
/// Current versioned endpoint (second fallback).
pub const V2_STUDIES_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Rows requested from the registry per query.
pub const DEFAULT_MAX_ROWS: u32 = 30;

/// Studies returned to the caller at most.
const MAX_STUDIES: usize = 15;

/// Upstream call timeout, seconds.
const REQUEST_TIMEOUT_SECS: u64 = 20;

const USER_AGENT: &str = concat!("TrialScout/", env!("CARGO_PKG_VERSION"));

/// Fields requested from the study_fields endpoint.
const STUDY_FIELDS: &[&str] = &[
    "NCTId",
    "BriefTitle",
    "Condition",
    "OverallStatus",
    "BriefSummary",
    "LocationCity",
    "LocationState",
    "LocationCountry",
    "Gender",
    "MinimumAge",
    "MaximumAge",
    "Phase",
    "StudyType",
    "InterventionName",
    "DetailedDescription",
    "EligibilityCriteria",
];

const UNFILTERED_NOTE: &str =
    "No trials passed local age/sex filters; showing top unfiltered results.";

/// The three registry schemas, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    StudyFields,
    FullStudies,
    V2Studies,
}

impl Endpoint {
    /// Label used in the combined failure message.
    fn label(self) -> &'static str {
        match self {
            Endpoint::StudyFields => "study_fields",
            Endpoint::FullStudies => "full_studies",
            Endpoint::V2Studies => "v2",
        }
    }
}

/// Registry endpoint URLs, overridable so tests can point at local
/// stand-ins.
#[derive(Debug, Clone)]
pub struct RegistryUrls {
    pub study_fields: String,
    pub full_studies: String,
    pub v2_studies: String,
}

impl Default for RegistryUrls {
    fn default() -> Self {
        Self {
            study_fields: STUDY_FIELDS_URL.to_string(),
            full_studies: FULL_STUDIES_URL.to_string(),
            v2_studies: V2_STUDIES_URL.to_string(),
        }
    }
}

/// Blocking client for the trials registry.
pub struct RegistryClient {
    client: reqwest::blocking::Client,
    urls: RegistryUrls,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::with_urls(RegistryUrls::default())
    }

    pub fn with_urls(urls: RegistryUrls) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, urls }
    }

    /// Query the registry for trials matching the profile.
    ///
    /// Builds the search expression, walks the endpoint chain until one
    /// fetch succeeds, then applies local age/sex filtering. Only when all
    /// three endpoints fail does the result carry an `error`.
    pub fn query_trials(&self, profile: &ExtractedProfile, max_rows: u32) -> QueryResult {
        let expr = build_expression(profile);
        let mut failures: Vec<String> = Vec::new();

        for endpoint in [
            Endpoint::StudyFields,
            Endpoint::FullStudies,
            Endpoint::V2Studies,
        ] {
            match self.fetch(endpoint, &expr, max_rows) {
                Ok(records) => {
                    tracing::debug!(
                        endpoint = endpoint.label(),
                        fetched = records.len(),
                        "registry fetch succeeded"
                    );
                    return finalize(expr, records, profile, self.result_endpoint(endpoint));
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = endpoint.label(),
                        error = %e,
                        "registry endpoint failed, trying next"
                    );
                    failures.push(format!("{} error: {}", endpoint.label(), e));
                }
            }
        }

        QueryResult {
            expr,
            count: 0,
            studies: vec![],
            endpoint: Some(self.urls.v2_studies.clone()),
            note: None,
            error: Some(failures.join("; ")),
        }
    }

    /// Endpoint reported back to the caller: the primary is implicit,
    /// fallbacks are named.
    fn result_endpoint(&self, endpoint: Endpoint) -> Option<String> {
        match endpoint {
            Endpoint::StudyFields => None,
            Endpoint::FullStudies => Some(self.urls.full_studies.clone()),
            Endpoint::V2Studies => Some(self.urls.v2_studies.clone()),
        }
    }

    fn fetch(
        &self,
        endpoint: Endpoint,
        expr: &str,
        max_rows: u32,
    ) -> Result<Vec<CanonicalTrialRecord>, RegistryError> {
        match endpoint {
            Endpoint::StudyFields => {
                let envelope: StudyFieldsEnvelope = self.get(
                    &self.urls.study_fields,
                    &[
                        ("expr", expr.to_string()),
                        ("fields", STUDY_FIELDS.join(",")),
                        ("min_rnk", "1".to_string()),
                        ("max_rnk", max_rows.to_string()),
                        ("fmt", "json".to_string()),
                    ],
                )?;
                Ok(envelope.response.study_fields)
            }
            Endpoint::FullStudies => {
                let envelope: FullStudiesEnvelope = self.get(
                    &self.urls.full_studies,
                    &[
                        ("expr", expr.to_string()),
                        ("min_rnk", "1".to_string()),
                        ("max_rnk", max_rows.to_string()),
                        ("fmt", "json".to_string()),
                    ],
                )?;
                Ok(envelope
                    .response
                    .full_studies
                    .into_iter()
                    .map(|item| map_legacy_study(item.study))
                    .collect())
            }
            Endpoint::V2Studies => {
                let envelope: V2Envelope = self.get(
                    &self.urls.v2_studies,
                    &[
                        ("query.term", expr.to_string()),
                        ("pageSize", max_rows.to_string()),
                    ],
                )?;
                Ok(envelope.studies.into_iter().map(map_v2_study).collect())
            }
        }
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, RegistryError> {
        let response = self.client.get(url).query(query).send().map_err(|e| {
            if e.is_connect() {
                RegistryError::Connection(url.to_string())
            } else if e.is_timeout() {
                RegistryError::Timeout(REQUEST_TIMEOUT_SECS)
            } else {
                RegistryError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| RegistryError::ResponseParsing(e.to_string()))
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter, apply the empty-after-filter fallback, truncate.
///
/// Filtering never mutates records: it only selects or rejects them
/// whole. When the filters reject everything a non-empty fetch returned,
/// the top unfiltered records go back with an advisory note instead of a
/// blank result set.
fn finalize(
    expr: String,
    records: Vec<CanonicalTrialRecord>,
    profile: &ExtractedProfile,
    endpoint: Option<String>,
) -> QueryResult {
    let filtered: Vec<CanonicalTrialRecord> = records
        .iter()
        .filter(|r| {
            age_in_range(profile.age, r.min_age_bound(), r.max_age_bound())
                && sex_matches(profile.sex.as_deref(), r.primary_gender())
        })
        .cloned()
        .collect();

    if filtered.is_empty() && !records.is_empty() {
        let studies: Vec<CanonicalTrialRecord> =
            records.into_iter().take(MAX_STUDIES).collect();
        return QueryResult {
            expr,
            count: studies.len(),
            studies,
            endpoint,
            note: Some(UNFILTERED_NOTE.to_string()),
            error: None,
        };
    }

    let count = filtered.len();
    QueryResult {
        expr,
        count,
        studies: filtered.into_iter().take(MAX_STUDIES).collect(),
        endpoint,
        note: None,
        error: None,
    }
}

// ──────────────────────────────────────────────
// Legacy study_fields schema
// ──────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct StudyFieldsEnvelope {
    #[serde(rename = "StudyFieldsResponse", default)]
    response: StudyFieldsResponse,
}

#[derive(Deserialize, Default)]
struct StudyFieldsResponse {
    #[serde(rename = "StudyFields", default)]
    study_fields: Vec<CanonicalTrialRecord>,
}

// ──────────────────────────────────────────────
// Legacy full_studies schema
// ──────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct FullStudiesEnvelope {
    #[serde(rename = "FullStudiesResponse", default)]
    response: FullStudiesResponse,
}

#[derive(Deserialize, Default)]
struct FullStudiesResponse {
    #[serde(rename = "FullStudies", default)]
    full_studies: Vec<FullStudyItem>,
}

#[derive(Deserialize, Default)]
struct FullStudyItem {
    #[serde(rename = "Study", default)]
    study: FullStudy,
}

#[derive(Deserialize, Default)]
struct FullStudy {
    #[serde(rename = "ProtocolSection", default)]
    protocol: LegacyProtocolSection,
}

#[derive(Deserialize, Default)]
struct LegacyProtocolSection {
    #[serde(rename = "IdentificationModule", default)]
    identification: LegacyIdentification,
    #[serde(rename = "DescriptionModule", default)]
    description: LegacyDescription,
    #[serde(rename = "StatusModule", default)]
    status: LegacyStatus,
    #[serde(rename = "DesignModule", default)]
    design: LegacyDesign,
    #[serde(rename = "EligibilityModule", default)]
    eligibility: LegacyEligibility,
    #[serde(rename = "ContactsLocationsModule", default)]
    contacts: LegacyContacts,
    #[serde(rename = "ConditionsModule", default)]
    conditions: LegacyConditions,
    #[serde(rename = "InterventionsModule", default)]
    interventions: LegacyInterventions,
}

#[derive(Deserialize, Default)]
struct LegacyIdentification {
    #[serde(rename = "NCTId")]
    nct_id: Option<String>,
    #[serde(rename = "BriefTitle")]
    brief_title: Option<String>,
    #[serde(rename = "OfficialTitle")]
    official_title: Option<String>,
}

#[derive(Deserialize, Default)]
struct LegacyDescription {
    #[serde(rename = "BriefSummary")]
    brief_summary: Option<String>,
}

#[derive(Deserialize, Default)]
struct LegacyStatus {
    #[serde(rename = "OverallStatus")]
    overall_status: Option<String>,
}

#[derive(Deserialize, Default)]
struct LegacyDesign {
    #[serde(rename = "PhaseList", default)]
    phase_list: LegacyPhaseList,
    #[serde(rename = "StudyType")]
    study_type: Option<String>,
}

#[derive(Deserialize, Default)]
struct LegacyPhaseList {
    #[serde(rename = "Phase", default)]
    phase: Option<PhaseValue>,
}

/// The legacy API serves Phase as either a single string or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhaseValue {
    One(String),
    Many(Vec<String>),
}

impl PhaseValue {
    fn into_vec(self) -> Vec<String> {
        match self {
            PhaseValue::One(s) => vec![s],
            PhaseValue::Many(v) => v,
        }
    }
}

#[derive(Deserialize, Default)]
struct LegacyEligibility {
    #[serde(rename = "Gender")]
    gender: Option<String>,
    #[serde(rename = "MinimumAge")]
    minimum_age: Option<String>,
    #[serde(rename = "MaximumAge")]
    maximum_age: Option<String>,
}

#[derive(Deserialize, Default)]
struct LegacyContacts {
    #[serde(rename = "LocationList", default)]
    location_list: LegacyLocationList,
}

#[derive(Deserialize, Default)]
struct LegacyLocationList {
    #[serde(rename = "Location", default)]
    locations: Vec<LegacyLocation>,
}

#[derive(Deserialize, Default)]
struct LegacyLocation {
    #[serde(rename = "Facility", default)]
    facility: LegacyFacility,
}

#[derive(Deserialize, Default)]
struct LegacyFacility {
    #[serde(rename = "Location", default)]
    location: LocationDetail,
}

#[derive(Deserialize, Default)]
struct LegacyConditions {
    #[serde(rename = "ConditionList", default)]
    condition_list: LegacyConditionList,
}

#[derive(Deserialize, Default)]
struct LegacyConditionList {
    #[serde(rename = "Condition", default)]
    conditions: Vec<String>,
}

#[derive(Deserialize, Default)]
struct LegacyInterventions {
    #[serde(rename = "InterventionList", default)]
    intervention_list: LegacyInterventionList,
}

#[derive(Deserialize, Default)]
struct LegacyInterventionList {
    #[serde(rename = "Intervention", default)]
    interventions: Vec<LegacyIntervention>,
}

#[derive(Deserialize, Default)]
struct LegacyIntervention {
    #[serde(rename = "InterventionName")]
    name: Option<String>,
}

fn map_legacy_study(study: FullStudy) -> CanonicalTrialRecord {
    let proto = study.protocol;

    let title = proto
        .identification
        .brief_title
        .or(proto.identification.official_title);

    let mut location_city = Vec::new();
    let mut location_state = Vec::new();
    let mut location_country = Vec::new();
    for loc in proto.contacts.location_list.locations {
        push_location(
            loc.facility.location,
            &mut location_city,
            &mut location_state,
            &mut location_country,
        );
    }

    CanonicalTrialRecord {
        nct_id: option_to_vec(proto.identification.nct_id),
        brief_title: option_to_vec(title),
        condition: proto.conditions.condition_list.conditions,
        overall_status: option_to_vec(proto.status.overall_status),
        brief_summary: vec![proto.description.brief_summary.unwrap_or_default()],
        location_city,
        location_state,
        location_country,
        gender: vec![proto.eligibility.gender.unwrap_or_else(|| "All".into())],
        minimum_age: vec![proto.eligibility.minimum_age.unwrap_or_else(|| "N/A".into())],
        maximum_age: vec![proto.eligibility.maximum_age.unwrap_or_else(|| "N/A".into())],
        phase: proto
            .design
            .phase_list
            .phase
            .map(PhaseValue::into_vec)
            .unwrap_or_default(),
        study_type: option_to_vec(proto.design.study_type),
        intervention_name: proto
            .interventions
            .intervention_list
            .interventions
            .into_iter()
            .filter_map(|iv| iv.name)
            .collect(),
        detailed_description: vec![],
        eligibility_criteria: vec![],
    }
}

// ──────────────────────────────────────────────
// Current v2 schema
// ──────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct V2Envelope {
    #[serde(default)]
    studies: Vec<V2Study>,
}

#[derive(Deserialize, Default)]
struct V2Study {
    #[serde(rename = "protocolSection", default)]
    protocol: V2ProtocolSection,
}

#[derive(Deserialize, Default)]
struct V2ProtocolSection {
    #[serde(rename = "identificationModule", default)]
    identification: V2Identification,
    #[serde(rename = "descriptionModule", default)]
    description: V2Description,
    #[serde(rename = "statusModule", default)]
    status: V2Status,
    #[serde(rename = "designModule", default)]
    design: V2Design,
    #[serde(rename = "eligibilityModule", default)]
    eligibility: V2Eligibility,
    #[serde(rename = "contactsLocationsModule", default)]
    contacts: V2Contacts,
    #[serde(rename = "conditionsModule", default)]
    conditions: V2Conditions,
    #[serde(rename = "interventionsModule", default)]
    interventions: V2Interventions,
}

#[derive(Deserialize, Default)]
struct V2Identification {
    #[serde(rename = "nctId")]
    nct_id: Option<String>,
    #[serde(rename = "briefTitle")]
    brief_title: Option<String>,
    #[serde(rename = "officialTitle")]
    official_title: Option<String>,
}

#[derive(Deserialize, Default)]
struct V2Description {
    #[serde(rename = "briefSummary")]
    brief_summary: Option<String>,
}

#[derive(Deserialize, Default)]
struct V2Status {
    #[serde(rename = "overallStatus")]
    overall_status: Option<String>,
}

#[derive(Deserialize, Default)]
struct V2Design {
    #[serde(default)]
    phases: Vec<String>,
    #[serde(rename = "studyType")]
    study_type: Option<String>,
}

#[derive(Deserialize, Default)]
struct V2Eligibility {
    sex: Option<String>,
    #[serde(rename = "minimumAge")]
    minimum_age: Option<String>,
    #[serde(rename = "maximumAge")]
    maximum_age: Option<String>,
}

#[derive(Deserialize, Default)]
struct V2Contacts {
    #[serde(default)]
    locations: Vec<V2Location>,
}

#[derive(Deserialize, Default)]
struct V2Location {
    #[serde(default)]
    location: LocationDetail,
}

#[derive(Deserialize, Default)]
struct V2Conditions {
    #[serde(default)]
    conditions: Vec<String>,
}

#[derive(Deserialize, Default)]
struct V2Interventions {
    #[serde(default)]
    interventions: Vec<V2Intervention>,
}

#[derive(Deserialize, Default)]
struct V2Intervention {
    name: Option<String>,
}

/// City/state/country detail shared by both nested schemas.
#[derive(Deserialize, Default)]
struct LocationDetail {
    #[serde(alias = "City")]
    city: Option<String>,
    #[serde(alias = "State")]
    state: Option<String>,
    #[serde(alias = "Country")]
    country: Option<String>,
}

fn map_v2_study(study: V2Study) -> CanonicalTrialRecord {
    let proto = study.protocol;

    let title = proto
        .identification
        .brief_title
        .or(proto.identification.official_title);

    let mut location_city = Vec::new();
    let mut location_state = Vec::new();
    let mut location_country = Vec::new();
    for loc in proto.contacts.locations {
        push_location(
            loc.location,
            &mut location_city,
            &mut location_state,
            &mut location_country,
        );
    }

    CanonicalTrialRecord {
        nct_id: option_to_vec(proto.identification.nct_id),
        brief_title: option_to_vec(title),
        condition: proto.conditions.conditions,
        overall_status: option_to_vec(proto.status.overall_status),
        brief_summary: vec![proto.description.brief_summary.unwrap_or_default()],
        location_city,
        location_state,
        location_country,
        gender: vec![proto.eligibility.sex.unwrap_or_else(|| "All".into())],
        minimum_age: vec![proto.eligibility.minimum_age.unwrap_or_else(|| "N/A".into())],
        maximum_age: vec![proto.eligibility.maximum_age.unwrap_or_else(|| "N/A".into())],
        phase: proto.design.phases,
        study_type: option_to_vec(proto.design.study_type),
        intervention_name: proto
            .interventions
            .interventions
            .into_iter()
            .filter_map(|iv| iv.name)
            .collect(),
        detailed_description: vec![],
        eligibility_criteria: vec![],
    }
}

fn option_to_vec(value: Option<String>) -> Vec<String> {
    value.map(|v| vec![v]).unwrap_or_default()
}

fn push_location(
    detail: LocationDetail,
    cities: &mut Vec<String>,
    states: &mut Vec<String>,
    countries: &mut Vec<String>,
) {
    if let Some(city) = detail.city {
        cities.push(city);
    }
    if let Some(state) = detail.state {
        states.push(state);
    }
    if let Some(country) = detail.country {
        countries.push(country);
    }
}
