/// Instruction block sent ahead of every transcript. Demands strict JSON
/// so the response can be parsed without the surrounding prose models
/// like to add anyway.
pub const EXTRACTION_RULES: &str = "\
You are extracting structured clinical info from a patient-doctor transcript.
Requirements:
- Output ONLY JSON (no prose).
- Keys: age (number or null), sex ('Male'|'Female'|null), diagnosis (string or null), keywords (string[]), locations (string[]).
- Age must be the patient's current age, not durations (e.g., 'quit 10 years ago' is NOT age).
- Prefer concise, canonical diagnosis terms (e.g., 'Heart failure with reduced ejection fraction (HFrEF)', 'HER2-positive invasive ductal carcinoma').
- Keywords: include staging, biomarkers, therapies (e.g., HER2, HFrEF, NYHA, SGLT2, adjuvant).
";

/// Build the extraction prompt for a transcript.
pub fn build_extraction_prompt(transcript: &str) -> String {
    format!("{EXTRACTION_RULES}Transcript:\n\n{transcript}")
}
