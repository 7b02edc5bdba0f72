//! Stateless JSON entry points
//!
//! One-shot helpers for hosts that exchange payloads as JSON strings (the CLI
//! and the C bindings use these).

use crate::analyze::PatternAnalyzer;
use crate::compare::PatternComparator;
use crate::config::{AnalyzerConfig, CaptureConfig, ComparatorConfig};
use crate::error::KeycadenceError;
use crate::replay::replay;
use crate::schema::{KeyEventAdapter, SubmittedPayload};

/// Compare two payload JSON documents and return the ComparisonResult JSON.
///
/// # Example
/// ```ignore
/// let result_json = compare_json(&enrolled, &attempt, &ComparatorConfig::default())?;
/// ```
pub fn compare_json(
    reference_json: &str,
    candidate_json: &str,
    config: &ComparatorConfig,
) -> Result<String, KeycadenceError> {
    let reference = SubmittedPayload::from_json(reference_json)?;
    let candidate = SubmittedPayload::from_json(candidate_json)?;

    let result = PatternComparator::with_config(config.clone()).compare(&reference, &candidate);
    Ok(serde_json::to_string(&result)?)
}

/// Analyze a payload JSON document and return the AnalysisResult JSON
pub fn analyze_json(payload_json: &str, config: &AnalyzerConfig) -> Result<String, KeycadenceError> {
    let payload = SubmittedPayload::from_json(payload_json)?;

    let result = PatternAnalyzer::with_config(config.clone()).analyze(&payload);
    Ok(serde_json::to_string(&result)?)
}

/// Replay an NDJSON key event log and return the exported payload JSON
pub fn replay_ndjson_to_payload_json(
    events_ndjson: &str,
    password: &str,
    config: &CaptureConfig,
) -> Result<String, KeycadenceError> {
    let events = KeyEventAdapter::parse_ndjson(events_ndjson)?;
    let payload = replay(&events, password, config);
    Ok(serde_json::to_string(&payload)?)
}
