//! Keystroke timing data types
//!
//! This module defines the records produced by the capture state machine, the
//! transmittable payload, and the result shapes of the comparator and analyzer.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Recording,
    Stopped,
}

/// One observed key interaction inside a live session.
///
/// `release_time` is set at most once and is never smaller than `press_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTimingRecord {
    /// Key identifier exactly as delivered by the event source
    pub key: String,
    /// Milliseconds since recording started
    pub press_time: u64,
    /// Milliseconds since recording started, unset while the key is held
    pub release_time: Option<u64>,
}

impl KeyTimingRecord {
    /// Whether the record is still waiting for its release
    pub fn is_open(&self) -> bool {
        self.release_time.is_none()
    }

    /// Completed wire form, or `None` if the key was never released or a time
    /// does not fit the signed wire type
    pub fn to_timing(&self) -> Option<KeystrokeTiming> {
        let release = self.release_time?;
        Some(KeystrokeTiming {
            key: self.key.clone(),
            press_time: i64::try_from(self.press_time).ok()?,
            release_time: i64::try_from(release).ok()?,
        })
    }
}

/// A completed keystroke as transmitted to the backend.
///
/// Signed so that corrupted inbound samples (release before press) can still be
/// represented and filtered by the scoring code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeTiming {
    pub key: String,
    pub press_time: i64,
    pub release_time: i64,
}

impl KeystrokeTiming {
    /// Dwell time (release - press) in milliseconds, `None` if the difference
    /// overflows
    pub fn dwell(&self) -> Option<i64> {
        self.release_time.checked_sub(self.press_time)
    }

    /// Gap from this release to the `next` press; negative when the keys overlap
    pub fn flight_to(&self, next: &KeystrokeTiming) -> Option<i64> {
        next.press_time.checked_sub(self.release_time)
    }
}

/// The normalized, transmittable record of one typing attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedPayload {
    /// Literal content of the password field at export time
    pub password: String,
    /// Completed keystrokes in press order
    pub keystroke_timings: Vec<KeystrokeTiming>,
    /// Milliseconds from recording start to export (0 if never started)
    pub total_time: u64,
}

/// Outcome tag of a pattern comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonReason {
    /// One of the samples carries no timing list
    InsufficientData,
    /// The samples were typed for different passwords
    PasswordMismatch,
    /// Keystroke counts differ by more than the allowed margin
    LengthMismatch,
    /// No aligned position had matching keys with positive dwells
    NoValidComparisons,
    /// Score reached the threshold
    Consistent,
    /// Score fell below the threshold
    Inconsistent,
}

/// Result of comparing two samples of the same password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub similar: bool,
    /// Similarity in [0, 1], rounded to 2 decimals
    pub score: f64,
    pub reason: ComparisonReason,
    /// Mean absolute dwell difference in ms, rounded to 1 decimal
    pub avg_difference: f64,
    pub valid_comparisons: u32,
}

impl ComparisonResult {
    pub(crate) fn rejected(reason: ComparisonReason) -> Self {
        Self {
            similar: false,
            score: 0.0,
            reason,
            avg_difference: 0.0,
            valid_comparisons: 0,
        }
    }
}

/// Statistical anomaly detected in a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    KeysHeldTooLong,
    KeysTooFast,
    ExcessiveOverlap,
}

/// Why a sample could not be analyzed at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisReason {
    NoTimingData,
    NoValidDwells,
}

/// Summary statistics of a single sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub avg_dwell: f64,
    pub avg_flight: f64,
    pub total_keys: u32,
    pub total_time: u64,
}

/// Result of inspecting one sample for anomalies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AnalysisReason>,
    /// Each kind appears at most once, in detection order
    pub anomalies: Vec<AnomalyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<AnalysisStats>,
}

impl AnalysisResult {
    pub(crate) fn unusable(reason: AnalysisReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            anomalies: Vec::new(),
            stats: None,
        }
    }

    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_shape() {
        let payload = ExportedPayload {
            password: "abc".to_string(),
            keystroke_timings: vec![KeystrokeTiming {
                key: "a".to_string(),
                press_time: 0,
                release_time: 95,
            }],
            total_time: 1200,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["password"], "abc");
        assert_eq!(value["keystroke_timings"][0]["key"], "a");
        assert_eq!(value["keystroke_timings"][0]["press_time"], 0);
        assert_eq!(value["keystroke_timings"][0]["release_time"], 95);
        assert_eq!(value["total_time"], 1200);
    }

    #[test]
    fn test_comparison_result_uses_camel_case() {
        let result = ComparisonResult {
            similar: true,
            score: 0.9,
            reason: ComparisonReason::Consistent,
            avg_difference: 15.0,
            valid_comparisons: 8,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"avgDifference\":15.0"));
        assert!(json.contains("\"validComparisons\":8"));
        assert!(json.contains("\"reason\":\"consistent\""));
    }

    #[test]
    fn test_open_record_has_no_timing() {
        let open = KeyTimingRecord {
            key: "Shift".to_string(),
            press_time: 10,
            release_time: None,
        };
        assert!(open.is_open());
        assert!(open.to_timing().is_none());

        let closed = KeyTimingRecord {
            release_time: Some(80),
            ..open
        };
        assert_eq!(closed.to_timing().unwrap().dwell(), Some(70));
    }

    #[test]
    fn test_out_of_range_record_is_not_wrapped() {
        let record = KeyTimingRecord {
            key: "a".to_string(),
            press_time: u64::MAX - 10,
            release_time: Some(u64::MAX),
        };
        assert!(record.to_timing().is_none());
    }

    #[test]
    fn test_extreme_times_have_no_dwell_or_flight() {
        let corrupt = KeystrokeTiming {
            key: "a".to_string(),
            press_time: i64::MIN,
            release_time: i64::MAX,
        };
        assert_eq!(corrupt.dwell(), None);

        let next = KeystrokeTiming {
            key: "b".to_string(),
            press_time: i64::MIN,
            release_time: 0,
        };
        assert_eq!(corrupt.flight_to(&next), None);
        assert_eq!(next.flight_to(&corrupt), Some(i64::MIN));
    }

    #[test]
    fn test_unusable_analysis_omits_stats() {
        let result = AnalysisResult::unusable(AnalysisReason::NoTimingData);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["reason"], "no_timing_data");
        assert!(value.get("stats").is_none());
    }
}
