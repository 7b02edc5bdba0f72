//! Inbound payload schema
//!
//! Payloads arriving from other processes may be partial or corrupted. They are
//! accepted as-is and scored leniently; `validate` is available for callers that
//! need a clean sample.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::KeycadenceError;
use crate::types::{ExportedPayload, KeystrokeTiming};

/// Read access to a typing sample, shared by the comparator and the analyzer
pub trait TimingSample {
    fn password(&self) -> &str;

    /// Completed keystrokes, or `None` if the sample carries no timing list
    fn timings(&self) -> Option<&[KeystrokeTiming]>;

    fn total_time(&self) -> u64;
}

impl TimingSample for ExportedPayload {
    fn password(&self) -> &str {
        &self.password
    }

    fn timings(&self) -> Option<&[KeystrokeTiming]> {
        Some(&self.keystroke_timings)
    }

    fn total_time(&self) -> u64 {
        self.total_time
    }
}

/// A payload as received over the wire, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedPayload {
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystroke_timings: Option<Vec<KeystrokeTiming>>,
    #[serde(default)]
    pub total_time: u64,
}

impl TimingSample for SubmittedPayload {
    fn password(&self) -> &str {
        &self.password
    }

    fn timings(&self) -> Option<&[KeystrokeTiming]> {
        self.keystroke_timings.as_deref()
    }

    fn total_time(&self) -> u64 {
        self.total_time
    }
}

impl From<ExportedPayload> for SubmittedPayload {
    fn from(payload: ExportedPayload) -> Self {
        Self {
            password: payload.password,
            keystroke_timings: Some(payload.keystroke_timings),
            total_time: payload.total_time,
        }
    }
}

impl SubmittedPayload {
    pub fn from_json(json: &str) -> Result<Self, KeycadenceError> {
        serde_json::from_str(json)
            .map_err(|e| KeycadenceError::ParseError(format!("Failed to parse payload: {}", e)))
    }

    /// Check that the sample is complete and internally consistent
    pub fn validate(&self) -> Result<(), ValidationError> {
        let timings = self
            .keystroke_timings
            .as_ref()
            .ok_or(ValidationError::MissingTimings)?;

        for (index, timing) in timings.iter().enumerate() {
            if timing.key.is_empty() {
                return Err(ValidationError::EmptyKey { index });
            }
            if timing.press_time < 0 {
                return Err(ValidationError::NegativeTime {
                    index,
                    value: timing.press_time,
                });
            }
            if timing.release_time < timing.press_time {
                return Err(ValidationError::ReleaseBeforePress {
                    index,
                    press_time: timing.press_time,
                    release_time: timing.release_time,
                });
            }
        }

        Ok(())
    }

    /// Validate and convert into a clean payload
    pub fn into_exported(self) -> Result<ExportedPayload, ValidationError> {
        self.validate()?;
        Ok(ExportedPayload {
            password: self.password,
            keystroke_timings: self.keystroke_timings.unwrap_or_default(),
            total_time: self.total_time,
        })
    }
}

/// Schema validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Payload has no keystroke_timings list")]
    MissingTimings,

    #[error("Timing {index} has an empty key")]
    EmptyKey { index: usize },

    #[error("Timing {index} has negative press_time {value}")]
    NegativeTime { index: usize, value: i64 },

    #[error("Timing {index} releases at {release_time} before its press at {press_time}")]
    ReleaseBeforePress {
        index: usize,
        press_time: i64,
        release_time: i64,
    },
}
