//! Configuration for capture, scoring, and the enrollment flow
//!
//! Every section deserializes with defaults, so a partial JSON file only needs
//! the fields it overrides. The defaults are the fixed scoring policy.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::KeycadenceError;

/// Default similarity threshold for [`crate::compare::PatternComparator`]
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Average dwell deviation (ms) at which similarity reaches 0
pub const DWELL_TOLERANCE_MS: f64 = 150.0;

/// Largest keystroke count difference still considered comparable
pub const MAX_LENGTH_DIFFERENCE: usize = 2;

/// Dwell above this (ms) counts as a key held too long
pub const LONG_DWELL_MS: i64 = 500;

/// Dwell below this (ms) counts as a key released too fast
pub const SHORT_DWELL_MS: i64 = 30;

/// Share of timing entries with long/short dwells that triggers an anomaly
pub const DWELL_ANOMALY_RATIO: f64 = 0.3;

/// Share of flights that are negative (overlapping keys) that triggers an anomaly
pub const OVERLAP_ANOMALY_RATIO: f64 = 0.5;

/// Capture state machine settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Start recording on the first press observed while idle
    pub start_on_first_press: bool,
}

/// Pattern comparator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    pub threshold: f64,
    pub tolerance_ms: f64,
    pub max_length_difference: usize,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            tolerance_ms: DWELL_TOLERANCE_MS,
            max_length_difference: MAX_LENGTH_DIFFERENCE,
        }
    }
}

/// Pattern analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub long_dwell_ms: i64,
    pub short_dwell_ms: i64,
    pub dwell_anomaly_ratio: f64,
    pub overlap_anomaly_ratio: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            long_dwell_ms: LONG_DWELL_MS,
            short_dwell_ms: SHORT_DWELL_MS,
            dwell_anomaly_ratio: DWELL_ANOMALY_RATIO,
            overlap_anomaly_ratio: OVERLAP_ANOMALY_RATIO,
        }
    }
}

/// Enrollment flow settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Accepted attempts needed to finish enrollment
    pub required_successes: u32,
    /// Attempts allowed before the flow gives up
    pub max_attempts: u32,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            required_successes: 3,
            max_attempts: 6,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeycadenceConfig {
    pub capture: CaptureConfig,
    pub comparator: ComparatorConfig,
    pub analyzer: AnalyzerConfig,
    pub practice: PracticeConfig,
}

impl KeycadenceConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, KeycadenceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, KeycadenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read, parse, and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, KeycadenceError> {
        let json = fs::read_to_string(path).map_err(|e| KeycadenceError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), KeycadenceError> {
        let comparator = &self.comparator;
        if !(0.0..=1.0).contains(&comparator.threshold) {
            return Err(KeycadenceError::ConfigError(format!(
                "comparator.threshold must be within [0, 1], got {}",
                comparator.threshold
            )));
        }
        if !(comparator.tolerance_ms > 0.0 && comparator.tolerance_ms.is_finite()) {
            return Err(KeycadenceError::ConfigError(format!(
                "comparator.tolerance_ms must be positive, got {}",
                comparator.tolerance_ms
            )));
        }

        let analyzer = &self.analyzer;
        for (name, ratio) in [
            ("analyzer.dwell_anomaly_ratio", analyzer.dwell_anomaly_ratio),
            ("analyzer.overlap_anomaly_ratio", analyzer.overlap_anomaly_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(KeycadenceError::ConfigError(format!(
                    "{name} must be within [0, 1], got {ratio}"
                )));
            }
        }
        if analyzer.short_dwell_ms > analyzer.long_dwell_ms {
            return Err(KeycadenceError::ConfigError(
                "analyzer.short_dwell_ms must not exceed analyzer.long_dwell_ms".to_string(),
            ));
        }

        let practice = &self.practice;
        if practice.required_successes == 0 || practice.max_attempts == 0 {
            return Err(KeycadenceError::ConfigError(
                "practice attempts must be non-zero".to_string(),
            ));
        }
        if practice.required_successes > practice.max_attempts {
            return Err(KeycadenceError::ConfigError(
                "practice.required_successes must not exceed practice.max_attempts".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_policy_constants() {
        let config = KeycadenceConfig::default();
        assert_eq!(config.comparator.threshold, 0.7);
        assert_eq!(config.comparator.tolerance_ms, 150.0);
        assert_eq!(config.comparator.max_length_difference, 2);
        assert_eq!(config.analyzer.long_dwell_ms, 500);
        assert_eq!(config.analyzer.short_dwell_ms, 30);
        assert!(!config.capture.start_on_first_press);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            KeycadenceConfig::from_json(r#"{ "comparator": { "threshold": 0.8 } }"#).unwrap();
        assert_eq!(config.comparator.threshold, 0.8);
        assert_eq!(config.comparator.tolerance_ms, 150.0);
        assert_eq!(config.analyzer, AnalyzerConfig::default());
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = KeycadenceConfig::default();
        config.capture.start_on_first_press = true;
        config.practice.max_attempts = 10;

        let parsed = KeycadenceConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let result = KeycadenceConfig::from_json(r#"{ "comparator": { "threshold": 1.5 } }"#);
        assert!(matches!(result, Err(KeycadenceError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_impossible_practice_settings() {
        let result = KeycadenceConfig::from_json(
            r#"{ "practice": { "required_successes": 5, "max_attempts": 2 } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = KeycadenceConfig::load(Path::new("/nonexistent/keycadence.json"));
        assert!(matches!(result, Err(KeycadenceError::ReadError { .. })));
    }
}
