//! Typing pattern comparison
//!
//! Scores how closely two samples of the same password match by their
//! per-position dwell times.

use tracing::debug;

use crate::config::ComparatorConfig;
use crate::schema::TimingSample;
use crate::types::{ComparisonReason, ComparisonResult};

/// Dwell-time comparator for two samples of one password
#[derive(Debug, Clone, Default)]
pub struct PatternComparator {
    config: ComparatorConfig,
}

impl PatternComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ComparatorConfig) -> Self {
        Self { config }
    }

    /// Default policy with a custom similarity threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            config: ComparatorConfig {
                threshold,
                ..ComparatorConfig::default()
            },
        }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare a live attempt against a reference sample.
    ///
    /// Keystrokes are aligned strictly by position, never by key identity. A
    /// position contributes only when both keys match and both dwells are
    /// positive.
    pub fn compare<R, C>(&self, reference: &R, candidate: &C) -> ComparisonResult
    where
        R: TimingSample + ?Sized,
        C: TimingSample + ?Sized,
    {
        let (Some(ref_timings), Some(cand_timings)) = (reference.timings(), candidate.timings())
        else {
            return ComparisonResult::rejected(ComparisonReason::InsufficientData);
        };

        if reference.password() != candidate.password() {
            return ComparisonResult::rejected(ComparisonReason::PasswordMismatch);
        }

        if ref_timings.len().abs_diff(cand_timings.len()) > self.config.max_length_difference {
            debug!(
                reference = ref_timings.len(),
                candidate = cand_timings.len(),
                "keystroke counts too far apart"
            );
            return ComparisonResult::rejected(ComparisonReason::LengthMismatch);
        }

        let mut total_difference = 0i128;
        let mut valid_comparisons = 0u32;

        for (r, c) in ref_timings.iter().zip(cand_timings) {
            if r.key != c.key {
                continue;
            }
            // Overflowing or non-positive dwells are corrupted entries.
            let (Some(dwell_ref), Some(dwell_cand)) = (r.dwell(), c.dwell()) else {
                continue;
            };
            if dwell_ref <= 0 || dwell_cand <= 0 {
                continue;
            }
            total_difference += (i128::from(dwell_ref) - i128::from(dwell_cand)).abs();
            valid_comparisons += 1;
        }

        if valid_comparisons == 0 {
            return ComparisonResult::rejected(ComparisonReason::NoValidComparisons);
        }

        let avg_difference = total_difference as f64 / valid_comparisons as f64;
        let score = (1.0 - avg_difference / self.config.tolerance_ms).max(0.0);
        let similar = score >= self.config.threshold;

        ComparisonResult {
            similar,
            score: round_to(score, 2),
            reason: if similar {
                ComparisonReason::Consistent
            } else {
                ComparisonReason::Inconsistent
            },
            avg_difference: round_to(avg_difference, 1),
            valid_comparisons,
        }
    }
}

/// Compare two samples with the default policy and the given threshold
pub fn compare<R, C>(reference: &R, candidate: &C, threshold: f64) -> ComparisonResult
where
    R: TimingSample + ?Sized,
    C: TimingSample + ?Sized,
{
    PatternComparator::with_threshold(threshold).compare(reference, candidate)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
    use crate::schema::SubmittedPayload;
    use crate::types::{ExportedPayload, KeystrokeTiming};

    fn timing(key: &str, press: i64, release: i64) -> KeystrokeTiming {
        KeystrokeTiming {
            key: key.to_string(),
            press_time: press,
            release_time: release,
        }
    }

    /// One keystroke per character, 200ms apart, with the given dwells
    fn sample(password: &str, dwells: &[i64]) -> ExportedPayload {
        let keystroke_timings = password
            .chars()
            .zip(dwells)
            .enumerate()
            .map(|(i, (ch, dwell))| {
                let press = i as i64 * 200;
                timing(&ch.to_string(), press, press + dwell)
            })
            .collect();
        ExportedPayload {
            password: password.to_string(),
            keystroke_timings,
            total_time: password.len() as u64 * 200,
        }
    }

    #[test]
    fn test_identical_samples_score_one() {
        let p = sample("hunter2", &[90, 85, 110, 95, 100, 80, 120]);
        let result = compare(&p, &p, DEFAULT_SIMILARITY_THRESHOLD);

        assert!(result.similar);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.avg_difference, 0.0);
        assert_eq!(result.valid_comparisons, 7);
        assert_eq!(result.reason, ComparisonReason::Consistent);
    }

    #[test]
    fn test_identical_samples_similar_at_max_threshold() {
        let p = sample("abc", &[60, 70, 80]);
        assert!(compare(&p, &p, 1.0).similar);
    }

    #[test]
    fn test_password_mismatch_ignores_timings() {
        let a = sample("abc", &[60, 70, 80]);
        let mut b = a.clone();
        b.password = "xyz".to_string();

        let result = compare(&a, &b, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::PasswordMismatch);
        assert_eq!(result.score, 0.0);
        assert!(!result.similar);
    }

    #[test]
    fn test_length_gate() {
        let reference = sample("abcdefghij", &[80; 10]);
        let candidate = sample("abcdefghijklmn", &[80; 14]);
        let mut candidate_same_pw = candidate.clone();
        candidate_same_pw.password = reference.password.clone();

        let result = compare(&reference, &candidate_same_pw, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::LengthMismatch);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_length_difference_of_two_is_scored() {
        let reference = sample("abcdefghij", &[80; 10]);
        let mut candidate = reference.clone();
        candidate.keystroke_timings.push(timing("Backspace", 2000, 2060));
        candidate.keystroke_timings.push(timing("j", 2100, 2180));

        let result = compare(&reference, &candidate, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::Consistent);
        assert_eq!(result.valid_comparisons, 10);
    }

    #[test]
    fn test_score_curve() {
        let reference = sample("abcd", &[100, 100, 100, 100]);

        // 30ms average deviation -> 1 - 30/150 = 0.8
        let close = sample("abcd", &[130, 70, 130, 70]);
        let result = compare(&reference, &close, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.avg_difference, 30.0);
        assert_eq!(result.score, 0.8);
        assert!(result.similar);

        // 60ms -> 0.6, below the default threshold
        let far = sample("abcd", &[160, 40, 160, 40]);
        let result = compare(&reference, &far, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.score, 0.6);
        assert!(!result.similar);
        assert_eq!(result.reason, ComparisonReason::Inconsistent);

        // beyond the tolerance clamps to 0
        let wild = sample("abcd", &[400, 400, 400, 400]);
        let result = compare(&reference, &wild, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.avg_difference, 300.0);
    }

    #[test]
    fn test_alignment_is_positional() {
        let reference = ExportedPayload {
            password: "ab".to_string(),
            keystroke_timings: vec![timing("a", 0, 100), timing("b", 200, 300)],
            total_time: 400,
        };
        // Same keys, swapped positions: nothing aligns.
        let candidate = ExportedPayload {
            password: "ab".to_string(),
            keystroke_timings: vec![timing("b", 0, 100), timing("a", 200, 300)],
            total_time: 400,
        };

        let result = compare(&reference, &candidate, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::NoValidComparisons);
        assert_eq!(result.valid_comparisons, 0);
    }

    #[test]
    fn test_non_positive_dwells_skipped() {
        let reference = ExportedPayload {
            password: "abc".to_string(),
            keystroke_timings: vec![
                timing("a", 0, 100),
                timing("b", 200, 200),
                timing("c", 400, 380),
            ],
            total_time: 500,
        };
        let candidate = sample("abc", &[120, 90, 90]);

        let result = compare(&reference, &candidate, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.valid_comparisons, 1);
        assert_eq!(result.avg_difference, 20.0);
    }

    #[test]
    fn test_missing_timings_is_insufficient() {
        let reference = sample("abc", &[60, 70, 80]);
        let missing = SubmittedPayload {
            password: "abc".to_string(),
            keystroke_timings: None,
            total_time: 0,
        };

        let result = compare(&reference, &missing, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::InsufficientData);

        let result = compare(&missing, &reference, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::InsufficientData);
    }

    #[test]
    fn test_empty_samples_have_no_valid_comparisons() {
        let empty = sample("", &[]);
        let result = compare(&empty, &empty, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(result.reason, ComparisonReason::NoValidComparisons);
    }

    #[test]
    fn test_custom_config() {
        let comparator = PatternComparator::with_config(ComparatorConfig {
            threshold: 0.5,
            tolerance_ms: 100.0,
            max_length_difference: 0,
        });
        let reference = sample("abcd", &[100, 100, 100, 100]);
        let candidate = sample("abcd", &[140, 60, 140, 60]);

        // 1 - 40/100 = 0.6
        let result = comparator.compare(&reference, &candidate);
        assert_eq!(result.score, 0.6);
        assert!(result.similar);

        let mut longer = candidate.clone();
        longer.keystroke_timings.push(timing("d", 900, 960));
        assert_eq!(
            comparator.compare(&reference, &longer).reason,
            ComparisonReason::LengthMismatch
        );
    }

    #[test]
    fn test_overflowing_dwells_are_skipped() {
        let corrupt = SubmittedPayload::from_json(
            r#"{"password":"a","keystroke_timings":[{"key":"a","press_time":-9223372036854775808,"release_time":9223372036854775807}],"total_time":10}"#,
        )
        .unwrap();
        assert_eq!(
            compare(&corrupt, &corrupt, DEFAULT_SIMILARITY_THRESHOLD).reason,
            ComparisonReason::NoValidComparisons
        );
    }

    #[test]
    fn test_extreme_dwell_differences_do_not_overflow() {
        let reference = ExportedPayload {
            password: "ab".to_string(),
            keystroke_timings: vec![timing("a", 0, i64::MAX), timing("b", 0, i64::MAX)],
            total_time: 0,
        };
        let candidate = ExportedPayload {
            password: "ab".to_string(),
            keystroke_timings: vec![timing("a", 0, 1), timing("b", 0, 1)],
            total_time: 0,
        };

        let result = PatternComparator::new().compare(&reference, &candidate);
        assert_eq!(result.reason, ComparisonReason::Inconsistent);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.valid_comparisons, 2);
        assert!(result.avg_difference > 9.0e18);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.666666, 2), 0.67);
        assert_eq!(round_to(33.333, 1), 33.3);
    }
}
