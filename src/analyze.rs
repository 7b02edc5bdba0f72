//! Single-sample anomaly detection
//!
//! Flags samples whose timing statistics are implausible for a human typing a
//! password: most keys held too long, most keys released too fast, or most
//! consecutive keys overlapping.

use tracing::debug;

use crate::compare::round_to;
use crate::config::AnalyzerConfig;
use crate::schema::TimingSample;
use crate::types::{AnalysisReason, AnalysisResult, AnalysisStats, AnomalyKind};

/// Statistical analyzer for one typing sample
#[derive(Debug, Clone, Default)]
pub struct PatternAnalyzer {
    config: AnalyzerConfig,
}

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze<S>(&self, payload: &S) -> AnalysisResult
    where
        S: TimingSample + ?Sized,
    {
        let timings = match payload.timings() {
            Some(timings) if !timings.is_empty() => timings,
            _ => return AnalysisResult::unusable(AnalysisReason::NoTimingData),
        };

        let dwells: Vec<i64> = timings
            .iter()
            .filter_map(|t| t.dwell())
            .filter(|&dwell| dwell > 0)
            .collect();
        if dwells.is_empty() {
            return AnalysisResult::unusable(AnalysisReason::NoValidDwells);
        }

        // Positional flights; negative ones are overlapping keys.
        let flights: Vec<i64> = timings
            .windows(2)
            .filter_map(|pair| pair[0].flight_to(&pair[1]))
            .collect();
        let non_negative_flights: Vec<i64> = flights.iter().copied().filter(|&f| f >= 0).collect();
        let negative_flights = flights.len() - non_negative_flights.len();

        let total_entries = timings.len() as f64;
        let long_dwells = dwells
            .iter()
            .filter(|&&d| d > self.config.long_dwell_ms)
            .count();
        let short_dwells = dwells
            .iter()
            .filter(|&&d| d < self.config.short_dwell_ms)
            .count();

        let mut anomalies = Vec::new();
        if long_dwells as f64 / total_entries > self.config.dwell_anomaly_ratio {
            anomalies.push(AnomalyKind::KeysHeldTooLong);
        }
        if short_dwells as f64 / total_entries > self.config.dwell_anomaly_ratio {
            anomalies.push(AnomalyKind::KeysTooFast);
        }
        if !flights.is_empty()
            && negative_flights as f64 / flights.len() as f64 > self.config.overlap_anomaly_ratio
        {
            anomalies.push(AnomalyKind::ExcessiveOverlap);
        }

        if !anomalies.is_empty() {
            debug!(
                long_dwells,
                short_dwells,
                negative_flights,
                entries = timings.len(),
                "sample has timing anomalies"
            );
        }

        AnalysisResult {
            valid: anomalies.is_empty(),
            reason: None,
            anomalies,
            stats: Some(AnalysisStats {
                avg_dwell: round_to(mean(&dwells), 2),
                avg_flight: round_to(mean(&non_negative_flights), 2),
                total_keys: timings.len() as u32,
                total_time: payload.total_time(),
            }),
        }
    }
}

/// Analyze a sample with the default policy
pub fn analyze<S>(payload: &S) -> AnalysisResult
where
    S: TimingSample + ?Sized,
{
    PatternAnalyzer::new().analyze(payload)
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| i128::from(v)).sum::<i128>() as f64 / values.len() as f64
}
