//! Practice and enrollment workflow
//!
//! [`EnrollmentFlow`] coordinates repeated capture attempts with a remote
//! backend. Each attempt is a frozen [`ExportedPayload`]; the backend scores it
//! (with the comparator and analyzer) and the flow turns that verdict into a
//! retry, an accepted attempt, or a final enrolled/failed state. The flow never
//! touches a recorder, so a failed delivery cannot corrupt capture state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PracticeConfig;
use crate::types::{AnalysisResult, AnomalyKind, ComparisonResult, ExportedPayload};

/// One attempt as delivered to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub attempt_id: Uuid,
    /// 1-based attempt number within the flow
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
    pub payload: ExportedPayload,
}

/// Backend verdict for one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Delivery of submissions to the enrollment/verification endpoint
pub trait PayloadTransport {
    fn submit(&mut self, submission: &Submission) -> Result<BackendResponse, TransportError>;
}

/// Transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Errors from driving the flow
#[derive(Debug, Error)]
pub enum PracticeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Enrollment flow already finished ({0:?})")]
    Finished(FlowState),

    #[error("Response is for attempt {got}, expected {expected}")]
    UnexpectedAttempt { expected: u32, got: u32 },
}

/// Overall state of the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Collecting,
    Enrolled,
    Failed,
}

/// Why an attempt did not count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RetryReason {
    /// The backend analyzer flagged the sample
    Anomalous { anomalies: Vec<AnomalyKind> },
    /// The sample did not match the reference pattern
    Inconsistent { score: f64 },
    /// Rejected without a scoring explanation
    Rejected { detail: Option<String> },
}

/// What the host should do after an attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum FlowStep {
    /// Type the password again
    Retry {
        reason: RetryReason,
        attempts_left: u32,
    },
    /// Attempt counted; more are needed
    Accepted { successes: u32, remaining: u32 },
    Enrolled,
    Failed,
}

/// Completed attempt kept for the host's history view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Multi-attempt enrollment state
#[derive(Debug, Clone)]
pub struct EnrollmentFlow {
    config: PracticeConfig,
    state: FlowState,
    attempts: u32,
    successes: u32,
    history: Vec<AttemptRecord>,
}

impl Default for EnrollmentFlow {
    fn default() -> Self {
        Self::new(PracticeConfig::default())
    }
}

impl EnrollmentFlow {
    pub fn new(config: PracticeConfig) -> Self {
        Self {
            config,
            state: FlowState::Collecting,
            attempts: 0,
            successes: 0,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn attempts_left(&self) -> u32 {
        self.config.max_attempts.saturating_sub(self.attempts)
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    /// Wrap a frozen payload as the next attempt.
    ///
    /// Does not advance the flow; pass the backend's answer to `record_response`.
    pub fn prepare(&self, payload: ExportedPayload) -> Result<Submission, PracticeError> {
        if self.state != FlowState::Collecting {
            return Err(PracticeError::Finished(self.state));
        }
        Ok(Submission {
            attempt_id: Uuid::new_v4(),
            attempt: self.attempts + 1,
            submitted_at: Utc::now(),
            payload,
        })
    }

    /// Prepare, deliver, and record one attempt.
    ///
    /// A transport failure leaves the flow unchanged; the same payload can be
    /// submitted again.
    pub fn submit<T>(
        &mut self,
        transport: &mut T,
        payload: ExportedPayload,
    ) -> Result<FlowStep, PracticeError>
    where
        T: PayloadTransport + ?Sized,
    {
        let submission = self.prepare(payload)?;
        let response = transport.submit(&submission).map_err(|e| {
            warn!(attempt = submission.attempt, error = %e, "attempt delivery failed");
            e
        })?;
        self.record_response(&submission, response)
    }

    /// Apply the backend's verdict for a prepared submission
    pub fn record_response(
        &mut self,
        submission: &Submission,
        response: BackendResponse,
    ) -> Result<FlowStep, PracticeError> {
        if self.state != FlowState::Collecting {
            return Err(PracticeError::Finished(self.state));
        }
        if submission.attempt != self.attempts + 1 {
            return Err(PracticeError::UnexpectedAttempt {
                expected: self.attempts + 1,
                got: submission.attempt,
            });
        }

        self.attempts += 1;
        let retry = Self::retry_reason(&response);
        self.history.push(AttemptRecord {
            attempt_id: submission.attempt_id,
            attempt: submission.attempt,
            submitted_at: submission.submitted_at,
            accepted: retry.is_none(),
            score: response.comparison.as_ref().map(|c| c.score),
        });

        let step = match retry {
            None => {
                self.successes += 1;
                if self.successes >= self.config.required_successes {
                    self.state = FlowState::Enrolled;
                    FlowStep::Enrolled
                } else {
                    FlowStep::Accepted {
                        successes: self.successes,
                        remaining: self.config.required_successes - self.successes,
                    }
                }
            }
            Some(reason) => {
                let needed = self.config.required_successes - self.successes;
                if self.attempts_left() < needed {
                    self.state = FlowState::Failed;
                    FlowStep::Failed
                } else {
                    FlowStep::Retry {
                        reason,
                        attempts_left: self.attempts_left(),
                    }
                }
            }
        };

        match &step {
            FlowStep::Enrolled => info!(attempts = self.attempts, "enrollment complete"),
            FlowStep::Failed => info!(attempts = self.attempts, "enrollment failed"),
            other => debug!(attempt = submission.attempt, step = ?other, "attempt recorded"),
        }
        Ok(step)
    }

    /// Start over with the same settings
    pub fn restart(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn retry_reason(response: &BackendResponse) -> Option<RetryReason> {
        if let Some(analysis) = response.analysis.as_ref().filter(|a| !a.valid) {
            return Some(RetryReason::Anomalous {
                anomalies: analysis.anomalies.clone(),
            });
        }
        if let Some(comparison) = response.comparison.as_ref().filter(|c| !c.similar) {
            return Some(RetryReason::Inconsistent {
                score: comparison.score,
            });
        }
        if !response.accepted {
            return Some(RetryReason::Rejected {
                detail: response.detail.clone(),
            });
        }
        None
    }
}
