//! Keycadence - keystroke dynamics capture and scoring
//!
//! Keycadence records press/release timings while a password is typed and turns
//! them into a payload for an authentication backend, used as a secondary
//! behavioral factor next to the password itself.
//!
//! ## Modules
//!
//! - **Capture**: [`KeystrokeRecorder`] pairs press/release events under key
//!   repeat and lost focus, and exports an [`ExportedPayload`]
//! - **Scoring**: [`PatternComparator`] compares two samples of one password,
//!   [`PatternAnalyzer`] flags implausible timing in a single sample
//! - **Enrollment**: [`practice::EnrollmentFlow`] drives repeated attempts
//!   against a backend

pub mod analyze;
pub mod capture;
pub mod clock;
pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod practice;
pub mod registration;
pub mod replay;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analyze::{analyze, PatternAnalyzer};
pub use capture::KeystrokeRecorder;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use compare::{compare, PatternComparator};
pub use config::KeycadenceConfig;
pub use error::KeycadenceError;
pub use export::{export, PasswordSource};
pub use pipeline::{analyze_json, compare_json};
pub use schema::{SubmittedPayload, TimingSample};
pub use types::{
    AnalysisReason, AnalysisResult, AnalysisStats, AnomalyKind, ComparisonReason,
    ComparisonResult, ExportedPayload, KeyTimingRecord, KeystrokeTiming, SessionStatus,
};

/// Library version
pub const KEYCADENCE_VERSION: &str = env!("CARGO_PKG_VERSION");
