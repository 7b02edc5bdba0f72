//! Payload export
//!
//! Turns the state of a capture session into the normalized, transmittable
//! sample. Open records are dropped, the password comes from the live field.

use crate::clock::round_ms;
use crate::types::{ExportedPayload, KeyTimingRecord};

/// Live value of the password input.
///
/// The password is always read from the field rather than rebuilt from key
/// identifiers: backspace, multi-character keys, and IME composition make the
/// key log an unreliable source for the text.
pub trait PasswordSource {
    fn current_password(&self) -> String;
}

impl PasswordSource for str {
    fn current_password(&self) -> String {
        self.to_string()
    }
}

impl PasswordSource for String {
    fn current_password(&self) -> String {
        self.clone()
    }
}

impl<F> PasswordSource for F
where
    F: Fn() -> String,
{
    fn current_password(&self) -> String {
        self()
    }
}

/// Build a payload from session records.
///
/// `elapsed_ms` is the time since the session origin, or `None` if recording
/// never started (total time is then 0). Does not touch the records.
pub fn export<S>(records: &[KeyTimingRecord], elapsed_ms: Option<f64>, source: &S) -> ExportedPayload
where
    S: PasswordSource + ?Sized,
{
    ExportedPayload {
        password: source.current_password(),
        keystroke_timings: records.iter().filter_map(KeyTimingRecord::to_timing).collect(),
        total_time: elapsed_ms.map(round_ms).unwrap_or(0),
    }
}
