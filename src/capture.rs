//! Keystroke timing capture
//!
//! [`KeystrokeRecorder`] is an explicit state machine driven by press/release
//! notifications from whatever event mechanism the host has. It pairs each
//! press with its release, suppresses OS key-repeat, and drops releases it has
//! no open press for.
//!
//! A recorder assumes a single writer. Hosts that deliver events from several
//! threads must serialize access themselves.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::clock::{round_ms, Clock, MonotonicClock};
use crate::config::CaptureConfig;
use crate::export::{export, PasswordSource};
use crate::types::{ExportedPayload, KeyTimingRecord, SessionStatus};

/// Records key press/release timings for one password entry
#[derive(Debug)]
pub struct KeystrokeRecorder<C: Clock = MonotonicClock> {
    clock: C,
    config: CaptureConfig,
    status: SessionStatus,
    /// Clock reading at the session origin
    start_time: Option<f64>,
    /// Elapsed time frozen by `stop`
    stopped_elapsed: Option<f64>,
    records: Vec<KeyTimingRecord>,
    /// Key -> index of its open record in `records`
    open_keys: HashMap<String, usize>,
}

impl Default for KeystrokeRecorder<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl KeystrokeRecorder<MonotonicClock> {
    /// Create an idle recorder on the live monotonic clock
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl<C: Clock> KeystrokeRecorder<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config(clock, CaptureConfig::default())
    }

    pub fn with_config(clock: C, config: CaptureConfig) -> Self {
        Self {
            clock,
            config,
            status: SessionStatus::Idle,
            start_time: None,
            stopped_elapsed: None,
            records: Vec::new(),
            open_keys: HashMap::new(),
        }
    }

    /// Begin (or restart) the recording window.
    ///
    /// Clears any records. A stopped session is frozen and must be `reset` first.
    pub fn start(&mut self) {
        if self.status == SessionStatus::Stopped {
            debug!("start ignored on stopped session");
            return;
        }

        self.records.clear();
        self.open_keys.clear();
        self.stopped_elapsed = None;
        self.start_time = Some(self.clock.now_ms());
        self.status = SessionStatus::Recording;
        trace!("recording started");
    }

    /// Handle a key-down notification
    pub fn on_press(&mut self, key: &str) {
        if self.status == SessionStatus::Idle && self.config.start_on_first_press {
            self.start();
        }
        if self.status != SessionStatus::Recording {
            return;
        }

        let now = self.clock.now_ms();
        let start = *self.start_time.get_or_insert(now);
        let relative_time = round_ms(now - start);

        if self.open_keys.contains_key(key) {
            // Auto-repeat: the physical key is still down.
            debug!(open = self.open_keys.len(), "repeated press suppressed");
            return;
        }

        self.open_keys.insert(key.to_string(), self.records.len());
        self.records.push(KeyTimingRecord {
            key: key.to_string(),
            press_time: relative_time,
            release_time: None,
        });
        trace!(press_time = relative_time, records = self.records.len(), "key pressed");
    }

    /// Handle a key-up notification
    pub fn on_release(&mut self, key: &str) {
        if self.status != SessionStatus::Recording {
            return;
        }
        let Some(start) = self.start_time else {
            return;
        };

        let relative_time = round_ms(self.clock.now_ms() - start);

        match self.open_keys.remove(key) {
            Some(index) => {
                let record = &mut self.records[index];
                let release_time = relative_time.max(record.press_time);
                record.release_time = Some(release_time);
                trace!(
                    dwell = release_time - record.press_time,
                    "key released"
                );
            }
            None => debug!("release without open press discarded"),
        }
    }

    /// Freeze the session and export it.
    ///
    /// Stopping again re-exports the preserved state with the same total time.
    pub fn stop<S>(&mut self, source: &S) -> ExportedPayload
    where
        S: PasswordSource + ?Sized,
    {
        if self.status != SessionStatus::Stopped {
            let now = self.clock.now_ms();
            self.stopped_elapsed = self.start_time.map(|start| now - start);
            self.status = SessionStatus::Stopped;
            debug!(
                records = self.records.len(),
                open = self.open_keys.len(),
                "recording stopped"
            );
        }
        self.export(source)
    }

    /// Export without changing state
    pub fn export<S>(&self, source: &S) -> ExportedPayload
    where
        S: PasswordSource + ?Sized,
    {
        export(&self.records, self.elapsed_ms(), source)
    }

    /// Return to idle, discarding everything
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.start_time = None;
        self.stopped_elapsed = None;
        self.records.clear();
        self.open_keys.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.status == SessionStatus::Recording
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Snapshot of all records so far, open ones included
    pub fn records(&self) -> &[KeyTimingRecord] {
        &self.records
    }

    /// Number of keys currently held down
    pub fn open_key_count(&self) -> usize {
        self.open_keys.len()
    }

    /// Elapsed ms since the origin, frozen once stopped
    pub fn elapsed_ms(&self) -> Option<f64> {
        match self.status {
            SessionStatus::Stopped => self.stopped_elapsed,
            _ => self
                .start_time
                .map(|start| self.clock.now_ms() - start),
        }
    }
}
