//! Replay of logged key event streams
//!
//! Drives a [`KeystrokeRecorder`] from a [`ManualClock`] set to each event's
//! logged time, so a stored stream is paired, de-duplicated and exported by
//! exactly the same rules as live capture.

use tracing::debug;

use crate::capture::KeystrokeRecorder;
use crate::clock::ManualClock;
use crate::config::CaptureConfig;
use crate::export::PasswordSource;
use crate::schema::{KeyEvent, KeyEventKind};
use crate::types::ExportedPayload;

/// Replay `events` in order and export the result.
///
/// The session is stopped at the first `stop` event, or after the last event
/// if the stream has none. Timestamps that go backwards are held at the
/// latest reading seen. Events that fail [`KeyEvent::validate`] are skipped.
pub fn replay<S>(events: &[KeyEvent], source: &S, config: &CaptureConfig) -> ExportedPayload
where
    S: PasswordSource + ?Sized,
{
    let clock = ManualClock::new();
    let mut recorder = KeystrokeRecorder::with_config(clock.clone(), config.clone());

    for event in events {
        if let Err(message) = event.validate() {
            debug!(%message, "skipping invalid replay event");
            continue;
        }
        clock.set(event.at_ms);
        let key = event.key.as_deref().unwrap_or_default();
        match event.kind {
            KeyEventKind::Start => recorder.start(),
            KeyEventKind::Press => recorder.on_press(key),
            KeyEventKind::Release => recorder.on_release(key),
            KeyEventKind::Stop => {
                debug!(events = events.len(), "replay stopped by stop event");
                return recorder.stop(source);
            }
        }
    }

    recorder.stop(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KeyEventAdapter;
    use pretty_assertions::assert_eq;

    fn auto_start() -> CaptureConfig {
        CaptureConfig {
            start_on_first_press: true,
        }
    }

    #[test]
    fn test_replay_with_explicit_start_and_stop() {
        let events = vec![
            KeyEvent::start(1000.0),
            KeyEvent::press("a", 1100.2),
            KeyEvent::release("a", 1190.7),
            KeyEvent::press("b", 1300.0),
            KeyEvent::release("b", 1380.0),
            KeyEvent::stop(1500.0),
            KeyEvent::press("c", 1600.0),
        ];

        let payload = replay(&events, "ab", &CaptureConfig::default());
        assert_eq!(payload.password, "ab");
        assert_eq!(payload.total_time, 500);
        assert_eq!(payload.keystroke_timings.len(), 2);
        assert_eq!(payload.keystroke_timings[0].press_time, 100);
        assert_eq!(payload.keystroke_timings[0].release_time, 191);
    }

    #[test]
    fn test_replay_without_start_records_nothing_by_default() {
        let events = vec![KeyEvent::press("a", 0.0), KeyEvent::release("a", 80.0)];
        let payload = replay(&events, "a", &CaptureConfig::default());
        assert!(payload.keystroke_timings.is_empty());
        assert_eq!(payload.total_time, 0);
    }

    #[test]
    fn test_replay_auto_start_stops_at_last_event() {
        let events = vec![
            KeyEvent::press("a", 500.0),
            KeyEvent::press("a", 530.0),
            KeyEvent::press("a", 560.0),
            KeyEvent::release("a", 590.0),
        ];
        let payload = replay(&events, "a", &auto_start());
        assert_eq!(payload.keystroke_timings.len(), 1);
        assert_eq!(payload.keystroke_timings[0].dwell(), Some(90));
        assert_eq!(payload.total_time, 90);
    }

    #[test]
    fn test_replay_backwards_timestamp_is_clamped() {
        let events = vec![
            KeyEvent::start(100.0),
            KeyEvent::press("a", 200.0),
            KeyEvent::release("a", 150.0),
        ];
        let payload = replay(&events, "a", &CaptureConfig::default());
        assert_eq!(payload.keystroke_timings[0].dwell(), Some(0));
    }

    #[test]
    fn test_replay_skips_out_of_range_times() {
        let events = vec![
            KeyEvent::start(0.0),
            KeyEvent::press("a", 1e19),
            KeyEvent::release("a", 1e19 + 5000.0),
            KeyEvent::press("b", 100.0),
            KeyEvent::release("b", 180.0),
        ];
        let payload = replay(&events, "b", &CaptureConfig::default());

        assert_eq!(payload.keystroke_timings.len(), 1);
        assert_eq!(payload.keystroke_timings[0].key, "b");
        assert_eq!(payload.keystroke_timings[0].press_time, 100);
        assert_eq!(payload.total_time, 180);
    }

    #[test]
    fn test_replay_from_ndjson() {
        let ndjson = r#"{"kind":"start","at_ms":0}
{"kind":"press","key":"x","at_ms":10}
{"kind":"release","key":"y","at_ms":40}
{"kind":"release","key":"x","at_ms":95}
{"kind":"stop","at_ms":120}"#;
        let events = KeyEventAdapter::parse_ndjson(ndjson).unwrap();
        let payload = replay(&events, "x", &CaptureConfig::default());

        assert_eq!(payload.keystroke_timings.len(), 1);
        assert_eq!(payload.keystroke_timings[0].key, "x");
        assert_eq!(payload.total_time, 120);
    }
}
