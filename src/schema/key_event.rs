//! Recorded key event streams
//!
//! Hosts that log raw press/release notifications (instead of driving a
//! recorder live) store them one event per line. Times are the host's clock
//! readings in milliseconds; only their differences matter.

use serde::{Deserialize, Serialize};

use crate::clock::MAX_TIME_MS;
use crate::error::KeycadenceError;

/// Kind of a logged notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEventKind {
    Start,
    Press,
    Release,
    Stop,
}

/// One logged notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    /// Required for press and release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Host clock reading in milliseconds
    pub at_ms: f64,
}

impl KeyEvent {
    pub fn press(key: impl Into<String>, at_ms: f64) -> Self {
        Self {
            kind: KeyEventKind::Press,
            key: Some(key.into()),
            at_ms,
        }
    }

    pub fn release(key: impl Into<String>, at_ms: f64) -> Self {
        Self {
            kind: KeyEventKind::Release,
            key: Some(key.into()),
            at_ms,
        }
    }

    pub fn start(at_ms: f64) -> Self {
        Self {
            kind: KeyEventKind::Start,
            key: None,
            at_ms,
        }
    }

    pub fn stop(at_ms: f64) -> Self {
        Self {
            kind: KeyEventKind::Stop,
            key: None,
            at_ms,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.at_ms.is_finite() || self.at_ms < 0.0 {
            return Err(format!("at_ms must be a non-negative number, got {}", self.at_ms));
        }
        if self.at_ms > MAX_TIME_MS as f64 {
            return Err(format!("at_ms {} exceeds {}", self.at_ms, MAX_TIME_MS));
        }
        match (self.kind, self.key.as_deref()) {
            (KeyEventKind::Press | KeyEventKind::Release, None | Some("")) => {
                Err(format!("{:?} event requires a key", self.kind).to_lowercase())
            }
            _ => Ok(()),
        }
    }
}

/// Parsing for logged event streams
pub struct KeyEventAdapter;

impl KeyEventAdapter {
    /// Parse a JSON array of events
    pub fn parse_array(json: &str) -> Result<Vec<KeyEvent>, KeycadenceError> {
        let events: Vec<KeyEvent> = serde_json::from_str(json)?;
        for (index, event) in events.iter().enumerate() {
            event
                .validate()
                .map_err(|message| KeycadenceError::InvalidEvent {
                    line: index + 1,
                    message,
                })?;
        }
        Ok(events)
    }

    /// Parse NDJSON (one event per line, blank lines skipped)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<KeyEvent>, KeycadenceError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event: KeyEvent =
                serde_json::from_str(trimmed).map_err(|e| KeycadenceError::InvalidEvent {
                    line: line_num + 1,
                    message: e.to_string(),
                })?;
            event
                .validate()
                .map_err(|message| KeycadenceError::InvalidEvent {
                    line: line_num + 1,
                    message,
                })?;
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = r#"
{"kind":"start","at_ms":0}
{"kind":"press","key":"a","at_ms":12.5}

{"kind":"release","key":"a","at_ms":96.1}
"#;
        let events = KeyEventAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], KeyEvent::press("a", 12.5));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"kind\":\"start\",\"at_ms\":0}\n{\"kind\":\"press\",\"at_ms\":4}\n";
        match KeyEventAdapter::parse_ndjson(ndjson) {
            Err(KeycadenceError::InvalidEvent { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("requires a key"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_array_rejects_negative_time() {
        let json = r#"[{"kind":"press","key":"a","at_ms":-1}]"#;
        assert!(KeyEventAdapter::parse_array(json).is_err());
    }

    #[test]
    fn test_time_beyond_limit_is_rejected() {
        assert!(KeyEvent::press("a", 1e19).validate().is_err());
        assert!(KeyEvent::press("a", MAX_TIME_MS as f64).validate().is_ok());

        let ndjson = "{\"kind\":\"start\",\"at_ms\":0}\n{\"kind\":\"press\",\"key\":\"a\",\"at_ms\":1e19}";
        assert!(matches!(
            KeyEventAdapter::parse_ndjson(ndjson),
            Err(KeycadenceError::InvalidEvent { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_kind_fails() {
        let json = r#"[{"kind":"hover","at_ms":1}]"#;
        assert!(matches!(
            KeyEventAdapter::parse_array(json),
            Err(KeycadenceError::JsonError(_))
        ));
    }
}
