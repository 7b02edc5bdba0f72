//! Account registration and login bodies
//!
//! The registration form posts the typed password together with the captured
//! keystroke payload, serialized by the page into a hidden `tpu_json` field.
//! The payload is optional: a missing, empty, or unparsable field registers the
//! account without one. A parsable payload is forwarded exactly as the page
//! wrote it; the backend owns its validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// JSON body sent to the backend's registration endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    /// Account password
    pub passwordu: String,
    /// Optional secondary secret
    pub secretu: Option<String>,
    /// Keystroke payload captured while the password was typed
    pub tpu: Option<Value>,
}

impl RegistrationRequest {
    /// Build the request from raw form values
    pub fn from_form(
        name: &str,
        email: &str,
        password: &str,
        secret: Option<&str>,
        tpu_json: Option<&str>,
    ) -> Self {
        Self {
            name: name.trim().to_string(),
            email: normalize_email(email),
            passwordu: password.to_string(),
            secretu: secret.filter(|s| !s.is_empty()).map(str::to_string),
            tpu: parse_tpu(tpu_json),
        }
    }

    /// Credentials for signing in right after registration
    pub fn login_request(&self) -> LoginRequest {
        LoginRequest {
            username: self.email.clone(),
            password: self.passwordu.clone(),
        }
    }
}

/// Form fields sent to the backend's login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// The account email
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn from_form(email: &str, password: &str) -> Self {
        Self {
            username: normalize_email(email),
            password: password.to_string(),
        }
    }
}

/// Emails are compared trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Decode the hidden payload field; anything shorter than a non-empty object
/// or not valid JSON yields `None`
pub fn parse_tpu(tpu_json: Option<&str>) -> Option<Value> {
    let raw = tpu_json?;
    if raw.len() <= 2 {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(error = %e, "ignoring unparsable keystroke payload");
            None
        }
    }
}
