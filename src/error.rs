//! Error types for Keycadence
//!
//! Capture and scoring never fail; these errors only arise at the parsing and
//! configuration boundaries.

use thiserror::Error;

use crate::schema::ValidationError;

/// Errors that can occur when loading inputs or configuration
#[derive(Debug, Error)]
pub enum KeycadenceError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Invalid key event at line {line}: {message}")]
    InvalidEvent { line: usize, message: String },
}
