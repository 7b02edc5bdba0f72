//! Keycadence CLI
//!
//! Commands:
//! - capture: Replay a logged key event stream into a payload
//! - compare: Compare two payloads of the same password
//! - analyze: Check a payload for timing anomalies
//! - schema: Print the payload JSON schema

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use keycadence::replay::replay;
use keycadence::schema::{KeyEventAdapter, SubmittedPayload};
use keycadence::{KeycadenceConfig, KeycadenceError, PatternAnalyzer, PatternComparator, KEYCADENCE_VERSION};

/// Keycadence - keystroke dynamics capture and scoring
#[derive(Parser)]
#[command(name = "keycadence")]
#[command(author = "Synheart AI Inc")]
#[command(version = KEYCADENCE_VERSION)]
#[command(about = "Capture and score keystroke timing samples", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a key event log into a payload
    Capture {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Content of the password field at export time
        #[arg(long)]
        password: String,

        /// Start recording on the first press instead of requiring a start event
        #[arg(long)]
        auto_start: bool,
    },

    /// Compare a candidate payload against a reference
    Compare {
        /// Reference (enrollment) payload
        #[arg(short, long)]
        reference: PathBuf,

        /// Candidate (live attempt) payload
        #[arg(short, long)]
        candidate: PathBuf,

        /// Similarity threshold, overrides the configuration
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Check a payload for timing anomalies
    Analyze {
        /// Payload file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the payload JSON schema
    Schema,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), KeycadenceCliError> {
    let config = match &cli.config {
        Some(path) => KeycadenceConfig::load(path)?,
        None => KeycadenceConfig::default(),
    };
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let output = match cli.command {
        Commands::Capture {
            input,
            input_format,
            password,
            auto_start,
        } => cmd_capture(&input, input_format, &password, auto_start, &config, cli.pretty)?,

        Commands::Compare {
            reference,
            candidate,
            threshold,
        } => cmd_compare(&reference, &candidate, threshold, &config, cli.pretty)?,

        Commands::Analyze { input } => cmd_analyze(&input, &config, cli.pretty)?,

        Commands::Schema => serde_json::to_string_pretty(&payload_json_schema())?,
    };

    println!("{}", output);
    Ok(())
}

fn cmd_capture(
    input: &Path,
    input_format: InputFormat,
    password: &str,
    auto_start: bool,
    config: &KeycadenceConfig,
    pretty: bool,
) -> Result<String, KeycadenceCliError> {
    let data = read_input(input)?;
    let events = match input_format {
        InputFormat::Ndjson => KeyEventAdapter::parse_ndjson(&data)?,
        InputFormat::Json => KeyEventAdapter::parse_array(&data)?,
    };
    if events.is_empty() {
        return Err(KeycadenceCliError::NoEvents);
    }

    let mut capture = config.capture.clone();
    capture.start_on_first_press |= auto_start;

    let payload = replay(&events, password, &capture);
    tracing::info!(
        events = events.len(),
        keystrokes = payload.keystroke_timings.len(),
        "event log replayed"
    );
    to_json(&payload, pretty)
}

fn cmd_compare(
    reference: &Path,
    candidate: &Path,
    threshold: Option<f64>,
    config: &KeycadenceConfig,
    pretty: bool,
) -> Result<String, KeycadenceCliError> {
    let mut comparator_config = config.comparator.clone();
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(KeycadenceCliError::InvalidThreshold(threshold));
        }
        comparator_config.threshold = threshold;
    }

    let reference = SubmittedPayload::from_json(&read_input(reference)?)?;
    let candidate = SubmittedPayload::from_json(&read_input(candidate)?)?;

    let result = PatternComparator::with_config(comparator_config).compare(&reference, &candidate);
    to_json(&result, pretty)
}

fn cmd_analyze(
    input: &Path,
    config: &KeycadenceConfig,
    pretty: bool,
) -> Result<String, KeycadenceCliError> {
    let payload = SubmittedPayload::from_json(&read_input(input)?)?;
    let result = PatternAnalyzer::with_config(config.analyzer.clone()).analyze(&payload);
    to_json(&result, pretty)
}

// Helper functions

fn read_input(path: &Path) -> Result<String, KeycadenceCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, KeycadenceCliError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn payload_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "keystroke payload",
        "description": "One captured password entry with per-key timings",
        "type": "object",
        "required": ["password", "keystroke_timings", "total_time"],
        "properties": {
            "password": { "type": "string" },
            "keystroke_timings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["key", "press_time", "release_time"],
                    "properties": {
                        "key": { "type": "string" },
                        "press_time": { "type": "integer", "minimum": 0 },
                        "release_time": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "total_time": { "type": "integer", "minimum": 0 }
        }
    })
}

// Error types

#[derive(Debug)]
enum KeycadenceCliError {
    Io(io::Error),
    Keycadence(KeycadenceError),
    Json(serde_json::Error),
    NoEvents,
    InvalidThreshold(f64),
}

impl From<io::Error> for KeycadenceCliError {
    fn from(e: io::Error) -> Self {
        KeycadenceCliError::Io(e)
    }
}

impl From<KeycadenceError> for KeycadenceCliError {
    fn from(e: KeycadenceError) -> Self {
        KeycadenceCliError::Keycadence(e)
    }
}

impl From<serde_json::Error> for KeycadenceCliError {
    fn from(e: serde_json::Error) -> Self {
        KeycadenceCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KeycadenceCliError> for CliError {
    fn from(e: KeycadenceCliError) -> Self {
        match e {
            KeycadenceCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KeycadenceCliError::Keycadence(KeycadenceError::ConfigError(message)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message,
                hint: Some("Fix the configuration file or omit --config".to_string()),
            },
            KeycadenceCliError::Keycadence(e @ KeycadenceError::ReadError { .. }) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --config path and permissions".to_string()),
            },
            KeycadenceCliError::Keycadence(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'keycadence schema' for the expected payload format".to_string()),
            },
            KeycadenceCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            KeycadenceCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No key events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            KeycadenceCliError::InvalidThreshold(value) => CliError {
                code: "INVALID_THRESHOLD".to_string(),
                message: format!("Threshold {} is outside [0, 1]", value),
                hint: None,
            },
        }
    }
}
