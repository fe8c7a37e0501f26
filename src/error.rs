//! Structured error types for configuration resolution and worker handoff.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::env::Scrubber;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Resolution errors
    ConfigValidation,
    ConfigParse,
    PathEscape,

    // Environment file errors
    EnvSecurity,

    // Worker errors
    WorkerMissing,
    WorkerExit,

    // Internal errors
    IoError,
}

/// Structured error surfaced to the caller of a build invocation.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct BuildError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Exit status of the worker, when it ran and exited normally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl BuildError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
            exit_code: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::new(
            ErrorCode::ConfigValidation,
            format!("Missing required configuration: {}", fields.join(", ")),
        )
        .with_field(fields.join(","))
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::ConfigValidation, reason).with_field(field)
    }

    pub fn config_parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConfigParse,
            format!("Failed to parse config file {}", path.display()),
        )
        .with_details(err.to_string())
    }

    pub fn path_escape(candidate: &Path, root: &Path) -> Self {
        Self::new(
            ErrorCode::PathEscape,
            format!(
                "Path {} escapes project root {}",
                candidate.display(),
                root.display()
            ),
        )
    }

    pub fn env_security(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EnvSecurity, message)
    }

    pub fn worker_missing(expected: &Path) -> Self {
        Self::new(
            ErrorCode::WorkerMissing,
            format!("Worker executable not found at {}", expected.display()),
        )
        .with_details("Build the packr worker first and place the binary at that path")
    }

    pub fn worker_exit(code: Option<i32>) -> Self {
        let message = match code {
            Some(code) => format!("Worker exited with status {}", code),
            None => "Worker terminated by signal".to_string(),
        };
        Self {
            exit_code: code,
            ..Self::new(ErrorCode::WorkerExit, message)
        }
    }

    pub fn worker_spawn(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::WorkerExit, "Failed to start worker process")
            .with_details(err.to_string())
    }

    pub fn io(context: &str, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::IoError, context).with_details(err.to_string())
    }

    /// Replace every known sensitive value in the message and details with the mask.
    pub fn scrubbed(self, scrubber: &Scrubber) -> Self {
        Self {
            message: scrubber.scrub(&self.message),
            details: self.details.map(|d| scrubber.scrub(&d)),
            ..self
        }
    }

    /// Message plus details, as shown on the terminal.
    pub fn report(&self) -> String {
        match &self.details {
            Some(details) => format!("{}: {}", self.message, details),
            None => self.message.clone(),
        }
    }
}

/// Result type for build operations.
pub type BuildResult<T> = std::result::Result<T, BuildError>;
