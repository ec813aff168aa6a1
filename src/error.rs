//! Error types for Arthya

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        missing_fields: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Schema mismatch: expected {expected:?}, got {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("No model artifact found for user {0}")]
    ArtifactNotFound(UserId),

    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    #[error("A fit is already in progress for user {0}")]
    Busy(UserId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tracking error: {0}")]
    Tracking(String),
}

impl Error {
    /// Validation failure listing the required fields that were absent
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::Validation {
            message: format!("missing required fields: {}", fields.join(", ")),
            missing_fields: fields,
        }
    }

    /// Validation failure for a malformed value
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    /// Category of this error, stable across releases
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::InsufficientData(_) => ErrorKind::InsufficientData,
            Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Error::ArtifactNotFound(_) => ErrorKind::ArtifactNotFound,
            Error::NumericInstability(_) => ErrorKind::NumericInstability,
            Error::Busy(_) => ErrorKind::Busy,
            Error::Io(_) | Error::Csv(_) => ErrorKind::Io,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Tracking(_) => ErrorKind::Tracking,
        }
    }

    /// Whether a caller-level retry could change the outcome.
    ///
    /// Only external I/O qualifies; statistical failures on the same input repeat.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io)
    }
}

/// Serializable error category recorded in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    InsufficientData,
    SchemaMismatch,
    ArtifactNotFound,
    NumericInstability,
    Busy,
    Io,
    Serialization,
    Tracking,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::ArtifactNotFound => "artifact_not_found",
            ErrorKind::NumericInstability => "numeric_instability",
            ErrorKind::Busy => "busy",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Tracking => "tracking",
        };
        write!(f, "{name}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
