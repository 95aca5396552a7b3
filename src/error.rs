//! Error types for schema resolution

use thiserror::Error;

use crate::definitions::ExpandError;
use crate::pointer::PathError;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema resolution errors
///
/// Every variant is a deterministic content or configuration defect. None of
/// them is retried and none falls back to an earlier schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid version format: {0:?}")]
    InvalidVersionFormat(String),

    #[error("Invalid requested version {requested:?} for format '{format}'")]
    InvalidRequestedVersion { format: String, requested: String },

    #[error("Duplicate version {version} in format '{format}'")]
    DuplicateVersion { format: String, version: String },

    #[error("Change {version} in format '{format}' has no operations")]
    EmptyChangeRecord { format: String, version: String },

    #[error("Format '{format}' at {requested}: change {change}, operation {operation} failed: {source}")]
    PatchFailed {
        format: String,
        requested: String,
        change: String,
        operation: usize,
        #[source]
        source: PathError,
    },

    #[error("Format '{format}' at {requested}: {source}")]
    ExpansionFailed {
        format: String,
        requested: String,
        #[source]
        source: ExpandError,
    },

    #[error("Definition already registered: {0}")]
    DuplicateDefinitionName(String),

    #[error("Format already registered: {0}")]
    DuplicateFormat(String),

    #[error("Unknown format '{id}'{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownFormat { id: String, suggestion: Option<String> },

    #[error("Invalid schema source {origin}: {reason}")]
    InvalidSource { origin: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat classification of [`SchemaError`], convenient for callers that
/// branch on the failure category rather than its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidVersionFormat,
    DuplicateVersion,
    EmptyChangeRecord,
    PathNotFound,
    TypeMismatch,
    IndexOutOfRange,
    KeyExists,
    ExpansionFailed,
    DuplicateDefinitionName,
    DuplicateFormat,
    UnknownFormat,
    InvalidSource,
    Io,
    Json,
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::InvalidVersionFormat(_) | SchemaError::InvalidRequestedVersion { .. } => {
                ErrorKind::InvalidVersionFormat
            }
            SchemaError::DuplicateVersion { .. } => ErrorKind::DuplicateVersion,
            SchemaError::EmptyChangeRecord { .. } => ErrorKind::EmptyChangeRecord,
            SchemaError::PatchFailed { source, .. } => match source {
                PathError::PathNotFound { .. } => ErrorKind::PathNotFound,
                PathError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
                PathError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
                PathError::KeyExists { .. } => ErrorKind::KeyExists,
            },
            SchemaError::ExpansionFailed { .. } => ErrorKind::ExpansionFailed,
            SchemaError::DuplicateDefinitionName(_) => ErrorKind::DuplicateDefinitionName,
            SchemaError::DuplicateFormat(_) => ErrorKind::DuplicateFormat,
            SchemaError::UnknownFormat { .. } => ErrorKind::UnknownFormat,
            SchemaError::InvalidSource { .. } => ErrorKind::InvalidSource,
            SchemaError::Io(_) => ErrorKind::Io,
            SchemaError::Json(_) => ErrorKind::Json,
        }
    }

    pub(crate) fn invalid_source(origin: impl Into<String>, reason: impl ToString) -> Self {
        SchemaError::InvalidSource {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}
