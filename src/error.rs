//! Crate-wide error type.
//!
//! Every fallible operation returns [`AppError`]. The HTTP layer turns it into
//! a status code plus a machine-readable [`ErrorCode`]; the CLI prints it.

use rusqlite::ffi;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    DuplicateError,
    StatementParseError,
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::DuplicateError => write!(f, "DUPLICATE_ERROR"),
            ErrorCode::StatementParseError => write!(f, "STATEMENT_PARSE_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation { errors: FieldErrors },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("A record with this unique field already exists")]
    Duplicate,

    #[error("Statement rejected: {} row(s) could not be parsed", .0.len())]
    StatementParse(Vec<String>),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation { errors }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Duplicate => ErrorCode::DuplicateError,
            AppError::StatementParse(_) => ErrorCode::StatementParseError,
            AppError::Storage(_) | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => AppError::not_found("Record"),
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                AppError::Duplicate
            }
            other => AppError::Storage(other),
        }
    }
}
