//! Error taxonomy for the load pipeline.
//!
//! Row-level errors (`MissingDependency`) are absorbed and counted by the
//! batch engine; everything else propagates and halts the current stage.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Structurally invalid input file. Raised before any row is staged;
    /// aborts the whole stage.
    #[error("validation failed for {file}: {message}")]
    Validation { file: String, message: String },

    /// A row references a parent entity that does not exist. Row-level:
    /// the row is skipped and counted, the batch continues.
    #[error("missing {entity} for key '{key}'")]
    MissingDependency { entity: &'static str, key: String },

    /// A dependency table is empty; an earlier stage has not run.
    #[error("dependency table '{table}' is empty; {hint}")]
    EmptyDependency {
        table: &'static str,
        hint: &'static str,
    },

    /// A mandatory input file is absent.
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage-level failure, including constraint violations at commit.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LoadError {
    pub fn validation(file: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Validation {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// True when the underlying database error is a unique-constraint violation.
/// The engine downgrades these to logged duplicate skips.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
