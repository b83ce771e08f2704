//! Error types for route-linter.
//!
//! Only structural failures are errors. Anything wrong with a single
//! registration or call expression is recorded as a [`Diagnostic`] and the
//! run continues.
//!
//! [`Diagnostic`]: crate::model::Diagnostic

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for route-linter operations.
pub type Result<T> = std::result::Result<T, LintError>;

/// Errors that abort an analysis run.
#[derive(Error, Debug)]
pub enum LintError {
    /// A source unit handed over by the traversal collaborator has no path.
    #[error("Invalid source unit at index {0}: empty path")]
    InvalidSourceUnit(usize),

    /// The tree-sitter grammar could not be loaded into a parser.
    #[error("Failed to initialize parser for {0}: {1}")]
    ParserInit(PathBuf, String),

    /// An explicitly requested config file could not be parsed.
    #[error("Invalid config {0}: {1}")]
    Config(PathBuf, String),

    /// File system error while reading sources.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
