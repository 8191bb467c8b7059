//! Error types for LaTeX MCP Server
//!
//! This enum covers caller-usage errors only: bad paths and invalid flag
//! combinations rejected before any work starts. Operational failures
//! (compiler exit codes, malformed PDFs, undeletable files) are reported
//! inside the per-operation result types, never raised.

use thiserror::Error;

/// Result type alias for LaTeX MCP Server
pub type Result<T> = std::result::Result<T, Error>;

/// Usage errors for LaTeX MCP Server operations
#[derive(Error, Debug)]
pub enum Error {
    /// Empty input path
    #[error("Path cannot be empty")]
    EmptyPath,

    /// Input path does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Input path exists but cannot be accessed
    #[error("Cannot access file {path}: {reason}")]
    FileAccess { path: String, reason: String },

    /// Both validation modes requested at once
    #[error("Cannot use both quick and strict modes simultaneously")]
    ConflictingModes,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
