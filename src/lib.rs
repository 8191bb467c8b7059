//! LaTeX MCP Server Library
//!
//! This crate provides MCP tools for LaTeX workflows:
//! - `compile_latex`: Compile LaTeX sources to PDF via an external engine
//! - `validate_latex`: Structural validation without compilation
//! - `pdf_info`: Document and page metadata from PDF files
//! - `cleanup`: Remove LaTeX build artifacts

pub mod error;
pub mod latex;
pub mod pdf;
pub mod server;

pub use error::{Error, Result};
pub use server::{
    run_server, run_server_with_config, CleanupParams, CompileLatexParams, LatexServer,
    PdfInfoParams, ServerConfig, ValidateLatexParams,
};
