//! MCP Server implementation using rmcp

use crate::latex::{
    clean_latex, compile_latex, validate_latex, CleanupOptions, CleanupReport, CompilationReport,
    CompileOptions, ValidationReport, DEFAULT_TIMEOUT_SECS,
};
use crate::pdf::{extract_pdf_info, PdfInfoReport};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Listed files and messages are capped at this many items per response
const MAX_LISTED_ITEMS: usize = 10;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Compile timeout applied when the client does not supply one
    pub default_timeout_secs: u64,
    /// External TeX engine invoked by compile_latex
    pub engine: String,
    /// Maximum bytes of compiler log echoed into a tool response
    pub max_log_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            engine: "pdflatex".to_string(),
            max_log_bytes: 64 * 1024,
        }
    }
}

/// LaTeX MCP Server
#[derive(Clone)]
pub struct LatexServer {
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompileLatexParams {
    /// Path to the .tex file to compile
    pub tex_path: String,
    /// Directory for output (defaults to the source file's directory)
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Maximum seconds to wait for compilation (default: 30)
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateLatexParams {
    /// Path to the .tex file to validate
    pub file_path: String,
    /// Perform quick structural checks only (mutually exclusive with strict)
    #[serde(default)]
    pub quick: bool,
    /// Perform thorough validation with style checks (mutually exclusive with quick)
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PdfInfoParams {
    /// Path to the PDF file to analyze
    pub file_path: String,
    /// Extract text content from PDF pages
    #[serde(default)]
    pub include_text: bool,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CleanupParams {
    /// Path to a .tex file or directory to clean
    pub path: String,
    /// File extensions to clean (defaults to common auxiliary files)
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    /// Show what would be cleaned without removing files
    #[serde(default)]
    pub dry_run: bool,
    /// Clean subdirectories recursively
    #[serde(default)]
    pub recursive: bool,
    /// Create backup of files before deletion
    #[serde(default)]
    pub create_backup: bool,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl LatexServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new LatexServer with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Compile a LaTeX file to PDF
    #[tool(
        description = "Compile a LaTeX file to PDF with comprehensive error handling. Reports the output artifact path, compiler log, and timing; failures include the compiler's exit status."
    )]
    async fn compile_latex(&self, Parameters(params): Parameters<CompileLatexParams>) -> String {
        let options = CompileOptions {
            output_dir: params.output_dir.map(PathBuf::from),
            timeout: Duration::from_secs(
                params.timeout.unwrap_or(self.config.default_timeout_secs),
            ),
            engine: self.config.engine.clone(),
        };

        match compile_latex(&params.tex_path, &options).await {
            Ok(report) => self.render_compile(&report),
            Err(e) => {
                tracing::warn!(error = %e, "compile_latex rejected");
                format!("Error: {}", e)
            }
        }
    }

    /// Validate LaTeX syntax without full compilation
    #[tool(
        description = "Validate LaTeX syntax without full compilation. Checks document structure, brace balance, environment matching, and package usage. quick and strict modes are mutually exclusive."
    )]
    async fn validate_latex(&self, Parameters(params): Parameters<ValidateLatexParams>) -> String {
        let result = tokio::task::spawn_blocking(move || {
            validate_latex(&params.file_path, params.quick, params.strict)
        })
        .await;

        match result {
            Ok(Ok(report)) => render_validation(&report),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "validate_latex rejected");
                format!("Error: {}", e)
            }
            Err(e) => format!("Error: validation task failed: {}", e),
        }
    }

    /// Extract PDF metadata and information
    #[tool(
        description = "Extract PDF metadata and information without compilation: page count, page dimensions, PDF version, encryption status, document info fields, and optionally per-page text."
    )]
    async fn pdf_info(&self, Parameters(params): Parameters<PdfInfoParams>) -> String {
        let include_text = params.include_text;
        let result = tokio::task::spawn_blocking(move || {
            extract_pdf_info(
                &params.file_path,
                params.include_text,
                params.password.as_deref(),
            )
        })
        .await;

        match result {
            Ok(Ok(report)) => render_pdf_info(&report, include_text),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "pdf_info rejected");
                format!("Error: {}", e)
            }
            Err(e) => format!("Error: PDF info task failed: {}", e),
        }
    }

    /// Clean LaTeX auxiliary files
    #[tool(
        description = "Clean LaTeX auxiliary files (.aux, .log, .out, etc.) from directories or individual files. Supports dry runs, recursion, custom extension lists, and pre-delete backups. Source, output, and image files are never removed."
    )]
    async fn cleanup(&self, Parameters(params): Parameters<CleanupParams>) -> String {
        let result = tokio::task::spawn_blocking(move || {
            let options = CleanupOptions {
                extensions: params.extensions,
                dry_run: params.dry_run,
                recursive: params.recursive,
                create_backup: params.create_backup,
            };
            clean_latex(&params.path, &options)
        })
        .await;

        match result {
            Ok(Ok(report)) => render_cleanup(&report),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "cleanup rejected");
                format!("Error: {}", e)
            }
            Err(e) => format!("Error: cleanup task failed: {}", e),
        }
    }
}

// ============================================================================
// Response rendering
// ============================================================================

impl LatexServer {
    fn render_compile(&self, report: &CompilationReport) -> String {
        let mut text = String::new();

        if report.success {
            text.push_str("✓ LaTeX compilation successful!\n");
            if let Some(ref output) = report.output_path {
                text.push_str(&format!("Output: {}\n", output.display()));
            }
        } else {
            text.push_str("✗ LaTeX compilation failed\n");
            if let Some(ref message) = report.error_message {
                text.push_str(&format!("Error: {}\n", message));
            }
        }
        text.push_str(&format!(
            "Compilation time: {:.2}s\n",
            report.elapsed.as_secs_f64()
        ));

        if let Some(ref log) = report.log_content {
            text.push_str(&format!("\nLog content:\n{}", self.truncate_log(log)));
        }

        text
    }

    fn truncate_log(&self, log: &str) -> String {
        if log.len() <= self.config.max_log_bytes {
            return log.to_string();
        }
        let mut end = self.config.max_log_bytes;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n... [log truncated]", &log[..end])
    }
}

fn push_listed(text: &mut String, items: &[String]) {
    for item in items.iter().take(MAX_LISTED_ITEMS) {
        text.push_str(&format!("  • {}\n", item));
    }
    if items.len() > MAX_LISTED_ITEMS {
        text.push_str(&format!("  ... and {} more\n", items.len() - MAX_LISTED_ITEMS));
    }
}

fn render_validation(report: &ValidationReport) -> String {
    let mut text = String::new();

    if report.is_valid {
        text.push_str("✓ Valid LaTeX syntax\n");
        text.push_str("No errors found\n");
    } else {
        text.push_str("✗ Invalid LaTeX syntax\n");
        text.push_str(&format!("Errors found ({}):\n", report.errors.len()));
        push_listed(&mut text, &report.errors);
    }
    if !report.warnings.is_empty() {
        text.push_str(&format!("Warnings ({}):\n", report.warnings.len()));
        push_listed(&mut text, &report.warnings);
    }
    text.push_str(&format!(
        "Validation time: {:.3}s\n",
        report.elapsed.as_secs_f64()
    ));

    text
}

fn render_pdf_info(report: &PdfInfoReport, include_text: bool) -> String {
    let mut text = String::new();

    if !report.success {
        text.push_str("✗ PDF info extraction failed\n");
        if let Some(ref message) = report.error_message {
            text.push_str(&format!("Error: {}\n", message));
        }
        text.push_str(&format!(
            "Extraction time: {:.3}s\n",
            report.elapsed.as_secs_f64()
        ));
        return text;
    }

    text.push_str("✓ PDF info extracted successfully\n");
    text.push_str(&format!("File: {}\n", report.file_path));
    text.push_str(&format!("Pages: {}\n", report.page_count));
    text.push_str(&format!("File size: {} bytes\n", report.file_size_bytes));
    if let Some(ref version) = report.pdf_version {
        text.push_str(&format!("PDF version: {}\n", version));
    }
    text.push_str(&format!(
        "Encrypted: {}\n",
        if report.is_encrypted { "Yes" } else { "No" }
    ));

    if !report.page_dimensions.is_empty() {
        text.push_str("Dimensions:\n");
        for (i, dims) in report
            .page_dimensions
            .iter()
            .take(MAX_LISTED_ITEMS)
            .enumerate()
        {
            text.push_str(&format!(
                "  Page {}: {:.1} x {:.1} {}\n",
                i + 1,
                dims.width,
                dims.height,
                dims.unit
            ));
        }
        if report.page_dimensions.len() > MAX_LISTED_ITEMS {
            text.push_str(&format!(
                "  ... and {} more\n",
                report.page_dimensions.len() - MAX_LISTED_ITEMS
            ));
        }
    }

    let meta = &report.metadata;
    for (label, value) in [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Subject", &meta.subject),
        ("Keywords", &meta.keywords),
        ("Producer", &meta.producer),
        ("Creator", &meta.creator),
        ("Created", &meta.creation_date),
        ("Modified", &meta.modification_date),
    ] {
        if let Some(value) = value {
            if !value.is_empty() {
                text.push_str(&format!("{}: {}\n", label, value));
            }
        }
    }

    if include_text {
        if let Some(ref pages) = report.text_content {
            text.push_str("\nText content:\n");
            for (i, page_text) in pages.iter().take(MAX_LISTED_ITEMS).enumerate() {
                let trimmed = page_text.trim();
                if trimmed.is_empty() {
                    text.push_str(&format!("  Page {}: [No text content]\n", i + 1));
                } else {
                    let preview: String = trimmed.chars().take(100).collect();
                    text.push_str(&format!("  Page {}: {}...\n", i + 1, preview));
                }
            }
            if pages.len() > MAX_LISTED_ITEMS {
                text.push_str(&format!("  ... and {} more\n", pages.len() - MAX_LISTED_ITEMS));
            }
        }
    }

    text.push_str(&format!(
        "Extraction time: {:.3}s\n",
        report.elapsed.as_secs_f64()
    ));

    text
}

fn render_cleanup(report: &CleanupReport) -> String {
    let mut text = String::new();

    if report.dry_run {
        text.push_str("✓ Cleanup dry run completed\n");
        if report.would_clean_files.is_empty() {
            text.push_str("No files to clean\n");
        } else {
            text.push_str(&format!(
                "Would clean {} files:\n",
                report.would_clean_files.len()
            ));
            push_listed(&mut text, &report.would_clean_files);
        }
    } else {
        text.push_str("✓ Cleanup completed successfully\n");
        if report.cleaned_files.is_empty() {
            text.push_str("No files needed cleaning\n");
        } else {
            text.push_str(&format!("Files cleaned: {}\n", report.cleaned_files.len()));
            push_listed(&mut text, &report.cleaned_files);
        }
        if !report.skipped_files.is_empty() {
            text.push_str(&format!(
                "Files skipped (could not remove): {}\n",
                report.skipped_files.len()
            ));
            push_listed(&mut text, &report.skipped_files);
        }
    }

    if let Some(ref message) = report.error_message {
        text.push_str(&format!("{}\n", message));
    }

    if let Some(ref tex) = report.tex_file_path {
        text.push_str(&format!("Cleaned around: {}\n", tex));
    } else if let Some(ref dir) = report.directory_path {
        text.push_str(&format!("Cleaned directory: {}\n", dir));
    }

    if report.backup_created {
        if let Some(ref backup) = report.backup_directory {
            text.push_str(&format!("Backup created: {}\n", backup));
        }
    }

    text.push_str(&format!(
        "Cleanup time: {:.3}s\n",
        report.elapsed.as_secs_f64()
    ));

    text
}

impl Default for LatexServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for LatexServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "LaTeX MCP Server provides tools for compiling LaTeX to PDF, validating \
                 LaTeX structure without compilation, inspecting PDF metadata, and cleaning \
                 up LaTeX build artifacts."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with the default configuration
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = LatexServer::with_config(config);

    tracing::info!("LaTeX MCP Server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
