//! LaTeX compilation driver
//!
//! Wraps an external TeX engine (pdflatex by default) in non-stop mode,
//! captures its streams and log file, and enforces a timeout. Success
//! requires both a zero exit code and the predicted PDF artifact: some
//! engine failure modes exit 0 without producing output.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Default compilation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options for a compilation run
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Output directory (defaults to the source file's directory)
    pub output_dir: Option<PathBuf>,
    /// Maximum time to wait before killing the engine
    pub timeout: Duration,
    /// External engine to invoke
    pub engine: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            engine: "pdflatex".to_string(),
        }
    }
}

/// Result of a compilation run
#[derive(Debug, Clone)]
pub struct CompilationReport {
    pub success: bool,
    /// Path of the produced PDF when compilation succeeded
    pub output_path: Option<PathBuf>,
    pub error_message: Option<String>,
    /// Contents of the engine's log file, when one was written
    pub log_content: Option<String>,
    pub elapsed: Duration,
}

impl CompilationReport {
    fn failure(message: String, log_content: Option<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            output_path: None,
            error_message: Some(message),
            log_content,
            elapsed,
        }
    }
}

/// Compile a LaTeX file to PDF.
///
/// Empty and nonexistent source paths are usage errors; every failure
/// after that point is reported inside the returned `CompilationReport`.
pub async fn compile_latex(tex_path: &str, options: &CompileOptions) -> Result<CompilationReport> {
    let start = Instant::now();

    if tex_path.is_empty() {
        return Err(Error::EmptyPath);
    }
    let tex_file = Path::new(tex_path);
    if !tex_file.exists() {
        return Err(Error::FileNotFound {
            path: tex_path.to_string(),
        });
    }

    let output_dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => tex_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };
    tokio::fs::create_dir_all(&output_dir).await?;

    // Build the artifact names by concatenation: `with_extension` would
    // truncate dotted stems like "v1.2-draft".
    let stem = tex_file.file_stem().unwrap_or_default().to_string_lossy();
    let pdf_path = output_dir.join(format!("{}.pdf", stem));
    let log_path = output_dir.join(format!("{}.log", stem));

    let child = Command::new(&options.engine)
        .arg("-interaction=nonstopmode")
        .arg("-output-directory")
        .arg(&output_dir)
        .arg(tex_file)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .current_dir(&output_dir)
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return Ok(CompilationReport::failure(
                format!("Failed to start {}: {}", options.engine, e),
                None,
                start.elapsed(),
            ));
        }
    };

    // Dropping the in-flight future on timeout kills the process group
    // via kill_on_drop; the child is never left orphaned.
    let output = match tokio::time::timeout(options.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Ok(CompilationReport::failure(
                format!("Failed to wait for {}: {}", options.engine, e),
                None,
                start.elapsed(),
            ));
        }
        Err(_) => {
            return Ok(CompilationReport::failure(
                format!(
                    "LaTeX compilation timed out after {} seconds",
                    options.timeout.as_secs()
                ),
                None,
                start.elapsed(),
            ));
        }
    };

    let log_content = read_log(&log_path).await;

    if output.status.success() && pdf_path.exists() {
        return Ok(CompilationReport {
            success: true,
            output_path: Some(pdf_path),
            error_message: None,
            log_content,
            elapsed: start.elapsed(),
        });
    }

    let message = if output.status.success() {
        format!(
            "Compiler exited cleanly but produced no output at {}",
            pdf_path.display()
        )
    } else {
        let mut message = match output.status.code() {
            Some(code) => format!("LaTeX compilation failed with exit code {}", code),
            None => "LaTeX compilation terminated by signal".to_string(),
        };
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            message.push_str(": ");
            message.push_str(stderr.trim());
        }
        message
    };

    Ok(CompilationReport::failure(
        message,
        log_content,
        start.elapsed(),
    ))
}

/// Best-effort log read: a missing log is `None`, an unreadable one is a
/// placeholder. Log files are frequently not valid UTF-8.
async fn read_log(log_path: &Path) -> Option<String> {
    if !log_path.exists() {
        return None;
    }
    match tokio::fs::read(log_path).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => Some("Could not read log file".to_string()),
    }
}
