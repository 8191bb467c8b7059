//! Structural validation of LaTeX sources without invoking a compiler
//!
//! The validator is a single forward pass plus a handful of independent
//! regex scans. It reports errors (structural problems that would break
//! compilation) and warnings (style and package-usage issues). Warnings
//! never affect validity.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use std::time::{Duration, Instant};

lazy_static! {
    static ref DOCUMENT_CLASS: Regex =
        Regex::new(r"\\documentclass\s*(\[[^\]]*\])?\s*\{[^}]*\}").unwrap();
    static ref BEGIN_DOCUMENT: Regex = Regex::new(r"\\begin\s*\{document\}").unwrap();
    static ref END_DOCUMENT: Regex = Regex::new(r"\\end\s*\{document\}").unwrap();
    static ref BEGIN_ENV: Regex = Regex::new(r"\\begin\s*\{(\w+)\}").unwrap();
    static ref END_ENV: Regex = Regex::new(r"\\end\s*\{(\w+)\}").unwrap();
    static ref USEPACKAGE: Regex =
        Regex::new(r"\\usepackage\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}").unwrap();
    static ref TITLE: Regex = Regex::new(r"\\title\s*\{").unwrap();
    static ref AUTHOR: Regex = Regex::new(r"\\author\s*\{").unwrap();
    static ref CONSECUTIVE_BLANK_LINES: Regex = Regex::new(r"\n\n\n").unwrap();

    /// Compiled `\cmd` / `\begin{cmd}` detectors for the package table.
    static ref PACKAGE_COMMANDS: Vec<(Regex, &'static str, &'static [&'static str])> =
        PACKAGE_REQUIREMENTS
            .iter()
            .map(|&(command, packages)| {
                let pattern = format!(r"\\(begin\s*\{{)?{}", command);
                (Regex::new(&pattern).unwrap(), command, packages)
            })
            .collect();
}

/// Commands and environments that only work with a package loaded.
/// Entries with alternatives are satisfied by any listed package.
const PACKAGE_REQUIREMENTS: &[(&str, &[&str])] = &[
    ("tikzpicture", &["tikz"]),
    ("includegraphics", &["graphicx"]),
    ("href", &["hyperref"]),
    ("url", &["url", "hyperref"]),
    ("lstlisting", &["listings"]),
    ("algorithm", &["algorithm"]),
    ("align", &["amsmath"]),
    ("gather", &["amsmath"]),
    ("multirow", &["multirow"]),
    ("multicolumn", &["array", "tabularx"]),
];

/// Result of validating one LaTeX source
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// True when the error list is empty; warnings do not count
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

/// Validate a LaTeX file on disk.
///
/// `quick` skips the package heuristic; `strict` adds style warnings.
/// Setting both is a usage error, as are empty and nonexistent paths.
pub fn validate_latex(file_path: &str, quick: bool, strict: bool) -> Result<ValidationReport> {
    let start = Instant::now();

    if file_path.is_empty() {
        return Err(Error::EmptyPath);
    }
    if quick && strict {
        return Err(Error::ConflictingModes);
    }

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: file_path.to_string(),
        });
    }

    // Sources are not always UTF-8; decode lossily rather than reject.
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let mut report = validate_source(&content, quick, strict);
    report.elapsed = start.elapsed();
    Ok(report)
}

/// Validate LaTeX source text directly.
pub fn validate_source(content: &str, quick: bool, strict: bool) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_document_shell(content, &mut errors);
    check_brace_balance(content, &mut errors);
    check_environments(content, &mut errors);

    if !quick {
        check_package_usage(content, &mut warnings);
    }
    if strict {
        check_style(content, &mut warnings);
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        elapsed: Duration::ZERO,
    }
}

fn check_document_shell(content: &str, errors: &mut Vec<String>) {
    if !DOCUMENT_CLASS.is_match(content) {
        errors.push("Missing \\documentclass command".to_string());
    }
    if !BEGIN_DOCUMENT.is_match(content) {
        errors.push("Missing \\begin{document}".to_string());
    }
    if !END_DOCUMENT.is_match(content) {
        errors.push("Missing \\end{document}".to_string());
    }
}

/// Signed brace counter over the whole source. Backslash-escaped braces
/// are not structural and are skipped. The scan stops at the first dip
/// below zero; a lone extra `}` therefore reports both the dip and the
/// final negative count.
fn check_brace_balance(content: &str, errors: &mut Vec<String>) {
    let mut depth: i64 = 0;
    let mut escaped = false;

    for c in content.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    errors.push("Unmatched closing brace }".to_string());
                    break;
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        errors.push(format!("Unmatched opening braces: {} unclosed", depth));
    } else if depth < 0 {
        errors.push(format!("Unmatched closing braces: {} extra", -depth));
    }
}

/// Existence-based environment matching: every `\begin{name}` must have
/// an `\end{name}` somewhere in the document and vice versa. Nesting
/// order is deliberately not checked.
fn check_environments(content: &str, errors: &mut Vec<String>) {
    let begins: Vec<&str> = BEGIN_ENV
        .captures_iter(content)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .collect();
    let ends: Vec<&str> = END_ENV
        .captures_iter(content)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .collect();

    for name in &begins {
        if !ends.contains(name) {
            errors.push(format!("Unclosed environment: {}", name));
        }
    }
    for name in &ends {
        if !begins.contains(name) {
            errors.push(format!("Environment ended without begin: {}", name));
        }
    }
}

fn declared_packages(content: &str) -> Vec<String> {
    USEPACKAGE
        .captures_iter(content)
        .flat_map(|c| {
            c.get(1)
                .map_or("", |m| m.as_str())
                .split(',')
                .map(|p| p.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn check_package_usage(content: &str, warnings: &mut Vec<String>) {
    let declared = declared_packages(content);

    for (pattern, command, packages) in PACKAGE_COMMANDS.iter() {
        if !pattern.is_match(content) {
            continue;
        }
        let satisfied = packages.iter().any(|p| declared.iter().any(|d| d == p));
        if !satisfied {
            warnings.push(format!(
                "Command/environment '{}' used but package '{}' not included",
                command,
                packages.join(" or ")
            ));
        }
    }
}

fn check_style(content: &str, warnings: &mut Vec<String>) {
    if TITLE.is_match(content) && AUTHOR.is_match(content) && !content.contains("\\maketitle") {
        warnings.push("Title and author defined but \\maketitle not called".to_string());
    }

    if CONSECUTIVE_BLANK_LINES.is_match(content) {
        warnings.push("Multiple consecutive blank lines detected".to_string());
    }

    if !content.contains("\\section")
        && !content.contains("\\chapter")
        && !content.contains("\\subsection")
    {
        warnings.push("No section structure found in document".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const VALID_DOC: &str = "\\documentclass{article}\n\
                             \\begin{document}\n\
                             \\section{Intro}\n\
                             Hello.\n\
                             \\end{document}\n";

    #[test]
    fn test_valid_document() {
        let report = validate_source(VALID_DOC, false, false);
        assert!(report.is_valid);
        assert_eq!(report.errors, Vec::<String>::new());
    }

    #[test]
    fn test_missing_documentclass_only() {
        let report = validate_source("\\begin{document}\\end{document}", false, false);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Missing \\documentclass command"]);
    }

    #[test]
    fn test_all_shell_markers_missing() {
        let report = validate_source("plain text", true, false);
        assert_eq!(
            report.errors,
            vec![
                "Missing \\documentclass command",
                "Missing \\begin{document}",
                "Missing \\end{document}",
            ]
        );
    }

    #[test]
    fn test_documentclass_with_options() {
        let content = "\\documentclass[12pt,a4paper]{article}\n\
                       \\begin{document}x\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report.is_valid);
    }

    #[test]
    fn test_unclosed_opening_braces() {
        let content = "\\documentclass{article}\\begin{document}{{\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report
            .errors
            .contains(&"Unmatched opening braces: 2 unclosed".to_string()));
    }

    #[test]
    fn test_extra_closing_brace_double_report() {
        // A lone extra closer trips the dip check and the final count.
        let content = "\\documentclass{article}\\begin{document}}\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report
            .errors
            .contains(&"Unmatched closing brace }".to_string()));
        assert!(report
            .errors
            .contains(&"Unmatched closing braces: 1 extra".to_string()));
    }

    #[test]
    fn test_escaped_braces_ignored() {
        let content = "\\documentclass{article}\\begin{document}\\{\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_double_backslash_before_brace_is_structural() {
        // `\\{` is a literal backslash followed by a real group open.
        let content = "\\documentclass{article}\\begin{document}\\\\{\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report
            .errors
            .contains(&"Unmatched opening braces: 1 unclosed".to_string()));
    }

    #[test]
    fn test_unclosed_environment() {
        let content = "\\documentclass{article}\\begin{document}\
                       \\begin{itemize}\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report
            .errors
            .contains(&"Unclosed environment: itemize".to_string()));
    }

    #[test]
    fn test_end_without_begin() {
        let content = "\\documentclass{article}\\begin{document}\
                       \\end{itemize}\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report
            .errors
            .contains(&"Environment ended without begin: itemize".to_string()));
    }

    #[test]
    fn test_crossed_environments_pass() {
        // Existence-based matching does not care about nesting order.
        let content = "\\documentclass{article}\\begin{document}\
                       \\begin{aaa}\\begin{bbb}\\end{aaa}\\end{bbb}\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_package_warning_for_includegraphics() {
        let content = "\\documentclass{article}\\begin{document}\
                       \\includegraphics{fig.png}\\end{document}";
        let report = validate_source(content, false, false);
        assert!(report.is_valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("'includegraphics'") && w.contains("'graphicx'")));
    }

    #[test]
    fn test_package_warning_suppressed_when_declared() {
        let content = "\\documentclass{article}\\usepackage{graphicx}\
                       \\begin{document}\\includegraphics{fig.png}\\end{document}";
        let report = validate_source(content, false, false);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_package_alternatives() {
        // hyperref satisfies \url even though the url package is absent.
        let content = "\\documentclass{article}\\usepackage{hyperref}\
                       \\begin{document}\\url{https://example.com}\\end{document}";
        let report = validate_source(content, false, false);
        assert!(!report.warnings.iter().any(|w| w.contains("'url'")));
    }

    #[test]
    fn test_package_list_declaration() {
        let content = "\\documentclass{article}\\usepackage{amssymb, amsmath}\
                       \\begin{document}\\begin{align}x\\end{align}\\end{document}";
        let report = validate_source(content, false, false);
        assert!(!report.warnings.iter().any(|w| w.contains("'align'")));
    }

    #[test]
    fn test_quick_skips_package_checks() {
        let content = "\\documentclass{article}\\begin{document}\
                       \\includegraphics{fig.png}\\end{document}";
        let report = validate_source(content, true, false);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_strict_maketitle_warning() {
        let content = "\\documentclass{article}\\title{T}\\author{A}\
                       \\begin{document}\\section{S}\\end{document}";
        let report = validate_source(content, false, true);
        assert!(report
            .warnings
            .contains(&"Title and author defined but \\maketitle not called".to_string()));
    }

    #[test]
    fn test_strict_blank_lines_warning() {
        let content = "\\documentclass{article}\\begin{document}\
                       \\section{S}a\n\n\nb\\end{document}";
        let report = validate_source(content, false, true);
        assert!(report
            .warnings
            .contains(&"Multiple consecutive blank lines detected".to_string()));
    }

    #[test]
    fn test_strict_no_sections_warning() {
        let content = "\\documentclass{article}\\begin{document}hi\\end{document}";
        let report = validate_source(content, false, true);
        assert!(report
            .warnings
            .contains(&"No section structure found in document".to_string()));
    }

    #[test]
    fn test_strict_not_applied_by_default() {
        let content = "\\documentclass{article}\\begin{document}hi\\end{document}";
        let report = validate_source(content, false, false);
        assert!(!report
            .warnings
            .contains(&"No section structure found in document".to_string()));
    }

    #[test]
    fn test_conflicting_modes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID_DOC.as_bytes()).unwrap();
        let result = validate_latex(file.path().to_str().unwrap(), true, true);
        assert!(matches!(result, Err(Error::ConflictingModes)));
    }

    #[test]
    fn test_empty_path() {
        let result = validate_latex("", false, false);
        assert!(matches!(result, Err(Error::EmptyPath)));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_latex("/nonexistent/file.tex", false, false);
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_validate_file_records_elapsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID_DOC.as_bytes()).unwrap();
        let report = validate_latex(file.path().to_str().unwrap(), false, false).unwrap();
        assert!(report.is_valid);
        assert!(report.elapsed > Duration::ZERO);
    }
}
