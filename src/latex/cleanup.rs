//! Auxiliary-file cleanup for LaTeX build trees
//!
//! Identifies build artifacts next to a source file or inside a
//! directory and removes them, optionally copying each file into a
//! timestamped backup directory first. Deletion is best-effort: a file
//! that cannot be removed is recorded as skipped and never fails the
//! overall operation.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// LaTeX source extensions
pub const SOURCE_EXTENSIONS: &[&str] = &[".tex", ".latex", ".ltx"];

/// Compiler output extensions
pub const OUTPUT_EXTENSIONS: &[&str] = &[".pdf", ".dvi", ".ps"];

/// Extensions that cleanup must never remove, beyond sources and outputs
pub const PROTECTED_EXTENSIONS: &[&str] = &[
    ".bib", ".sty", ".cls", ".dtx", ".ins", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".eps",
    ".txt", ".md", ".py", ".sh", ".bat",
];

/// Build artifacts that are safe to delete and regenerate
pub const AUXILIARY_EXTENSIONS: &[&str] = &[
    ".aux",
    ".log",
    ".out",
    ".fls",
    ".fdb_latexmk",
    ".toc",
    ".lof",
    ".lot",
    ".bbl",
    ".blg",
    ".nav",
    ".snm",
    ".vrb",
    ".idx",
    ".ilg",
    ".ind",
    ".glo",
    ".gls",
    ".glg",
    ".synctex.gz",
    ".figlist",
    ".fpl",
    ".makefile",
    ".run.xml",
];

/// Disjoint classification of a file extension. Source and output rank
/// above the protected table so every extension lands in exactly one
/// category; an auxiliary extension is never protected and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Source,
    Output,
    Protected,
    Auxiliary,
    Other,
}

/// Classify an extension string (leading dot expected, e.g. ".aux").
pub fn classify_extension(ext: &str) -> FileCategory {
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();
    if SOURCE_EXTENSIONS.contains(&ext) {
        FileCategory::Source
    } else if OUTPUT_EXTENSIONS.contains(&ext) {
        FileCategory::Output
    } else if PROTECTED_EXTENSIONS.contains(&ext) {
        FileCategory::Protected
    } else if AUXILIARY_EXTENSIONS.contains(&ext) {
        FileCategory::Auxiliary
    } else {
        FileCategory::Other
    }
}

/// Options for a cleanup run
#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    /// Extensions to clean; defaults to [`AUXILIARY_EXTENSIONS`]
    pub extensions: Option<Vec<String>>,
    /// Report candidates without touching the filesystem
    pub dry_run: bool,
    /// Descend into subdirectories (directory targets only)
    pub recursive: bool,
    /// Copy files into a timestamped backup directory before deletion
    pub create_backup: bool,
}

/// Result of a cleanup run
#[derive(Debug, Clone)]
pub struct CleanupReport {
    /// True when candidate discovery completed; per-file failures do not
    /// clear this flag
    pub success: bool,
    pub error_message: Option<String>,
    /// Set when the target was a .tex file (stem mode)
    pub tex_file_path: Option<String>,
    /// Directory the cleanup ran against
    pub directory_path: Option<String>,
    /// Files actually removed
    pub cleaned_files: Vec<String>,
    /// Files that would be removed (dry-run mode)
    pub would_clean_files: Vec<String>,
    /// Files that could not be backed up or removed
    pub skipped_files: Vec<String>,
    pub dry_run: bool,
    pub recursive: bool,
    pub backup_created: bool,
    pub backup_directory: Option<String>,
    pub elapsed: Duration,
}

/// Clean LaTeX auxiliary files around a source file or inside a directory.
///
/// Targeting depends on what `path` resolves to: a `.tex` file cleans
/// same-stem artifacts next to it, another file is cleaned only if its
/// own extension qualifies, and a directory is scanned (recursively when
/// requested). Protected extensions are never candidates, even when
/// explicitly listed.
pub fn clean_latex(path: &str, options: &CleanupOptions) -> Result<CleanupReport> {
    let start = Instant::now();

    if path.is_empty() {
        return Err(Error::EmptyPath);
    }
    let target = Path::new(path);
    if !target.exists() {
        return Err(Error::FileNotFound {
            path: path.to_string(),
        });
    }

    let extensions: Vec<String> = match &options.extensions {
        Some(list) => list.clone(),
        None => AUXILIARY_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    };

    let mut report = CleanupReport {
        success: false,
        error_message: None,
        tex_file_path: None,
        directory_path: None,
        cleaned_files: Vec::new(),
        would_clean_files: Vec::new(),
        skipped_files: Vec::new(),
        dry_run: options.dry_run,
        recursive: options.recursive,
        backup_created: false,
        backup_directory: None,
        elapsed: Duration::ZERO,
    };

    let backup_dir = if options.create_backup && !options.dry_run {
        match create_backup_directory(target) {
            Ok(dir) => {
                report.backup_directory = Some(dir.display().to_string());
                Some(dir)
            }
            Err(e) => {
                // Degrade rather than abort: cleanup proceeds unbacked.
                report.error_message = Some(format!(
                    "Warning: Backup creation failed: {}. Continuing without backup.",
                    e
                ));
                None
            }
        }
    } else {
        None
    };

    let candidates = if target.is_file() {
        let file_name = file_name_of(target);
        report.directory_path = target.parent().map(|p| p.display().to_string());

        if matches_extension(&file_name, ".tex") {
            report.tex_file_path = Some(target.display().to_string());
            stem_candidates(target, &extensions)
        } else if matches_any(&file_name, &extensions) && !is_protected(&file_name) {
            vec![target.to_path_buf()]
        } else {
            Vec::new()
        }
    } else {
        report.directory_path = Some(target.display().to_string());
        let mut found = Vec::new();
        collect_auxiliary_files(target, options.recursive, &extensions, &mut found);
        found.sort();
        found
    };

    for file in candidates {
        let display = file.display().to_string();
        if options.dry_run {
            report.would_clean_files.push(display);
            continue;
        }
        match remove_with_backup(&file, backup_dir.as_deref()) {
            Ok(()) => report.cleaned_files.push(display),
            Err(e) => {
                tracing::warn!(file = %display, error = %e, "cleanup skipped file");
                report.skipped_files.push(display);
            }
        }
    }

    report.backup_created = backup_dir.is_some() && !report.cleaned_files.is_empty();
    report.success = true;
    report.elapsed = start.elapsed();
    Ok(report)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Suffix test that handles multi-part extensions like ".synctex.gz".
/// The name must be longer than the extension so a bare dotfile such as
/// ".aux" is not its own candidate.
fn matches_extension(file_name: &str, ext: &str) -> bool {
    file_name.len() > ext.len()
        && file_name
            .to_ascii_lowercase()
            .ends_with(&ext.to_ascii_lowercase())
}

fn matches_any(file_name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| matches_extension(file_name, ext))
}

fn is_protected(file_name: &str) -> bool {
    SOURCE_EXTENSIONS
        .iter()
        .chain(OUTPUT_EXTENSIONS)
        .chain(PROTECTED_EXTENSIONS)
        .any(|ext| matches_extension(file_name, ext))
}

/// Same-stem artifacts co-located with a .tex file.
fn stem_candidates(tex_file: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let stem = match tex_file.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => return Vec::new(),
    };
    let dir = tex_file.parent().unwrap_or_else(|| Path::new("."));

    let mut candidates = Vec::new();
    for ext in extensions {
        let candidate = dir.join(format!("{}{}", stem, ext));
        let name = file_name_of(&candidate);
        if candidate.is_file() && !is_protected(&name) {
            candidates.push(candidate);
        }
    }
    candidates.sort();
    candidates
}

fn collect_auxiliary_files(
    dir: &Path,
    recursive: bool,
    extensions: &[String],
    found: &mut Vec<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_auxiliary_files(&path, recursive, extensions, found);
            }
        } else if path.is_file() {
            let name = file_name_of(&path);
            if matches_any(&name, extensions) && !is_protected(&name) {
                found.push(path);
            }
        }
    }
}

/// Create `backup_<stem>_<YYYYMMDD_HHMMSS>` next to the target.
fn create_backup_directory(target: &Path) -> std::io::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = if target.is_file() {
        target.file_stem()
    } else {
        target.file_name()
    };
    let name = name.map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let backup_dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(format!("backup_{}_{}", name, timestamp));
    std::fs::create_dir_all(&backup_dir)?;
    Ok(backup_dir)
}

/// Copy into the backup directory (when present), then delete. A failed
/// backup copy leaves the file in place.
fn remove_with_backup(file: &Path, backup_dir: Option<&Path>) -> std::io::Result<()> {
    if let Some(backup_dir) = backup_dir {
        if let Some(name) = file.file_name() {
            std::fs::copy(file, backup_dir.join(name))?;
        }
    }
    std::fs::remove_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_classify_extension() {
        assert_eq!(classify_extension(".tex"), FileCategory::Source);
        assert_eq!(classify_extension(".ltx"), FileCategory::Source);
        assert_eq!(classify_extension(".pdf"), FileCategory::Output);
        assert_eq!(classify_extension(".ps"), FileCategory::Output);
        assert_eq!(classify_extension(".bib"), FileCategory::Protected);
        assert_eq!(classify_extension(".png"), FileCategory::Protected);
        assert_eq!(classify_extension(".aux"), FileCategory::Auxiliary);
        assert_eq!(classify_extension(".synctex.gz"), FileCategory::Auxiliary);
        assert_eq!(classify_extension(".xyz"), FileCategory::Other);
        // Case-insensitive
        assert_eq!(classify_extension(".TEX"), FileCategory::Source);
    }

    #[test]
    fn test_protected_never_auxiliary() {
        for ext in SOURCE_EXTENSIONS
            .iter()
            .chain(OUTPUT_EXTENSIONS)
            .chain(PROTECTED_EXTENSIONS)
        {
            assert_ne!(classify_extension(ext), FileCategory::Auxiliary, "{}", ext);
        }
    }

    #[test]
    fn test_matches_multi_part_extension() {
        assert!(matches_extension("paper.synctex.gz", ".synctex.gz"));
        assert!(matches_extension("paper.run.xml", ".run.xml"));
        assert!(!matches_extension("paper.blog", ".log"));
        assert!(!matches_extension(".aux", ".aux"));
    }

    #[test]
    fn test_empty_path() {
        let result = clean_latex("", &CleanupOptions::default());
        assert!(matches!(result, Err(Error::EmptyPath)));
    }

    #[test]
    fn test_missing_path() {
        let result = clean_latex("/nonexistent/dir", &CleanupOptions::default());
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_tex_stem_mode() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.tex"));
        touch(&dir.path().join("paper.aux"));
        touch(&dir.path().join("paper.log"));
        touch(&dir.path().join("paper.synctex.gz"));
        touch(&dir.path().join("other.aux"));

        let tex = dir.path().join("paper.tex");
        let report = clean_latex(tex.to_str().unwrap(), &CleanupOptions::default()).unwrap();

        assert!(report.success);
        assert_eq!(report.cleaned_files.len(), 3);
        assert!(!dir.path().join("paper.aux").exists());
        assert!(!dir.path().join("paper.synctex.gz").exists());
        // Other stems and the source itself survive
        assert!(dir.path().join("other.aux").exists());
        assert!(dir.path().join("paper.tex").exists());
        assert_eq!(report.tex_file_path, Some(tex.display().to_string()));
    }

    #[test]
    fn test_directory_mode_leaves_protected_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.tex"));
        touch(&dir.path().join("paper.aux"));
        touch(&dir.path().join("paper.log"));
        touch(&dir.path().join("image.png"));

        let report =
            clean_latex(dir.path().to_str().unwrap(), &CleanupOptions::default()).unwrap();

        assert_eq!(report.cleaned_files.len(), 2);
        assert!(dir.path().join("paper.tex").exists());
        assert!(dir.path().join("image.png").exists());
        assert!(!dir.path().join("paper.aux").exists());
        assert!(!dir.path().join("paper.log").exists());
    }

    #[test]
    fn test_single_file_mode() {
        let dir = tempfile::tempdir().unwrap();
        let aux = dir.path().join("stray.aux");
        touch(&aux);

        let report = clean_latex(aux.to_str().unwrap(), &CleanupOptions::default()).unwrap();
        assert_eq!(report.cleaned_files.len(), 1);
        assert!(!aux.exists());
    }

    #[test]
    fn test_single_file_mode_ignores_non_auxiliary() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.markdown");
        touch(&notes);

        let report = clean_latex(notes.to_str().unwrap(), &CleanupOptions::default()).unwrap();
        assert!(report.success);
        assert!(report.cleaned_files.is_empty());
        assert!(notes.exists());
    }

    #[test]
    fn test_protected_extension_survives_explicit_request() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        touch(&pdf);

        let options = CleanupOptions {
            extensions: Some(vec![".pdf".to_string()]),
            ..CleanupOptions::default()
        };
        let report = clean_latex(pdf.to_str().unwrap(), &options).unwrap();
        assert!(report.cleaned_files.is_empty());
        assert!(pdf.exists());
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.aux"));
        touch(&dir.path().join("paper.log"));

        let options = CleanupOptions {
            dry_run: true,
            ..CleanupOptions::default()
        };
        let report = clean_latex(dir.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(report.would_clean_files.len(), 2);
        assert!(report.cleaned_files.is_empty());
        assert!(dir.path().join("paper.aux").exists());
        assert!(dir.path().join("paper.log").exists());
    }

    #[test]
    fn test_recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("chapters");
        std::fs::create_dir(&sub).unwrap();
        touch(&dir.path().join("main.aux"));
        touch(&sub.join("ch1.aux"));

        let flat = clean_latex(
            dir.path().to_str().unwrap(),
            &CleanupOptions {
                dry_run: true,
                ..CleanupOptions::default()
            },
        )
        .unwrap();
        assert_eq!(flat.would_clean_files.len(), 1);

        let deep = clean_latex(
            dir.path().to_str().unwrap(),
            &CleanupOptions {
                dry_run: true,
                recursive: true,
                ..CleanupOptions::default()
            },
        )
        .unwrap();
        assert_eq!(deep.would_clean_files.len(), 2);
    }

    #[test]
    fn test_backup_round_trip() {
        // The backup directory is a sibling of the target, so clean a
        // subdirectory to keep everything inside the tempdir.
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let aux = work.join("paper.aux");
        std::fs::write(&aux, b"aux contents").unwrap();

        let options = CleanupOptions {
            create_backup: true,
            ..CleanupOptions::default()
        };
        let report = clean_latex(work.to_str().unwrap(), &options).unwrap();

        assert!(report.backup_created);
        let backup_dir = PathBuf::from(report.backup_directory.unwrap());
        let restored = std::fs::read(backup_dir.join("paper.aux")).unwrap();
        assert_eq!(restored, b"aux contents");
        assert!(!aux.exists());
    }

    #[test]
    fn test_backup_skipped_on_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.aux"));

        let options = CleanupOptions {
            dry_run: true,
            create_backup: true,
            ..CleanupOptions::default()
        };
        let report = clean_latex(dir.path().to_str().unwrap(), &options).unwrap();
        assert!(report.backup_directory.is_none());
        assert!(!report.backup_created);
    }

    #[test]
    fn test_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.aux"));

        let first = clean_latex(dir.path().to_str().unwrap(), &CleanupOptions::default()).unwrap();
        assert_eq!(first.cleaned_files.len(), 1);

        let second = clean_latex(dir.path().to_str().unwrap(), &CleanupOptions::default()).unwrap();
        assert!(second.success);
        assert_eq!(second.cleaned_files.len(), 0);
    }

    #[test]
    fn test_custom_extension_list() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("paper.aux"));
        touch(&dir.path().join("paper.bak"));

        let options = CleanupOptions {
            extensions: Some(vec![".bak".to_string()]),
            ..CleanupOptions::default()
        };
        let report = clean_latex(dir.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(report.cleaned_files.len(), 1);
        assert!(dir.path().join("paper.aux").exists());
        assert!(!dir.path().join("paper.bak").exists());
    }
}
