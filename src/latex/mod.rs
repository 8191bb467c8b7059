//! LaTeX-facing operations: validation, compilation, and artifact cleanup

pub mod cleanup;
pub mod compile;
pub mod validate;

pub use cleanup::{
    clean_latex, classify_extension, CleanupOptions, CleanupReport, FileCategory,
    AUXILIARY_EXTENSIONS, OUTPUT_EXTENSIONS, PROTECTED_EXTENSIONS, SOURCE_EXTENSIONS,
};
pub use compile::{compile_latex, CompilationReport, CompileOptions, DEFAULT_TIMEOUT_SECS};
pub use validate::{validate_latex, validate_source, ValidationReport};
