//! Error types for the runner module.
//!
//! Kept in a submodule so the lint suppression needed by the derive macros
//! stays narrow.

// The miette/thiserror derives trigger `unused_assignments` on some
// toolchains only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The manifest file does not exist at the expected path.
    #[error("manifest '{name}' not found in {directory}")]
    #[diagnostic(
        code(tsunagi::runner::manifest_not_found),
        help("create {path} or pass --file to point at an existing manifest")
    )]
    ManifestNotFound {
        /// File name of the expected manifest.
        name: String,
        /// Description of the directory searched.
        directory: String,
        /// The path that was attempted.
        path: Utf8PathBuf,
    },
    /// The manifest path cannot be used.
    #[error("manifest path '{path}' {reason}")]
    #[diagnostic(code(tsunagi::runner::manifest_path))]
    InvalidManifestPath {
        /// The offending path, lossily converted.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Resolution finished with error diagnostics.
    #[error("resolution failed with {errors} error(s)")]
    #[diagnostic(code(tsunagi::runner::failed))]
    ResolutionFailed {
        /// Number of error diagnostics recorded.
        errors: usize,
    },
}
