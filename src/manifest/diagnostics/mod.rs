//! Translates manifest parsing errors into actionable diagnostics.
//!
//! This module wraps raw parser outputs in domain-friendly types:
//! [`ManifestSource`] retains the YAML content, [`ManifestName`] labels the
//! origin, and mapping helpers ([`map_yaml_error`], [`map_data_error`])
//! convert parser and deserialisation failures into [`miette`] diagnostics
//! with spans, hints and stable diagnostic codes.
//
// miette/thiserror derives trip unused_assignments on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use semver::Version;
use thiserror::Error;

mod yaml;

pub use yaml::map_yaml_error;

/// YAML source content for a manifest.
///
/// # Examples
/// ```rust
/// use tsunagi::manifest::ManifestSource;
/// let source = ManifestSource::from("targets: []");
/// assert_eq!(source.as_str(), "targets: []");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestSource(String);

impl ManifestSource {
    /// Construct a manifest source buffer from any owned string type.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// View the stored source contents as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Display name for a manifest source used in diagnostics.
///
/// # Examples
/// ```rust
/// use tsunagi::manifest::ManifestName;
/// let name = ManifestName::new("Tsunagifile");
/// assert_eq!(name.as_str(), "Tsunagifile");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestName(String);

impl ManifestName {
    /// Construct a label describing the manifest being processed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Access the label as a borrowed string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ManifestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Error raised when a manifest cannot be loaded.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// Parsing failed and produced the supplied diagnostic.
    #[error("{message}")]
    #[diagnostic(code(tsunagi::manifest::parse))]
    Parse {
        /// Underlying diagnostic reported by the parser or validator.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
        /// Parse summary.
        message: String,
    },

    /// The manifest declares a format this build cannot read.
    #[error("manifest {name} uses format version {found}; only {supported}.x is supported")]
    #[diagnostic(
        code(tsunagi::manifest::version),
        help("set tsunagi_version to a {supported}.x release")
    )]
    UnsupportedVersion {
        /// Manifest label.
        name: ManifestName,
        /// Declared version.
        found: Version,
        /// Supported major version.
        supported: u64,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("manifest {name} has an invalid structure: {source}")]
#[diagnostic(
    code(tsunagi::manifest::structure),
    help("check key names and target types against the manifest reference")
)]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    name: String,
}

/// Map a [`serde_json`] structural error into a diagnostic without a source
/// span. `serde_json` does not report byte offsets for data validation
/// failures, so the diagnostic only carries the manifest name and message.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    Box::new(DataDiagnostic {
        source: err,
        name: name.as_str().to_owned(),
    })
}
