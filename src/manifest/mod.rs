//! Manifest loading helpers.
//!
//! A `Tsunagifile` is parsed as YAML into a [`ManifestValue`] first and then
//! deserialised into a [`ProjectManifest`]. Splitting the two steps keeps YAML
//! syntax errors (which carry source locations) apart from structural errors
//! such as unknown keys or a misspelt target type.
//!
//! Diagnostics wrap manifest identifiers in [`ManifestName`] and YAML source
//! strings in [`ManifestSource`] so callers pass domain-specific types instead
//! of raw strings.

use crate::ast::ProjectManifest;
use anyhow::{Context, Result};
use semver::Version;
use std::{fs, path::Path};

mod diagnostics;

/// JSON representation of a manifest node after YAML parsing.
pub type ManifestValue = serde_json::Value;

pub use diagnostics::{
    ManifestError, ManifestName, ManifestSource, map_data_error, map_yaml_error,
};

/// Major manifest format version this build understands.
const SUPPORTED_MAJOR: u64 = 1;

fn from_str_named(yaml: &str, name: &ManifestName) -> Result<ProjectManifest> {
    let doc: ManifestValue = serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
        source: map_yaml_error(e, &ManifestSource::from(yaml), name),
        message: format!("failed to parse manifest {name}"),
    })?;

    let manifest: ProjectManifest =
        serde_json::from_value(doc).map_err(|e| ManifestError::Parse {
            source: map_data_error(e, name),
            message: format!("failed to parse manifest {name}"),
        })?;

    check_version(&manifest.tsunagi_version, name)?;
    tracing::debug!(
        manifest = %name,
        targets = manifest.targets.len(),
        "parsed manifest"
    );
    Ok(manifest)
}

fn check_version(version: &Version, name: &ManifestName) -> Result<(), ManifestError> {
    if version.major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(ManifestError::UnsupportedVersion {
            name: name.clone(),
            found: version.clone(),
            supported: SUPPORTED_MAJOR,
        })
    }
}

/// Parse a manifest string.
///
/// # Errors
///
/// Returns an error if the YAML is malformed, does not describe a project, or
/// declares an unsupported format version.
///
/// # Examples
///
/// ```rust
/// let manifest = tsunagi::manifest::from_str(
///     "tsunagi_version: \"1.0.0\"\ntargets:\n  - name: app\n    type: executable\n",
/// )?;
/// assert_eq!(manifest.targets.len(), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn from_str(yaml: &str) -> Result<ProjectManifest> {
    from_str_named(yaml, &ManifestName::new("Tsunagifile"))
}

/// Load a [`ProjectManifest`] from the given file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the manifest fails to parse.
pub fn from_path(path: impl AsRef<Path>) -> Result<ProjectManifest> {
    let path_ref = path.as_ref();
    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read {}", path_ref.display()))?;
    from_str_named(&data, &ManifestName::new(path_ref.display().to_string()))
}
