//! Helpers for constructing manifest fixtures in tests.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tempfile::TempDir;
use tsunagi::graph::TargetGraph;

/// Prefix the provided manifest body with the standard Tsunagi version header.
#[must_use]
pub fn manifest_yaml(body: &str) -> String {
    format!("tsunagi_version: \"1.0.0\"\n{body}")
}

/// Parse a manifest body and build its target graph.
///
/// # Errors
///
/// Returns an error when the manifest does not parse or the graph cannot be
/// built.
pub fn graph_from_yaml(body: &str) -> Result<TargetGraph> {
    let manifest = tsunagi::manifest::from_str(&manifest_yaml(body))?;
    TargetGraph::from_manifest(&manifest).context("build target graph")
}

/// A temporary project directory holding a `Tsunagifile`.
#[derive(Debug)]
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Write `body`, with the version header, as the project's manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn with_manifest(body: &str) -> Result<Self> {
        let dir = TempDir::new().context("create project directory")?;
        std::fs::write(dir.path().join("Tsunagifile"), manifest_yaml(body))
            .context("write Tsunagifile")?;
        Ok(Self { dir })
    }

    /// Directory containing the manifest.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Path of the manifest as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory is not valid UTF-8.
    pub fn manifest_path(&self) -> Result<Utf8PathBuf> {
        Utf8PathBuf::from_path_buf(self.dir.path().join("Tsunagifile"))
            .map_err(|path| anyhow::anyhow!("non UTF-8 path {}", path.display()))
    }
}
