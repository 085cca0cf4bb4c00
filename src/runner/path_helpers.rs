//! Manifest path resolution for the runner.

use anyhow::Result;
use camino::Utf8PathBuf;

use crate::cli::Cli;

use super::RunnerError;

/// Determine the manifest path, honouring `-C/--directory`.
///
/// # Errors
///
/// Returns [`RunnerError::InvalidManifestPath`] when the `file` or
/// `directory` arguments are not valid UTF-8, or when the result names no
/// file.
pub(super) fn resolve_manifest_path(cli: &Cli) -> Result<Utf8PathBuf> {
    let file = utf8(cli.file.clone())?;
    let resolved = match &cli.directory {
        Some(dir) => utf8(dir.clone())?.join(&file),
        None => file,
    };
    if resolved.file_name().is_none() {
        return Err(RunnerError::InvalidManifestPath {
            path: resolved.into_string(),
            reason: "does not name a file",
        }
        .into());
    }
    Ok(resolved)
}

fn utf8(raw: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(raw).map_err(|rejected| {
        RunnerError::InvalidManifestPath {
            path: rejected.display().to_string(),
            reason: "is not valid UTF-8",
        }
        .into()
    })
}

/// Fail with [`RunnerError::ManifestNotFound`] unless `path` exists.
///
/// # Errors
///
/// Returns an error when the manifest is missing.
pub(super) fn ensure_manifest_exists(path: &Utf8PathBuf) -> Result<()> {
    if path.as_std_path().exists() {
        return Ok(());
    }
    let directory = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => format!("directory '{parent}'"),
        _ => "the current directory".to_owned(),
    };
    Err(RunnerError::ManifestNotFound {
        name: path.file_name().unwrap_or(path.as_str()).to_owned(),
        directory,
        path: path.clone(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CheckArgs, Commands};
    use rstest::rstest;
    use std::path::PathBuf;

    fn cli(file: &str, directory: Option<&str>) -> Cli {
        Cli {
            file: PathBuf::from(file),
            directory: directory.map(PathBuf::from),
            verbose: false,
            command: Commands::Check(CheckArgs { configs: Vec::new() }),
        }
    }

    #[rstest]
    #[case("Tsunagifile", None, "Tsunagifile")]
    #[case("Tsunagifile", Some("proj"), "proj/Tsunagifile")]
    #[case("/abs/Tsunagifile", Some("proj"), "/abs/Tsunagifile")]
    fn manifest_path_honours_directory(
        #[case] file: &str,
        #[case] directory: Option<&str>,
        #[case] expected: &str,
    ) {
        let path = resolve_manifest_path(&cli(file, directory)).expect("path");
        assert_eq!(path.as_str(), expected);
    }

    #[rstest]
    fn missing_manifest_names_directory() {
        let err = ensure_manifest_exists(&Utf8PathBuf::from("nowhere/Tsunagifile"))
            .expect_err("missing");
        assert_eq!(
            err.to_string(),
            "manifest 'Tsunagifile' not found in directory 'nowhere'"
        );
    }
}
