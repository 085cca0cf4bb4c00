//! End-to-end tests of the `tsunagi` binary using `assert_cmd`.
//!
//! Each test copies a manifest into a temporary directory and runs the
//! binary against it, checking stdout for results and stderr for
//! diagnostics.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{TempDir, tempdir};
use test_support::Project;

fn project_dir(source: &str) -> Result<TempDir> {
    let temp = tempdir().context("create temp dir")?;
    let manifest = temp.path().join("Tsunagifile");
    fs::copy(source, &manifest)
        .with_context(|| format!("copy manifest to {}", manifest.display()))?;
    Ok(temp)
}

fn tsunagi() -> Result<Command> {
    let mut cmd = Command::cargo_bin("tsunagi").context("locate tsunagi binary")?;
    cmd.env_remove("TSUNAGI_FILE");
    Ok(cmd)
}

#[test]
fn links_prints_text_report() -> Result<()> {
    let temp = project_dir("tests/data/project.yml")?;
    tsunagi()?
        .arg("-C")
        .arg(temp.path())
        .args(["links", "--config", "Release", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target app (EXECUTABLE) [Release]"))
        .stdout(predicate::str::contains("  multiplicity = 2\n"))
        .stdout(predicate::str::contains(
            "  link = /build/libcore.a m /build/libutil.a /build/libcore.a /build/libutil.a\n",
        ));
    Ok(())
}

#[test]
fn links_json_is_machine_readable() -> Result<()> {
    let temp = project_dir("tests/data/project.yml")?;
    let output = tsunagi()?
        .current_dir(temp.path())
        .args(["links", "--json", "--config", "Debug"])
        .output()
        .context("run tsunagi links --json")?;
    ensure!(output.status.success(), "links --json should succeed");
    let reports: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("stdout is JSON")?;
    let first = reports
        .as_array()
        .and_then(|all| all.first())
        .context("one report")?;
    let field = |key: &str| first.get(key).and_then(serde_json::Value::as_str);
    ensure!(field("target") == Some("app"), "target {:?}", field("target"));
    ensure!(field("config") == Some("Debug"), "config {:?}", field("config"));
    ensure!(
        field("linker_language") == Some("CXX"),
        "linker {:?}",
        field("linker_language")
    );
    Ok(())
}

#[test]
fn eval_uses_the_manifest_from_the_environment() -> Result<()> {
    let temp = project_dir("tests/data/project.yml")?;
    tsunagi()?
        .env("TSUNAGI_FILE", temp.path().join("Tsunagifile"))
        .args(["eval", "$<TARGET_FILE_DIR:core>", "--config", "Debug"])
        .assert()
        .success()
        .stdout("/build\n");
    Ok(())
}

#[test]
fn eval_error_fails_with_diagnostic() -> Result<()> {
    let project = Project::with_manifest("targets: []\n")?;
    tsunagi()?
        .current_dir(project.path())
        .args(["eval", "$<TARGET_FILE:ghost>"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tsunagi::genex::unresolved_target"))
        .stderr(predicate::str::contains("ghost"));
    Ok(())
}

#[test]
fn check_fails_on_conflict() -> Result<()> {
    let temp = project_dir("tests/data/conflict.yml")?;
    tsunagi()?
        .arg("--directory")
        .arg(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("pic [Release]: ok"))
        .stdout(predicate::str::contains("app [Release]: 1 conflict(s)"))
        .stderr(predicate::str::contains(
            "tsunagi::compat::incompatible_interface_property",
        ));
    Ok(())
}

#[test]
fn missing_manifest_is_logged_to_stderr() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    tsunagi()?
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in"))
        .stdout(predicate::str::is_empty());
    Ok(())
}
