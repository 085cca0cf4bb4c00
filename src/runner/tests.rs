//! Unit tests for command dispatch.

use super::*;
use crate::cli::{CheckArgs, Cli, Commands, EvalArgs, LinksArgs};
use anyhow::{Result, ensure};
use rstest::{fixture, rstest};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PROJECT: &str = "\
tsunagi_version: \"1.0.0\"
configurations: [Debug, Release]
policies:
  implicit_link_interface: new
targets:
  - name: core
    type: static_library
    languages: [C]
    properties:
      LOCATION: /out/libcore.a
      INTERFACE_POSITION_INDEPENDENT_CODE: true
  - name: app
    type: executable
    languages: [CXX]
    link_libraries: [core, \"$<$<CONFIG:Debug>:dbg>\"]
    properties:
      POSITION_INDEPENDENT_CODE: false
";

#[fixture]
fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("Tsunagifile"), PROJECT).expect("write manifest");
    dir
}

fn cli_in(dir: &TempDir, command: Commands) -> Cli {
    Cli {
        file: PathBuf::from("Tsunagifile"),
        directory: Some(dir.path().to_path_buf()),
        verbose: false,
        command,
    }
}

fn run_capture(cli: &Cli) -> (Result<()>, String, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let result = run_with(cli, &mut out, &mut err);
    (
        result,
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    )
}

#[rstest]
fn links_reports_every_declared_configuration(project: TempDir) -> Result<()> {
    let cli = cli_in(
        &project,
        Commands::Links(LinksArgs {
            configs: Vec::new(),
            json: false,
            targets: vec!["app".to_owned()],
        }),
    );
    let (result, out, err) = run_capture(&cli);
    result?;
    ensure!(err.is_empty(), "unexpected diagnostics: {err}");
    ensure!(out.contains("target app (EXECUTABLE) [Debug]"), "{out}");
    ensure!(out.contains("  link = /out/libcore.a dbg\n"), "{out}");
    ensure!(out.contains("target app (EXECUTABLE) [Release]"), "{out}");
    ensure!(out.contains("  link = /out/libcore.a\n"), "{out}");
    ensure!(out.contains("  linker_language = CXX\n"), "{out}");
    Ok(())
}

#[rstest]
fn unknown_configuration_is_rejected(project: TempDir) {
    let cli = cli_in(
        &project,
        Commands::Links(LinksArgs {
            configs: vec!["Profile".to_owned()],
            json: true,
            targets: Vec::new(),
        }),
    );
    let (result, out, _) = run_capture(&cli);
    let err = result.expect_err("unknown configuration");
    assert!(err.to_string().contains("\"Profile\""));
    assert!(out.is_empty());
}

#[rstest]
fn eval_prints_value(project: TempDir) -> Result<()> {
    let cli = cli_in(
        &project,
        Commands::Eval(EvalArgs {
            expression: "$<TARGET_PROPERTY:core,LOCATION>".to_owned(),
            target: Some("app".to_owned()),
            config: Some("debug".to_owned()),
            head: None,
            quiet: false,
        }),
    );
    let (result, out, _) = run_capture(&cli);
    result?;
    ensure!(out == "/out/libcore.a\n", "unexpected output: {out:?}");
    Ok(())
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
fn eval_errors_fail_unless_quiet(project: TempDir, #[case] quiet: bool, #[case] fails: bool) {
    let cli = cli_in(
        &project,
        Commands::Eval(EvalArgs {
            expression: "$<NOPE:1>".to_owned(),
            target: None,
            config: None,
            head: None,
            quiet,
        }),
    );
    let (result, out, err) = run_capture(&cli);
    assert_eq!(result.is_err(), fails);
    assert_eq!(out, "\n");
    assert_eq!(err.contains("tsunagi::genex::unknown_identifier"), fails);
}

#[rstest]
fn check_reports_position_independent_code_conflict(project: TempDir) {
    let cli = cli_in(
        &project,
        Commands::Check(CheckArgs {
            configs: vec!["Release".to_owned()],
        }),
    );
    let (result, out, err) = run_capture(&cli);
    let failure = result.expect_err("conflict fails the run");
    assert!(failure.to_string().contains("error(s)"));
    assert!(out.contains("core [Release]: ok\n"));
    assert!(out.contains("app [Release]: 1 conflict(s)\n"));
    assert!(err.contains("POSITION_INDEPENDENT_CODE"));
    assert!(err.contains("core"));
}

#[rstest]
fn missing_manifest_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cli = cli_in(
        &dir,
        Commands::Check(CheckArgs {
            configs: Vec::new(),
        }),
    );
    let (result, _, _) = run_capture(&cli);
    let err = result.expect_err("missing manifest");
    assert!(err.to_string().contains("not found in"));
}
