//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the manifest, builds the target graph and dispatches the requested
//! command. Results go to the output writer and diagnostics to the error
//! writer. A run fails once any error diagnostic was recorded, after every
//! report has been written.

mod error;
mod path_helpers;

pub use error::RunnerError;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CheckArgs, Cli, Commands, EvalArgs, LinksArgs};
use crate::diagnostics::{Diagnostics, Provenance, Severity};
use crate::graph::{Configuration, TargetGraph, TargetId, TargetKind};
use crate::manifest;
use crate::report::{self, CheckOutcome};
use crate::resolve::{LinkReport, Resolver};

use path_helpers::{ensure_manifest_exists, resolve_manifest_path};

/// Execute the parsed [`Cli`] command against standard output and error.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, a requested target or
/// configuration is unknown, writing fails, or resolution recorded errors.
pub fn run(cli: &Cli) -> Result<()> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(cli, &mut stdout.lock(), &mut stderr.lock())
}

/// Execute the parsed [`Cli`] command, writing results to `out` and
/// diagnostics to `err`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with(cli: &Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
    let graph = load_graph(cli)?;
    let resolver = Resolver::new(&graph);
    match &cli.command {
        Commands::Links(args) => handle_links(&resolver, args, out)?,
        Commands::Eval(args) => handle_eval(&resolver, args, cli.verbose, out)?,
        Commands::Check(args) => handle_check(&resolver, args, out)?,
    }
    out.flush().context("flushing output")?;

    let diagnostics = resolver.take_diagnostics();
    write_diagnostics(&diagnostics, err)?;
    let errors = diagnostics.with_severity(Severity::Error).count();
    if errors > 0 {
        return Err(RunnerError::ResolutionFailed { errors }.into());
    }
    Ok(())
}

/// Load the manifest named by `cli` and build its target graph.
fn load_graph(cli: &Cli) -> Result<TargetGraph> {
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists(&manifest_path)?;
    let manifest = manifest::from_path(manifest_path.as_std_path())
        .with_context(|| format!("loading manifest {manifest_path}"))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ast_json =
            serde_json::to_string_pretty(&manifest).context("serialising manifest AST")?;
        debug!("AST:\n{ast_json}");
    }
    let graph = TargetGraph::from_manifest(&manifest).context("building target graph")?;
    info!(targets = graph.len(), path = %manifest_path, "loaded target graph");
    Ok(graph)
}

/// Configurations named on the command line, or the manifest's defaults.
fn requested_configurations(graph: &TargetGraph, names: &[String]) -> Result<Vec<Configuration>> {
    if names.is_empty() {
        return Ok(graph.default_configurations());
    }
    names
        .iter()
        .map(|name| graph.configuration(name).map_err(Into::into))
        .collect()
}

/// Targets named on the command line, or every project target with a link
/// step.
fn requested_targets(graph: &TargetGraph, names: &[String]) -> Result<Vec<TargetId>> {
    if names.is_empty() {
        return Ok(graph
            .ids()
            .filter(|id| {
                let target = graph.target(*id);
                !target.is_imported()
                    && matches!(
                        target.kind(),
                        TargetKind::Executable
                            | TargetKind::SharedLibrary
                            | TargetKind::ModuleLibrary
                    )
            })
            .collect());
    }
    names
        .iter()
        .map(|name| graph.require(name).map_err(Into::into))
        .collect()
}

fn handle_links(resolver: &Resolver<'_>, args: &LinksArgs, out: &mut dyn Write) -> Result<()> {
    let graph = resolver.target_graph();
    let configs = requested_configurations(graph, &args.configs)?;
    let targets = requested_targets(graph, &args.targets)?;
    let reports: Vec<LinkReport> = targets
        .iter()
        .flat_map(|target| {
            configs
                .iter()
                .map(move |config| resolver.link_report(*target, config))
        })
        .collect();
    debug!(
        reports = reports.len(),
        walks = resolver.walk_count(),
        "resolved link reports"
    );
    if args.json {
        let json = report::links_json(&reports).context("serialising link reports")?;
        writeln!(out, "{json}").context("writing link reports")?;
    } else {
        write!(out, "{}", report::links_text(&reports)).context("writing link reports")?;
    }
    Ok(())
}

fn handle_eval(
    resolver: &Resolver<'_>,
    args: &EvalArgs,
    verbose: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let graph = resolver.target_graph();
    let config = args
        .config
        .as_deref()
        .map_or_else(|| Ok(Configuration::none()), |name| graph.configuration(name))?;
    let target = args.target.as_deref().map(|name| graph.require(name)).transpose()?;
    let head = args.head.as_deref().map(|name| graph.require(name)).transpose()?;

    let evaluation = resolver.evaluate(&args.expression, &config, target, head, args.quiet);
    let provenance = Provenance {
        target: target.map(|id| graph.target(id).name().to_owned()),
        property: None,
        config,
        backtrace: vec!["<expression>".to_owned()],
    };
    for error in &evaluation.errors {
        resolver.report_error(error, provenance.clone());
    }

    let seen: Vec<&str> = evaluation
        .seen_targets
        .iter()
        .map(|id| graph.target(*id).name())
        .collect();
    write!(out, "{}", report::evaluation_text(&evaluation, &seen, verbose))
        .context("writing evaluation result")?;
    Ok(())
}

fn handle_check(resolver: &Resolver<'_>, args: &CheckArgs, out: &mut dyn Write) -> Result<()> {
    let graph = resolver.target_graph();
    let configs = requested_configurations(graph, &args.configs)?;
    let targets = graph.ids().filter(|id| {
        let target = graph.target(*id);
        !target.is_imported() && target.kind().is_linkable()
    });
    for target in targets {
        for config in &configs {
            let outcome = CheckOutcome {
                target: graph.target(target).name().to_owned(),
                config: config.clone(),
                conflicts: resolver.check_property_compatibility(target, config),
            };
            write!(out, "{outcome}").context("writing check result")?;
        }
    }
    Ok(())
}

/// Write every recorded report to `err` in recorded order.
fn write_diagnostics(diagnostics: &Diagnostics, err: &mut dyn Write) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    write!(err, "{}", report::diagnostics_text(diagnostics.reports()))
        .context("writing diagnostics")?;
    err.flush().context("flushing diagnostics")?;
    Ok(())
}

#[cfg(test)]
mod tests;
