//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Every
//! command loads the project manifest named by `--file` (relative to
//! `--directory` when given) before resolving anything.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod parsing;

use parsing::{parse_config, parse_target};

/// Environment variable naming the manifest when `--file` is omitted.
pub const FILE_ENV_VAR: &str = "TSUNAGI_FILE";

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "Tsunagifile";

/// Resolve link dependencies and generator expressions of a target graph.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Tsunagi manifest file to use.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = FILE_ENV_VAR,
        default_value = DEFAULT_MANIFEST
    )]
    pub file: PathBuf,

    /// Run as if started in this directory.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments accepted by the `links` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct LinksArgs {
    /// Configuration to resolve. Repeat for several; defaults to every
    /// configuration the manifest declares.
    #[arg(long = "config", value_name = "CONFIG", value_parser = parse_config)]
    pub configs: Vec<String>,

    /// Print the reports as JSON.
    #[arg(long)]
    pub json: bool,

    /// Targets to report. Defaults to every target with a link step.
    #[arg(value_name = "TARGET", value_parser = parse_target)]
    pub targets: Vec<String>,
}

/// Arguments accepted by the `eval` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct EvalArgs {
    /// Generator expression to evaluate.
    #[arg(value_name = "EXPR")]
    pub expression: String,

    /// Target whose properties `$<TARGET_PROPERTY:prop>` reads.
    #[arg(long, value_name = "TARGET", value_parser = parse_target)]
    pub target: Option<String>,

    /// Configuration in effect.
    #[arg(long, value_name = "CONFIG", value_parser = parse_config)]
    pub config: Option<String>,

    /// Head target of the link being resolved. Defaults to `--target`.
    #[arg(long, value_name = "TARGET", value_parser = parse_target)]
    pub head: Option<String>,

    /// Do not treat evaluation errors as failures.
    #[arg(long)]
    pub quiet: bool,
}

/// Arguments accepted by the `check` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct CheckArgs {
    /// Configuration to check. Repeat for several.
    #[arg(long = "config", value_name = "CONFIG", value_parser = parse_config)]
    pub configs: Vec<String>,
}

/// Available top-level commands for Tsunagi.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Print the link line, languages and linker language of targets.
    Links(LinksArgs),

    /// Evaluate a generator expression against the project.
    Eval(EvalArgs),

    /// Check compatible interface properties of every linkable target.
    Check(CheckArgs),
}
