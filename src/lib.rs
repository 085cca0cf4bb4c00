//! Tsunagi core library.
//!
//! Tsunagi evaluates `$<...>` generator expressions embedded in target
//! properties and resolves, per target and configuration, what each target
//! links: its link implementation, the interface it passes on to consumers,
//! the closure of languages that reach its link step and the linker language
//! that follows. Compatible interface properties are checked along the way.
//!
//! The library is layered bottom-up:
//! - [`genex`] parses and evaluates expressions against a [`genex::TargetHost`];
//! - [`graph`] owns the targets;
//! - [`resolve`] implements the host and the link computations;
//! - [`manifest`] and [`ast`] load a YAML project description;
//! - [`cli`], [`runner`] and [`report`] drive it all from the command line.

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod genex;
pub mod graph;
pub mod manifest;
pub mod report;
pub mod resolve;
pub mod runner;
