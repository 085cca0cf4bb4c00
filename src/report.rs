//! Rendering of resolution results.
//!
//! Link reports are printed either as indented `key = value` blocks, one per
//! target and configuration, or as a JSON array. Output is deterministic:
//! blocks follow the order the runner requested them in and every list keeps
//! its resolution order.

use std::fmt::{self, Display, Formatter};

use itertools::Itertools;

use crate::diagnostics::Report;
use crate::genex::Evaluation;
use crate::graph::Configuration;
use crate::resolve::{CompatibilityError, LinkReport};

macro_rules! write_kv {
    ($f:expr, $key:expr, $value:expr) => {
        writeln!($f, "  {} = {}", $key, $value)?
    };
}

/// Text block for one link report.
pub struct LinkSection<'a>(pub &'a LinkReport);

impl Display for LinkSection<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "target {} ({}) [{}]", report.target, report.kind, report.config)?;
        write_kv!(
            f,
            "linker_language",
            report.linker_language.as_deref().unwrap_or("-")
        );
        write_kv!(f, "languages", report.languages.iter().join(" "));
        if report.multiplicity > 0 {
            write_kv!(f, "multiplicity", report.multiplicity);
        }
        write_kv!(f, "link", report.line().into_iter().join(" "));
        Ok(())
    }
}

/// Render link reports as text blocks separated by blank lines.
#[must_use]
pub fn links_text(reports: &[LinkReport]) -> String {
    reports.iter().map(LinkSection).join("\n")
}

/// Render link reports as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn links_json(reports: &[LinkReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Outcome of checking one target in one configuration.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Checked target.
    pub target: String,
    /// Configuration checked.
    pub config: Configuration,
    /// Violations found.
    pub conflicts: Vec<CompatibilityError>,
}

impl Display for CheckOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return writeln!(f, "{} [{}]: ok", self.target, self.config);
        }
        writeln!(
            f,
            "{} [{}]: {} conflict(s)",
            self.target,
            self.config,
            self.conflicts.len()
        )?;
        for conflict in &self.conflicts {
            writeln!(f, "  {conflict}")?;
        }
        Ok(())
    }
}

/// Render the outcome of `eval`.
///
/// The value comes first. Targets the expression read follow when
/// `verbose` is set.
#[must_use]
pub fn evaluation_text(evaluation: &Evaluation, seen: &[&str], verbose: bool) -> String {
    let mut out = format!("{}\n", evaluation.value);
    if verbose {
        if !seen.is_empty() {
            out.push_str(&format!("targets: {}\n", seen.iter().join(", ")));
        }
        out.push_str(&format!(
            "context_sensitive: {}\n",
            evaluation.context_sensitive
        ));
    }
    out
}

/// Render diagnostics one per paragraph.
#[must_use]
pub fn diagnostics_text<'r>(reports: impl IntoIterator<Item = &'r Report>) -> String {
    reports.into_iter().map(|report| format!("{report}\n")).join("")
}
