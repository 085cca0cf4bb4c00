//! Diagnostic reports collected during resolution.
//!
//! The resolver never prints. It records [`Report`] values in a
//! [`Diagnostics`] sink and the runner decides how to surface them and
//! whether the run failed. Identical reports are recorded once, so a cached
//! computation that is requested repeatedly cannot flood the output.
//!
//! # Examples
//! ```rust
//! use tsunagi::diagnostics::{Diagnostics, Provenance, Report, Severity};
//! use tsunagi::graph::Configuration;
//!
//! let mut sink = Diagnostics::default();
//! let provenance = Provenance::for_target("app", "LINK_LIBRARIES", Configuration::named("Debug"));
//! let report = Report::new(Severity::Warning, "stray library", provenance);
//! assert!(sink.push(report.clone()));
//! assert!(!sink.push(report));
//! assert_eq!(sink.len(), 1);
//! assert!(!sink.has_errors());
//! ```

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;

use crate::genex::Backtrace;
use crate::graph::Configuration;

/// How serious a report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Provenance traces requested through `debug_properties`.
    Debug,
    /// Advisory; the run still succeeds.
    Warning,
    /// The run fails once resolution finishes.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Where a report originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Originating target name.
    pub target: Option<String>,
    /// Property being evaluated or checked.
    pub property: Option<String>,
    /// Configuration in effect.
    pub config: Configuration,
    /// Evaluation trail, outermost first.
    pub backtrace: Vec<String>,
}

impl Provenance {
    /// Provenance naming a target property in a configuration.
    #[must_use]
    pub fn for_target(
        target: impl Into<String>,
        property: impl Into<String>,
        config: Configuration,
    ) -> Self {
        Self {
            target: Some(target.into()),
            property: Some(property.into()),
            config,
            backtrace: Vec::new(),
        }
    }

    /// Attach an evaluation trail.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: &Backtrace) -> Self {
        self.backtrace = backtrace.frames().to_vec();
        self
    }
}

/// One diagnostic message with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Severity.
    pub severity: Severity,
    /// Stable diagnostic code such as `tsunagi::genex::arity`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Origin of the message.
    pub provenance: Provenance,
}

impl Report {
    /// A report without a diagnostic code.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            provenance,
        }
    }

    /// A report carrying the message and code of a [`Diagnostic`].
    #[must_use]
    pub fn from_diagnostic(
        severity: Severity,
        diagnostic: &dyn Diagnostic,
        provenance: Provenance,
    ) -> Self {
        Self {
            severity,
            code: diagnostic.code().map(|code| code.to_string()),
            message: diagnostic.to_string(),
            provenance,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        let Provenance {
            target,
            property,
            config,
            backtrace,
        } = &self.provenance;
        match (target, property) {
            (Some(target), Some(property)) => {
                write!(f, "\n  at {target}:{property} ({config})")?;
            }
            (Some(target), None) => write!(f, "\n  at {target} ({config})")?,
            _ => {}
        }
        if !backtrace.is_empty() {
            write!(f, "\n  via {}", backtrace.join(" -> "))?;
        }
        Ok(())
    }
}

/// Ordered, de-duplicating sink of reports.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    reports: Vec<Report>,
}

impl Diagnostics {
    /// Record `report` unless an identical one exists. Returns whether it was
    /// recorded.
    pub fn push(&mut self, report: Report) -> bool {
        if self.reports.contains(&report) {
            return false;
        }
        match report.severity {
            Severity::Error => tracing::debug!(message = %report.message, "recorded error"),
            Severity::Warning => tracing::debug!(message = %report.message, "recorded warning"),
            Severity::Debug => {}
        }
        self.reports.push(report);
        true
    }

    /// Reports in the order they were recorded.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Number of recorded reports.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.reports
            .iter()
            .any(|report| report.severity == Severity::Error)
    }

    /// Reports of one severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Report> {
        self.reports
            .iter()
            .filter(move |report| report.severity == severity)
    }

    /// Take every recorded report, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<Report> {
        std::mem::take(&mut self.reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genex::GenexError;

    #[test]
    fn report_from_diagnostic_keeps_code() {
        let err = GenexError::UnresolvedTarget {
            expression: "$<TARGET_FILE:nope>".to_owned(),
            name: "nope".to_owned(),
        };
        let report = Report::from_diagnostic(Severity::Error, &err, Provenance::default());
        assert_eq!(report.code.as_deref(), Some("tsunagi::genex::unresolved_target"));
        assert!(report.to_string().starts_with("error[tsunagi::genex::unresolved_target]"));
    }

    #[test]
    fn display_includes_provenance() {
        let provenance =
            Provenance::for_target("app", "LINK_LIBRARIES", Configuration::named("Release"));
        let report = Report::new(Severity::Warning, "careful", provenance);
        assert_eq!(
            report.to_string(),
            "warning: careful\n  at app:LINK_LIBRARIES (Release)"
        );
    }
}
