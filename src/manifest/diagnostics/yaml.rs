//! YAML parsing diagnostics.
//!
//! Converts `serde_saphyr` parse errors into [`miette`] diagnostics with a
//! source span and, where the message matches a common mistake, a hint.

#![allow(clippy::allow_attributes, clippy::allow_attributes_without_reason)]

use super::{ManifestName, ManifestSource};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

/// Lower-case message fragments and the hint shown for them.
const YAML_HINTS: [(&str, &str); 5] = [
    (
        "did not find expected '-'",
        "Start list items such as targets with '-' and keep them aligned.",
    ),
    ("expected ':'", "Separate each key from its value with ':'."),
    (
        "mapping values are not allowed",
        "Quote values containing ':' such as generator expressions.",
    ),
    (
        "found character that cannot start any token",
        "Quote values starting with '$<' or other special characters.",
    ),
    (
        "unknown escape character",
        "Use single quotes for values containing backslashes.",
    ),
];

/// Byte offset of a one-based line and column, clamped to the line end.
///
/// Tolerates `\n` and `\r\n` line endings and multi-byte characters.
fn byte_index(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let content = segment.trim_end_matches(['\n', '\r']);
            let column_offset = content
                .char_indices()
                .nth(target_column)
                .map_or(content.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &ManifestSource, loc: Location) -> SourceSpan {
    let at = byte_index(src.as_str(), loc.line(), loc.column());
    let bytes = src.as_str().as_bytes();
    let is_line_break = |b: u8| b == b'\n' || b == b'\r';
    let (start, end) = match bytes.get(at) {
        Some(&b) if !is_line_break(b) => (at, at + 1),
        _ => {
            let previous = at
                .checked_sub(1)
                .filter(|prev| bytes.get(*prev).is_some_and(|p| !is_line_break(*p)));
            (previous.unwrap_or(at), at)
        }
    };
    SourceSpan::new(start.into(), end.saturating_sub(start))
}

#[allow(unused_assignments)]
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(tsunagi::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn has_tab_indent(src: &ManifestSource, location: Option<Location>) -> bool {
    let Some(loc) = location else {
        return false;
    };
    let line_idx = usize::try_from(loc.line().saturating_sub(1)).unwrap_or(usize::MAX);
    src.as_str()
        .lines()
        .nth(line_idx)
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\t')
}

fn hint_for(err_str: &str, src: &ManifestSource, loc: Option<Location>) -> Option<String> {
    if has_tab_indent(src, loc) {
        return Some("Indent with spaces; YAML does not allow tabs.".to_owned());
    }
    let lower = err_str.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned())
}

/// Map a `serde_saphyr` YAML parse error into a [`miette`] diagnostic.
///
/// The diagnostic points at the offending location when one is known and
/// carries a hint for common mistakes.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &ManifestSource,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, col, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_str = err.to_string();
    let hint = hint_for(&err_str, src, loc);
    let mut message = format!("YAML parse error at line {line}, column {col}: {err_str}");
    if let Some(h) = &hint {
        message.push_str("\nhelp: ");
        message.push_str(h);
    }

    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_str(), src.as_str().to_owned()),
        span,
        help: hint,
        source: err,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestValue;
    use anyhow::{Context, Result, anyhow, ensure};
    use rstest::rstest;
    use std::error::Error as StdError;

    fn parse_error(src: &ManifestSource) -> Result<YamlError> {
        serde_saphyr::from_str::<ManifestValue>(src.as_str())
            .err()
            .ok_or_else(|| anyhow!("expected YAML parse error for {:?}", src.as_str()))
    }

    #[test]
    fn tab_indentation_gets_a_hint() -> Result<()> {
        let src = ManifestSource::from("targets:\n\t- name: app\n");
        let diag = map_yaml_error(parse_error(&src)?, &src, &ManifestName::from("test"));
        let msg = diag.to_string();
        ensure!(msg.contains("Indent with spaces"), "missing tab hint: {msg}");
        ensure!(
            diag.code().map(|c| c.to_string()).as_deref() == Some("tsunagi::yaml::parse"),
            "unexpected code"
        );
        Ok(())
    }

    #[test]
    fn missing_location_defaults_to_first_line() {
        let src = ManifestSource::from("targets: [");
        let err = YamlError::Eof {
            location: Location::UNKNOWN,
        };
        let diag = map_yaml_error(err, &src, &ManifestName::from("test"));
        assert!(diag.to_string().contains("line 1, column 1"));
    }

    #[test]
    fn span_skips_carriage_return() -> Result<()> {
        let src = ManifestSource::from("targets:\r\n  - name: app\r\n    type static\r\n  - x\r\n");
        let diag = map_yaml_error(parse_error(&src)?, &src, &ManifestName::from("test"));
        let yaml_diag = (&*diag as &(dyn StdError + 'static))
            .downcast_ref::<YamlDiagnostic>()
            .ok_or_else(|| anyhow!("expected YAML diagnostic"))?;
        let span = yaml_diag.span.context("span present")?;
        if let Some(byte) = src.as_str().as_bytes().get(span.offset()) {
            ensure!(*byte != b'\r', "span should skip carriage returns");
        }
        Ok(())
    }

    #[rstest]
    #[case("one\ntwo\nthree", 3, 3, "one\ntwo\nth".len())]
    #[case("one\r\ntwo\r\nthree", 2, 2, "one\r\nt".len())]
    #[case("short", 1, 42, "short".len())]
    #[case("nom: \u{e9}t\u{e9}", 1, 7, "nom: \u{e9}".len())]
    fn byte_index_handles_line_endings_and_utf8(
        #[case] src: &str,
        #[case] line: u64,
        #[case] column: u64,
        #[case] expected: usize,
    ) {
        assert_eq!(byte_index(src, line, column), expected);
    }
}
