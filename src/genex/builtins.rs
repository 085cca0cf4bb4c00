//! The closed table of built-in generator expressions.
//!
//! Each entry declares its name, accepted parameter count and a pure handler
//! receiving the already-evaluated parameters. Handlers report malformed input
//! by returning an error; the caller records it and substitutes an empty
//! string.

use std::cmp::Ordering;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::graph::{PolicyId, PolicyStatus, TargetId, TargetKind};

use super::context::EvalContext;
use super::error::GenexError;
use super::values::{compare_versions, extend_unique, is_off, list_items};

/// Accepted parameter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub(crate) const fn accepts(self, given: usize) -> bool {
        match self {
            Self::Exact(n) => given == n,
            Self::AtLeast(n) => given >= n,
            Self::Range(lo, hi) => given >= lo && given <= hi,
        }
    }

    pub(crate) const fn max(self) -> Option<usize> {
        match self {
            Self::Exact(n) | Self::Range(_, n) => Some(n),
            Self::AtLeast(_) => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(0) => f.write_str("no parameters"),
            Self::Exact(1) => f.write_str("exactly 1 parameter"),
            Self::Exact(n) => write!(f, "exactly {n} parameters"),
            Self::AtLeast(n) => write!(f, "at least {n} parameters"),
            Self::Range(lo, hi) => write!(f, "{lo} to {hi} parameters"),
        }
    }
}

/// One call being dispatched.
pub(crate) struct Invocation<'e> {
    pub(crate) expression: &'e str,
    pub(crate) name: &'static str,
    pub(crate) args: Vec<String>,
}

impl Invocation<'_> {
    fn arg(&self, idx: usize) -> &str {
        self.args.get(idx).map_or("", String::as_str)
    }

    fn invalid(&self, reason: impl Into<String>) -> GenexError {
        GenexError::InvalidArgument {
            expression: self.expression.to_owned(),
            identifier: self.name.to_owned(),
            reason: reason.into(),
        }
    }

    fn flag_arg(&self, idx: usize) -> Result<bool, GenexError> {
        match self.arg(idx) {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(self.invalid(format!("parameters must be 0 or 1, got \"{other}\""))),
        }
    }

    fn int_arg(&self, idx: usize) -> Result<i64, GenexError> {
        let raw = self.arg(idx);
        raw.trim()
            .parse()
            .map_err(|_| self.invalid(format!("\"{raw}\" is not an integer")))
    }
}

type Handler = fn(&Invocation<'_>, &mut EvalContext<'_>) -> Result<String, GenexError>;

/// A registered built-in.
pub(crate) struct Builtin {
    pub(crate) name: &'static str,
    pub(crate) arity: Arity,
    /// Extra parameters are folded back into the last one with `,`.
    pub(crate) arbitrary_content: bool,
    /// The result depends on configuration or target context.
    pub(crate) context_sensitive: bool,
    pub(crate) handler: Handler,
}

const fn pure(name: &'static str, arity: Arity, handler: Handler) -> Builtin {
    Builtin {
        name,
        arity,
        arbitrary_content: false,
        context_sensitive: false,
        handler,
    }
}

const fn content(name: &'static str, handler: Handler) -> Builtin {
    Builtin {
        name,
        arity: Arity::Exact(1),
        arbitrary_content: true,
        context_sensitive: false,
        handler,
    }
}

const fn sensitive(name: &'static str, arity: Arity, handler: Handler) -> Builtin {
    Builtin {
        name,
        arity,
        arbitrary_content: false,
        context_sensitive: true,
        handler,
    }
}

static BUILTINS: &[Builtin] = &[
    content("0", |_, _| Ok(String::new())),
    content("1", |inv, _| Ok(inv.arg(0).to_owned())),
    pure("BOOL", Arity::Exact(1), |inv, _| Ok(flag(!is_off(inv.arg(0))))),
    pure("AND", Arity::AtLeast(1), and),
    pure("OR", Arity::AtLeast(1), or),
    pure("NOT", Arity::Exact(1), |inv, _| Ok(flag(!inv.flag_arg(0)?))),
    pure("IF", Arity::Exact(3), |inv, _| {
        let branch = if inv.flag_arg(0)? { 1 } else { 2 };
        Ok(inv.arg(branch).to_owned())
    }),
    pure("STREQUAL", Arity::Exact(2), |inv, _| {
        Ok(flag(inv.arg(0) == inv.arg(1)))
    }),
    pure("EQUAL", Arity::Exact(2), |inv, _| {
        Ok(flag(inv.int_arg(0)? == inv.int_arg(1)?))
    }),
    pure("VERSION_LESS", Arity::Exact(2), |inv, _| {
        Ok(flag(compare_versions(inv.arg(0), inv.arg(1)) == Ordering::Less))
    }),
    pure("VERSION_GREATER", Arity::Exact(2), |inv, _| {
        Ok(flag(compare_versions(inv.arg(0), inv.arg(1)) == Ordering::Greater))
    }),
    pure("VERSION_EQUAL", Arity::Exact(2), |inv, _| {
        Ok(flag(compare_versions(inv.arg(0), inv.arg(1)) == Ordering::Equal))
    }),
    pure("IN_LIST", Arity::Exact(2), |inv, _| {
        Ok(flag(list_items(inv.arg(1)).any(|item| item == inv.arg(0))))
    }),
    content("LOWER_CASE", |inv, _| Ok(inv.arg(0).to_lowercase())),
    content("UPPER_CASE", |inv, _| Ok(inv.arg(0).to_uppercase())),
    sensitive("CONFIG", Arity::Range(0, 1), config),
    sensitive("CONFIGURATION", Arity::Exact(0), |_, cx| {
        Ok(cx.config().name().unwrap_or_default().to_owned())
    }),
    pure("PLATFORM_ID", Arity::Range(0, 1), platform_id),
    sensitive("TARGET_PROPERTY", Arity::Range(1, 2), target_property),
    content("TARGET_NAME", |inv, _| Ok(inv.arg(0).to_owned())),
    pure("TARGET_EXISTS", Arity::Exact(1), target_exists),
    sensitive("TARGET_POLICY", Arity::Exact(1), target_policy),
    sensitive("TARGET_FILE", Arity::Exact(1), |inv, cx| {
        Ok(target_location(inv, cx)?.into_string())
    }),
    sensitive("TARGET_LINKER_FILE", Arity::Exact(1), |inv, cx| {
        Ok(target_location(inv, cx)?.into_string())
    }),
    sensitive("TARGET_FILE_NAME", Arity::Exact(1), |inv, cx| {
        let location = target_location(inv, cx)?;
        Ok(location.file_name().unwrap_or_default().to_owned())
    }),
    sensitive("TARGET_FILE_DIR", Arity::Exact(1), |inv, cx| {
        let location = target_location(inv, cx)?;
        Ok(location.parent().map(Utf8Path::as_str).unwrap_or_default().to_owned())
    }),
    content("LINK_ONLY", link_only),
    content("BUILD_INTERFACE", |inv, _| Ok(inv.arg(0).to_owned())),
    content("INSTALL_INTERFACE", |_, _| Ok(String::new())),
    pure("PATH", Arity::AtLeast(2), path),
    pure("JOIN", Arity::Exact(2), |inv, _| {
        Ok(list_items(inv.arg(0)).join(inv.arg(1)))
    }),
    pure("REMOVE_DUPLICATES", Arity::Exact(1), |inv, _| {
        let mut unique = Vec::new();
        extend_unique(&mut unique, list_items(inv.arg(0)));
        Ok(unique.join(";"))
    }),
    pure("LIST", Arity::AtLeast(2), list),
    pure("ANGLE-R", Arity::Exact(0), |_, _| Ok(">".to_owned())),
    pure("COMMA", Arity::Exact(0), |_, _| Ok(",".to_owned())),
    pure("SEMICOLON", Arity::Exact(0), |_, _| Ok(";".to_owned())),
];

/// Find a built-in by exact name.
pub(crate) fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS
        .iter()
        .find(|builtin| builtin.name == name)
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_owned()
}

fn and(inv: &Invocation<'_>, _: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let mut result = true;
    for idx in 0..inv.args.len() {
        result &= inv.flag_arg(idx)?;
    }
    Ok(flag(result))
}

fn or(inv: &Invocation<'_>, _: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let mut result = false;
    for idx in 0..inv.args.len() {
        result |= inv.flag_arg(idx)?;
    }
    Ok(flag(result))
}

fn is_valid_config_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

fn config(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let Some(wanted) = inv.args.first() else {
        return Ok(cx.config().name().unwrap_or_default().to_owned());
    };
    if !is_valid_config_name(wanted) {
        return Err(inv.invalid(format!(
            "\"{wanted}\" is not a valid configuration name"
        )));
    }
    if wanted.is_empty() {
        return Ok(flag(cx.config().is_none()));
    }
    Ok(flag(cx.config().matches(wanted)))
}

fn platform_id(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let platform = cx
        .graph()
        .settings()
        .variables
        .get("PLATFORM_ID")
        .map_or("", String::as_str);
    Ok(match inv.args.first() {
        None => platform.to_owned(),
        Some(wanted) => flag(!platform.is_empty() && platform == wanted),
    })
}

fn is_valid_property_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn resolve_target(
    inv: &Invocation<'_>,
    cx: &mut EvalContext<'_>,
    name: &str,
) -> Result<TargetId, GenexError> {
    if name.is_empty() {
        return Err(inv.invalid("target name must not be empty"));
    }
    let from = cx.current().or_else(|| cx.head());
    let id = cx
        .graph()
        .find(name, from)
        .ok_or_else(|| GenexError::UnresolvedTarget {
            expression: inv.expression.to_owned(),
            name: name.to_owned(),
        })?;
    cx.note_target(id);
    Ok(id)
}

fn target_property(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let (target, property) = match inv.args.as_slice() {
        [name, property] => (resolve_target(inv, cx, name)?, property.as_str()),
        // The one-parameter form asks about the target doing the linking.
        [property] => {
            let Some(head) = cx.head().or_else(|| cx.current()) else {
                return Err(inv.invalid(
                    "the one-parameter form needs a target whose property is being evaluated",
                ));
            };
            cx.note_target(head);
            (head, property.as_str())
        }
        _ => return Ok(String::new()),
    };
    if !is_valid_property_name(property) {
        return Err(inv.invalid(format!("\"{property}\" is not a valid property name")));
    }
    let host = cx.host();
    if property == "LINKER_LANGUAGE" {
        if cx.evaluating_link_libraries() {
            return Err(inv.invalid(
                "LINKER_LANGUAGE cannot be read while link libraries are being evaluated",
            ));
        }
        return Ok(host.linker_language(target, cx).unwrap_or_default());
    }
    Ok(host.property_value(target, property, cx)?.unwrap_or_default())
}

fn target_exists(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let name = inv.arg(0);
    if name.is_empty() {
        return Err(inv.invalid("target name must not be empty"));
    }
    let from = cx.current().or_else(|| cx.head());
    Ok(flag(cx.graph().find(name, from).is_some()))
}

fn target_policy(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let name = inv.arg(0);
    let policy = PolicyId::from_name(name)
        .ok_or_else(|| inv.invalid(format!("\"{name}\" is not a known policy")))?;
    let target = cx
        .head()
        .or_else(|| cx.current())
        .ok_or_else(|| inv.invalid("policy queries need a target"))?;
    let status = cx.graph().target(target).policies().status(policy);
    Ok(flag(status == PolicyStatus::New))
}

fn target_location(
    inv: &Invocation<'_>,
    cx: &mut EvalContext<'_>,
) -> Result<Utf8PathBuf, GenexError> {
    let id = resolve_target(inv, cx, inv.arg(0))?;
    let target = cx.graph().target(id);
    if !matches!(
        target.kind(),
        TargetKind::Executable
            | TargetKind::StaticLibrary
            | TargetKind::SharedLibrary
            | TargetKind::ModuleLibrary
    ) {
        return Err(inv.invalid(format!(
            "target \"{}\" is a {} and has no file",
            target.name(),
            target.kind()
        )));
    }
    target
        .location(cx.config())
        .map(Utf8PathBuf::from)
        .ok_or_else(|| {
            inv.invalid(format!(
                "target \"{}\" has no location for configuration {}",
                target.name(),
                cx.config()
            ))
        })
}

fn link_only(inv: &Invocation<'_>, cx: &mut EvalContext<'_>) -> Result<String, GenexError> {
    if !cx.evaluating_link_libraries() {
        return Err(inv.invalid("may only be used in link library properties"));
    }
    if cx.is_transitive_properties_only() {
        return Ok(String::new());
    }
    Ok(inv.arg(0).to_owned())
}

fn map_paths(list: &str, f: impl Fn(&Utf8Path) -> String) -> String {
    list_items(list).map(|item| f(Utf8Path::new(item))).join(";")
}

fn path(inv: &Invocation<'_>, _: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let op = inv.arg(0);
    let operand = inv.arg(1);
    if op == "APPEND" {
        let mut joined = Utf8PathBuf::from(operand);
        for segment in inv.args.iter().skip(2) {
            joined.push(segment);
        }
        return Ok(joined.into_string());
    }
    if inv.args.len() != 2 {
        return Err(inv.invalid(format!("PATH:{op} takes exactly one path list")));
    }
    match op {
        "GET_FILENAME" => Ok(map_paths(operand, |p| {
            p.file_name().unwrap_or_default().to_owned()
        })),
        "GET_PARENT_PATH" => Ok(map_paths(operand, |p| {
            p.parent().map(Utf8Path::as_str).unwrap_or_default().to_owned()
        })),
        "GET_EXTENSION" => Ok(map_paths(operand, |p| {
            p.extension().map(|ext| format!(".{ext}")).unwrap_or_default()
        })),
        "GET_STEM" => Ok(map_paths(operand, |p| {
            p.file_stem().unwrap_or_default().to_owned()
        })),
        "IS_ABSOLUTE" => Ok(flag(
            operand.starts_with('/') || Utf8Path::new(operand).is_absolute(),
        )),
        other => Err(inv.invalid(format!("unknown PATH operation \"{other}\""))),
    }
}

fn list_index(inv: &Invocation<'_>, raw: &str, len: usize) -> Result<usize, GenexError> {
    let out_of_range = || inv.invalid(format!("index {raw} is out of range for a list of {len}"));
    let idx: i64 = raw
        .trim()
        .parse()
        .map_err(|_| inv.invalid(format!("\"{raw}\" is not an integer")))?;
    let len_signed = i64::try_from(len).map_err(|_| out_of_range())?;
    let absolute = if idx < 0 { len_signed + idx } else { idx };
    usize::try_from(absolute)
        .ok()
        .filter(|pos| *pos < len)
        .ok_or_else(out_of_range)
}

fn list(inv: &Invocation<'_>, _: &mut EvalContext<'_>) -> Result<String, GenexError> {
    let op = inv.arg(0);
    let items: Vec<&str> = list_items(inv.arg(1)).collect();
    let expect_args = |n: usize| {
        if inv.args.len() == n {
            Ok(())
        } else {
            Err(inv.invalid(format!("LIST:{op} expects {} argument(s)", n - 1)))
        }
    };
    match op {
        "LENGTH" => {
            expect_args(2)?;
            Ok(items.len().to_string())
        }
        "GET" => {
            if inv.args.len() < 3 {
                return Err(inv.invalid("LIST:GET needs at least one index"));
            }
            let mut picked = Vec::new();
            for raw in inv.args.iter().skip(2) {
                let pos = list_index(inv, raw, items.len())?;
                picked.extend(items.get(pos).copied());
            }
            Ok(picked.join(";"))
        }
        "FIND" => {
            expect_args(3)?;
            let needle = inv.arg(2);
            Ok(items
                .iter()
                .position(|item| *item == needle)
                .map_or_else(|| "-1".to_owned(), |pos| pos.to_string()))
        }
        "SORT" => {
            expect_args(2)?;
            Ok(items.into_iter().sorted().join(";"))
        }
        "REVERSE" => {
            expect_args(2)?;
            Ok(items.into_iter().rev().join(";"))
        }
        other => Err(inv.invalid(format!("unknown LIST operation \"{other}\""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn names_are_unique() {
        let all: Vec<_> = BUILTINS.iter().map(|builtin| builtin.name).collect();
        let unique: std::collections::BTreeSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[rstest]
    #[case(Arity::Exact(2), 2, true)]
    #[case(Arity::Exact(2), 3, false)]
    #[case(Arity::AtLeast(1), 0, false)]
    #[case(Arity::Range(0, 1), 1, true)]
    fn arity_accepts(#[case] arity: Arity, #[case] given: usize, #[case] expected: bool) {
        assert_eq!(arity.accepts(given), expected);
    }

    #[test]
    fn arity_renders_for_diagnostics() {
        assert_eq!(Arity::Exact(1).to_string(), "exactly 1 parameter");
        assert_eq!(Arity::Range(1, 2).to_string(), "1 to 2 parameters");
    }
}
