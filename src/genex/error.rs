//! Errors raised while parsing or evaluating generator expressions.
//!
//! None of these abort an evaluation. They are recorded on the evaluation
//! context, the offending call yields an empty string and siblings carry on.

use miette::Diagnostic;
use thiserror::Error;

/// A parse or evaluation failure inside one expression.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GenexError {
    /// Input ended before a `$<` was closed.
    #[error("expression \"{expression}\" is missing a closing '>'")]
    #[diagnostic(
        code(tsunagi::genex::unterminated_call),
        help("close every `$<` with a matching `>`")
    )]
    UnterminatedCall {
        /// The full input text.
        expression: String,
    },

    /// `$<>` or `$<:...>`.
    #[error("expression \"{expression}\" has an empty identifier")]
    #[diagnostic(code(tsunagi::genex::empty_identifier))]
    EmptyIdentifier {
        /// The offending call.
        expression: String,
    },

    /// The identifier names no built-in.
    #[error("expression \"{expression}\" uses unknown identifier \"{identifier}\"")]
    #[diagnostic(code(tsunagi::genex::unknown_identifier))]
    UnknownIdentifier {
        /// The offending call.
        expression: String,
        /// The evaluated identifier.
        identifier: String,
    },

    /// Wrong number of parameters.
    #[error("$<{identifier}> expects {expected} but was given {given} in \"{expression}\"")]
    #[diagnostic(code(tsunagi::genex::arity))]
    Arity {
        /// The offending call.
        expression: String,
        /// The built-in name.
        identifier: String,
        /// Human-readable accepted parameter count.
        expected: String,
        /// Number of parameters supplied.
        given: usize,
    },

    /// A parameter is malformed for the built-in.
    #[error("$<{identifier}> in \"{expression}\": {reason}")]
    #[diagnostic(code(tsunagi::genex::invalid_argument))]
    InvalidArgument {
        /// The offending call.
        expression: String,
        /// The built-in name.
        identifier: String,
        /// What was wrong.
        reason: String,
    },

    /// A target query names a target that does not exist.
    #[error("expression \"{expression}\" names target \"{name}\" which does not exist")]
    #[diagnostic(code(tsunagi::genex::unresolved_target))]
    UnresolvedTarget {
        /// The offending call.
        expression: String,
        /// The missing target name.
        name: String,
    },

    /// A property evaluation or link walk re-entered itself.
    #[error("cyclic evaluation: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(tsunagi::genex::cyclic_evaluation),
        help("break the dependency loop between the listed entries")
    )]
    CyclicEvaluation {
        /// The loop, starting and ending with the same entry.
        cycle: Vec<String>,
    },
}

impl GenexError {
    /// The diagnostic code as a plain string.
    #[must_use]
    pub fn code_str(&self) -> String {
        self.code().map(|code| code.to_string()).unwrap_or_default()
    }
}

/// Rotate a closed cycle so it starts at its smallest entry.
///
/// The input repeats its first element at the end. Rotation keeps reports
/// stable regardless of which member the walk happened to start from.
pub(crate) fn canonicalize_cycle(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        *slot = first;
    }
    cycle
}
