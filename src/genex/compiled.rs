//! Parse-once, evaluate-many expressions.

use super::builtins;
use super::context::{EvalContext, Evaluation};
use super::error::GenexError;
use super::node::{Call, Node, contains_call};
use super::parser::parse;

/// An immutable parsed expression.
///
/// Call-free input is resolved at parse time and evaluation returns it
/// without touching the context.
///
/// ```
/// use tsunagi::genex::{CompiledExpression, EvalContext};
/// use tsunagi::graph::{Configuration, TargetGraph};
///
/// let graph = TargetGraph::builder().build();
/// let expr = CompiledExpression::parse("-O$<$<CONFIG:Debug>:0>$<$<CONFIG:Release>:3>");
/// let out = expr.evaluate(EvalContext::new(&graph, Configuration::named("Release")));
/// assert_eq!(out.value, "-O3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpression {
    nodes: Vec<Node>,
    parse_errors: Vec<GenexError>,
    literal: Option<String>,
}

impl CompiledExpression {
    /// Parse `input`. Syntax errors are kept and reported on every
    /// evaluation.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let parsed = parse(input);
        let literal = (parsed.errors.is_empty() && !contains_call(&parsed.nodes))
            .then(|| input.to_owned());
        Self {
            nodes: parsed.nodes,
            parse_errors: parsed.errors,
            literal,
        }
    }

    /// Whether the input contains no calls.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    /// Evaluate as a top-level expression.
    #[must_use]
    pub fn evaluate(&self, mut cx: EvalContext<'_>) -> Evaluation {
        let value = self.evaluate_in(&mut cx);
        cx.finish(value)
    }

    /// Evaluate as part of an enclosing evaluation, sharing its state.
    pub fn evaluate_in(&self, cx: &mut EvalContext<'_>) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        for error in &self.parse_errors {
            cx.report(error.clone());
        }
        evaluate_nodes(&self.nodes, cx)
    }
}

pub(crate) fn evaluate_nodes(nodes: &[Node], cx: &mut EvalContext<'_>) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Call(call) => out.push_str(&evaluate_call(call, cx)),
        }
    }
    out
}

fn evaluate_call(call: &Call, cx: &mut EvalContext<'_>) -> String {
    let identifier = evaluate_nodes(&call.identifier, cx);
    // `$<0:...>` discards its content unevaluated.
    if identifier == "0" && !call.parameters.is_empty() {
        return String::new();
    }
    let Some(builtin) = builtins::lookup(&identifier) else {
        cx.report(GenexError::UnknownIdentifier {
            expression: call.source.clone(),
            identifier,
        });
        return String::new();
    };
    let mut args: Vec<String> = call
        .parameters
        .iter()
        .map(|parameter| evaluate_nodes(parameter, cx))
        .collect();
    if builtin.arbitrary_content {
        rejoin_trailing(&mut args, builtin.arity.max());
    }
    if !builtin.arity.accepts(args.len()) {
        cx.report(GenexError::Arity {
            expression: call.source.clone(),
            identifier: builtin.name.to_owned(),
            expected: builtin.arity.to_string(),
            given: args.len(),
        });
        return String::new();
    }
    if builtin.context_sensitive {
        cx.mark_context_sensitive();
    }
    let invocation = builtins::Invocation {
        expression: &call.source,
        name: builtin.name,
        args,
    };
    match (builtin.handler)(&invocation, cx) {
        Ok(value) => value,
        Err(error) => {
            cx.report(error);
            String::new()
        }
    }
}

/// Fold parameters past the last declared one back into it, comma-joined.
fn rejoin_trailing(args: &mut Vec<String>, max: Option<usize>) {
    let Some(max) = max.filter(|max| *max > 0) else {
        return;
    };
    if args.len() <= max {
        return;
    }
    let tail = args.split_off(max - 1).join(",");
    args.push(tail);
}
