//! Generator-expression parsing and evaluation.
//!
//! Property values may embed `$<identifier:param,...>` calls. Text is parsed
//! once into a [`CompiledExpression`] and evaluated against an
//! [`EvalContext`] carrying the configuration, the head and current targets,
//! and a cycle guard. The evaluator only sees the target graph through the
//! [`TargetHost`] trait.
//!
//! Errors never abort an evaluation. They set the context's error flag, are
//! recorded unless the context is quiet, and make the offending call yield an
//! empty string. A top-level evaluation that flagged an error yields the
//! empty string.
//!
//! ```
//! use tsunagi::genex::{CompiledExpression, EvalContext};
//! use tsunagi::graph::{Configuration, TargetGraph};
//!
//! let graph = TargetGraph::builder().build();
//! let expr = CompiledExpression::parse("$<CONFIG:Debug>");
//! let debug = expr.evaluate(EvalContext::new(&graph, Configuration::named("Debug")));
//! assert_eq!(debug.value, "1");
//! let none = expr.evaluate(EvalContext::new(&graph, Configuration::none()));
//! assert_eq!(none.value, "0");
//! ```

mod builtins;
mod compiled;
mod context;
mod error;
mod node;
mod parser;
mod values;

pub use compiled::CompiledExpression;
pub use context::{
    Backtrace, EvalContext, Evaluation, TargetHost, is_link_libraries_property,
    preferred_language,
};
pub use error::GenexError;
pub(crate) use error::canonicalize_cycle;
pub use node::{Call, Node};
pub use parser::{ParsedExpression, parse};
pub(crate) use values::extend_unique;
pub use values::{compare_versions, is_off, is_on, list_items};
