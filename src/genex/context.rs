//! Evaluation context and the evaluator's view of the target graph.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::graph::{Configuration, TargetGraph, TargetId};

use super::compiled::CompiledExpression;
use super::error::{GenexError, canonicalize_cycle};

/// Properties whose evaluation means link libraries are being computed.
const LINK_LIBRARY_PROPERTIES: [&str; 3] = [
    "LINK_LIBRARIES",
    "INTERFACE_LINK_LIBRARIES",
    "LINK_INTERFACE_LIBRARIES",
];

/// Whether `property` holds link libraries, including per-configuration
/// `LINK_INTERFACE_LIBRARIES_<CONFIG>` variants.
#[must_use]
pub fn is_link_libraries_property(property: &str) -> bool {
    LINK_LIBRARY_PROPERTIES.contains(&property)
        || property.starts_with("LINK_INTERFACE_LIBRARIES_")
}

/// Callbacks the evaluator uses to read the target graph.
///
/// [`TargetGraph`] implements this with plain property evaluation. The
/// resolver overrides it to add usage-requirement propagation, caching and
/// compatible interface properties.
pub trait TargetHost {
    /// The graph being evaluated against.
    fn graph(&self) -> &TargetGraph;

    /// Parsed form of a raw property, or `None` when the property is unset.
    fn compiled_property(&self, target: TargetId, property: &str) -> Option<Rc<CompiledExpression>> {
        self.graph()
            .target(target)
            .property(property)
            .map(|raw| Rc::new(CompiledExpression::parse(raw)))
    }

    /// Evaluate a property of `target` within `cx`.
    ///
    /// Returns `Ok(None)` when the property is unset.
    ///
    /// # Errors
    ///
    /// Returns [`GenexError::CyclicEvaluation`] when the property is already
    /// being evaluated further up the stack.
    fn property_value(
        &self,
        target: TargetId,
        property: &str,
        cx: &mut EvalContext<'_>,
    ) -> Result<Option<String>, GenexError> {
        let Some(expression) = self.compiled_property(target, property) else {
            return Ok(None);
        };
        cx.enter(target, property, |inner| expression.evaluate_in(inner))
            .map(Some)
    }

    /// Language used to drive the link of `target`.
    fn linker_language(&self, target: TargetId, _cx: &mut EvalContext<'_>) -> Option<String> {
        let graph = self.graph();
        preferred_language(graph, graph.target(target).languages())
    }
}

impl TargetHost for TargetGraph {
    fn graph(&self) -> &TargetGraph {
        self
    }
}

/// First language with the highest linker preference.
#[must_use]
pub fn preferred_language(graph: &TargetGraph, languages: &[String]) -> Option<String> {
    let settings = graph.settings();
    languages
        .iter()
        .fold(None::<(&String, u32)>, |best, lang| {
            let pref = settings.linker_preference(lang);
            match best {
                Some((_, best_pref)) if best_pref >= pref => best,
                _ => Some((lang, pref)),
            }
        })
        .map(|(lang, _)| lang.clone())
}

/// Provenance trail attached to diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<String>,
}

impl Backtrace {
    /// A trail with a single origin label such as `app:LINK_LIBRARIES`.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            frames: vec![origin.into()],
        }
    }

    /// Frames from the outermost origin inwards.
    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Whether no origin was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.frames.join(" -> "))
    }
}

/// Mutable state threaded through one top-level evaluation.
pub struct EvalContext<'a> {
    host: &'a dyn TargetHost,
    config: Configuration,
    head: Option<TargetId>,
    current: Option<TargetId>,
    quiet: bool,
    transitive_properties_only: bool,
    backtrace: Backtrace,
    active: Vec<(TargetId, String)>,
    had_error: bool,
    errors: Vec<GenexError>,
    seen_targets: BTreeSet<TargetId>,
    context_sensitive: bool,
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("config", &self.config)
            .field("head", &self.head)
            .field("current", &self.current)
            .field("quiet", &self.quiet)
            .field("active", &self.active)
            .field("had_error", &self.had_error)
            .finish_non_exhaustive()
    }
}

impl<'a> EvalContext<'a> {
    /// A context for `config` with no head or current target.
    #[must_use]
    pub fn new(host: &'a dyn TargetHost, config: Configuration) -> Self {
        Self {
            host,
            config,
            head: None,
            current: None,
            quiet: false,
            transitive_properties_only: false,
            backtrace: Backtrace::default(),
            active: Vec::new(),
            had_error: false,
            errors: Vec::new(),
            seen_targets: BTreeSet::new(),
            context_sensitive: false,
        }
    }

    /// Set the head target.
    #[must_use]
    pub const fn with_head(mut self, head: Option<TargetId>) -> Self {
        self.head = head;
        self
    }

    /// Set the target whose property is being evaluated.
    #[must_use]
    pub const fn with_current(mut self, current: Option<TargetId>) -> Self {
        self.current = current;
        self
    }

    /// Suppress error records while still flagging failure.
    #[must_use]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Drop `$<LINK_ONLY:...>` content.
    #[must_use]
    pub const fn transitive_properties_only(mut self, only: bool) -> Self {
        self.transitive_properties_only = only;
        self
    }

    /// Attach a provenance trail.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Mark `(target, property)` as already being evaluated.
    #[must_use]
    pub fn with_active(mut self, target: TargetId, property: impl Into<String>) -> Self {
        self.active.push((target, property.into()));
        self
    }

    /// The host the context reads targets from.
    #[must_use]
    pub fn host(&self) -> &'a dyn TargetHost {
        self.host
    }

    /// The graph behind the host.
    #[must_use]
    pub fn graph(&self) -> &'a TargetGraph {
        self.host.graph()
    }

    /// Configuration being evaluated for.
    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Target ultimately being linked.
    #[must_use]
    pub const fn head(&self) -> Option<TargetId> {
        self.head
    }

    /// Target whose property is being evaluated.
    #[must_use]
    pub const fn current(&self) -> Option<TargetId> {
        self.current
    }

    /// Whether `$<LINK_ONLY:...>` content is dropped.
    #[must_use]
    pub const fn is_transitive_properties_only(&self) -> bool {
        self.transitive_properties_only
    }

    /// Provenance trail.
    #[must_use]
    pub const fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Whether any error was flagged.
    #[must_use]
    pub const fn had_error(&self) -> bool {
        self.had_error
    }

    /// Whether `(target, property)` is on the active stack.
    #[must_use]
    pub fn is_active(&self, target: TargetId, property: &str) -> bool {
        self.active
            .iter()
            .any(|(id, prop)| *id == target && prop == property)
    }

    /// Whether a link-library property is on the active stack.
    #[must_use]
    pub fn evaluating_link_libraries(&self) -> bool {
        self.active
            .iter()
            .any(|(_, prop)| is_link_libraries_property(prop))
    }

    /// Record a failure. The error text is kept unless the context is quiet.
    pub fn report(&mut self, error: GenexError) {
        self.had_error = true;
        if !self.quiet && !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub(crate) fn note_target(&mut self, target: TargetId) {
        self.seen_targets.insert(target);
    }

    pub(crate) const fn mark_context_sensitive(&mut self) {
        self.context_sensitive = true;
    }

    /// Evaluate `property` of `target` with `f`, guarding against re-entry.
    ///
    /// While `f` runs, `target` is the current target and the pair is on
    /// the active stack. Both are restored afterwards on every path.
    ///
    /// # Errors
    ///
    /// Returns [`GenexError::CyclicEvaluation`] without calling `f` when the
    /// pair is already active.
    pub fn enter<R>(
        &mut self,
        target: TargetId,
        property: &str,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, GenexError> {
        if let Some(start) = self
            .active
            .iter()
            .position(|(id, prop)| *id == target && prop == property)
        {
            let graph = self.graph();
            let label = |id: TargetId, prop: &str| format!("{}:{prop}", graph.target(id).name());
            let mut cycle: Vec<String> = self
                .active
                .iter()
                .skip(start)
                .map(|(id, prop)| label(*id, prop))
                .collect();
            cycle.push(label(target, property));
            return Err(GenexError::CyclicEvaluation {
                cycle: canonicalize_cycle(cycle),
            });
        }
        self.active.push((target, property.to_owned()));
        let saved = self.current.replace(target);
        let result = f(self);
        self.current = saved;
        self.active.pop();
        Ok(result)
    }

    /// Consume the context, producing the outcome of a top-level evaluation.
    #[must_use]
    pub fn finish(self, value: String) -> Evaluation {
        Evaluation {
            value: if self.had_error { String::new() } else { value },
            had_error: self.had_error,
            errors: self.errors,
            seen_targets: self.seen_targets,
            context_sensitive: self.context_sensitive,
        }
    }
}

/// Outcome of a top-level evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// The result; empty when any error was flagged.
    pub value: String,
    /// Whether any error was flagged.
    pub had_error: bool,
    /// Recorded errors in the order they occurred.
    pub errors: Vec<GenexError>,
    /// Targets referenced by the expression.
    pub seen_targets: BTreeSet<TargetId>,
    /// Whether the result depends on configuration or target context.
    pub context_sensitive: bool,
}
