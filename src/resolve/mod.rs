//! Target resolution.
//!
//! A [`Resolver`] wraps a finalised [`TargetGraph`] with one resolved view per
//! target and a central set of memo tables. It computes, per configuration
//! and head target, the link implementation, link interface and link closure
//! of each target, detects cyclic groups of static libraries and their
//! multiplicity, and checks compatible interface properties.
//!
//! The resolver evaluates properties through [`crate::genex`] and serves as
//! the evaluator's [`TargetHost`], so the two recurse into each other. The
//! evaluation cycle guard and the memo tables' in-progress set bound that
//! recursion.
//!
//! ```
//! use tsunagi::graph::{Configuration, TargetGraph, TargetKind, TargetSpec};
//! use tsunagi::resolve::Resolver;
//!
//! let mut builder = TargetGraph::builder();
//! builder.add(TargetSpec::new("core", TargetKind::StaticLibrary).languages(["C"]))?;
//! let app = builder.add(
//!     TargetSpec::new("app", TargetKind::Executable)
//!         .languages(["CXX"])
//!         .property("LINK_LIBRARIES", "core;m"),
//! )?;
//! let graph = builder.build();
//! let resolver = Resolver::new(&graph);
//! let release = Configuration::named("Release");
//! let implementation = resolver.link_implementation(app, &release);
//! assert_eq!(implementation.library_names(), ["core", "m"]);
//! assert_eq!(
//!     resolver.link_closure(app, &release, None).linker_language.as_deref(),
//!     Some("CXX")
//! );
//! # Ok::<(), tsunagi::graph::GraphError>(())
//! ```

mod cache;
mod closure;
mod compat;
mod includes;
mod link_iface;
mod link_impl;
mod link_info;
mod walk;

pub use closure::LinkClosure;
pub use compat::{CompatibilityError, CompatibleKind, CompatibleValue, Contribution};
pub use link_iface::LinkInterface;
pub use link_impl::{LinkImplementation, LinkItem};
pub use link_info::{LinkEntry, LinkReport};

use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::diagnostics::{Diagnostics, Provenance, Report, Severity};
use crate::genex::{
    Backtrace, CompiledExpression, EvalContext, Evaluation, GenexError, TargetHost,
};
use crate::graph::{Configuration, TargetGraph, TargetId};

use cache::{Pending, ResolutionCache};

/// How a property is read while resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Evaluate the raw property only.
    Raw,
    /// Evaluate the raw property with `$<LINK_ONLY:...>` dropped.
    TransitiveOnly,
    /// Go through [`TargetHost::property_value`], including usage
    /// requirements and compatible interface values.
    Host,
}

/// Per-target caches owned by the resolver.
#[derive(Debug, Default)]
pub(crate) struct ResolvedTarget {
    compiled: RefCell<BTreeMap<String, Option<Rc<CompiledExpression>>>>,
    system_includes: RefCell<BTreeMap<Configuration, Rc<BTreeSet<String>>>>,
    debug_reported: RefCell<BTreeSet<String>>,
    warned_implicit_interface: Cell<bool>,
}

impl ResolvedTarget {
    /// Returns `true` the first time it is called for `key`.
    fn first_debug_report(&self, key: &str) -> bool {
        self.debug_reported.borrow_mut().insert(key.to_owned())
    }
}

/// Resolves link relationships of a target graph.
pub struct Resolver<'g> {
    graph: &'g TargetGraph,
    views: Vec<ResolvedTarget>,
    cache: ResolutionCache,
    diagnostics: RefCell<Diagnostics>,
    walks: Cell<usize>,
}

impl<'g> Resolver<'g> {
    /// Create resolved views for every target of `graph`.
    #[must_use]
    pub fn new(graph: &'g TargetGraph) -> Self {
        Self {
            graph,
            views: graph.ids().map(|_| ResolvedTarget::default()).collect(),
            cache: ResolutionCache::default(),
            diagnostics: RefCell::new(Diagnostics::default()),
            walks: Cell::new(0),
        }
    }

    /// The graph being resolved.
    #[must_use]
    pub const fn target_graph(&self) -> &'g TargetGraph {
        self.graph
    }

    /// Number of dependency walks performed so far. Cache hits do not walk.
    #[must_use]
    pub fn walk_count(&self) -> usize {
        self.walks.get()
    }

    /// Reports recorded so far.
    pub fn diagnostics(&self) -> Ref<'_, Diagnostics> {
        self.diagnostics.borrow()
    }

    /// Take every recorded report.
    pub fn take_diagnostics(&self) -> Diagnostics {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Evaluate free-standing expression text.
    ///
    /// `target` becomes the current target and `head` defaults to it. Errors
    /// are returned in the [`Evaluation`] and not recorded.
    #[must_use]
    pub fn evaluate(
        &self,
        expression: &str,
        config: &Configuration,
        target: Option<TargetId>,
        head: Option<TargetId>,
        quiet: bool,
    ) -> Evaluation {
        let compiled = CompiledExpression::parse(expression);
        let cx = EvalContext::new(self, config.clone())
            .with_current(target)
            .with_head(head.or(target))
            .quiet(quiet)
            .with_backtrace(Backtrace::new("<expression>"));
        compiled.evaluate(cx)
    }

    fn view(&self, target: TargetId) -> Option<&ResolvedTarget> {
        self.views.get(target.index())
    }

    pub(crate) fn target_name(&self, target: TargetId) -> &'g str {
        self.graph.target(target).name()
    }

    pub(crate) fn report(&self, report: Report) {
        self.diagnostics.borrow_mut().push(report);
    }

    pub(crate) fn report_error(&self, error: &GenexError, provenance: Provenance) {
        self.report(Report::from_diagnostic(Severity::Error, error, provenance));
    }

    /// Report a request for a computation that is already on the stack.
    pub(crate) fn report_loop(&self, pending: &Pending) {
        let label = format!("{} {pending}", self.target_name(pending.target()));
        let error = GenexError::CyclicEvaluation {
            cycle: vec![label.clone(), label],
        };
        let provenance = Provenance {
            target: Some(self.target_name(pending.target()).to_owned()),
            property: None,
            config: pending.config().clone(),
            backtrace: Vec::new(),
        };
        self.report_error(&error, provenance);
    }

    /// Evaluate `property` of `target` in a fresh context and record any
    /// errors. Returns `None` when the property is unset.
    pub(crate) fn evaluate_property(
        &self,
        target: TargetId,
        property: &str,
        config: &Configuration,
        head: TargetId,
        lookup: Lookup,
    ) -> Option<String> {
        let name = self.target_name(target);
        let backtrace = Backtrace::new(format!("{name}:{property}"));
        let mut cx = EvalContext::new(self, config.clone())
            .with_head(Some(head))
            .with_current(Some(target))
            .with_backtrace(backtrace.clone())
            .transitive_properties_only(lookup == Lookup::TransitiveOnly);
        let result = match lookup {
            Lookup::Host => self.property_value(target, property, &mut cx),
            Lookup::Raw | Lookup::TransitiveOnly => {
                self.compiled_property(target, property).map_or(Ok(None), |expr| {
                    cx.enter(target, property, |inner| expr.evaluate_in(inner))
                        .map(Some)
                })
            }
        };
        let value = result.unwrap_or_else(|error| {
            cx.report(error);
            None
        });
        let is_set = value.is_some();
        let evaluation = cx.finish(value.unwrap_or_default());
        let provenance =
            Provenance::for_target(name, property, config.clone()).with_backtrace(&backtrace);
        for error in &evaluation.errors {
            self.report_error(error, provenance.clone());
        }
        is_set.then_some(evaluation.value)
    }
}

impl TargetHost for Resolver<'_> {
    fn graph(&self) -> &TargetGraph {
        self.graph
    }

    fn compiled_property(&self, target: TargetId, property: &str) -> Option<Rc<CompiledExpression>> {
        let raw = self.graph.target(target).property(property);
        let Some(view) = self.view(target) else {
            return raw.map(|text| Rc::new(CompiledExpression::parse(text)));
        };
        if let Some(hit) = view.compiled.borrow().get(property) {
            return hit.clone();
        }
        let compiled = raw.map(|text| Rc::new(CompiledExpression::parse(text)));
        view.compiled
            .borrow_mut()
            .insert(property.to_owned(), compiled.clone());
        compiled
    }

    fn property_value(
        &self,
        target: TargetId,
        property: &str,
        cx: &mut EvalContext<'_>,
    ) -> Result<Option<String>, GenexError> {
        if let Some(requirement) = includes::UsageRequirement::classify(property) {
            return self.usage_requirement(target, requirement, cx);
        }
        if let Some(expression) = self.compiled_property(target, property) {
            return cx
                .enter(target, property, |inner| expression.evaluate_in(inner))
                .map(Some);
        }
        if cx.evaluating_link_libraries() {
            return Ok(None);
        }
        Ok(self
            .compatible_value(target, cx.config(), property)
            .and_then(|compatible| compatible.value.clone()))
    }

    fn linker_language(&self, target: TargetId, cx: &mut EvalContext<'_>) -> Option<String> {
        self.link_closure(target, cx.config(), cx.head())
            .linker_language
            .clone()
    }
}
