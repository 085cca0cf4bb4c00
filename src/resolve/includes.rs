//! Usage requirements propagated along link interfaces.
//!
//! `INCLUDE_DIRECTORIES`, `COMPILE_DEFINITIONS` and `COMPILE_OPTIONS` of a
//! target are its own entries followed by the `INTERFACE_` entries of what it
//! links. A dependency's `INTERFACE_` entries in turn include those of the
//! libraries it passes on to its consumers.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::diagnostics::{Provenance, Report, Severity};
use crate::genex::{EvalContext, GenexError, TargetHost, extend_unique, list_items};
use crate::graph::{Configuration, PolicyStatus, TargetId, TargetKind};

use super::cache::{HeadKey, Pending};
use super::link_impl::LinkItem;
use super::{Lookup, Resolver};

const PROPAGATED: [&str; 3] = ["INCLUDE_DIRECTORIES", "COMPILE_DEFINITIONS", "COMPILE_OPTIONS"];

/// A property assembled from the target and its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UsageRequirement {
    base: &'static str,
    interface: bool,
}

impl UsageRequirement {
    /// Recognise `property` as a propagated property or its `INTERFACE_` form.
    pub(crate) fn classify(property: &str) -> Option<Self> {
        let (name, interface) = property
            .strip_prefix("INTERFACE_")
            .map_or((property, false), |base| (base, true));
        PROPAGATED
            .into_iter()
            .find(|base| *base == name)
            .map(|base| Self { base, interface })
    }

    fn property(self) -> String {
        if self.interface {
            format!("INTERFACE_{}", self.base)
        } else {
            self.base.to_owned()
        }
    }

    const fn interface_form(self) -> Self {
        Self {
            base: self.base,
            interface: true,
        }
    }
}

impl Resolver<'_> {
    /// Evaluate a propagated property of `target` inside `cx`.
    ///
    /// A dependency whose property is already being assembled further up
    /// the stack contributes nothing. Cycles of static libraries reach that
    /// case legitimately.
    pub(crate) fn usage_requirement(
        &self,
        target: TargetId,
        requirement: UsageRequirement,
        cx: &mut EvalContext<'_>,
    ) -> Result<Option<String>, GenexError> {
        let property = requirement.property();
        if cx.is_active(target, &property) {
            return Ok(None);
        }
        let config = cx.config().clone();
        let head = cx.head().unwrap_or(target);
        let own = self.compiled_property(target, &property);
        let deps: Vec<TargetId> = if requirement.interface {
            self.transitive_property_link_libraries(target, &config, head)
                .iter()
                .filter_map(|item| item.target)
                .collect()
        } else {
            self.link_implementation(target, &config)
                .libraries
                .iter()
                .filter_map(|item| item.target)
                .collect()
        };

        cx.enter(target, &property, |inner| {
            let mut values: Vec<String> = Vec::new();
            if let Some(expression) = &own {
                let text = expression.evaluate_in(inner);
                extend_unique(&mut values, list_items(&text));
            }
            for dep in deps {
                match self.usage_requirement(dep, requirement.interface_form(), inner) {
                    Ok(Some(text)) => extend_unique(&mut values, list_items(&text)),
                    Ok(None) => {}
                    Err(error) => inner.report(error),
                }
            }
            (own.is_some() || !values.is_empty()).then(|| values.join(";"))
        })
    }

    /// Libraries whose usage requirements reach consumers of `target`.
    ///
    /// `$<LINK_ONLY:...>` entries of a static library's interface are linked
    /// but do not pass on usage requirements.
    pub(crate) fn transitive_property_link_libraries(
        &self,
        target: TargetId,
        config: &Configuration,
        head: TargetId,
    ) -> Rc<Vec<LinkItem>> {
        let key = HeadKey::new(target, config, Some(head));
        self.cache
            .memoize(
                &self.cache.transitive_libraries,
                &key,
                Pending::TransitiveLibraries(key.clone()),
                || Rc::new(self.compute_transitive_libraries(&key)),
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                Rc::default()
            })
    }

    fn compute_transitive_libraries(&self, key: &HeadKey) -> Vec<LinkItem> {
        let declared = self.graph.target(key.target);
        if declared.kind() == TargetKind::StaticLibrary
            && declared.policies().implicit_link_interface == PolicyStatus::New
        {
            let raw = self
                .evaluate_property(
                    key.target,
                    "INTERFACE_LINK_LIBRARIES",
                    &key.config,
                    key.head,
                    Lookup::TransitiveOnly,
                )
                .unwrap_or_default();
            return list_items(&raw)
                .map(|name| self.link_item(name, key.target))
                .collect();
        }
        self.link_interface(key.target, &key.config, Some(key.head))
            .map(|interface| interface.libraries.clone())
            .unwrap_or_default()
    }

    /// Include directories of `target`, its own first, de-duplicated.
    #[must_use]
    pub fn include_directories(&self, target: TargetId, config: &Configuration) -> Vec<String> {
        const PROPERTY: &str = "INCLUDE_DIRECTORIES";
        let raw = self
            .evaluate_property(target, PROPERTY, config, target, Lookup::Host)
            .unwrap_or_default();
        let mut directories = Vec::new();
        extend_unique(&mut directories, list_items(&raw));

        let traced = self.graph.settings().debug_properties.contains(PROPERTY)
            && self
                .view(target)
                .is_some_and(|view| view.first_debug_report(&format!("{PROPERTY}:{config}")));
        if traced && !directories.is_empty() {
            let name = self.target_name(target);
            let mut message = format!("used includes for target \"{name}\":");
            for directory in &directories {
                message.push_str("\n  * ");
                message.push_str(directory);
            }
            let provenance = Provenance::for_target(name, PROPERTY, config.clone());
            self.report(Report::new(Severity::Debug, message, provenance));
        }
        directories
    }

    /// Whether `directory` is a system include directory when compiling
    /// `target`.
    #[must_use]
    pub fn is_system_include_directory(
        &self,
        target: TargetId,
        directory: &str,
        config: &Configuration,
    ) -> bool {
        let Some(view) = self.view(target) else {
            return false;
        };
        let cached = view.system_includes.borrow().get(config).cloned();
        let system = cached.unwrap_or_else(|| {
            let computed = Rc::new(self.system_include_directories(target, config));
            view.system_includes
                .borrow_mut()
                .insert(config.clone(), Rc::clone(&computed));
            computed
        });
        system.contains(directory)
    }

    fn system_include_directories(
        &self,
        target: TargetId,
        config: &Configuration,
    ) -> BTreeSet<String> {
        let mut directories = BTreeSet::new();
        let own = self.evaluate_property(
            target,
            "SYSTEM_INCLUDE_DIRECTORIES",
            config,
            target,
            Lookup::Raw,
        );
        directories.extend(own.iter().flat_map(|raw| list_items(raw)).map(str::to_owned));
        let walk = self.implementation_walk(target, config, target);
        for dep in &walk.visited {
            let published = self.evaluate_property(
                *dep,
                "INTERFACE_SYSTEM_INCLUDE_DIRECTORIES",
                config,
                target,
                Lookup::Raw,
            );
            directories.extend(
                published
                    .iter()
                    .flat_map(|raw| list_items(raw))
                    .map(str::to_owned),
            );
        }
        directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Policies, TargetGraph, TargetSpec};
    use rstest::rstest;

    #[rstest]
    #[case("INCLUDE_DIRECTORIES", Some(false))]
    #[case("INTERFACE_COMPILE_DEFINITIONS", Some(true))]
    #[case("COMPILE_OPTIONS", Some(false))]
    #[case("INTERFACE_LINK_LIBRARIES", None)]
    #[case("INTERFACE_", None)]
    fn classify_recognises_propagated_properties(
        #[case] property: &str,
        #[case] interface: Option<bool>,
    ) {
        assert_eq!(
            UsageRequirement::classify(property).map(|req| req.interface),
            interface
        );
    }

    fn library(name: &str, interface_links: &str, include: &str) -> TargetSpec {
        TargetSpec::new(name, TargetKind::StaticLibrary)
            .languages(["C"])
            .property("INTERFACE_LINK_LIBRARIES", interface_links)
            .property("INTERFACE_INCLUDE_DIRECTORIES", include)
            .policies(Policies {
                implicit_link_interface: PolicyStatus::New,
                ..Policies::default()
            })
    }

    fn build(
        libraries: Vec<TargetSpec>,
        app_links: &str,
        traced: bool,
    ) -> (TargetGraph, TargetId) {
        let mut builder = TargetGraph::builder();
        if traced {
            builder
                .settings_mut()
                .debug_properties
                .insert("INCLUDE_DIRECTORIES".to_owned());
        }
        for spec in libraries {
            builder.add(spec).expect("library");
        }
        let app = builder
            .add(
                TargetSpec::new("app", TargetKind::Executable)
                    .languages(["C"])
                    .property("LINK_LIBRARIES", app_links)
                    .property("INCLUDE_DIRECTORIES", "/app/src"),
            )
            .expect("app");
        (builder.build(), app)
    }

    #[test]
    fn interface_directories_follow_own_entries() {
        let (graph, app) = build(
            vec![
                library("lib", "core", "/lib/include;/shared"),
                library("core", "", "/core/include;/shared"),
            ],
            "lib",
            false,
        );
        let resolver = Resolver::new(&graph);
        assert_eq!(
            resolver.include_directories(app, &Configuration::none()),
            ["/app/src", "/lib/include", "/shared", "/core/include"]
        );
        assert!(resolver.diagnostics().is_empty());
    }

    #[test]
    fn link_only_entries_do_not_propagate_requirements() {
        let (graph, app) = build(
            vec![
                library("lib", "$<LINK_ONLY:hidden>;core", "/lib"),
                library("hidden", "", "/hidden"),
                library("core", "", "/core"),
            ],
            "lib",
            false,
        );
        let resolver = Resolver::new(&graph);
        assert_eq!(
            resolver.include_directories(app, &Configuration::none()),
            ["/app/src", "/lib", "/core"]
        );
        let lib = graph.find_global("lib").expect("lib");
        let interface = resolver
            .link_interface(lib, &Configuration::none(), Some(app))
            .expect("interface");
        assert_eq!(interface.library_names(), ["hidden", "core"]);
    }

    #[test]
    fn static_cycles_contribute_each_member_once() {
        let (graph, app) = build(
            vec![library("a", "b", "/a"), library("b", "a", "/b")],
            "a",
            false,
        );
        let resolver = Resolver::new(&graph);
        assert_eq!(
            resolver.include_directories(app, &Configuration::none()),
            ["/app/src", "/a", "/b"]
        );
        assert!(!resolver.diagnostics().has_errors());
    }

    #[test]
    fn traced_includes_are_reported_once() {
        let (graph, app) = build(vec![library("lib", "", "/lib")], "lib", true);
        let resolver = Resolver::new(&graph);
        for _ in 0..2 {
            let directories = resolver.include_directories(app, &Configuration::none());
            assert_eq!(directories.len(), 2);
        }
        let diagnostics = resolver.diagnostics();
        let debug: Vec<_> = diagnostics.with_severity(Severity::Debug).collect();
        assert_eq!(debug.len(), 1);
        assert!(debug.first().is_some_and(|report| report.message.contains("/lib")));
    }

    #[test]
    fn system_directories_come_from_linked_interfaces() {
        let system =
            library("sys", "", "/sys").property("INTERFACE_SYSTEM_INCLUDE_DIRECTORIES", "/sys");
        let (graph, app) = build(vec![system], "sys", false);
        let resolver = Resolver::new(&graph);
        let config = Configuration::named("Release");
        assert!(resolver.is_system_include_directory(app, "/sys", &config));
        assert!(!resolver.is_system_include_directory(app, "/app/src", &config));
    }
}
