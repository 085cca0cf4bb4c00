//! Link implementation: what a target links directly.

use std::rc::Rc;

use serde::Serialize;

use crate::genex::{extend_unique, list_items};
use crate::graph::{Configuration, TargetId};

use super::cache::{ConfigKey, Pending};
use super::{Lookup, Resolver};

/// One link-library entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkItem {
    /// The item as written after evaluation.
    pub name: String,
    /// The target the name resolves to from the declaring target's scope.
    #[serde(skip)]
    pub target: Option<TargetId>,
}

/// Libraries and languages a target links directly for one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkImplementation {
    /// Items applying to the configuration, in declaration order.
    pub libraries: Vec<LinkItem>,
    /// Languages whose objects end up in the link.
    pub languages: Vec<String>,
    /// Items declared for other configurations. Only kept under the old
    /// stray-library policy, and never linked.
    pub wrong_config_libraries: Vec<LinkItem>,
}

impl LinkImplementation {
    /// Names of the applying items.
    #[must_use]
    pub fn library_names(&self) -> Vec<&str> {
        self.libraries.iter().map(|item| item.name.as_str()).collect()
    }
}

#[derive(Clone, Copy)]
enum ItemScope {
    General,
    Debug,
    Optimized,
}

impl ItemScope {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "general" => Some(Self::General),
            "debug" => Some(Self::Debug),
            "optimized" => Some(Self::Optimized),
            _ => None,
        }
    }

    const fn applies(self, debug_configuration: bool) -> bool {
        match self {
            Self::General => true,
            Self::Debug => debug_configuration,
            Self::Optimized => !debug_configuration,
        }
    }
}

impl Resolver<'_> {
    /// Direct link libraries of `target` for `config`.
    #[must_use]
    pub fn link_implementation(
        &self,
        target: TargetId,
        config: &Configuration,
    ) -> Rc<LinkImplementation> {
        let key = ConfigKey {
            target,
            config: config.clone(),
        };
        self.cache
            .memoize(
                &self.cache.implementations,
                &key,
                Pending::Implementation(key.clone()),
                || Rc::new(self.compute_implementation(target, config)),
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                Rc::default()
            })
    }

    pub(crate) fn link_item(&self, name: &str, from: TargetId) -> LinkItem {
        LinkItem {
            name: name.to_owned(),
            target: self.graph.find(name, Some(from)),
        }
    }

    fn compute_implementation(&self, target: TargetId, config: &Configuration) -> LinkImplementation {
        let graph = self.graph;
        let declared = graph.target(target);
        tracing::debug!(name = declared.name(), %config, "computing link implementation");
        let raw = self
            .evaluate_property(target, "LINK_LIBRARIES", config, target, Lookup::Raw)
            .unwrap_or_default();
        let debug_configuration = graph.settings().is_debug_configuration(config);
        let keep_stray = declared.policies().stray_config_libraries.is_legacy();

        let mut implementation = LinkImplementation::default();
        let mut scope = ItemScope::General;
        for word in list_items(&raw) {
            if let Some(keyword) = ItemScope::from_keyword(word) {
                scope = keyword;
                continue;
            }
            let item = self.link_item(word, target);
            if scope.applies(debug_configuration) {
                implementation.libraries.push(item);
            } else if keep_stray {
                implementation.wrong_config_libraries.push(item);
            }
            scope = ItemScope::General;
        }

        extend_unique(&mut implementation.languages, declared.languages());
        for dep in implementation.libraries.iter().filter_map(|item| item.target) {
            let dependency = graph.target(dep);
            if dependency.kind().propagates_link_language() {
                extend_unique(&mut implementation.languages, dependency.languages());
            }
        }
        implementation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PolicyStatus, Policies, TargetGraph, TargetKind, TargetSpec};
    use rstest::rstest;

    fn graph_with(libraries: &str, stray: PolicyStatus) -> (TargetGraph, TargetId) {
        let mut builder = TargetGraph::builder();
        builder
            .add(TargetSpec::new("dbg", TargetKind::StaticLibrary).languages(["C"]))
            .expect("dbg");
        let app = builder
            .add(
                TargetSpec::new("app", TargetKind::Executable)
                    .languages(["CXX"])
                    .property("LINK_LIBRARIES", libraries)
                    .policies(Policies {
                        stray_config_libraries: stray,
                        ..Policies::default()
                    }),
            )
            .expect("app");
        (builder.build(), app)
    }

    #[rstest]
    #[case("Debug", &["dbg", "m"], &[])]
    #[case("Release", &["opt", "m"], &["dbg"])]
    fn keywords_select_items_by_configuration(
        #[case] config: &str,
        #[case] expected: &[&str],
        #[case] stray: &[&str],
    ) {
        let (graph, app) = graph_with("debug;dbg;optimized;opt;m", PolicyStatus::Old);
        let resolver = Resolver::new(&graph);
        let implementation = resolver.link_implementation(app, &Configuration::named(config));
        assert_eq!(implementation.library_names(), expected);
        let wrong: Vec<_> = implementation
            .wrong_config_libraries
            .iter()
            .map(|item| item.name.as_str())
            .filter(|name| *name != "opt")
            .collect();
        assert_eq!(wrong, stray);
    }

    #[test]
    fn new_stray_policy_drops_other_configuration_items() {
        let (graph, app) = graph_with("debug;dbg;m", PolicyStatus::New);
        let resolver = Resolver::new(&graph);
        let implementation = resolver.link_implementation(app, &Configuration::named("Release"));
        assert_eq!(implementation.library_names(), ["m"]);
        assert!(implementation.wrong_config_libraries.is_empty());
    }

    #[test]
    fn static_dependency_languages_join_the_implementation() {
        let (graph, app) = graph_with("dbg", PolicyStatus::New);
        let resolver = Resolver::new(&graph);
        let implementation = resolver.link_implementation(app, &Configuration::named("Debug"));
        assert_eq!(implementation.languages, ["CXX", "C"]);
        assert_eq!(implementation.libraries[0].target, graph.find_global("dbg"));
    }
}
