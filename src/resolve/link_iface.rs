//! Link interface: what consumers of a target must link as well.

use std::rc::Rc;

use serde::Serialize;

use crate::diagnostics::{Provenance, Report, Severity};
use crate::genex::{extend_unique, list_items};
use crate::graph::{Configuration, PolicyStatus, Target, TargetId, TargetKind};

use super::cache::{HeadKey, Pending};
use super::link_impl::LinkItem;
use super::{Lookup, Resolver};

/// The interface a target declares for one `(configuration, head)` before
/// any transitive walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DirectInterface {
    pub(crate) items: Vec<LinkItem>,
    pub(crate) languages: Vec<String>,
    pub(crate) shared_deps: Vec<String>,
    pub(crate) multiplicity: u32,
    pub(crate) implementation_is_interface: bool,
    pub(crate) wrong_config_libraries: Vec<LinkItem>,
}

/// Transitive link interface of a target for one `(configuration, head)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkInterface {
    /// Items the target declares in its interface.
    pub libraries: Vec<LinkItem>,
    /// Every item reached by walking the interface, in walk order.
    pub transitive: Vec<LinkItem>,
    /// Runtime languages consumers must link.
    pub languages: Vec<String>,
    /// Shared libraries needed at runtime but not linked directly.
    pub shared_deps: Vec<String>,
    /// How many times cyclic static groups must be repeated.
    pub multiplicity: u32,
    /// Whether the link implementation stands in for a missing interface.
    pub implementation_is_interface: bool,
    /// Items declared for other configurations.
    pub wrong_config_libraries: Vec<LinkItem>,
    /// Members of each cyclic static-library group, in walk order.
    pub static_groups: Vec<Vec<String>>,
}

impl LinkInterface {
    /// Names of the declared items.
    #[must_use]
    pub fn library_names(&self) -> Vec<&str> {
        self.libraries.iter().map(|item| item.name.as_str()).collect()
    }

    /// Names of the transitive items.
    #[must_use]
    pub fn transitive_names(&self) -> Vec<&str> {
        self.transitive.iter().map(|item| item.name.as_str()).collect()
    }
}

impl Resolver<'_> {
    /// Transitive link interface of `target`.
    ///
    /// `None` means the target cannot be linked against, or its interface is
    /// already being computed further up the stack.
    #[must_use]
    pub fn link_interface(
        &self,
        target: TargetId,
        config: &Configuration,
        head: Option<TargetId>,
    ) -> Option<Rc<LinkInterface>> {
        let key = HeadKey::new(target, config, head);
        self.cache
            .memoize(
                &self.cache.interfaces,
                &key,
                Pending::Interface(key.clone()),
                || self.compute_interface(&key).map(Rc::new),
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                None
            })
    }

    pub(crate) fn direct_interface(
        &self,
        target: TargetId,
        config: &Configuration,
        head: TargetId,
    ) -> Option<Rc<DirectInterface>> {
        let key = HeadKey::new(target, config, Some(head));
        self.cache
            .memoize(
                &self.cache.direct_interfaces,
                &key,
                Pending::DirectInterface(key.clone()),
                || self.compute_direct_interface(&key).map(Rc::new),
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                None
            })
    }

    fn compute_interface(&self, key: &HeadKey) -> Option<LinkInterface> {
        let direct = self.direct_interface(key.target, &key.config, key.head)?;
        let walk = self.walk(key.target, &direct.items, &key.config, key.head);

        let mut languages = direct.languages.clone();
        extend_unique(&mut languages, &walk.languages);
        let mut shared_deps = direct.shared_deps.clone();
        extend_unique(&mut shared_deps, &walk.shared_deps);

        Some(LinkInterface {
            libraries: direct.items.clone(),
            transitive: walk.transitive.clone(),
            languages,
            shared_deps,
            multiplicity: direct.multiplicity.max(walk.multiplicity),
            implementation_is_interface: direct.implementation_is_interface,
            wrong_config_libraries: direct.wrong_config_libraries.clone(),
            static_groups: walk
                .static_groups
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|id| self.target_name(*id).to_owned())
                        .collect()
                })
                .collect(),
        })
    }

    /// Property holding the explicit interface list, if one is set.
    fn explicit_interface_property(&self, declared: &Target, config: &Configuration) -> Option<String> {
        let set = |name: String| declared.property(&name).is_some().then_some(name);
        let kind = declared.kind();
        if declared.policies().implicit_link_interface == PolicyStatus::New
            || kind == TargetKind::InterfaceLibrary
        {
            return set("INTERFACE_LINK_LIBRARIES".to_owned());
        }
        if kind == TargetKind::SharedLibrary || declared.is_executable_with_exports() {
            return config
                .property_suffix()
                .and_then(|suffix| set(format!("LINK_INTERFACE_LIBRARIES{suffix}")))
                .or_else(|| set("LINK_INTERFACE_LIBRARIES".to_owned()));
        }
        None
    }

    fn compute_direct_interface(&self, key: &HeadKey) -> Option<DirectInterface> {
        let graph = self.graph;
        let declared = graph.target(key.target);
        let kind = declared.kind();
        if !kind.is_linkable() {
            return None;
        }
        tracing::debug!(
            name = declared.name(),
            config = %key.config,
            head = self.target_name(key.head),
            "computing link interface"
        );

        let explicit = self.explicit_interface_property(declared, &key.config);
        // Modules link against executables that export symbols.
        if explicit.is_none()
            && matches!(kind, TargetKind::Executable | TargetKind::ModuleLibrary)
            && !declared.is_executable_with_exports()
        {
            return None;
        }

        let mut direct = DirectInterface::default();
        if let Some(property) = explicit {
            let raw = self
                .evaluate_property(key.target, &property, &key.config, key.head, Lookup::Raw)
                .unwrap_or_default();
            direct.items = list_items(&raw)
                .map(|name| self.link_item(name, key.target))
                .collect();
            if matches!(kind, TargetKind::SharedLibrary | TargetKind::StaticLibrary) {
                let implementation = self.link_implementation(key.target, &key.config);
                for item in &implementation.libraries {
                    let is_shared = item
                        .target
                        .is_some_and(|dep| graph.target(dep).kind() == TargetKind::SharedLibrary);
                    if is_shared && !direct.items.contains(item) {
                        extend_unique(&mut direct.shared_deps, [&item.name]);
                    }
                }
            }
        } else if declared.policies().implicit_link_interface.is_legacy() {
            let implementation = self.link_implementation(key.target, &key.config);
            direct.items.clone_from(&implementation.libraries);
            direct
                .wrong_config_libraries
                .clone_from(&implementation.wrong_config_libraries);
            direct.implementation_is_interface = true;
            self.warn_implicit_interface(key);
        }

        if kind == TargetKind::StaticLibrary {
            let implementation = self.link_implementation(key.target, &key.config);
            direct.languages.clone_from(&implementation.languages);
            direct.multiplicity = explicit_multiplicity(declared, &key.config);
        }
        Some(direct)
    }

    fn warn_implicit_interface(&self, key: &HeadKey) {
        let declared = self.graph.target(key.target);
        if declared.policies().implicit_link_interface != PolicyStatus::Warn {
            return;
        }
        let Some(view) = self.view(key.target) else {
            return;
        };
        if view.warned_implicit_interface.replace(true) {
            return;
        }
        let provenance = Provenance::for_target(
            declared.name(),
            "INTERFACE_LINK_LIBRARIES",
            key.config.clone(),
        );
        self.report(Report {
            severity: Severity::Warning,
            code: Some("tsunagi::resolve::implicit_link_interface".to_owned()),
            message: format!(
                "target \"{}\" has no explicit link interface; its link implementation is used instead",
                declared.name()
            ),
            provenance,
        });
    }
}

/// `LINK_INTERFACE_MULTIPLICITY[_<CONFIG>]` of a static library.
fn explicit_multiplicity(declared: &Target, config: &Configuration) -> u32 {
    config
        .property_suffix()
        .and_then(|suffix| declared.property(&format!("LINK_INTERFACE_MULTIPLICITY{suffix}")))
        .or_else(|| declared.property("LINK_INTERFACE_MULTIPLICITY"))
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Policies, TargetGraph, TargetSpec};
    use rstest::rstest;

    fn policies(status: PolicyStatus) -> Policies {
        Policies {
            implicit_link_interface: status,
            ..Policies::default()
        }
    }

    #[test]
    fn object_libraries_have_no_interface() {
        let mut builder = TargetGraph::builder();
        let objects = builder
            .add(TargetSpec::new("objs", TargetKind::ObjectLibrary))
            .expect("objs");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        assert!(
            resolver
                .link_interface(objects, &Configuration::none(), None)
                .is_none()
        );
    }

    #[test]
    fn warn_policy_falls_back_to_implementation_once() {
        let mut builder = TargetGraph::builder();
        let core = builder
            .add(
                TargetSpec::new("core", TargetKind::SharedLibrary)
                    .property("LINK_LIBRARIES", "z")
                    .policies(policies(PolicyStatus::Warn)),
            )
            .expect("core");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        for config in ["Debug", "Release"] {
            let interface = resolver
                .link_interface(core, &Configuration::named(config), None)
                .expect("shared libraries are linkable");
            assert!(interface.implementation_is_interface);
            assert_eq!(interface.library_names(), ["z"]);
        }
        assert_eq!(
            resolver
                .diagnostics()
                .with_severity(Severity::Warning)
                .count(),
            1
        );
    }

    #[rstest]
    #[case("ON", true)]
    #[case("OFF", false)]
    fn exporting_executables_can_be_linked(#[case] exports: &str, #[case] linkable: bool) {
        let mut builder = TargetGraph::builder();
        let host = builder
            .add(
                TargetSpec::new("host", TargetKind::Executable)
                    .property("ENABLE_EXPORTS", exports)
                    .property("LINK_LIBRARIES", "z")
                    .policies(policies(PolicyStatus::New)),
            )
            .expect("host");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let interface = resolver.link_interface(host, &Configuration::none(), None);
        assert_eq!(interface.is_some(), linkable);
        if let Some(found) = interface {
            assert!(found.libraries.is_empty());
        }
    }

    #[test]
    fn new_policy_without_list_is_empty() {
        let mut builder = TargetGraph::builder();
        let core = builder
            .add(
                TargetSpec::new("core", TargetKind::SharedLibrary)
                    .property("LINK_LIBRARIES", "z")
                    .policies(policies(PolicyStatus::New)),
            )
            .expect("core");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let interface = resolver
            .link_interface(core, &Configuration::none(), None)
            .expect("interface");
        assert!(interface.libraries.is_empty());
        assert!(!interface.implementation_is_interface);
        assert!(resolver.diagnostics().is_empty());
    }

    #[test]
    fn legacy_shared_library_prefers_per_configuration_list() {
        let mut builder = TargetGraph::builder();
        let core = builder
            .add(
                TargetSpec::new("core", TargetKind::SharedLibrary)
                    .property("LINK_INTERFACE_LIBRARIES", "all")
                    .property("LINK_INTERFACE_LIBRARIES_DEBUG", "dbg")
                    .policies(policies(PolicyStatus::Old)),
            )
            .expect("core");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let names = |config: &str| {
            resolver
                .link_interface(core, &Configuration::named(config), None)
                .map(|iface| iface.library_names().join(";"))
        };
        assert_eq!(names("Debug").as_deref(), Some("dbg"));
        assert_eq!(names("Release").as_deref(), Some("all"));
    }

    #[test]
    fn explicit_list_records_unlisted_shared_dependencies() {
        let mut builder = TargetGraph::builder();
        builder
            .add(TargetSpec::new("ssl", TargetKind::SharedLibrary))
            .expect("ssl");
        let net = builder
            .add(
                TargetSpec::new("net", TargetKind::SharedLibrary)
                    .property("LINK_LIBRARIES", "ssl;z")
                    .property("INTERFACE_LINK_LIBRARIES", "z")
                    .policies(policies(PolicyStatus::New)),
            )
            .expect("net");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let interface = resolver
            .link_interface(net, &Configuration::none(), None)
            .expect("interface");
        assert_eq!(interface.library_names(), ["z"]);
        assert_eq!(interface.shared_deps, ["ssl"]);
    }
}
