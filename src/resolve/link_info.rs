//! Link line information for one target and configuration.

use serde::Serialize;

use crate::graph::{Configuration, TargetId, TargetKind};

use super::Resolver;
use super::link_impl::LinkItem;

/// One entry of a link line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    /// The item as written.
    pub name: String,
    /// Full path of the artefact when the item is a target with a known
    /// location.
    pub path: Option<String>,
    /// Kind of the named target, if the item names one.
    pub kind: Option<TargetKind>,
}

impl LinkEntry {
    /// What goes on the link line.
    #[must_use]
    pub fn rendered(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Everything needed to emit the link step of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Target being linked.
    pub target: String,
    /// Its kind.
    pub kind: TargetKind,
    /// Configuration the report was computed for.
    pub config: Configuration,
    /// Link line entries in order, with static groups repeated.
    pub entries: Vec<LinkEntry>,
    /// Languages whose runtimes the link needs.
    pub languages: Vec<String>,
    /// Language driving the link.
    pub linker_language: Option<String>,
    /// Times each cyclic static group appears on the line.
    pub multiplicity: u32,
}

impl LinkReport {
    /// Rendered entries.
    #[must_use]
    pub fn line(&self) -> Vec<&str> {
        self.entries.iter().map(LinkEntry::rendered).collect()
    }
}

impl Resolver<'_> {
    /// Link line information for `target` in `config`.
    #[must_use]
    pub fn link_report(&self, target: TargetId, config: &Configuration) -> LinkReport {
        let implementation = self.link_implementation(target, config);
        let walk = self.implementation_walk(target, config, target);
        let closure = self.link_closure(target, config, None);

        let mut items: Vec<&LinkItem> = Vec::new();
        for item in implementation.libraries.iter().chain(&walk.transitive) {
            if !items.contains(&item) && self.is_linked(item) {
                items.push(item);
            }
        }

        let mut entries: Vec<LinkEntry> = items
            .iter()
            .map(|item| self.link_entry(item, config))
            .collect();
        let repeats = walk.multiplicity.saturating_sub(1);
        for group in &walk.static_groups {
            let names: Vec<&str> = group.iter().map(|id| self.target_name(*id)).collect();
            let Some(last) = entries
                .iter()
                .rposition(|entry| names.contains(&entry.name.as_str()))
            else {
                continue;
            };
            let members: Vec<LinkEntry> = group
                .iter()
                .map(|id| {
                    let item = LinkItem {
                        name: self.target_name(*id).to_owned(),
                        target: Some(*id),
                    };
                    self.link_entry(&item, config)
                })
                .collect();
            let tail = entries.split_off(last + 1);
            for _ in 0..repeats {
                entries.extend(members.iter().cloned());
            }
            entries.extend(tail);
        }

        let declared = self.graph.target(target);
        LinkReport {
            target: declared.name().to_owned(),
            kind: declared.kind(),
            config: config.clone(),
            entries,
            languages: closure.languages.clone(),
            linker_language: closure.linker_language.clone(),
            multiplicity: walk.multiplicity,
        }
    }

    /// Whether an item produces something to put on a link line.
    fn is_linked(&self, item: &LinkItem) -> bool {
        item.target
            .is_none_or(|id| self.graph.target(id).kind().has_link_artifact())
    }

    fn link_entry(&self, item: &LinkItem, config: &Configuration) -> LinkEntry {
        let declared = item.target.map(|id| self.graph.target(id));
        LinkEntry {
            name: item.name.clone(),
            path: declared
                .and_then(|target| target.location(config))
                .map(str::to_owned),
            kind: declared.map(|target| target.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Policies, PolicyStatus, TargetGraph, TargetSpec};

    fn new_policy() -> Policies {
        Policies {
            implicit_link_interface: PolicyStatus::New,
            ..Policies::default()
        }
    }

    #[test]
    fn static_groups_repeat_after_their_last_member() {
        let mut builder = TargetGraph::builder();
        builder
            .add(
                TargetSpec::new("x", TargetKind::StaticLibrary)
                    .property("INTERFACE_LINK_LIBRARIES", "y")
                    .property("LOCATION", "/out/libx.a")
                    .policies(new_policy()),
            )
            .expect("x");
        builder
            .add(
                TargetSpec::new("y", TargetKind::StaticLibrary)
                    .property("INTERFACE_LINK_LIBRARIES", "x")
                    .policies(new_policy()),
            )
            .expect("y");
        let app = builder
            .add(TargetSpec::new("app", TargetKind::Executable).property("LINK_LIBRARIES", "x;m"))
            .expect("app");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let report = resolver.link_report(app, &Configuration::named("Debug"));
        assert_eq!(report.multiplicity, 2);
        assert_eq!(report.line(), ["/out/libx.a", "m", "y", "/out/libx.a", "y"]);
    }

    #[test]
    fn interface_libraries_only_contribute_their_interface() {
        let mut builder = TargetGraph::builder();
        builder
            .add(
                TargetSpec::new("headers", TargetKind::InterfaceLibrary)
                    .property("INTERFACE_LINK_LIBRARIES", "pthread"),
            )
            .expect("headers");
        builder
            .add(
                TargetSpec::new("ssl", TargetKind::SharedLibrary)
                    .imported(true)
                    .global(true)
                    .property("IMPORTED_LOCATION_RELEASE", "/usr/lib/libssl.so")
                    .policies(new_policy()),
            )
            .expect("ssl");
        let app = builder
            .add(
                TargetSpec::new("app", TargetKind::Executable)
                    .languages(["CXX"])
                    .property("LINK_LIBRARIES", "headers;ssl"),
            )
            .expect("app");
        let graph = builder.build();
        let resolver = Resolver::new(&graph);
        let report = resolver.link_report(app, &Configuration::named("Release"));
        assert_eq!(report.line(), ["/usr/lib/libssl.so", "pthread"]);
        assert_eq!(report.linker_language.as_deref(), Some("CXX"));
        assert_eq!(report.multiplicity, 0);
    }
}
