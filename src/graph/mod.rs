//! Arena-owned target graph.
//!
//! Targets are registered once through a [`GraphBuilder`] and addressed by
//! [`TargetId`] handles afterwards. Identity is the handle, not the name: two
//! imported targets declared in different directory scopes may share a name
//! and still be distinct nodes.
//!
//! # Examples
//!
//! ```
//! use tsunagi::graph::{TargetGraph, TargetKind, TargetSpec};
//!
//! let mut builder = TargetGraph::builder();
//! let core = builder.add(TargetSpec::new("core", TargetKind::StaticLibrary))?;
//! let app = builder.add(
//!     TargetSpec::new("app", TargetKind::Executable).property("LINK_LIBRARIES", "core"),
//! )?;
//! let graph = builder.build();
//! assert_eq!(graph.find("core", Some(app)), Some(core));
//! # Ok::<(), tsunagi::graph::GraphError>(())
//! ```

mod config;
mod from_manifest;
mod policy;

pub use config::Configuration;
pub use policy::{BoolCombination, Policies, PolicyId, PolicyStatus};

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Stable handle of a target inside its [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TargetId(usize);

impl TargetId {
    /// Position of the target in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of artefact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A linked program.
    Executable,
    /// An archive of object files.
    StaticLibrary,
    /// A shared object linked at load time.
    SharedLibrary,
    /// A loadable module that is never linked against.
    ModuleLibrary,
    /// A collection of object files compiled into their consumers.
    ObjectLibrary,
    /// A target carrying usage requirements only.
    InterfaceLibrary,
    /// A target that produces no linkable artefact.
    Utility,
}

impl TargetKind {
    /// Upper-case name used in diagnostics and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executable => "EXECUTABLE",
            Self::StaticLibrary => "STATIC_LIBRARY",
            Self::SharedLibrary => "SHARED_LIBRARY",
            Self::ModuleLibrary => "MODULE_LIBRARY",
            Self::ObjectLibrary => "OBJECT_LIBRARY",
            Self::InterfaceLibrary => "INTERFACE_LIBRARY",
            Self::Utility => "UTILITY",
        }
    }

    /// Whether other targets can link against this kind at all.
    #[must_use]
    pub const fn is_linkable(self) -> bool {
        !matches!(self, Self::ObjectLibrary | Self::Utility)
    }

    /// Whether the target's objects end up in its consumers' link, bringing
    /// their languages along.
    #[must_use]
    pub const fn propagates_link_language(self) -> bool {
        matches!(self, Self::StaticLibrary | Self::ObjectLibrary)
    }

    /// Whether the target produces a file that appears on a link line.
    #[must_use]
    pub const fn has_link_artifact(self) -> bool {
        matches!(
            self,
            Self::StaticLibrary | Self::SharedLibrary | Self::Executable
        )
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered build target and its raw property store.
#[derive(Debug, Clone)]
pub struct Target {
    name: String,
    kind: TargetKind,
    imported: bool,
    directory: String,
    languages: Vec<String>,
    properties: IndexMap<String, String>,
    policies: Policies,
}

impl Target {
    /// Target name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target kind.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Whether the target was imported from outside the project.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        self.imported
    }

    /// Directory scope the target was declared in.
    #[must_use]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Languages of the target's classified sources.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Raw (unevaluated) value of a property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Raw property names and values in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Policy values in effect for this target.
    #[must_use]
    pub const fn policies(&self) -> &Policies {
        &self.policies
    }

    /// Whether an executable exports symbols for modules to link against.
    #[must_use]
    pub fn is_executable_with_exports(&self) -> bool {
        self.kind == TargetKind::Executable
            && self
                .property("ENABLE_EXPORTS")
                .is_some_and(crate::genex::is_on)
    }

    /// On-disk location supplied by the path-computation collaborator.
    ///
    /// Imported targets consult `IMPORTED_LOCATION_<CONFIG>` and then
    /// `IMPORTED_LOCATION`; project targets consult `LOCATION_<CONFIG>` and
    /// then `LOCATION`.
    #[must_use]
    pub fn location(&self, config: &Configuration) -> Option<&str> {
        let base = if self.imported {
            "IMPORTED_LOCATION"
        } else {
            "LOCATION"
        };
        config
            .property_suffix()
            .and_then(|suffix| self.property(&format!("{base}{suffix}")))
            .or_else(|| self.property(base))
            .filter(|location| !location.is_empty())
    }
}

/// Graph-wide settings supplied alongside the targets.
#[derive(Debug, Clone)]
pub struct GraphSettings {
    /// Configurations the project is generated for.
    pub configurations: Vec<Configuration>,
    /// Configurations for which `debug` link items apply.
    pub debug_configurations: Vec<String>,
    /// Properties whose provenance is reported when evaluated.
    pub debug_properties: BTreeSet<String>,
    /// Linker preference per language; the highest wins.
    pub linker_preferences: BTreeMap<String, u32>,
    /// Free-form variables such as `PLATFORM_ID`.
    pub variables: BTreeMap<String, String>,
    /// Policies applied to targets that do not override them.
    pub policies: Policies,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            configurations: Vec::new(),
            debug_configurations: vec!["Debug".to_owned()],
            debug_properties: BTreeSet::new(),
            linker_preferences: [("C", 10), ("CXX", 30), ("Fortran", 20)]
                .into_iter()
                .map(|(lang, pref)| (lang.to_owned(), pref))
                .collect(),
            variables: BTreeMap::new(),
            policies: Policies::default(),
        }
    }
}

impl GraphSettings {
    /// Preference of `language` when choosing a linker; unknown languages
    /// rank lowest.
    #[must_use]
    pub fn linker_preference(&self, language: &str) -> u32 {
        self.linker_preferences.get(language).copied().unwrap_or(0)
    }

    /// Whether `config` is one of the debug configurations.
    #[must_use]
    pub fn is_debug_configuration(&self, config: &Configuration) -> bool {
        self.debug_configurations
            .iter()
            .any(|name| config.matches(name))
    }
}

/// Errors raised while registering targets.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A global target name was registered twice.
    #[error("target \"{name}\" is already defined")]
    #[diagnostic(code(tsunagi::graph::duplicate_target))]
    DuplicateTarget {
        /// The repeated name.
        name: String,
    },
    /// An imported target name was registered twice in one directory scope.
    #[error("imported target \"{name}\" is already defined in directory \"{directory}\"")]
    #[diagnostic(code(tsunagi::graph::duplicate_imported_target))]
    DuplicateImportedTarget {
        /// The repeated name.
        name: String,
        /// The directory scope.
        directory: String,
    },
    /// A target was declared without a name.
    #[error("target names must not be empty")]
    #[diagnostic(code(tsunagi::graph::empty_name))]
    EmptyName,
    /// A configuration was requested that the project does not declare.
    #[error("configuration \"{name}\" is not declared by the project")]
    #[diagnostic(
        code(tsunagi::graph::unknown_configuration),
        help("declared configurations: {declared}")
    )]
    UnknownConfiguration {
        /// The requested name.
        name: String,
        /// Declared names, comma separated.
        declared: String,
    },
    /// A target was requested by name that the graph does not contain.
    #[error("no target named \"{name}\"")]
    #[diagnostic(code(tsunagi::graph::unknown_target))]
    UnknownTarget {
        /// The requested name.
        name: String,
    },
}

/// The finalised target graph.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    targets: Vec<Target>,
    global: HashMap<String, TargetId>,
    scoped: HashMap<String, HashMap<String, TargetId>>,
    settings: GraphSettings,
}

impl TargetGraph {
    /// Start registering targets.
    #[must_use]
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Access a target by handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` was minted by a different graph.
    #[must_use]
    #[expect(
        clippy::indexing_slicing,
        reason = "TargetId values are only minted by the owning graph"
    )]
    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }

    /// Access a target by handle, returning `None` for foreign handles.
    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    /// Every target handle in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TargetId> + use<> {
        (0..self.targets.len()).map(TargetId)
    }

    /// Number of registered targets.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target was registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Graph-wide settings.
    #[must_use]
    pub const fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Resolve `name` as seen from the scope of `from`.
    ///
    /// Imported targets local to the requesting target's directory shadow
    /// global targets of the same name.
    #[must_use]
    pub fn find(&self, name: &str, from: Option<TargetId>) -> Option<TargetId> {
        from.and_then(|id| self.get(id))
            .and_then(|target| self.scoped.get(target.directory()))
            .and_then(|names| names.get(name))
            .or_else(|| self.global.get(name))
            .copied()
    }

    /// Resolve a name from the top-level directory scope.
    #[must_use]
    pub fn find_global(&self, name: &str) -> Option<TargetId> {
        self.scoped
            .get(".")
            .and_then(|names| names.get(name))
            .or_else(|| self.global.get(name))
            .copied()
    }

    /// Resolve a name from the top-level scope or fail.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] when nothing is registered under
    /// `name`.
    pub fn require(&self, name: &str) -> Result<TargetId, GraphError> {
        self.find_global(name).ok_or_else(|| GraphError::UnknownTarget {
            name: name.to_owned(),
        })
    }

    /// Match `name` against the declared configurations, ignoring case.
    ///
    /// A project that declares no configurations accepts any name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownConfiguration`] when configurations are
    /// declared and none matches.
    pub fn configuration(&self, name: &str) -> Result<Configuration, GraphError> {
        let declared = &self.settings.configurations;
        if declared.is_empty() {
            return Ok(Configuration::named(name));
        }
        declared
            .iter()
            .find(|config| config.matches(name))
            .cloned()
            .ok_or_else(|| GraphError::UnknownConfiguration {
                name: name.to_owned(),
                declared: declared
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Configurations resolved when none are requested: the declared ones,
    /// or the empty configuration.
    #[must_use]
    pub fn default_configurations(&self) -> Vec<Configuration> {
        if self.settings.configurations.is_empty() {
            vec![Configuration::none()]
        } else {
            self.settings.configurations.clone()
        }
    }
}

/// Description of a target to register.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    name: String,
    kind: TargetKind,
    imported: bool,
    global: bool,
    directory: String,
    languages: Vec<String>,
    properties: IndexMap<String, String>,
    policies: Option<Policies>,
}

impl TargetSpec {
    /// A project target of `kind` in the top-level directory.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            imported: false,
            global: false,
            directory: ".".to_owned(),
            languages: Vec::new(),
            properties: IndexMap::new(),
            policies: None,
        }
    }

    /// Mark the target as imported.
    #[must_use]
    pub const fn imported(mut self, imported: bool) -> Self {
        self.imported = imported;
        self
    }

    /// Make an imported target visible from every directory.
    #[must_use]
    pub const fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Directory scope the target is declared in.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Languages of the target's sources.
    #[must_use]
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Set a raw property value.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Override the graph-wide policies for this target.
    #[must_use]
    pub const fn policies(mut self, policies: Policies) -> Self {
        self.policies = Some(policies);
        self
    }
}

/// Registers targets and produces a [`TargetGraph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    targets: Vec<(Target, bool)>,
    global: HashMap<String, TargetId>,
    scoped: HashMap<String, HashMap<String, TargetId>>,
    settings: GraphSettings,
}

impl GraphBuilder {
    /// Mutable access to the graph-wide settings.
    pub const fn settings_mut(&mut self) -> &mut GraphSettings {
        &mut self.settings
    }

    /// Register a target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the name is empty or already taken in the
    /// scope the target is visible from.
    pub fn add(&mut self, spec: TargetSpec) -> Result<TargetId, GraphError> {
        if spec.name.is_empty() {
            return Err(GraphError::EmptyName);
        }
        let id = TargetId(self.targets.len());
        if spec.imported && !spec.global {
            let names = self.scoped.entry(spec.directory.clone()).or_default();
            if names.contains_key(&spec.name) {
                return Err(GraphError::DuplicateImportedTarget {
                    name: spec.name,
                    directory: spec.directory,
                });
            }
            names.insert(spec.name.clone(), id);
        } else {
            if self.global.contains_key(&spec.name) {
                return Err(GraphError::DuplicateTarget { name: spec.name });
            }
            self.global.insert(spec.name.clone(), id);
        }
        let inherits_policies = spec.policies.is_none();
        let target = Target {
            name: spec.name,
            kind: spec.kind,
            imported: spec.imported,
            directory: spec.directory,
            languages: spec.languages,
            properties: spec.properties,
            policies: spec.policies.unwrap_or_default(),
        };
        tracing::debug!(name = %target.name, kind = %target.kind, %id, "registered target");
        self.targets.push((target, inherits_policies));
        Ok(id)
    }

    /// Finalise the graph. Targets without explicit policies inherit the
    /// graph-wide ones.
    #[must_use]
    pub fn build(self) -> TargetGraph {
        let defaults = self.settings.policies;
        let targets = self
            .targets
            .into_iter()
            .map(|(mut target, inherits)| {
                if inherits {
                    target.policies = defaults;
                }
                target
            })
            .collect();
        TargetGraph {
            targets,
            global: self.global,
            scoped: self.scoped,
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TargetKind::StaticLibrary, true)]
    #[case(TargetKind::ObjectLibrary, true)]
    #[case(TargetKind::SharedLibrary, false)]
    #[case(TargetKind::Executable, false)]
    fn object_carrying_kinds_propagate_link_language(
        #[case] kind: TargetKind,
        #[case] expected: bool,
    ) {
        assert_eq!(kind.propagates_link_language(), expected);
    }

    #[rstest]
    #[case(&[], "Anything", Ok("Anything"))]
    #[case(&["Debug", "Release"], "release", Ok("Release"))]
    #[case(&["Debug"], "Release", Err(()))]
    fn configurations_are_matched_against_declared_names(
        #[case] declared: &[&str],
        #[case] requested: &str,
        #[case] expected: Result<&str, ()>,
    ) {
        let mut builder = TargetGraph::builder();
        builder.settings_mut().configurations =
            declared.iter().copied().map(Configuration::named).collect();
        let graph = builder.build();
        let found = graph.configuration(requested);
        match expected {
            Ok(name) => assert_eq!(found.ok().as_ref().and_then(Configuration::name), Some(name)),
            Err(()) => assert!(matches!(
                found,
                Err(GraphError::UnknownConfiguration { declared, .. }) if declared == "Debug"
            )),
        }
    }

    #[rstest]
    fn default_configurations_fall_back_to_none() {
        let graph = TargetGraph::builder().build();
        assert_eq!(graph.default_configurations(), [Configuration::none()]);
        assert!(matches!(
            graph.require("ghost"),
            Err(GraphError::UnknownTarget { name }) if name == "ghost"
        ));
    }

    #[rstest]
    fn imported_targets_are_scoped_by_directory() {
        let mut builder = TargetGraph::builder();
        let zlib_a = builder
            .add(
                TargetSpec::new("zlib", TargetKind::SharedLibrary)
                    .imported(true)
                    .directory("a"),
            )
            .expect("add a/zlib");
        let zlib_b = builder
            .add(
                TargetSpec::new("zlib", TargetKind::SharedLibrary)
                    .imported(true)
                    .directory("b"),
            )
            .expect("add b/zlib");
        let user_a = builder
            .add(TargetSpec::new("user_a", TargetKind::Executable).directory("a"))
            .expect("add user_a");
        let user_b = builder
            .add(TargetSpec::new("user_b", TargetKind::Executable).directory("b"))
            .expect("add user_b");
        let graph = builder.build();

        assert_ne!(zlib_a, zlib_b);
        assert_eq!(graph.find("zlib", Some(user_a)), Some(zlib_a));
        assert_eq!(graph.find("zlib", Some(user_b)), Some(zlib_b));
        assert_eq!(graph.find_global("zlib"), None);
    }

    #[rstest]
    fn duplicate_global_names_are_rejected() {
        let mut builder = TargetGraph::builder();
        builder
            .add(TargetSpec::new("core", TargetKind::StaticLibrary))
            .expect("first add");
        let err = builder
            .add(TargetSpec::new("core", TargetKind::SharedLibrary))
            .expect_err("duplicate should fail");
        assert!(matches!(err, GraphError::DuplicateTarget { name } if name == "core"));
    }

    #[rstest]
    #[case(false, "LOCATION_DEBUG", Some("/d/libcore.a"))]
    #[case(true, "IMPORTED_LOCATION_DEBUG", Some("/d/libcore.a"))]
    #[case(false, "IMPORTED_LOCATION_DEBUG", None)]
    fn location_prefers_per_configuration_property(
        #[case] imported: bool,
        #[case] property: &str,
        #[case] expected: Option<&str>,
    ) {
        let mut builder = TargetGraph::builder();
        let id = builder
            .add(
                TargetSpec::new("core", TargetKind::StaticLibrary)
                    .imported(imported)
                    .global(true)
                    .property(property, "/d/libcore.a"),
            )
            .expect("add core");
        let graph = builder.build();
        assert_eq!(
            graph.target(id).location(&Configuration::named("Debug")),
            expected
        );
    }

    #[rstest]
    fn targets_inherit_graph_policies() {
        let mut builder = TargetGraph::builder();
        builder.settings_mut().policies.implicit_link_interface = PolicyStatus::New;
        let plain = builder
            .add(TargetSpec::new("plain", TargetKind::StaticLibrary))
            .expect("add plain");
        let custom = builder
            .add(TargetSpec::new("custom", TargetKind::StaticLibrary).policies(Policies::default()))
            .expect("add custom");
        let graph = builder.build();
        assert_eq!(
            graph.target(plain).policies().implicit_link_interface,
            PolicyStatus::New
        );
        assert_eq!(
            graph.target(custom).policies().implicit_link_interface,
            PolicyStatus::Warn
        );
    }
}
