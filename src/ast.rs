//! Tsunagi manifest Abstract Syntax Tree structures.
//!
//! A `Tsunagifile` describes the targets of a project together with the
//! graph-wide settings the resolver needs: configurations, policies, linker
//! preferences and free-form variables. The manifest is parsed from YAML into
//! a JSON value first and then deserialised into these types.
//!
//! ```rust
//! use tsunagi::ast::{ProjectManifest, StringOrList};
//!
//! let yaml = "tsunagi_version: \"1.0.0\"\ntargets:\n  - name: app\n    type: executable\n    link_libraries: core\n";
//! let doc: serde_json::Value = serde_saphyr::from_str(yaml).expect("yaml");
//! let manifest: ProjectManifest = serde_json::from_value(doc).expect("manifest");
//! assert_eq!(manifest.targets[0].link_libraries, StringOrList::String("core".into()));
//! ```

use crate::graph::{BoolCombination, PolicyStatus, TargetKind};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level manifest structure parsed from a `Tsunagifile`.
///
/// ```yaml
/// tsunagi_version: "1.0.0"
/// configurations: [Debug, Release]
/// targets:
///   - name: core
///     type: static_library
///     languages: [CXX]
/// ```
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Semantic version of the manifest format.
    pub tsunagi_version: Version,

    /// Configurations resolved when none are requested on the command line.
    #[serde(default)]
    pub configurations: Vec<String>,

    /// Configurations for which `debug` link items apply. Defaults to
    /// `[Debug]` when omitted.
    #[serde(default)]
    pub debug_configurations: Option<Vec<String>>,

    /// Properties whose provenance is reported while resolving.
    #[serde(default)]
    pub debug_properties: Vec<String>,

    /// Project-wide policy values.
    #[serde(default)]
    pub policies: PolicySettings,

    /// Linker preference overrides per language.
    #[serde(default)]
    pub linker_preferences: BTreeMap<String, u32>,

    /// Variables such as `PLATFORM_ID`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Declared targets.
    pub targets: Vec<TargetDecl>,
}

/// Policy overrides. Unset fields inherit the enclosing value.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySettings {
    /// Handling of link items that do not apply to the configuration.
    pub stray_config_libraries: Option<PolicyStatus>,
    /// Whether `INTERFACE_LINK_LIBRARIES` is authoritative.
    pub implicit_link_interface: Option<PolicyStatus>,
    /// Combination rule for boolean compatible interface properties.
    pub bool_compatibility: Option<BoolCombination>,
}

/// A single target declaration.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Target name.
    pub name: String,

    /// Artefact kind.
    #[serde(rename = "type")]
    pub kind: TargetKind,

    /// Whether the target comes from outside the project.
    #[serde(default)]
    pub imported: bool,

    /// Whether an imported target is visible from every directory.
    #[serde(default)]
    pub global: bool,

    /// Directory scope, `.` by default.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Languages of the target's sources.
    #[serde(default)]
    pub languages: Vec<String>,

    /// Shorthand for the `LINK_LIBRARIES` property.
    #[serde(default)]
    pub link_libraries: StringOrList,

    /// Shorthand for the `INTERFACE_LINK_LIBRARIES` property. An explicit
    /// empty list sets the property to an empty value.
    #[serde(default)]
    pub interface_link_libraries: Option<StringOrList>,

    /// Raw target properties. Values may contain generator expressions.
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,

    /// Per-target policy overrides.
    #[serde(default)]
    pub policies: PolicySettings,
}

fn default_directory() -> String {
    ".".to_owned()
}

/// A property value as written in YAML.
///
/// Booleans become `ON`/`OFF`, numbers keep their decimal form and lists are
/// joined with `;`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// `true` or `false`.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A scalar string.
    String(String),
    /// A list of strings.
    List(Vec<String>),
}

impl PropertyValue {
    /// The value as stored in the target's property table.
    #[must_use]
    pub fn to_property_string(&self) -> String {
        match self {
            Self::Bool(true) => "ON".to_owned(),
            Self::Bool(false) => "OFF".to_owned(),
            Self::Integer(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::List(items) => items.join(";"),
        }
    }
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// ```yaml
/// # Scalar
/// link_libraries: core
/// # Sequence
/// link_libraries:
///   - core
///   - util
/// ```
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Join the items into a `;`-separated list.
    #[must_use]
    pub fn to_list_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::String(value) => value.clone(),
            Self::List(items) => items.join(";"),
        }
    }

    /// Whether no item was provided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::String(value) => value.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }
}
