//! Backward-compatibility switches.
//!
//! Policies are looked up by an external collaborator and handed to the
//! resolver as already-resolved values. The resolver only branches on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved status of a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    /// Keep the historical behaviour silently.
    Old,
    /// Keep the historical behaviour but warn when it matters.
    #[default]
    Warn,
    /// Use the current behaviour.
    New,
}

impl PolicyStatus {
    /// Whether the historical behaviour applies (`Old` or `Warn`).
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Old | Self::Warn)
    }
}

/// How boolean compatible interface properties are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolCombination {
    /// Every contributor must agree.
    #[default]
    Agree,
    /// The effective value is the conjunction of all contributors.
    And,
    /// The effective value is the disjunction of all contributors.
    Or,
}

/// Named policies understood by `$<TARGET_POLICY:...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyId {
    /// Libraries declared for other configurations are dropped instead of
    /// being kept as a warning source.
    StrayConfigLibraries,
    /// `INTERFACE_LINK_LIBRARIES` is authoritative; the link implementation is
    /// never used as the link interface.
    ImplicitLinkInterface,
}

impl PolicyId {
    /// Every known policy.
    pub const ALL: [Self; 2] = [Self::StrayConfigLibraries, Self::ImplicitLinkInterface];

    /// Look a policy up by its manifest name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// The manifest name of the policy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StrayConfigLibraries => "stray_config_libraries",
            Self::ImplicitLinkInterface => "implicit_link_interface",
        }
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The policy values in effect for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Policies {
    /// Handling of link libraries declared for other configurations.
    pub stray_config_libraries: PolicyStatus,
    /// Whether the link implementation doubles as the link interface.
    pub implicit_link_interface: PolicyStatus,
    /// Combination rule for boolean compatible interface properties.
    pub bool_compatibility: BoolCombination,
}

impl Policies {
    /// Status of a named policy.
    #[must_use]
    pub const fn status(&self, id: PolicyId) -> PolicyStatus {
        match id {
            PolicyId::StrayConfigLibraries => self.stray_config_libraries,
            PolicyId::ImplicitLinkInterface => self.implicit_link_interface,
        }
    }
}
