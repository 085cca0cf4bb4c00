//! Build configuration names.
//!
//! A configuration is either a case-sensitive name such as `Debug` or the
//! absence of one. The derived ordering places "no configuration" first and
//! then sorts names lexically, which is the order every per-configuration
//! cache iterates in.

use serde::{Serialize, Serializer};
use std::fmt;

/// The configuration an evaluation or resolution is performed for.
///
/// # Examples
///
/// ```
/// use tsunagi::graph::Configuration;
///
/// let debug = Configuration::named("Debug");
/// assert_eq!(debug.name(), Some("Debug"));
/// assert!(debug.matches("DEBUG"));
/// assert!(!Configuration::none().matches("Debug"));
/// assert!(Configuration::none() < debug);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Configuration(Option<String>);

impl Configuration {
    /// The "no configuration" value.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A named configuration. An empty name is treated as no configuration.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self(None)
        } else {
            Self(Some(name))
        }
    }

    /// The configuration name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether this is the "no configuration" value.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Case-insensitive comparison used by `$<CONFIG:...>` and the
    /// debug-configuration list.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(candidate))
    }

    /// Suffix appended to per-configuration property names, for example
    /// `_DEBUG` for `LINK_INTERFACE_LIBRARIES_DEBUG`.
    #[must_use]
    pub fn property_suffix(&self) -> Option<String> {
        self.0
            .as_deref()
            .map(|name| format!("_{}", name.to_ascii_uppercase()))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("<none>"),
        }
    }
}

impl From<Option<&str>> for Configuration {
    fn from(value: Option<&str>) -> Self {
        value.map_or_else(Self::none, Self::named)
    }
}

impl From<&str> for Configuration {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Debug", Some("_DEBUG"))]
    #[case("RelWithDebInfo", Some("_RELWITHDEBINFO"))]
    #[case("", None)]
    fn property_suffix_uppercases_name(#[case] name: &str, #[case] expected: Option<&str>) {
        let config = Configuration::named(name);
        assert_eq!(config.property_suffix().as_deref(), expected);
    }

    #[rstest]
    fn ordering_puts_no_configuration_first() {
        let mut configs = vec![
            Configuration::named("Release"),
            Configuration::none(),
            Configuration::named("Debug"),
        ];
        configs.sort();
        assert_eq!(
            configs,
            vec![
                Configuration::none(),
                Configuration::named("Debug"),
                Configuration::named("Release"),
            ]
        );
    }
}
