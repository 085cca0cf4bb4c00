//! Compatible interface properties.
//!
//! A dependency can list properties under `COMPATIBLE_INTERFACE_BOOL`,
//! `COMPATIBLE_INTERFACE_STRING`, `COMPATIBLE_INTERFACE_NUMBER_MIN` or
//! `COMPATIBLE_INTERFACE_NUMBER_MAX`. Every consumer linking it must then
//! agree with the `INTERFACE_<P>` values its dependencies publish, and an
//! unset `P` on the consumer takes the combined value.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::{Provenance, Report, Severity};
use crate::genex::{is_on, list_items};
use crate::graph::{BoolCombination, Configuration, TargetId};

use super::cache::{Pending, PropertyKey};
use super::{Lookup, Resolver};

/// Property that is bool-compatible without being listed.
const POSITION_INDEPENDENT_CODE: &str = "POSITION_INDEPENDENT_CODE";

/// How the values of a compatible property are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibleKind {
    /// Truth values that must agree.
    Bool,
    /// Strings that must be identical.
    String,
    /// Numbers combined to their minimum.
    NumberMin,
    /// Numbers combined to their maximum.
    NumberMax,
}

impl CompatibleKind {
    const ALL: [Self; 4] = [Self::Bool, Self::String, Self::NumberMin, Self::NumberMax];

    /// Property a dependency lists compatible names in.
    #[must_use]
    pub const fn list_property(self) -> &'static str {
        match self {
            Self::Bool => "COMPATIBLE_INTERFACE_BOOL",
            Self::String => "COMPATIBLE_INTERFACE_STRING",
            Self::NumberMin => "COMPATIBLE_INTERFACE_NUMBER_MIN",
            Self::NumberMax => "COMPATIBLE_INTERFACE_NUMBER_MAX",
        }
    }
}

impl fmt::Display for CompatibleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::NumberMin => "number_min",
            Self::NumberMax => "number_max",
        })
    }
}

/// A compatible property that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CompatibilityError {
    /// A dependency publishes a value the consumer cannot accept.
    #[error(
        "property {property} of \"{contributor}\" is \"{found}\" which is incompatible with \
         \"{expected}\" required by \"{consumer}\" ({config})"
    )]
    #[diagnostic(
        code(tsunagi::compat::incompatible_interface_property),
        help("make every dependency publish the same INTERFACE_{property} value")
    )]
    IncompatibleInterfaceProperty {
        /// The compatible property.
        property: String,
        /// The linking target.
        consumer: String,
        /// The dependency publishing the offending value.
        contributor: String,
        /// Configuration the check ran for.
        config: Configuration,
        /// Value the consumer requires.
        expected: String,
        /// Value the contributor publishes.
        found: String,
    },

    /// A property is listed under more than one compatibility kind.
    #[error("property {property} used by \"{consumer}\" is listed as compatible {kinds}")]
    #[diagnostic(code(tsunagi::compat::conflicting_kinds))]
    ConflictingKinds {
        /// The compatible property.
        property: String,
        /// The linking target.
        consumer: String,
        /// Every kind the property is listed under.
        kinds: String,
    },
}

/// One dependency's published value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    /// The dependency.
    pub target: String,
    /// Its evaluated `INTERFACE_<P>`.
    pub value: String,
}

/// Combined value of a compatible property for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibleValue {
    /// The property name.
    pub property: String,
    /// How values are combined.
    pub kind: CompatibleKind,
    /// The effective value, unset when nothing contributes.
    pub value: Option<String>,
    /// Target the effective value comes from.
    pub origin: Option<String>,
    /// Dependencies publishing a value, in walk order.
    pub contributions: Vec<Contribution>,
    /// First violation found.
    pub conflict: Option<CompatibilityError>,
}

/// Running state of one combination.
struct Combiner<'a> {
    consumer: &'a str,
    property: &'a str,
    config: &'a Configuration,
    value: Option<String>,
    origin: Option<String>,
    conflict: Option<CompatibilityError>,
}

impl Combiner<'_> {
    fn violate(&mut self, contributor: &str, expected: &str, found: &str) {
        if self.conflict.is_none() {
            self.conflict = Some(CompatibilityError::IncompatibleInterfaceProperty {
                property: self.property.to_owned(),
                consumer: self.consumer.to_owned(),
                contributor: contributor.to_owned(),
                config: self.config.clone(),
                expected: expected.to_owned(),
                found: found.to_owned(),
            });
        }
    }

    fn bool_agree(&mut self, reference: Option<&str>, contributions: &[Contribution]) {
        let Some((expected, origin)) = reference_or_first(self.consumer, reference, contributions)
        else {
            return;
        };
        let wanted = is_on(expected);
        for contribution in contributions {
            if is_on(&contribution.value) != wanted {
                self.violate(&contribution.target, expected, &contribution.value);
            }
        }
        self.value = Some(on_off(wanted));
        self.origin = Some(origin.to_owned());
    }

    fn bool_combine(
        &mut self,
        reference: Option<&str>,
        contributions: &[Contribution],
        all: bool,
    ) {
        let mut values = reference
            .map(|value| (self.consumer, value))
            .into_iter()
            .chain(
                contributions
                    .iter()
                    .map(|c| (c.target.as_str(), c.value.as_str())),
            );
        let Some((first_origin, first)) = values.next() else {
            return;
        };
        let (mut origin, mut result) = (first_origin, is_on(first));
        for (target, value) in values {
            let on = is_on(value);
            // The first contributor that changes the result becomes the origin.
            let combined = if all { result && on } else { result || on };
            if combined != result {
                origin = target;
            }
            result = combined;
        }
        self.value = Some(on_off(result));
        self.origin = Some(origin.to_owned());
    }

    fn string(&mut self, reference: Option<&str>, contributions: &[Contribution]) {
        let Some((expected, origin)) = reference_or_first(self.consumer, reference, contributions)
        else {
            return;
        };
        for contribution in contributions {
            if contribution.value != expected {
                self.violate(&contribution.target, expected, &contribution.value);
            }
        }
        self.value = Some(expected.to_owned());
        self.origin = Some(origin.to_owned());
    }

    fn number(&mut self, reference: Option<&str>, contributions: &[Contribution], max: bool) {
        let parse = |value: &str| value.trim().parse::<i64>().ok();
        let mut best: Option<(i64, &str, &str)> = None;
        if let Some(value) = reference {
            let Some(number) = parse(value) else {
                self.violate(self.consumer, "a number", value);
                return;
            };
            best = Some((number, value, self.consumer));
        }
        let declared = best.map(|(number, value, _)| (number, value));
        for contribution in contributions {
            let Some(number) = parse(&contribution.value) else {
                self.violate(&contribution.target, "a number", &contribution.value);
                continue;
            };
            if let Some((limit, limit_text)) = declared {
                let exceeds = if max { number > limit } else { number < limit };
                if exceeds {
                    self.violate(&contribution.target, limit_text, &contribution.value);
                }
            }
            let better = best.is_none_or(|(current, _, _)| {
                if max { number > current } else { number < current }
            });
            if better {
                best = Some((number, &contribution.value, &contribution.target));
            }
        }
        if let Some((_, value, origin)) = best {
            self.value = Some(value.trim().to_owned());
            self.origin = Some(origin.to_owned());
        }
    }
}

/// Value every contributor is compared against, with the target it comes
/// from.
fn reference_or_first<'s>(
    consumer: &'s str,
    reference: Option<&'s str>,
    contributions: &'s [Contribution],
) -> Option<(&'s str, &'s str)> {
    reference.map(|value| (value, consumer)).or_else(|| {
        contributions
            .first()
            .map(|first| (first.value.as_str(), first.target.as_str()))
    })
}

fn on_off(on: bool) -> String {
    if on { "ON" } else { "OFF" }.to_owned()
}

impl Resolver<'_> {
    /// Combined value of `property` for the consumer `target`.
    ///
    /// Returns `None` when no dependency lists `property` as compatible.
    #[must_use]
    pub fn compatible_value(
        &self,
        target: TargetId,
        config: &Configuration,
        property: &str,
    ) -> Option<Rc<CompatibleValue>> {
        let key = PropertyKey {
            target,
            config: config.clone(),
            property: property.to_owned(),
        };
        self.cache
            .memoize(
                &self.cache.compatibility,
                &key,
                Pending::Compatibility(key.clone()),
                || {
                    let value = self.compute_compatible(target, config, property)?;
                    self.report_compatible(target, config, &value);
                    Some(Rc::new(value))
                },
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                None
            })
    }

    /// Check every compatible property of `target`, collecting each violation.
    #[must_use]
    pub fn check_property_compatibility(
        &self,
        target: TargetId,
        config: &Configuration,
    ) -> Vec<CompatibilityError> {
        self.compatible_kinds(target, config)
            .keys()
            .filter_map(|property| self.compatible_value(target, config, property))
            .filter_map(|value| value.conflict.clone())
            .collect()
    }

    /// Every compatible property reachable from `target` with the kinds it
    /// is listed under.
    fn compatible_kinds(
        &self,
        target: TargetId,
        config: &Configuration,
    ) -> BTreeMap<String, BTreeSet<CompatibleKind>> {
        let mut kinds: BTreeMap<String, BTreeSet<CompatibleKind>> = BTreeMap::new();
        kinds
            .entry(POSITION_INDEPENDENT_CODE.to_owned())
            .or_default()
            .insert(CompatibleKind::Bool);
        let walk = self.implementation_walk(target, config, target);
        for dep in &walk.visited {
            let declared = self.graph.target(*dep);
            for kind in CompatibleKind::ALL {
                let Some(listed) = declared.property(kind.list_property()) else {
                    continue;
                };
                for property in list_items(listed) {
                    kinds.entry(property.to_owned()).or_default().insert(kind);
                }
            }
        }
        kinds
    }

    fn compute_compatible(
        &self,
        target: TargetId,
        config: &Configuration,
        property: &str,
    ) -> Option<CompatibleValue> {
        let kinds = self.compatible_kinds(target, config).remove(property)?;
        let consumer = self.target_name(target);
        let mut chosen = kinds.iter().copied();
        let kind = chosen.next()?;
        if chosen.next().is_some() {
            let listed: Vec<String> = kinds.iter().map(ToString::to_string).collect();
            return Some(CompatibleValue {
                property: property.to_owned(),
                kind,
                value: None,
                origin: None,
                contributions: Vec::new(),
                conflict: Some(CompatibilityError::ConflictingKinds {
                    property: property.to_owned(),
                    consumer: consumer.to_owned(),
                    kinds: listed.join(" and "),
                }),
            });
        }

        let interface_property = format!("INTERFACE_{property}");
        let reference = self
            .evaluate_property(target, property, config, target, Lookup::Raw)
            .or_else(|| {
                self.evaluate_property(target, &interface_property, config, target, Lookup::Raw)
            });
        let walk = self.implementation_walk(target, config, target);
        let contributions: Vec<Contribution> = walk
            .visited
            .iter()
            .filter(|dep| self.graph.target(**dep).property(&interface_property).is_some())
            .filter_map(|dep| {
                self.evaluate_property(*dep, &interface_property, config, target, Lookup::Raw)
                    .map(|value| Contribution {
                        target: self.target_name(*dep).to_owned(),
                        value,
                    })
            })
            .collect();

        let mut combiner = Combiner {
            consumer,
            property,
            config,
            value: None,
            origin: None,
            conflict: None,
        };
        let reference = reference.as_deref();
        match kind {
            CompatibleKind::Bool => match self.graph.target(target).policies().bool_compatibility
            {
                BoolCombination::Agree => combiner.bool_agree(reference, &contributions),
                BoolCombination::And => combiner.bool_combine(reference, &contributions, true),
                BoolCombination::Or => combiner.bool_combine(reference, &contributions, false),
            },
            CompatibleKind::String => combiner.string(reference, &contributions),
            CompatibleKind::NumberMin => combiner.number(reference, &contributions, false),
            CompatibleKind::NumberMax => combiner.number(reference, &contributions, true),
        }
        Some(CompatibleValue {
            property: property.to_owned(),
            kind,
            value: combiner.value,
            origin: combiner.origin,
            contributions,
            conflict: combiner.conflict,
        })
    }

    fn report_compatible(&self, target: TargetId, config: &Configuration, value: &CompatibleValue) {
        let provenance =
            Provenance::for_target(self.target_name(target), &value.property, config.clone());
        if let Some(conflict) = &value.conflict {
            self.report(Report::from_diagnostic(
                Severity::Error,
                conflict,
                provenance.clone(),
            ));
        }
        if !self.graph.settings().debug_properties.contains(&value.property) {
            return;
        }
        let mut message = format!(
            "compatible {} property {} of \"{}\"",
            value.kind,
            value.property,
            self.target_name(target)
        );
        for contribution in &value.contributions {
            message.push_str(&format!(
                "\n  \"{}\" publishes \"{}\"",
                contribution.target, contribution.value
            ));
        }
        match (&value.value, &value.origin) {
            (Some(effective), Some(origin)) => {
                message.push_str(&format!("\n  effective \"{effective}\" from \"{origin}\""));
            }
            _ => message.push_str("\n  no effective value"),
        }
        self.report(Report::new(Severity::Debug, message, provenance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Policies, PolicyStatus, TargetGraph, TargetKind, TargetSpec};
    use rstest::rstest;

    fn new_policy(bool_compatibility: BoolCombination) -> Policies {
        Policies {
            implicit_link_interface: PolicyStatus::New,
            bool_compatibility,
            ..Policies::default()
        }
    }

    fn dep(name: &str, interface: &[(&str, &str)]) -> TargetSpec {
        interface.iter().fold(
            TargetSpec::new(name, TargetKind::StaticLibrary)
                .languages(["C"])
                .policies(new_policy(BoolCombination::Agree)),
            |spec, (key, value)| spec.property(*key, *value),
        )
    }

    fn consumer_graph(
        consumer: &[(&str, &str)],
        deps: Vec<TargetSpec>,
        bool_rule: BoolCombination,
    ) -> (TargetGraph, TargetId) {
        let mut builder = TargetGraph::builder();
        let count = deps.len();
        for spec in deps {
            builder.add(spec).expect("dependency");
        }
        let libraries = (0..count)
            .map(|index| format!("d{index}"))
            .collect::<Vec<_>>()
            .join(";");
        let spec = consumer.iter().fold(
            TargetSpec::new("app", TargetKind::Executable)
                .languages(["C"])
                .property("LINK_LIBRARIES", libraries)
                .policies(new_policy(bool_rule)),
            |acc, (key, value)| acc.property(*key, *value),
        );
        let app = builder.add(spec).expect("app");
        (builder.build(), app)
    }

    #[test]
    fn position_independent_code_conflict_names_the_dependency() {
        let (graph, app) = consumer_graph(
            &[("INTERFACE_POSITION_INDEPENDENT_CODE", "ON")],
            vec![dep("d0", &[("INTERFACE_POSITION_INDEPENDENT_CODE", "OFF")])],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        let errors = resolver.check_property_compatibility(app, &Configuration::named("Debug"));
        assert_eq!(
            errors,
            [CompatibilityError::IncompatibleInterfaceProperty {
                property: "POSITION_INDEPENDENT_CODE".to_owned(),
                consumer: "app".to_owned(),
                contributor: "d0".to_owned(),
                config: Configuration::named("Debug"),
                expected: "ON".to_owned(),
                found: "OFF".to_owned(),
            }]
        );
        assert!(resolver.diagnostics().has_errors());
    }

    #[test]
    fn unset_property_takes_the_combined_value() {
        let listed = ("COMPATIBLE_INTERFACE_STRING", "ABI");
        let (graph, app) = consumer_graph(
            &[],
            vec![
                dep("d0", &[listed, ("INTERFACE_ABI", "v2")]),
                dep("d1", &[("INTERFACE_ABI", "v2")]),
            ],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        let value = resolver
            .compatible_value(app, &Configuration::none(), "ABI")
            .expect("ABI is compatible");
        assert_eq!(value.value.as_deref(), Some("v2"));
        assert_eq!(value.origin.as_deref(), Some("d0"));
        assert_eq!(value.contributions.len(), 2);
        let evaluation = resolver.evaluate(
            "$<TARGET_PROPERTY:ABI>",
            &Configuration::none(),
            Some(app),
            None,
            false,
        );
        assert_eq!(evaluation.value, "v2");
    }

    #[rstest]
    #[case(CompatibleKind::NumberMin, "COMPATIBLE_INTERFACE_NUMBER_MIN", "3")]
    #[case(CompatibleKind::NumberMax, "COMPATIBLE_INTERFACE_NUMBER_MAX", "9")]
    fn numbers_combine_to_their_extremum(
        #[case] kind: CompatibleKind,
        #[case] list: &str,
        #[case] expected: &str,
    ) {
        let (graph, app) = consumer_graph(
            &[],
            vec![
                dep("d0", &[(list, "LEVEL"), ("INTERFACE_LEVEL", "5")]),
                dep("d1", &[("INTERFACE_LEVEL", "3")]),
                dep("d2", &[("INTERFACE_LEVEL", "9")]),
            ],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        let value = resolver
            .compatible_value(app, &Configuration::none(), "LEVEL")
            .expect("LEVEL is compatible");
        assert_eq!(value.kind, kind);
        assert_eq!(value.value.as_deref(), Some(expected));
        assert!(value.conflict.is_none());
    }

    #[test]
    fn declared_minimum_is_violated_by_lower_contributor() {
        let (graph, app) = consumer_graph(
            &[("LEVEL", "4")],
            vec![dep(
                "d0",
                &[("COMPATIBLE_INTERFACE_NUMBER_MIN", "LEVEL"), ("INTERFACE_LEVEL", "2")],
            )],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        let errors = resolver.check_property_compatibility(app, &Configuration::none());
        assert!(matches!(
            errors.as_slice(),
            [CompatibilityError::IncompatibleInterfaceProperty { contributor, .. }] if contributor == "d0"
        ));
    }

    #[test]
    fn property_listed_twice_conflicts() {
        let (graph, app) = consumer_graph(
            &[],
            vec![
                dep("d0", &[("COMPATIBLE_INTERFACE_BOOL", "FAST")]),
                dep("d1", &[("COMPATIBLE_INTERFACE_STRING", "FAST")]),
            ],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        let errors = resolver.check_property_compatibility(app, &Configuration::none());
        assert_eq!(
            errors,
            [CompatibilityError::ConflictingKinds {
                property: "FAST".to_owned(),
                consumer: "app".to_owned(),
                kinds: "bool and string".to_owned(),
            }]
        );
    }

    #[rstest]
    #[case(BoolCombination::And, "OFF")]
    #[case(BoolCombination::Or, "ON")]
    fn bool_combinations_never_conflict(#[case] rule: BoolCombination, #[case] expected: &str) {
        let (graph, app) = consumer_graph(
            &[],
            vec![
                dep("d0", &[("INTERFACE_POSITION_INDEPENDENT_CODE", "ON")]),
                dep("d1", &[("INTERFACE_POSITION_INDEPENDENT_CODE", "OFF")]),
            ],
            rule,
        );
        let resolver = Resolver::new(&graph);
        let value = resolver
            .compatible_value(app, &Configuration::none(), POSITION_INDEPENDENT_CODE)
            .expect("always compatible");
        assert_eq!(value.value.as_deref(), Some(expected));
        assert!(value.conflict.is_none());
        assert!(!resolver.diagnostics().has_errors());
    }

    #[test]
    fn diagnostics_are_emitted_once() {
        let (graph, app) = consumer_graph(
            &[("POSITION_INDEPENDENT_CODE", "ON")],
            vec![dep("d0", &[("INTERFACE_POSITION_INDEPENDENT_CODE", "OFF")])],
            BoolCombination::Agree,
        );
        let resolver = Resolver::new(&graph);
        for _ in 0..3 {
            assert_eq!(
                resolver
                    .check_property_compatibility(app, &Configuration::none())
                    .len(),
                1
            );
        }
        assert_eq!(resolver.diagnostics().len(), 1);
    }
}
