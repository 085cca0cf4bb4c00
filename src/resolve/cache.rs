//! Central memo tables keyed by composite ordered keys.
//!
//! Every table is a `BTreeMap` so iteration follows target id, then
//! configuration, then head. Values are shared as `Rc`. No `RefCell` borrow
//! is held while a value is computed, so computations may recurse into other
//! tables freely.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::graph::{Configuration, TargetId};

use super::closure::LinkClosure;
use super::compat::CompatibleValue;
use super::link_iface::{DirectInterface, LinkInterface};
use super::link_impl::{LinkImplementation, LinkItem};
use super::walk::WalkResult;

/// `(target, configuration)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ConfigKey {
    pub(crate) target: TargetId,
    pub(crate) config: Configuration,
}

/// `(target, configuration, head)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct HeadKey {
    pub(crate) target: TargetId,
    pub(crate) config: Configuration,
    pub(crate) head: TargetId,
}

impl HeadKey {
    /// Key for `target`, defaulting the head to the target itself.
    pub(crate) fn new(target: TargetId, config: &Configuration, head: Option<TargetId>) -> Self {
        Self {
            target,
            config: config.clone(),
            head: head.unwrap_or(target),
        }
    }
}

/// `(target, configuration, property)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct PropertyKey {
    pub(crate) target: TargetId,
    pub(crate) config: Configuration,
    pub(crate) property: String,
}

/// A computation currently on the stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Pending {
    Implementation(ConfigKey),
    DirectInterface(HeadKey),
    Interface(HeadKey),
    ImplementationWalk(HeadKey),
    Closure(HeadKey),
    TransitiveLibraries(HeadKey),
    Compatibility(PropertyKey),
}

impl Pending {
    pub(crate) const fn target(&self) -> TargetId {
        match self {
            Self::Implementation(key) => key.target,
            Self::DirectInterface(key)
            | Self::Interface(key)
            | Self::ImplementationWalk(key)
            | Self::Closure(key)
            | Self::TransitiveLibraries(key) => key.target,
            Self::Compatibility(key) => key.target,
        }
    }

    pub(crate) const fn config(&self) -> &Configuration {
        match self {
            Self::Implementation(key) => &key.config,
            Self::DirectInterface(key)
            | Self::Interface(key)
            | Self::ImplementationWalk(key)
            | Self::Closure(key)
            | Self::TransitiveLibraries(key) => &key.config,
            Self::Compatibility(key) => &key.config,
        }
    }
}

impl fmt::Display for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implementation(_) => f.write_str("link implementation"),
            Self::DirectInterface(_) | Self::Interface(_) => f.write_str("link interface"),
            Self::ImplementationWalk(_) | Self::Closure(_) => f.write_str("link closure"),
            Self::TransitiveLibraries(_) => f.write_str("usage requirements"),
            Self::Compatibility(key) => write!(f, "compatible property {}", key.property),
        }
    }
}

pub(crate) type Table<K, V> = RefCell<BTreeMap<K, V>>;

#[derive(Default)]
pub(crate) struct ResolutionCache {
    pub(crate) implementations: Table<ConfigKey, Rc<LinkImplementation>>,
    pub(crate) direct_interfaces: Table<HeadKey, Option<Rc<DirectInterface>>>,
    pub(crate) interfaces: Table<HeadKey, Option<Rc<LinkInterface>>>,
    pub(crate) implementation_walks: Table<HeadKey, Rc<WalkResult>>,
    pub(crate) closures: Table<HeadKey, Rc<LinkClosure>>,
    pub(crate) transitive_libraries: Table<HeadKey, Rc<Vec<LinkItem>>>,
    pub(crate) compatibility: Table<PropertyKey, Option<Rc<CompatibleValue>>>,
    in_progress: RefCell<BTreeSet<Pending>>,
}

impl ResolutionCache {
    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// A request for a key whose computation is already on the stack returns
    /// `Err(pending)` and stores nothing.
    pub(crate) fn memoize<K, V>(
        &self,
        table: &Table<K, V>,
        key: &K,
        pending: Pending,
        compute: impl FnOnce() -> V,
    ) -> Result<V, Pending>
    where
        K: Ord + Clone,
        V: Clone,
    {
        if let Some(hit) = table.borrow().get(key) {
            return Ok(hit.clone());
        }
        if !self.in_progress.borrow_mut().insert(pending.clone()) {
            return Err(pending);
        }
        let value = compute();
        self.in_progress.borrow_mut().remove(&pending);
        table.borrow_mut().insert(key.clone(), value.clone());
        Ok(value)
    }
}
