//! Depth-first walk over link-interface edges.
//!
//! A walk starts from a root target and a list of root items (its link
//! interface or its link implementation) and follows the direct interface of
//! every target it reaches. Strongly connected components of the reached
//! graph decide which back edges are legal: a component made only of static
//! libraries is a static group and is linked repeatedly, any other cycle is
//! an error.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::diagnostics::Provenance;
use crate::genex::{GenexError, canonicalize_cycle, extend_unique};
use crate::graph::{Configuration, TargetId, TargetKind};

use super::Resolver;
use super::link_iface::DirectInterface;
use super::link_impl::LinkItem;

/// What one walk reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WalkResult {
    /// Targets reached, in preorder, excluding the root.
    pub(crate) visited: Vec<TargetId>,
    /// Items reached, in encounter order, excluding the root.
    pub(crate) transitive: Vec<LinkItem>,
    pub(crate) languages: Vec<String>,
    pub(crate) shared_deps: Vec<String>,
    pub(crate) multiplicity: u32,
    /// Static groups in the order their first member was reached.
    pub(crate) static_groups: Vec<Vec<TargetId>>,
}

/// Edges of the reached graph.
struct Reached {
    root: TargetId,
    root_items: Vec<LinkItem>,
    interfaces: BTreeMap<TargetId, Option<Rc<DirectInterface>>>,
}

impl Reached {
    fn items(&self, node: TargetId) -> &[LinkItem] {
        if node == self.root {
            return &self.root_items;
        }
        self.interfaces
            .get(&node)
            .and_then(Option::as_ref)
            .map(|direct| direct.items.as_slice())
            .unwrap_or_default()
    }

    fn successors(&self, node: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        self.items(node).iter().filter_map(|item| item.target)
    }

    fn direct(&self, node: TargetId) -> Option<&DirectInterface> {
        self.interfaces.get(&node).and_then(Option::as_deref)
    }
}

impl Resolver<'_> {
    /// Walk the interfaces reachable from `root_items`.
    pub(crate) fn walk(
        &self,
        root: TargetId,
        root_items: &[LinkItem],
        config: &Configuration,
        head: TargetId,
    ) -> WalkResult {
        self.walks.set(self.walks.get() + 1);
        tracing::debug!(
            name = self.target_name(root),
            %config,
            head = self.target_name(head),
            "walking link interfaces"
        );
        let reached = self.reach(root, root_items, config, head);
        let groups = self.static_groups(&reached);

        let mut walker = Walker {
            reached: &reached,
            groups: &groups,
            path: vec![root],
            seen: BTreeSet::from([root]),
            result: WalkResult::default(),
            cycles: Vec::new(),
        };
        walker.visit_items(root);
        let Walker {
            mut result, cycles, ..
        } = walker;

        let mut ordered: BTreeMap<usize, Vec<TargetId>> = BTreeMap::new();
        let mut first_seen: Vec<usize> = Vec::new();
        for node in std::iter::once(root).chain(result.visited.iter().copied()) {
            if let Some(&group) = groups.get(&node) {
                if !first_seen.contains(&group) {
                    first_seen.push(group);
                }
                ordered.entry(group).or_default().push(node);
            }
        }
        result.static_groups = first_seen
            .into_iter()
            .filter_map(|group| ordered.remove(&group))
            .collect();

        let provenance = Provenance::for_target(
            self.target_name(root),
            "INTERFACE_LINK_LIBRARIES",
            config.clone(),
        );
        for cycle in cycles {
            let names = cycle
                .into_iter()
                .map(|id| self.target_name(id).to_owned())
                .collect();
            let error = GenexError::CyclicEvaluation {
                cycle: canonicalize_cycle(names),
            };
            self.report_error(&error, provenance.clone());
        }
        result
    }

    /// Collect the direct interface of every target reachable from the root.
    fn reach(
        &self,
        root: TargetId,
        root_items: &[LinkItem],
        config: &Configuration,
        head: TargetId,
    ) -> Reached {
        let mut reached = Reached {
            root,
            root_items: root_items.to_vec(),
            interfaces: BTreeMap::new(),
        };
        let mut pending: Vec<TargetId> = reached.successors(root).collect();
        while let Some(node) = pending.pop() {
            if node == root || reached.interfaces.contains_key(&node) {
                continue;
            }
            let direct = self.direct_interface(node, config, head);
            reached.interfaces.insert(node, direct);
            pending.extend(reached.successors(node));
        }
        reached
    }

    /// Map each member of a static group to its group index.
    fn static_groups(&self, reached: &Reached) -> BTreeMap<TargetId, usize> {
        let mut tarjan = Tarjan::new(reached);
        tarjan.connect(reached.root);
        let mut groups = BTreeMap::new();
        let static_components = tarjan.components.into_iter().filter(|component| {
            component.len() > 1
                && component
                    .iter()
                    .all(|id| self.graph.target(*id).kind() == TargetKind::StaticLibrary)
        });
        for (index, component) in static_components.enumerate() {
            for member in component {
                groups.insert(member, index);
            }
        }
        groups
    }
}

struct Walker<'r> {
    reached: &'r Reached,
    groups: &'r BTreeMap<TargetId, usize>,
    path: Vec<TargetId>,
    seen: BTreeSet<TargetId>,
    result: WalkResult,
    cycles: Vec<Vec<TargetId>>,
}

impl Walker<'_> {
    fn visit_items(&mut self, node: TargetId) {
        let reached = self.reached;
        for item in reached.items(node) {
            let Some(dep) = item.target else {
                if !self.result.transitive.contains(item) {
                    self.result.transitive.push(item.clone());
                }
                continue;
            };
            if let Some(start) = self.path.iter().position(|id| *id == dep) {
                let same_group = dep != node
                    && self
                        .groups
                        .get(&dep)
                        .is_some_and(|group| self.groups.get(&node) == Some(group));
                if !same_group {
                    let mut cycle: Vec<TargetId> =
                        self.path.iter().skip(start).copied().collect();
                    cycle.push(dep);
                    self.cycles.push(cycle);
                }
                continue;
            }
            if self.seen.insert(dep) {
                self.visit(dep, item);
            }
        }
    }

    fn visit(&mut self, node: TargetId, item: &LinkItem) {
        self.result.visited.push(node);
        if !self.result.transitive.contains(item) {
            self.result.transitive.push(item.clone());
        }
        if let Some(&group) = self.groups.get(&node) {
            let others = self
                .path
                .iter()
                .filter(|id| **id != node && self.groups.get(id) == Some(&group))
                .count();
            let count = u32::try_from(others).unwrap_or(u32::MAX).saturating_add(1);
            self.result.multiplicity = self.result.multiplicity.max(count);
        }
        if let Some(direct) = self.reached.direct(node) {
            self.result.multiplicity = self.result.multiplicity.max(direct.multiplicity);
            extend_unique(&mut self.result.languages, &direct.languages);
            extend_unique(&mut self.result.shared_deps, &direct.shared_deps);
        }
        self.path.push(node);
        self.visit_items(node);
        self.path.pop();
    }
}

/// Tarjan's strongly connected components over the reached graph.
struct Tarjan<'r> {
    reached: &'r Reached,
    next_index: usize,
    index: BTreeMap<TargetId, usize>,
    stack: Vec<TargetId>,
    on_stack: BTreeSet<TargetId>,
    components: Vec<Vec<TargetId>>,
}

impl<'r> Tarjan<'r> {
    const fn new(reached: &'r Reached) -> Self {
        Self {
            reached,
            next_index: 0,
            index: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        }
    }

    fn connect(&mut self, node: TargetId) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.index.insert(node, index);
        let mut low = index;
        self.stack.push(node);
        self.on_stack.insert(node);

        let successors: Vec<TargetId> = self.reached.successors(node).collect();
        for dep in successors {
            if let Some(&dep_index) = self.index.get(&dep) {
                if self.on_stack.contains(&dep) {
                    low = low.min(dep_index);
                }
            } else {
                low = low.min(self.connect(dep));
            }
        }

        if low == index {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(&member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
        low
    }
}
