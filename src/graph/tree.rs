//! tree.rs
//! Wraps the low-level NodeRegistry with the construction and inspection API.

use super::node::{DataIdentifier, NodeId, NodeKind, NodeMetadata, Value, WorkerFn};
use super::registry::NodeRegistry;
use std::collections::{HashMap, HashSet};

/// A calculation tree: leaves supply values per identifier, operation nodes
/// derive values from their children through worker functions.
///
/// Built bottom-up and immutable in topology once evaluation starts (the
/// engine borrows it immutably for the whole run).
#[derive(Debug, Clone, Default)]
pub struct CalculationTree {
    pub(crate) store: NodeRegistry,
}

impl CalculationTree {
    pub fn new() -> Self { Self::default() }

    /// Adds a leaf node holding the given identifier -> value mapping.
    pub fn add_value_node(
        &mut self,
        values: HashMap<DataIdentifier, Value>,
        meta: NodeMetadata,
    ) -> NodeId {
        self.store.add_value_node(values, meta)
    }

    /// Adds an operation node over already-constructed children.
    ///
    /// Children are kept in declaration order; the same child may appear at
    /// several positions and may be shared across parents.
    pub fn add_operation_node(
        &mut self,
        worker: WorkerFn,
        children: &[NodeId],
        meta: NodeMetadata,
    ) -> NodeId {
        self.store.add_operation_node(worker, children, meta)
    }

    /// Replaces or adds one value on a leaf node. Topology stays fixed; any
    /// cached results derived from the old value must be invalidated by the
    /// caller (see `ancestors_of`).
    pub fn update_value(
        &mut self,
        leaf: NodeId,
        identifier: DataIdentifier,
        value: Value,
    ) -> Result<(), String> {
        self.store.update_value(leaf, identifier, value)
    }

    pub fn node_count(&self) -> usize { self.store.count() }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.store.count()
    }

    // --- Accessors ---

    pub fn node_kind(&self, id: NodeId) -> NodeKind { self.store.kinds[id.index()] }
    pub fn node_meta(&self, id: NodeId) -> &NodeMetadata { &self.store.meta[id.index()] }
    pub fn node_name(&self, id: NodeId) -> &str { &self.store.meta[id.index()].name }
    pub fn children_of(&self, id: NodeId) -> &[NodeId] { self.store.get_children(id) }
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> { self.store.get_parent(id) }

    pub fn leaf_values(&self, id: NodeId) -> Option<&HashMap<DataIdentifier, Value>> {
        self.store.get_leaf_values(id)
    }

    /// Looks a node up by its (unique) diagnostic name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.store
            .meta
            .iter()
            .position(|m| m.name == name)
            .map(NodeId::new)
    }

    /// The chain of parent back-references from `id` to the root, nearest
    /// first. Drives caller-side invalidation cascades; the evaluator itself
    /// never walks upward.
    pub fn ancestors_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);

        let mut current = self.store.get_parent(id);
        while let Some(parent) = current {
            // Guards against a malformed back-reference chain.
            if !seen.insert(parent) {
                break;
            }
            out.push(parent);
            current = self.store.get_parent(parent);
        }
        out
    }
}
