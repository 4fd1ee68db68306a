//! registry.rs
//! Dense columnar storage for the tree topology.

use super::node::{DataIdentifier, NodeId, NodeKind, NodeMetadata, Value, WorkerFn};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Columnar node store. Every per-node attribute lives in its own array,
/// indexed by `NodeId`.
///
/// Topology is append-only: children must exist before their parent is
/// registered, so cycles cannot be expressed through this API.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    // Columnar Arrays
    pub(crate) kinds: Vec<NodeKind>,
    pub(crate) meta: Vec<NodeMetadata>,

    // Topology (CSR children + single non-owning parent back-reference)
    pub(crate) children_flat: Vec<NodeId>,
    pub(crate) children_ranges: Vec<(u32, u32)>, // (start, count)
    pub(crate) parent: Vec<Option<NodeId>>,

    // Side tables, indexed through the NodeKind payload
    pub(crate) leaf_values: Vec<HashMap<DataIdentifier, Value>>,
    pub(crate) workers: Vec<WorkerFn>,

    // Ephemeral state for uniqueness checks
    used_names: HashSet<String>,
}

impl NodeRegistry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    fn push_node(&mut self, kind: NodeKind, children: &[NodeId], mut meta: NodeMetadata) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);

        // --- Unique Name Enforcement ---
        let original_name = meta.name.clone();
        let mut candidate_name = original_name.clone();
        let mut counter = 1;

        while self.used_names.contains(&candidate_name) {
            candidate_name = format!("{}_{}", original_name, counter);
            counter += 1;
        }
        self.used_names.insert(candidate_name.clone());
        meta.name = candidate_name;
        // -------------------------------

        // 1. Register Children (CSR append, declaration order preserved)
        let start = self.children_flat.len() as u32;
        let count = children.len() as u32;
        self.children_flat.extend_from_slice(children);
        self.children_ranges.push((start, count));

        // 2. Parent back-references. A shared child keeps its first parent;
        //    the back-reference is navigational only and never owns.
        for &child in children {
            let slot = &mut self.parent[child.index()];
            if slot.is_none() {
                *slot = Some(id);
            }
        }

        // 3. Metadata
        self.kinds.push(kind);
        self.meta.push(meta);
        self.parent.push(None);

        id
    }

    /// Registers a leaf holding pre-supplied values keyed by identifier.
    pub fn add_value_node(&mut self, values: HashMap<DataIdentifier, Value>, meta: NodeMetadata) -> NodeId {
        let idx = self.leaf_values.len() as u32;
        self.leaf_values.push(values);
        self.push_node(NodeKind::Value(idx), &[], meta)
    }

    /// Registers an internal node over already-constructed children.
    pub fn add_operation_node(&mut self, worker: WorkerFn, children: &[NodeId], meta: NodeMetadata) -> NodeId {
        let idx = self.workers.len() as u32;
        self.workers.push(worker);
        self.push_node(NodeKind::Operation(idx), children, meta)
    }

    #[inline(always)]
    pub fn get_children(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.children_ranges[id.index()];
        &self.children_flat[start as usize..(start + count) as usize]
    }

    pub fn get_parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id.index()]
    }

    pub fn get_leaf_values(&self, id: NodeId) -> Option<&HashMap<DataIdentifier, Value>> {
        match self.kinds[id.index()] {
            NodeKind::Value(idx) => Some(&self.leaf_values[idx as usize]),
            NodeKind::Operation(_) => None,
        }
    }

    /// Replaces or adds one value on a leaf. Callers own invalidating any
    /// ledger entries derived from the old value.
    pub fn update_value(
        &mut self,
        id: NodeId,
        identifier: DataIdentifier,
        value: Value,
    ) -> Result<(), String> {
        match self.kinds[id.index()] {
            NodeKind::Value(idx) => {
                self.leaf_values[idx as usize].insert(identifier, value);
                Ok(())
            }
            NodeKind::Operation(_) => Err(format!(
                "node '{}' is not a value node",
                self.meta[id.index()].name
            )),
        }
    }

    pub fn get_worker(&self, id: NodeId) -> Option<&WorkerFn> {
        match self.kinds[id.index()] {
            NodeKind::Operation(idx) => Some(&self.workers[idx as usize]),
            NodeKind::Value(_) => None,
        }
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Workers are opaque closures; summarize instead of dumping columns.
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.count())
            .field("leaves", &self.leaf_values.len())
            .field("operations", &self.workers.len())
            .finish()
    }
}
