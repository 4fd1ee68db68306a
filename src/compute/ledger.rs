//! ledger.rs
//! Per-(node, identifier) memoization of successful results, plus the
//! error type shared across the compute layer.

use crate::graph::{DataIdentifier, NodeId, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("node '{node_name}' holds no value for identifier '{identifier}'")]
    MissingIdentifier { identifier: DataIdentifier, node_name: String },

    #[error("worker of node '{node_name}' failed for identifier '{identifier}': {message}")]
    WorkerFailure { node_name: String, identifier: DataIdentifier, message: String },

    #[error("child '{child_name}' of node '{node_name}' failed")]
    ChildFailure {
        node_name: String,
        child_name: String,
        #[source]
        source: Box<CalcError>,
    },

    #[error("cycle detected at node '{node_name}'")]
    CycleDetected { node_name: String },

    #[error("unknown node id {id:?}")]
    UnknownNode { id: NodeId },
}

impl CalcError {
    /// Node names from the requested node down to the failure site,
    /// extracted from the `ChildFailure` chain.
    pub fn node_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        loop {
            match current {
                CalcError::ChildFailure { node_name, source, .. } => {
                    path.push(node_name.as_str());
                    current = source;
                }
                CalcError::MissingIdentifier { node_name, .. }
                | CalcError::WorkerFailure { node_name, .. }
                | CalcError::CycleDetected { node_name } => {
                    path.push(node_name.as_str());
                    break;
                }
                CalcError::UnknownNode { .. } => break,
            }
        }
        path
    }
}

/// Memoized results for one evaluation generation.
///
/// Only successes are stored: a failed computation leaves its slot unset so
/// a fix-and-retry recalculation can still succeed. Entries persist until
/// explicitly invalidated; there is no implicit expiry.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    // Dense per-node storage, keyed by identifier within each slot
    slots: Vec<HashMap<DataIdentifier, Value>>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.slots.len() < size {
            self.slots.resize(size, HashMap::new());
        }
    }

    #[inline(always)]
    pub fn get(&self, node: NodeId, id: &DataIdentifier) -> Option<&Value> {
        self.slots.get(node.index())?.get(id)
    }

    #[inline(always)]
    pub fn insert(&mut self, node: NodeId, id: &DataIdentifier, value: Value) {
        let idx = node.index();
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, HashMap::new());
        }
        self.slots[idx].insert(id.clone(), value);
    }

    /// Clears one cached entry. Returns whether an entry was present.
    pub fn invalidate(&mut self, node: NodeId, id: &DataIdentifier) -> bool {
        self.slots
            .get_mut(node.index())
            .map(|slot| slot.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Clears every cached entry on one node.
    pub fn invalidate_all(&mut self, node: NodeId) {
        if let Some(slot) = self.slots.get_mut(node.index()) {
            slot.clear();
        }
    }

    /// Starts a fresh generation: every cached entry is dropped.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// All cached entries on one node, for inspection and display.
    pub fn entries(&self, node: NodeId) -> Option<&HashMap<DataIdentifier, Value>> {
        self.slots.get(node.index())
    }

    pub fn cached_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.len()).sum()
    }
}
