//! The evaluation protocol: schedule construction with cycle detection,
//! wave-parallel execution, memoization, and failure propagation.

use crate::compute::ledger::{CalcError, Ledger};
use crate::graph::{CalculationTree, DataIdentifier, NodeId, NodeKind, TaggedResult, Value};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

pub struct CalcEngine<'a> {
    tree: &'a CalculationTree,
}

impl<'a> CalcEngine<'a> {
    pub fn new(tree: &'a CalculationTree) -> Self {
        Self { tree }
    }

    /// Computes the value of `target` under `id`, memoizing every node it
    /// touches into the ledger.
    ///
    /// Each (node, identifier) pair computes at most once per generation;
    /// a cached entry short-circuits the whole traversal.
    pub fn calculate(
        &self,
        target: NodeId,
        id: &DataIdentifier,
        ledger: &mut Ledger,
    ) -> Result<Value, CalcError> {
        if let Some(value) = ledger.get(target, id) {
            trace!(node = ?target, identifier = %id, "cache hit");
            return Ok(value.clone());
        }
        match self.calculate_many(&[target], id, ledger).pop() {
            Some(result) => result,
            None => Err(CalcError::UnknownNode { id: target }),
        }
    }

    /// Computes several targets under the same identifier in one generation,
    /// sharing one schedule so common subtrees resolve once.
    pub fn calculate_many(
        &self,
        targets: &[NodeId],
        id: &DataIdentifier,
        ledger: &mut Ledger,
    ) -> Vec<Result<Value, CalcError>> {
        ledger.ensure_capacity(self.tree.node_count());

        // 1. Build a post-order schedule by DFS, skipping subtrees already
        //    resolved in the ledger. Re-entering a node on the DFS stack
        //    means the construction-time tree invariant was violated.
        let mut order = Vec::new();
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        let mut schedule_errors: HashMap<NodeId, CalcError> = HashMap::new();

        for &target in targets {
            if let Err(e) =
                self.build_eval_order(target, id, ledger, &mut order, &mut visiting, &mut visited)
            {
                schedule_errors.insert(target, e);
            }
        }

        // 2. Bucket the schedule into depth waves. Nodes within a wave have
        //    no dependency on each other and run in parallel.
        let waves = bucket_into_waves(self.tree, &order);
        debug!(nodes = order.len(), waves = waves.len(), identifier = %id, "scheduled evaluation");

        // 3. Execute wave by wave, leaves first. A failed node poisons its
        //    ancestors in later waves without stopping its siblings.
        let mut failures: HashMap<NodeId, CalcError> = HashMap::new();
        for wave in &waves {
            let snapshot: &Ledger = ledger;
            let results: Vec<(NodeId, Result<Value, CalcError>)> = wave
                .par_iter()
                .map(|&node| (node, self.evaluate_node(node, id, snapshot, &failures)))
                .collect();

            // Sequential write-back: a single writer per (node, identifier),
            // results keyed by node rather than completion order.
            for (node, result) in results {
                match result {
                    Ok(value) => ledger.insert(node, id, value),
                    Err(e) => {
                        failures.insert(node, e);
                    }
                }
            }
        }

        targets
            .iter()
            .map(|&target| {
                if let Some(e) = failures.get(&target) {
                    Err(e.clone())
                } else if let Some(e) = schedule_errors.get(&target) {
                    Err(e.clone())
                } else if let Some(value) = ledger.get(target, id) {
                    Ok(value.clone())
                } else {
                    Err(CalcError::UnknownNode { id: target })
                }
            })
            .collect()
    }

    /// A recursive helper performing a depth-first search, producing a
    /// post-order traversal of the dependency tree (children before parents).
    fn build_eval_order(
        &self,
        node: NodeId,
        id: &DataIdentifier,
        ledger: &Ledger,
        order: &mut Vec<NodeId>,
        visiting: &mut HashSet<NodeId>,
        visited: &mut HashSet<NodeId>,
    ) -> Result<(), CalcError> {
        if !self.tree.contains(node) {
            return Err(CalcError::UnknownNode { id: node });
        }
        // Already scheduled, or already memoized for this generation.
        if visited.contains(&node) || ledger.get(node, id).is_some() {
            return Ok(());
        }
        if visiting.contains(&node) {
            return Err(CalcError::CycleDetected {
                node_name: self.tree.node_name(node).to_string(),
            });
        }

        visiting.insert(node);

        for &child in self.tree.children_of(node) {
            self.build_eval_order(child, id, ledger, order, visiting, visited)?;
        }

        visiting.remove(&node);
        visited.insert(node);
        order.push(node);
        Ok(())
    }

    /// Evaluates one node against the already-resolved ledger state.
    ///
    /// Leaves are a pure lookup; operation nodes assemble their children's
    /// tagged results in declaration order and invoke the worker. A failed
    /// child short-circuits before the worker runs.
    fn evaluate_node(
        &self,
        node: NodeId,
        id: &DataIdentifier,
        ledger: &Ledger,
        failures: &HashMap<NodeId, CalcError>,
    ) -> Result<Value, CalcError> {
        match self.tree.node_kind(node) {
            NodeKind::Value(idx) => {
                let values = &self.tree.store.leaf_values[idx as usize];
                values.get(id).cloned().ok_or_else(|| CalcError::MissingIdentifier {
                    identifier: id.clone(),
                    node_name: self.tree.node_name(node).to_string(),
                })
            }
            NodeKind::Operation(idx) => {
                let children = self.tree.children_of(node);
                let mut tagged: SmallVec<[TaggedResult; 4]> =
                    SmallVec::with_capacity(children.len());

                for &child in children {
                    if let Some(cause) = failures.get(&child) {
                        return Err(CalcError::ChildFailure {
                            node_name: self.tree.node_name(node).to_string(),
                            child_name: self.tree.node_name(child).to_string(),
                            source: Box::new(cause.clone()),
                        });
                    }
                    let value = ledger
                        .get(child, id)
                        .cloned()
                        .expect("BUG: child must be resolved by wave order");
                    tagged.push(TaggedResult { source: child, value });
                }

                let worker = &self.tree.store.workers[idx as usize];
                trace!(node = self.tree.node_name(node), identifier = %id, "invoking worker");
                worker(&tagged).map_err(|message| CalcError::WorkerFailure {
                    node_name: self.tree.node_name(node).to_string(),
                    identifier: id.clone(),
                    message,
                })
            }
        }
    }
}

/// Assigns each scheduled node a depth (leaves at 0) and groups the schedule
/// by depth. Children already memoized contribute no depth, so a node whose
/// inputs are all cached lands in the first wave.
fn bucket_into_waves(tree: &CalculationTree, order: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut depth: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
    let mut waves: Vec<Vec<NodeId>> = Vec::new();

    // Post-order guarantees every scheduled child precedes its parent here.
    for &node in order {
        let d = tree
            .children_of(node)
            .iter()
            .filter_map(|child| depth.get(child))
            .map(|child_depth| child_depth + 1)
            .max()
            .unwrap_or(0);
        depth.insert(node, d);
        if waves.len() <= d {
            waves.resize_with(d + 1, Vec::new);
        }
        waves[d].push(node);
    }
    waves
}
