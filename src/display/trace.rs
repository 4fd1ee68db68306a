//! Human-readable rendering of a calculation tree, with any cached results
//! from the current generation, for audit output and debugging.

use crate::compute::Ledger;
use crate::graph::{CalculationTree, DataIdentifier, NodeId, NodeKind, Value};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the subtree under `target`, one line per node. Nodes reached
/// through several positions are printed once and referenced thereafter.
pub fn format_tree(tree: &CalculationTree, ledger: &Ledger, target: NodeId) -> String {
    let mut writer = TreeWriter {
        tree,
        ledger,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    if tree.contains(target) {
        let name = tree.node_name(target);
        let _ = writeln!(writer.output, "CALCULATION TREE for node '{}':", name);
        let _ = writeln!(writer.output, "--------------------------------------------------");
        writer.write_node(target, 1, "");
    } else {
        let _ = writeln!(writer.output, "Error: Invalid Node ID {:?}", target);
    }
    writer.output
}

struct TreeWriter<'a> {
    tree: &'a CalculationTree,
    ledger: &'a Ledger,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> TreeWriter<'a> {
    fn write_node(&mut self, node: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&node) {
            let _ = writeln!(
                self.output,
                "{}-> (ref to '{}' at L{})",
                prefix,
                self.tree.node_name(node),
                first_seen
            );
            return;
        }
        self.visited_at_level.insert(node, level);

        let name = self.tree.node_name(node);
        match self.tree.node_kind(node) {
            NodeKind::Value(_) => {
                let values = self
                    .tree
                    .leaf_values(node)
                    .map(format_value_map)
                    .unwrap_or_else(|| "{}".to_string());
                let _ = writeln!(self.output, "{}[L{}] {} = value {}", prefix, level, name, values);
            }
            NodeKind::Operation(_) => {
                let children = self.tree.children_of(node).to_vec();
                let cached = self
                    .ledger
                    .entries(node)
                    .filter(|entries| !entries.is_empty())
                    .map(|entries| format!(" | cached {}", format_value_map(entries)))
                    .unwrap_or_default();
                let _ = writeln!(
                    self.output,
                    "{}[L{}] {} = operation({} children){}",
                    prefix,
                    level,
                    name,
                    children.len(),
                    cached
                );
                let child_prefix = format!("{}  ", prefix);
                for child in children {
                    self.write_node(child, level + 1, &child_prefix);
                }
            }
        }
    }
}

/// Identifiers are sorted so output is deterministic.
fn format_value_map(values: &HashMap<DataIdentifier, Value>) -> String {
    let mut entries: Vec<_> = values.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let body: Vec<String> = entries
        .iter()
        .map(|(id, value)| format!("{}: {}", id, value))
        .collect();
    format!("{{{}}}", body.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CalcEngine;
    use crate::graph::{NodeMetadata, TaggedResult, WorkerFn};
    use std::sync::Arc;

    fn sum_worker() -> WorkerFn {
        Arc::new(|results: &[TaggedResult]| {
            let total: i64 = results.iter().filter_map(|r| r.value.as_int()).sum();
            Ok(Value::Int(total))
        })
    }

    fn build_tree() -> (CalculationTree, NodeId, NodeId) {
        let mut tree = CalculationTree::new();
        let mut values = HashMap::new();
        values.insert(DataIdentifier::from("v"), Value::Int(2));
        values.insert(DataIdentifier::from("w"), Value::Bool(false));
        let a = tree.add_value_node(values, NodeMetadata::named("A"));
        let sum = tree.add_operation_node(sum_worker(), &[a, a], NodeMetadata::named("Sum"));
        (tree, a, sum)
    }

    #[test]
    fn test_format_tree_renders_leaves_and_references() {
        let (tree, _, sum) = build_tree();
        let ledger = Ledger::new();

        let rendered = format_tree(&tree, &ledger, sum);
        assert!(rendered.contains("CALCULATION TREE for node 'Sum'"));
        assert!(rendered.contains("[L1] Sum = operation(2 children)"));
        assert!(rendered.contains("[L2] A = value {v: 2, w: false}"));
        assert!(rendered.contains("-> (ref to 'A' at L2)"));
    }

    #[test]
    fn test_format_tree_shows_cached_results() {
        let (tree, _, sum) = build_tree();
        let mut ledger = Ledger::new();

        let engine = CalcEngine::new(&tree);
        engine
            .calculate(sum, &DataIdentifier::from("v"), &mut ledger)
            .unwrap();

        let rendered = format_tree(&tree, &ledger, sum);
        assert!(rendered.contains("cached {v: 4}"));
    }

    #[test]
    fn test_format_tree_rejects_unknown_node() {
        let (tree, _, _) = build_tree();
        let ledger = Ledger::new();

        let rendered = format_tree(&tree, &ledger, NodeId::new(42));
        assert!(rendered.contains("Invalid Node ID"));
    }
}
