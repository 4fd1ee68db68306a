//! A memoizing evaluator for calculation trees.
//!
//! A tree is built bottom-up from value nodes (leaves holding identifier ->
//! value maps) and operation nodes (internal nodes combining their children's
//! tagged results through a worker function). The engine resolves any node
//! under any identifier, caching each (node, identifier) result in a `Ledger`
//! so it computes at most once per generation; cached entries persist until
//! explicitly invalidated.
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use treecalc_core::{
//!     CalcEngine, CalculationTree, DataIdentifier, Ledger, NodeMetadata, TaggedResult, Value,
//! };
//!
//! let mut tree = CalculationTree::new();
//! let a = tree.add_value_node(
//!     HashMap::from([(DataIdentifier::from("v"), Value::Int(2))]),
//!     NodeMetadata::named("A"),
//! );
//! let b = tree.add_value_node(
//!     HashMap::from([(DataIdentifier::from("v"), Value::Int(3))]),
//!     NodeMetadata::named("B"),
//! );
//! let sum = tree.add_operation_node(
//!     Arc::new(|results: &[TaggedResult]| {
//!         Ok(Value::Int(results.iter().filter_map(|r| r.value.as_int()).sum()))
//!     }),
//!     &[a, b],
//!     NodeMetadata::named("Sum"),
//! );
//!
//! let mut ledger = Ledger::new();
//! let engine = CalcEngine::new(&tree);
//! let result = engine.calculate(sum, &DataIdentifier::from("v"), &mut ledger);
//! assert_eq!(result, Ok(Value::Int(5)));
//! ```

pub mod compute;
pub mod display;
pub mod graph;

pub use compute::{CalcEngine, CalcError, Ledger};
pub use display::format_tree;
pub use graph::{
    CalculationTree, DataIdentifier, NodeId, NodeKind, NodeMetadata, TaggedResult, Value, WorkerFn,
};
