//! Defines the core data structures for the calculation tree.
pub mod node;
pub mod registry;
pub mod tree;

// Re-export key types for convenient access
pub use node::{DataIdentifier, NodeId, NodeKind, NodeMetadata, TaggedResult, Value, WorkerFn};
pub use registry::NodeRegistry;
pub use tree::CalculationTree;
