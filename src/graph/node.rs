//! Defines the payload types shared by the registry and the engine:
//! identifiers, values, node metadata, and the worker function contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A unique, stable identifier for a node within the tree.
///
/// Node identity is its id; nodes are never value-compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// A key naming one logical data channel a node can be asked to produce.
///
/// Multiple identifiers may coexist on the same node (e.g. "raw" vs
/// "normalized"); results are cached per identifier, so one topology can
/// serve several named computations without being rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataIdentifier(pub String);

impl DataIdentifier {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for DataIdentifier {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for DataIdentifier {
    fn from(s: String) -> Self { Self(s) }
}

impl fmt::Display for DataIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The atomic unit of data in the tree.
///
/// A closed sum over the payloads leaves may hold and workers may return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers promote to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Contains metadata for a node, used for auditing and display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// A human-readable name for the node (e.g. "antenna_is_tracking").
    pub name: String,
}

impl NodeMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The two node kinds. The payload is an index into the registry's side
/// table for that kind (leaf value maps or workers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A leaf holding pre-supplied values keyed by identifier.
    Value(u32),
    /// An internal node deriving its value from its children via a worker.
    Operation(u32),
}

/// A child node paired with its computed result.
///
/// An operation node's evaluation produces one of these per child, in child
/// declaration order; order-sensitive workers rely on that ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedResult {
    pub source: NodeId,
    pub value: Value,
}

/// User-supplied function combining children's tagged results into the
/// node's own result.
///
/// Pure-function-shaped from the evaluator's perspective: it must not touch
/// the graph. Failures are reported by returning `Err`, which the engine
/// wraps with the failing node's name and identifier.
pub type WorkerFn = Arc<dyn Fn(&[TaggedResult]) -> Result<Value, String> + Send + Sync>;
