//! Diagnostic rendering of trees and cached results.
pub mod trace;

pub use trace::format_tree;
