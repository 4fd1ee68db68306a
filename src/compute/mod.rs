//! Executes the calculation tree.
pub mod engine;
pub mod ledger;

pub use engine::CalcEngine;
pub use ledger::{CalcError, Ledger};
