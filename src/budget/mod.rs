//! Budget module: rate and token limiting for external model calls
//!
//! The gate is the only state shared between concurrent fallback
//! extractions. Callers are suspended, never rejected.

mod gate;

pub use gate::{Acquisition, BudgetGate, BudgetSnapshot};
