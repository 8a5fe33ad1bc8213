//! Record module: the normalized output data model
//!
//! # Components
//!
//! - `Field`: explicit unknown-or-known field state
//! - `Category`: the fixed business taxonomy
//! - `BusinessRecord`: one harvested business listing

mod business;
mod category;
mod field;

// Re-export main types
pub use business::{BusinessRecord, RecordField, NAME_SENTINEL, RECORD_HEADERS};
pub use category::Category;
pub use field::{Field, UNKNOWN_MARKER};
