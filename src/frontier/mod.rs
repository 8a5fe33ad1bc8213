//! Frontier module: which work items remain to be harvested
//!
//! This module contains:
//! - `WorkItem` and its canonical identity
//! - `Frontier`, the pending set plus the visited set
//! - Link discovery and the pluggable relevance predicate

mod discovery;
mod manager;
mod work_item;

pub use discovery::{discover_items, DiscoveryPolicy, KeywordDiscovery};
pub use manager::Frontier;
pub use work_item::WorkItem;
