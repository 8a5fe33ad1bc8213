//! Frontier of pending work items and the set of visited identities
//!
//! This module handles:
//! - Set-semantics pending collection (no duplicates, no ordering)
//! - Append-only visited set for the lifetime of one run
//! - Atomic pop-and-mark so no two pipelines claim the same item

use crate::frontier::WorkItem;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FrontierState {
    /// Pending items keyed by canonical identity
    pending: HashMap<String, WorkItem>,

    /// Identities already claimed for processing; never shrinks
    visited: HashSet<String>,
}

/// Pending work plus the visited set, guarded as one structure
///
/// `pop` returns an arbitrary pending item. There is no queue or stack
/// discipline: the order in which items come out is unspecified and may
/// differ between runs.
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier seeded with the given items
    ///
    /// Duplicate seeds collapse to a single pending item.
    pub fn with_seeds(seeds: impl IntoIterator<Item = WorkItem>) -> Self {
        let frontier = Self::new();
        for seed in seeds {
            frontier.push(seed);
        }
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an item unless it is already visited or pending
    ///
    /// Returns true if the item was added. Duplicates are a silent no-op.
    pub fn push(&self, item: WorkItem) -> bool {
        let key = item.key();
        let mut state = self.lock();

        if state.visited.contains(&key) || state.pending.contains_key(&key) {
            tracing::trace!("Frontier already knows {}", key);
            return false;
        }

        state.pending.insert(key, item);
        true
    }

    /// Removes and returns an arbitrary pending item
    ///
    /// Returns None when nothing is pending. The popped item is not marked
    /// visited; use [`Frontier::claim_next`] for pop-and-mark.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        let key = state.pending.keys().next().cloned()?;
        state.pending.remove(&key)
    }

    /// Marks an item as visited
    ///
    /// Returns false if the item had already been visited.
    pub fn mark_visited(&self, item: &WorkItem) -> bool {
        let key = item.key();
        let mut state = self.lock();
        state.pending.remove(&key);
        state.visited.insert(key)
    }

    /// Pops the next unvisited item and marks it visited in one step
    ///
    /// Items that turn out to be visited already are dropped and the next
    /// one is tried. Returns None once nothing is pending.
    pub fn claim_next(&self) -> Option<WorkItem> {
        let mut state = self.lock();

        loop {
            let key = state.pending.keys().next().cloned()?;
            let item = state.pending.remove(&key)?;

            if state.visited.insert(key) {
                return Some(item);
            }

            tracing::debug!("Skipping already visited item {}", item);
        }
    }

    /// Returns true if the item has been visited
    pub fn is_visited(&self, item: &WorkItem) -> bool {
        self.lock().visited.contains(&item.key())
    }

    /// Returns true if the item is waiting in the frontier
    pub fn is_pending(&self, item: &WorkItem) -> bool {
        self.lock().pending.contains_key(&item.key())
    }

    /// Returns the number of pending items
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns the number of visited items
    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }

    /// Returns whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Returns the pending identities, sorted
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().pending.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the visited identities, sorted
    pub fn visited_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().visited.iter().cloned().collect();
        keys.sort();
        keys
    }
}
