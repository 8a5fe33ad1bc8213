//! Request and token budget enforcement for model calls
//!
//! This module handles:
//! - A fixed-length rolling window with request and token ceilings
//! - Suspending callers until the window rolls over when a ceiling is hit
//! - Capping how many granted callers may be talking to the model at once

use crate::config::BudgetConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Counters for the current window
#[derive(Debug, Clone)]
struct BudgetState {
    tokens_used: u64,
    requests_made: u32,
    window_start: Instant,
}

impl BudgetState {
    fn new(now: Instant) -> Self {
        Self {
            tokens_used: 0,
            requests_made: 0,
            window_start: now,
        }
    }

    fn reset(&mut self, now: Instant) {
        self.tokens_used = 0;
        self.requests_made = 0;
        self.window_start = now;
    }
}

/// Point-in-time view of the budget counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub tokens_used: u64,
    pub requests_made: u32,
}

/// A granted slot from one `acquire` call
///
/// Holds one of the gate's concurrency slots until dropped, so callers
/// keep it alive for the duration of the model call.
#[derive(Debug)]
pub struct Acquisition {
    /// Tokens recorded against the window
    pub tokens: u64,

    /// Time spent suspended waiting for a slot or for the window to roll over
    pub waited: Duration,

    _permit: Option<OwnedSemaphorePermit>,
}

impl Acquisition {
    /// Returns true if the caller had to wait for budget
    pub fn was_delayed(&self) -> bool {
        !self.waited.is_zero()
    }
}

/// Shared limiter guarding calls to the external model
///
/// One gate is shared (behind an `Arc`) by every fallback extraction in a
/// run. The counters live behind a single async lock that is held across
/// the check, the optional sleep and the update, so no two callers can
/// interleave a read-then-write of the counters. A concurrency slot is
/// taken before the counters are touched and handed back inside the
/// returned [`Acquisition`].
#[derive(Debug)]
pub struct BudgetGate {
    tokens_per_window: u64,
    requests_per_window: u32,
    window: Duration,
    concurrency: Arc<Semaphore>,
    state: Mutex<BudgetState>,
}

impl BudgetGate {
    /// Creates a gate with explicit limits
    ///
    /// `max_concurrent` is clamped to at least one caller.
    pub fn new(
        tokens_per_window: u64,
        requests_per_window: u32,
        window: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            tokens_per_window,
            requests_per_window,
            window,
            concurrency: Arc::new(Semaphore::new(max_concurrent.max(1))),
            state: Mutex::new(BudgetState::new(Instant::now())),
        }
    }

    /// Creates a gate from the `[budget]` config section
    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(
            config.tokens_per_window,
            config.requests_per_window,
            Duration::from_secs(config.window_secs),
            config.max_concurrent,
        )
    }

    /// Returns the token ceiling per window
    pub fn tokens_per_window(&self) -> u64 {
        self.tokens_per_window
    }

    /// Returns the window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits for a concurrency slot and until a request of `tokens_needed`
    /// fits in the budget, then records it
    ///
    /// The slot is released when the returned [`Acquisition`] is dropped.
    ///
    /// Never fails; exhaustion only shows up as latency, bounded by one
    /// window length. A request whose tokens alone exceed the ceiling is
    /// granted on its own in a fresh window, so callers should refuse such
    /// requests before reaching the gate.
    pub async fn acquire(&self, tokens_needed: Option<u64>) -> Acquisition {
        let started = Instant::now();
        // The semaphore is never closed, so acquiring cannot fail
        let permit = Arc::clone(&self.concurrency).acquire_owned().await.ok();
        let tokens = tokens_needed.unwrap_or(0);

        let mut state = self.state.lock().await;

        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            tracing::trace!("Budget window elapsed, resetting counters");
            state.reset(now);
        }

        let over_tokens = tokens > 0 && state.tokens_used + tokens > self.tokens_per_window;
        let over_requests = state.requests_made >= self.requests_per_window;

        if over_tokens || over_requests {
            let elapsed = now.duration_since(state.window_start);
            let remaining = self.window.saturating_sub(elapsed);
            tracing::debug!(
                "Budget exhausted ({} tokens, {} requests used), waiting {:?}",
                state.tokens_used,
                state.requests_made,
                remaining
            );

            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
            state.reset(Instant::now());
        }

        state.tokens_used += tokens;
        state.requests_made += 1;

        Acquisition {
            tokens,
            waited: started.elapsed(),
            _permit: permit,
        }
    }

    /// Returns the counters for the current window
    ///
    /// If the window has already elapsed the counters are reset first, so
    /// a snapshot never reports stale consumption.
    pub async fn snapshot(&self) -> BudgetSnapshot {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.reset(now);
        }
        BudgetSnapshot {
            tokens_used: state.tokens_used,
            requests_made: state.requests_made,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_grants_within_budget_without_waiting() {
        let gate = BudgetGate::new(1000, 5, WINDOW, 3);

        let first = gate.acquire(Some(100)).await;
        let second = gate.acquire(None).await;

        assert!(!first.was_delayed());
        assert!(!second.was_delayed());
        assert_eq!(
            gate.snapshot().await,
            BudgetSnapshot {
                tokens_used: 100,
                requests_made: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_ceiling_suspends_second_caller() {
        let gate = Arc::new(BudgetGate::new(10_000, 1, WINDOW, 3));

        let (a, b) = tokio::join!(gate.acquire(Some(10)), gate.acquire(Some(10)));

        let delayed: Vec<_> = [&a, &b].into_iter().filter(|acq| acq.was_delayed()).collect();
        assert_eq!(delayed.len(), 1, "exactly one caller should wait");
        assert!(delayed[0].waited >= WINDOW - Duration::from_millis(1));

        // The second grant opened a fresh window holding only itself
        assert_eq!(gate.snapshot().await.requests_made, 1);

        tokio::time::advance(WINDOW).await;
        assert_eq!(
            gate.snapshot().await,
            BudgetSnapshot {
                tokens_used: 0,
                requests_made: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_ceiling_suspends() {
        let gate = BudgetGate::new(500, 100, WINDOW, 3);

        assert!(!gate.acquire(Some(400)).await.was_delayed());
        let second = gate.acquire(Some(200)).await;
        assert!(second.was_delayed());
        assert_eq!(gate.snapshot().await.tokens_used, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rollover_resets_counters() {
        let gate = BudgetGate::new(500, 2, WINDOW, 3);
        gate.acquire(Some(300)).await;
        gate.acquire(Some(100)).await;

        tokio::time::advance(WINDOW + Duration::from_secs(1)).await;

        let next = gate.acquire(Some(400)).await;
        assert!(!next.was_delayed());
        assert_eq!(
            gate.snapshot().await,
            BudgetSnapshot {
                tokens_used: 400,
                requests_made: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_never_exceed_ceiling_per_window() {
        let ceiling = 1_000;
        let gate = Arc::new(BudgetGate::new(ceiling, 1_000, WINDOW, 3));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.acquire(Some(300)).await;
                Instant::now()
            }));
        }

        let mut per_window = std::collections::HashMap::new();
        for handle in handles {
            let granted_at = handle.await.unwrap();
            let window_index = granted_at.duration_since(start).as_secs() / WINDOW.as_secs();
            *per_window.entry(window_index).or_insert(0u64) += 300;
        }

        for (window, used) in per_window {
            assert!(used <= ceiling, "window {} used {} tokens", window, used);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_ceiling_clamped() {
        let gate = BudgetGate::new(100, 10, WINDOW, 0);
        let acq = gate.acquire(None).await;
        assert_eq!(acq.tokens, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_held_until_acquisition_dropped() {
        let gate = Arc::new(BudgetGate::new(10_000, 100, WINDOW, 1));
        let first = gate.acquire(Some(10)).await;

        let waiting = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire(Some(10)).await.waited })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiting.is_finished());
        assert_eq!(gate.snapshot().await.requests_made, 1);

        drop(first);
        let waited = waiting.await.unwrap();
        assert!(waited >= Duration::from_secs(5));
        assert_eq!(gate.snapshot().await.requests_made, 2);
    }
}
