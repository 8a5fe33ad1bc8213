//! Bounded-retry fetching of work items
//!
//! This module handles:
//! - Running transport attempts under a per-attempt timeout
//! - Retrying transport errors and timeouts up to a fixed ceiling
//! - Reporting the final attempt's failure as a value, never a panic

use crate::config::FetcherConfig;
use crate::frontier::WorkItem;
use crate::harvest::transport::Transport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetched payload plus the work item it belongs to
///
/// Owned by the pipeline invocation that fetched it and dropped once the
/// item's record has been built.
#[derive(Debug, Clone)]
pub struct RawContent {
    pub item: WorkItem,
    /// URL the content came from
    pub url: Url,
    pub body: String,
}

impl RawContent {
    /// Returns true if the payload has no visible content
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Terminal failure for one work item after all attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub item: WorkItem,
    pub attempts: u32,
    /// Description of the last attempt's error
    pub last_error: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.item, self.attempts, self.last_error
        )
    }
}

/// Attempt ceiling and timing for fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Retrieves raw content through an injected transport
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a work item, retrying up to the policy's attempt ceiling
    ///
    /// Each attempt is bounded by its own timeout. Errors from earlier
    /// attempts are logged; only the last one is reported.
    pub async fn fetch(&self, item: &WorkItem) -> Result<RawContent, FetchFailure> {
        let mut last_error = String::new();
        // A hand-built policy may carry zero; every fetch gets one attempt
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let outcome = tokio::time::timeout(self.policy.attempt_timeout, self.transport.fetch(item)).await;

            match outcome {
                Ok(Ok(page)) => {
                    tracing::debug!("Fetched {} ({} bytes) on attempt {}", item, page.body.len(), attempt);
                    return Ok(RawContent {
                        item: item.clone(),
                        url: page.url,
                        body: page.body,
                    });
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.policy.attempt_timeout)
                }
            }

            tracing::warn!("Error loading {} (attempt {}): {}", item, attempt, last_error);

            if attempt < max_attempts && !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        Err(FetchFailure {
            item: item.clone(),
            attempts: max_attempts,
            last_error,
        })
    }
}
