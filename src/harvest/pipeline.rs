//! The fetch → extract → enrich → discover pipeline for one work item

use crate::extract::{FallbackExtractor, FallbackOutcome, StructuredExtractor};
use crate::frontier::{discover_items, DiscoveryPolicy, WorkItem};
use crate::harvest::fetcher::{FetchFailure, Fetcher};
use crate::record::BusinessRecord;
use std::sync::Arc;

/// Result of running the pipeline for one item
#[derive(Debug)]
pub enum ItemOutcome {
    /// Content was fetched and produced a record
    Harvested {
        record: BusinessRecord,
        fallback: FallbackOutcome,
        discovered: Vec<WorkItem>,
    },

    /// Content was fetched but blank, so no record was built
    Empty,

    /// Every fetch attempt failed
    FetchFailed(FetchFailure),
}

/// Everything one item needs, shared by all workers of a run
pub struct Pipeline {
    fetcher: Fetcher,
    structured: StructuredExtractor,
    fallback: Option<Arc<FallbackExtractor>>,
    discovery: Arc<dyn DiscoveryPolicy>,
}

impl Pipeline {
    /// Creates a pipeline; pass `None` for `fallback` to run without a model
    pub fn new(
        fetcher: Fetcher,
        structured: StructuredExtractor,
        fallback: Option<Arc<FallbackExtractor>>,
        discovery: Arc<dyn DiscoveryPolicy>,
    ) -> Self {
        Self {
            fetcher,
            structured,
            fallback,
            discovery,
        }
    }

    /// Runs the pipeline for `item`
    ///
    /// Never fails: fetch failures are returned as an outcome, and the
    /// extractors recover from everything else themselves.
    pub async fn run(&self, item: WorkItem) -> ItemOutcome {
        let raw = match self.fetcher.fetch(&item).await {
            Ok(raw) => raw,
            Err(failure) => return ItemOutcome::FetchFailed(failure),
        };

        if raw.is_empty() {
            tracing::debug!("Empty content for {}", item);
            return ItemOutcome::Empty;
        }

        let record = self.structured.extract(&raw);

        let (record, fallback) = match &self.fallback {
            Some(extractor) => extractor.enrich(record, &raw.body).await,
            None => (record, FallbackOutcome::Disabled),
        };

        let discovered = discover_items(&raw.body, Some(&raw.url), self.discovery.as_ref());

        ItemOutcome::Harvested {
            record,
            fallback,
            discovered,
        }
    }
}
