//! Harvest coordinator - main harvest loop
//!
//! This module contains the loop that drives a run:
//! - Claiming items from the frontier and running their pipelines on a
//!   bounded worker pool
//! - Accumulating records and pushing discovered items back
//! - Periodic checkpoints of the cumulative record list
//! - Stopping on cancellation and handing the records to the sink once

use crate::budget::BudgetGate;
use crate::config::{Config, Credentials, SeedConfig};
use crate::extract::{ExtractionRules, FallbackExtractor, FallbackSettings, StructuredExtractor};
use crate::frontier::{Frontier, KeywordDiscovery, WorkItem};
use crate::harvest::fetcher::{Fetcher, RetryPolicy};
use crate::harvest::phase::HarvestPhase;
use crate::harvest::pipeline::{ItemOutcome, Pipeline};
use crate::harvest::queries::{QueryExpander, SeedExpansion};
use crate::harvest::transport::HttpTransport;
use crate::model::{ModelClient, OpenAiClient};
use crate::output::{HarvestReport, RecordSink};
use crate::record::BusinessRecord;
use crate::{ConfigError, HarvestError, UrlError};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Coordinates one harvest run
pub struct Harvester {
    pipeline: Arc<Pipeline>,
    frontier: Arc<Frontier>,
    workers: usize,
    checkpoint_every: usize,
    cancel: CancellationToken,
    phase: HarvestPhase,
    expansion: Option<SeedExpansion>,
}

impl Harvester {
    /// Creates a harvester from already-built components
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Per-item pipeline shared by all workers
    /// * `frontier` - Seeded frontier
    /// * `workers` - Maximum number of pipelines in flight (at least 1)
    /// * `checkpoint_every` - Completed items between checkpoints; 0 disables them
    pub fn new(pipeline: Pipeline, frontier: Frontier, workers: usize, checkpoint_every: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            frontier: Arc::new(frontier),
            workers: workers.max(1),
            checkpoint_every,
            cancel: CancellationToken::new(),
            phase: HarvestPhase::Idle,
            expansion: None,
        }
    }

    /// Queues seed pairs to be phrased by the model when the run starts
    ///
    /// The resulting items are pushed onto the frontier before any item is
    /// claimed.
    pub fn with_seed_expansion(mut self, expansion: SeedExpansion) -> Self {
        self.expansion = Some(expansion);
        self
    }

    /// Builds a harvester with HTTP transport and, if enabled, an OpenAI
    /// fallback behind a shared budget gate
    ///
    /// Credentials must already be resolved; a model enabled without a key
    /// is a configuration error.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, HarvestError> {
        let transport = HttpTransport::new(&config.fetcher, credentials.proxy.as_ref())?;
        let fetcher = Fetcher::new(
            Arc::new(transport),
            RetryPolicy::from_config(&config.fetcher),
        );

        let structured = StructuredExtractor::new(ExtractionRules::from_config(&config.extraction)?);

        let mut expansion = None;

        let fallback = if config.model.enabled {
            let api_key = credentials
                .model_api_key
                .as_deref()
                .ok_or_else(|| ConfigError::MissingCredential(config.model.api_key_env.clone()))?;
            let client = OpenAiClient::from_config(&config.model, api_key)?;
            let gate = Arc::new(BudgetGate::from_config(&config.budget));

            tracing::info!(
                "Fallback extraction enabled with model {} ({} tokens / {} requests per {}s)",
                client.model(),
                config.budget.tokens_per_window,
                config.budget.requests_per_window,
                config.budget.window_secs
            );

            let client: Arc<dyn ModelClient> = Arc::new(client);
            if config.model.expand_queries {
                let pairs = seed_pairs(&config.seeds);
                tracing::info!("Expanding {} seed queries with the model", pairs.len());
                expansion = Some(SeedExpansion::new(
                    QueryExpander::new(Arc::clone(&client), Arc::clone(&gate), config.model.temperature),
                    pairs,
                ));
            }

            Some(Arc::new(FallbackExtractor::new(
                client,
                gate,
                FallbackSettings::from_config(&config.model),
            )))
        } else {
            tracing::info!("Fallback extraction disabled");
            None
        };

        let discovery = Arc::new(KeywordDiscovery::new(&config.discovery.keywords));
        let pipeline = Pipeline::new(fetcher, structured, fallback, discovery);

        // Query pairs are seeded by the expansion when it runs
        let seeds = if expansion.is_some() {
            seed_urls(&config.seeds)?
        } else {
            seed_items(&config.seeds)?
        };
        let frontier = Frontier::with_seeds(seeds);
        tracing::info!("Seeded frontier with {} items", frontier.pending_len());

        let harvester = Self::new(
            pipeline,
            frontier,
            config.harvester.workers,
            config.harvester.checkpoint_every,
        );

        Ok(match expansion {
            Some(expansion) => harvester.with_seed_expansion(expansion),
            None => harvester,
        })
    }

    /// Returns a token that stops the run when cancelled
    ///
    /// After cancellation no new item is claimed. Pipelines already in
    /// flight run to completion (each bounded by its fetch timeouts) and
    /// their records are kept.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the frontier shared with the pipelines
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Returns the current phase
    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    /// Runs the harvest until the frontier is exhausted or the run is cancelled
    ///
    /// Per-item failures are logged and counted but never end the run. The
    /// accumulated records are written to `sink` exactly once on the way
    /// out, even when they are empty. Checkpoint writes before that use the
    /// cumulative list and do not fail the run.
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - The run finished and the final write succeeded
    /// * `Err(HarvestError)` - The harvester was already used, or the final write failed
    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> Result<HarvestReport, HarvestError> {
        self.phase.advance(HarvestPhase::Running)?;

        let start_time = Instant::now();

        if let Some(expansion) = self.expansion.take() {
            let pairs = expansion.pair_count();
            let cancel = self.cancel.clone();
            let mut added = 0;
            for item in expansion.expand(|| cancel.is_cancelled()).await {
                if self.frontier.push(item) {
                    added += 1;
                }
            }
            tracing::info!("Seed expansion turned {} pairs into {} queries", pairs, added);
        }

        let mut report = HarvestReport::default();
        let mut records: Vec<BusinessRecord> = Vec::new();
        let mut tasks: JoinSet<(WorkItem, ItemOutcome)> = JoinSet::new();

        tracing::info!(
            "Starting harvest with {} workers, {} items pending",
            self.workers,
            self.frontier.pending_len()
        );

        loop {
            if !self.cancel.is_cancelled() {
                while tasks.len() < self.workers {
                    let Some(item) = self.frontier.claim_next() else {
                        break;
                    };

                    tracing::debug!("Claimed {}", item);
                    let pipeline = Arc::clone(&self.pipeline);
                    tasks.spawn(async move {
                        let outcome = pipeline.run(item.clone()).await;
                        (item, outcome)
                    });
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            report.items_processed += 1;

            match joined {
                Ok((item, outcome)) => {
                    self.handle_outcome(&item, outcome, &mut records, &mut report);
                }
                Err(e) => {
                    report.pipeline_panics += 1;
                    tracing::error!("Pipeline task failed: {}", e);
                }
            }

            let more_work = !tasks.is_empty() || !self.frontier.is_empty();
            if self.checkpoint_due(report.items_processed) && more_work {
                match sink.write(&records) {
                    Ok(()) => {
                        report.checkpoints += 1;
                        tracing::debug!("Checkpoint of {} records written", records.len());
                    }
                    Err(e) => tracing::warn!("Checkpoint write failed: {}", e),
                }
            }

            if report.items_processed % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = report.items_processed as f64 / elapsed.as_secs_f64();
                tracing::info!(
                    "Progress: {} items processed, {} records, {} in frontier, {:.2} items/sec",
                    report.items_processed,
                    records.len(),
                    self.frontier.pending_len(),
                    rate
                );
            }
        }

        self.phase.advance(HarvestPhase::Draining)?;

        report.cancelled = self.cancel.is_cancelled();
        report.items_pending = self.frontier.pending_len() as u64;
        if report.cancelled {
            tracing::warn!(
                "Harvest cancelled with {} items still pending",
                report.items_pending
            );
        }

        let written = sink.write(&records);

        self.phase.advance(HarvestPhase::Done)?;
        report.phase = self.phase;
        report.records = records.len() as u64;
        report.elapsed = start_time.elapsed();

        if let Err(e) = written {
            tracing::error!("Final write of {} records failed: {}", records.len(), e);
            return Err(e.into());
        }

        tracing::info!(
            "Harvest completed: {} items processed, {} records in {:?}",
            report.items_processed,
            report.records,
            report.elapsed
        );

        Ok(report)
    }

    fn checkpoint_due(&self, items_processed: u64) -> bool {
        self.checkpoint_every > 0 && items_processed % self.checkpoint_every as u64 == 0
    }

    /// Folds one pipeline outcome into the run state
    fn handle_outcome(
        &self,
        item: &WorkItem,
        outcome: ItemOutcome,
        records: &mut Vec<BusinessRecord>,
        report: &mut HarvestReport,
    ) {
        match outcome {
            ItemOutcome::Harvested {
                record,
                fallback,
                discovered,
            } => {
                let mut added = 0;
                for next in discovered {
                    if self.frontier.push(next) {
                        added += 1;
                    }
                }

                tracing::info!(
                    "Harvested {} from {} ({} new items discovered)",
                    record.name,
                    item,
                    added
                );

                report.items_discovered += added;
                report.fallback.record(&fallback);
                records.push(record);
            }
            ItemOutcome::Empty => {
                report.empty_items += 1;
                tracing::info!("No content for {}", item);
            }
            ItemOutcome::FetchFailed(failure) => {
                report.fetch_failures += 1;
                tracing::warn!("Skipping {}", failure);
            }
        }
    }
}

/// Expands the `[seeds]` section into work items
///
/// URL seeds come first, followed by one query per (location, category)
/// pair.
pub fn seed_items(seeds: &SeedConfig) -> Result<Vec<WorkItem>, UrlError> {
    let mut items = seed_urls(seeds)?;
    items.reserve(seeds.item_count() - items.len());

    for (location, category) in seed_pairs(seeds) {
        items.push(WorkItem::query(&location, &category));
    }

    Ok(items)
}

fn seed_urls(seeds: &SeedConfig) -> Result<Vec<WorkItem>, UrlError> {
    seeds.urls.iter().map(|url| WorkItem::url(url)).collect()
}

/// Every (location, category) pair, locations outermost
fn seed_pairs(seeds: &SeedConfig) -> Vec<(String, String)> {
    seeds
        .locations
        .iter()
        .flat_map(|location| {
            seeds
                .categories
                .iter()
                .map(move |category| (location.clone(), category.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StructuredExtractor;
    use crate::harvest::transport::{FetchedPage, Transport, TransportError};
    use crate::output::MemorySink;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Serves fixed bodies by URL; anything else fails with a 500
    struct PageMap {
        pages: HashMap<String, String>,
    }

    impl PageMap {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Transport for PageMap {
        async fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, TransportError> {
            let url = item
                .as_url()
                .cloned()
                .ok_or_else(|| TransportError::NoSearchTemplate(item.key()))?;

            match self.pages.get(url.as_str()) {
                Some(body) => Ok(FetchedPage {
                    url,
                    body: body.clone(),
                }),
                None => Err(TransportError::Status {
                    status: 500,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn harvester(pages: &[(&str, &str)], seeds: &[&str], workers: usize, checkpoint_every: usize) -> Harvester {
        let policy = RetryPolicy {
            max_attempts: 1,
            attempt_timeout: Duration::from_secs(5),
            retry_delay: Duration::ZERO,
        };
        let fetcher = Fetcher::new(Arc::new(PageMap::new(pages)), policy);
        let pipeline = Pipeline::new(
            fetcher,
            StructuredExtractor::default(),
            None,
            Arc::new(KeywordDiscovery::new(["wellness"])),
        );
        let frontier = Frontier::with_seeds(seeds.iter().map(|s| WorkItem::url(s).unwrap()));
        Harvester::new(pipeline, frontier, workers, checkpoint_every)
    }

    fn page(name: &str) -> String {
        format!("<html><head><title>{}</title></head><body></body></html>", name)
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_run() {
        let bodies: Vec<String> = (1..=5).map(|i| page(&format!("Spa {}", i))).collect();
        let pages = [
            ("https://a.example/1", bodies[0].as_str()),
            ("https://a.example/2", bodies[1].as_str()),
            ("https://a.example/4", bodies[3].as_str()),
            ("https://a.example/5", bodies[4].as_str()),
        ];
        let seeds = [
            "https://a.example/1",
            "https://a.example/2",
            "https://a.example/3",
            "https://a.example/4",
            "https://a.example/5",
        ];
        let mut harvester = harvester(&pages, &seeds, 2, 0);
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        assert_eq!(report.items_processed, 5);
        assert_eq!(report.records, 4);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.phase, HarvestPhase::Done);
        assert_eq!(sink.write_count(), 1);

        let mut names: Vec<String> = sink.last_write().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, vec!["Spa 1", "Spa 2", "Spa 4", "Spa 5"]);
    }

    #[tokio::test]
    async fn test_discovered_items_are_harvested_once() {
        let hub = r#"<html><head><title>Hub</title></head><body>
            <a href="/wellness/b">B</a>
            <a href="/wellness/c">C</a>
            <a href="/wellness/b">B again</a>
            <a href="/shop/d">D</a>
        </body></html>"#;
        let back_link = r#"<html><head><title>B</title></head><body>
            <a href="https://dir.example/wellness">Back</a></body></html>"#;
        let c_page = page("C");
        let pages = [
            ("https://dir.example/wellness", hub),
            ("https://dir.example/wellness/b", back_link),
            ("https://dir.example/wellness/c", c_page.as_str()),
        ];
        let mut harvester = harvester(&pages, &["https://dir.example/wellness"], 4, 0);
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        assert_eq!(report.items_processed, 3);
        assert_eq!(report.records, 3);
        assert_eq!(report.items_discovered, 2);

        let mut visited = harvester.frontier().visited_keys();
        visited.sort();
        assert_eq!(
            visited,
            vec![
                "https://dir.example/wellness",
                "https://dir.example/wellness/b",
                "https://dir.example/wellness/c",
            ]
        );
        assert!(harvester.frontier().is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_still_write_sink() {
        let mut harvester = harvester(&[], &["https://a.example/1", "https://a.example/2"], 2, 0);
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        assert_eq!(report.fetch_failures, 2);
        assert_eq!(report.records, 0);
        assert_eq!(sink.write_count(), 1);
        assert!(sink.last_write().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoints_are_cumulative() {
        let bodies: Vec<String> = (1..=5).map(|i| page(&format!("Spa {}", i))).collect();
        let urls: Vec<String> = (1..=5).map(|i| format!("https://a.example/{}", i)).collect();
        let pages: Vec<(&str, &str)> = urls
            .iter()
            .zip(&bodies)
            .map(|(u, b)| (u.as_str(), b.as_str()))
            .collect();
        let seeds: Vec<&str> = urls.iter().map(String::as_str).collect();
        let mut harvester = harvester(&pages, &seeds, 1, 2);
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        assert_eq!(report.checkpoints, 2);
        assert_eq!(sink.write_sizes(), vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_cancelled_run_claims_nothing() {
        let body = page("Spa");
        let mut harvester = harvester(
            &[("https://a.example/1", body.as_str())],
            &["https://a.example/1", "https://a.example/2"],
            2,
            0,
        );
        harvester.cancellation_token().cancel();
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.items_processed, 0);
        assert_eq!(report.items_pending, 2);
        assert_eq!(report.phase, HarvestPhase::Done);
        assert_eq!(sink.write_count(), 1);
    }

    /// Suggests the same two phrasings for every pair
    struct PhrasingModel;

    #[async_trait]
    impl crate::model::ModelClient for PhrasingModel {
        async fn complete(
            &self,
            _request: &crate::model::CompletionRequest,
        ) -> Result<String, crate::model::ModelError> {
            Ok("1. massage Skopje\n2. масажа Скопје".to_string())
        }
    }

    #[tokio::test]
    async fn test_seed_expansion_runs_before_claiming() {
        let gate = Arc::new(BudgetGate::new(10_000, 30, Duration::from_secs(60), 2));
        let expansion = SeedExpansion::new(
            QueryExpander::new(Arc::new(PhrasingModel), gate.clone(), 0.2),
            vec![("Skopje".to_string(), "Massage".to_string())],
        );
        let mut harvester = harvester(&[], &[], 2, 0).with_seed_expansion(expansion);
        let mut sink = MemorySink::new();

        let report = harvester.run(&mut sink).await.unwrap();

        // The test transport cannot serve queries, so both fail after being claimed
        assert_eq!(report.items_processed, 2);
        assert_eq!(report.fetch_failures, 2);
        assert_eq!(
            harvester.frontier().visited_keys(),
            vec![
                "query:massage@skopje/massage skopje".to_string(),
                "query:massage@skopje/масажа скопје".to_string(),
            ]
        );
        assert_eq!(gate.snapshot().await.requests_made, 1);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let mut harvester = harvester(&[], &["https://a.example/1"], 1, 0);
        let mut sink = MemorySink::new();

        harvester.run(&mut sink).await.unwrap();
        let second = harvester.run(&mut sink).await;

        assert!(matches!(
            second,
            Err(HarvestError::InvalidTransition {
                from: HarvestPhase::Done,
                to: HarvestPhase::Running
            })
        ));
        assert_eq!(sink.write_count(), 1);
    }

    #[test]
    fn test_seed_items() {
        let seeds = SeedConfig {
            urls: vec!["https://Dir.Example/wellness/".to_string()],
            locations: vec!["Skopje".to_string(), "Bitola".to_string()],
            categories: vec!["Massage".to_string()],
        };
        let items = seed_items(&seeds).unwrap();

        assert_eq!(items.len(), 3);
        assert!(items[0].as_url().is_some());
        assert_eq!(items[1], WorkItem::query("Skopje", "Massage"));
        assert_eq!(items[2], WorkItem::query("Bitola", "Massage"));
    }

    #[test]
    fn test_seed_items_rejects_bad_url() {
        let seeds = SeedConfig {
            urls: vec!["not a url".to_string()],
            ..Default::default()
        };
        assert!(seed_items(&seeds).is_err());
    }
}
