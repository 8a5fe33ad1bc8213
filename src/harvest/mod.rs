//! Harvest module: running work items through the pipeline
//!
//! This module contains:
//! - The fetch transport seam and its HTTP implementation
//! - Bounded-retry fetching
//! - The per-item fetch → extract → enrich → discover pipeline
//! - Optional model-suggested phrasings for seed queries
//! - The coordinator that drives a run over the frontier

mod coordinator;
mod fetcher;
mod phase;
mod pipeline;
mod queries;
mod transport;

pub use crate::output::HarvestReport;
pub use coordinator::{seed_items, Harvester};
pub use fetcher::{FetchFailure, Fetcher, RawContent, RetryPolicy};
pub use phase::HarvestPhase;
pub use pipeline::{ItemOutcome, Pipeline};
pub use queries::{build_query_prompt, parse_phrasings, QueryExpander, SeedExpansion};
pub use transport::{build_http_client, search_url, FetchedPage, HttpTransport, Transport, TransportError};
