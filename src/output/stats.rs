//! Run statistics and the end-of-run report
//!
//! This module provides the counters the coordinator keeps while a run is
//! in progress and prints them once it finishes.

use crate::extract::FallbackOutcome;
use crate::harvest::HarvestPhase;
use std::time::Duration;

/// How fallback extraction went across a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackCounts {
    pub not_needed: u64,
    pub disabled: u64,
    pub skipped: u64,
    pub enriched: u64,
    pub malformed: u64,
    pub model_failed: u64,
    /// Fields filled by the model, summed over all records
    pub fields_filled: u64,
}

impl FallbackCounts {
    /// Counts one outcome
    pub fn record(&mut self, outcome: &FallbackOutcome) {
        match outcome {
            FallbackOutcome::NotNeeded => self.not_needed += 1,
            FallbackOutcome::Disabled => self.disabled += 1,
            FallbackOutcome::Skipped => self.skipped += 1,
            FallbackOutcome::Enriched { filled } => {
                self.enriched += 1;
                self.fields_filled += filled.len() as u64;
            }
            FallbackOutcome::Malformed => self.malformed += 1,
            FallbackOutcome::ModelFailed => self.model_failed += 1,
        }
    }

    /// Number of model calls actually made
    pub fn calls(&self) -> u64 {
        self.enriched + self.malformed + self.model_failed
    }
}

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    /// Phase the coordinator finished in
    pub phase: HarvestPhase,

    /// Items whose pipeline finished (any outcome)
    pub items_processed: u64,

    /// Items that produced a record
    pub records: u64,

    /// Items whose fetch failed on every attempt
    pub fetch_failures: u64,

    /// Items that fetched blank content
    pub empty_items: u64,

    /// Pipelines that panicked
    pub pipeline_panics: u64,

    /// New items pushed onto the frontier by discovery
    pub items_discovered: u64,

    /// Items still pending when the run ended (non-zero after cancellation)
    pub items_pending: u64,

    pub fallback: FallbackCounts,

    /// Intermediate sink writes
    pub checkpoints: u64,

    /// True if the run stopped early on a cancellation signal
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl HarvestReport {
    /// Share of processed items that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        if self.items_processed == 0 {
            0.0
        } else {
            (self.records as f64 / self.items_processed as f64) * 100.0
        }
    }
}

/// Prints a report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    println!("Overview:");
    println!("  Final phase: {}", report.phase);
    println!("  Items processed: {}", report.items_processed);
    println!("  Records harvested: {}", report.records);
    println!("  Items discovered: {}", report.items_discovered);
    if report.cancelled {
        println!("  Cancelled with {} items pending", report.items_pending);
    }
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    println!("Failures:");
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Empty content: {}", report.empty_items);
    println!("  Pipeline panics: {}", report.pipeline_panics);
    println!();

    let fallback = &report.fallback;
    println!("Fallback Extraction:");
    println!("  Model calls: {}", fallback.calls());
    println!("  Enriched: {} ({} fields filled)", fallback.enriched, fallback.fields_filled);
    println!("  Not needed: {}", fallback.not_needed);
    if fallback.disabled > 0 {
        println!("  Model disabled: {}", fallback.disabled);
    }
    println!("  Skipped (too large): {}", fallback.skipped);
    println!("  Malformed responses: {}", fallback.malformed);
    println!("  Model errors: {}", fallback.model_failed);
    println!();

    println!("Checkpoints written: {}", report.checkpoints);
    println!(
        "Success Rate: {:.1}% ({} / {} items produced a record)",
        report.success_rate(),
        report.records,
        report.items_processed
    );
}
