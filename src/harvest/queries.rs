//! Model-suggested search phrasings for seed queries
//!
//! Before a run starts, each (location, category) seed can be turned into a
//! couple of search phrasings by the model. The calls go through the same
//! budget gate as fallback extraction. Any failure falls back to the plain
//! query for that pair.

use crate::budget::BudgetGate;
use crate::extract::estimate_tokens;
use crate::frontier::WorkItem;
use crate::model::{CompletionRequest, ModelClient};
use std::sync::Arc;

/// System message sent with every expansion call
pub const QUERY_SYSTEM_PROMPT: &str = "You are a local business search expert.";

/// Response tokens allowed for a list of phrasings
const QUERY_RESPONSE_TOKENS: u32 = 100;

/// Phrasings kept per (location, category) pair
pub const MAX_PHRASINGS: usize = 2;

/// Builds the expansion prompt for one pair
pub fn build_query_prompt(location: &str, category: &str) -> String {
    format!(
        "Generate {count} effective search queries to find {category} businesses in {location}.\n\
         Include one query in English and one in the local language.\n\
         Return only the queries, one per line. Keep queries short and specific.",
        count = MAX_PHRASINGS,
        category = category,
        location = location,
    )
}

/// Splits a model response into distinct search phrasings
///
/// List markers ("1.", "2)", "-", "*") and surrounding quotes are removed.
/// At most [`MAX_PHRASINGS`] are returned.
pub fn parse_phrasings(response: &str) -> Vec<String> {
    let mut phrasings: Vec<String> = Vec::new();

    for line in response.lines() {
        let line = strip_list_marker(line.trim())
            .trim()
            .trim_matches(['"', '\'', '`'])
            .trim();

        if line.is_empty() {
            continue;
        }
        if phrasings.iter().any(|p| p.eq_ignore_ascii_case(line)) {
            continue;
        }

        phrasings.push(line.to_string());
        if phrasings.len() == MAX_PHRASINGS {
            break;
        }
    }

    phrasings
}

fn strip_list_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < line.len() {
        return rest.strip_prefix(['.', ')']).unwrap_or(line);
    }
    line.strip_prefix(['-', '*']).unwrap_or(line)
}

/// Turns seed pairs into phrased search items through the model
pub struct QueryExpander {
    model: Arc<dyn ModelClient>,
    gate: Arc<BudgetGate>,
    temperature: f32,
}

impl QueryExpander {
    pub fn new(model: Arc<dyn ModelClient>, gate: Arc<BudgetGate>, temperature: f32) -> Self {
        Self {
            model,
            gate,
            temperature,
        }
    }

    /// Returns the work items to search for one (location, category) pair
    ///
    /// # Returns
    ///
    /// One phrased query per suggestion, or the plain query when the call
    /// cannot fit the budget, fails, or suggests nothing usable.
    pub async fn expand(&self, location: &str, category: &str) -> Vec<WorkItem> {
        let literal = || vec![WorkItem::query(location, category)];

        let prompt = build_query_prompt(location, category);
        let tokens_needed = estimate_tokens(QUERY_SYSTEM_PROMPT)
            + estimate_tokens(&prompt)
            + u64::from(QUERY_RESPONSE_TOKENS);

        if tokens_needed > self.gate.tokens_per_window() {
            tracing::warn!(
                "Not expanding {} in {}: {} tokens exceed the token window",
                category,
                location,
                tokens_needed
            );
            return literal();
        }

        let request = CompletionRequest {
            system: QUERY_SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: QUERY_RESPONSE_TOKENS,
            temperature: self.temperature,
        };

        let acquisition = self.gate.acquire(Some(tokens_needed)).await;
        let response = self.model.complete(&request).await;
        drop(acquisition);

        let phrasings = match response {
            Ok(text) => parse_phrasings(&text),
            Err(e) => {
                tracing::error!("Error generating queries for {} in {}: {}", category, location, e);
                return literal();
            }
        };

        if phrasings.is_empty() {
            tracing::warn!("Model suggested no queries for {} in {}", category, location);
            return literal();
        }

        tracing::info!(
            "Generated queries for {} in {}: {}",
            category,
            location,
            phrasings.join(" | ")
        );

        phrasings
            .iter()
            .map(|terms| WorkItem::search(location, category, terms))
            .collect()
    }
}

/// Seed pairs waiting to be expanded when a run starts
pub struct SeedExpansion {
    expander: QueryExpander,
    pairs: Vec<(String, String)>,
}

impl SeedExpansion {
    pub fn new(expander: QueryExpander, pairs: Vec<(String, String)>) -> Self {
        Self { expander, pairs }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Expands every pair in order
    ///
    /// Pairs left when `stop` returns true are kept as plain queries so no
    /// seed is lost.
    pub async fn expand(self, stop: impl Fn() -> bool) -> Vec<WorkItem> {
        let mut items = Vec::new();

        for (location, category) in &self.pairs {
            if stop() {
                items.push(WorkItem::query(location, category));
            } else {
                items.extend(self.expander.expand(location, category).await);
            }
        }

        items
    }
}
