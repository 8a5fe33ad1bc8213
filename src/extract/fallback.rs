//! Model-assisted extraction for fields the rules could not fill
//!
//! This module handles:
//! - Deciding whether a partial record needs a model call at all
//! - Sizing the call so prompt plus response fit the model's context
//! - Waiting on the shared budget gate before calling the model
//! - Parsing the response and merging it into unknown fields only
//!
//! Every failure here is recovered locally. The record is returned as it
//! came in and the outcome says what happened.

use crate::budget::BudgetGate;
use crate::config::ModelConfig;
use crate::extract::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::extract::tokens::{estimate_tokens, response_token_cap};
use crate::model::{CompletionRequest, ModelClient};
use crate::record::{BusinessRecord, Category, RecordField};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Response values treated the same as an absent key
const EMPTY_VALUES: &[&str] = &["", "n/a", "na", "none", "null", "unknown", "not available"];

/// What the fallback extractor did for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Every required field was already known
    NotNeeded,

    /// The run has no model configured
    Disabled,

    /// The call could not fit the context or the budget and was not made
    Skipped,

    /// The model answered; `filled` lists the fields it supplied
    Enriched { filled: Vec<RecordField> },

    /// The response was not a JSON object or array of objects
    Malformed,

    /// The model call itself failed
    ModelFailed,
}

/// Sizing and policy for fallback calls
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    /// Fields whose absence triggers a call; category is always included
    pub required: Vec<RecordField>,
    pub context_tokens: u32,
    pub response_reserve: u32,
    pub max_response_tokens: u32,
    pub content_char_limit: usize,
    pub temperature: f32,
}

impl FallbackSettings {
    /// Builds settings from the `[model]` config section
    ///
    /// Field names were checked during config validation; any that do not
    /// parse are ignored here.
    pub fn from_config(config: &ModelConfig) -> Self {
        let mut required: Vec<RecordField> = config
            .required_fields
            .iter()
            .filter_map(|f| RecordField::parse(f))
            .collect();
        if !required.contains(&RecordField::Category) {
            required.insert(0, RecordField::Category);
        }

        Self {
            required,
            context_tokens: config.context_tokens,
            response_reserve: config.response_reserve,
            max_response_tokens: config.max_response_tokens,
            content_char_limit: config.content_char_limit,
            temperature: config.temperature,
        }
    }
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

/// Second extraction tier, shared by every pipeline in a run
pub struct FallbackExtractor {
    model: Arc<dyn ModelClient>,
    gate: Arc<BudgetGate>,
    settings: FallbackSettings,
}

impl FallbackExtractor {
    pub fn new(model: Arc<dyn ModelClient>, gate: Arc<BudgetGate>, settings: FallbackSettings) -> Self {
        Self {
            model,
            gate,
            settings,
        }
    }

    /// Returns the required fields still unknown on `record`
    pub fn missing_fields(&self, record: &BusinessRecord) -> Vec<RecordField> {
        record.unknown_fields(&self.settings.required)
    }

    /// Returns true if a model call would be attempted for `record`
    pub fn needs_enrichment(&self, record: &BusinessRecord) -> bool {
        !self.missing_fields(record).is_empty()
    }

    /// Fills unknown fields of `record` from a model completion
    ///
    /// # Arguments
    ///
    /// * `record` - Partial record from structured extraction
    /// * `content` - Raw page content the record was extracted from
    ///
    /// # Returns
    ///
    /// The (possibly enriched) record and what happened. Fields that were
    /// known on entry are never changed.
    pub async fn enrich(
        &self,
        mut record: BusinessRecord,
        content: &str,
    ) -> (BusinessRecord, FallbackOutcome) {
        let missing = self.missing_fields(&record);
        if missing.is_empty() {
            return (record, FallbackOutcome::NotNeeded);
        }

        let prompt = build_prompt(content, self.settings.content_char_limit, &missing);
        let tokens_needed = estimate_tokens(SYSTEM_PROMPT)
            + estimate_tokens(&prompt)
            + u64::from(self.settings.response_reserve);

        let Some(max_tokens) = response_token_cap(
            self.settings.context_tokens,
            tokens_needed,
            self.settings.max_response_tokens,
        ) else {
            tracing::warn!(
                "Skipping model call for {}: {} tokens leave no room for a response",
                record.source_url,
                tokens_needed
            );
            return (record, FallbackOutcome::Skipped);
        };

        if tokens_needed > self.gate.tokens_per_window() {
            tracing::warn!(
                "Skipping model call for {}: {} tokens exceed the {} token window",
                record.source_url,
                tokens_needed,
                self.gate.tokens_per_window()
            );
            return (record, FallbackOutcome::Skipped);
        }

        tracing::info!(
            "Using model to fill missing fields ({}) for: {}",
            missing
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            record.name
        );

        // Holds a concurrency slot until the model has answered
        let acquisition = self.gate.acquire(Some(tokens_needed)).await;
        if acquisition.was_delayed() {
            tracing::debug!("Waited {:?} for model budget", acquisition.waited);
        }

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens,
            temperature: self.settings.temperature,
        };

        let response = match self.model.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Model extraction error for {}: {}", record.source_url, e);
                return (record, FallbackOutcome::ModelFailed);
            }
        };
        drop(acquisition);

        let Some(fields) = parse_response(&response) else {
            tracing::warn!("Model returned malformed JSON: {}", response);
            return (record, FallbackOutcome::Malformed);
        };

        let filled = merge_unknown(&mut record, &fields);
        tracing::debug!("Model filled {} field(s) for {}", filled.len(), record.name);
        (record, FallbackOutcome::Enriched { filled })
    }
}

/// Parses a model response into a field map
///
/// Accepts an object, or an array whose first object is used. Markdown
/// code fences and text around the JSON are tolerated. Keys are lowercased
/// with spaces and dashes folded to underscores.
pub fn parse_response(response: &str) -> Option<Map<String, Value>> {
    let text = strip_code_fence(response.trim());

    let value = serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| embedded_json(text))?;

    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => items.into_iter().find_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })?,
        _ => return None,
    };

    Some(
        object
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect(),
    )
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

/// Finds the outermost JSON object or array inside surrounding prose
fn embedded_json(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Returns the first usable string value under any of the keys
fn response_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let text = match fields.get(*key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(items) => items.iter().find_map(Value::as_str)?.trim().to_string(),
            _ => return None,
        };
        if EMPTY_VALUES.contains(&text.to_lowercase().as_str()) {
            None
        } else {
            Some(text)
        }
    })
}

/// Copies response values into fields that are still unknown
///
/// Returns the fields that were filled.
pub fn merge_unknown(record: &mut BusinessRecord, fields: &Map<String, Value>) -> Vec<RecordField> {
    let mut filled = Vec::new();

    if let Some(name) = response_text(fields, &["name", "business_name"]) {
        if record.fill_name(&name) {
            filled.push(RecordField::Name);
        }
    }

    if let Some(label) = response_text(fields, &["category"]) {
        match Category::parse(&label) {
            Some(category) => {
                if record.category.fill(category) {
                    filled.push(RecordField::Category);
                }
            }
            None => tracing::debug!("Ignoring category outside the taxonomy: {}", label),
        }
    }

    let text_fields = [
        (RecordField::Phone, &["phone", "phone_number"][..]),
        (RecordField::Email, &["email", "emails"][..]),
        (RecordField::Address, &["address"][..]),
        (RecordField::Website, &["website", "website_url"][..]),
        (RecordField::Description, &["description"][..]),
    ];

    for (field, keys) in text_fields {
        let Some(value) = response_text(fields, keys) else {
            continue;
        };
        let slot = match field {
            RecordField::Phone => &mut record.phone,
            RecordField::Email => &mut record.email,
            RecordField::Address => &mut record.address,
            RecordField::Website => &mut record.website,
            _ => &mut record.description,
        };
        if slot.fill(value) {
            filled.push(field);
        }
    }

    let social = ["social_media", "social_links", "social_media_links"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_object));

    // Social links count as one field: a known set is never extended
    if let Some(links) = social.filter(|_| record.social_links.is_empty()) {
        for (platform, url) in links {
            if let Some(url) = url.as_str() {
                if !EMPTY_VALUES.contains(&url.trim().to_lowercase().as_str()) {
                    record.fill_social_link(platform, url);
                }
            }
        }
        if !record.social_links.is_empty() {
            filled.push(RecordField::SocialLinks);
        }
    }

    filled
}
