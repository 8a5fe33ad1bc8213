//! Two-tier extraction of business records
//!
//! This module contains:
//! - `StructuredExtractor`, deterministic selector and payload rules
//! - `FallbackExtractor`, budgeted model calls for fields left unknown
//! - Prompt construction and token accounting for those calls

mod fallback;
mod prompt;
mod rules;
mod structured;
mod tokens;

pub use fallback::{
    merge_unknown, parse_response, FallbackExtractor, FallbackOutcome, FallbackSettings,
};
pub use prompt::{build_prompt, truncate_chars, SYSTEM_PROMPT};
pub use rules::ExtractionRules;
pub use structured::StructuredExtractor;
pub use tokens::{estimate_tokens, response_token_cap};
