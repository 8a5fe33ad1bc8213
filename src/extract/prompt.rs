//! Prompt construction for fallback extraction

use crate::record::{Category, RecordField};

/// System message sent with every fallback call
pub const SYSTEM_PROMPT: &str = "Extract structured business data as JSON. \
Respond with a single JSON object, or a JSON array of objects, and nothing else.";

/// Truncates `text` to at most `limit` characters, on a char boundary
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the user prompt asking the model for the missing fields
///
/// The raw content is cut to `char_limit` characters to bound cost. The
/// schema always lists every record field so the model can fill anything
/// left unknown; `missing` is called out explicitly.
pub fn build_prompt(content: &str, char_limit: usize, missing: &[RecordField]) -> String {
    let missing_list = missing
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Extract business information from the following page. Return a JSON object:
{{
    "name": "Business name",
    "category": "One of {taxonomy}",
    "phone": "Phone number if available",
    "email": "Email if available",
    "address": "Street address if available",
    "website": "Website URL if available",
    "description": "Short description of services",
    "social_media": {{"Facebook": "url", "Instagram": "url"}}
}}
Use null for anything the page does not state. The fields still missing are: {missing}.
CONTENT: {content}"#,
        taxonomy = Category::taxonomy_list(),
        missing = missing_list,
        content = truncate_chars(content, char_limit),
    )
}
