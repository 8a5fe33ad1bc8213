//! Deterministic extraction of business records
//!
//! This module handles:
//! - HTML pages, via selector lists with the earliest match in the document winning
//! - JSON listing payloads returned by directory and places APIs
//! - Leaving every field it cannot find explicitly unknown

use crate::extract::rules::{
    social_platform, ExtractionRules, EMAIL_PATTERN, MAP_LINK_MARKERS, PHONE_PATTERN,
};
use crate::harvest::RawContent;
use crate::record::{BusinessRecord, Category, Field};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

/// Array keys under which API payloads nest their listings
const PAYLOAD_LIST_KEYS: &[&str] = &["local_results", "results", "data"];

/// Element types scanned for a text block mentioning an address
const ADDRESS_BLOCK_TAGS: &[&str] = &["p", "span", "div", "li", "td"];

/// Rule-based extractor producing a partial record from raw content
#[derive(Debug, Clone, Default)]
pub struct StructuredExtractor {
    rules: ExtractionRules,
}

impl StructuredExtractor {
    /// Creates an extractor with the given rules
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    /// Extracts a record from fetched content
    ///
    /// Content that parses as a JSON object or array is read as an API
    /// payload; anything else is parsed as HTML. Never fails: missing
    /// fields stay unknown and a missing name becomes the sentinel.
    pub fn extract(&self, raw: &RawContent) -> BusinessRecord {
        let source_url = raw.url.as_str();

        let mut record = match parse_payload(&raw.body) {
            Some(listing) => extract_payload(&listing, source_url),
            None => self.extract_html(&raw.body, &raw.url),
        };

        if let Some(location) = raw.item.location() {
            record.location = Field::from_text(Some(location));
        }

        // A directory query was run for a known category
        if let crate::frontier::WorkItem::Query { category, .. } = &raw.item {
            if let Some(category) = Category::parse(category) {
                record.category.fill(category);
            }
        }

        record
    }

    fn extract_html(&self, html: &str, page_url: &Url) -> BusinessRecord {
        let document = Html::parse_document(html);

        let name = first_text(&document, &self.rules.name);
        let mut record = BusinessRecord::new(name.as_deref(), page_url.as_str());

        record.phone = Field::from_text(
            self.first_phone(&document)
                .or_else(|| scan_pattern(&document, &PHONE_PATTERN))
                .as_deref(),
        );

        record.email = Field::from_text(
            self.first_email(&document)
                .or_else(|| scan_pattern(&document, &EMAIL_PATTERN))
                .as_deref(),
        );

        record.address = Field::from_text(
            first_text(&document, &self.rules.address)
                .or_else(|| address_block(&document))
                .or_else(|| map_link(&document))
                .as_deref(),
        );

        record.description = Field::from_text(meta_description(&document).as_deref());

        for (platform, url) in social_links(&document, page_url) {
            record.fill_social_link(platform, &url);
        }

        record
    }

    fn first_phone(&self, document: &Html) -> Option<String> {
        matching_elements(document, &self.rules.phone).find_map(|element| {
            element
                .value()
                .attr("href")
                .and_then(|h| h.strip_prefix("tel:"))
                .map(str::trim)
                .filter(|number| !number.is_empty())
                .map(str::to_string)
                .or_else(|| element_text(element))
        })
    }

    fn first_email(&self, document: &Html) -> Option<String> {
        matching_elements(document, &self.rules.email).find_map(|element| {
            element
                .value()
                .attr("href")
                .and_then(|h| h.strip_prefix("mailto:"))
                .map(|address| address.split('?').next().unwrap_or_default().trim())
                .filter(|address| !address.is_empty())
                .map(str::to_string)
                .or_else(|| element_text(element))
        })
    }
}

/// Elements matching any of the selectors, in document order
fn matching_elements<'a>(
    document: &'a Html,
    selectors: &'a [Selector],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |element| selectors.iter().any(|selector| selector.matches(element)))
}

/// Collapses the element's text into single-spaced form, None if blank
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Returns the text of the earliest non-blank element matching any selector
fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    matching_elements(document, selectors).find_map(element_text)
}

/// Scans the body text for the first match of a pattern
fn scan_pattern(document: &Html, pattern: &regex::Regex) -> Option<String> {
    let body = Selector::parse("body").ok()?;
    let root = document.select(&body).next().unwrap_or_else(|| document.root_element());
    let text = root.text().collect::<Vec<_>>().join(" ");
    pattern.find(&text).map(|m| m.as_str().trim().to_string())
}

/// Finds the innermost text block that mentions an address
fn address_block(document: &Html) -> Option<String> {
    let selector = Selector::parse(&ADDRESS_BLOCK_TAGS.join(", ")).ok()?;

    let mentions_address = |element: ElementRef<'_>| {
        element
            .text()
            .collect::<String>()
            .to_lowercase()
            .contains("address")
    };

    for element in document.select(&selector) {
        if !mentions_address(element) {
            continue;
        }

        let has_inner_block = element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|child| ADDRESS_BLOCK_TAGS.contains(&child.value().name()))
            .any(mentions_address);

        if !has_inner_block {
            return element_text(element).map(|text| strip_address_label(&text));
        }
    }

    None
}

/// Removes a leading "Address:" label
fn strip_address_label(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.starts_with("address") {
        let rest = text.get("address".len()..).unwrap_or_default();
        let rest = rest.trim_start().trim_start_matches(':').trim();
        if !rest.is_empty() {
            return rest.to_string();
        }
    }
    text.to_string()
}

/// Returns the first map link on the page
fn map_link(document: &Html) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| MAP_LINK_MARKERS.iter().any(|m| href.contains(m)))
        .map(|href| href.trim().to_string())
}

fn meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description'][content]").ok()?;
    document
        .select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

/// Collects social profile links, resolved against the page URL
fn social_links(document: &Html, page_url: &Url) -> Vec<(&'static str, String)> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter_map(|url| {
            let platform = social_platform(url.host_str()?)?;
            Some((platform, url.to_string()))
        })
        .collect()
}

/// Parses content as a JSON listing payload
///
/// Returns the listing object: the root object, the first object of a
/// root array, or the first object under one of the known list keys.
fn parse_payload(body: &str) -> Option<Map<String, Value>> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::Object(map) => {
            for key in PAYLOAD_LIST_KEYS {
                if let Some(Value::Array(items)) = map.get(*key) {
                    return items.iter().find_map(|v| v.as_object().cloned());
                }
            }
            Some(map)
        }
        Value::Array(items) => items.iter().find_map(|v| v.as_object().cloned()),
        _ => None,
    }
}

/// Returns the first non-blank scalar value under any of the keys
fn payload_text(listing: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match listing.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
            .map(str::to_string),
        Value::Object(inner) => inner
            .get("street")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    })
}

fn extract_payload(listing: &Map<String, Value>, source_url: &str) -> BusinessRecord {
    let name = payload_text(listing, &["title", "name", "business_name"]);
    let mut record = BusinessRecord::new(name.as_deref(), source_url);

    record.phone = Field::from_text(
        payload_text(listing, &["phone", "formatted_phone_number", "phone_number"]).as_deref(),
    );
    record.address = Field::from_text(
        payload_text(listing, &["formatted_address", "address", "location"]).as_deref(),
    );
    record.email = Field::from_text(payload_text(listing, &["email", "emails"]).as_deref());
    record.website = Field::from_text(payload_text(listing, &["website"]).as_deref());
    record.description = Field::from_text(payload_text(listing, &["description"]).as_deref());
    record.category = payload_text(listing, &["category", "type"])
        .and_then(|c| Category::parse(&c))
        .into();

    for (platform, _) in crate::extract::rules::SOCIAL_PLATFORMS {
        let key = platform.to_lowercase();
        if let Some(url) = payload_text(listing, &[key.as_str()]) {
            record.fill_social_link(platform, &url);
        }
    }

    record
}
