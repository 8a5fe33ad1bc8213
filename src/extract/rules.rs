//! Selector lists and patterns used by the structured extractor

use crate::config::ExtractionConfig;
use crate::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;

pub const DEFAULT_NAME_SELECTORS: &[&str] = &["title", "h1"];

pub const DEFAULT_PHONE_SELECTORS: &[&str] = &[
    "[itemprop='telephone']",
    "a[href^='tel:']",
    ".company-phone",
    ".phone",
];

pub const DEFAULT_EMAIL_SELECTORS: &[&str] = &["[itemprop='email']", "a[href^='mailto:']"];

pub const DEFAULT_ADDRESS_SELECTORS: &[&str] = &[
    "[itemprop='address']",
    ".company-address",
    ".address",
];

/// International phone numbers: a `+` or `00` prefix and at least eight digits
pub static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+|\b00)\d[\d\s\-/().]{6,18}\d").expect("phone pattern is valid")
});

pub static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Social platforms recognized in links, in the order they are reported
pub const SOCIAL_PLATFORMS: &[(&str, &[&str])] = &[
    ("Facebook", &["facebook.com", "fb.com"]),
    ("Instagram", &["instagram.com"]),
    ("Twitter", &["twitter.com", "x.com"]),
    ("LinkedIn", &["linkedin.com"]),
];

/// Hosts whose links count as a map location for the address fallback
pub const MAP_LINK_MARKERS: &[&str] = &["google.com/maps", "maps.google.", "goo.gl/maps"];

/// Compiled selector lists; within a field the element that appears first
/// in the document wins, whichever selector it matched
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub name: Vec<Selector>,
    pub phone: Vec<Selector>,
    pub email: Vec<Selector>,
    pub address: Vec<Selector>,
}

impl ExtractionRules {
    /// Builds rules from config, using the built-in list for any override
    /// that is absent
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: compile(config.name_selectors.as_deref(), DEFAULT_NAME_SELECTORS)?,
            phone: compile(config.phone_selectors.as_deref(), DEFAULT_PHONE_SELECTORS)?,
            email: compile(config.email_selectors.as_deref(), DEFAULT_EMAIL_SELECTORS)?,
            address: compile(config.address_selectors.as_deref(), DEFAULT_ADDRESS_SELECTORS)?,
        })
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        // The built-in selectors are fixed strings that always parse
        Self {
            name: compile_static(DEFAULT_NAME_SELECTORS),
            phone: compile_static(DEFAULT_PHONE_SELECTORS),
            email: compile_static(DEFAULT_EMAIL_SELECTORS),
            address: compile_static(DEFAULT_ADDRESS_SELECTORS),
        }
    }
}

fn compile(overrides: Option<&[String]>, defaults: &[&str]) -> Result<Vec<Selector>, ConfigError> {
    match overrides {
        Some(list) => list
            .iter()
            .map(|s| {
                Selector::parse(s)
                    .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", s, e)))
            })
            .collect(),
        None => Ok(compile_static(defaults)),
    }
}

fn compile_static(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

/// Maps a link host to a social platform name
pub fn social_platform(host: &str) -> Option<&'static str> {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    SOCIAL_PLATFORMS
        .iter()
        .find(|(_, domains)| {
            domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        })
        .map(|(platform, _)| *platform)
}
