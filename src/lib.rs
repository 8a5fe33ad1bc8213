//! Listing-Harvester: a budgeted business listing harvester
//!
//! This crate visits a frontier of directory pages and search queries,
//! extracts business listings with deterministic rules, falls back to a
//! rate-limited language model for the fields the rules could not fill, and
//! hands the accumulated records to an output sink.

pub mod budget;
pub mod config;
pub mod extract;
pub mod frontier;
pub mod harvest;
pub mod model;
pub mod output;
pub mod record;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Model client error: {0}")]
    Model(#[from] model::ModelError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: harvest::HarvestPhase,
        to: harvest::HarvestPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are the only errors that abort a run, and they are raised before
/// any work item is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use budget::BudgetGate;
pub use config::Config;
pub use frontier::{Frontier, WorkItem};
pub use harvest::{HarvestReport, Harvester};
pub use record::{BusinessRecord, Category, Field};
pub use crate::url::normalize_url;
