//! Configuration module for the listing harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving the credentials they refer to.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvester will run {} workers", config.harvester.workers);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

pub use types::{
    BudgetConfig, Config, DiscoveryConfig, ExtractionConfig, FetcherConfig, HarvesterConfig,
    ModelConfig, OutputConfig, ProxyConfig, SeedConfig,
};

pub use credentials::{
    resolve_credentials, resolve_credentials_with, Credentials, ProxyCredentials,
};
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::QUERY_PLACEHOLDER;
