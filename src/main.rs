//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the business listing harvester.

use clap::Parser;
use listing_harvester::config::{load_config_with_hash, resolve_credentials, Config};
use listing_harvester::harvest::seed_items;
use listing_harvester::output::{print_report, sinks_from_config};
use listing_harvester::Harvester;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a budgeted business listing harvester
///
/// Listing-Harvester visits directory pages and search queries, extracts
/// business listings with selector rules, and asks a rate-limited language
/// model for the fields the rules could not find.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A budgeted business listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and credentials and show the seeds without harvesting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_harvest(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = resolve_credentials(config)?;
    let seeds = seed_items(&config.seeds)?;

    println!("=== Listing-Harvester Dry Run ===\n");

    println!("Harvester Configuration:");
    println!("  Workers: {}", config.harvester.workers);
    println!("  Checkpoint every: {} items", config.harvester.checkpoint_every);
    println!(
        "  Fetch attempts: {} ({}s timeout each)",
        config.fetcher.max_attempts, config.fetcher.attempt_timeout_secs
    );
    if let Some(template) = &config.fetcher.search_url_template {
        println!("  Search URL: {}", template);
    }
    if let Some(proxy) = &config.fetcher.proxy {
        println!(
            "  Proxy: {} ({})",
            proxy.url,
            if credentials.proxy.is_some() {
                "authenticated"
            } else {
                "anonymous"
            }
        );
    }

    println!("\nFallback Model:");
    if config.model.enabled {
        println!("  Model: {} at {}", config.model.model, config.model.endpoint);
        println!("  API key: read from {}", config.model.api_key_env);
        println!(
            "  Budget: {} tokens / {} requests per {}s, {} concurrent",
            config.budget.tokens_per_window,
            config.budget.requests_per_window,
            config.budget.window_secs,
            config.budget.max_concurrent
        );
        println!("  Required fields: {}", config.model.required_fields.join(", "));
        if config.model.expand_queries {
            println!("  Seed queries: phrased by the model before the run");
        }
    } else {
        println!("  Disabled");
    }

    println!("\nDiscovery keywords: {}", config.discovery.keywords.join(", "));

    println!("\nOutput:");
    println!(
        "  CSV: {}",
        config.output.csv_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );

    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start harvesting with {} seed items", seeds.len());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = match resolve_credentials(config) {
        Ok(creds) => creds,
        Err(e) => {
            tracing::error!("Cannot start harvest: {}", e);
            return Err(e.into());
        }
    };

    let mut sinks = sinks_from_config(&config.output)?;
    let mut harvester = Harvester::from_config(config, &credentials)?;

    let token = harvester.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight items");
            token.cancel();
        }
    });

    match harvester.run(&mut sinks).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
