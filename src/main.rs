//! Stocktake main entry point
//!
//! This is the command-line interface for the Stocktake catalog harvester.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use stocktake::checkpoint::CheckpointStore;
use stocktake::config::{load_config_with_hash, CrawlProfile};
use stocktake::crawler::crawl;
use stocktake::RunStatus;
use tracing_subscriber::EnvFilter;

/// Stocktake: a resumable catalog harvester
///
/// Stocktake walks a paginated product catalog page by page, extracts item
/// records, downloads item images, and publishes a CSV dataset. Interrupted
/// runs leave a checkpoint and a partial dataset, and the next invocation
/// picks up where they stopped.
#[derive(Parser, Debug)]
#[command(name = "stocktake")]
#[command(version = "1.0.0")]
#[command(about = "A resumable catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl profile to run
    #[arg(long, value_enum, default_value_t = Profile::Catalog)]
    profile: Profile,

    /// Override the configured page budget
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted run (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh run, discarding any checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the state of any resumable checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

/// Which set of engine parameters to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// Full catalog harvest
    Catalog,
    /// Fast stock-level recheck over already-known pages
    Recheck,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let mut profile = match cli.profile {
        Profile::Catalog => CrawlProfile::catalog(&config),
        Profile::Recheck => CrawlProfile::stock_recheck(&config),
    };
    if let Some(pages) = cli.pages {
        profile.page_budget = pages;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &profile);
    } else if cli.status {
        handle_status(&config, &config_hash);
    } else {
        handle_crawl(&config, profile, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stocktake=info,warn"),
            1 => EnvFilter::new("stocktake=debug,info"),
            2 => EnvFilter::new("stocktake=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &stocktake::Config, profile: &CrawlProfile) {
    println!("=== Stocktake Dry Run ===\n");

    println!("Run Parameters:");
    println!("  Page budget: {}", profile.page_budget);
    println!("  Start page: {}", profile.start_page);
    println!("  Checkpoint every: {} pages", profile.checkpoint_every_pages);
    println!("  Publish every: {} pages", profile.publish_every_pages);
    println!(
        "  Retries: {} with {:?} between attempts",
        profile.max_retries, profile.retry_delay
    );
    println!(
        "  Pacing: {:?} \u{00b1} {:?} per page, {:?} pause every {} pages",
        profile.page_delay, profile.page_jitter, profile.batch_pause, profile.batch_size
    );

    println!("\nSite:");
    println!("  Page URL template: {}", config.site.page_url_template);
    println!("  Item selector: {}", config.site.item_selector);
    println!("  Identifier attribute: {}", config.site.id_attribute);
    println!(
        "  Image candidates per item: {}",
        config.site.image_candidate_templates.len()
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Images: {}", config.images.directory);

    println!("\n\u{2713} Configuration is valid");
    println!(
        "\u{2713} Would visit up to {} pages starting at page {}",
        profile.page_budget, profile.start_page
    );
}

/// Handles the --status mode: reports any resumable checkpoint
fn handle_status(config: &stocktake::Config, config_hash: &str) {
    let store = CheckpointStore::new(&config.output.checkpoint_path, config_hash);

    match store.load() {
        Some(checkpoint) => {
            println!("Resumable checkpoint: {}", config.output.checkpoint_path);
            println!("  Run: {}", checkpoint.state.run_id);
            println!("  Saved: {}", checkpoint.saved_at);
            println!(
                "  Progress: page {} of {} budget ({} pages processed)",
                checkpoint.state.current_page,
                checkpoint.state.page_budget,
                checkpoint.state.pages_processed
            );
            println!("  Items: {}", checkpoint.state.items_found);
            println!("  Images: {}", checkpoint.state.images_downloaded);
            println!("  Page errors: {}", checkpoint.state.error_count);
            println!(
                "  Next invocation resumes at page {}",
                checkpoint.state.current_page + 1
            );
        }
        None => {
            println!("No resumable checkpoint; the next run starts fresh");
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &stocktake::Config,
    profile: CrawlProfile,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh run (discarding any checkpoint)");
    } else {
        tracing::info!("Starting run (will resume if an interrupted run exists)");
    }

    match crawl(config, profile, config_hash, fresh).await {
        Ok(summary) => {
            tracing::info!(
                "Run finished: {} pages processed, {} items, {} images, {} page errors",
                summary.pages_processed,
                summary.items_found,
                summary.images_downloaded,
                summary.error_count
            );
            if summary.status == RunStatus::Interrupted {
                tracing::info!("Partial results saved; rerun to resume");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
