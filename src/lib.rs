//! Stocktake: a resumable catalog harvester
//!
//! This crate implements a crawler that walks a paginated product catalog,
//! extracts item records through a pluggable adapter, downloads item images,
//! and incrementally publishes a CSV dataset that survives interruption.

pub mod assets;
pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Stocktake operations
#[derive(Debug, Error)]
pub enum StocktakeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch page {page}: {message}")]
    Fetch { page: u32, message: String },

    #[error("Failed to extract records from page {page}: {message}")]
    Extraction { page: u32, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Adapter startup failed: {0}")]
    Startup(String),

    #[error("Aborted after {count} consecutive page failures")]
    TooManyConsecutiveErrors { count: u32 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
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
}

/// Result type alias for Stocktake operations
pub type Result<T> = std::result::Result<T, StocktakeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CatalogAdapter, Orchestrator, ShutdownSignal};
pub use output::ItemRecord;
pub use state::{CrawlState, DedupLedger, RunStatus};
