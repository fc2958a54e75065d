//! Configuration module for Stocktake
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus the [`CrawlProfile`] that parameterizes the crawl engine.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlProfile, CrawlerConfig, ImageConfig, OutputConfig, PacingConfig, ResumeMode,
    RetryConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
