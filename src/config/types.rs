use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Stocktake
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub images: ImageConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of catalog pages to visit in one run
    #[serde(rename = "page-budget", default = "default_page_budget")]
    pub page_budget: u32,

    /// First page number to fetch on a fresh run
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Persist a checkpoint every N processed pages
    #[serde(rename = "checkpoint-every-pages", default = "default_checkpoint_every")]
    pub checkpoint_every_pages: u32,

    /// Publish the partial dataset every N processed pages
    #[serde(rename = "publish-every-pages", default = "default_publish_every")]
    pub publish_every_pages: u32,

    /// Abort the run after this many consecutive page failures (0 disables)
    #[serde(rename = "max-consecutive-errors", default)]
    pub max_consecutive_errors: u32,

    /// How a resumed run treats the previous run's dataset file
    #[serde(rename = "resume-mode", default)]
    pub resume_mode: ResumeMode,
}

/// What to do with the dataset file left behind by a previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeMode {
    /// Keep the previous rows, seed the dedup ledger from them, append new rows
    #[default]
    Extend,
    /// Ignore the previous file and rebuild the dataset from scratch
    Overwrite,
}

/// Request pacing configuration
///
/// Pacing is two-tier: a short jittered delay after every page keeps request
/// timing irregular, and a longer pause after every batch keeps sustained
/// load down.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Base delay between pages (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Jitter applied around the base delay (milliseconds, +/-)
    #[serde(rename = "page-jitter-ms", default = "default_page_jitter")]
    pub page_jitter_ms: u64,

    /// Number of pages forming one batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Pause after each completed batch (milliseconds)
    #[serde(rename = "batch-pause-ms", default = "default_batch_pause")]
    pub batch_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay(),
            page_jitter_ms: default_page_jitter(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause(),
        }
    }
}

/// Retry policy for page fetch/extract failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Flat delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Directory where image files are written, one per identifier
    pub directory: String,

    /// Base URL prefixed to the stored filename in the dataset's image column
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Minimum payload size for a download to count as a real image
    #[serde(rename = "min-bytes", default = "default_min_bytes")]
    pub min_bytes: u64,

    /// Locally cached images younger than this many days skip the network
    #[serde(rename = "freshness-days", default = "default_freshness_days")]
    pub freshness_days: u32,

    /// Per-download timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_image_timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent downloads for one page's records
    #[serde(rename = "max-concurrent", default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

/// Target site configuration for the default HTTP catalog adapter
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Catalog page URL template; `{page}` is replaced with the page number
    #[serde(rename = "page-url-template")]
    pub page_url_template: String,

    /// CSS selector matching one item container on a catalog page
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// Attribute on the item container holding the item identifier
    #[serde(rename = "id-attribute")]
    pub id_attribute: String,

    /// CSS selector for the item name, relative to the item container
    #[serde(rename = "name-selector")]
    pub name_selector: String,

    /// CSS selector for the price text
    #[serde(rename = "price-selector", default)]
    pub price_selector: Option<String>,

    /// CSS selector for the stock quantity text
    #[serde(rename = "stock-selector", default)]
    pub stock_selector: Option<String>,

    /// CSS selector for the brand text
    #[serde(rename = "brand-selector", default)]
    pub brand_selector: Option<String>,

    /// CSS selector for the quality grade text
    #[serde(rename = "grade-selector", default)]
    pub grade_selector: Option<String>,

    /// CSS selector for the packaging note text
    #[serde(rename = "packaging-selector", default)]
    pub packaging_selector: Option<String>,

    /// CSS selector for the color attribute text
    #[serde(rename = "color-selector", default)]
    pub color_selector: Option<String>,

    /// CSS selector for the model attribute text
    #[serde(rename = "model-selector", default)]
    pub model_selector: Option<String>,

    /// CSS selector for the compatibility attribute text
    #[serde(rename = "compatibility-selector", default)]
    pub compatibility_selector: Option<String>,

    /// CSS selector for the category label text
    #[serde(rename = "category-selector", default)]
    pub category_selector: Option<String>,

    /// CSS selector for the short description text
    #[serde(rename = "description-selector", default)]
    pub description_selector: Option<String>,

    /// CSS selector for the next-page link (href attribute is followed)
    #[serde(rename = "next-page-selector", default)]
    pub next_page_selector: Option<String>,

    /// Ranked image candidate URL templates; `{id}` is replaced with the
    /// item identifier. Highest-resolution variant first.
    #[serde(rename = "image-candidate-templates", default)]
    pub image_candidate_templates: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Canonical path of the published CSV dataset
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path of the JSON checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Path of the JSON progress event feed (empty disables the dump)
    #[serde(rename = "events-path", default)]
    pub events_path: String,

    /// Most-recent events kept in the feed
    #[serde(rename = "events-capacity", default = "default_events_capacity")]
    pub events_capacity: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Engine parameters for one crawl run
///
/// The orchestrator is parameterized by a profile rather than reading the
/// raw config, so the high-volume catalog crawl and the fast stock-recheck
/// mode share one engine and differ only in numbers.
#[derive(Debug, Clone)]
pub struct CrawlProfile {
    pub page_budget: u32,
    pub start_page: u32,
    pub checkpoint_every_pages: u32,
    pub publish_every_pages: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub page_delay: Duration,
    pub page_jitter: Duration,
    pub batch_size: u32,
    pub batch_pause: Duration,
    pub max_consecutive_errors: u32,
    pub resume_mode: ResumeMode,
}

impl CrawlProfile {
    /// Profile for the high-volume catalog crawl, taken straight from config
    pub fn catalog(config: &Config) -> Self {
        Self {
            page_budget: config.crawler.page_budget,
            start_page: config.crawler.start_page,
            checkpoint_every_pages: config.crawler.checkpoint_every_pages,
            publish_every_pages: config.crawler.publish_every_pages,
            max_retries: config.retry.max_retries,
            retry_delay: Duration::from_millis(config.retry.retry_delay_ms),
            page_delay: Duration::from_millis(config.pacing.page_delay_ms),
            page_jitter: Duration::from_millis(config.pacing.page_jitter_ms),
            batch_size: config.pacing.batch_size,
            batch_pause: Duration::from_millis(config.pacing.batch_pause_ms),
            max_consecutive_errors: config.crawler.max_consecutive_errors,
            resume_mode: config.crawler.resume_mode,
        }
    }

    /// Profile for the stock-recheck mode: tighter pacing, fewer retries,
    /// and the consecutive-failure circuit breaker always armed
    pub fn stock_recheck(config: &Config) -> Self {
        let mut profile = Self::catalog(config);
        profile.page_delay = profile.page_delay / 2;
        profile.page_jitter = profile.page_jitter / 2;
        profile.max_retries = profile.max_retries.min(1);
        if profile.max_consecutive_errors == 0 {
            profile.max_consecutive_errors = 5;
        }
        profile
    }
}

fn default_page_budget() -> u32 {
    20
}

fn default_start_page() -> u32 {
    1
}

fn default_checkpoint_every() -> u32 {
    5
}

fn default_publish_every() -> u32 {
    10
}

fn default_page_delay() -> u64 {
    2000
}

fn default_page_jitter() -> u64 {
    750
}

fn default_batch_size() -> u32 {
    25
}

fn default_batch_pause() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_min_bytes() -> u64 {
    2000
}

fn default_freshness_days() -> u32 {
    30
}

fn default_image_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> u32 {
    4
}

fn default_events_capacity() -> usize {
    500
}
