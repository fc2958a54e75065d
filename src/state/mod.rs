//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the single mutable per-run state value (page cursor,
//!   counters, error list, lifecycle status)
//! - `DedupLedger`: run-scoped set of already-captured item identifiers

mod crawl_state;
mod dedup;

// Re-export main types
pub use crawl_state::{CrawlState, PageError, RunStatus};
pub use dedup::DedupLedger;
