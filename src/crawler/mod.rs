//! Crawler module: the orchestration engine and its collaborators
//!
//! # Architecture
//!
//! - `Orchestrator` owns the run: page sequencing, retries, dedup, image
//!   downloads, checkpoint and publish cadences, and the shutdown protocol
//! - `CatalogAdapter` is the boundary to a concrete catalog source;
//!   `HttpCatalogAdapter` is the configuration-driven default
//! - `Pacer` inserts the jittered per-page delays and batch pauses
//! - `ShutdownSignal` makes every wait in the engine cancellable

mod adapter;
mod orchestrator;
mod pacing;
mod shutdown;

pub use adapter::{CatalogAdapter, HttpCatalogAdapter, PageCapture, PageTarget, PageYield, RawItem};
pub use orchestrator::{Orchestrator, RunSummary};
pub use pacing::Pacer;
pub use shutdown::ShutdownSignal;

use crate::config::{Config, CrawlProfile};
use crate::Result;

/// Runs one crawl over the configured site with the default HTTP adapter
///
/// Wires Ctrl-C to the graceful shutdown protocol. `fresh` discards any
/// existing checkpoint instead of resuming from it.
pub async fn crawl(
    config: &Config,
    profile: CrawlProfile,
    config_hash: &str,
    fresh: bool,
) -> Result<RunSummary> {
    let adapter = HttpCatalogAdapter::new(config.site.clone(), &config.user_agent)?;
    let mut orchestrator =
        Orchestrator::new(config, profile, Box::new(adapter), config_hash, fresh)?;

    let signal = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.trigger();
        }
    });

    orchestrator.run().await
}
