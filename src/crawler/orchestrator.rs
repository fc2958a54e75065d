//! Crawl orchestration engine
//!
//! The orchestrator drives the whole run: it resolves which page to visit
//! next, pushes each page through fetch, extract, dedup, image download and
//! the sink, and persists checkpoints and partial datasets on their
//! configured cadences. It is the only component that mutates run state.
//!
//! A run ends one of three ways: the page budget or the catalog itself is
//! exhausted (final dataset published, checkpoint cleared), shutdown is
//! requested (partial dataset published, checkpoint marked interrupted), or
//! the consecutive-failure circuit breaker trips (same as shutdown, plus an
//! error to the caller).

use crate::assets::AssetFetcher;
use crate::checkpoint::CheckpointStore;
use crate::config::{Config, CrawlProfile, ResumeMode};
use crate::crawler::adapter::{CatalogAdapter, PageTarget, PageYield, RawItem};
use crate::crawler::pacing::Pacer;
use crate::crawler::shutdown::ShutdownSignal;
use crate::output::{DatasetSink, EventFeed};
use crate::state::{CrawlState, DedupLedger, RunStatus};
use crate::{Result, StocktakeError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// How long adapter teardown may take during shutdown
const ADAPTER_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Final counters of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub pages_processed: u32,
    pub pages_visited: u32,
    pub items_found: u64,
    pub images_downloaded: u64,
    pub error_count: u32,
    pub new_records: usize,
}

/// Drives one crawl run over a catalog adapter
pub struct Orchestrator {
    profile: CrawlProfile,
    adapter: Box<dyn CatalogAdapter>,
    assets: Arc<AssetFetcher>,
    sink: DatasetSink,
    ledger: DedupLedger,
    store: CheckpointStore,
    events: EventFeed,
    events_path: Option<PathBuf>,
    image_base: String,
    max_concurrent_downloads: usize,
    pacer: Pacer,
    shutdown: ShutdownSignal,
    state: CrawlState,
}

impl Orchestrator {
    /// Assembles the engine, resuming from a valid checkpoint unless
    /// `fresh` forces a clean start
    ///
    /// On resume in extend mode the previous dataset file becomes the
    /// baseline: its rows are preserved and its identifiers seed the dedup
    /// ledger so no row is ever emitted twice across the combined runs.
    pub fn new(
        config: &Config,
        profile: CrawlProfile,
        adapter: Box<dyn CatalogAdapter>,
        config_hash: &str,
        fresh: bool,
    ) -> Result<Self> {
        let store = CheckpointStore::new(&config.output.checkpoint_path, config_hash);
        let mut sink = DatasetSink::new(&config.output.dataset_path);
        let assets = Arc::new(AssetFetcher::new(&config.images, &config.user_agent)?);

        let mut state = CrawlState::new(profile.page_budget);
        state.current_page = profile.start_page.saturating_sub(1);
        let mut ledger = DedupLedger::new();

        if fresh {
            store.clear();
        } else if let Some(checkpoint) = store.load() {
            tracing::info!(
                "Resuming run {} at page {} ({} pages already processed)",
                checkpoint.state.run_id,
                checkpoint.state.current_page + 1,
                checkpoint.state.pages_processed
            );
            state = checkpoint.state;
            state.status = RunStatus::Running;
            // A --pages override applies to the resumed run too
            state.page_budget = profile.page_budget;

            if profile.resume_mode == ResumeMode::Extend {
                let ids = sink.adopt_baseline()?;
                ledger = DedupLedger::seeded(ids);
            }
        }

        let events_path = if config.output.events_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.output.events_path))
        };

        Ok(Self {
            pacer: Pacer::new(&profile),
            profile,
            adapter,
            assets,
            sink,
            ledger,
            store,
            events: EventFeed::new(config.output.events_capacity),
            events_path,
            image_base: config.images.base_url.trim_end_matches('/').to_string(),
            max_concurrent_downloads: config.images.max_concurrent as usize,
            shutdown: ShutdownSignal::new(),
            state,
        })
    }

    /// Handle for wiring an external interrupt to this run
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Current run state, for inspection
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the crawl to one of its terminal outcomes
    pub async fn run(&mut self) -> Result<RunSummary> {
        tracing::info!(
            "Starting run {}: budget {} pages, {} already visited",
            self.state.run_id,
            self.state.page_budget,
            self.state.pages_visited()
        );

        if let Err(e) = self.adapter.open().await {
            // Salvage whatever a resumed baseline already holds
            let _ = self.sink.publish_partial();
            self.events
                .error(format!("adapter startup failed: {}", e), &self.state);
            self.dump_events();
            return Err(StocktakeError::Startup(e.to_string()));
        }
        self.events.info("run started", &self.state);

        let mut next_number = self.state.current_page + 1;
        let mut pending_url: Option<Url> = None;
        let mut consecutive_failures: u32 = 0;
        let mut interrupted = false;
        let mut catalog_ended = false;

        while !catalog_ended && !self.state.budget_exhausted() {
            if self.shutdown.is_triggered() {
                interrupted = true;
                break;
            }

            let target = PageTarget {
                number: next_number,
                url: pending_url.take(),
            };

            match self.fetch_and_extract(&target).await {
                Ok((page_url, yield_)) => {
                    consecutive_failures = 0;

                    if yield_.items.is_empty() {
                        // Not an error: the catalog may simply have ended,
                        // or the selectors have drifted
                        tracing::warn!("Page {} yielded zero items", target.number);
                        self.events.warn(
                            format!("page {} yielded zero items", target.number),
                            &self.state,
                        );
                    }

                    let (accepted, images) = self.process_items(yield_.items).await;
                    self.state.record_page(target.number, accepted, images);
                    self.events.info(
                        format!(
                            "page {} processed: {} new items, {} images",
                            target.number, accepted, images
                        ),
                        &self.state,
                    );

                    match yield_.next_page {
                        Some(url) if url != page_url => pending_url = Some(url),
                        Some(_) => {
                            tracing::info!(
                                "Page {} links back to itself, treating as catalog end",
                                target.number
                            );
                            catalog_ended = true;
                        }
                        None => catalog_ended = true,
                    }
                }
                Err(e) => {
                    // Retries cut short by shutdown are an interruption,
                    // not a page failure
                    if self.shutdown.is_triggered() {
                        interrupted = true;
                        break;
                    }

                    tracing::error!("Abandoning page {} after retries: {}", target.number, e);
                    self.state.record_page_error(target.number, e.to_string());
                    self.events.error(
                        format!("page {} abandoned: {}", target.number, e),
                        &self.state,
                    );

                    consecutive_failures += 1;
                    if self.profile.max_consecutive_errors > 0
                        && consecutive_failures >= self.profile.max_consecutive_errors
                    {
                        return self.abort_on_breaker(consecutive_failures).await;
                    }
                }
            }

            next_number = target.number + 1;

            let visited = self.state.pages_visited();
            if cadence_due(visited, self.profile.checkpoint_every_pages) {
                self.store.save(&self.state, self.sink.len());
                self.dump_events();
            }
            if cadence_due(visited, self.profile.publish_every_pages) {
                if let Err(e) = self.sink.publish_partial() {
                    // Periodic publish is best-effort; the next one may succeed
                    tracing::warn!("Partial publish failed: {}", e);
                    self.events
                        .warn(format!("partial publish failed: {}", e), &self.state);
                }
            }

            if !catalog_ended && !self.state.budget_exhausted() {
                if self.pacer.pause(visited, &self.shutdown).await {
                    interrupted = true;
                    break;
                }
            }
        }

        if interrupted || self.shutdown.is_triggered() {
            self.finish_interrupted("shutdown requested").await;
        } else {
            self.finish_completed().await?;
        }
        Ok(self.summary())
    }

    /// Fetches and extracts one page, retrying on failure
    ///
    /// Every attempt failure is retried up to the profile's limit with a
    /// flat delay in between. The delay is cancellable; shutdown during a
    /// retry wait surfaces as the last error with the shutdown flag set.
    async fn fetch_and_extract(&mut self, target: &PageTarget) -> Result<(Url, PageYield)> {
        let attempts = self.profile.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if self.shutdown.is_triggered() {
                break;
            }

            match self.attempt_page(target).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    tracing::warn!(
                        "Page {} attempt {}/{} failed: {}",
                        target.number,
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                    if attempt < attempts && self.shutdown.sleep(self.profile.retry_delay).await {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(StocktakeError::Fetch {
            page: target.number,
            message: "interrupted before first attempt".to_string(),
        }))
    }

    async fn attempt_page(&mut self, target: &PageTarget) -> Result<(Url, PageYield)> {
        let capture = self.adapter.fetch_page(target).await?;
        let yield_ = self.adapter.extract(&capture)?;
        Ok((capture.url, yield_))
    }

    /// Runs one page's items through dedup, image download, and the sink
    ///
    /// Image downloads for the page run concurrently under the configured
    /// limit, and all of them settle before the page is considered done, so
    /// a checkpoint never claims a page whose downloads are still in flight.
    /// Records are appended in page order regardless of download order.
    async fn process_items(&mut self, items: Vec<RawItem>) -> (u64, u64) {
        let mut admitted = Vec::with_capacity(items.len());
        for item in items {
            if !self.ledger.insert(&item.id) {
                tracing::debug!("Skipping duplicate item {}", item.id);
                continue;
            }
            admitted.push(item);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_downloads));
        let mut downloads = Vec::with_capacity(admitted.len());
        for item in &admitted {
            if item.image_candidates.is_empty() {
                downloads.push(None);
                continue;
            }
            let fetcher = Arc::clone(&self.assets);
            let semaphore = Arc::clone(&semaphore);
            let candidates = item.image_candidates.clone();
            let key = item.id.clone();
            downloads.push(Some(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                fetcher.fetch(&candidates, &key).await
            })));
        }

        let accepted = admitted.len() as u64;
        let mut images: u64 = 0;
        for (item, download) in admitted.into_iter().zip(downloads) {
            let downloaded = match download {
                Some(handle) => handle.await.unwrap_or(false),
                None => false,
            };
            if downloaded {
                images += 1;
            }
            let image = downloaded.then(|| format!("{}/{}.jpg", self.image_base, item.id));
            self.sink.append(item.into_record(image));
        }

        (accepted, images)
    }

    async fn abort_on_breaker(&mut self, count: u32) -> Result<RunSummary> {
        tracing::error!("{} consecutive page failures, aborting run", count);
        self.events.error(
            format!("{} consecutive page failures, aborting", count),
            &self.state,
        );
        self.finish_interrupted("circuit breaker tripped").await;
        Err(StocktakeError::TooManyConsecutiveErrors { count })
    }

    /// Shutdown protocol: salvage results, mark the checkpoint resumable,
    /// release the adapter
    async fn finish_interrupted(&mut self, reason: &str) {
        tracing::warn!("Run {} interrupted: {}", self.state.run_id, reason);

        if let Err(e) = self.sink.publish_partial() {
            tracing::warn!("Partial publish during shutdown failed: {}", e);
        }

        self.state.status = RunStatus::Interrupted;
        self.store.save(&self.state, self.sink.len());
        self.events
            .warn(format!("run interrupted: {}", reason), &self.state);
        self.dump_events();
        self.close_adapter().await;
    }

    /// Completion protocol: publish the canonical dataset, then retire the
    /// checkpoint so the next invocation starts fresh
    async fn finish_completed(&mut self) -> Result<()> {
        match self.sink.publish_final() {
            Ok(()) => {
                self.state.status = RunStatus::Completed;
                self.store.clear();
                tracing::info!(
                    "Run {} complete: {} pages, {} items, {} images, {} page errors",
                    self.state.run_id,
                    self.state.pages_processed,
                    self.state.items_found,
                    self.state.images_downloaded,
                    self.state.error_count
                );
                self.events.info("run completed", &self.state);
                self.dump_events();
                self.close_adapter().await;
                Ok(())
            }
            Err(e) => {
                // Keep the checkpoint so the run can be resumed and the
                // dataset republished
                self.state.status = RunStatus::Interrupted;
                self.store.save(&self.state, self.sink.len());
                self.dump_events();
                self.close_adapter().await;
                Err(e)
            }
        }
    }

    async fn close_adapter(&mut self) {
        if tokio::time::timeout(ADAPTER_CLOSE_GRACE, self.adapter.close())
            .await
            .is_err()
        {
            tracing::warn!(
                "Adapter close exceeded {:?}, abandoning it",
                ADAPTER_CLOSE_GRACE
            );
        }
    }

    fn dump_events(&self) {
        if let Some(path) = &self.events_path {
            self.events.dump(path);
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.state.status,
            pages_processed: self.state.pages_processed,
            pages_visited: self.state.pages_visited(),
            items_found: self.state.items_found,
            images_downloaded: self.state.images_downloaded,
            error_count: self.state.error_count,
            new_records: self.sink.len(),
        }
    }
}

fn cadence_due(visited: u32, every: u32) -> bool {
    every > 0 && visited > 0 && visited % every == 0
}
