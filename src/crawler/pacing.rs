//! Two-tier request pacing
//!
//! Every page is followed by a short delay jittered around a configured
//! base, so request timing stays irregular. After every `batch_size` pages
//! a longer batch pause is inserted on top. Both sleeps go through the
//! shutdown signal so an interrupt never waits out a pause.

use crate::config::CrawlProfile;
use crate::crawler::shutdown::ShutdownSignal;
use std::time::Duration;

/// Computes and executes the delays between page visits
#[derive(Debug, Clone)]
pub struct Pacer {
    page_delay: Duration,
    page_jitter: Duration,
    batch_size: u32,
    batch_pause: Duration,
}

impl Pacer {
    pub fn new(profile: &CrawlProfile) -> Self {
        Self {
            page_delay: profile.page_delay,
            page_jitter: profile.page_jitter,
            batch_size: profile.batch_size,
            batch_pause: profile.batch_pause,
        }
    }

    /// One jittered per-page delay, uniform in `base ± jitter`
    pub fn page_delay(&self) -> Duration {
        let base = self.page_delay.as_millis() as u64;
        let jitter = self.page_jitter.as_millis() as u64;
        if jitter == 0 {
            return self.page_delay;
        }
        let low = base.saturating_sub(jitter);
        Duration::from_millis(low + fastrand::u64(0..=jitter * 2))
    }

    /// Returns true when `pages_visited` closes out a batch
    pub fn is_batch_boundary(&self, pages_visited: u32) -> bool {
        self.batch_size > 0 && pages_visited % self.batch_size == 0
    }

    /// Sleeps the per-page delay, plus the batch pause when `pages_visited`
    /// closes out a batch
    ///
    /// Returns true if shutdown interrupted the wait.
    pub async fn pause(&self, pages_visited: u32, shutdown: &ShutdownSignal) -> bool {
        let delay = self.page_delay();
        tracing::trace!("Pacing: sleeping {:?} after page visit", delay);
        if shutdown.sleep(delay).await {
            return true;
        }

        if self.is_batch_boundary(pages_visited) {
            tracing::info!(
                "Batch of {} pages complete, pausing {:?}",
                self.batch_size,
                self.batch_pause
            );
            if shutdown.sleep(self.batch_pause).await {
                return true;
            }
        }

        false
    }
}
