use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The run is in progress
    Running,

    /// The run was stopped by an interrupt or circuit breaker before the
    /// page budget was reached; a later run may resume it
    Interrupted,

    /// The run visited every page it was going to and published the dataset
    Completed,
}

/// One page that exhausted its retries and was skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageError {
    /// Page number that failed
    pub page: u32,

    /// Description of the final failure
    pub message: String,

    /// When the page was abandoned
    pub occurred_at: DateTime<Utc>,
}

/// The single mutable state value for one crawl run
///
/// Owned exclusively by the orchestrator, mutated once per page, and handed
/// to the checkpoint store for persistence. No other component holds run
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlState {
    /// Identifier of this run, derived from the start timestamp
    pub run_id: String,

    /// Last fully processed page number (0 before any page completes)
    pub current_page: u32,

    /// Maximum number of pages this run will visit
    pub page_budget: u32,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Pages fully processed so far
    pub pages_processed: u32,

    /// Records accepted into the dataset so far
    pub items_found: u64,

    /// Images successfully downloaded so far
    pub images_downloaded: u64,

    /// Pages abandoned after retry exhaustion
    pub error_count: u32,

    /// Detail for each abandoned page
    pub errors: Vec<PageError>,

    /// Current lifecycle status
    pub status: RunStatus,
}

impl CrawlState {
    /// Creates state for a fresh run
    pub fn new(page_budget: u32) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("run-{}", started_at.format("%Y%m%d-%H%M%S")),
            current_page: 0,
            page_budget,
            started_at,
            pages_processed: 0,
            items_found: 0,
            images_downloaded: 0,
            error_count: 0,
            errors: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Records a fully processed page
    pub fn record_page(&mut self, page: u32, items_accepted: u64, images_downloaded: u64) {
        self.current_page = page;
        self.pages_processed += 1;
        self.items_found += items_accepted;
        self.images_downloaded += images_downloaded;
    }

    /// Records a page abandoned after retry exhaustion
    pub fn record_page_error(&mut self, page: u32, message: String) {
        self.error_count += 1;
        self.errors.push(PageError {
            page,
            message,
            occurred_at: Utc::now(),
        });
    }

    /// Pages visited so far, counting abandoned pages
    pub fn pages_visited(&self) -> u32 {
        self.pages_processed + self.error_count
    }

    /// Returns true if the run has visited as many pages as it is allowed to
    ///
    /// Abandoned pages count: a failing page consumes budget, it does not
    /// extend the run.
    pub fn budget_exhausted(&self) -> bool {
        self.pages_visited() >= self.page_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = CrawlState::new(20);
        assert_eq!(state.current_page, 0);
        assert_eq!(state.page_budget, 20);
        assert_eq!(state.pages_processed, 0);
        assert_eq!(state.items_found, 0);
        assert_eq!(state.error_count, 0);
        assert_eq!(state.status, RunStatus::Running);
        assert!(state.run_id.starts_with("run-"));
    }

    #[test]
    fn test_record_page() {
        let mut state = CrawlState::new(20);

        state.record_page(1, 12, 10);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.pages_processed, 1);
        assert_eq!(state.items_found, 12);
        assert_eq!(state.images_downloaded, 10);

        state.record_page(2, 8, 8);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.pages_processed, 2);
        assert_eq!(state.items_found, 20);
    }

    #[test]
    fn test_record_page_error() {
        let mut state = CrawlState::new(20);

        state.record_page_error(3, "timeout".to_string());
        assert_eq!(state.error_count, 1);
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].page, 3);
        assert_eq!(state.errors[0].message, "timeout");
    }

    #[test]
    fn test_budget_exhausted() {
        let mut state = CrawlState::new(2);
        assert!(!state.budget_exhausted());

        state.record_page(1, 0, 0);
        assert!(!state.budget_exhausted());

        state.record_page(2, 0, 0);
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_abandoned_pages_consume_budget() {
        let mut state = CrawlState::new(2);

        state.record_page(1, 5, 5);
        state.record_page_error(2, "HTTP 500".to_string());

        assert_eq!(state.pages_visited(), 2);
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut state = CrawlState::new(20);
        state.record_page(7, 42, 40);
        state.record_page_error(8, "HTTP 500".to_string());
        state.status = RunStatus::Interrupted;

        let json = serde_json::to_string(&state).unwrap();
        let restored: CrawlState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.current_page, 7);
        assert_eq!(restored.items_found, 42);
        assert_eq!(restored.error_count, 1);
        assert_eq!(restored.status, RunStatus::Interrupted);
    }
}
