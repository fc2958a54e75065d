//! Append-only, size-bounded progress event feed
//!
//! The feed is the interface to an external monitoring surface: the core
//! only ever emits into it. It keeps the most recent N events and can dump
//! itself as JSON next to the checkpoint on the same cadence.

use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Severity of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
}

/// One structured progress event with a counters snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: EventSeverity,
    pub message: String,
    pub run_id: String,
    pub pages_processed: u32,
    pub items_found: u64,
    pub images_downloaded: u64,
    pub error_count: u32,
}

/// Bounded ring of the most recent progress events
#[derive(Debug)]
pub struct EventFeed {
    events: VecDeque<CrawlEvent>,
    capacity: usize,
}

impl EventFeed {
    /// Creates a feed keeping at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(512)),
            capacity,
        }
    }

    /// Appends an event, dropping the oldest when at capacity
    pub fn record(&mut self, severity: EventSeverity, message: impl Into<String>, state: &CrawlState) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(CrawlEvent {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            run_id: state.run_id.clone(),
            pages_processed: state.pages_processed,
            items_found: state.items_found,
            images_downloaded: state.images_downloaded,
            error_count: state.error_count,
        });
    }

    /// Convenience for an info-level event
    pub fn info(&mut self, message: impl Into<String>, state: &CrawlState) {
        self.record(EventSeverity::Info, message, state);
    }

    /// Convenience for a warn-level event
    pub fn warn(&mut self, message: impl Into<String>, state: &CrawlState) {
        self.record(EventSeverity::Warn, message, state);
    }

    /// Convenience for an error-level event
    pub fn error(&mut self, message: impl Into<String>, state: &CrawlState) {
        self.record(EventSeverity::Error, message, state);
    }

    /// Number of events currently held
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates events oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &CrawlEvent> {
        self.events.iter()
    }

    /// Best-effort JSON dump for the external monitoring surface
    ///
    /// Failures are logged and swallowed; the feed is observability, not
    /// correctness.
    pub fn dump(&self, path: &Path) {
        let events: Vec<&CrawlEvent> = self.events.iter().collect();
        match serde_json::to_vec_pretty(&events) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!("Failed to write event feed to {:?}: {}", path, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize event feed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_iterate() {
        let state = CrawlState::new(20);
        let mut feed = EventFeed::new(10);

        feed.info("started", &state);
        feed.warn("zero items on page 3", &state);

        assert_eq!(feed.len(), 2);
        let events: Vec<_> = feed.iter().collect();
        assert_eq!(events[0].severity, EventSeverity::Info);
        assert_eq!(events[1].severity, EventSeverity::Warn);
        assert_eq!(events[1].message, "zero items on page 3");
        assert_eq!(events[0].run_id, state.run_id);
    }

    #[test]
    fn test_capacity_bound_drops_oldest() {
        let state = CrawlState::new(20);
        let mut feed = EventFeed::new(3);

        for i in 0..5 {
            feed.info(format!("event {}", i), &state);
        }

        assert_eq!(feed.len(), 3);
        let messages: Vec<_> = feed.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn test_counters_snapshot() {
        let mut state = CrawlState::new(20);
        state.record_page(4, 15, 12);

        let mut feed = EventFeed::new(10);
        feed.info("page done", &state);

        let event = feed.iter().next().unwrap();
        assert_eq!(event.pages_processed, 1);
        assert_eq!(event.items_found, 15);
        assert_eq!(event.images_downloaded, 12);
    }

    #[test]
    fn test_dump_writes_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("events.json");

        let state = CrawlState::new(20);
        let mut feed = EventFeed::new(10);
        feed.info("started", &state);
        feed.dump(&path);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<CrawlEvent> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].message, "started");
    }

    #[test]
    fn test_dump_to_bad_path_is_swallowed() {
        let state = CrawlState::new(20);
        let mut feed = EventFeed::new(10);
        feed.info("started", &state);
        // Must not panic
        feed.dump(Path::new("/nonexistent/dir/events.json"));
    }
}
