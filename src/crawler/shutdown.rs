//! Graceful-shutdown signaling
//!
//! A `ShutdownSignal` is shared between the orchestrator and whatever wires
//! up the external interrupt (Ctrl-C in the binary, a test hook in tests).
//! Triggering is idempotent: the first trigger starts the shutdown protocol,
//! any further trigger is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

/// Cloneable, idempotent shutdown flag with cancellable sleeps
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown; a second call while shutdown is already in
    /// progress does nothing
    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
            self.inner.notify.notify_waiters();
        } else {
            tracing::debug!("Shutdown already in progress, ignoring repeat signal");
        }
    }

    /// Returns true once shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless shutdown fires first
    ///
    /// Returns true if the sleep was cut short by shutdown.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before re-checking the flag so a trigger in
        // between cannot be missed
        notified.as_mut().enable();

        if self.is_triggered() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = notified => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        signal.trigger();
        assert!(signal.is_triggered());

        // Second trigger is a no-op
        signal.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();

        clone.trigger();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_sleep_runs_to_completion() {
        let signal = ShutdownSignal::new();
        let interrupted = signal.sleep(Duration::from_millis(10)).await;
        assert!(!interrupted);
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        let start = Instant::now();
        let task = tokio::spawn(async move { waiter.sleep(Duration::from_secs(30)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.trigger();

        let interrupted = task.await.unwrap();
        assert!(interrupted);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sleep_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let start = Instant::now();
        let interrupted = signal.sleep(Duration::from_secs(30)).await;
        assert!(interrupted);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
