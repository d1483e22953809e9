//! Cancellable commit timer for search input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period after the last keystroke before a search term is committed.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Commits the most recently scheduled value once no newer value has been
/// scheduled for the configured delay.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer with the given quiet period.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            pending: None,
            tx,
            rx,
        }
    }

    /// Schedules `value`, cancelling any value still waiting.
    pub fn schedule(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver lives as long as the debouncer.
            let _ = tx.send(value);
        }));
    }

    /// Drops the value still waiting, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Returns true if a value is waiting for its quiet period to end.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|pending| !pending.is_finished()) || !self.rx.is_empty()
    }

    /// Waits for the next committed value.
    ///
    /// Never completes while nothing is scheduled.
    pub async fn committed(&mut self) -> Option<T> {
        let value = self.rx.recv().await;
        if self.rx.is_empty() && self.pending.as_ref().is_some_and(JoinHandle::is_finished) {
            self.pending = None;
        }
        value
    }
}

impl Default for Debouncer<String> {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_last_value_once() {
        let mut debouncer = Debouncer::default();
        for term in ["g", "gm", "gma", "gmai", "gmail"] {
            debouncer.schedule(term.to_string());
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        assert_eq!(debouncer.committed().await.as_deref(), Some("gmail"));
        assert!(!debouncer.is_pending());

        let mut next = task::spawn(debouncer.committed());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_pending!(next.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_commits_before_quiet_period() {
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
        debouncer.schedule(1_u32);
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(299)).await;
        {
            let mut next = task::spawn(debouncer.committed());
            assert_pending!(next.poll());
        }
        assert!(debouncer.is_pending());

        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        let mut next = task::spawn(debouncer.committed());
        assert_ready_eq!(next.poll(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_inputs_each_commit() {
        let mut debouncer = Debouncer::default();
        debouncer.schedule("a".to_string());
        assert_eq!(debouncer.committed().await.as_deref(), Some("a"));
        debouncer.schedule("b".to_string());
        assert_eq!(debouncer.committed().await.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let mut debouncer = Debouncer::default();
        debouncer.schedule("a".to_string());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::advance(Duration::from_secs(1)).await;
        let mut next = task::spawn(debouncer.committed());
        assert_pending!(next.poll());
    }
}
