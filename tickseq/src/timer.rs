use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct PendingTimeout {
    transaction_id: u64,
    join: JoinHandle<()>,
}

/// Runs the coordinator's usable timeout on tokio.
///
/// At most one timeout is pending; scheduling another aborts it. A fired
/// timeout delivers its transaction id over a channel the host drains, so the
/// timer task never touches the single-threaded coordinator.
pub(crate) struct UsableTimeoutTimer {
    tx: mpsc::UnboundedSender<u64>,
    rx: mpsc::UnboundedReceiver<u64>,
    pending: Option<PendingTimeout>,
}

impl UsableTimeoutTimer {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            pending: None,
        }
    }

    pub(crate) fn schedule(&mut self, transaction_id: u64, delay: Duration) {
        self.abort_pending();
        let tx = self.tx.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(transaction_id);
        });
        self.pending = Some(PendingTimeout {
            transaction_id,
            join,
        });
    }

    pub(crate) fn cancel(&mut self, transaction_id: u64) {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.transaction_id == transaction_id)
        {
            self.abort_pending();
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the next fired transaction id.
    pub(crate) async fn fired(&mut self) -> Option<u64> {
        let transaction_id = self.rx.recv().await?;
        self.clear_if(transaction_id);
        Some(transaction_id)
    }

    /// A fired transaction id, if one is ready now.
    pub(crate) fn try_fired(&mut self) -> Option<u64> {
        let transaction_id = self.rx.try_recv().ok()?;
        self.clear_if(transaction_id);
        Some(transaction_id)
    }

    fn clear_if(&mut self, transaction_id: u64) {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.transaction_id == transaction_id)
        {
            self.pending = None;
        }
    }

    fn abort_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.join.abort();
        }
    }
}

impl Drop for UsableTimeoutTimer {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let mut timer = UsableTimeoutTimer::new();
        let started = tokio::time::Instant::now();
        timer.schedule(7, Duration::from_millis(1500));
        assert!(timer.is_pending());
        assert_eq!(timer.fired().await, Some(7));
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_aborts_the_previous_timeout() {
        let mut timer = UsableTimeoutTimer::new();
        timer.schedule(1, Duration::from_millis(100));
        timer.schedule(2, Duration::from_millis(500));
        assert_eq!(timer.fired().await, Some(2));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(timer.try_fired(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ignores_other_ids() {
        let mut timer = UsableTimeoutTimer::new();
        timer.schedule(3, Duration::from_millis(100));
        timer.cancel(2);
        assert!(timer.is_pending());
        timer.cancel(3);
        assert!(!timer.is_pending());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(timer.try_fired(), None);
    }
}
