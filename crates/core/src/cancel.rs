//! Broadcast cancellation channel from the orchestrator to asset workers.
//!
//! Cancellation is not scoped to a story: one signal aborts every worker
//! subscribed at the time it is sent.

use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelBus {
    sender: broadcast::Sender<()>,
}

impl CancelBus {
    /// Create a new bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Signal every current subscriber. Returns how many were reached.
    pub fn broadcast(&self) -> usize {
        let reached = self.sender.send(()).unwrap_or(0);
        debug!("Cancellation broadcast reached {} workers", reached);
        crate::metrics::CANCELLATIONS_BROADCAST.inc();
        reached
    }

    /// Subscribe for the duration of one unit of work.
    ///
    /// Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> CancelSubscription {
        CancelSubscription {
            receiver: self.sender.subscribe(),
            cancelled: false,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CancelBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One worker's view of the cancel bus.
#[derive(Debug)]
pub struct CancelSubscription {
    receiver: broadcast::Receiver<()>,
    cancelled: bool,
}

impl CancelSubscription {
    /// Whether a cancellation arrived since subscribing. Never blocks.
    pub fn is_cancelled(&mut self) -> bool {
        if self.cancelled {
            return true;
        }
        // Lagged still means at least one signal was sent; Closed means the
        // orchestrator is gone
        if !matches!(
            self.receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ) {
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Wait until a cancellation arrives.
    pub async fn cancelled(&mut self) {
        if self.cancelled {
            return;
        }
        // Closed means the bus is gone; nothing will ever be cancelled
        // again, so treat it as a cancellation too
        let _ = self.receiver.recv().await;
        self.cancelled = true;
    }
}
