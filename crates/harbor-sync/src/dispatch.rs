use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use harbor_types::actions::ActionBatch;

use crate::batch::ActionSink;

/// Fans dispatched batches out to every subscriber.
#[derive(Clone)]
pub struct BatchDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for batches; every subscriber receives every batch
    broadcast_tx: broadcast::Sender<ActionBatch>,

    /// Total batches dispatched, subscribers or not
    dispatched: AtomicU64,
}

impl BatchDispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                dispatched: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to dispatched batches. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ActionBatch> {
        self.inner.broadcast_tx.subscribe()
    }

    pub fn dispatched_count(&self) -> u64 {
        self.inner.dispatched.load(Ordering::Relaxed)
    }
}

impl Default for BatchDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionSink for BatchDispatcher {
    fn dispatch(&self, batch: ActionBatch) {
        self.inner.dispatched.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error
        let _ = self.inner.broadcast_tx.send(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_types::actions::StateAction;

    #[tokio::test]
    async fn subscribers_receive_whole_batches() {
        let dispatcher = BatchDispatcher::new();
        let mut rx = dispatcher.subscribe();

        let batch = ActionBatch {
            actions: vec![
                StateAction::ReceivedPostsSince { channel_id: "c1".into(), order: vec![] },
                StateAction::ReceivedStatuses { statuses: vec![] },
            ],
        };
        dispatcher.dispatch(batch.clone());

        assert_eq!(rx.recv().await.unwrap(), batch);
        assert_eq!(dispatcher.dispatched_count(), 1);
    }

    #[test]
    fn dispatch_without_subscribers_is_counted() {
        let dispatcher = BatchDispatcher::new();
        dispatcher.dispatch(ActionBatch::default());
        assert_eq!(dispatcher.dispatched_count(), 1);
    }
}
