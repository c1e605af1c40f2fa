use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use firefly_core::{StatusRecord, SubscriberId};
use tokio::sync::RwLock;
use tracing::info;
use ulid::Ulid;

use crate::mailbox::StatusMailbox;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscriber connection closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
    #[error("delivery timed out")]
    Timeout,
}

/// Outbound channel to one subscriber. Implementations serialize the record
/// and push it down whatever connection the subscriber arrived on.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn deliver(&self, record: &StatusRecord) -> Result<(), DeliveryError>;
}

/// Live set of subscriber connections.
///
/// All operations are safe to call concurrently with each other and with a
/// broadcast in progress; the broadcast iterates over a snapshot, so
/// registry mutation never invalidates an in-flight fan-out.
#[derive(Clone)]
pub struct SubscriberRegistry {
    mailbox: Arc<StatusMailbox>,
    subscribers: Arc<RwLock<HashMap<SubscriberId, Arc<dyn StatusSink>>>>,
}

impl SubscriberRegistry {
    pub fn new(mailbox: Arc<StatusMailbox>) -> Self {
        Self {
            mailbox,
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a subscriber and immediately deliver it a snapshot of the latest
    /// status (the sentinel if nothing has ever been ingested). If the
    /// snapshot delivery fails the subscriber is removed again and the
    /// error returned.
    pub async fn register(
        &self,
        sink: Arc<dyn StatusSink>,
    ) -> Result<SubscriberId, DeliveryError> {
        let id = SubscriberId(Ulid::new());

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, Arc::clone(&sink));
        }

        let snapshot = self.mailbox.latest();
        if let Err(e) = sink.deliver(&snapshot).await {
            self.unregister(id).await;
            return Err(e);
        }

        info!(subscriber = %id.0, "subscriber registered");
        Ok(id)
    }

    /// Remove a subscriber. Idempotent: removing an absent id is a no-op.
    pub async fn unregister(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            info!(subscriber = %id.0, "subscriber unregistered");
        }
    }

    /// The current set of live connections, for iteration by the broadcast
    /// loop.
    pub async fn snapshot_all(&self) -> Vec<(SubscriberId, Arc<dyn StatusSink>)> {
        let subscribers = self.subscribers.read().await;
        subscribers
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use firefly_core::LedState;
    use ordered_float::NotNan;

    use super::*;

    struct RecordingSink {
        received: Mutex<Vec<StatusRecord>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<StatusRecord> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn deliver(&self, record: &StatusRecord) -> Result<(), DeliveryError> {
            self.received.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct ClosedSink;

    #[async_trait]
    impl StatusSink for ClosedSink {
        async fn deliver(&self, _record: &StatusRecord) -> Result<(), DeliveryError> {
            Err(DeliveryError::Closed)
        }
    }

    fn record(state: LedState, sequence: u64) -> StatusRecord {
        StatusRecord {
            state,
            sequence,
            device_label: "metro-m4".into(),
            reporter_address: "10.0.0.7".into(),
            observed_at: NotNan::new(sequence as f64).unwrap(),
        }
    }

    #[tokio::test]
    async fn register_delivers_sentinel_when_nothing_ingested() {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(Arc::clone(&mailbox));

        let sink = RecordingSink::new();
        registry.register(sink.clone()).await.unwrap();

        assert_eq!(sink.received(), vec![StatusRecord::sentinel()]);
    }

    #[tokio::test]
    async fn snapshot_reflects_most_recent_ingest() {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(Arc::clone(&mailbox));

        // Two reports land before anyone subscribes.
        mailbox.publish(record(LedState::On, 5));
        mailbox.publish(record(LedState::Off, 6));

        let sink = RecordingSink::new();
        registry.register(sink.clone()).await.unwrap();

        let received = sink.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].state, LedState::Off);
        assert_eq!(received[0].sequence, 6);
    }

    #[tokio::test]
    async fn failed_snapshot_removes_subscriber() {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(mailbox);

        let result = registry.register(Arc::new(ClosedSink)).await;
        assert!(result.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(mailbox);

        let id = registry.register(RecordingSink::new()).await.unwrap();
        assert_eq!(registry.len().await, 1);

        registry.unregister(id).await;
        registry.unregister(id).await;
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn snapshot_all_returns_every_live_subscriber() {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(mailbox);

        let a = registry.register(RecordingSink::new()).await.unwrap();
        let b = registry.register(RecordingSink::new()).await.unwrap();

        let mut ids: Vec<SubscriberId> =
            registry.snapshot_all().await.into_iter().map(|(id, _)| id).collect();
        ids.sort_by_key(|id| id.0);
        let mut expected = vec![a, b];
        expected.sort_by_key(|id| id.0);
        assert_eq!(ids, expected);
    }
}
