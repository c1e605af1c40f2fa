use std::sync::Arc;
use std::time::Duration;

use firefly_core::StatusRecord;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mailbox::StatusMailbox;
use crate::registry::{DeliveryError, SubscriberRegistry};

#[derive(Debug, Clone, Copy)]
pub struct BroadcastOptions {
    /// How long to yield when the queue comes up empty. Bounds worst-case
    /// fan-out latency without busy-spinning.
    pub poll_interval: Duration,
    /// Cap on each individual delivery attempt.
    pub delivery_timeout: Duration,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            delivery_timeout: Duration::from_millis(100),
        }
    }
}

/// Drain the mailbox and fan each record out to every live subscriber,
/// forever. Stops only when `cancel` fires.
pub async fn run(
    mailbox: Arc<StatusMailbox>,
    registry: SubscriberRegistry,
    options: BroadcastOptions,
    cancel: CancellationToken,
) {
    info!(
        poll_interval_ms = options.poll_interval.as_millis() as u64,
        delivery_timeout_ms = options.delivery_timeout.as_millis() as u64,
        "broadcast loop started"
    );

    loop {
        let drained = mailbox.drain_all();

        if drained.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(options.poll_interval) => {}
            }
            continue;
        }

        for record in drained {
            fan_out(&registry, &record, options.delivery_timeout).await;
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    info!("broadcast loop stopped");
}

/// Deliver one record to a snapshot of the current subscribers,
/// concurrently. A failure or timeout on one subscriber unregisters that
/// subscriber and nothing else.
pub(crate) async fn fan_out(
    registry: &SubscriberRegistry,
    record: &StatusRecord,
    delivery_timeout: Duration,
) {
    let subscribers = registry.snapshot_all().await;
    if subscribers.is_empty() {
        debug!(sequence = record.sequence, "no subscribers, record dropped on the floor");
        return;
    }

    let mut deliveries = JoinSet::new();
    for (id, sink) in subscribers {
        let record = record.clone();
        deliveries.spawn(async move {
            let result = match tokio::time::timeout(delivery_timeout, sink.deliver(&record)).await
            {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout),
            };
            (id, result)
        });
    }

    while let Some(joined) = deliveries.join_next().await {
        let Ok((id, result)) = joined else {
            continue;
        };
        if let Err(e) = result {
            warn!(subscriber = %id.0, error = %e, "delivery failed, dropping subscriber");
            registry.unregister(id).await;
        }
    }
}
