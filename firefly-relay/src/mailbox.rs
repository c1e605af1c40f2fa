use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use firefly_core::StatusRecord;
use tracing::warn;

pub const DEFAULT_CAPACITY: usize = 1024;

/// Counters for the liveness endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxStats {
    pub queued: usize,
    pub published: u64,
    pub dropped: u64,
}

/// The single handoff point between the ingest path and the broadcast loop.
///
/// One mutex guards both the latest-status slot and the pending queue, so a
/// publish from the ingest side is visible in its entirety to the next
/// drain — no partial-record reads. The lock is a `std::sync::Mutex` because
/// the ingest side must never await while holding it.
pub struct StatusMailbox {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    latest: StatusRecord,
    pending: VecDeque<StatusRecord>,
    published: u64,
    dropped: u64,
}

impl StatusMailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                latest: StatusRecord::sentinel(),
                pending: VecDeque::new(),
                published: 0,
                dropped: 0,
            }),
        }
    }

    /// Overwrite the latest slot and enqueue `record` for broadcast.
    ///
    /// Total: never blocks beyond the lock, never fails. At capacity the
    /// oldest unconsumed record is dropped — only the latest status carries
    /// real information, so staleness loses nothing.
    pub fn publish(&self, record: StatusRecord) {
        let mut inner = self.lock();

        if inner.pending.len() >= self.capacity {
            inner.pending.pop_front();
            inner.dropped += 1;
            warn!(
                capacity = self.capacity,
                dropped_total = inner.dropped,
                "status queue full, dropped oldest pending record"
            );
        }

        inner.latest = record.clone();
        inner.pending.push_back(record);
        inner.published += 1;
    }

    /// Atomically remove and return every queued record, in enqueue order.
    /// The sole consumer-side operation.
    pub fn drain_all(&self) -> Vec<StatusRecord> {
        let mut inner = self.lock();
        inner.pending.drain(..).collect()
    }

    /// Snapshot of the most recently published record (the sentinel until
    /// the first report arrives).
    pub fn latest(&self) -> StatusRecord {
        self.lock().latest.clone()
    }

    pub fn stats(&self) -> MailboxStats {
        let inner = self.lock();
        MailboxStats {
            queued: inner.pending.len(),
            published: inner.published,
            dropped: inner.dropped,
        }
    }

    // Publish must stay total: a poisoned lock still holds a coherent
    // record (every mutation completes before unlock), so recover it
    // instead of propagating.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatusMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use firefly_core::LedState;
    use ordered_float::NotNan;

    use super::*;

    fn record(state: LedState, sequence: u64) -> StatusRecord {
        StatusRecord {
            state,
            sequence,
            device_label: "metro-m4".into(),
            reporter_address: "10.0.0.7".into(),
            observed_at: NotNan::new(1000.0 + sequence as f64).unwrap(),
        }
    }

    #[test]
    fn latest_starts_as_sentinel() {
        let mailbox = StatusMailbox::default();
        assert_eq!(mailbox.latest(), StatusRecord::sentinel());
    }

    #[test]
    fn drain_preserves_enqueue_order() {
        let mailbox = StatusMailbox::default();
        for seq in 0..5 {
            mailbox.publish(record(LedState::On, seq));
        }

        let drained = mailbox.drain_all();
        let sequences: Vec<u64> = drained.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);

        // Second drain finds nothing.
        assert!(mailbox.drain_all().is_empty());
    }

    #[test]
    fn overflow_drops_oldest_first() {
        let mailbox = StatusMailbox::new(3);
        for seq in 0..5 {
            mailbox.publish(record(LedState::Off, seq));
        }

        let sequences: Vec<u64> = mailbox.drain_all().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 3, 4]);
        assert_eq!(mailbox.stats().dropped, 2);
    }

    #[test]
    fn latest_tracks_most_recent_publish() {
        let mailbox = StatusMailbox::default();
        mailbox.publish(record(LedState::On, 5));
        mailbox.publish(record(LedState::Off, 6));

        let latest = mailbox.latest();
        assert_eq!(latest.state, LedState::Off);
        assert_eq!(latest.sequence, 6);
    }

    #[test]
    fn latest_survives_drain() {
        let mailbox = StatusMailbox::default();
        mailbox.publish(record(LedState::On, 1));
        mailbox.drain_all();
        assert_eq!(mailbox.latest().sequence, 1);
    }

    #[test]
    fn overflow_still_overwrites_latest() {
        let mailbox = StatusMailbox::new(1);
        mailbox.publish(record(LedState::On, 1));
        mailbox.publish(record(LedState::Off, 2));
        assert_eq!(mailbox.latest().sequence, 2);
        assert_eq!(mailbox.drain_all().len(), 1);
    }

    #[test]
    fn publishes_from_blocking_threads_are_visible_in_order() {
        let mailbox = Arc::new(StatusMailbox::default());
        let writers = 4;
        let per_writer = 50u64;

        let handles: Vec<_> = (0..writers)
            .map(|writer| {
                let mailbox = Arc::clone(&mailbox);
                std::thread::spawn(move || {
                    for seq in 0..per_writer {
                        let mut r = record(LedState::On, seq);
                        r.device_label = format!("writer-{writer}").into();
                        mailbox.publish(r);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = mailbox.drain_all();
        assert_eq!(drained.len(), writers * per_writer as usize);

        // Each writer's records keep their FIFO order relative to each other.
        for writer in 0..writers {
            let label: Box<str> = format!("writer-{writer}").into();
            let sequences: Vec<u64> = drained
                .iter()
                .filter(|r| r.device_label == label)
                .map(|r| r.sequence)
                .collect();
            let expected: Vec<u64> = (0..per_writer).collect();
            assert_eq!(sequences, expected);
        }
    }
}
