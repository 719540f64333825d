//! Per-epoch nullifier bookkeeping.
//!
//! Each `(epoch, nullifier)` slot admits exactly one share.  The
//! read-check-then-write for a slot must not interleave with another
//! thread's write for the same slot, so the map is split into a fixed array
//! of lock shards keyed by slot hash: same-key operations serialize on one
//! shard while unrelated slots proceed in parallel.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use veil_shared::{Epoch, Nullifier, ShareRecord};

use crate::config::EngineConfig;

type SlotKey = (Epoch, Nullifier);
type Shard = Mutex<HashMap<SlotKey, ShareRecord>>;

/// Outcome of consuming a rate-limit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// Slot was unseen; the share is now recorded.
    Accepted,
    /// Identical share resubmitted for an occupied slot.  A benign retry;
    /// no new information.
    Replayed,
    /// A different share for an occupied slot.  Two points of the sender's
    /// secret-sharing polynomial are now witnessed; together they suffice to
    /// recover the sender's secret key.
    DoubleSignal {
        first: ShareRecord,
        second: ShareRecord,
    },
}

/// Records which `(epoch, nullifier)` slots have been consumed and detects
/// reuse.
pub struct EpochNullifierTracker {
    shards: Vec<Shard>,
}

impl EpochNullifierTracker {
    /// Create a tracker with the given number of lock shards.
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, key: &SlotKey) -> MutexGuard<'_, HashMap<SlotKey, ShareRecord>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        self.shards[idx]
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Atomically consume a slot.  This is the sole concurrency-sensitive
    /// decision point of the engine: the check and the record happen under
    /// one shard lock.
    pub fn try_consume(
        &self,
        epoch: Epoch,
        nullifier: Nullifier,
        share: ShareRecord,
    ) -> SlotDecision {
        let key = (epoch, nullifier);
        let mut map = self.shard(&key);

        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(share);
                SlotDecision::Accepted
            }
            Entry::Occupied(slot) => {
                let first = *slot.get();
                if first == share {
                    SlotDecision::Replayed
                } else {
                    tracing::warn!(
                        epoch = epoch.0,
                        nullifier = %nullifier.to_hex(),
                        "double signal detected"
                    );
                    SlotDecision::DoubleSignal {
                        first,
                        second: share,
                    }
                }
            }
        }
    }

    /// Drop all records for epochs older than `before`.  Returns how many
    /// records were evicted.  Runs off the hot path.
    pub fn evict(&self, before: Epoch) -> usize {
        let mut dropped = 0;
        for shard in &self.shards {
            let mut map = shard
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let len = map.len();
            map.retain(|(epoch, _), _| *epoch >= before);
            dropped += len - map.len();
        }
        dropped
    }

    /// Total number of live slot records across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| {
                s.lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .len()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the periodic eviction sweep.  Runs once per epoch length and drops
/// every record older than the retention window.
pub fn spawn_eviction_task(
    tracker: Arc<EpochNullifierTracker>,
    config: EngineConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(config.epoch_length_ms));
        loop {
            interval.tick().await;
            let current = config.current_epoch();
            let cutoff = Epoch(current.0.saturating_sub(config.retention_epochs));
            let dropped = tracker.evict(cutoff);
            if dropped > 0 {
                tracing::debug!(
                    cutoff = cutoff.0,
                    dropped,
                    "evicted expired nullifier records"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_shared::Share;

    fn share(x: u8, y: u8) -> ShareRecord {
        ShareRecord {
            x: Share([x; 32]),
            y: Share([y; 32]),
        }
    }

    fn nullifier(byte: u8) -> Nullifier {
        Nullifier([byte; 32])
    }

    #[test]
    fn first_consume_accepts() {
        let tracker = EpochNullifierTracker::new(4);
        assert_eq!(
            tracker.try_consume(Epoch(1), nullifier(1), share(1, 1)),
            SlotDecision::Accepted
        );
    }

    #[test]
    fn identical_share_is_a_replay() {
        let tracker = EpochNullifierTracker::new(4);
        tracker.try_consume(Epoch(1), nullifier(1), share(1, 1));
        assert_eq!(
            tracker.try_consume(Epoch(1), nullifier(1), share(1, 1)),
            SlotDecision::Replayed
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn conflicting_share_exposes_both_points() {
        let tracker = EpochNullifierTracker::new(4);
        tracker.try_consume(Epoch(1), nullifier(1), share(1, 1));
        let decision = tracker.try_consume(Epoch(1), nullifier(1), share(2, 2));
        assert_eq!(
            decision,
            SlotDecision::DoubleSignal {
                first: share(1, 1),
                second: share(2, 2),
            }
        );
    }

    #[test]
    fn epochs_have_independent_nullifier_spaces() {
        let tracker = EpochNullifierTracker::new(4);
        assert_eq!(
            tracker.try_consume(Epoch(1), nullifier(1), share(1, 1)),
            SlotDecision::Accepted
        );
        assert_eq!(
            tracker.try_consume(Epoch(2), nullifier(1), share(1, 1)),
            SlotDecision::Accepted
        );
    }

    #[test]
    fn eviction_drops_only_expired_epochs() {
        let tracker = EpochNullifierTracker::new(4);
        tracker.try_consume(Epoch(1), nullifier(1), share(1, 1));
        tracker.try_consume(Epoch(2), nullifier(2), share(2, 2));
        tracker.try_consume(Epoch(5), nullifier(3), share(3, 3));

        assert_eq!(tracker.evict(Epoch(3)), 2);
        assert_eq!(tracker.len(), 1);

        // The evicted slot is consumable again.
        assert_eq!(
            tracker.try_consume(Epoch(1), nullifier(1), share(1, 1)),
            SlotDecision::Accepted
        );
    }

    #[test]
    fn concurrent_same_slot_has_one_winner() {
        let tracker = Arc::new(EpochNullifierTracker::new(8));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    tracker.try_consume(Epoch(7), nullifier(1), share(i, i))
                })
            })
            .collect();

        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let accepted = decisions
            .iter()
            .filter(|d| matches!(d, SlotDecision::Accepted))
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(tracker.len(), 1);
    }
}
