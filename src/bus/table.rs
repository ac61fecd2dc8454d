//! # Subscription table: one lock-guarded mapping from message type to entries.
//!
//! The bus owns two of these (exact and polymorphic). Each is a list of buckets in
//! key-insertion order; a bucket holds the entries for one message type in
//! registration order.
//!
//! ## Rules
//! - Every mutation and every snapshot happens under the table's lock.
//! - Nothing is ever invoked under the lock; callers work on snapshots.
//! - Only [`Table::sweep`] removes entries or buckets. Empty buckets never survive a sweep.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::handles::ErasedHandle;
use crate::routing::MessageType;
use crate::token::Token;

/// One subscription: a weak handle plus its channel token.
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) handle: Arc<dyn ErasedHandle>,
    pub(crate) token: Option<Token>,
}

impl Entry {
    fn is_dead(&self) -> bool {
        !self.handle.is_alive()
    }
}

/// An entry paired with its tombstone state at the moment the snapshot was taken.
#[derive(Clone)]
pub(crate) struct Captured {
    pub(crate) entry: Entry,
    pub(crate) tombstoned: bool,
}

struct Bucket {
    key: MessageType,
    entries: Vec<Entry>,
}

/// Result of one sweep over a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Sweep {
    pub(crate) removed_entries: usize,
    pub(crate) removed_keys: usize,
}

/// Lock-guarded `MessageType -> [Entry]` mapping.
#[derive(Default)]
pub(crate) struct Table {
    buckets: Mutex<Vec<Bucket>>,
}

impl Table {
    fn lock(&self) -> MutexGuard<'_, Vec<Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `entry` under `key`, creating the bucket if needed.
    pub(crate) fn insert(&self, key: MessageType, entry: Entry) {
        let mut buckets = self.lock();
        match buckets.iter_mut().find(|bucket| bucket.key == key) {
            Some(bucket) => bucket.entries.push(entry),
            None => buckets.push(Bucket {
                key,
                entries: vec![entry],
            }),
        }
    }

    /// Snapshot of the keys currently present, in insertion order.
    pub(crate) fn keys(&self) -> Vec<MessageType> {
        self.lock().iter().map(|bucket| bucket.key).collect()
    }

    /// Snapshot of the entries under `key`, if the key is present.
    ///
    /// Tombstones are frozen into the snapshot: an unregister that happens while the
    /// snapshot is being delivered does not change who receives it.
    pub(crate) fn snapshot(&self, key: MessageType) -> Option<Vec<Captured>> {
        self.lock()
            .iter()
            .find(|bucket| bucket.key == key)
            .map(|bucket| {
                bucket
                    .entries
                    .iter()
                    .map(|entry| Captured {
                        entry: entry.clone(),
                        tombstoned: entry.handle.is_tombstoned(),
                    })
                    .collect()
            })
    }

    /// Tombstones every entry matching `pred`, within `key` only if given.
    ///
    /// Returns how many entries this call tombstoned.
    pub(crate) fn tombstone_where<P>(&self, key: Option<MessageType>, pred: P) -> usize
    where
        P: Fn(&Entry) -> bool,
    {
        let buckets = self.lock();
        buckets
            .iter()
            .filter(|bucket| key.map_or(true, |key| bucket.key == key))
            .flat_map(|bucket| bucket.entries.iter())
            .filter(|entry| pred(entry))
            .filter(|entry| entry.handle.tombstone())
            .count()
    }

    /// Physically removes dead entries, then empty buckets.
    pub(crate) fn sweep(&self) -> Sweep {
        let mut buckets = self.lock();
        let mut sweep = Sweep::default();
        for bucket in buckets.iter_mut() {
            let before = bucket.entries.len();
            bucket.entries.retain(|entry| !entry.is_dead());
            sweep.removed_entries += before - bucket.entries.len();
        }
        let before = buckets.len();
        buckets.retain(|bucket| !bucket.entries.is_empty());
        sweep.removed_keys = before - buckets.len();
        sweep
    }

    /// `(keys, entries)` currently stored, dead or alive.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let buckets = self.lock();
        let entries = buckets.iter().map(|bucket| bucket.entries.len()).sum();
        (buckets.len(), entries)
    }

    /// Returns `true` if `key` has at least one live entry.
    pub(crate) fn has_live(&self, key: MessageType) -> bool {
        self.lock()
            .iter()
            .find(|bucket| bucket.key == key)
            .is_some_and(|bucket| bucket.entries.iter().any(|entry| !entry.is_dead()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::{Handler, WeakHandle};
    use crate::routing::Routable;

    struct Sink;
    impl Routable for Sink {}

    struct Note;

    fn entry(sink: &Arc<Sink>, name: &'static str) -> Entry {
        Entry {
            handle: Arc::new(WeakHandle::bound(
                sink,
                Handler::new(name, |_: &Sink, _: &Note| {}),
            )),
            token: None,
        }
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let sink = Arc::new(Sink);
        let table = Table::default();
        table.insert(MessageType::of::<u32>(), entry(&sink, "a"));
        table.insert(MessageType::of::<Note>(), entry(&sink, "b"));
        table.insert(MessageType::of::<u32>(), entry(&sink, "c"));

        assert_eq!(
            table.keys(),
            vec![MessageType::of::<u32>(), MessageType::of::<Note>()]
        );
        let names: Vec<String> = table
            .snapshot(MessageType::of::<u32>())
            .expect("bucket")
            .iter()
            .map(|c| c.entry.handle.method_name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(table.counts(), (2, 3));
    }

    #[test]
    fn test_snapshot_is_detached_from_later_inserts() {
        let sink = Arc::new(Sink);
        let table = Table::default();
        table.insert(MessageType::of::<Note>(), entry(&sink, "a"));
        let snapshot = table.snapshot(MessageType::of::<Note>()).expect("bucket");
        table.insert(MessageType::of::<Note>(), entry(&sink, "b"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_snapshot_freezes_tombstones() {
        let sink = Arc::new(Sink);
        let table = Table::default();
        table.insert(MessageType::of::<Note>(), entry(&sink, "a"));
        table.insert(MessageType::of::<Note>(), entry(&sink, "b"));
        table.tombstone_where(None, |e| e.handle.method_name() == "a");

        let snapshot = table.snapshot(MessageType::of::<Note>()).expect("bucket");
        table.tombstone_where(None, |_| true);

        let frozen: Vec<bool> = snapshot.iter().map(|c| c.tombstoned).collect();
        assert_eq!(frozen, vec![true, false]);
    }

    #[test]
    fn test_sweep_removes_dead_entries_and_empty_keys() {
        let keep = Arc::new(Sink);
        let gone = Arc::new(Sink);
        let table = Table::default();
        table.insert(MessageType::of::<Note>(), entry(&keep, "keep"));
        table.insert(MessageType::of::<Note>(), entry(&gone, "gone"));
        table.insert(MessageType::of::<u32>(), entry(&gone, "gone"));
        drop(gone);

        assert_eq!(
            table.sweep(),
            Sweep {
                removed_entries: 2,
                removed_keys: 1
            }
        );
        assert_eq!(table.keys(), vec![MessageType::of::<Note>()]);
        assert_eq!(table.counts(), (1, 1));
        assert_eq!(table.sweep(), Sweep::default());
    }

    #[test]
    fn test_tombstone_where_respects_key_and_counts_once() {
        let sink = Arc::new(Sink);
        let table = Table::default();
        table.insert(MessageType::of::<Note>(), entry(&sink, "a"));
        table.insert(MessageType::of::<u32>(), entry(&sink, "a"));

        let hits = table.tombstone_where(Some(MessageType::of::<Note>()), |_| true);
        assert_eq!(hits, 1);
        assert!(!table.has_live(MessageType::of::<Note>()));
        assert!(table.has_live(MessageType::of::<u32>()));

        assert_eq!(table.tombstone_where(None, |_| true), 1);
        assert_eq!(table.tombstone_where(None, |_| true), 0);
        assert_eq!(table.counts(), (2, 2));
    }
}
