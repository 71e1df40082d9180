// In-memory starboard index.
//
// Mirrors the persisted starboard so reaction updates don't need a database
// round trip to know the current count. It is a cache: the store is the
// source of truth for whether a message is starred.
//
// Anything that reads the store into the index, or deletes from the store,
// must hold the key's lock from `lock_key`. Otherwise a reload can race a
// delete and put the deleted row back into the cache.

use super::starboard_models::{StarboardEntry, StarboardKey};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StarboardIndexEntry {
    pub star_count: u32,
    pub star_message_id: Option<u64>,
}

impl From<&StarboardEntry> for StarboardIndexEntry {
    fn from(entry: &StarboardEntry) -> Self {
        Self {
            star_count: entry.star_count,
            star_message_id: entry.star_message_id,
        }
    }
}

type KeyLocks = DashMap<StarboardKey, Arc<Mutex<()>>>;

pub struct StarboardIndex {
    entries: DashMap<StarboardKey, StarboardIndexEntry>,
    key_locks: KeyLocks,
}

/// Exclusive access to one message's starboard state. Dropping it releases
/// the key and forgets the mutex once nobody else is waiting on it.
pub struct StarboardKeyGuard<'a> {
    key: StarboardKey,
    locks: &'a KeyLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for StarboardKeyGuard<'_> {
    fn drop(&mut self) {
        // Our own guard holds a reference to the mutex; let go of it first.
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl StarboardIndex {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            key_locks: DashMap::new(),
        }
    }

    /// Wait for and take the lock of `key`. Waiters are served in FIFO order.
    ///
    /// Waiters hold a clone of the mutex, so the cleanup in the guard's drop
    /// never removes a mutex that someone is queued on.
    pub async fn lock_key(&self, key: StarboardKey) -> StarboardKeyGuard<'_> {
        let lock = self
            .key_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        StarboardKeyGuard {
            key,
            locks: &self.key_locks,
            guard: Some(guard),
        }
    }

    /// Keys with a live lock (held or waited on).
    #[allow(dead_code)]
    pub fn locked_keys(&self) -> usize {
        self.key_locks.len()
    }

    pub fn get(&self, key: &StarboardKey) -> Option<StarboardIndexEntry> {
        self.entries.get(key).map(|e| *e)
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &StarboardKey) -> bool {
        self.entries.contains_key(key)
    }

    #[allow(dead_code)]
    pub fn insert(&self, key: StarboardKey, entry: StarboardIndexEntry) {
        self.entries.insert(key, entry);
    }

    /// Insert `entry` unless the key is already cached. Returns the cached value.
    pub fn hydrate(&self, key: StarboardKey, entry: StarboardIndexEntry) -> StarboardIndexEntry {
        *self.entries.entry(key).or_insert(entry)
    }

    /// Apply a star count change, saturating at zero. Returns the new count.
    pub fn adjust(&self, key: StarboardKey, delta: i64) -> u32 {
        let mut entry = self.entries.entry(key).or_default();
        let count = (i64::from(entry.star_count) + delta).clamp(0, i64::from(u32::MAX));
        entry.star_count = count as u32;
        entry.star_count
    }

    /// Record the starboard mirror of a cached message.
    pub fn set_star_message(&self, key: &StarboardKey, star_message_id: u64) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.star_message_id = Some(star_message_id);
        }
    }

    pub fn remove(&self, key: &StarboardKey) -> Option<StarboardIndexEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StarboardIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(StarboardKey::new(11, 222).to_string(), "11:222");
    }

    #[test]
    fn test_adjust_saturates_at_zero() {
        let index = StarboardIndex::new();
        let key = StarboardKey::new(1, 2);

        assert_eq!(index.adjust(key, 1), 1);
        assert_eq!(index.adjust(key, 1), 2);
        assert_eq!(index.adjust(key, -5), 0);
    }

    #[test]
    fn test_hydrate_keeps_existing_entry() {
        let index = StarboardIndex::new();
        let key = StarboardKey::new(1, 2);
        index.adjust(key, 3);

        let cached = index.hydrate(
            key,
            StarboardIndexEntry {
                star_count: 1,
                star_message_id: None,
            },
        );
        assert_eq!(cached.star_count, 3);
    }

    #[test]
    fn test_remove_and_star_message() {
        let index = StarboardIndex::new();
        let key = StarboardKey::new(1, 2);
        index.adjust(key, 1);
        index.set_star_message(&key, 99);

        assert_eq!(index.get(&key).unwrap().star_message_id, Some(99));
        assert!(index.remove(&key).is_some());
        assert!(index.is_empty());
        assert!(index.remove(&key).is_none());
    }

    #[tokio::test]
    async fn test_lock_key_is_exclusive_per_key() {
        let index = Arc::new(StarboardIndex::new());
        let key = StarboardKey::new(1, 2);

        let held = index.lock_key(key).await;

        // Other keys are independent.
        let other = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            index.lock_key(StarboardKey::new(1, 3)),
        )
        .await;
        assert!(other.is_ok());
        drop(other);

        let waiter = {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                let _guard = index.lock_key(key).await;
                index.adjust(key, 1)
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert!(index.get(&key).is_none());

        drop(held);
        assert_eq!(waiter.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_released_key_locks_are_forgotten() {
        let index = StarboardIndex::new();
        let key = StarboardKey::new(1, 2);

        let guard = index.lock_key(key).await;
        assert_eq!(index.locked_keys(), 1);
        drop(guard);
        assert_eq!(index.locked_keys(), 0);

        // A fresh lock is handed out after cleanup.
        let _again = index.lock_key(key).await;
        assert_eq!(index.locked_keys(), 1);
    }
}
