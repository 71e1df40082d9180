// Per-guild mutual exclusion for coordinated side effects.
//
// One tokio Mutex per guild, created lazily on first use and kept for the
// lifetime of the process. tokio's Mutex hands the lock to waiters in FIFO
// order, so pipelines for the same guild run in arrival order.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Timed out after {waited:?} waiting for the lock of guild {guild_id}")]
    Timeout { guild_id: u64, waited: Duration },
}

#[derive(Debug, Default)]
struct LockCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Snapshot of how many guards were handed out and dropped.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStats {
    pub acquired: u64,
    pub released: u64,
}

#[allow(dead_code)]
impl LockStats {
    pub fn is_balanced(&self) -> bool {
        self.acquired == self.released
    }
}

/// Registry of guild locks.
///
/// Locks are never removed: guild cardinality is bounded and an idle
/// `Mutex<()>` is a few bytes.
pub struct GuildLockRegistry {
    locks: DashMap<u64, Arc<Mutex<()>>>,
    counters: Arc<LockCounters>,
}

/// Held lock for one guild. Dropping it releases the lock, so every exit
/// path out of the protected section (return, `?`, panic, cancellation)
/// releases exactly once.
pub struct GuildLockGuard {
    guild_id: u64,
    counters: Arc<LockCounters>,
    _guard: OwnedMutexGuard<()>,
}

impl GuildLockGuard {
    #[allow(dead_code)]
    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }
}

impl Drop for GuildLockGuard {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(guild_id = self.guild_id, "Guild lock released");
    }
}

impl GuildLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            counters: Arc::new(LockCounters::default()),
        }
    }

    /// Get (or lazily create) the mutex for a guild.
    ///
    /// `entry` holds the shard lock while inserting, so two tasks racing on a
    /// guild's first use always end up sharing the same mutex. The map
    /// reference is dropped before returning; never hold it across an await.
    fn lock_for(&self, guild_id: u64) -> Arc<Mutex<()>> {
        self.locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn guard(&self, guild_id: u64, guard: OwnedMutexGuard<()>) -> GuildLockGuard {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(guild_id, "Guild lock acquired");
        GuildLockGuard {
            guild_id,
            counters: Arc::clone(&self.counters),
            _guard: guard,
        }
    }

    /// Wait (without spinning) until the guild's lock is free and take it.
    pub async fn acquire(&self, guild_id: u64) -> GuildLockGuard {
        let guard = self.lock_for(guild_id).lock_owned().await;
        self.guard(guild_id, guard)
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub async fn acquire_timeout(
        &self,
        guild_id: u64,
        timeout: Duration,
    ) -> Result<GuildLockGuard, LockError> {
        match tokio::time::timeout(timeout, self.lock_for(guild_id).lock_owned()).await {
            Ok(guard) => Ok(self.guard(guild_id, guard)),
            Err(_) => Err(LockError::Timeout {
                guild_id,
                waited: timeout,
            }),
        }
    }

    /// Whether some task currently holds the guild's lock.
    #[allow(dead_code)]
    pub fn is_held(&self, guild_id: u64) -> bool {
        match self.locks.get(&guild_id) {
            Some(lock) => {
                let held = lock.try_lock().is_err();
                held
            }
            None => false,
        }
    }

    #[allow(dead_code)]
    pub fn stats(&self) -> LockStats {
        LockStats {
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
        }
    }

    /// Number of guilds that have ever taken a lock.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Default for GuildLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn test_second_acquire_waits_for_release() {
        let registry = Arc::new(GuildLockRegistry::new());
        let guard = registry.acquire(1).await;

        let result = registry
            .acquire_timeout(1, Duration::from_millis(30))
            .await;
        assert!(matches!(
            result,
            Err(LockError::Timeout { guild_id: 1, .. })
        ));

        drop(guard);
        let result = registry
            .acquire_timeout(1, Duration::from_millis(30))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_different_guilds_do_not_contend() {
        let registry = GuildLockRegistry::new();
        let _first = registry.acquire(1).await;

        let second = registry
            .acquire_timeout(2, Duration::from_millis(30))
            .await
            .unwrap();
        assert_eq!(second.guild_id(), 2);
        assert!(registry.is_held(1));
        assert!(registry.is_held(2));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_and_counts_balance() {
        let registry = GuildLockRegistry::new();
        assert!(!registry.is_held(7));

        {
            let _guard = registry.acquire(7).await;
            assert!(registry.is_held(7));
            assert!(!registry.stats().is_balanced());
        }

        assert!(!registry.is_held(7));
        assert_eq!(
            registry.stats(),
            LockStats {
                acquired: 1,
                released: 1
            }
        );
    }

    #[tokio::test]
    async fn test_timed_out_acquire_is_not_counted() {
        let registry = GuildLockRegistry::new();
        let _guard = registry.acquire(3).await;
        let _ = registry.acquire_timeout(3, Duration::from_millis(10)).await;

        assert_eq!(registry.stats().acquired, 1);
    }

    #[tokio::test]
    async fn test_waiters_are_served_in_arrival_order() {
        let registry = Arc::new(GuildLockRegistry::new());
        let order = Arc::new(StdMutex::new(Vec::new()));
        let holder = registry.acquire(1).await;

        let mut handles = Vec::new();
        for id in 0..3 {
            let registry = Arc::clone(&registry);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire(1).await;
                order.lock().unwrap().push(id);
            }));
            // Let the task reach the lock's wait queue before spawning the next.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(holder);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_panic_inside_section_releases_lock() {
        let registry = Arc::new(GuildLockRegistry::new());

        let task_registry = Arc::clone(&registry);
        let result = tokio::spawn(async move {
            let _guard = task_registry.acquire(9).await;
            panic!("boom");
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert!(!registry.is_held(9));
        assert!(registry.stats().is_balanced());
    }
}
