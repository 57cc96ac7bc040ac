use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::sync::lock_or_recover;

const SOURCE: &str = "cache::expiring";

/// Error type returned by eviction hooks. It is logged and never propagated.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// The TTL elapsed without a touch.
    Expired,
    /// Removed through [`ExpiringCache::delete`] or [`ExpiringCache::clear`].
    Deleted,
}

impl EvictionCause {
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionCause::Expired => "expired",
            EvictionCause::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run once for every entry that expires or is deleted.
///
/// Hooks run on their own task after the entry is already gone from the map,
/// so they may freely call back into the cache (including `set` for the same
/// key).
#[async_trait]
pub trait EvictionHook<K, V>: Send + Sync {
    async fn on_evict(&self, key: K, value: V, cause: EvictionCause) -> Result<(), HookError>;
}

struct Slot<V> {
    value: V,
    epoch: u64,
    deadline: Instant,
    leases: usize,
    timer: JoinHandle<()>,
}

struct Inner<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Slot<V>>>,
    epochs: AtomicU64,
    hook: Option<Arc<dyn EvictionHook<K, V>>>,
}

/// Keyed store with a sliding per-entry TTL and an asynchronous eviction hook.
///
/// All operations must run inside a tokio runtime: each entry owns a timer
/// task, and hooks are spawned rather than awaited.
pub struct ExpiringCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for ExpiringCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::build(ttl, None)
    }

    pub fn with_hook(ttl: Duration, hook: Arc<dyn EvictionHook<K, V>>) -> Self {
        Self::build(ttl, Some(hook))
    }

    fn build(ttl: Duration, hook: Option<Arc<dyn EvictionHook<K, V>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                entries: Mutex::new(HashMap::new()),
                epochs: AtomicU64::new(0),
                hook,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Insert or replace `key`, starting a fresh TTL.
    ///
    /// A replaced value is dropped without running the hook, and its leases
    /// no longer hold the new entry.
    pub fn set(&self, key: K, value: V) {
        let replaced = {
            let mut entries = self.inner.lock("set");
            let slot = self.arm(key.clone(), value);
            entries.insert(key, slot)
        };

        if let Some(previous) = replaced {
            previous.timer.abort();
        }
    }

    /// Lease the value for `key`, touching it. The entry cannot expire until
    /// the returned [`Lease`] is dropped, and dropping it touches it again.
    pub fn lease<Q>(&self, key: &Q) -> Option<Lease<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.inner.lock("lease");
        let Some(key) = entries.get_key_value(key).map(|(key, _)| key.clone()) else {
            counter!("vellum_cache_miss_total").increment(1);
            return None;
        };
        counter!("vellum_cache_hit_total").increment(1);
        let slot = entries.get_mut::<K>(&key)?;
        Some(self.take_lease(key, slot))
    }

    /// Lease the entry for `key`, inserting `value` first unless the key is
    /// already resident. The lease carries whichever value ended up resident.
    pub fn lease_or_insert(&self, key: K, value: V) -> Lease<K, V> {
        let mut entries = self.inner.lock("lease_or_insert");
        let slot = entries
            .entry(key.clone())
            .or_insert_with(|| self.arm(key.clone(), value));
        self.take_lease(key, slot)
    }

    fn take_lease(&self, key: K, slot: &mut Slot<V>) -> Lease<K, V> {
        slot.deadline = Instant::now() + self.inner.ttl;
        slot.leases += 1;
        Lease {
            cache: Arc::downgrade(&self.inner),
            key,
            epoch: slot.epoch,
            value: slot.value.clone(),
        }
    }

    /// Return the value for `key`, sliding its deadline forward.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.inner.lock("get");
        match entries.get_mut(key) {
            Some(slot) => {
                slot.deadline = Instant::now() + self.inner.ttl;
                counter!("vellum_cache_hit_total").increment(1);
                Some(slot.value.clone())
            }
            None => {
                counter!("vellum_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Peek without touching the TTL.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock("has").contains_key(key)
    }

    /// Remove `key`, cancelling its timer. The hook runs exactly once, without
    /// being awaited. Returns whether an entry was removed.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.inner.lock("delete").remove_entry(key);
        match removed {
            Some((key, slot)) => {
                slot.timer.abort();
                self.inner.fire(key, slot.value, EvictionCause::Deleted);
                true
            }
            None => false,
        }
    }

    /// Delete every entry, firing the hook for each.
    pub fn clear(&self) -> usize {
        let drained: Vec<(K, Slot<V>)> = self.inner.lock("clear").drain().collect();
        let count = drained.len();
        for (key, slot) in drained {
            slot.timer.abort();
            self.inner.fire(key, slot.value, EvictionCause::Deleted);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<K> {
        self.inner.lock("keys").keys().cloned().collect()
    }

    /// Clone every resident entry without touching any TTL.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.inner
            .lock("snapshot")
            .iter()
            .map(|(key, slot)| (key.clone(), slot.value.clone()))
            .collect()
    }

    /// Build a slot and spawn its timer. Callers hold the entries lock, so the
    /// timer cannot observe the map before the slot is inserted.
    fn arm(&self, key: K, value: V) -> Slot<V> {
        let epoch = self.inner.epochs.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + self.inner.ttl;
        let timer = tokio::spawn(expire(Arc::downgrade(&self.inner), key, epoch, deadline));
        Slot {
            value,
            epoch,
            deadline,
            leases: 0,
            timer,
        }
    }
}

/// A value checked out of an [`ExpiringCache`].
///
/// While any lease on an entry is alive its timer re-arms instead of
/// removing it. Explicit deletes still apply.
pub struct Lease<K, V>
where
    K: Eq + Hash,
{
    cache: Weak<Inner<K, V>>,
    key: K,
    epoch: u64,
    value: V,
}

impl<K, V> Lease<K, V>
where
    K: Eq + Hash,
{
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V> Drop for Lease<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let Some(inner) = self.cache.upgrade() else {
            return;
        };
        let mut entries = lock_or_recover(&inner.entries, SOURCE, "release");
        if let Some(slot) = entries.get_mut(&self.key) {
            if slot.epoch == self.epoch {
                slot.leases = slot.leases.saturating_sub(1);
                slot.deadline = Instant::now() + inner.ttl;
            }
        }
    }
}

impl<K, V> Inner<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn lock(&self, op: &'static str) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        lock_or_recover(&self.entries, SOURCE, op)
    }

    fn fire(&self, key: K, value: V, cause: EvictionCause) {
        counter!("vellum_cache_evict_total", "cause" => cause.as_str()).increment(1);
        debug!(key = ?key, cause = %cause, "cache entry evicted");

        let Some(hook) = self.hook.clone() else {
            return;
        };
        tokio::spawn(async move {
            let label = format!("{key:?}");
            if let Err(error) = hook.on_evict(key, value, cause).await {
                warn!(key = %label, cause = %cause, error = %error, "eviction hook failed");
            }
        });
    }
}

impl<K, V> Drop for Inner<K, V> {
    fn drop(&mut self) {
        let entries = match self.entries.get_mut() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        for slot in entries.values() {
            slot.timer.abort();
        }
    }
}

/// Timer task for one entry epoch.
///
/// Touches only move `deadline`; the timer re-reads it under the lock and
/// sleeps again if it moved, so expiry and touch are ordered by the lock.
async fn expire<K, V>(cache: Weak<Inner<K, V>>, key: K, epoch: u64, mut deadline: Instant)
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    loop {
        sleep_until(deadline).await;
        let Some(inner) = cache.upgrade() else {
            return;
        };

        let expired = {
            let mut entries = inner.lock("expire");
            let (current, leased) = match entries.get_mut(&key) {
                Some(slot) if slot.epoch == epoch => {
                    let now = Instant::now();
                    if slot.leases > 0 && slot.deadline <= now {
                        slot.deadline = now + inner.ttl;
                    }
                    (slot.deadline, slot.leases > 0)
                }
                _ => return,
            };
            if leased || current > Instant::now() {
                deadline = current;
                None
            } else {
                entries.remove(&key)
            }
        };

        if let Some(slot) = expired {
            inner.fire(key, slot.value, EvictionCause::Expired);
            return;
        }
    }
}
