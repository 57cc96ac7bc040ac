//! Time-based residency cache.
//!
//! [`ExpiringCache`] keeps values in memory for a sliding TTL. Reading an
//! entry with [`ExpiringCache::get`] pushes its deadline forward; an entry
//! that is not read or written for a full TTL is removed by its timer and
//! handed to the configured [`EvictionHook`].
//!
//! There is no size bound. Residency is governed by time alone.

mod expiring;

pub use expiring::{EvictionCause, EvictionHook, ExpiringCache, HookError, Lease};
