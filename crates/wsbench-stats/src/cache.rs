//! Concurrent call correlation cache
//!
//! Request handlers register the server-side view of each call as it is
//! served. When the client later submits its own view of the same calls,
//! [`StatisticsCache::merge`] folds the cached server timestamps into the
//! client's records.
//!
//! Per key the lifecycle is `absent -> registered -> registered(merged)`.
//! Keys are never removed one by one; [`StatisticsCache::purge`] drops
//! everything between benchmark runs.
//!
//! Merging is a best-effort annotation, not a transactional update: a merge
//! for a key that was never registered (or was purged) does nothing.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

use crate::call::{CallKey, CallRecord, UNSET};

#[derive(Debug, Clone)]
struct Entry {
    call: CallRecord,
    merged: bool,
}

/// Process-wide map of calls by correlation key
#[derive(Debug, Default)]
pub struct StatisticsCache {
    calls: Mutex<HashMap<CallKey, Entry>>,
}

impl StatisticsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record stored under `call.key()`
    pub fn register(&self, call: CallRecord) {
        let key = call.key();
        trace!(key = %key, "Registering call");
        self.calls.lock().insert(key, Entry { call, merged: false });
    }

    /// Fold the cached record for `call.key()` into `call`.
    ///
    /// Server timestamps recorded in the cache are copied onto `call`; the
    /// client-side fields of `call` are recorded on the cached entry, which
    /// becomes merged. Returns `false`, creating nothing, when the key is
    /// absent.
    pub fn merge(&self, call: &mut CallRecord) -> bool {
        let key = call.key();
        let mut calls = self.calls.lock();
        let Some(entry) = calls.get_mut(&key) else {
            trace!(key = %key, "No registered call to merge");
            return false;
        };

        let cached = &mut entry.call;
        fill(&mut cached.server_start, &mut call.server_start);
        fill(&mut cached.server_end, &mut call.server_end);
        fill(&mut call.client_start, &mut cached.client_start);
        fill(&mut call.client_end, &mut cached.client_end);
        cached.ok = call.ok;
        cached.error_message = call.error_message.clone();
        entry.merged = true;

        trace!(key = %key, "Merged call");
        true
    }

    /// Drop every entry, returns how many were dropped
    pub fn purge(&self) -> usize {
        let mut calls = self.calls.lock();
        let dropped = calls.len();
        calls.clear();
        trace!(dropped, "Purged statistics cache");
        dropped
    }

    /// Copy of the record stored under `key`
    pub fn get(&self, key: &CallKey) -> Option<CallRecord> {
        self.calls.lock().get(key).map(|entry| entry.call.clone())
    }

    /// Whether `key` is registered and has been merged
    pub fn is_merged(&self, key: &CallKey) -> bool {
        self.calls.lock().get(key).is_some_and(|entry| entry.merged)
    }

    /// Number of registered calls
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Whether no call is registered
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Make both timestamps equal, preferring `preferred` when it is recorded
fn fill(preferred: &mut i64, other: &mut i64) {
    if *preferred == UNSET {
        *preferred = *other;
    }
    *other = *preferred;
}
