//! Tests for the statistics correlation cache

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use wsbench_stats::{CallKey, CallRecord, StatisticsCache, UNSET};

fn served(seq: i64) -> CallRecord {
    CallRecord::new("rest", "list", seq).with_server_times(1_000 + seq, 2_000 + seq)
}

fn observed(seq: i64) -> CallRecord {
    CallRecord::new("rest", "list", seq)
        .with_client_times(500 + seq, 2_500 + seq)
        .succeeded()
}

// ==================== Merge ====================

#[test]
fn test_merge_copies_server_times_onto_client_record() {
    let cache = StatisticsCache::new();
    cache.register(served(1));

    let mut call = observed(1);
    assert!(cache.merge(&mut call));

    assert_eq!(call.server_start, 1_001);
    assert_eq!(call.server_end, 2_001);
    assert_eq!(call.client_start, 501);
    assert_eq!(call.server_duration(), Some(1_000));
}

#[test]
fn test_merge_is_visible_to_later_reads() {
    let cache = StatisticsCache::new();
    cache.register(served(1));
    let key = CallKey::new("rest", "list", 1);
    assert!(!cache.is_merged(&key));

    let mut call = observed(1);
    cache.merge(&mut call);

    let stored = cache.get(&key).unwrap();
    assert_eq!(stored, call);
    assert!(stored.ok);
    assert!(cache.is_merged(&key));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_merge_keeps_client_server_times_when_cache_has_none() {
    let cache = StatisticsCache::new();
    cache.register(CallRecord::new("rest", "list", 1));

    let mut call = observed(1).with_server_times(10, 20);
    cache.merge(&mut call);

    assert_eq!(call.server_start, 10);
    assert_eq!(cache.get(&call.key()).unwrap().server_end, 20);
}

#[test]
fn test_merge_absent_key_is_noop() {
    let cache = StatisticsCache::new();
    cache.register(served(1));

    let mut call = observed(2);
    let before = call.clone();
    assert!(!cache.merge(&mut call));

    assert_eq!(call, before);
    assert_eq!(call.server_start, UNSET);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&call.key()).is_none());
}

#[test]
fn test_keys_differ_by_protocol_and_method() {
    let cache = StatisticsCache::new();
    cache.register(served(1));

    let mut other_protocol = CallRecord::new("thrift", "list", 1);
    let mut other_method = CallRecord::new("rest", "get", 1);
    assert!(!cache.merge(&mut other_protocol));
    assert!(!cache.merge(&mut other_method));
}

#[test]
fn test_failed_call_status_is_merged() {
    let cache = StatisticsCache::new();
    cache.register(served(3));

    let mut call = CallRecord::new("rest", "list", 3).failed("deadline exceeded");
    cache.merge(&mut call);

    let stored = cache.get(&call.key()).unwrap();
    assert!(!stored.ok);
    assert_eq!(stored.error_message.as_deref(), Some("deadline exceeded"));
}

// ==================== Purge ====================

#[test]
fn test_purge_then_merge_is_noop() {
    let cache = StatisticsCache::new();
    for seq in 0..10 {
        cache.register(served(seq));
    }

    assert_eq!(cache.purge(), 10);
    assert!(cache.is_empty());

    let mut call = observed(4);
    assert!(!cache.merge(&mut call));
    assert_eq!(call.server_start, UNSET);
    assert!(cache.is_empty());
}

// ==================== Concurrency ====================

#[test]
fn test_concurrent_register_from_threads() {
    let cache = Arc::new(StatisticsCache::new());

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    cache.register(served(t * 100 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 1_600);
    for seq in 0..1_600 {
        assert!(cache.get(&CallKey::new("rest", "list", seq)).is_some());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_and_merge_from_tasks() {
    let cache = Arc::new(StatisticsCache::new());

    let registrations: Vec<_> = (0..64)
        .map(|seq| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.register(served(seq)) })
        })
        .collect();
    for handle in registrations {
        handle.await.unwrap();
    }

    let merges: Vec<_> = (0..64)
        .map(|seq| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let mut call = observed(seq);
                cache.merge(&mut call).then_some(call)
            })
        })
        .collect();
    for (seq, handle) in merges.into_iter().enumerate() {
        let call = handle.await.unwrap().unwrap();
        assert_eq!(call.server_start, 1_000 + seq as i64);
    }
    assert_eq!(cache.len(), 64);
}

proptest! {
    #[test]
    fn prop_distinct_registrations_are_all_visible(seqs in proptest::collection::hash_set(0i64..10_000, 0..200)) {
        let cache = StatisticsCache::new();
        for seq in &seqs {
            cache.register(served(*seq));
        }
        prop_assert_eq!(cache.len(), seqs.len());
    }
}
