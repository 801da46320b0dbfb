//! Tests for wsbench-rdbc batched writes

use futures::channel::mpsc;
use futures::{stream, SinkExt};
use proptest::prelude::*;
use std::sync::Arc;
use wsbench_rdbc::prelude::*;
use wsbench_rdbc::testing::{MockEvent, MockPool};

const INSERT: &str = "INSERT INTO Phone (customer_id, number, type) VALUES (?, ?, ?)";

fn bind_item(stmt: &mut dyn PreparedStatement, item: &i64) -> DriverResult<()> {
    stmt.bind(1, Value::from(*item))
}

fn pool() -> (Arc<MockPool>, Arc<dyn ConnectionPool>) {
    let mock = MockPool::new("customer");
    let pool: Arc<dyn ConnectionPool> = mock.clone();
    (mock, pool)
}

async fn write(pool: &Arc<dyn ConnectionPool>, n: i64, batch_size: usize) -> Result<BatchResult> {
    batch_write(pool, INSERT, stream::iter(1..=n), batch_size, bind_item).await
}

// ==================== Batching ====================

#[tokio::test]
async fn test_seven_items_batches_of_two() {
    let (mock, pool) = pool();

    let result = write(&pool, 7, 2).await.unwrap();

    assert_eq!(mock.batch_sizes(), vec![2, 2, 2, 1]);
    assert_eq!(result.batch_count(), 4);
    assert_eq!(result.batches(), &[vec![1u64, 1], vec![1, 1], vec![1, 1], vec![1]]);
    assert_eq!(mock.released(), 1);
    assert_eq!(mock.open_statements(), 0);
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_batch() {
    let (mock, pool) = pool();

    let result = write(&pool, 6, 3).await.unwrap();

    assert_eq!(mock.batch_sizes(), vec![3, 3]);
    assert_eq!(result.item_count(), 6);
}

#[tokio::test]
async fn test_items_bound_in_arrival_order() {
    let (mock, pool) = pool();

    write(&pool, 5, 2).await.unwrap();

    let bound: Vec<Value> = mock
        .batches()
        .into_iter()
        .flatten()
        .map(|params| params[0].clone())
        .collect();
    assert_eq!(bound, (1..=5_i64).map(Value::from).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_empty_source_executes_nothing() {
    let (mock, pool) = pool();

    let result = write(&pool, 0, 10).await.unwrap();

    assert_eq!(result.batch_count(), 0);
    assert!(mock.batches().is_empty());
    assert_eq!(mock.acquired(), 1);
    assert_eq!(mock.released(), 1);
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected_before_acquire() {
    let (mock, pool) = pool();

    let err = write(&pool, 3, 0).await.unwrap_err();

    assert!(matches!(err, Error::Configuration { .. }));
    assert_eq!(mock.acquired(), 0);
}

#[tokio::test]
async fn test_affected_counts_are_reported() {
    let mock = MockPool::new("customer").with_affected_rows(0);
    let pool: Arc<dyn ConnectionPool> = mock.clone();

    let result = write(&pool, 3, 2).await.unwrap();

    assert_eq!(result.total_affected(), 0);
    assert_eq!(result.item_count(), 3);
}

// ==================== Fallback ====================

#[tokio::test]
async fn test_fallback_executes_single_statements() {
    let mock = MockPool::new("customer").without_batch_support();
    let pool: Arc<dyn ConnectionPool> = mock.clone();

    let result = write(&pool, 3, 2).await.unwrap();

    assert!(mock.batches().is_empty());
    assert_eq!(mock.updates().len(), 3);
    assert_eq!(result.batches(), &[vec![1u64], vec![1], vec![1]]);
}

#[tokio::test]
async fn test_failed_capability_check_falls_back() {
    let mock = MockPool::new("customer")
        .with_batch_check_error(DriverError::unsupported("metadata unavailable"));
    let pool: Arc<dyn ConnectionPool> = mock.clone();

    let result = write(&pool, 2, 5).await.unwrap();

    assert_eq!(mock.updates().len(), 2);
    assert_eq!(result.batch_count(), 2);
}

// ==================== Failures ====================

#[tokio::test]
async fn test_batch_failure_aborts_whole_call() {
    let (mock, pool) = pool();
    mock.fail_batch_at(2, DriverError::constraint("duplicate key").with_sql_state("23505"));

    let err = write(&pool, 7, 2).await.unwrap_err();

    assert!(err.is_statement());
    assert_eq!(err.sql(), Some(INSERT));
    assert_eq!(err.category(), Some(ErrorCategory::Constraint));
    // first batch executed and is not rolled back here
    assert_eq!(mock.batch_sizes(), vec![2]);
    assert_eq!(mock.released(), 1);
    assert_eq!(mock.open_statements(), 0);
}

#[tokio::test]
async fn test_final_flush_failure_releases() {
    let (mock, pool) = pool();
    mock.fail_batch_at(4, DriverError::timeout("statement timeout"));

    let err = write(&pool, 7, 2).await.unwrap_err();

    assert!(err.is_retriable());
    assert_eq!(mock.outstanding(), 0);
}

#[tokio::test]
async fn test_single_statement_failure_aborts() {
    let mock = MockPool::new("customer").without_batch_support();
    mock.fail_update_at(2, DriverError::constraint("not null"));
    let pool: Arc<dyn ConnectionPool> = mock.clone();

    let err = write(&pool, 5, 2).await.unwrap_err();

    assert!(err.to_string().contains("execute_update"));
    assert_eq!(mock.updates().len(), 1);
    assert_eq!(mock.released(), 1);
}

#[tokio::test]
async fn test_binder_failure_aborts() {
    let (mock, pool) = pool();

    let err = batch_write(&pool, INSERT, stream::iter(1..=5_i64), 2, |stmt, item: &i64| {
        if *item == 3 {
            return Err(DriverError::type_conversion("unsupported phone type"));
        }
        bind_item(stmt, item)
    })
    .await
    .unwrap_err();

    assert!(err.to_string().contains("bind"));
    assert_eq!(mock.batch_sizes(), vec![2]);
    assert_eq!(mock.released(), 1);
}

#[tokio::test]
async fn test_prepare_failure_releases() {
    let (mock, pool) = pool();
    mock.fail_prepare(DriverError::syntax("near VALUES"));

    let err = write(&pool, 3, 2).await.unwrap_err();

    assert!(err.is_statement());
    assert_eq!(mock.released(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producer_keeps_arrival_order() {
    let (mock, pool) = pool();
    let (mut tx, rx) = mpsc::channel::<i64>(4);

    let producer = tokio::spawn(async move {
        for item in 1..=50 {
            if item % 5 == 0 {
                tokio::task::yield_now().await;
            }
            tx.send(item).await.unwrap();
        }
    });

    let result = batch_write(&pool, INSERT, rx, 7, bind_item).await.unwrap();
    producer.await.unwrap();

    assert_eq!(mock.batch_sizes(), vec![7, 7, 7, 7, 7, 7, 7, 1]);
    assert_eq!(result.item_count(), 50);
    let bound: Vec<Value> = mock
        .batches()
        .into_iter()
        .flatten()
        .map(|params| params[0].clone())
        .collect();
    assert_eq!(bound, (1..=50_i64).map(Value::from).collect::<Vec<_>>());
    assert_eq!(mock.acquired(), 1);
    assert_eq!(mock.released(), 1);
}

// ==================== BatchWriter ====================

#[tokio::test]
async fn test_writer_reports_batches_incrementally() {
    let (mock, pool) = pool();

    let mut writer = BatchWriter::open(&pool, INSERT, 2, bind_item).await.unwrap();
    assert!(writer.is_native_batch());
    assert_eq!(writer.push(&1).await.unwrap(), None);
    assert_eq!(writer.push(&2).await.unwrap(), Some(vec![1, 1]));
    assert_eq!(writer.push(&3).await.unwrap(), None);
    assert_eq!(writer.pending(), 1);

    let result = writer.finish().await.unwrap();
    assert_eq!(result.batches(), &[vec![1u64, 1], vec![1]]);
    assert_eq!(mock.released(), 1);
}

#[tokio::test]
async fn test_writer_keeps_results_before_failure() {
    let (mock, pool) = pool();
    mock.fail_batch_at(2, DriverError::new(ErrorCategory::Deadlock, "deadlock detected"));

    let mut writer = BatchWriter::open(&pool, INSERT, 1, bind_item).await.unwrap();
    let first = writer.push(&1).await.unwrap();
    let err = writer.push(&2).await.unwrap_err();

    assert_eq!(first, Some(vec![1]));
    assert!(err.is_retriable());
    assert!(writer.is_terminated());
    assert!(writer.push(&3).await.is_err());
    assert_eq!(mock.released(), 1);
}

#[tokio::test]
async fn test_abandoned_writer_releases() {
    let (mock, pool) = pool();

    let mut writer = BatchWriter::open(&pool, INSERT, 10, bind_item).await.unwrap();
    writer.push(&1).await.unwrap();
    drop(writer);

    assert!(mock.batches().is_empty());
    assert_eq!(mock.released(), 1);
    assert_eq!(mock.events().last(), Some(&MockEvent::Released));
}

// ==================== Properties ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_batch_count_is_ceil(n in 0i64..200, batch_size in 1usize..40) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (mock, pool) = pool();

        let result = rt.block_on(write(&pool, n, batch_size)).unwrap();

        let n = n as usize;
        let expected = n.div_ceil(batch_size);
        prop_assert_eq!(result.batch_count(), expected);
        prop_assert_eq!(result.item_count(), n);

        let sizes = mock.batch_sizes();
        if let Some(last) = sizes.last() {
            let tail = if n % batch_size == 0 { batch_size } else { n % batch_size };
            prop_assert_eq!(*last, tail);
            prop_assert!(sizes[..sizes.len() - 1].iter().all(|s| *s == batch_size));
        }
        prop_assert_eq!(mock.released(), 1);
    }

    #[test]
    fn prop_batch_position_matches_flushes(n in 1u64..10_000, batch_size in 1usize..500) {
        let (index, count) = wsbench_rdbc::batch::batch_position(n, batch_size);
        prop_assert!(count >= 1 && count <= batch_size as u64);
        prop_assert_eq!((index - 1) * batch_size as u64 + count, n);
    }
}
