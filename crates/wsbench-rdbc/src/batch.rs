//! Batched write pipeline
//!
//! Items are bound onto one prepared statement in arrival order and executed
//! in fixed-size batches. A batch executes as soon as it fills; the remainder
//! executes when the writer is finished. Drivers without native batching get
//! one `execute_update` per item, each reported as a singleton batch.
//!
//! Any failure aborts the pipeline: the statement is closed and the
//! connection released before the error is returned. Batches that already
//! executed are not rolled back here.

use futures::{pin_mut, Stream, StreamExt};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::PreparedStatement;
use crate::error::{DriverError, DriverResult, Error, Result};
use crate::pool::{ConnectionPool, ConnectionScope};

/// Affected-row counts, one array per executed batch in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    batches: Vec<Vec<u64>>,
}

impl BatchResult {
    /// Create from per-batch counts
    pub fn new(batches: Vec<Vec<u64>>) -> Self {
        Self { batches }
    }

    /// Per-batch affected-row counts
    pub fn batches(&self) -> &[Vec<u64>] {
        &self.batches
    }

    /// Number of executed batches
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of items executed across all batches
    pub fn item_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Sum of affected rows across all batches
    pub fn total_affected(&self) -> u64 {
        self.batches.iter().flatten().sum()
    }

    /// Take the per-batch counts
    pub fn into_inner(self) -> Vec<Vec<u64>> {
        self.batches
    }
}

/// 1-based batch index and position within that batch for the `n`th item
pub fn batch_position(n: u64, batch_size: usize) -> (u64, u64) {
    let size = batch_size.max(1) as u64;
    let index = n.div_ceil(size);
    (index, n - (index.saturating_sub(1)) * size)
}

struct OpenStatement {
    statement: Box<dyn PreparedStatement>,
    scope: ConnectionScope,
}

impl OpenStatement {
    fn release(self) -> Result<()> {
        let Self { statement, scope } = self;
        drop(statement);
        scope.release()
    }

    fn release_quietly(self) {
        let Self { statement, scope } = self;
        drop(statement);
        scope.release_quietly();
    }
}

/// Incremental batched writer over one connection and one statement
pub struct BatchWriter<U, B> {
    sql: String,
    batch_size: usize,
    binder: B,
    native_batch: bool,
    open: Option<OpenStatement>,
    pending: usize,
    items: u64,
    result: BatchResult,
    _item: PhantomData<fn(&U)>,
}

impl<U, B> BatchWriter<U, B>
where
    B: FnMut(&mut dyn PreparedStatement, &U) -> DriverResult<()>,
{
    /// Acquire a connection, check batch capability once and prepare `sql`.
    ///
    /// A zero `batch_size` is rejected before the pool is touched.
    pub async fn open(
        pool: &Arc<dyn ConnectionPool>,
        sql: impl Into<String>,
        batch_size: usize,
        binder: B,
    ) -> Result<Self> {
        let sql = sql.into();
        if batch_size == 0 {
            return Err(Error::config("batch size must be positive"));
        }
        debug!(sql = %sql, pool = %pool.name(), batch_size, "Starting batched write");

        let scope = ConnectionScope::acquire(pool).await?;

        let native_batch = match scope.connection().supports_batch_updates().await {
            Ok(supported) => supported,
            Err(e) => {
                debug!(error = %e, "Batch capability check failed");
                false
            }
        };
        if !native_batch {
            warn!(
                pool = %pool.name(),
                "Driver does not support batch updates; resorting to single statement execution"
            );
        }

        let prepared = scope.connection().prepare(&sql).await;
        let statement = match prepared {
            Ok(statement) => statement,
            Err(e) => {
                scope.release_quietly();
                return Err(Error::statement("prepare", sql, e));
            }
        };

        Ok(Self {
            sql,
            batch_size,
            binder,
            native_batch,
            open: Some(OpenStatement { statement, scope }),
            pending: 0,
            items: 0,
            result: BatchResult::default(),
            _item: PhantomData,
        })
    }

    /// Bind `item` and queue it. Returns the batch counts when this item
    /// completed a batch (always, when falling back to single statements).
    pub async fn push(&mut self, item: &U) -> Result<Option<Vec<u64>>> {
        let Some(open) = self.open.as_mut() else {
            return Err(Error::statement(
                "push",
                &self.sql,
                DriverError::other("batch writer already terminated"),
            ));
        };

        open.statement.clear_parameters();
        if let Err(e) = (self.binder)(open.statement.as_mut(), item) {
            return Err(self.fail("bind", e));
        }
        self.items += 1;

        if !self.native_batch {
            let executed = open.statement.execute_update().await;
            return match executed {
                Ok(count) => {
                    let counts = vec![count];
                    self.result.batches.push(counts.clone());
                    Ok(Some(counts))
                }
                Err(e) => Err(self.fail("execute_update", e)),
            };
        }

        if let Err(e) = open.statement.add_batch() {
            return Err(self.fail("add_batch", e));
        }
        self.pending += 1;

        if self.pending == self.batch_size {
            self.flush().await.map(Some)
        } else {
            Ok(None)
        }
    }

    async fn flush(&mut self) -> Result<Vec<u64>> {
        let (index, count) = batch_position(self.items, self.batch_size);
        let Some(open) = self.open.as_mut() else {
            return Ok(Vec::new());
        };
        debug!(sql = %self.sql, batch = index, items = count, "Executing batch");

        let executed = open.statement.execute_batch().await;
        match executed {
            Ok(counts) => {
                self.pending = 0;
                self.result.batches.push(counts.clone());
                Ok(counts)
            }
            Err(e) => Err(self.fail("execute_batch", e)),
        }
    }

    fn fail(&mut self, operation: &'static str, source: DriverError) -> Error {
        if let Some(open) = self.open.take() {
            open.release_quietly();
        }
        Error::statement(operation, &self.sql, source)
    }

    /// Execute the remaining partial batch, release the connection and
    /// return every batch's counts.
    pub async fn finish(mut self) -> Result<BatchResult> {
        if self.open.is_none() {
            return Err(Error::statement(
                "finish",
                &self.sql,
                DriverError::other("batch writer already terminated"),
            ));
        }
        if self.pending > 0 {
            self.flush().await?;
        }
        debug!(
            sql = %self.sql,
            items = self.items,
            batches = self.result.batch_count(),
            "Batched write completed"
        );
        if let Some(open) = self.open.take() {
            open.release()?;
        }
        Ok(std::mem::take(&mut self.result))
    }

    /// Items accepted so far
    pub fn items_written(&self) -> u64 {
        self.items
    }

    /// Items bound but not yet executed
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Whether the driver executes native batches
    pub fn is_native_batch(&self) -> bool {
        self.native_batch
    }

    /// Whether the writer failed or finished
    pub fn is_terminated(&self) -> bool {
        self.open.is_none()
    }
}

impl<U, B> Drop for BatchWriter<U, B> {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            if self.pending > 0 {
                warn!(sql = %self.sql, pending = self.pending, "Batched write abandoned with unexecuted items");
            }
            open.release_quietly();
        }
    }
}

impl<U, B> std::fmt::Debug for BatchWriter<U, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("sql", &self.sql)
            .field("batch_size", &self.batch_size)
            .field("native_batch", &self.native_batch)
            .field("items", &self.items)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Drive a [`BatchWriter`] from `items` until the stream ends.
///
/// Fails the whole call on the first error; counts of batches executed
/// before the failure are not returned.
pub async fn batch_write<U, S, B>(
    pool: &Arc<dyn ConnectionPool>,
    sql: impl Into<String>,
    items: S,
    batch_size: usize,
    binder: B,
) -> Result<BatchResult>
where
    S: Stream<Item = U>,
    B: FnMut(&mut dyn PreparedStatement, &U) -> DriverResult<()>,
{
    let mut writer = BatchWriter::open(pool, sql, batch_size, binder).await?;
    pin_mut!(items);
    while let Some(item) = items.next().await {
        writer.push(&item).await?;
    }
    writer.finish().await
}
