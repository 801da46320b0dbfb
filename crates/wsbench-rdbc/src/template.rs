//! Template facade over one connection pool
//!
//! [`RdbcTemplate`] is what data-access code talks to. Every call borrows
//! one connection through the scope guard and returns it when the call (or
//! the returned row sequence) is done.
//!
//! # Example
//!
//! ```rust,ignore
//! use wsbench_rdbc::prelude::*;
//!
//! let template = RdbcTemplate::new(pool);
//!
//! let mut names = template
//!     .query_for_sequence_with_args(
//!         "SELECT first_name FROM Customer WHERE last_name = ?",
//!         &[Value::from("Doe")],
//!         |row, _| row.try_string(0),
//!     )
//!     .await?;
//! while let Some(name) = names.next().await {
//!     println!("{}", name?);
//! }
//! ```

use futures::{stream, Stream};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::batch::{self, BatchResult, BatchWriter};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::connection::{bind_all, PreparedStatement};
use crate::error::{DriverError, DriverResult, Error, Result};
use crate::pool::{with_connection, ConnectionPool};
use crate::sequence::RowSequence;
use crate::types::{FromValue, Row, Value};

/// Query and write operations against one logical database
#[derive(Clone)]
pub struct RdbcTemplate {
    pool: Arc<dyn ConnectionPool>,
    batch_size: usize,
}

impl RdbcTemplate {
    /// Create a template with the default batch size
    pub fn new(pool: Arc<dyn ConnectionPool>) -> Self {
        Self::with_batch_size(pool, DEFAULT_BATCH_SIZE)
    }

    /// Create a template with a configured batch size
    pub fn with_batch_size(pool: Arc<dyn ConnectionPool>, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    /// Underlying pool
    pub fn pool(&self) -> &Arc<dyn ConnectionPool> {
        &self.pool
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Execute `sql` now and return a lazy sequence over its mapped rows.
    ///
    /// `binder` sets the statement parameters; `mapper` receives each row
    /// with its 1-based index.
    pub async fn query_for_sequence<T, B, M>(
        &self,
        sql: &str,
        binder: B,
        mapper: M,
    ) -> Result<RowSequence<T>>
    where
        B: FnOnce(&mut dyn PreparedStatement) -> DriverResult<()>,
        M: FnMut(&Row, u64) -> DriverResult<T> + Send + 'static,
    {
        RowSequence::open(&self.pool, sql, binder, mapper).await
    }

    /// [`query_for_sequence`](Self::query_for_sequence) with positional
    /// arguments
    pub async fn query_for_sequence_with_args<T, M>(
        &self,
        sql: &str,
        args: &[Value],
        mapper: M,
    ) -> Result<RowSequence<T>>
    where
        M: FnMut(&Row, u64) -> DriverResult<T> + Send + 'static,
    {
        RowSequence::open(&self.pool, sql, |stmt| bind_all(stmt, args), mapper).await
    }

    /// Lazy sequence of rows as column name to value maps
    pub async fn query_for_maps(
        &self,
        sql: &str,
        args: &[Value],
    ) -> Result<RowSequence<HashMap<String, Value>>> {
        self.query_for_sequence_with_args(sql, args, |row, _| Ok(row.clone().into_map()))
            .await
    }

    /// Lazy sequence over a single-column result, each value converted to
    /// `T`. A result with any other column count fails on the first row.
    pub async fn query_for_column<T>(&self, sql: &str, args: &[Value]) -> Result<RowSequence<T>>
    where
        T: FromValue + 'static,
    {
        self.query_for_sequence_with_args(sql, args, |row, _| {
            if row.len() != 1 {
                return Err(DriverError::type_conversion(format!(
                    "expected a single column, got {}",
                    row.len()
                )));
            }
            T::from_value(row.try_get(0)?)
        })
        .await
    }

    /// Run a query and collect every mapped row
    pub async fn query<T, M>(&self, sql: &str, args: &[Value], mapper: M) -> Result<Vec<T>>
    where
        M: FnMut(&Row, u64) -> DriverResult<T> + Send + 'static,
    {
        self.query_for_sequence_with_args(sql, args, mapper)
            .await?
            .try_collect()
            .await
    }

    /// Map the first row, if any, and release without reading further rows
    pub async fn query_for_optional<T, M>(
        &self,
        sql: &str,
        args: &[Value],
        mapper: M,
    ) -> Result<Option<T>>
    where
        M: FnMut(&Row, u64) -> DriverResult<T> + Send + 'static,
    {
        let mut sequence = self.query_for_sequence_with_args(sql, args, mapper).await?;
        match sequence.next().await {
            Some(Ok(value)) => {
                sequence.close()?;
                Ok(Some(value))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Execute a single update statement, returns the affected row count
    pub async fn update(&self, sql: &str, args: &[Value]) -> Result<u64> {
        debug!(sql = %sql, "Executing prepared SQL update");
        let sql = sql.to_owned();
        let args = args.to_vec();
        with_connection(&self.pool, move |conn| {
            Box::pin(async move {
                let mut statement = conn
                    .prepare(&sql)
                    .await
                    .map_err(|e| Error::statement("prepare", &sql, e))?;
                bind_all(statement.as_mut(), &args)
                    .map_err(|e| Error::statement("bind", &sql, e))?;
                let updated = statement.execute_update().await;
                updated.map_err(|e| Error::statement("execute_update", &sql, e))
            })
        })
        .await
    }

    /// Write every item of `items` through `sql` in batches of `batch_size`
    pub async fn batch_write<U, S, B>(
        &self,
        sql: &str,
        items: S,
        batch_size: usize,
        binder: B,
    ) -> Result<BatchResult>
    where
        S: Stream<Item = U>,
        B: FnMut(&mut dyn PreparedStatement, &U) -> DriverResult<()>,
    {
        batch::batch_write(&self.pool, sql, items, batch_size, binder).await
    }

    /// [`batch_write`](Self::batch_write) over an in-memory collection with
    /// the configured batch size
    pub async fn batch_write_all<U, I, B>(&self, sql: &str, items: I, binder: B) -> Result<BatchResult>
    where
        I: IntoIterator<Item = U>,
        B: FnMut(&mut dyn PreparedStatement, &U) -> DriverResult<()>,
    {
        self.batch_write(sql, stream::iter(items), self.batch_size, binder)
            .await
    }

    /// Open an incremental batch writer with the configured batch size
    pub async fn batch_writer<U, B>(&self, sql: &str, binder: B) -> Result<BatchWriter<U, B>>
    where
        B: FnMut(&mut dyn PreparedStatement, &U) -> DriverResult<()>,
    {
        BatchWriter::open(&self.pool, sql, self.batch_size, binder).await
    }
}

impl std::fmt::Debug for RdbcTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdbcTemplate")
            .field("pool", &self.pool.name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
