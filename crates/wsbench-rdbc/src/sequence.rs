//! Lazy row sequences over a driver cursor
//!
//! [`RowSequence`] executes its query once, when it is opened, and then
//! materializes rows one pull at a time: every [`RowSequence::next`] advances
//! the driver cursor by one row and applies the caller's row mapper.
//!
//! Resources (cursor, statement, connection) are released, in that order,
//! exactly once:
//! - before the pull that observes completion returns,
//! - before a fetch or mapping error is handed to the caller,
//! - on [`RowSequence::close`], or when the sequence is dropped early.
//!
//! Once a sequence has completed or failed it stays terminated and every
//! further pull returns `None`.

use futures::stream::{self, BoxStream};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::{PreparedStatement, RowStream};
use crate::error::{DriverResult, Error, Result};
use crate::pool::{ConnectionPool, ConnectionScope};
use crate::types::Row;

/// Caller-supplied mapping from a cursor row and its 1-based index to a value
pub type RowMapper<T> = Box<dyn FnMut(&Row, u64) -> DriverResult<T> + Send>;

/// Lifecycle of a row sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Rows may still be pulled
    Open,
    /// The cursor reported its last row
    Completed,
    /// A fetch, mapping or release failure was delivered
    Errored,
    /// The caller closed the sequence before completion
    Cancelled,
}

impl SequenceState {
    /// Whether no further values will be produced
    pub fn is_terminated(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Handles held while the cursor is open
struct OpenCursor {
    cursor: Box<dyn RowStream>,
    statement: Box<dyn PreparedStatement>,
    scope: ConnectionScope,
}

impl OpenCursor {
    /// Close cursor, then statement, then hand the connection back
    fn release(self) -> Result<()> {
        let Self {
            cursor,
            statement,
            scope,
        } = self;
        drop(cursor);
        drop(statement);
        scope.release()
    }

    fn release_quietly(self) {
        let Self {
            cursor,
            statement,
            scope,
        } = self;
        drop(cursor);
        drop(statement);
        scope.release_quietly();
    }
}

/// Pull-based sequence of mapped rows
pub struct RowSequence<T> {
    sql: String,
    open: Option<OpenCursor>,
    mapper: RowMapper<T>,
    rows_read: u64,
    state: SequenceState,
}

impl<T> RowSequence<T> {
    /// Acquire a connection, prepare `sql`, bind parameters with `binder` and
    /// execute the query. Rows are not fetched until pulled.
    ///
    /// Any failure here releases whatever was acquired before returning.
    pub async fn open<B, M>(
        pool: &Arc<dyn ConnectionPool>,
        sql: impl Into<String>,
        binder: B,
        mapper: M,
    ) -> Result<Self>
    where
        B: FnOnce(&mut dyn PreparedStatement) -> DriverResult<()>,
        M: FnMut(&Row, u64) -> DriverResult<T> + Send + 'static,
    {
        let sql = sql.into();
        debug!(sql = %sql, pool = %pool.name(), "Executing prepared SQL query");

        let scope = ConnectionScope::acquire(pool).await?;

        let prepared = scope.connection().prepare(&sql).await;
        let mut statement = match prepared {
            Ok(statement) => statement,
            Err(e) => {
                scope.release_quietly();
                return Err(Error::statement("prepare", sql, e));
            }
        };

        if let Err(e) = binder(statement.as_mut()) {
            drop(statement);
            scope.release_quietly();
            return Err(Error::statement("bind", sql, e));
        }

        let executed = statement.execute_query().await;
        let cursor = match executed {
            Ok(cursor) => cursor,
            Err(e) => {
                drop(statement);
                scope.release_quietly();
                return Err(Error::statement("execute_query", sql, e));
            }
        };

        Ok(Self {
            sql,
            open: Some(OpenCursor {
                cursor,
                statement,
                scope,
            }),
            mapper: Box::new(mapper),
            rows_read: 0,
            state: SequenceState::Open,
        })
    }

    /// Pull the next mapped row.
    ///
    /// Returns `Some(Ok(_))` for a row, `None` on completion, or `Some(Err(_))`
    /// once for a terminal failure. Resources are already released when the
    /// completion or the error is returned.
    pub async fn next(&mut self) -> Option<Result<T>> {
        let open = match self.open.as_mut() {
            Some(open) if self.state == SequenceState::Open => open,
            _ => return None,
        };

        let fetched = open.cursor.next().await;
        match fetched {
            Ok(Some(row)) => {
                self.rows_read += 1;
                match (self.mapper)(&row, self.rows_read) {
                    Ok(value) => Some(Ok(value)),
                    Err(e) => Some(Err(self.fail(Error::statement("map_row", &self.sql, e)))),
                }
            }
            Ok(None) => self.complete().err().map(Err),
            Err(e) => Some(Err(self.fail(Error::statement("fetch", &self.sql, e)))),
        }
    }

    fn complete(&mut self) -> Result<()> {
        debug!(sql = %self.sql, rows = self.rows_read, "Row sequence completed");
        let released = self.open.take().map_or(Ok(()), OpenCursor::release);
        self.state = match released {
            Ok(()) => SequenceState::Completed,
            Err(_) => SequenceState::Errored,
        };
        released
    }

    fn fail(&mut self, error: Error) -> Error {
        self.state = SequenceState::Errored;
        if let Some(open) = self.open.take() {
            open.release_quietly();
        }
        error
    }

    /// Stop pulling and release resources now, reporting a release failure.
    ///
    /// Dropping the sequence has the same effect, with release failures
    /// only logged.
    pub fn close(mut self) -> Result<()> {
        match self.open.take() {
            Some(open) => {
                self.state = SequenceState::Cancelled;
                open.release()
            }
            None => Ok(()),
        }
    }

    /// Drain the remaining rows into a vector
    pub async fn try_collect(mut self) -> Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(item) = self.next().await {
            values.push(item?);
        }
        Ok(values)
    }

    /// Number of rows fetched from the cursor so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Current lifecycle state
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Whether the sequence has completed, failed or been closed
    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// SQL this sequence was opened with
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<T: Send + 'static> RowSequence<T> {
    /// Adapt into a `futures::Stream`. Dropping the stream early releases
    /// resources like dropping the sequence does.
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        Box::pin(stream::unfold(self, |mut seq| async move {
            seq.next().await.map(|item| (item, seq))
        }))
    }
}

impl<T> Drop for RowSequence<T> {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            debug!(sql = %self.sql, rows = self.rows_read, "Row sequence abandoned before completion");
            let pool = open.scope.pool_name().to_owned();
            if let Err(e) = open.release() {
                warn!(pool = %pool, error = %e, "Failed to release abandoned row sequence");
            }
        }
    }
}

impl<T> std::fmt::Debug for RowSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSequence")
            .field("sql", &self.sql)
            .field("rows_read", &self.rows_read)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::bind_all;
    use crate::testing::{rows, MockPool};
    use crate::types::Value;

    #[tokio::test]
    async fn test_row_index_starts_at_one() {
        let mock = MockPool::new("customer")
            .with_rows("SELECT name FROM t", rows(&["name"], vec![vec!["a".into()], vec!["b".into()]]));
        let pool: Arc<dyn ConnectionPool> = mock.clone();

        let mut seq = RowSequence::open(&pool, "SELECT name FROM t", |_| Ok(()), |row, idx| {
            Ok((idx, row.try_string(0)?))
        })
        .await
        .unwrap();

        assert_eq!(seq.next().await.unwrap().unwrap(), (1, "a".to_string()));
        assert_eq!(seq.next().await.unwrap().unwrap(), (2, "b".to_string()));
        assert!(seq.next().await.is_none());
        assert_eq!(seq.state(), SequenceState::Completed);
        assert_eq!(mock.released(), 1);
    }

    #[tokio::test]
    async fn test_query_executes_at_open() {
        let mock = MockPool::new("customer").with_rows("SELECT 1", Vec::new());
        let pool: Arc<dyn ConnectionPool> = mock.clone();

        let seq = RowSequence::open(
            &pool,
            "SELECT 1",
            |stmt| bind_all(stmt, &[Value::Int32(7)]),
            |row, _| row.try_i64(0),
        )
        .await
        .unwrap();

        assert_eq!(mock.queries_executed(), 1);
        assert_eq!(mock.open_cursors(), 1);
        drop(seq);
        assert_eq!(mock.open_cursors(), 0);
        assert_eq!(mock.released(), 1);
    }
}
