//! Connection pool seam and resource scope guard
//!
//! Pooling itself lives outside this crate; the bridge only acquires a
//! connection per operation and hands it back. [`ConnectionScope`] owns the
//! borrowed connection and guarantees it goes back to the pool exactly once,
//! whether the operation completes, fails, or is abandoned (dropped).
//!
//! # Example
//!
//! ```rust,ignore
//! use wsbench_rdbc::pool::with_connection;
//!
//! let valid = with_connection(&pool, |conn| {
//!     Box::pin(async move { Ok(conn.is_valid().await) })
//! })
//! .await?;
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::warn;

use crate::connection::Connection;
use crate::error::{DriverResult, Error, Result};

/// External connection pool for one logical database
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Logical database name (e.g. `customer`)
    fn name(&self) -> &str;

    /// Borrow a connection from the pool
    async fn acquire(&self) -> DriverResult<Box<dyn Connection>>;

    /// Hand a connection back to the pool.
    ///
    /// Synchronous so that it can run from `Drop` when an operation is
    /// abandoned.
    fn release(&self, conn: Box<dyn Connection>) -> DriverResult<()>;
}

/// A connection borrowed for the lifetime of one bridge operation
pub struct ConnectionScope {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<dyn ConnectionPool>,
}

impl ConnectionScope {
    /// Acquire a connection. On failure nothing was borrowed, so nothing is
    /// released.
    pub async fn acquire(pool: &Arc<dyn ConnectionPool>) -> Result<Self> {
        let conn = pool
            .acquire()
            .await
            .map_err(|e| Error::resource("acquire", e))?;
        Ok(Self {
            conn: Some(conn),
            pool: pool.clone(),
        })
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &dyn Connection {
        self.conn
            .as_deref()
            .expect("scope holds its connection until consumed")
    }

    /// Logical database this connection belongs to
    pub fn pool_name(&self) -> &str {
        self.pool.name()
    }

    /// Return the connection to the pool, reporting a release failure
    pub fn release(mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => self
                .pool
                .release(conn)
                .map_err(|e| Error::resource("release", e)),
            None => Ok(()),
        }
    }

    /// Release while another error is already propagating; a release
    /// failure is logged and the primary error wins.
    pub(crate) fn release_quietly(self) {
        let pool = self.pool.name().to_owned();
        if let Err(e) = self.release() {
            warn!(pool = %pool, error = %e, "Failed to release connection after error");
        }
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.pool.release(conn) {
                warn!(pool = %self.pool.name(), error = %e, "Failed to release abandoned connection");
            }
        }
    }
}

impl std::fmt::Debug for ConnectionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionScope")
            .field("pool", &self.pool.name())
            .field("held", &self.conn.is_some())
            .finish()
    }
}

/// Run `operation` with a connection borrowed from `pool`.
///
/// The connection is released after the operation completes or fails, and
/// also when the returned future is dropped before completion. A release
/// failure after a successful operation is reported as a resource error.
pub async fn with_connection<R, F>(pool: &Arc<dyn ConnectionPool>, operation: F) -> Result<R>
where
    F: for<'c> FnOnce(&'c dyn Connection) -> BoxFuture<'c, Result<R>>,
{
    let scope = ConnectionScope::acquire(pool).await?;
    let outcome = operation(scope.connection()).await;
    match outcome {
        Ok(value) => {
            scope.release()?;
            Ok(value)
        }
        Err(e) => {
            scope.release_quietly();
            Err(e)
        }
    }
}
