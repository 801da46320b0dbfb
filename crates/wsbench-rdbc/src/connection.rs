//! Driver traits for wsbench-rdbc
//!
//! The bridge is written against these abstractions and never against a
//! concrete driver:
//! - Connection: one physical connection, owned exclusively by one operation
//! - PreparedStatement: a compiled statement with positional parameters and
//!   an optional batch buffer
//! - RowStream: the cursor over a query's result rows
//!
//! Closing a cursor or a statement means dropping its box. Suspension points
//! are exactly the awaited driver calls.

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::types::{Row, Value};

/// A connection to a database
#[async_trait]
pub trait Connection: Send + Sync {
    /// Compile a statement for execution on this connection
    async fn prepare(&self, sql: &str) -> DriverResult<Box<dyn PreparedStatement>>;

    /// Whether the driver/connection pair supports native batched execution
    async fn supports_batch_updates(&self) -> DriverResult<bool>;

    /// Check if connection is valid/alive
    async fn is_valid(&self) -> bool;
}

/// A prepared statement
///
/// Parameters are bound by 1-based position, as in the statement's `?`
/// placeholders.
#[async_trait]
pub trait PreparedStatement: Send {
    /// Get the SQL string
    fn sql(&self) -> &str;

    /// Bind `value` to the 1-based parameter `index`
    fn bind(&mut self, index: usize, value: Value) -> DriverResult<()>;

    /// Reset all bound parameters
    fn clear_parameters(&mut self);

    /// Execute as a query and open a cursor over its rows
    async fn execute_query(&mut self) -> DriverResult<Box<dyn RowStream>>;

    /// Execute as an update, returns the affected row count
    async fn execute_update(&mut self) -> DriverResult<u64>;

    /// Append the currently bound parameters to the batch buffer
    fn add_batch(&mut self) -> DriverResult<()>;

    /// Execute every buffered parameter set in one round trip, returns the
    /// affected row count per parameter set and empties the buffer
    async fn execute_batch(&mut self) -> DriverResult<Vec<u64>>;
}

/// Streaming cursor over query results
#[async_trait]
pub trait RowStream: Send {
    /// Advance to the next row, `None` once the result set is exhausted
    async fn next(&mut self) -> DriverResult<Option<Row>>;
}

/// Bind `values` to consecutive positions starting at 1
pub fn bind_all(statement: &mut dyn PreparedStatement, values: &[Value]) -> DriverResult<()> {
    for (i, value) in values.iter().enumerate() {
        statement.bind(i + 1, value.clone())?;
    }
    Ok(())
}
