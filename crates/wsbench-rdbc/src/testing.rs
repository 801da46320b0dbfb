//! In-memory driver for testing the bridge
//!
//! [`MockPool`] hands out mock connections whose statements serve canned
//! rows per SQL text and record every update and batch they execute.
//! Failures can be injected at each driver call, and counters track how many
//! connections, statements and cursors are still open, so that tests can
//! assert release-exactly-once behavior.
//!
//! # Example
//!
//! ```rust,ignore
//! use wsbench_rdbc::testing::{rows, MockPool};
//!
//! let mock = MockPool::new("customer")
//!     .with_rows("SELECT id FROM customer", rows(&["id"], vec![vec![1.into()]]));
//! let pool: Arc<dyn ConnectionPool> = mock.clone();
//! // ... run the operation under test ...
//! assert_eq!(mock.outstanding(), 0);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::connection::{Connection, PreparedStatement, RowStream};
use crate::error::{DriverError, DriverResult};
use crate::pool::ConnectionPool;
use crate::types::{Row, Value};

/// Build rows sharing one column list
pub fn rows(columns: &[&str], values: Vec<Vec<Value>>) -> Vec<Row> {
    let columns: Vec<String> = columns.iter().map(|c| (*c).to_owned()).collect();
    values
        .into_iter()
        .map(|v| Row::new(columns.clone(), v))
        .collect()
}

/// Resource lifecycle event recorded by the mock driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// A connection left the pool
    Acquired,
    /// A statement was prepared
    Prepared(String),
    /// A cursor was opened
    CursorOpened,
    /// A cursor was dropped
    CursorClosed,
    /// A statement was dropped
    StatementClosed,
    /// A connection was handed back
    Released,
}

#[derive(Debug)]
struct MockState {
    rows: HashMap<String, Vec<Row>>,
    supports_batch: DriverResult<bool>,
    affected_per_update: u64,

    fail_acquire: Option<DriverError>,
    fail_release: Option<DriverError>,
    fail_prepare: Option<DriverError>,
    fail_bind: Option<DriverError>,
    fail_query: Option<DriverError>,
    fail_fetch_at: Option<(u64, DriverError)>,
    fail_batch_at: Option<(usize, DriverError)>,
    fail_update_at: Option<(usize, DriverError)>,

    acquired: usize,
    released: usize,
    open_statements: usize,
    open_cursors: usize,
    queries_executed: usize,

    query_params: Vec<Vec<Value>>,
    updates: Vec<Vec<Value>>,
    batches: Vec<Vec<Vec<Value>>>,
    events: Vec<MockEvent>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            supports_batch: Ok(true),
            affected_per_update: 1,
            fail_acquire: None,
            fail_release: None,
            fail_prepare: None,
            fail_bind: None,
            fail_query: None,
            fail_fetch_at: None,
            fail_batch_at: None,
            fail_update_at: None,
            acquired: 0,
            released: 0,
            open_statements: 0,
            open_cursors: 0,
            queries_executed: 0,
            query_params: Vec::new(),
            updates: Vec::new(),
            batches: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// A mock connection pool for testing
#[derive(Debug)]
pub struct MockPool {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockPool {
    /// Create a new mock pool for the logical database `name`
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        })
    }

    /// Serve `rows` for queries with exactly this SQL text
    pub fn with_rows(self: Arc<Self>, sql: impl Into<String>, rows: Vec<Row>) -> Arc<Self> {
        self.state.lock().rows.insert(sql.into(), rows);
        self
    }

    /// Report missing native batch support
    pub fn without_batch_support(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().supports_batch = Ok(false);
        self
    }

    /// Make the batch capability check itself fail
    pub fn with_batch_check_error(self: Arc<Self>, error: DriverError) -> Arc<Self> {
        self.state.lock().supports_batch = Err(error);
        self
    }

    /// Rows reported as affected by each executed update or batch entry
    pub fn with_affected_rows(self: Arc<Self>, n: u64) -> Arc<Self> {
        self.state.lock().affected_per_update = n;
        self
    }

    /// Fail the next acquisitions
    pub fn fail_acquire(&self, error: DriverError) {
        self.state.lock().fail_acquire = Some(error);
    }

    /// Fail every release (the connection is still consumed)
    pub fn fail_release(&self, error: DriverError) {
        self.state.lock().fail_release = Some(error);
    }

    /// Fail statement preparation
    pub fn fail_prepare(&self, error: DriverError) {
        self.state.lock().fail_prepare = Some(error);
    }

    /// Fail parameter binding
    pub fn fail_bind(&self, error: DriverError) {
        self.state.lock().fail_bind = Some(error);
    }

    /// Fail query execution
    pub fn fail_query(&self, error: DriverError) {
        self.state.lock().fail_query = Some(error);
    }

    /// Fail the cursor when fetching the 1-based row `row`
    pub fn fail_fetch_at(&self, row: u64, error: DriverError) {
        self.state.lock().fail_fetch_at = Some((row, error));
    }

    /// Fail the 1-based `nth` batch execution
    pub fn fail_batch_at(&self, nth: usize, error: DriverError) {
        self.state.lock().fail_batch_at = Some((nth, error));
    }

    /// Fail the 1-based `nth` single update
    pub fn fail_update_at(&self, nth: usize, error: DriverError) {
        self.state.lock().fail_update_at = Some((nth, error));
    }

    /// Connections handed out so far
    pub fn acquired(&self) -> usize {
        self.state.lock().acquired
    }

    /// Release calls received so far, failed ones included
    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Connections currently borrowed
    pub fn outstanding(&self) -> usize {
        let state = self.state.lock();
        state.acquired - state.released
    }

    /// Prepared statements not yet dropped
    pub fn open_statements(&self) -> usize {
        self.state.lock().open_statements
    }

    /// Cursors not yet dropped
    pub fn open_cursors(&self) -> usize {
        self.state.lock().open_cursors
    }

    /// Number of executed queries
    pub fn queries_executed(&self) -> usize {
        self.state.lock().queries_executed
    }

    /// Parameters bound for each executed query
    pub fn query_params(&self) -> Vec<Vec<Value>> {
        self.state.lock().query_params.clone()
    }

    /// Parameters of each executed single update
    pub fn updates(&self) -> Vec<Vec<Value>> {
        self.state.lock().updates.clone()
    }

    /// Parameter sets of each executed batch, in execution order
    pub fn batches(&self) -> Vec<Vec<Vec<Value>>> {
        self.state.lock().batches.clone()
    }

    /// Sizes of executed batches
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().batches.iter().map(Vec::len).collect()
    }

    /// Resource lifecycle events in order
    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }
}

#[async_trait]
impl ConnectionPool for MockPool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self) -> DriverResult<Box<dyn Connection>> {
        let mut state = self.state.lock();
        if let Some(e) = state.fail_acquire.clone() {
            return Err(e);
        }
        state.acquired += 1;
        state.events.push(MockEvent::Acquired);
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }

    fn release(&self, conn: Box<dyn Connection>) -> DriverResult<()> {
        drop(conn);
        let mut state = self.state.lock();
        state.released += 1;
        state.events.push(MockEvent::Released);
        match state.fail_release.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn prepare(&self, sql: &str) -> DriverResult<Box<dyn PreparedStatement>> {
        let mut state = self.state.lock();
        if let Some(e) = state.fail_prepare.clone() {
            return Err(e);
        }
        state.open_statements += 1;
        state.events.push(MockEvent::Prepared(sql.to_owned()));
        Ok(Box::new(MockStatement {
            sql: sql.to_owned(),
            params: Vec::new(),
            pending: Vec::new(),
            state: self.state.clone(),
        }))
    }

    async fn supports_batch_updates(&self) -> DriverResult<bool> {
        self.state.lock().supports_batch.clone()
    }

    async fn is_valid(&self) -> bool {
        true
    }
}

struct MockStatement {
    sql: String,
    params: Vec<Value>,
    pending: Vec<Vec<Value>>,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl PreparedStatement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, index: usize, value: Value) -> DriverResult<()> {
        if let Some(e) = self.state.lock().fail_bind.clone() {
            return Err(e);
        }
        if index == 0 {
            return Err(DriverError::other("parameter indexes start at 1"));
        }
        if self.params.len() < index {
            self.params.resize(index, Value::Null);
        }
        self.params[index - 1] = value;
        Ok(())
    }

    fn clear_parameters(&mut self) {
        self.params.clear();
    }

    async fn execute_query(&mut self) -> DriverResult<Box<dyn RowStream>> {
        let mut state = self.state.lock();
        if let Some(e) = state.fail_query.clone() {
            return Err(e);
        }
        state.queries_executed += 1;
        state.query_params.push(self.params.clone());
        state.open_cursors += 1;
        state.events.push(MockEvent::CursorOpened);
        let rows = state.rows.get(&self.sql).cloned().unwrap_or_default();
        Ok(Box::new(MockCursor {
            rows: rows.into(),
            fetched: 0,
            state: self.state.clone(),
        }))
    }

    async fn execute_update(&mut self) -> DriverResult<u64> {
        let mut state = self.state.lock();
        let nth = state.updates.len() + 1;
        if let Some((at, e)) = state.fail_update_at.clone() {
            if at == nth {
                return Err(e);
            }
        }
        state.updates.push(self.params.clone());
        Ok(state.affected_per_update)
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        self.pending.push(self.params.clone());
        Ok(())
    }

    async fn execute_batch(&mut self) -> DriverResult<Vec<u64>> {
        let pending = std::mem::take(&mut self.pending);
        let mut state = self.state.lock();
        let nth = state.batches.len() + 1;
        if let Some((at, e)) = state.fail_batch_at.clone() {
            if at == nth {
                return Err(e);
            }
        }
        let counts = vec![state.affected_per_update; pending.len()];
        state.batches.push(pending);
        Ok(counts)
    }
}

impl Drop for MockStatement {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_statements -= 1;
        state.events.push(MockEvent::StatementClosed);
    }
}

struct MockCursor {
    rows: VecDeque<Row>,
    fetched: u64,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl RowStream for MockCursor {
    async fn next(&mut self) -> DriverResult<Option<Row>> {
        if let Some((at, e)) = self.state.lock().fail_fetch_at.clone() {
            if at == self.fetched + 1 {
                return Err(e);
            }
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.fetched += 1;
        }
        Ok(row)
    }
}

impl Drop for MockCursor {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_cursors -= 1;
        state.events.push(MockEvent::CursorClosed);
    }
}
