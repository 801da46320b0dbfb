//! # wsbench-rdbc
//!
//! Streaming bridge between cursor-based relational drivers and async
//! callers, used by the wsbench data-access layer.
//!
//! ## Features
//!
//! - **Scoped connections**: every operation borrows one connection from an
//!   external pool and returns it exactly once, on success, error or drop
//! - **Lazy row sequences**: queries execute eagerly, rows are fetched and
//!   mapped one pull at a time
//! - **Batched writes**: items are bound in arrival order and flushed in
//!   fixed-size batches, with single-statement fallback for drivers without
//!   batch support
//! - **Error translation**: driver failures surface as resource or statement
//!   errors carrying the offending SQL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsbench_rdbc::prelude::*;
//!
//! let sources = DataSources::new().with(customer_pool);
//! let template = sources.template(TemplateConfig::new("customer"))?;
//!
//! // Stream rows
//! let mut customers = template
//!     .query_for_sequence_with_args(
//!         "SELECT id,first_name,last_name FROM Customer",
//!         &[],
//!         |row, _| Ok((row.try_string(0)?, row.try_string(1)?)),
//!     )
//!     .await?;
//! while let Some(customer) = customers.next().await {
//!     let (id, first_name) = customer?;
//! }
//!
//! // Batched insert
//! let result = template
//!     .batch_write_all(
//!         "INSERT INTO Phone (customer_id, number) VALUES (?, ?)",
//!         phones,
//!         |stmt, phone| bind_all(stmt, &[phone.customer_id.into(), phone.number.clone().into()]),
//!     )
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod batch;
pub mod config;
pub mod connection;
pub mod datasource;
pub mod error;
pub mod pool;
pub mod sequence;
pub mod template;
pub mod testing;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{DriverError, DriverResult, Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{FromValue, Row, Value};

    // Driver traits
    pub use crate::connection::{bind_all, Connection, PreparedStatement, RowStream};

    // Pool seam and scope guard
    pub use crate::pool::{with_connection, ConnectionPool, ConnectionScope};

    // Reads and writes
    pub use crate::batch::{batch_write, BatchResult, BatchWriter};
    pub use crate::sequence::{RowSequence, SequenceState};

    // Facade and configuration
    pub use crate::config::TemplateConfig;
    pub use crate::datasource::DataSources;
    pub use crate::template::RdbcTemplate;
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _value = Value::Int32(42);
        let _config = TemplateConfig::new("customer");
        let _result = BatchResult::default();
        let _sources = DataSources::new();
    }

    #[test]
    fn test_error_types() {
        let err = Error::resource("acquire", DriverError::connection("refused"));
        assert!(err.is_retriable());
        assert_eq!(err.category(), Some(ErrorCategory::Connection));
    }

    #[test]
    fn test_value_types() {
        let v = Value::from(42_i32);
        assert!(!v.is_null());
        assert_eq!(v.as_i64(), Some(42));

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
    }
}
