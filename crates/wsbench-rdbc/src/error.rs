//! Error types for wsbench-rdbc
//!
//! Two layers:
//! - [`DriverError`]: what a driver, pool or row mapper reports, classified by
//!   [`ErrorCategory`]
//! - [`Error`]: the bridge-level error handed to callers. Every driver failure
//!   is translated exactly once, next to the driver call that produced it, into
//!   either a resource error (acquire/release) or a statement error (prepare,
//!   bind, execute, fetch, map), keeping the offending SQL.

use std::fmt;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for driver-level calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Classification of a driver failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection lost or refused
    Connection,
    /// Malformed SQL
    Syntax,
    /// Unique, foreign key or check constraint violated
    Constraint,
    /// Column value of the wrong type; row mappers report this
    TypeConversion,
    /// Driver or pool timeout
    Timeout,
    /// Transaction chosen as deadlock victim
    Deadlock,
    /// No connection available
    PoolExhausted,
    /// Driver lacks the requested feature
    Unsupported,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Hint for the business layer; the bridge itself never retries
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::Connection | Self::Timeout | Self::Deadlock | Self::PoolExhausted
        )
    }

    /// Lowercase name, as displayed
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Syntax => "syntax",
            Self::Constraint => "constraint",
            Self::TypeConversion => "type_conversion",
            Self::Timeout => "timeout",
            Self::Deadlock => "deadlock",
            Self::PoolExhausted => "pool_exhausted",
            Self::Unsupported => "unsupported",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! driver_error_ctors {
    ($($(#[$doc:meta])* $name:ident => $category:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorCategory::$category, message)
            }
        )*
    };
}

/// Low-level failure reported by a driver, a pool or a row mapper
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct DriverError {
    /// Failure classification
    pub category: ErrorCategory,
    /// Driver message
    pub message: String,
    /// Vendor SQLSTATE, when the driver provides one
    pub sql_state: Option<String>,
}

impl DriverError {
    /// Create a driver error
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            sql_state: None,
        }
    }

    /// Attach a SQLSTATE code
    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    driver_error_ctors! {
        /// Connection lost or refused
        connection => Connection,
        /// Malformed SQL
        syntax => Syntax,
        /// Constraint violation
        constraint => Constraint,
        /// Wrong column type, the usual row mapper failure
        type_conversion => TypeConversion,
        /// Driver or pool timeout
        timeout => Timeout,
        /// No connection available
        pool_exhausted => PoolExhausted,
        /// Missing driver feature
        unsupported => Unsupported,
        /// Uncategorized failure
        other => Other,
    }
}

/// Bridge error returned to callers
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// A connection could not be acquired or released
    #[error("resource error in {operation}: {source}")]
    Resource {
        operation: &'static str,
        #[source]
        source: DriverError,
    },

    /// Statement preparation, parameter binding, execution, row fetch or
    /// row mapping failed
    #[error("statement error in {operation} [{sql}]: {source}")]
    Statement {
        operation: &'static str,
        sql: String,
        #[source]
        source: DriverError,
    },

    /// Invalid configuration or arguments, detected before touching the pool
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Translate a pool failure
    pub fn resource(operation: &'static str, source: DriverError) -> Self {
        Self::Resource { operation, source }
    }

    /// Translate a statement-level failure, keeping the SQL text
    pub fn statement(operation: &'static str, sql: impl Into<String>, source: DriverError) -> Self {
        Self::Statement {
            operation,
            sql: sql.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Category of the underlying driver failure
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Resource { source, .. } | Self::Statement { source, .. } => Some(source.category),
            Self::Configuration { .. } => None,
        }
    }

    /// Whether the underlying failure is generally retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_some_and(ErrorCategory::is_retriable)
    }

    /// Offending SQL of a statement error
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Statement { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Whether this is a resource (pool) error
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }

    /// Whether this is a statement error
    pub fn is_statement(&self) -> bool {
        matches!(self, Self::Statement { .. })
    }
}
