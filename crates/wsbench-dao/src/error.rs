//! Error types for wsbench-dao

use thiserror::Error;

/// Result type for DAO operations
pub type Result<T> = std::result::Result<T, DaoError>;

/// DAO-level failure
#[derive(Error, Debug)]
pub enum DaoError {
    /// Caller input is missing or malformed
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The database bridge failed
    #[error(transparent)]
    Rdbc(#[from] wsbench_rdbc::Error),
}

impl DaoError {
    /// Create an invalid parameters error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameters(_) | Self::NotFound(_))
    }
}

/// Fail with `message` unless every field is present
pub(crate) fn require(message: &str, present: &[bool]) -> Result<()> {
    if present.iter().all(|p| *p) {
        Ok(())
    } else {
        Err(DaoError::invalid(message))
    }
}

/// Parse a UUID path parameter
pub(crate) fn parse_uuid(id: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(id).map_err(|_| DaoError::invalid(format!("{} is not an UUID", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsbench_rdbc::error::DriverError;

    #[test]
    fn test_display() {
        assert_eq!(
            DaoError::invalid("abc is not an UUID").to_string(),
            "invalid parameters: abc is not an UUID"
        );
        let err: DaoError = wsbench_rdbc::Error::resource("acquire", DriverError::timeout("30s")).into();
        assert_eq!(err.to_string(), "resource error in acquire: timeout: 30s");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_parse_uuid() {
        assert!(parse_uuid("0b7ec8d4-6a3f-4c8e-9b2a-8c9a3f0e1d2c").is_ok());
        let err = parse_uuid("abc").unwrap_err();
        assert!(matches!(err, DaoError::InvalidParameters(ref m) if m == "abc is not an UUID"));
    }
}
