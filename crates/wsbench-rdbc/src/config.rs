//! Template configuration

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};

/// Batch size used when none is configured
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Configuration of one [`RdbcTemplate`](crate::template::RdbcTemplate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct TemplateConfig {
    /// Logical database name resolved through
    /// [`DataSources`](crate::datasource::DataSources)
    #[validate(length(min = 1))]
    pub data_source: String,

    /// Items per executed batch for batched writes
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 100000))]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl TemplateConfig {
    /// Configuration for `data_source` with the default batch size
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Validate, mapping failures to [`Error::Configuration`]
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| Error::config(format!("invalid template config: {}", e)))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_batch_size() {
        let config: TemplateConfig = serde_json::from_str(r#"{"data_source": "customer"}"#).unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let err = TemplateConfig::new("customer")
            .with_batch_size(0)
            .validated()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_rejects_empty_data_source() {
        assert!(TemplateConfig::new("").validated().is_err());
    }
}
