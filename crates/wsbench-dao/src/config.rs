//! DAO configuration

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;
use wsbench_rdbc::config::TemplateConfig;

use crate::error::{DaoError, Result};

/// Customer DAO settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct CustomerDaoConfig {
    /// Customer database and default batch size
    #[validate(nested)]
    pub template: TemplateConfig,

    /// Phones inserted per batch on customer creation
    #[serde(default = "default_phone_batch_size")]
    #[validate(range(min = 1, max = 100000))]
    pub phone_batch_size: usize,

    /// Maintenance statements run after deleting every customer
    /// (e.g. `VACUUM FULL customer`)
    #[serde(default)]
    pub maintenance: Vec<String>,
}

fn default_phone_batch_size() -> usize {
    250
}

impl CustomerDaoConfig {
    /// Settings for `data_source` with defaults
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            template: TemplateConfig::new(data_source),
            phone_batch_size: default_phone_batch_size(),
            maintenance: Vec::new(),
        }
    }

    /// Set maintenance statements from a `;`-separated list
    pub fn with_maintenance(mut self, statements: &str) -> Self {
        self.maintenance = statements
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        self
    }

    /// Validate, mapping failures to invalid parameters
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| DaoError::invalid(format!("invalid customer DAO config: {}", e)))?;
        Ok(self)
    }
}

/// Host description stamped on consolidated test suites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct ServerInfo {
    /// CPU description
    #[validate(length(min = 1))]
    pub cpu: String,
    /// Memory description
    #[validate(length(min = 1))]
    pub memory: String,
    /// Operating system
    #[serde(default = "default_os_name")]
    pub os_name: String,
    /// Operating system version, target family and architecture when unset
    #[serde(default = "default_os_version")]
    pub os_version: String,
    /// Server build version
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,
    /// Server runtime vendor
    #[serde(default = "default_runtime_vendor")]
    pub runtime_vendor: String,
}

fn default_os_name() -> String {
    std::env::consts::OS.to_owned()
}

fn default_os_version() -> String {
    format!("{}-{}", std::env::consts::FAMILY, std::env::consts::ARCH)
}

fn default_runtime_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_runtime_vendor() -> String {
    "rust".to_owned()
}

impl ServerInfo {
    /// Describe this host with the configured CPU and memory
    pub fn detect(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
            os_name: default_os_name(),
            os_version: default_os_version(),
            runtime_version: default_runtime_version(),
            runtime_vendor: default_runtime_vendor(),
        }
    }
}

/// Statistics DAO settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct StatisticsDaoConfig {
    /// Statistics database and batch size for streamed calls
    #[validate(nested)]
    pub template: TemplateConfig,

    /// Host description
    #[validate(nested)]
    pub server: ServerInfo,
}

impl StatisticsDaoConfig {
    /// Validate, mapping failures to invalid parameters
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| DaoError::invalid(format!("invalid statistics DAO config: {}", e)))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_split() {
        let config = CustomerDaoConfig::new("customer")
            .with_maintenance("VACUUM FULL customer; VACUUM FULL address;;VACUUM FULL phone;");
        assert_eq!(
            config.maintenance,
            vec!["VACUUM FULL customer", "VACUUM FULL address", "VACUUM FULL phone"]
        );
    }

    #[test]
    fn test_customer_config_defaults() {
        let config: CustomerDaoConfig =
            serde_json::from_str(r#"{"template": {"data_source": "customer"}}"#).unwrap();
        assert_eq!(config.phone_batch_size, 250);
        assert_eq!(config.template.batch_size, 250);
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_nested_validation() {
        let mut config = CustomerDaoConfig::new("customer");
        config.template.batch_size = 0;
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_server_info_defaults() {
        let info: ServerInfo = serde_json::from_str(r#"{"cpu": "4 cores", "memory": "8G"}"#).unwrap();
        assert_eq!(info.os_name, std::env::consts::OS);
        assert_eq!(info, ServerInfo::detect("4 cores", "8G"));
    }
}
