//! Registry of connection pools by logical database name

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TemplateConfig;
use crate::error::{DriverError, Error, Result};
use crate::pool::ConnectionPool;
use crate::template::RdbcTemplate;

/// Named connection pools (e.g. `customer`, `statistics`)
#[derive(Default, Clone)]
pub struct DataSources {
    pools: HashMap<String, Arc<dyn ConnectionPool>>,
}

impl DataSources {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pool` under its own name, replacing any previous pool
    pub fn register(&mut self, pool: Arc<dyn ConnectionPool>) -> &mut Self {
        self.pools.insert(pool.name().to_owned(), pool);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.register(pool);
        self
    }

    /// Look up a pool, an unknown name is a resource error
    pub fn get(&self, name: &str) -> Result<Arc<dyn ConnectionPool>> {
        self.pools.get(name).cloned().ok_or_else(|| {
            Error::resource(
                "lookup",
                DriverError::connection(format!("unknown data source '{}'", name)),
            )
        })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a validated template for `config`
    pub fn template(&self, config: TemplateConfig) -> Result<RdbcTemplate> {
        let config = config.validated()?;
        let pool = self.get(&config.data_source)?;
        Ok(RdbcTemplate::with_batch_size(pool, config.batch_size))
    }
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSources")
            .field("names", &self.names())
            .finish()
    }
}
