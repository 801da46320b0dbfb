//! Test suite and call statistics

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use wsbench_rdbc::prelude::*;
use wsbench_stats::{CallRecord, StatisticsCache};

use crate::config::{ServerInfo, StatisticsDaoConfig};
use crate::error::{parse_uuid, require, Result};
use crate::model::TestSuite;

const INSERT_SUITE: &str = "INSERT INTO TestSuite \
    (id, client_cpu, client_memory, client_jvm_version, client_jvm_vendor, client_os_name, \
    client_os_version, server_cpu, server_memory, server_jvm_version, server_jvm_vendor, \
    server_os_name, server_os_version, protocol, compression, nb_threads, comment, mapper) \
    VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)";
const INSERT_CALL: &str = "INSERT INTO TestCall \
    (request_seq, test_suite_id, method, client_start, server_start, server_end, client_end, ok, error_message) \
    VALUES (?,?,?,?,?,?,?,?,?)";

/// Test suite and test call tables, fed through the call cache
#[derive(Debug, Clone)]
pub struct StatisticsDao {
    template: RdbcTemplate,
    cache: Arc<StatisticsCache>,
    server: ServerInfo,
}

fn bind_call(stmt: &mut dyn PreparedStatement, suite_id: Uuid, call: &CallRecord) -> DriverResult<()> {
    bind_all(
        stmt,
        &[
            call.sequence.into(),
            suite_id.into(),
            call.method.as_str().into(),
            call.client_start.into(),
            call.server_start.into(),
            call.server_end.into(),
            call.client_end.into(),
            call.ok.into(),
            call.error_message.clone().into(),
        ],
    )
}

impl StatisticsDao {
    /// Create a DAO over the configured statistics data source
    pub fn new(
        sources: &DataSources,
        config: StatisticsDaoConfig,
        cache: Arc<StatisticsCache>,
    ) -> Result<Self> {
        let config = config.validated()?;
        let template = sources.template(config.template)?;
        Ok(Self {
            template,
            cache,
            server: config.server,
        })
    }

    /// Shared call cache
    pub fn cache(&self) -> &Arc<StatisticsCache> {
        &self.cache
    }

    /// Complete a client-reported suite and persist it.
    ///
    /// Each call is merged with the server timings in the cache, the suite is
    /// stamped with this server's description and saved.
    pub async fn consolidate(&self, mut suite: TestSuite) -> Result<String> {
        require(
            "Invalid test suite information",
            &[
                suite.client_cpu.is_some(),
                suite.client_memory.is_some(),
                suite.client_runtime_version.is_some(),
                suite.client_runtime_vendor.is_some(),
                suite.client_os_name.is_some(),
                suite.client_os_version.is_some(),
            ],
        )?;

        let mut merged = 0;
        for call in &mut suite.calls {
            if self.cache.merge(call) {
                merged += 1;
            }
        }
        debug!(calls = suite.calls.len(), merged, "Merged test suite calls");

        suite.server_cpu = Some(self.server.cpu.clone());
        suite.server_memory = Some(self.server.memory.clone());
        suite.server_os_name = Some(self.server.os_name.clone());
        suite.server_os_version = Some(self.server.os_version.clone());
        suite.server_runtime_version = Some(self.server.runtime_version.clone());
        suite.server_runtime_vendor = Some(self.server.runtime_vendor.clone());

        self.save(&suite).await
    }

    /// Insert the suite and its calls under a fresh identifier
    pub async fn save(&self, suite: &TestSuite) -> Result<String> {
        let id = Uuid::new_v4();
        self.template
            .update(
                INSERT_SUITE,
                &[
                    id.into(),
                    suite.client_cpu.clone().into(),
                    suite.client_memory.clone().into(),
                    suite.client_runtime_version.clone().into(),
                    suite.client_runtime_vendor.clone().into(),
                    suite.client_os_name.clone().into(),
                    suite.client_os_version.clone().into(),
                    suite.server_cpu.clone().into(),
                    suite.server_memory.clone().into(),
                    suite.server_runtime_version.clone().into(),
                    suite.server_runtime_vendor.clone().into(),
                    suite.server_os_name.clone().into(),
                    suite.server_os_version.clone().into(),
                    suite.protocol.clone().into(),
                    suite.compression.clone().into(),
                    suite.nb_threads.into(),
                    suite.comment.clone().into(),
                    suite.mapper.clone().into(),
                ],
            )
            .await?;

        if !suite.calls.is_empty() {
            // one batch for the whole suite
            self.template
                .batch_write(
                    INSERT_CALL,
                    futures::stream::iter(&suite.calls),
                    suite.calls.len(),
                    |stmt, call: &&CallRecord| bind_call(stmt, id, call),
                )
                .await?;
        }

        info!(suite = %id, calls = suite.calls.len(), "Saved test suite");
        Ok(id.to_string())
    }

    /// Merge and insert calls streamed for an existing suite
    pub async fn register_calls<S>(&self, suite_id: &str, calls: S) -> Result<BatchResult>
    where
        S: Stream<Item = CallRecord>,
    {
        let id = parse_uuid(suite_id)?;
        let cache = self.cache.clone();
        let merged = calls.map(move |mut call| {
            cache.merge(&mut call);
            call
        });

        let result = self
            .template
            .batch_write(
                INSERT_CALL,
                merged,
                self.template.batch_size(),
                |stmt, call: &CallRecord| bind_call(stmt, id, call),
            )
            .await?;
        debug!(suite = %id, calls = result.item_count(), "Registered calls");
        Ok(result)
    }
}
