//! Snapshot orchestrator
//!
//! Sequences one sampling run against the query executor:
//! precondition check, capture-before, timed wait, capture-after, then the
//! diff-and-rank query with its post-filter. Strictly ordered, no retries;
//! any failure aborts the run without partial output.

use crate::capability::CapabilityMatrix;
use crate::error::{configuration_error, permission_error, SnapResult};
use crate::executor::QueryExecutor;
use crate::snapshot::filter::filter_preamble;
use crate::snapshot::query::{
    build_capture_query, build_diff_query, AFTER_TABLE, BEFORE_TABLE, CHECK_IO_TIMING_QUERY,
    CHECK_VIEW_QUERY, RESET_ACK, RESET_QUERY,
};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SnapshotOrchestrator<'a, E: QueryExecutor> {
    executor: &'a E,
    matrix: CapabilityMatrix,
}

impl<'a, E: QueryExecutor> SnapshotOrchestrator<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        let version = executor.server_version();
        let matrix = CapabilityMatrix::resolve(version);
        debug!("capability matrix for {version}: {matrix:?}");
        Self { executor, matrix }
    }

    /// Verify the statistics source before anything else runs.
    ///
    /// A missing `pg_stat_statements` view is fatal. Disabled
    /// `track_io_timing` on a server new enough to support it only warns:
    /// the timing columns will read zero.
    pub async fn check(&self) -> SnapResult<()> {
        let rows = self.executor.execute(CHECK_VIEW_QUERY).await?;
        if scalar_count(&rows) != 1 {
            return Err(configuration_error("pg_stat_statements view not found"));
        }

        if CapabilityMatrix::supports_io_timing(self.executor.server_version()) {
            let rows = self.executor.execute(CHECK_IO_TIMING_QUERY).await?;
            if scalar_count(&rows) != 1 {
                warn!("track_io_timing is disabled; block timing columns will read zero");
            }
        }
        Ok(())
    }

    /// Reset the cumulative statistics instead of sampling.
    pub async fn reset(&self) -> SnapResult<()> {
        let rows = self.executor.execute(RESET_QUERY).await?;
        match rows.first().and_then(|r| r.first()) {
            Some(ack) if ack == RESET_ACK => {
                info!("statistics reset");
                Ok(())
            }
            _ => Err(permission_error(
                "reset was not acknowledged; check your privilege and target database",
            )),
        }
    }

    /// One full sampling run: two captures separated by `interval`, then
    /// the ranked diff, post-filtered down to the result table.
    pub async fn run(
        &self,
        interval: Duration,
        top_n: Option<u32>,
    ) -> SnapResult<Vec<Vec<String>>> {
        self.check().await?;

        let window_start = Utc::now();
        self.executor
            .execute(&build_capture_query(&self.matrix, BEFORE_TABLE))
            .await?;
        debug!("before-capture done at {window_start}, waiting {}s", interval.as_secs());

        // The sampling window itself. Accuracy of the delta is bounded by
        // this wait running uninterrupted.
        tokio::time::sleep(interval).await;

        self.executor
            .execute(&build_capture_query(&self.matrix, AFTER_TABLE))
            .await?;
        debug!("after-capture done at {}", Utc::now());

        let raw = self
            .executor
            .execute(&build_diff_query(&self.matrix, top_n))
            .await?;
        Ok(filter_preamble(raw))
    }
}

/// Read the single count value out of a header-plus-one-row result.
fn scalar_count(rows: &[Vec<String>]) -> i64 {
    rows.get(1)
        .and_then(|r| r.first())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ServerVersion;
    use crate::error::SnapError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Canned-response executor recording every statement it is handed.
    struct MockExecutor {
        version: ServerVersion,
        responses: Mutex<VecDeque<Vec<Vec<String>>>>,
        executed: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        fn new(version: ServerVersion, responses: Vec<Vec<Vec<String>>>) -> Self {
            Self {
                version,
                responses: Mutex::new(responses.into()),
                executed: Mutex::new(Vec::new()),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl QueryExecutor for MockExecutor {
        async fn execute(&self, sql: &str) -> SnapResult<Vec<Vec<String>>> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
        }

        fn server_version(&self) -> ServerVersion {
            self.version
        }
    }

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn count_result(name: &str, count: &str) -> Vec<Vec<String>> {
        rows(&[&[name], &[count]])
    }

    #[tokio::test]
    async fn test_run_happy_path_returns_filtered_table() {
        let diff_result = rows(&[
            &["CREATE TABLE AS"],
            &["USER", "DBNAME", "QUERY", "CALLS"],
            &["alice", "appdb", "SELECT 1", "3"],
        ]);
        let executor = MockExecutor::new(
            ServerVersion::new(9, 6),
            vec![
                count_result("pg_stat_statements", "1"),
                count_result("track_io_timing", "1"),
                Vec::new(), // capture before
                Vec::new(), // capture after
                diff_result,
            ],
        );

        let orchestrator = SnapshotOrchestrator::new(&executor);
        let table = orchestrator
            .run(Duration::from_secs(0), Some(10))
            .await
            .unwrap();

        assert_eq!(
            table,
            rows(&[
                &["USER", "DBNAME", "QUERY", "CALLS"],
                &["alice", "appdb", "SELECT 1", "3"],
            ])
        );

        let executed = executor.executed();
        assert_eq!(executed.len(), 5);
        assert!(executed[2].contains("CREATE TEMP TABLE snap_before"));
        assert!(executed[3].contains("CREATE TEMP TABLE snap_after"));
        assert!(executed[4].contains("LIMIT 10"));
    }

    #[tokio::test]
    async fn test_missing_view_aborts_before_any_capture() {
        let executor = MockExecutor::new(
            ServerVersion::new(9, 6),
            vec![count_result("pg_stat_statements", "0")],
        );

        let orchestrator = SnapshotOrchestrator::new(&executor);
        let err = orchestrator
            .run(Duration::from_secs(0), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SnapError::Configuration(_)));
        // only the existence check ran; no capture query executed
        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_check_skips_io_timing_probe_on_old_servers() {
        let executor = MockExecutor::new(
            ServerVersion::new(9, 1),
            vec![count_result("pg_stat_statements", "1")],
        );

        let orchestrator = SnapshotOrchestrator::new(&executor);
        orchestrator.check().await.unwrap();

        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_acknowledged() {
        let executor = MockExecutor::new(
            ServerVersion::new(9, 6),
            vec![rows(&[&["pg_stat_statements_reset"], &[""]])],
        );

        let orchestrator = SnapshotOrchestrator::new(&executor);
        orchestrator.reset().await.unwrap();
        assert_eq!(executor.executed(), vec![RESET_QUERY.to_string()]);
    }

    #[tokio::test]
    async fn test_reset_without_acknowledgement_is_permission_error() {
        let executor = MockExecutor::new(ServerVersion::new(9, 6), vec![Vec::new()]);

        let orchestrator = SnapshotOrchestrator::new(&executor);
        let err = orchestrator.reset().await.unwrap_err();
        assert!(matches!(err, SnapError::PermissionOrScope(_)));
    }

    #[tokio::test]
    async fn test_old_server_queries_omit_optional_columns() {
        let executor = MockExecutor::new(
            ServerVersion::new(9, 1),
            vec![
                count_result("pg_stat_statements", "1"),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ],
        );

        let orchestrator = SnapshotOrchestrator::new(&executor);
        orchestrator.run(Duration::from_secs(0), None).await.unwrap();

        let executed = executor.executed();
        assert!(!executed[1].contains("queryid"));
        assert!(!executed[3].contains("B_DIRT"));
    }
}
