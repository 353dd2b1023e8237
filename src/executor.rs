//! Query executor
//!
//! The seam between the snapshot pipeline and the server. The pipeline only
//! ever sees ordered rows of text fields plus the server version, so the
//! orchestrator is testable against an in-memory executor.

use crate::capability::ServerVersion;
use crate::config::ConnectionConfig;
use crate::error::{configuration_error, SnapError, SnapResult};
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::debug;

/// Executes SQL and returns tabular, text-typed results.
pub trait QueryExecutor {
    /// Run `sql` and return its rows in order. Each result set is preceded
    /// by a header row of its column names; fields are text, NULL as "".
    fn execute(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = SnapResult<Vec<Vec<String>>>> + Send;

    /// Version of the connected server, resolved once at startup.
    fn server_version(&self) -> ServerVersion;
}

/// Executor backed by a single pooled Postgres session.
///
/// One session serves the whole invocation: the snapshot captures are TEMP
/// tables, which are session-scoped, so the diff must run where the
/// captures ran.
pub struct PostgresExecutor {
    client: Object,
    version: ServerVersion,
}

impl PostgresExecutor {
    /// Take a session from the pool and resolve the server version.
    pub async fn connect(pool: &Pool) -> SnapResult<Self> {
        let client = pool.get().await?;

        let rows = client.simple_query("SHOW server_version").await?;
        let reported = rows
            .iter()
            .find_map(|msg| match msg {
                SimpleQueryMessage::Row(row) => row.get(0).map(str::to_string),
                _ => None,
            })
            .ok_or_else(|| configuration_error("server did not report its version"))?;
        let version = ServerVersion::parse(&reported)?;
        debug!("connected, server version {version} ({reported})");

        Ok(Self { client, version })
    }
}

impl QueryExecutor for PostgresExecutor {
    async fn execute(&self, sql: &str) -> SnapResult<Vec<Vec<String>>> {
        debug!("execute: {sql}");
        let messages = self.client.simple_query(sql).await?;

        let mut rows = Vec::new();
        for msg in messages {
            match msg {
                SimpleQueryMessage::RowDescription(columns) => {
                    rows.push(columns.iter().map(|c| c.name().to_string()).collect());
                }
                SimpleQueryMessage::Row(row) => {
                    rows.push(
                        (0..row.len())
                            .map(|i| row.get(i).unwrap_or("").to_string())
                            .collect(),
                    );
                }
                SimpleQueryMessage::CommandComplete(affected) => {
                    debug!("command complete, {affected} rows affected");
                }
                _ => {}
            }
        }
        Ok(rows)
    }

    fn server_version(&self) -> ServerVersion {
        self.version
    }
}

/// Build the connection pool for a run, with TLS when the configuration
/// demands it.
pub fn create_pool(config: &ConnectionConfig) -> SnapResult<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.dbname.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| SnapError::Configuration(format!("Failed to create TLS pool: {e}")))
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| SnapError::Configuration(format!("Failed to create pool: {e}")))
    }
}
