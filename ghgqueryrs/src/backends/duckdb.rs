//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::config::DuckDbConfig;
use crate::dialect::DuckDbDialect;
use crate::error::{GhgQueryError, Result};
use crate::executor::{ColumnMeta, QueryResult};
use crate::models::BuiltQuery;

use super::BackendConnection;

/// Pooled DuckDB connection to one database file.
///
/// Native connections are checked out per query and returned to the pool only
/// when the query succeeds; a handle whose query failed is dropped.
///
/// A concurrency slot stays held until the blocking DuckDB call returns, even when the
/// caller stops waiting. Dropping an in-flight `execute` future interrupts its query.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    read_only: bool,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
    root: Arc<Mutex<Option<duckdb::Connection>>>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_config(path, &DuckDbConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: &DuckDbConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!(
            path = %path.display(),
            max_concurrency = config.max_concurrency,
            read_only = config.read_only,
            "creating DuckDB connection"
        );
        Self {
            database_path: path,
            read_only: config.read_only,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            root: Arc::new(Mutex::new(None)),
            pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure maximum concurrent executions; callers can tune based on hardware.
    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        tracing::debug!(max_concurrency = max_in_flight, "configuring DuckDB concurrency");
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    /// Open the file eagerly so a missing or unreadable database fails at startup.
    pub async fn check(&self) -> Result<()> {
        let conn = self.checkout_connection().await?;
        self.pool.lock().await.push(conn);
        Ok(())
    }

    /// Slots currently free; equals `max_concurrency` when nothing is running.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit> {
        if self.limiter.available_permits() == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| GhgQueryError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            let pool_size = guard.len();
            drop(guard);
            tracing::trace!(pool_remaining = pool_size, "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);

        // Pooled handles are clones of one root connection so they share a single database instance.
        let mut root = self.root.lock().await;
        if root.is_none() {
            tracing::debug!(path = %self.database_path.display(), "opening DuckDB database");
            *root = Some(self.open_root()?);
        }
        match root.as_ref() {
            Some(conn) => conn
                .try_clone()
                .map_err(|e| GhgQueryError::Execution(format!("clone duckdb connection: {e}"))),
            None => Err(GhgQueryError::Execution("duckdb root connection missing".to_string())),
        }
    }

    fn open_root(&self) -> Result<duckdb::Connection> {
        let access_mode = if self.read_only {
            duckdb::AccessMode::ReadOnly
        } else {
            duckdb::AccessMode::Automatic
        };
        let config = duckdb::Config::default().access_mode(access_mode)?;
        duckdb::Connection::open_with_flags(&self.database_path, config).map_err(|e| {
            GhgQueryError::Execution(format!(
                "open duckdb {}: {e}",
                self.database_path.display()
            ))
        })
    }
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        let query = query.clone();
        let permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let mut interrupt = InterruptOnDrop::new(conn.interrupt_handle());
        let pool = self.pool.clone();
        let result =
            tokio::task::spawn_blocking(move || -> Result<(QueryResult, duckdb::Connection)> {
                let _permit = permit;
                let start = Instant::now();
                let result = {
                    let mut stmt = conn.prepare(&query.sql)?;
                    let mut rows_iter =
                        stmt.query(duckdb::params_from_iter(query.params.iter()))?;
                    let stmt_ref = rows_iter.as_ref().ok_or_else(|| {
                        GhgQueryError::Execution("statement missing".to_string())
                    })?;
                    let mut column_names = Vec::new();
                    for idx in 0..stmt_ref.column_count() {
                        let name = stmt_ref
                            .column_name(idx)
                            .map_err(|e| GhgQueryError::Execution(e.to_string()))?;
                        column_names.push(name.to_string());
                    }
                    let mut rows = Vec::new();
                    while let Some(row) = rows_iter.next()? {
                        let mut map = serde_json::Map::new();
                        for (idx, name) in column_names.iter().enumerate() {
                            let value =
                                crate::executor::duck_value_to_json(row.get_ref(idx)?.to_owned());
                            map.insert(name.clone(), value);
                        }
                        rows.push(map);
                    }
                    let columns: Vec<_> = column_names
                        .into_iter()
                        .map(|name| ColumnMeta { name })
                        .collect();
                    QueryResult { columns, rows }
                };
                tracing::debug!(
                    rows = result.rows.len(),
                    columns = result.columns.len(),
                    params = query.params.len(),
                    ms = start.elapsed().as_millis(),
                    "duckdb execute"
                );
                Ok((result, conn))
            })
            .await
            .map_err(|e| GhgQueryError::Execution(format!("task join error: {e}")));
        interrupt.disarm();

        let (result, conn) = result??;
        pool.lock().await.push(conn);
        Ok(result)
    }
}

/// Interrupts the running query unless disarmed once the blocking call has returned.
struct InterruptOnDrop {
    handle: Arc<duckdb::InterruptHandle>,
    armed: bool,
}

impl InterruptOnDrop {
    fn new(handle: Arc<duckdb::InterruptHandle>) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("abandoned DuckDB query, interrupting");
            self.handle.interrupt();
        }
    }
}
