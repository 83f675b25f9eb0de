//! Database backend implementations.
//!
//! Each backend is implemented in its own file and gated behind a feature flag.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{GhgQueryConfig, ResolvedDatasetConfig};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::QueryResult;
use crate::models::BuiltQuery;

/// "Execute a parameterized query, return rows."
///
/// Implementations must tolerate concurrent calls from many in-flight requests.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);
    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult>;
}

/// Connections keyed by dataset key, plus the configuration they were built from.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: HashMap<String, Arc<dyn BackendConnection>>,
    config: Option<GhgQueryConfig>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            config: None,
        }
    }

    /// Create a connection manager with configuration.
    pub fn with_config(config: GhgQueryConfig) -> Self {
        Self {
            connections: HashMap::new(),
            config: Some(config),
        }
    }

    /// Resolved configuration for one dataset.
    pub fn config_for(&self, dataset: &str) -> ResolvedDatasetConfig {
        match &self.config {
            Some(cfg) => cfg.for_dataset(dataset),
            None => GhgQueryConfig::default().for_dataset(dataset),
        }
    }

    pub fn insert(&mut self, dataset: impl Into<String>, conn: Arc<dyn BackendConnection>) {
        self.connections.insert(dataset.into(), conn);
    }

    pub fn get(&self, dataset: &str) -> Option<&Arc<dyn BackendConnection>> {
        self.connections.get(dataset)
    }
}

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;
