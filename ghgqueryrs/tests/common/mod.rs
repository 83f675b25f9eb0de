#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ghgquery::backends::{BackendConnection, ConnectionManager};
use ghgquery::dialect::{Dialect, DuckDbDialect};
use ghgquery::error::{GhgQueryError, Result};
use ghgquery::executor::QueryResult;
use ghgquery::models::BuiltQuery;
use ghgquery::registry::DatasetRegistry;
use serde_json::{Map, Value};

/// Connection that records every query and replays canned rows.
#[derive(Clone, Default)]
pub struct RecordingConnection {
    pub executed: Arc<Mutex<Vec<BuiltQuery>>>,
    rows: Vec<Map<String, Value>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl RecordingConnection {
    pub fn with_rows(rows: Vec<Map<String, Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn executed(&self) -> Vec<BuiltQuery> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BackendConnection for RecordingConnection {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &DuckDbDialect
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(GhgQueryError::Execution(message.clone()));
        }
        Ok(QueryResult {
            columns: vec![],
            rows: self.rows.clone(),
        })
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Builtin registry with `conn` serving every dataset.
pub fn setup(conn: &RecordingConnection) -> (DatasetRegistry, ConnectionManager) {
    setup_with(conn, ConnectionManager::new())
}

pub fn setup_with(
    conn: &RecordingConnection,
    mut connections: ConnectionManager,
) -> (DatasetRegistry, ConnectionManager) {
    let registry = DatasetRegistry::builtin();
    for key in registry.keys() {
        connections.insert(key, Arc::new(conn.clone()));
    }
    (registry, connections)
}
