pub mod backends;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod models;
pub mod query_builder;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod sql_ast;

use crate::config::GhgQueryConfig;
use crate::error::Result;
use crate::registry::DatasetRegistry;

/// Built-in dataset definitions merged with any YAML definitions from `config.dataset_dir`.
pub fn load_registry(config: &GhgQueryConfig) -> Result<DatasetRegistry> {
    let mut registry = DatasetRegistry::builtin();
    if let Some(dir) = &config.dataset_dir {
        registry.load_dir(dir)?;
    }
    Ok(registry)
}

/// Open one DuckDB connection per registered dataset using the resolved per-dataset config.
#[cfg(feature = "duckdb")]
pub async fn connect_datasets(
    registry: &DatasetRegistry,
    config: GhgQueryConfig,
) -> Result<backends::ConnectionManager> {
    let mut connections = backends::ConnectionManager::with_config(config);
    for spec in registry.specs() {
        let resolved = connections.config_for(&spec.key);
        let database = resolved.database_path(&spec.table);
        let conn = backends::DuckDbConnection::with_config(&database, &resolved.duckdb);
        conn.check().await?;
        tracing::info!(dataset = %spec.key, database = %database.display(), "dataset connected");
        connections.insert(spec.key.clone(), std::sync::Arc::new(conn));
    }
    Ok(connections)
}

#[cfg(feature = "duckdb")]
pub use backends::DuckDbConnection;
pub use backends::{BackendConnection, ConnectionManager};
pub use error::GhgQueryError;
pub use executor::QueryResult;
pub use models::{BuiltQuery, DatasetSpec, FilterOutcome, FilterRequest, UniqueValues};
pub use query_builder::SqlBuilder;
