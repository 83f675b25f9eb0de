//! Configuration system for the query service.
//!
//! Supports TOML-based configuration with global defaults and per-dataset overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GhgQueryError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GhgQueryConfig {
    pub server: ServerConfig,

    /// Global defaults applied to all datasets unless overridden.
    pub defaults: GlobalDefaults,

    /// Directory of extra `*.yaml` dataset definitions, merged over the built-ins.
    pub dataset_dir: Option<PathBuf>,

    /// Per-dataset configuration (keyed by dataset key).
    pub datasets: HashMap<String, DatasetConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Global default settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub query: QueryConfig,
    pub duckdb: DuckDbConfig,
}

/// Query execution configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query timeout in milliseconds (default: 30000).
    pub timeout_ms: u64,
    /// Maximum rows to return (0 = unlimited).
    pub max_row_limit: u64,
    /// Row limit when the request does not specify one.
    pub default_row_limit: u64,
}

/// DuckDB-specific configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DuckDbConfig {
    /// Maximum concurrent queries per dataset (default: 16).
    pub max_concurrency: usize,
    /// Open database files read-only (default: true).
    pub read_only: bool,
}

/// Per-dataset configuration (can override globals).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Path of the DuckDB file backing this dataset.
    pub database: Option<PathBuf>,
    pub query: Option<QueryConfig>,
    pub duckdb: Option<DuckDbConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_row_limit: 10_000,
            default_row_limit: 10,
        }
    }
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            read_only: true,
        }
    }
}

impl GhgQueryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GhgQueryError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| GhgQueryError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `GHGQUERY_CONFIG` environment variable
    /// 2. `./ghgquery.toml` (current directory)
    /// 3. `~/.config/ghgquery/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("GHGQUERY_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from GHGQUERY_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring GHGQUERY_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("ghgquery.toml") {
            tracing::info!("loaded config from ./ghgquery.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ghgquery").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved config for a specific dataset (merges global defaults).
    pub fn for_dataset(&self, key: &str) -> ResolvedDatasetConfig {
        ResolvedDatasetConfig::merge(&self.defaults, self.datasets.get(key))
    }
}

/// Fully resolved configuration for a dataset (no Option fields).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDatasetConfig {
    /// Explicit database file; `None` falls back to `<table>.duckdb`.
    pub database: Option<PathBuf>,
    pub query: QueryConfig,
    pub duckdb: DuckDbConfig,
}

impl ResolvedDatasetConfig {
    fn merge(defaults: &GlobalDefaults, override_cfg: Option<&DatasetConfig>) -> Self {
        let override_cfg = override_cfg.cloned().unwrap_or_default();
        Self {
            database: override_cfg.database,
            query: override_cfg.query.unwrap_or_else(|| defaults.query.clone()),
            duckdb: override_cfg
                .duckdb
                .unwrap_or_else(|| defaults.duckdb.clone()),
        }
    }

    /// Database file backing the dataset whose table is `table`.
    pub fn database_path(&self, table: &str) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| default_database_path(table))
    }
}

/// Conventional file name for a dataset table, e.g. `SEEG-12-dados-nacionais.duckdb`.
pub fn default_database_path(table: &str) -> PathBuf {
    PathBuf::from(format!("{table}.duckdb"))
}
