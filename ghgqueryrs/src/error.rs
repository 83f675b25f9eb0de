use thiserror::Error;

pub type Result<T> = std::result::Result<T, GhgQueryError>;

#[derive(Debug, Error)]
pub enum GhgQueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// No year column of the dataset falls inside the requested range.
    #[error("No valid year columns in the requested range.")]
    EmptyRange,
    #[error("execution error: {0}")]
    Execution(String),
    #[error("query timed out after {0} ms")]
    Timeout(u64),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
