use std::sync::Arc;
use std::time::Duration;

use crate::backends::{BackendConnection, ConnectionManager};
use crate::error::{GhgQueryError, Result};
use crate::executor::QueryResult;
use crate::models::{BuiltQuery, DatasetSpec, FilterOutcome, FilterRequest, UniqueValues};
use crate::query_builder::{fold_unique_values, SqlBuilder};
use crate::registry::DatasetRegistry;

fn resolve<'a>(
    registry: &'a DatasetRegistry,
    connections: &'a ConnectionManager,
    dataset: &str,
) -> Result<(&'a Arc<DatasetSpec>, &'a Arc<dyn BackendConnection>)> {
    let spec = registry
        .get(dataset)
        .ok_or_else(|| GhgQueryError::NotFound(format!("unknown dataset '{dataset}'")))?;
    let connection = connections.get(dataset).ok_or_else(|| {
        GhgQueryError::Execution(format!("no connection registered for dataset {dataset}"))
    })?;
    Ok((spec, connection))
}

async fn execute_with_timeout(
    connection: &dyn BackendConnection,
    query: &BuiltQuery,
    timeout_ms: u64,
) -> Result<QueryResult> {
    if timeout_ms == 0 {
        return connection.execute(query).await;
    }
    tokio::time::timeout(Duration::from_millis(timeout_ms), connection.execute(query))
        .await
        .map_err(|_| GhgQueryError::Timeout(timeout_ms))?
}

/// Filter and project a dataset; `EmptyRange` requests never reach the connection.
pub async fn filter_data(
    registry: &DatasetRegistry,
    connections: &ConnectionManager,
    dataset: &str,
    request: &FilterRequest,
) -> Result<FilterOutcome> {
    let (spec, connection) = resolve(registry, connections, dataset)?;
    let query_config = connections.config_for(dataset).query;
    let builder = SqlBuilder::default().with_max_row_limit(query_config.max_row_limit);

    let query = match builder.build_filter_query(spec, request, connection.dialect()) {
        Ok(query) => query,
        Err(GhgQueryError::EmptyRange) => {
            tracing::debug!(
                dataset,
                start_year = request.start_year,
                end_year = request.end_year,
                "no year columns in requested range"
            );
            return Ok(FilterOutcome::EmptyRange);
        }
        Err(e) => return Err(e),
    };

    let result = execute_with_timeout(connection.as_ref(), &query, query_config.timeout_ms).await?;
    tracing::info!(dataset, rows = result.row_count(), "filter_data");
    Ok(FilterOutcome::Rows(result.into_rows()))
}

/// Distinct values of an allow-listed column, nulls folded into `"N/A"`.
pub async fn unique_values(
    registry: &DatasetRegistry,
    connections: &ConnectionManager,
    dataset: &str,
    column: &str,
) -> Result<UniqueValues> {
    let (spec, connection) = resolve(registry, connections, dataset)?;
    let timeout_ms = connections.config_for(dataset).query.timeout_ms;

    let built = SqlBuilder::default().build_unique_values_query(
        spec,
        column,
        connection.dialect(),
    )?;
    let result = execute_with_timeout(connection.as_ref(), &built.query, timeout_ms).await?;
    let unique_values = fold_unique_values(&built.column, result.into_rows());
    tracing::info!(dataset, column, values = unique_values.len(), "unique_values");
    Ok(UniqueValues {
        column: built.column,
        unique_values,
    })
}
