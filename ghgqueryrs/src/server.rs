//! HTTP surface: one liveness route plus `filter_data` and `unique_values` per dataset.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::backends::ConnectionManager;
use crate::error::{GhgQueryError, Result};
use crate::models::{DatasetSummary, FilterOutcome, FilterRequest, UniqueValues};
use crate::registry::DatasetRegistry;
use crate::runtime;

pub const EMPTY_RANGE_MESSAGE: &str = "No valid year columns in the requested range.";

const START_YEAR: &str = "start_year";
const END_YEAR: &str = "end_year";
const LIMIT: &str = "limit";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DatasetRegistry>,
    pub connections: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(registry: DatasetRegistry, connections: ConnectionManager) -> Self {
        Self {
            registry: Arc::new(registry),
            connections: Arc::new(connections),
        }
    }
}

/// Error body is always `{"detail": <message>}`.
#[derive(Debug)]
pub struct ApiError(GhgQueryError);

impl From<GhgQueryError> for ApiError {
    fn from(err: GhgQueryError) -> Self {
        Self(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(GhgQueryError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(GhgQueryError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GhgQueryError::NotFound(_) => StatusCode::NOT_FOUND,
            GhgQueryError::EmptyRange => {
                return Json(json!({ "message": EMPTY_RANGE_MESSAGE })).into_response();
            }
            // Engine failures are reported as client errors along with their message.
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/datasets", get(list_datasets))
        .route("/{dataset}", get(dataset_root))
        .route("/{dataset}/", get(dataset_root))
        .route("/{dataset}/filter_data", get(filter_data))
        .route("/{dataset}/unique_values/{column_name}", get(unique_values))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` on `listener` until SIGINT/SIGTERM.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "GHG query API listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let sigint = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = sigint => (),
        () = sigterm => (),
    }
    tracing::info!("shutting down");
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let datasets: Vec<&str> = state.registry.keys().collect();
    Json(json!({
        "message": "GHG query API is up and running!",
        "datasets": datasets,
    }))
}

async fn list_datasets(State(state): State<AppState>) -> Json<Vec<DatasetSummary>> {
    Json(state.registry.list_summaries())
}

async fn dataset_root(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(dataset) = path?;
    let spec = state
        .registry
        .get(&dataset)
        .ok_or_else(|| GhgQueryError::NotFound(format!("unknown dataset '{dataset}'")))?;
    Ok(Json(json!({
        "message": format!("{} API is up and running!", spec.title),
    })))
}

async fn filter_data(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(dataset) = path?;
    let Query(params) = query?;
    let default_limit = state.connections.config_for(&dataset).query.default_row_limit;
    let request = parse_filter_request(&state.registry, &dataset, params, default_limit)?;
    let outcome =
        runtime::filter_data(&state.registry, &state.connections, &dataset, &request).await?;
    Ok(match outcome {
        FilterOutcome::Rows(rows) => {
            Json(Value::Array(rows.into_iter().map(Value::Object).collect())).into_response()
        }
        FilterOutcome::EmptyRange => Json(json!({ "message": EMPTY_RANGE_MESSAGE })).into_response(),
    })
}

async fn unique_values(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<UniqueValues>> {
    let Path((dataset, column_name)) = path?;
    let values =
        runtime::unique_values(&state.registry, &state.connections, &dataset, &column_name)
            .await?;
    Ok(Json(values))
}

/// Split raw query parameters into the typed year range/limit and the dataset's filters.
pub fn parse_filter_request(
    registry: &DatasetRegistry,
    dataset: &str,
    mut params: HashMap<String, String>,
    default_limit: u64,
) -> Result<FilterRequest> {
    let spec = registry
        .get(dataset)
        .ok_or_else(|| GhgQueryError::NotFound(format!("unknown dataset '{dataset}'")))?;

    let start_year = required_param(&mut params, START_YEAR)?;
    let end_year = required_param(&mut params, END_YEAR)?;
    let limit = optional_param(&mut params, LIMIT)?.unwrap_or(default_limit);

    let mut values = BTreeMap::new();
    for (name, value) in params {
        if spec.filter(&name).is_some() {
            values.insert(name, Some(value));
        } else {
            tracing::debug!(dataset, param = %name, "ignoring unknown query parameter");
        }
    }

    Ok(FilterRequest {
        values,
        start_year,
        end_year,
        limit,
    })
}

fn required_param<T: FromStr>(params: &mut HashMap<String, String>, name: &str) -> Result<T> {
    optional_param(params, name)?.ok_or_else(|| {
        GhgQueryError::Validation(format!("missing required query parameter: {name}"))
    })
}

fn optional_param<T: FromStr>(params: &mut HashMap<String, String>, name: &str) -> Result<Option<T>> {
    match params.remove(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            GhgQueryError::Validation(format!(
                "query parameter {name} must be an integer, got '{raw}'"
            ))
        }),
    }
}
