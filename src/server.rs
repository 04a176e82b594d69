//! HTTP API for the logistics front-end

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use freightcam_core::{
    optimize_route, Counts, EmissionError, Location, ManualEstimate, ManualRequest, RouteError,
    RoutePlan,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub struct ServerConfig {
    pub bind: SocketAddr,
}

/// Shared, read-only request state
#[derive(Debug, Default)]
pub struct AppState {
    /// `/counts` is not wired to the camera counter; it always reports this
    counts: Counts,
}

#[derive(Debug, Default, Deserialize)]
struct OptimizeRequest {
    /// Missing and `null` both mean no stops
    #[serde(default)]
    locations: Option<Vec<Location>>,
}

/// Client-facing request errors, rendered as `{"error": ...}` with status 400
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Emission(#[from] EmissionError),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/counts", get(get_counts))
        .route("/optimize", post(optimize))
        .route("/calculate-manual", post(calculate_manual))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_counts(State(state): State<Arc<AppState>>) -> Json<Counts> {
    Json(state.counts)
}

/// Parse a JSON object body. An empty or `null` body yields `T::default()`;
/// anything else that is not an object is rejected.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    match value {
        Value::Null => Ok(T::default()),
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("invalid request: {}", e))),
        _ => Err(ApiError::BadRequest(
            "request body must be a JSON object".to_string(),
        )),
    }
}

async fn optimize(body: Bytes) -> Result<Json<RoutePlan>, ApiError> {
    let request: OptimizeRequest = parse_body(&body)?;
    let plan = optimize_route(request.locations.as_deref().unwrap_or_default())?;
    info!(
        "Optimized route over {} stops: {:.1} km, {:.1}% less CO2",
        plan.path.len(),
        plan.stats.total_distance_km,
        plan.stats.percent_reduction
    );
    Ok(Json(plan))
}

async fn calculate_manual(body: Bytes) -> Result<Json<ManualEstimate>, ApiError> {
    let request: ManualRequest = parse_body(&body)?;
    Ok(Json(request.validate()?.evaluate()))
}

pub async fn run(config: ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("✅ Server running on {}... Waiting for the front-end", config.bind);

    axum::serve(listener, router(Arc::new(AppState::default())))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down server");
        })
        .await
        .context("Server error")?;

    Ok(())
}
