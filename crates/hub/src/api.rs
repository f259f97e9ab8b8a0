//! HTTP API: report, inventory and project endpoints plus health checks and
//! Prometheus metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hub_lib::{
    error::HubError,
    health::{components, ComponentStatus, HealthRegistry},
    inventory::InventoryService,
    observability::HubMetrics,
    report::ReportAggregator,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const SERVICE_NAME: &str = "finops-hub";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<ReportAggregator>,
    pub inventory: Arc<InventoryService>,
    pub health_registry: HealthRegistry,
    pub metrics: HubMetrics,
}

impl AppState {
    pub fn new(
        aggregator: Arc<ReportAggregator>,
        inventory: Arc<InventoryService>,
        health_registry: HealthRegistry,
        metrics: HubMetrics,
    ) -> Self {
        Self {
            aggregator,
            inventory,
            health_registry,
            metrics,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    #[serde(default)]
    pub project_id: String,
    pub zones: Option<String>,
}

/// Error body `{"error": "..."}` with 400 for bad requests and 502 when
/// collaborators left nothing to report
struct ApiError(HubError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// 200 while healthy or degraded, 503 after a report failed in every zone
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Response, ApiError> {
    let zones: Vec<String> = query
        .zones
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|z| !z.is_empty())
        .map(str::to_string)
        .collect();

    match state.aggregator.build(&query.project_id, &zones).await {
        Ok(report) => {
            state
                .health_registry
                .apply_diagnostics(&report.diagnostics)
                .await;
            Ok(Json(report).into_response())
        }
        Err(e) => {
            if let HubError::AllZonesFailed(reason) = &e {
                warn!(project_id = %query.project_id, reason = %reason, "Report failed in every zone");
                state.health_registry.record_outage(reason).await;
            }
            Err(e.into())
        }
    }
}

async fn resources(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Response, ApiError> {
    match state
        .inventory
        .resources(&query.project_id, query.zones.as_deref())
        .await
    {
        Ok(resources) => {
            state.health_registry.set_healthy(components::INVENTORY).await;
            Ok(Json(resources).into_response())
        }
        Err(e) => {
            if !e.is_validation() {
                state
                    .health_registry
                    .set_degraded(components::INVENTORY, e.to_string())
                    .await;
            }
            Err(e.into())
        }
    }
}

async fn projects(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let projects = state.inventory.projects().await?;
    Ok(Json(projects).into_response())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/report", get(report))
        .route("/api/v1/resources", get(resources))
        .route("/api/v1/projects", get(projects))
        .with_state(state)
}

/// Start the API server; resolves once `shutdown` completes
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
