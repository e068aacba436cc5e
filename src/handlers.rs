use axum::{
    extract::{Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
        },
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::DiscoveryError;
use crate::inventory::list_networks_and_subnets;
use crate::models::{ErrorBody, HealthStatus, Report};
use crate::report::build_report;
use crate::state::AppState;

/// Query parameters for the discovery endpoint.
#[derive(Debug, Default)]
pub struct DiscoveryQuery {
    pub refresh: Option<String>,
}

impl DiscoveryQuery {
    /// Takes the first `refresh` value; repeated or unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            refresh: pairs
                .into_iter()
                .find(|(key, _)| key == "refresh")
                .map(|(_, value)| value),
        }
    }

    /// Only a case-insensitive `"true"` forces a refresh.
    pub fn force_refresh(&self) -> bool {
        self.refresh
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("true"))
    }
}

/// Builds the router with both endpoints, CORS preflight and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(vpc_discovery).options(preflight))
        .route("/health", get(health).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OPTIONS - CORS preflight. The allow-origin header is added by the router.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_METHODS, "GET"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (ACCESS_CONTROL_MAX_AGE, "3600"),
        ],
    )
}

/// GET / - VPC networks and subnets report, cached unless `refresh=true`.
pub async fn vpc_discovery(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let force_refresh = DiscoveryQuery::from_pairs(pairs).force_refresh();

    match discover(state.clone(), force_refresh).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(force_refresh, "Discovery request failed: {}", e);
            let body = ErrorBody {
                error: e.to_string(),
                timestamp: Utc::now(),
                project_id: state.config.project_id.clone(),
                region: state.config.region.clone(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Serves the cached report when allowed, otherwise generates a fresh one.
pub async fn discover(state: Arc<AppState>, force_refresh: bool) -> Result<Report, DiscoveryError> {
    // Runs on its own task so a panicking collaborator becomes an error.
    let report = tokio::spawn(serve_report(state, force_refresh)).await?;
    Ok(report)
}

async fn serve_report(state: Arc<AppState>, force_refresh: bool) -> Report {
    if !force_refresh {
        if let Some(mut report) = state.cache.get_cached_report().await {
            report.mark_served_from_cache(Utc::now());
            info!(generated_at = %report.generated_at, "Serving cached report");
            return report;
        }
    }
    generate_report(state).await
}

async fn generate_report(state: Arc<AppState>) -> Report {
    let config = &state.config;
    let networks =
        list_networks_and_subnets(state.compute.as_ref(), &config.project_id, &config.region)
            .await;

    let mut report = build_report(
        &config.project_id,
        &config.region,
        networks,
        state.cache.is_enabled(),
        state.cache.ttl_secs(),
        Utc::now(),
    );

    let cached = state.cache.cache_report(&report).await;
    report.cache_info.cached_successfully = Some(cached);

    info!(
        networks = report.summary.total_networks,
        subnets = report.summary.total_subnets,
        cached,
        "Generated fresh report"
    );
    report
}

/// GET /health - Liveness probe with cache connectivity.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".into(),
        timestamp: Utc::now(),
        project_id: state.config.project_id.clone(),
        region: state.config.region.clone(),
        redis_connected: state.cache.ping().await,
    })
}
