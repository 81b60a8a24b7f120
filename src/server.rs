//! HTTP surface: `/health` and `/api/adjust-ui`.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::layout::validator::{build_ui_state, RawUiState};
use crate::llm::BackendKind;
use crate::orchestrator::{AdjustOutcome, CockpitAgent};

/// Shared across handlers; read-only after startup.
pub struct AppState {
    pub agent: CockpitAgent,
}

impl AppState {
    pub fn new(agent: CockpitAgent) -> Self {
        Self { agent }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustUiRequest {
    pub command: String,
    pub current_ui: RawUiState,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_configured: bool,
    pub model_type: BackendKind,
    pub model_status: String,
    pub local_model: Option<String>,
}

pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::ModelNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        AgentError::ModelTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AgentError::ModelInvocationFailed(_)
        | AgentError::ModelOutputEmpty
        | AgentError::ResponseMalformed { .. }
        | AgentError::SchemaViolation { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = json!({ "error": self.0.kind(), "detail": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/adjust-ui", post(adjust_ui))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Allows the configured origins with credentials; methods and headers are
/// mirrored from the preflight since wildcards cannot be combined with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backend = state.agent.backend();
    // A requested local model that failed its probe is not reported as local.
    let model_type = backend.map_or(BackendKind::Remote, |backend| backend.kind());
    let model_status = match backend {
        Some(backend) if backend.kind() == BackendKind::Local => format!("local model ({})", backend.model_name()),
        Some(backend) => format!("remote model ({})", backend.model_name()),
        None => "not configured".to_string(),
    };
    let local_model = backend
        .filter(|backend| backend.kind() == BackendKind::Local)
        .map(|backend| backend.model_name().to_string());

    Json(HealthResponse {
        status: "ok",
        model_configured: backend.is_some(),
        model_type,
        model_status,
        local_model,
    })
}

async fn adjust_ui(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdjustUiRequest>, JsonRejection>,
) -> Result<Json<AdjustOutcome>, ApiError> {
    let Json(request) = payload.map_err(|rejection| AgentError::InvalidRequest(rejection.body_text()))?;
    info!("adjust-ui request: {:?}", request.command);

    let current = build_ui_state(&request.current_ui, "current_ui", state.agent.catalog())
        .map_err(|violation| AgentError::InvalidRequest(violation.to_string()))?;

    match state.agent.adjust_ui(&request.command, &current).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err) => {
            error!("adjust-ui failed ({}): {err}", err.kind());
            Err(err.into())
        }
    }
}

pub async fn run(state: AppState, bind_addr: &str, cors_origins: &[String]) -> Result<()> {
    let app = router(Arc::new(state), cors_layer(cors_origins));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
