//! HTTP Server
//!
//! JSON API over the session registry. Every session created here uses the
//! deferred permission gate: a test run answers with a permission request
//! and resumes when `/permission/respond` records the decision.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bug_cascade_tools::PermissionResponse;

use crate::models::response::{
    ChatRequest, ChatResponse, ContextResponse, CreateSessionResponse, HealthResponse,
    PermissionRespondRequest,
};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn error_response(error: AppError) -> (StatusCode, String) {
    let status = match &error {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(status = status.as_u16(), error = %error, "Request failed");
    (status, error.to_string())
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", post(create_session))
        .route("/session/{id}/context", get(get_context))
        .route("/chat", post(chat))
        .route("/permission/respond", post(respond_permission))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> AppResult<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        sessions: state.registry().len().await,
        ..Default::default()
    })
}

async fn create_session(State(state): State<AppState>) -> ApiResult<CreateSessionResponse> {
    let (session_id, _) = state.registry().create().await.map_err(error_response)?;
    Ok(Json(CreateSessionResponse { session_id }))
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if req.session_id.trim().is_empty() {
        return Err(error_response(AppError::validation("session_id is required")));
    }
    let session = state
        .registry()
        .get_or_create(&req.session_id)
        .await
        .map_err(error_response)?;
    let outcome = session.lock().await.handle_message(&req.message).await;
    Ok(Json(ChatResponse::from(outcome)))
}

async fn respond_permission(
    State(state): State<AppState>,
    Json(req): Json<PermissionRespondRequest>,
) -> ApiResult<ChatResponse> {
    let session = state
        .registry()
        .get_or_create(&req.session_id)
        .await
        .map_err(error_response)?;
    let response = PermissionResponse {
        allowed: req.approved,
        always_allow: req.always_allow,
    };
    let outcome = session
        .lock()
        .await
        .resolve_permission(&req.request_id, response)
        .await;
    Ok(Json(ChatResponse::from(outcome)))
}

async fn get_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContextResponse> {
    let session = state
        .registry()
        .get(&id)
        .await
        .ok_or_else(|| error_response(AppError::not_found(format!("Session not found: {}", id))))?;
    let session = session.lock().await;
    let orchestrator = session.orchestrator();
    Ok(Json(ContextResponse {
        session_id: id.clone(),
        context: session.context(),
        active_bug: orchestrator.active_bug_id().map(str::to_string),
        phase: orchestrator.phase().map(|p| p.to_string()),
    }))
}
