//! REST API Server for the research assistant
//!
//! Thin axum handlers over [`Assistant`]. Bodies are snake_case JSON;
//! camelCase field names are accepted as aliases.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::agent::{Assistant, ChatReply, PlanReply, ResearchReply, UpdateReply};
use crate::error::AssistantError;
use crate::models::Session;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default, alias = "preferredPersona")]
    pub preferred_persona: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    pub company: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    pub company: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    pub company: String,
    pub section: String,
    #[serde(default, alias = "newValue")]
    pub new_value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct CompaniesResponse {
    pub companies: Vec<String>,
}

/// =============================
/// Error Response
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            success: false,
            error: message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::SessionNotFound(_) => {
                ApiError::NotFound("Session not found".to_string())
            }
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
}

/// =============================
/// Handlers
/// =============================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Company research assistant backend is running."
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(
    State(state): State<ApiState>,
    Query(query): Query<NewSessionRequest>,
    body: Option<Json<NewSessionRequest>>,
) -> ApiResult<NewSessionResponse> {
    let persona = body
        .and_then(|Json(req)| req.preferred_persona)
        .or(query.preferred_persona);

    let session_id = state.assistant.create_session(persona.as_deref()).await?;
    Ok(Json(NewSessionResponse {
        session_id: session_id.to_string(),
    }))
}

async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> ApiResult<Session> {
    Ok(Json(state.assistant.session(&session_id).await?))
}

async fn chat(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult<ChatReply> {
    info!("Received chat message ({} chars)", req.message.len());
    Ok(Json(
        state
            .assistant
            .chat(req.session_id.as_deref(), &req.message)
            .await?,
    ))
}

async fn research(
    State(state): State<ApiState>,
    Json(req): Json<ResearchRequest>,
) -> ApiResult<ResearchReply> {
    info!("Received research request: {}", req.company);
    Ok(Json(
        state
            .assistant
            .research(req.session_id.as_deref(), &req.company)
            .await?,
    ))
}

async fn generate_account_plan(
    State(state): State<ApiState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<PlanReply> {
    info!("Received account plan request: {}", req.company);
    Ok(Json(
        state
            .assistant
            .generate_account_plan(req.session_id.as_deref(), &req.company, req.mode.as_deref())
            .await?,
    ))
}

async fn update(
    State(state): State<ApiState>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<UpdateReply> {
    Ok(Json(
        state
            .assistant
            .update(
                req.session_id.as_deref(),
                &req.company,
                &req.section,
                req.new_value,
            )
            .await?,
    ))
}

async fn companies(State(state): State<ApiState>) -> Json<CompaniesResponse> {
    Json(CompaniesResponse {
        companies: state.assistant.companies().await,
    })
}

/// =============================
/// Router
/// =============================

pub fn create_router(assistant: Arc<Assistant>) -> Router {
    let state = ApiState { assistant };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:session_id", get(get_session))
        .route("/debug/:session_id", get(get_session))
        .route("/chat", post(chat))
        .route("/research", post(research))
        .route("/generate_account_plan", post(generate_account_plan))
        .route("/update", post(update))
        .route("/companies", get(companies))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    assistant: Arc<Assistant>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(assistant);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
