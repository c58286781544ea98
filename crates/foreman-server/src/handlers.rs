use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use foreman_core::events::SessionStatusEvent;
use foreman_core::ids::{SessionId, TaskId};
use foreman_core::policy::AgentRole;
use foreman_core::task::Task;
use foreman_engine::{LaunchParams, OrchestratorError};

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LaunchRequest {
    pub role: String,
    pub prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WaitRequest {
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

#[derive(Debug, Serialize)]
pub struct SubagentsResponse {
    pub roles: Vec<AgentRole>,
}

#[derive(Debug, Serialize)]
pub struct AllowedResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tasks: usize,
    pub active_starts: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Error wrapper giving every handler the same error wire shape.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn task_not_found(id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "TASK_NOT_FOUND",
            format!("task not found: {id}"),
        )
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        match &error {
            OrchestratorError::DelegationDenied { .. } => {
                Self::new(StatusCode::FORBIDDEN, "DELEGATION_DENIED", error.to_string())
            }
            OrchestratorError::MissingCallerSession => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "MISSING_CALLER_SESSION",
                error.to_string(),
            ),
            OrchestratorError::TaskNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "TASK_NOT_FOUND", error.to_string())
            }
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                error.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.to_owned(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// `POST /v1/tasks` — policy-checked launch. A disallowed role is rejected
/// with the caller's allowed set before any task is created; a missing
/// caller session is the one structurally invalid call.
pub async fn launch(
    State(state): State<AppState>,
    Json(req): Json<LaunchRequest>,
) -> Result<Json<Task>, ApiError> {
    if req.parent_session_id.is_empty() {
        return Err(OrchestratorError::MissingCallerSession.into());
    }
    let parent_session_id = SessionId::from_raw(req.parent_session_id);
    let role = AgentRole::new(req.role);

    state.orchestrator.authorize_spawn(&parent_session_id, &role)?;

    let task = state.orchestrator.launch(LaunchParams {
        role,
        prompt: req.prompt,
        description: req.description,
        parent_session_id,
    });
    Ok(Json(task))
}

/// `GET /v1/tasks/{id}`
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .orchestrator
        .get_task(&TaskId::from_raw(id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(&id))
}

/// `POST /v1/tasks/{id}/wait`
pub async fn wait_for_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WaitRequest>,
) -> Result<Json<Task>, ApiError> {
    state
        .orchestrator
        .wait_for_completion(&TaskId::from_raw(id.as_str()), req.timeout_ms)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(&id))
}

/// `POST /v1/tasks/cancel` — one task by id, or everything non-terminal.
pub async fn cancel(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Json<CancelResponse> {
    let cancelled = match req.task_id {
        Some(id) => state.orchestrator.cancel(Some(&TaskId::from_raw(id))),
        None => state.orchestrator.cancel(None),
    };
    Json(CancelResponse { cancelled })
}

/// `GET /v1/sessions/{session_id}/subagents`
pub async fn allowed_subagents(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<SubagentsResponse> {
    let roles = state
        .orchestrator
        .allowed_subagents(&SessionId::from_raw(session_id));
    Json(SubagentsResponse { roles })
}

/// `GET /v1/sessions/{session_id}/allowed/{role}`
pub async fn is_allowed(
    State(state): State<AppState>,
    Path((session_id, role)): Path<(String, String)>,
) -> Json<AllowedResponse> {
    let allowed = state
        .orchestrator
        .is_agent_allowed(&SessionId::from_raw(session_id), &AgentRole::new(role));
    Json(AllowedResponse { allowed })
}

/// `POST /v1/events` — status-event ingress from the execution host.
pub async fn ingest_status_event(
    State(state): State<AppState>,
    Json(event): Json<SessionStatusEvent>,
) -> StatusCode {
    state.orchestrator.handle_status_event(event).await;
    StatusCode::ACCEPTED
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        tasks: state.orchestrator.task_count(),
        active_starts: state.orchestrator.active_starts(),
    })
}
