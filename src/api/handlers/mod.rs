use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::{OrchestratorError, WorkflowError};
use crate::gateway::GatewayError;
use crate::models::*;
use crate::orchestrator::{Decided, FeedbackOutcome};
use crate::registry::{self, AgentDefinition, RoleProfile};

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(status: StatusCode, kind: &str, error: String, retryable: bool) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error,
            kind: kind.to_string(),
            retryable,
        }),
    )
}

fn session_not_found() -> ApiError {
    error_response(
        StatusCode::NOT_FOUND,
        "session_not_found",
        "Session not found".to_string(),
        false,
    )
}

fn bad_request(message: &str) -> ApiError {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        message.to_string(),
        false,
    )
}

fn workflow_error(e: WorkflowError) -> ApiError {
    orchestrator_error(e.into())
}

/// Map an orchestration failure to a status code. The full error is logged
/// server-side; clients get the user-facing message.
fn orchestrator_error(e: OrchestratorError) -> ApiError {
    let status = match &e {
        OrchestratorError::Workflow(WorkflowError::MissingInput { .. }) => StatusCode::BAD_REQUEST,
        OrchestratorError::Workflow(_) => StatusCode::CONFLICT,
        OrchestratorError::Gateway { source, .. } | OrchestratorError::Replay { source, .. } => {
            match source {
                GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                GatewayError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            }
        }
    };

    if status.is_server_error() {
        tracing::error!(error = ?e, "Phase invocation failed");
    } else {
        tracing::warn!("Rejected request: {}", e);
    }
    error_response(status, e.kind(), e.user_message(), e.is_retryable())
}

// ============================================================
// Health & Agent
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct PhaseInfo {
    pub phase: Phase,
    pub display_name: &'static str,
    pub role: Option<Role>,
    pub artifact_key: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub agent: &'static AgentDefinition,
    pub roles: Vec<&'static RoleProfile>,
    pub phases: Vec<PhaseInfo>,
}

fn phase_infos() -> Vec<PhaseInfo> {
    Phase::all()
        .iter()
        .map(|&phase| PhaseInfo {
            phase,
            display_name: phase.display_name(),
            role: phase.required_role(),
            artifact_key: registry::artifact_key(phase),
        })
        .collect()
}

pub async fn get_agent(State(state): State<AppState>) -> Json<AgentResponse> {
    Json(AgentResponse {
        agent: state.agent,
        roles: registry::role_profiles().to_vec(),
        phases: phase_infos(),
    })
}

pub async fn list_roles() -> Json<Vec<&'static RoleProfile>> {
    Json(registry::role_profiles().to_vec())
}

pub async fn list_phases() -> Json<Vec<PhaseInfo>> {
    Json(phase_infos())
}

// ============================================================
// Sessions
// ============================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateSessionInput {
    #[serde(default)]
    pub idea: Option<String>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(input): Json<CreateSessionInput>,
) -> (StatusCode, Json<Session>) {
    let session = state
        .sessions
        .insert(Session::new(state.agent.name, input.idea));
    tracing::info!(session_id = %session.id(), "Session created");
    (StatusCode::CREATED, Json(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    state.sessions.get(id).map(Json).ok_or_else(session_not_found)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id) {
        tracing::info!(session_id = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found())
    }
}

pub async fn list_artifacts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Artifact>>, ApiError> {
    let session = state.sessions.get(id).ok_or_else(session_not_found)?;
    let mut artifacts = session.artifacts().to_vec();
    artifacts.sort_by_key(|a| a.phase);
    Ok(Json(artifacts))
}

// ============================================================
// Phase turns
// ============================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunPhaseInput {
    #[serde(default)]
    pub input: Option<String>,
}

/// Run the session's current phase. The store lock is released while the
/// gateway call is outstanding.
pub async fn run_phase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RunPhaseInput>,
) -> Result<Json<PhaseResult>, ApiError> {
    let orchestrator = &state.orchestrator;

    let invocation = state
        .sessions
        .with_session(id, |session| orchestrator.prepare(session, input.input))
        .ok_or_else(session_not_found)?
        .map_err(workflow_error)?;

    let outcome = orchestrator.execute(&invocation).await;

    state
        .sessions
        .with_session(id, |session| orchestrator.apply(session, &invocation, outcome))
        .ok_or_else(session_not_found)?
        .map(Json)
        .map_err(orchestrator_error)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Reject,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackInput {
    /// Phase of the result being decided. Defaults to the session's phase.
    #[serde(default)]
    pub phase: Option<Phase>,
    pub sequence: u64,
    pub decision: DecisionKind,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Approve or reject a pending result. A rejection replays the phase and
/// returns the new pending result.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<FeedbackOutcome>, ApiError> {
    let decision = match input.decision {
        DecisionKind::Approve => Decision::Approve,
        DecisionKind::Reject => match input.feedback.filter(|f| !f.trim().is_empty()) {
            Some(feedback) => Decision::Reject { feedback },
            None => return Err(bad_request("Rejecting a result requires feedback")),
        },
    };
    let orchestrator = &state.orchestrator;

    let decided = state
        .sessions
        .with_session(id, |session| {
            let phase = input.phase.unwrap_or_else(|| session.current_phase());
            orchestrator.decide(session, phase, input.sequence, decision)
        })
        .ok_or_else(session_not_found)?
        .map_err(orchestrator_error)?;

    let invocation = match decided {
        Decided::Advanced(phase) => return Ok(Json(FeedbackOutcome::Advanced { phase })),
        Decided::Replay(invocation) => invocation,
    };

    let outcome = orchestrator.execute(&invocation).await;

    state
        .sessions
        .with_session(id, |session| {
            orchestrator.apply_replay(session, &invocation, outcome)
        })
        .ok_or_else(session_not_found)?
        .map(|result| Json(FeedbackOutcome::Replayed { result }))
        .map_err(orchestrator_error)
}

/// Abandon the in-flight invocation; its late result is discarded.
pub async fn cancel_invocation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    state
        .sessions
        .with_session(id, |session| {
            let sequence = session.cancel()?;
            tracing::info!(session_id = %id, sequence, "Invocation cancelled");
            Ok::<_, WorkflowError>(session.clone())
        })
        .ok_or_else(session_not_found)?
        .map(Json)
        .map_err(workflow_error)
}
