mod handlers;

pub use handlers::{CreateSessionInput, ErrorBody, FeedbackInput, DecisionKind, RunPhaseInput};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::orchestrator::Orchestrator;
use crate::registry::AgentDefinition;
use crate::store::SessionStore;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: SessionStore,
    /// Agent definition the server was started with.
    pub agent: &'static AgentDefinition,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, agent: &'static AgentDefinition) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            sessions: SessionStore::new(),
            agent,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Agent
        .route("/agent", get(handlers::get_agent))
        .route("/roles", get(handlers::list_roles))
        .route("/phases", get(handlers::list_phases))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/artifacts", get(handlers::list_artifacts))
        // Phase turns
        .route("/sessions/{id}/run", post(handlers::run_phase))
        .route("/sessions/{id}/feedback", post(handlers::submit_feedback))
        .route("/sessions/{id}/cancel", post(handlers::cancel_invocation))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
