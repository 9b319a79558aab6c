use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use blueprint_pipeline::api::{create_router, AppState, ErrorBody};
use blueprint_pipeline::gateway::{ContextBlock, GatewayError, LlmGateway};
use blueprint_pipeline::models::*;
use blueprint_pipeline::orchestrator::Orchestrator;
use blueprint_pipeline::registry;
use blueprint_pipeline::research::NoResearch;
use serde_json::{json, Value};
use tokio::sync::Notify;

/// Answers with the label of every context block it was given.
struct LabelGateway;

#[async_trait]
impl LlmGateway for LabelGateway {
    fn name(&self) -> &str {
        "labels"
    }

    async fn generate(&self, _prompt: &str, context: &[ContextBlock]) -> Result<String, GatewayError> {
        let labels: Vec<&str> = context.iter().map(|b| b.label.as_str()).collect();
        Ok(labels.join(" | "))
    }
}

struct DownGateway(GatewayError);

#[async_trait]
impl LlmGateway for DownGateway {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _: &str, _: &[ContextBlock]) -> Result<String, GatewayError> {
        Err(self.0.clone())
    }
}

/// Holds every call until the test releases it.
struct GatedGateway(Arc<Notify>);

#[async_trait]
impl LlmGateway for GatedGateway {
    fn name(&self) -> &str {
        "gated"
    }

    async fn generate(&self, _: &str, _: &[ContextBlock]) -> Result<String, GatewayError> {
        self.0.notified().await;
        Ok("late".to_string())
    }
}

/// Succeeds `healthy` times, then reports the service unavailable.
struct FlakyGateway {
    healthy: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmGateway for FlakyGateway {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, _: &str, _: &[ContextBlock]) -> Result<String, GatewayError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.healthy {
            Ok("draft".to_string())
        } else {
            Err(GatewayError::Unavailable("status 503".to_string()))
        }
    }
}

fn setup_with(gateway: impl LlmGateway + 'static) -> TestServer {
    let agent = registry::find_agent(registry::DEFAULT_AGENT).expect("Default agent exists");
    let orchestrator = Orchestrator::new(Arc::new(gateway), Arc::new(NoResearch));
    let app = create_router(AppState::new(orchestrator, agent));
    TestServer::new(app).expect("Failed to create test server")
}

fn setup() -> TestServer {
    setup_with(LabelGateway)
}

async fn create_session(server: &TestServer, idea: Option<&str>) -> Session {
    server
        .post("/api/v1/sessions")
        .json(&json!({ "idea": idea }))
        .await
        .json::<Session>()
}

async fn run(server: &TestServer, session: &Session, input: Option<&str>) -> PhaseResult {
    let response = server
        .post(&format!("/api/v1/sessions/{}/run", session.id()))
        .json(&json!({ "input": input }))
        .await;
    response.assert_status_ok();
    response.json::<PhaseResult>()
}

async fn approve(server: &TestServer, session: &Session, result: &PhaseResult) -> Value {
    let response = server
        .post(&format!("/api/v1/sessions/{}/feedback", session.id()))
        .json(&json!({ "phase": result.phase, "sequence": result.sequence, "decision": "approve" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

mod agent {
    use super::*;

    #[tokio::test]
    async fn health_is_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }

    #[tokio::test]
    async fn returns_greeting_roles_and_phases() {
        let server = setup();

        let body = server.get("/api/v1/agent").await.json::<Value>();

        assert_eq!(body["agent"]["name"], "itbp_agent");
        assert!(body["agent"]["greeting"].as_str().unwrap().contains("product idea"));
        assert_eq!(body["roles"].as_array().unwrap().len(), 4);
        assert_eq!(body["phases"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn lists_phases_in_order() {
        let server = setup();

        let phases = server.get("/api/v1/phases").await.json::<Vec<Value>>();

        let names: Vec<&str> = phases.iter().map(|p| p["phase"].as_str().unwrap()).collect();
        assert_eq!(names.first(), Some(&"GET_IDEA"));
        assert_eq!(names.last(), Some(&"FINISHED"));
        assert_eq!(phases[3]["artifact_key"], "project_brief_md");
        assert_eq!(phases[3]["role"], "ANALYST");
    }

    #[tokio::test]
    async fn lists_roles() {
        let server = setup();

        let roles = server.get("/api/v1/roles").await.json::<Vec<Value>>();

        let names: Vec<&str> = roles.iter().map(|r| r["role"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["ANALYST", "PM", "ARCHITECT", "POSM"]);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn creates_a_session_at_get_idea() {
        let server = setup();

        let response = server
            .post("/api/v1/sessions")
            .json(&json!({ "idea": "A tool library for neighbours" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let session = response.json::<Session>();
        assert_eq!(session.current_phase(), Phase::GetIdea);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.idea(), Some("A tool library for neighbours"));
    }

    #[tokio::test]
    async fn returns_404_for_unknown_session() {
        let server = setup();

        let response = server
            .get(&format!("/api/v1/sessions/{}", uuid::Uuid::new_v4()))
            .await;

        response.assert_status_not_found();
        assert_eq!(response.json::<ErrorBody>().kind, "session_not_found");
    }

    #[tokio::test]
    async fn deletes_a_session() {
        let server = setup();
        let session = create_session(&server, None).await;
        let path = format!("/api/v1/sessions/{}", session.id());

        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
        server.get(&path).await.assert_status_not_found();
    }
}

mod phase_turns {
    use super::*;

    #[tokio::test]
    async fn running_without_an_idea_is_a_bad_request() {
        let server = setup();
        let session = create_session(&server, None).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/run", session.id()))
            .json(&json!({}))
            .await;

        response.assert_status_bad_request();
        let error = response.json::<ErrorBody>();
        assert_eq!(error.kind, "missing_input");
        assert!(!error.retryable);
    }

    #[tokio::test]
    async fn idea_input_is_echoed_for_confirmation() {
        let server = setup();
        let session = create_session(&server, None).await;

        let result = run(&server, &session, Some("A tool library for neighbours")).await;

        assert_eq!(result.phase, Phase::GetIdea);
        assert_eq!(result.content, "A tool library for neighbours");
        assert_eq!(result.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn approving_the_idea_advances_to_brainstorm() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        let result = run(&server, &session, None).await;

        let outcome = approve(&server, &session, &result).await;

        assert_eq!(outcome["outcome"], "advanced");
        assert_eq!(outcome["phase"], "ANALYST_BRAINSTORM");
    }

    #[tokio::test]
    async fn rejection_replays_the_phase_with_feedback() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        let idea = run(&server, &session, None).await;
        approve(&server, &session, &idea).await;
        let draft = run(&server, &session, None).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/feedback", session.id()))
            .json(&json!({
                "sequence": draft.sequence,
                "decision": "reject",
                "feedback": "Focus on apartment buildings"
            }))
            .await;

        response.assert_status_ok();
        let outcome = response.json::<Value>();
        assert_eq!(outcome["outcome"], "replayed");
        assert_eq!(outcome["result"]["phase"], "ANALYST_BRAINSTORM");
        assert!(outcome["result"]["content"]
            .as_str()
            .unwrap()
            .contains("Feedback on previous drafts"));
    }

    #[tokio::test]
    async fn rejection_needs_feedback() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        let idea = run(&server, &session, None).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/feedback", session.id()))
            .json(&json!({ "sequence": idea.sequence, "decision": "reject", "feedback": " " }))
            .await;

        response.assert_status_bad_request();
        let outcome = approve(&server, &session, &idea).await;
        assert_eq!(outcome["outcome"], "advanced");
    }

    #[tokio::test]
    async fn stale_decision_is_a_conflict() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        let idea = run(&server, &session, None).await;
        approve(&server, &session, &idea).await;
        run(&server, &session, None).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/feedback", session.id()))
            .json(&json!({ "phase": "GET_IDEA", "sequence": idea.sequence, "decision": "approve" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<ErrorBody>().kind, "stale_result");
    }

    #[tokio::test]
    async fn research_phase_degrades_without_a_key() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        for _ in 0..2 {
            let result = run(&server, &session, None).await;
            approve(&server, &session, &result).await;
        }

        let result = run(&server, &session, None).await;

        assert_eq!(result.phase, Phase::AnalystResearch);
        assert!(result.degraded);
        assert!(!result.warnings.is_empty());
    }

    #[tokio::test]
    async fn full_pipeline_lists_artifacts_in_phase_order() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;
        for _ in 0..8 {
            let result = run(&server, &session, None).await;
            approve(&server, &session, &result).await;
        }

        let session: Session = server
            .get(&format!("/api/v1/sessions/{}", session.id()))
            .await
            .json();
        assert_eq!(session.status(), SessionStatus::Finished);

        let artifacts = server
            .get(&format!("/api/v1/sessions/{}/artifacts", session.id()))
            .await
            .json::<Vec<Artifact>>();
        let keys: Vec<&str> = artifacts.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "user_input_idea",
                "analyst_brainstorming_summary_md",
                "analyst_research_findings_md",
                "project_brief_md",
                "prd_md",
                "architecture_docs_md",
                "posm_po_validation_summary_md",
                "all_stories_md",
            ]
        );

        let response = server
            .post(&format!("/api/v1/sessions/{}/run", session.id()))
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<ErrorBody>().kind, "session_closed");
    }
}

mod failures {
    use super::*;

    async fn at_brainstorm(server: &TestServer) -> Session {
        let session = create_session(server, Some("A tool library")).await;
        let idea = run(server, &session, None).await;
        approve(server, &session, &idea).await;
        session
    }

    #[tokio::test]
    async fn rate_limit_maps_to_429_and_is_retryable() {
        let server = setup_with(DownGateway(GatewayError::RateLimited { retry_after: Some(30) }));
        let session = at_brainstorm(&server).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/run", session.id()))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let error = response.json::<ErrorBody>();
        assert_eq!(error.kind, "gateway_rate_limited");
        assert!(error.retryable);
        assert!(error.error.contains("30 seconds"));
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let server = setup_with(DownGateway(GatewayError::Timeout));
        let session = at_brainstorm(&server).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/run", session.id()))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn unavailable_maps_to_502_and_phase_is_unchanged() {
        let server = setup_with(DownGateway(GatewayError::Unavailable("status 500".into())));
        let session = at_brainstorm(&server).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/run", session.id()))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        let session: Session = server
            .get(&format!("/api/v1/sessions/{}", session.id()))
            .await
            .json();
        assert_eq!(session.current_phase(), Phase::AnalystBrainstorm);
        assert_eq!(session.in_flight(), None);
    }

    #[tokio::test]
    async fn cancel_without_invocation_is_a_conflict() {
        let server = setup();
        let session = create_session(&server, Some("A tool library")).await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/cancel", session.id()))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<ErrorBody>().kind, "nothing_in_flight");
    }

    #[tokio::test]
    async fn failed_replay_asks_for_a_new_run() {
        let server = setup_with(FlakyGateway {
            healthy: 1,
            calls: AtomicUsize::new(0),
        });
        let session = at_brainstorm(&server).await;
        let draft = run(&server, &session, None).await;
        let feedback_path = format!("/api/v1/sessions/{}/feedback", session.id());
        let rejection = json!({
            "sequence": draft.sequence,
            "decision": "reject",
            "feedback": "Focus on apartment buildings"
        });

        let response = server.post(&feedback_path).json(&rejection).await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        let error = response.json::<ErrorBody>();
        assert_eq!(error.kind, "replay_failed");
        assert!(!error.retryable);
        assert!(error.error.contains("run the phase again"));

        let resent = server.post(&feedback_path).json(&rejection).await;
        resent.assert_status(StatusCode::CONFLICT);
        assert_eq!(resent.json::<ErrorBody>().kind, "no_pending_result");
    }

    #[tokio::test]
    async fn cancelled_invocation_result_is_discarded() {
        let release = Arc::new(Notify::new());
        let server = setup_with(GatedGateway(release.clone()));
        let session = create_session(&server, Some("A tool library")).await;
        let idea_path = format!("/api/v1/sessions/{}/feedback", session.id());
        let idea = run(&server, &session, None).await;
        server
            .post(&idea_path)
            .json(&json!({ "sequence": idea.sequence, "decision": "approve" }))
            .await
            .assert_status_ok();
        let session_path = format!("/api/v1/sessions/{}", session.id());
        let run_path = format!("{session_path}/run");
        let cancel_path = format!("{session_path}/cancel");

        let (response, cancelled) = tokio::join!(
            async { server.post(&run_path).json(&json!({})).await },
            async {
                while server.get(&session_path).await.json::<Session>().in_flight().is_none() {
                    tokio::task::yield_now().await;
                }
                let cancelled = server.post(&cancel_path).await;
                release.notify_one();
                cancelled
            }
        );

        cancelled.assert_status_ok();
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<ErrorBody>().kind, "stale_result");

        let session: Session = server.get(&session_path).await.json();
        assert!(session.pending().is_none());
        assert_eq!(session.in_flight(), None);
    }
}
