//! Drives a [`Session`] through the phase pipeline.
//!
//! A phase turn has three steps so that async callers never hold a session
//! borrow across the network call:
//!
//! 1. [`Orchestrator::prepare`] reserves an invocation sequence on the session
//!    and snapshots what the role needs.
//! 2. [`Orchestrator::execute`] talks to the research tool and the gateway.
//! 3. [`Orchestrator::apply`] stores the output, unless the session has moved
//!    past the phase or sequence that issued it.
//!
//! [`Orchestrator::run_phase`] composes the three for callers that own the
//! session outright.

mod invocation;

pub use invocation::Invocation;

use std::sync::Arc;

use serde::Serialize;

use crate::error::{OrchestratorError, WorkflowError};
use crate::gateway::{ContextBlock, GatewayError, LlmGateway};
use crate::models::{Decision, Phase, PhaseResult, Session};
use crate::research::ResearchTool;

const RESEARCH_UNAVAILABLE: &str = "Research was unavailable for this run. Base the analysis \
     on the idea and the brainstorming summary, and mark every claim that still needs validation.";

/// Text produced by one invocation, before it becomes a [`PhaseResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    /// Why the generation ran in degraded mode, if it did.
    pub warnings: Vec<String>,
}

/// What a user decision led to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// The result was approved; the session now sits at `phase`.
    Advanced { phase: Phase },
    /// The result was rejected and the phase was run again.
    Replayed { result: PhaseResult },
}

/// Result of recording a decision, before any replay runs.
#[derive(Debug, Clone)]
pub enum Decided {
    Advanced(Phase),
    Replay(Invocation),
}

#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn LlmGateway>,
    research: Arc<dyn ResearchTool>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn LlmGateway>, research: Arc<dyn ResearchTool>) -> Self {
        Self { gateway, research }
    }

    /// Run the current phase and return its output as a pending result.
    pub async fn run_phase(
        &self,
        session: &mut Session,
        input: Option<String>,
    ) -> Result<PhaseResult, OrchestratorError> {
        let invocation = self.prepare(session, input)?;
        let outcome = self.execute(&invocation).await;
        self.apply(session, &invocation, outcome)
    }

    /// Approve or reject `result`. A rejection replays the phase with the
    /// feedback in context.
    pub async fn submit_feedback(
        &self,
        session: &mut Session,
        result: &PhaseResult,
        decision: Decision,
    ) -> Result<FeedbackOutcome, OrchestratorError> {
        match self.decide(session, result.phase, result.sequence, decision)? {
            Decided::Advanced(phase) => Ok(FeedbackOutcome::Advanced { phase }),
            Decided::Replay(invocation) => {
                let outcome = self.execute(&invocation).await;
                let result = self.apply_replay(session, &invocation, outcome)?;
                Ok(FeedbackOutcome::Replayed { result })
            }
        }
    }

    /// Reserve an invocation for the session's current phase.
    ///
    /// At `GetIdea`, `input` replaces the idea.
    pub fn prepare(
        &self,
        session: &mut Session,
        input: Option<String>,
    ) -> Result<Invocation, WorkflowError> {
        if session.current_phase() == Phase::GetIdea {
            if let Some(idea) = input.as_deref() {
                session.set_idea(idea)?;
            }
        }
        let sequence = session.begin_invocation()?;
        let invocation = Invocation::build(session, sequence, input.as_deref());

        tracing::debug!(
            session_id = %invocation.session_id,
            phase = %invocation.phase,
            sequence,
            "Prepared invocation"
        );
        Ok(invocation)
    }

    /// Record a decision on the pending result for `(phase, sequence)`.
    ///
    /// An invalid transition aborts the session.
    pub fn decide(
        &self,
        session: &mut Session,
        phase: Phase,
        sequence: u64,
        decision: Decision,
    ) -> Result<Decided, OrchestratorError> {
        let decided = match decision {
            Decision::Approve => session.approve(phase, sequence).map(Decided::Advanced),
            Decision::Reject { feedback } => {
                let replay_input = (phase == Phase::GetIdea).then(|| feedback.clone());
                session
                    .reject(phase, sequence, feedback)
                    .and_then(|()| self.prepare(session, replay_input))
                    .map(Decided::Replay)
            }
        };

        match decided {
            Ok(Decided::Advanced(next)) => {
                tracing::info!(session_id = %session.id(), from = %phase, to = %next, "Phase approved");
                Ok(Decided::Advanced(next))
            }
            Ok(replay) => {
                tracing::info!(session_id = %session.id(), %phase, "Phase rejected, replaying");
                Ok(replay)
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(session_id = %session.id(), error = %e, "Aborting session");
                session.abort();
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// [`apply`](Self::apply) for the invocation issued by a rejection.
    ///
    /// A gateway failure becomes [`OrchestratorError::Replay`]: the rejection
    /// is already recorded, so the caller has to run the phase again rather
    /// than resend the decision.
    pub fn apply_replay(
        &self,
        session: &mut Session,
        invocation: &Invocation,
        outcome: Result<Generation, GatewayError>,
    ) -> Result<PhaseResult, OrchestratorError> {
        self.apply(session, invocation, outcome).map_err(|e| match e {
            OrchestratorError::Gateway { phase, source } => {
                OrchestratorError::Replay { phase, source }
            }
            other => other,
        })
    }

    /// Run an invocation against the research tool and the gateway.
    ///
    /// Research failures never fail the invocation; they become warnings.
    pub async fn execute(&self, invocation: &Invocation) -> Result<Generation, GatewayError> {
        if invocation.role.is_none() {
            return Ok(Generation {
                text: invocation.idea.clone().unwrap_or_default(),
                warnings: Vec::new(),
            });
        }

        let mut context = invocation.context.clone();
        let mut warnings = Vec::new();

        if let Some(query) = invocation.research_query.as_deref() {
            match self.research.research(query).await {
                Ok(findings) => context.push(ContextBlock::new("Research findings", findings)),
                Err(e) => {
                    tracing::warn!(
                        session_id = %invocation.session_id,
                        error = %e,
                        kind = e.kind(),
                        "Research unavailable, continuing in degraded mode"
                    );
                    warnings.push(format!(
                        "Research unavailable: {e}. This result was produced without research findings."
                    ));
                    context.push(ContextBlock::new("Research findings", RESEARCH_UNAVAILABLE));
                }
            }
        }

        tracing::info!(
            session_id = %invocation.session_id,
            phase = %invocation.phase,
            sequence = invocation.sequence,
            gateway = self.gateway.name(),
            "Invoking gateway"
        );
        let text = self.gateway.generate(&invocation.prompt, &context).await?;
        Ok(Generation { text, warnings })
    }

    /// Store the outcome of `invocation` on the session.
    ///
    /// Outcomes for a phase or sequence the session no longer waits on are
    /// discarded with [`WorkflowError::StaleResult`].
    pub fn apply(
        &self,
        session: &mut Session,
        invocation: &Invocation,
        outcome: Result<Generation, GatewayError>,
    ) -> Result<PhaseResult, OrchestratorError> {
        match outcome {
            Ok(generation) => {
                let result = generation.warnings.into_iter().fold(
                    PhaseResult::pending(
                        invocation.phase,
                        invocation.role,
                        invocation.sequence,
                        generation.text,
                    ),
                    PhaseResult::with_warning,
                );
                session.accept_output(result).map_err(|e| {
                    tracing::info!(
                        session_id = %invocation.session_id,
                        sequence = invocation.sequence,
                        "Discarding result of abandoned invocation"
                    );
                    e.into()
                })
            }
            Err(source) => {
                if session.fail_invocation(invocation.phase, invocation.sequence) {
                    tracing::warn!(
                        session_id = %invocation.session_id,
                        phase = %invocation.phase,
                        error = %source,
                        "Gateway call failed"
                    );
                    Err(OrchestratorError::Gateway {
                        phase: invocation.phase,
                        source,
                    })
                } else {
                    Err(WorkflowError::StaleResult {
                        result_phase: invocation.phase,
                        result_sequence: invocation.sequence,
                        current_phase: session.current_phase(),
                    }
                    .into())
                }
            }
        }
    }
}
