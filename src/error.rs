//! Error taxonomy for the pipeline.
//!
//! - [`WorkflowError::InvalidTransition`] is a state machine fault and aborts the session.
//! - [`GatewayError`] is recoverable; the user retries the phase.
//! - [`ResearchError`](crate::research::ResearchError) never reaches this level:
//!   the research phase degrades instead.
//! - Rejecting a result is ordinary control flow, not an error.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::models::{Phase, SessionStatus};

/// Violations of the phase state machine or the review protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no transition out of phase {from}")]
    InvalidTransition { from: Phase },

    #[error(
        "result for {result_phase} (sequence {result_sequence}) is stale; session is at {current_phase}"
    )]
    StaleResult {
        result_phase: Phase,
        result_sequence: u64,
        current_phase: Phase,
    },

    #[error("no result is pending for phase {phase}")]
    NoPendingResult { phase: Phase },

    #[error("invocation {sequence} for phase {phase} is still running")]
    InvocationInFlight { phase: Phase, sequence: u64 },

    #[error("nothing is running for phase {phase}")]
    NothingInFlight { phase: Phase },

    #[error("phase {phase} needs user input")]
    MissingInput { phase: Phase },

    #[error("the idea is fixed once confirmed (session is at {phase})")]
    IdeaLocked { phase: Phase },

    #[error("session is {}", .status.as_str())]
    SessionClosed { status: SessionStatus },
}

impl WorkflowError {
    /// True for faults in the state machine itself, as opposed to requests
    /// that arrived at the wrong time.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StaleResult { .. } => "stale_result",
            Self::NoPendingResult { .. } => "no_pending_result",
            Self::InvocationInFlight { .. } => "invocation_in_flight",
            Self::NothingInFlight { .. } => "nothing_in_flight",
            Self::MissingInput { .. } => "missing_input",
            Self::IdeaLocked { .. } => "idea_locked",
            Self::SessionClosed { .. } => "session_closed",
        }
    }
}

/// Anything `run_phase` or `submit_feedback` can fail with.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("phase {phase} failed: {source}")]
    Gateway {
        phase: Phase,
        #[source]
        source: GatewayError,
    },

    /// The feedback was recorded but regenerating the phase failed. Sending
    /// the same decision again cannot succeed; the phase has to be run again.
    #[error("replay of phase {phase} failed: {source}")]
    Replay {
        phase: Phase,
        #[source]
        source: GatewayError,
    },
}

impl OrchestratorError {
    /// Whether re-submitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Workflow(_) | Self::Replay { .. } => false,
            Self::Gateway { .. } => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.kind(),
            Self::Gateway { source, .. } => source.kind(),
            Self::Replay { .. } => "replay_failed",
        }
    }

    /// Message suitable for showing to the user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Workflow(e) => e.to_string(),
            Self::Gateway { phase, source } => format!(
                "{} The {} phase was not changed; submit it again to retry.",
                source.user_message(),
                phase.display_name()
            ),
            Self::Replay { phase, source } => format!(
                "{} Your feedback on the {} phase was recorded; run the phase again to regenerate it.",
                source.user_message(),
                phase.display_name()
            ),
        }
    }
}
