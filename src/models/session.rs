use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::feedback::{Artifact, FeedbackEntry, FeedbackKind};
use super::phase::Phase;
use super::result::{ApprovalStatus, PhaseResult};
use crate::error::WorkflowError;
use crate::registry;

/// One user's walk through the pipeline.
///
/// Sessions are **ephemeral**: they live in memory only and are lost when the
/// process exits. Every mutation goes through the methods below so the phase
/// invariants hold:
///
/// - the phase only moves forward, and only on an approved result for the
///   exact phase and sequence that is pending;
/// - at most one invocation is in flight at a time;
/// - `Finished` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    /// Name of the agent definition this session runs under.
    agent: String,
    phase: Phase,
    status: SessionStatus,
    idea: Option<String>,
    /// Number of invocations issued so far. Also the sequence of the last one.
    sequence: u64,
    /// Sequence of the invocation currently awaiting the gateway.
    in_flight: Option<u64>,
    pending: Option<PhaseResult>,
    /// Results the user has ruled on, oldest first.
    decided: Vec<PhaseResult>,
    artifacts: Vec<Artifact>,
    feedback_log: Vec<FeedbackEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Lifecycle status of a session.
///
/// - `Active`: phases remain
/// - `Finished`: every phase approved
/// - `Aborted`: an invalid transition was attempted; the session is unusable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Finished,
    Aborted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
            Self::Aborted => "ABORTED",
        }
    }
}

impl Session {
    pub fn new(agent: impl Into<String>, idea: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent: agent.into(),
            phase: Phase::GetIdea,
            status: SessionStatus::Active,
            idea: idea.filter(|s| !s.trim().is_empty()),
            sequence: 0,
            in_flight: None,
            pending: None,
            decided: Vec::new(),
            artifacts: Vec::new(),
            feedback_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn idea(&self) -> Option<&str> {
        self.idea.as_deref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn pending(&self) -> Option<&PhaseResult> {
        self.pending.as_ref()
    }

    pub fn decided(&self) -> &[PhaseResult] {
        &self.decided
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn artifact(&self, phase: Phase) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.phase == phase)
    }

    pub fn feedback_log(&self) -> &[FeedbackEntry] {
        &self.feedback_log
    }

    /// Feedback the user gave on rejected results for `phase`, oldest first.
    pub fn feedback_for(&self, phase: Phase) -> impl Iterator<Item = &str> {
        self.feedback_log.iter().filter_map(move |entry| match &entry.kind {
            FeedbackKind::Rejected { feedback } if entry.phase == phase => Some(feedback.as_str()),
            _ => None,
        })
    }

    /// Replace the idea. Only allowed while the idea has not been confirmed.
    pub fn set_idea(&mut self, idea: impl Into<String>) -> Result<(), WorkflowError> {
        if self.phase != Phase::GetIdea {
            return Err(WorkflowError::IdeaLocked { phase: self.phase });
        }
        let idea = idea.into();
        if idea.trim().is_empty() {
            return Err(WorkflowError::MissingInput { phase: self.phase });
        }
        self.idea = Some(idea);
        self.touch();
        Ok(())
    }

    /// Reserve the next invocation sequence for the current phase.
    pub fn begin_invocation(&mut self) -> Result<u64, WorkflowError> {
        self.ensure_active()?;
        if let Some(sequence) = self.in_flight {
            return Err(WorkflowError::InvocationInFlight {
                phase: self.phase,
                sequence,
            });
        }
        if self.phase == Phase::GetIdea && self.idea.is_none() {
            return Err(WorkflowError::MissingInput { phase: self.phase });
        }

        self.sequence += 1;
        self.in_flight = Some(self.sequence);
        self.touch();
        Ok(self.sequence)
    }

    /// Store the output of an invocation as the pending result.
    ///
    /// Rejected as stale when the session has moved on, or when the
    /// invocation was cancelled or superseded.
    pub fn accept_output(&mut self, result: PhaseResult) -> Result<PhaseResult, WorkflowError> {
        if result.phase != self.phase || self.in_flight != Some(result.sequence) {
            return Err(self.stale(result.phase, result.sequence));
        }

        self.in_flight = None;
        self.push_log(result.phase, result.sequence, FeedbackKind::Generated);
        for warning in &result.warnings {
            self.push_log(
                result.phase,
                result.sequence,
                FeedbackKind::ResearchDegraded {
                    reason: warning.clone(),
                },
            );
        }
        self.pending = Some(result.clone());
        self.touch();
        Ok(result)
    }

    /// Release the in-flight marker after a failed invocation.
    ///
    /// Returns `false` when the failure belongs to an invocation the session
    /// no longer waits on.
    pub fn fail_invocation(&mut self, phase: Phase, sequence: u64) -> bool {
        if self.phase == phase && self.in_flight == Some(sequence) {
            self.in_flight = None;
            self.touch();
            true
        } else {
            false
        }
    }

    /// Abandon the in-flight invocation. Its result will be discarded.
    pub fn cancel(&mut self) -> Result<u64, WorkflowError> {
        let sequence = self
            .in_flight
            .take()
            .ok_or(WorkflowError::NothingInFlight { phase: self.phase })?;
        self.push_log(self.phase, sequence, FeedbackKind::Cancelled);
        self.touch();
        Ok(sequence)
    }

    /// Approve the pending result for `(phase, sequence)` and advance.
    pub fn approve(&mut self, phase: Phase, sequence: u64) -> Result<Phase, WorkflowError> {
        let mut approved = self.take_pending(phase, sequence)?;
        let next = self.phase.next()?;

        approved.status = ApprovalStatus::Approved;
        if self.phase == Phase::GetIdea {
            self.idea = Some(approved.content.clone());
        }
        self.push_log(approved.phase, approved.sequence, FeedbackKind::Approved);
        self.artifacts.push(Artifact {
            phase: approved.phase,
            role: approved.role,
            key: registry::artifact_key(approved.phase).to_string(),
            content: approved.content.clone(),
            approved_at: Utc::now(),
        });
        self.decided.push(approved);

        self.phase = next;
        if next.is_terminal() {
            self.status = SessionStatus::Finished;
        }
        self.touch();
        Ok(next)
    }

    /// Reject the pending result for `(phase, sequence)`. The phase stays put.
    ///
    /// Blank feedback is refused before anything changes.
    pub fn reject(
        &mut self,
        phase: Phase,
        sequence: u64,
        feedback: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let feedback = feedback.into();
        self.pending_for(phase, sequence)?;
        if feedback.trim().is_empty() {
            return Err(WorkflowError::MissingInput { phase: self.phase });
        }
        let mut rejected = self.take_pending(phase, sequence)?;
        rejected.status = ApprovalStatus::RejectedWithFeedback;
        self.push_log(
            rejected.phase,
            rejected.sequence,
            FeedbackKind::Rejected { feedback },
        );
        self.decided.push(rejected);
        self.touch();
        Ok(())
    }

    /// The pending result a decision on `(phase, sequence)` would apply to.
    ///
    /// Any decision at `Finished` is an invalid transition. A result for any
    /// phase other than the current one, or superseded by a newer invocation,
    /// is stale.
    pub fn pending_for(&self, phase: Phase, sequence: u64) -> Result<&PhaseResult, WorkflowError> {
        if self.phase.is_terminal() {
            return Err(WorkflowError::InvalidTransition { from: self.phase });
        }
        self.ensure_active()?;
        if phase != self.phase {
            return Err(self.stale(phase, sequence));
        }
        if let Some(in_flight) = self.in_flight {
            return Err(WorkflowError::InvocationInFlight {
                phase: self.phase,
                sequence: in_flight,
            });
        }
        match &self.pending {
            Some(pending) if pending.sequence == sequence => Ok(pending),
            Some(_) => Err(self.stale(phase, sequence)),
            None => Err(WorkflowError::NoPendingResult { phase: self.phase }),
        }
    }

    /// Mark the session unusable after a state machine fault.
    pub fn abort(&mut self) {
        self.status = SessionStatus::Aborted;
        self.in_flight = None;
        self.pending = None;
        self.touch();
    }

    fn ensure_active(&self) -> Result<(), WorkflowError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            status => Err(WorkflowError::SessionClosed { status }),
        }
    }

    fn take_pending(&mut self, phase: Phase, sequence: u64) -> Result<PhaseResult, WorkflowError> {
        self.pending_for(phase, sequence)?;
        self.pending
            .take()
            .ok_or(WorkflowError::NoPendingResult { phase: self.phase })
    }

    fn stale(&self, phase: Phase, sequence: u64) -> WorkflowError {
        WorkflowError::StaleResult {
            result_phase: phase,
            result_sequence: sequence,
            current_phase: self.phase,
        }
    }

    fn push_log(&mut self, phase: Phase, sequence: u64, kind: FeedbackKind) {
        self.feedback_log
            .push(FeedbackEntry::new(phase, sequence, kind));
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
