use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::Phase;
use super::role::Role;

/// Output produced for a phase, waiting on the user's decision.
///
/// A result is tied to the exact `(phase, sequence)` of the invocation that
/// produced it. The session refuses to apply a decision on a result whose
/// phase or sequence no longer matches its own state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseResult {
    pub id: Uuid,
    pub phase: Phase,
    /// `None` only for the idea-confirmation step.
    pub role: Option<Role>,
    /// Sequence number of the invocation that produced this result.
    pub sequence: u64,
    pub content: String,
    pub status: ApprovalStatus,
    /// Set when the phase completed without one of its optional inputs
    /// (research findings). The content is still usable.
    pub degraded: bool,
    /// User-visible notes explaining a degraded result.
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PhaseResult {
    pub fn pending(
        phase: Phase,
        role: Option<Role>,
        sequence: u64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            role,
            sequence,
            content: content.into(),
            status: ApprovalStatus::Pending,
            degraded: false,
            warnings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Mark the result as produced in degraded mode.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.degraded = true;
        self.warnings.push(warning.into());
        self
    }
}

/// Approval status of a [`PhaseResult`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    RejectedWithFeedback,
}

/// The user's verdict on a pending result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject { feedback: String },
}

impl Decision {
    pub fn reject(feedback: impl Into<String>) -> Self {
        Self::Reject {
            feedback: feedback.into(),
        }
    }
}
