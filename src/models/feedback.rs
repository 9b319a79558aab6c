use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::role::Role;

/// One entry in a session's feedback log.
///
/// The log is append-only and records every turn of the review loop:
/// generated outputs, approvals, rejections with the user's feedback,
/// research degradations and cancelled invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub phase: Phase,
    pub sequence: u64,
    #[serde(flatten)]
    pub kind: FeedbackKind,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn new(phase: Phase, sequence: u64, kind: FeedbackKind) -> Self {
        Self {
            phase,
            sequence,
            kind,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackKind {
    Generated,
    Approved,
    Rejected { feedback: String },
    ResearchDegraded { reason: String },
    Cancelled,
}

/// An approved phase output, kept in memory for later phases and copy-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub phase: Phase,
    pub role: Option<Role>,
    /// Stable name of the document, e.g. `project_brief_md`.
    pub key: String,
    pub content: String,
    pub approved_at: DateTime<Utc>,
}
