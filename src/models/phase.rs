use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::WorkflowError;

/// One step of the idea-to-blueprint pipeline.
///
/// Phases form a single linear pipeline with a fixed total order. There are
/// no branches: every phase except [`Phase::Finished`] has exactly one
/// successor, and `Finished` has none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    GetIdea,
    AnalystBrainstorm,
    AnalystResearch,
    AnalystBrief,
    PmDefine,
    ArchitectDesign,
    PosmValidate,
    PosmStories,
    Finished,
}

const ORDER: [Phase; 9] = [
    Phase::GetIdea,
    Phase::AnalystBrainstorm,
    Phase::AnalystResearch,
    Phase::AnalystBrief,
    Phase::PmDefine,
    Phase::ArchitectDesign,
    Phase::PosmValidate,
    Phase::PosmStories,
    Phase::Finished,
];

impl Phase {
    /// All phases in pipeline order.
    pub fn all() -> &'static [Phase] {
        &ORDER
    }

    /// Position of this phase in the pipeline (0-based).
    pub fn index(&self) -> usize {
        match self {
            Self::GetIdea => 0,
            Self::AnalystBrainstorm => 1,
            Self::AnalystResearch => 2,
            Self::AnalystBrief => 3,
            Self::PmDefine => 4,
            Self::ArchitectDesign => 5,
            Self::PosmValidate => 6,
            Self::PosmStories => 7,
            Self::Finished => 8,
        }
    }

    /// The phase that follows this one.
    ///
    /// Fails with [`WorkflowError::InvalidTransition`] for `Finished`.
    pub fn next(&self) -> Result<Phase, WorkflowError> {
        ORDER
            .get(self.index() + 1)
            .copied()
            .ok_or(WorkflowError::InvalidTransition { from: *self })
    }

    /// The specialist role that owns this phase, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::GetIdea | Self::Finished => None,
            Self::AnalystBrainstorm | Self::AnalystResearch | Self::AnalystBrief => {
                Some(Role::Analyst)
            }
            Self::PmDefine => Some(Role::Pm),
            Self::ArchitectDesign => Some(Role::Architect),
            Self::PosmValidate | Self::PosmStories => Some(Role::Posm),
        }
    }

    /// Whether this phase consults the external research tool.
    pub fn uses_research(&self) -> bool {
        matches!(self, Self::AnalystResearch)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetIdea => "GET_IDEA",
            Self::AnalystBrainstorm => "ANALYST_BRAINSTORM",
            Self::AnalystResearch => "ANALYST_RESEARCH",
            Self::AnalystBrief => "ANALYST_BRIEF",
            Self::PmDefine => "PM_DEFINE",
            Self::ArchitectDesign => "ARCHITECT_DESIGN",
            Self::PosmValidate => "POSM_VALIDATE",
            Self::PosmStories => "POSM_STORIES",
            Self::Finished => "FINISHED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        ORDER.iter().copied().find(|p| p.as_str() == s)
    }

    /// Short human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GetIdea => "Idea",
            Self::AnalystBrainstorm => "Brainstorming",
            Self::AnalystResearch => "Research",
            Self::AnalystBrief => "Project Brief",
            Self::PmDefine => "Product Requirements",
            Self::ArchitectDesign => "Architecture",
            Self::PosmValidate => "Plan Validation",
            Self::PosmStories => "User Stories",
            Self::Finished => "Finished",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
