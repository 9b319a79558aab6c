use serde::{Deserialize, Serialize};

/// The specialist persona responsible for a phase.
///
/// - `Analyst`: brainstorming, market research, project brief
/// - `Pm`: product requirements and epics
/// - `Architect`: technical architecture
/// - `Posm`: product owner / scrum master validation and user stories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Analyst,
    Pm,
    Architect,
    Posm,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Analyst, Role::Pm, Role::Architect, Role::Posm]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyst => "ANALYST",
            Self::Pm => "PM",
            Self::Architect => "ARCHITECT",
            Self::Posm => "POSM",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
