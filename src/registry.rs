//! Static role, phase and agent tables.
//!
//! Everything here is compile-time data. Lookups are exhaustive matches so a
//! new [`Role`] or [`Phase`] variant cannot be added without an entry.

use serde::Serialize;

use crate::models::{Phase, Role};

/// What a specialist role is responsible for.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoleProfile {
    pub role: Role,
    /// Name the role is addressed by in logs and invocation payloads.
    pub agent_name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub responsibilities: &'static [&'static str],
}

/// The work a phase asks of its role.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseTask {
    pub phase: Phase,
    pub role: Role,
    pub instruction: &'static str,
    /// Name of the document the phase produces.
    pub artifact_key: &'static str,
}

/// A selectable top-level agent exposed by the server.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AgentDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub greeting: &'static str,
}

const ANALYST: RoleProfile = RoleProfile {
    role: Role::Analyst,
    agent_name: "analyst_agent",
    title: "Market & Business Analyst",
    description: "Explores the idea, researches the market and writes the project brief.",
    responsibilities: &[
        "Facilitate brainstorming to explore and refine the idea",
        "Research market opportunities, competitors and technical feasibility",
        "Turn the idea and research into a structured project brief",
    ],
};

const PM: RoleProfile = RoleProfile {
    role: Role::Pm,
    agent_name: "pm_agent",
    title: "Product Manager",
    description: "Defines MVP scope, product requirements and epics.",
    responsibilities: &[
        "Define and validate the MVP scope",
        "Write a product requirements document with acceptance criteria",
        "Structure the work into logical epics",
    ],
};

const ARCHITECT: RoleProfile = RoleProfile {
    role: Role::Architect,
    agent_name: "architect_agent",
    title: "Solution Architect",
    description: "Designs the technical architecture that satisfies the requirements.",
    responsibilities: &[
        "Choose the technology stack and justify each choice",
        "Describe components, interfaces, data model and deployment",
        "Address security, performance and scalability",
    ],
};

const POSM: RoleProfile = RoleProfile {
    role: Role::Posm,
    agent_name: "posm_agent",
    title: "Product Owner / Scrum Master",
    description: "Validates the plan and breaks it down into developer-ready stories.",
    responsibilities: &[
        "Cross-check brief, requirements and architecture for gaps",
        "Give a go/no-go decision with rationale",
        "Write user stories with acceptance criteria and dependencies",
    ],
};

pub fn role_profile(role: Role) -> &'static RoleProfile {
    match role {
        Role::Analyst => &ANALYST,
        Role::Pm => &PM,
        Role::Architect => &ARCHITECT,
        Role::Posm => &POSM,
    }
}

pub fn role_profiles() -> [&'static RoleProfile; 4] {
    [&ANALYST, &PM, &ARCHITECT, &POSM]
}

const BRAINSTORM: PhaseTask = PhaseTask {
    phase: Phase::AnalystBrainstorm,
    role: Role::Analyst,
    instruction: "Generate a brainstorming summary of the user's idea: key insights, \
                  potential directions and recommended next steps.",
    artifact_key: "analyst_brainstorming_summary_md",
};

const RESEARCH: PhaseTask = PhaseTask {
    phase: Phase::AnalystResearch,
    role: Role::Analyst,
    instruction: "Analyze the research findings and summarize the market, competitors, \
                  user needs, opportunities and challenges.",
    artifact_key: "analyst_research_findings_md",
};

const BRIEF: PhaseTask = PhaseTask {
    phase: Phase::AnalystBrief,
    role: Role::Analyst,
    instruction: "Create a project brief: overview, problem statement, target audience, \
                  goals, success criteria, constraints and stakeholders.",
    artifact_key: "project_brief_md",
};

const PRD: PhaseTask = PhaseTask {
    phase: Phase::PmDefine,
    role: Role::Pm,
    instruction: "Write the product requirements document and the epics that structure \
                  the work, each with acceptance criteria and priority.",
    artifact_key: "prd_md",
};

const ARCHITECTURE: PhaseTask = PhaseTask {
    phase: Phase::ArchitectDesign,
    role: Role::Architect,
    instruction: "Write the architecture document: principles, components, data model, \
                  deployment, technology stack and cross-cutting concerns.",
    artifact_key: "architecture_docs_md",
};

const VALIDATION: PhaseTask = PhaseTask {
    phase: Phase::PosmValidate,
    role: Role::Posm,
    instruction: "Validate the brief, requirements and architecture together. List \
                  strengths, concerns and recommendations, then give a go/no-go decision.",
    artifact_key: "posm_po_validation_summary_md",
};

const STORIES: PhaseTask = PhaseTask {
    phase: Phase::PosmStories,
    role: Role::Posm,
    instruction: "Write the user stories for every epic in 'As a... I want... so that...' \
                  form with acceptance criteria, estimates, dependencies and a sprint plan.",
    artifact_key: "all_stories_md",
};

/// The task for a role-bearing phase. `None` for `GetIdea` and `Finished`.
pub fn phase_task(phase: Phase) -> Option<&'static PhaseTask> {
    match phase {
        Phase::GetIdea | Phase::Finished => None,
        Phase::AnalystBrainstorm => Some(&BRAINSTORM),
        Phase::AnalystResearch => Some(&RESEARCH),
        Phase::AnalystBrief => Some(&BRIEF),
        Phase::PmDefine => Some(&PRD),
        Phase::ArchitectDesign => Some(&ARCHITECTURE),
        Phase::PosmValidate => Some(&VALIDATION),
        Phase::PosmStories => Some(&STORIES),
    }
}

/// Key under which the approved output of `phase` is stored.
pub fn artifact_key(phase: Phase) -> &'static str {
    match phase {
        Phase::GetIdea => "user_input_idea",
        Phase::Finished => "finished",
        other => phase_task(other).map_or("unknown", |task| task.artifact_key),
    }
}

pub const DEFAULT_AGENT: &str = "itbp_agent";

const AGENTS: &[AgentDefinition] = &[AgentDefinition {
    name: DEFAULT_AGENT,
    description: "Orchestrates the Idea-to-Blueprint pipeline between the Analyst, PM, \
                  Architect and PO/SM specialists",
    greeting: "Welcome to the Idea-to-Blueprint pipeline.\n\n\
               Share your product idea and each specialist will take a turn: \
               brainstorming, research, project brief, product requirements, \
               architecture, plan validation and user stories. You review every \
               output and either approve it or send it back with feedback.\n\n\
               Outputs are not saved. Copy anything you want to keep.",
}];

pub fn agents() -> &'static [AgentDefinition] {
    AGENTS
}

pub fn find_agent(name: &str) -> Option<&'static AgentDefinition> {
    AGENTS.iter().find(|agent| agent.name == name)
}
