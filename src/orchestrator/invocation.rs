use uuid::Uuid;

use crate::gateway::ContextBlock;
use crate::models::{Phase, Role, Session};
use crate::registry;

/// Everything needed to run one phase turn, detached from the session.
///
/// Built while the session is borrowed, executed without it, then applied
/// back under the `(phase, sequence)` guard.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub session_id: Uuid,
    pub phase: Phase,
    pub role: Option<Role>,
    pub sequence: u64,
    /// Role instructions. Empty for the idea step.
    pub prompt: String,
    pub context: Vec<ContextBlock>,
    /// Set when the phase consults the research tool.
    pub research_query: Option<String>,
    /// The idea as it stood when the invocation was built.
    pub idea: Option<String>,
}

impl Invocation {
    pub(crate) fn build(session: &Session, sequence: u64, input: Option<&str>) -> Self {
        let phase = session.current_phase();
        let role = phase.required_role();
        let idea = session.idea().map(str::to_string);

        let prompt = match (role, registry::phase_task(phase)) {
            (Some(role), Some(task)) => role_prompt(role, phase, task),
            _ => String::new(),
        };

        let context = if role.is_some() {
            build_context(session, phase, input)
        } else {
            Vec::new()
        };

        let research_query = if phase.uses_research() {
            idea.clone()
        } else {
            None
        };

        Self {
            session_id: session.id(),
            phase,
            role,
            sequence,
            prompt,
            context,
            research_query,
            idea,
        }
    }
}

fn role_prompt(role: Role, phase: Phase, task: &registry::PhaseTask) -> String {
    let profile = registry::role_profile(role);
    let responsibilities = profile
        .responsibilities
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the {title} ({agent}) in the Idea-to-Blueprint pipeline.\n\
         {description}\n\n\
         Responsibilities:\n{responsibilities}\n\n\
         Current phase: {phase} ({display})\n\
         Task: {instruction}\n\n\
         Respond with the complete `{key}` document in markdown.",
        title = profile.title,
        agent = profile.agent_name,
        description = profile.description,
        display = phase.display_name(),
        instruction = task.instruction,
        key = task.artifact_key,
    )
}

fn build_context(session: &Session, phase: Phase, input: Option<&str>) -> Vec<ContextBlock> {
    let mut blocks = Vec::new();

    if let Some(idea) = session.idea() {
        blocks.push(ContextBlock::new("Product idea", idea));
    }

    for artifact in session.artifacts() {
        if artifact.phase == Phase::GetIdea {
            continue;
        }
        blocks.push(ContextBlock::new(
            format!("{} ({})", artifact.phase.display_name(), artifact.key),
            artifact.content.as_str(),
        ));
    }

    if let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) {
        blocks.push(ContextBlock::new("User input", input));
    }

    let feedback: Vec<String> = session
        .feedback_for(phase)
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text))
        .collect();
    if !feedback.is_empty() {
        blocks.push(ContextBlock::new(
            "Feedback on previous drafts (address all of it)",
            feedback.join("\n"),
        ));
    }

    blocks
}
