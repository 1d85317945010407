use super::value_objects::{AgentRole, AgentStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Id of the single coordinating agent
pub const COORDINATOR_ID: &str = "main";

/// Display palette, assigned round-robin by creation order
const AGENT_COLORS: [&str; 12] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9", "#F8B500", "#00CED1",
];

/// An inferred actor in the office: the coordinator or a per-tool worker
///
/// # Invariants
/// - `id`, `role`, `skills` and `created_at` never change after creation
/// - `current_task` is only present while the agent is thinking or working
/// - `completed_tasks` never decreases
///
/// # Example
/// ```
/// use office_bridge::domain::agent::{Agent, AgentPatch, AgentRole, AgentStatus};
///
/// let mut agent = Agent::new("main", AgentRole::Manager, vec![], 0);
/// agent.apply(AgentPatch::status(AgentStatus::Working).with_task("Reading"));
///
/// assert_eq!(agent.current_task(), Some("Reading"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    id: String,
    role: AgentRole,
    color: String,
    status: AgentStatus,
    current_task: Option<String>,
    skills: Vec<String>,
    completed_tasks: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl Agent {
    /// Creates an idle agent
    ///
    /// # Arguments
    /// * `id` - Registry key, unique for the session
    /// * `role` - Role derived from the triggering tool
    /// * `skills` - Skill tags derived from the triggering tool
    /// * `ordinal` - Creation order, used to pick a display color
    pub fn new(id: impl Into<String>, role: AgentRole, skills: Vec<String>, ordinal: usize) -> Self {
        Self {
            id: id.into(),
            role,
            color: AGENT_COLORS[ordinal % AGENT_COLORS.len()].to_string(),
            status: AgentStatus::Idle,
            current_task: None,
            skills,
            completed_tasks: 0,
            created_at: Utc::now(),
        }
    }

    /// Merges a partial update into this agent
    ///
    /// Settling into `Idle` or `Completed` always drops the current task,
    /// whatever the patch says about it.
    pub fn apply(&mut self, patch: AgentPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(task) = patch.current_task {
            self.current_task = task;
        }
        if !self.status.carries_task() {
            self.current_task = None;
        }
        self.completed_tasks = self.completed_tasks.saturating_add(patch.completed_delta);
    }

    // ===== Getters =====

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn completed_tasks(&self) -> u32 {
        self.completed_tasks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Partial update for an [`Agent`]
///
/// Only the mutable fields can be patched. The counter is expressed as a
/// delta so it can only grow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPatch {
    pub status: Option<AgentStatus>,
    pub current_task: Option<Option<String>>,
    pub completed_delta: u32,
}

impl AgentPatch {
    /// Patch that sets the status
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Sets the current task description
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.current_task = Some(Some(task.into()));
        self
    }

    /// Clears the current task description
    pub fn clear_task(mut self) -> Self {
        self.current_task = Some(None);
        self
    }

    /// Counts one more completed task
    pub fn complete_one(mut self) -> Self {
        self.completed_delta += 1;
        self
    }
}
