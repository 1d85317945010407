use serde::Serialize;

/// Coarse role an agent plays in the office, fixed at creation
///
/// The coordinator is always `Manager`; transient workers take the role
/// their triggering tool maps to (see [`crate::domain::tools`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Manager,
    Researcher,
    Developer,
    Writer,
    Editor,
    Finder,
    Searcher,
    Organizer,
    Planner,
    Worker,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Manager => write!(f, "manager"),
            AgentRole::Researcher => write!(f, "researcher"),
            AgentRole::Developer => write!(f, "developer"),
            AgentRole::Writer => write!(f, "writer"),
            AgentRole::Editor => write!(f, "editor"),
            AgentRole::Finder => write!(f, "finder"),
            AgentRole::Searcher => write!(f, "searcher"),
            AgentRole::Organizer => write!(f, "organizer"),
            AgentRole::Planner => write!(f, "planner"),
            AgentRole::Worker => write!(f, "worker"),
        }
    }
}

/// Activity status of an agent
///
/// # Status Cycle
/// ```text
/// Idle -> Thinking -> Working -> Completed -> Idle
/// ```
/// Transitions are driven by upstream events and are not enforced; an agent
/// may cycle through these in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Working,
    Completed,
}

impl AgentStatus {
    /// Whether an agent in this status may carry a current task description
    ///
    /// # Example
    /// ```
    /// use office_bridge::domain::agent::AgentStatus;
    ///
    /// assert!(AgentStatus::Working.carries_task());
    /// assert!(!AgentStatus::Idle.carries_task());
    /// ```
    pub fn carries_task(&self) -> bool {
        matches!(self, AgentStatus::Thinking | AgentStatus::Working)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Thinking => write!(f, "thinking"),
            AgentStatus::Working => write!(f, "working"),
            AgentStatus::Completed => write!(f, "completed"),
        }
    }
}
