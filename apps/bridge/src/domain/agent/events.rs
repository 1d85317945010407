use super::agent::Agent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Version tag stamped on every message pushed to observers
pub const PROTOCOL_VERSION: u32 = 1;

/// Normalized events pushed to observers
///
/// Each event is self-contained. Ordering only matters between events that
/// concern the same agent.
///
/// # Example
/// ```
/// use office_bridge::domain::agent::DomainEvent;
///
/// let wire = DomainEvent::StreamEnded.to_wire().expect("serializable");
/// assert!(wire.contains(r#""type":"stream_ended""#));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An agent entered the registry
    AgentJoined { agent: Agent },
    /// An agent's mutable state changed
    AgentUpdated { agent: Agent },
    /// A tool invocation was assigned to a transient agent
    #[serde(rename_all = "camelCase")]
    WorkStarted {
        agent_id: String,
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
    },
    /// An agent finished its work
    #[serde(rename_all = "camelCase")]
    WorkCompleted { agent_id: String },
    /// The user handed the team a new task
    NewTask { task: Task },
    /// One agent talked to another
    Communication {
        from: String,
        to: String,
        message: String,
    },
    /// The upstream input stream closed
    StreamEnded,
    /// Snapshot sent only to a newly connected observer
    Init { agents: Vec<Agent> },
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    #[serde(flatten)]
    event: &'a DomainEvent,
}

impl DomainEvent {
    /// Serializes the event into the text frame sent to observers
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope {
            version: PROTOCOL_VERSION,
            event: self,
        })
    }
}

/// A task announced by the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Task {
    /// Creates a task with a fresh id
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: format!("task-{}", Uuid::new_v4()),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}
