// Agent domain module
// Contains the agent entity, its value objects, and the events pushed to observers

#![allow(clippy::module_inception)]

pub mod agent;
pub mod events;
pub mod value_objects;

// Re-export main types for convenience
pub use agent::{Agent, AgentPatch, COORDINATOR_ID};
pub use events::{DomainEvent, Task, PROTOCOL_VERSION};
pub use value_objects::{AgentRole, AgentStatus};
