use indexmap::IndexMap;

use crate::domain::agent::{Agent, AgentPatch, AgentRole, AgentStatus, DomainEvent};

/// In-memory registry of every agent seen this session
///
/// Single source of truth for agent state. Mutations return the event that
/// describes them; the caller decides when to broadcast it. Entries are never
/// evicted, so the registry grows by one entry per tool invocation.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: IndexMap<String, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the agent registered under `id`, creating it first if needed
    ///
    /// Creation yields an `agent_joined` event. Asking again for an existing
    /// id returns the existing agent untouched and yields no event; `role`
    /// and `skills` are then ignored.
    pub fn get_or_create(
        &mut self,
        id: &str,
        role: AgentRole,
        skills: Vec<String>,
    ) -> (&Agent, Option<DomainEvent>) {
        let ordinal = self.agents.len();
        let mut joined = None;
        let agent = self.agents.entry(id.to_string()).or_insert_with(|| {
            let agent = Agent::new(id, role, skills, ordinal);
            joined = Some(DomainEvent::AgentJoined {
                agent: agent.clone(),
            });
            agent
        });
        (&*agent, joined)
    }

    /// Merges `patch` into the agent registered under `id`
    ///
    /// Returns the `agent_updated` event, or `None` when the id is unknown,
    /// which is not an error: the triggering event is presumed stale.
    pub fn update(&mut self, id: &str, patch: AgentPatch) -> Option<DomainEvent> {
        let agent = self.agents.get_mut(id)?;
        agent.apply(patch);
        Some(DomainEvent::AgentUpdated {
            agent: agent.clone(),
        })
    }

    /// Every agent, in creation order
    pub fn snapshot(&self) -> Vec<Agent> {
        self.agents.values().cloned().collect()
    }

    /// Ids of agents currently in `status`, in creation order
    pub fn ids_with_status(&self, status: AgentStatus) -> Vec<String> {
        self.agents
            .values()
            .filter(|agent| agent.status() == status)
            .map(|agent| agent.id().to_string())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::COORDINATOR_ID;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = AgentRegistry::new();

        let (_, first) = registry.get_or_create(COORDINATOR_ID, AgentRole::Manager, vec![]);
        let (agent, second) = registry.get_or_create(COORDINATOR_ID, AgentRole::Worker, vec![]);

        assert_eq!(agent.role(), AgentRole::Manager);
        assert!(matches!(first, Some(DomainEvent::AgentJoined { .. })));
        assert!(second.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_or_create_keeps_existing_state() {
        let mut registry = AgentRegistry::new();
        registry.get_or_create("tool-Read-1", AgentRole::Researcher, vec![]);
        registry.update(
            "tool-Read-1",
            AgentPatch::status(AgentStatus::Working).with_task("Using Read"),
        );

        let (agent, _) = registry.get_or_create("tool-Read-1", AgentRole::Researcher, vec![]);

        assert_eq!(agent.status(), AgentStatus::Working);
        assert_eq!(agent.current_task(), Some("Using Read"));
    }

    #[test]
    fn update_of_unknown_agent_is_a_no_op() {
        let mut registry = AgentRegistry::new();

        let event = registry.update("ghost", AgentPatch::status(AgentStatus::Idle));

        assert!(event.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn update_reports_merged_agent() {
        let mut registry = AgentRegistry::new();
        registry.get_or_create(COORDINATOR_ID, AgentRole::Manager, vec![]);

        let event = registry.update(
            COORDINATOR_ID,
            AgentPatch::status(AgentStatus::Thinking).with_task("Analyzing task..."),
        );

        match event {
            Some(DomainEvent::AgentUpdated { agent }) => {
                assert_eq!(agent.status(), AgentStatus::Thinking);
                assert_eq!(agent.current_task(), Some("Analyzing task..."));
            }
            other => panic!("Expected AgentUpdated, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_preserves_creation_order() {
        let mut registry = AgentRegistry::new();
        for id in ["main", "tool-Read-1", "tool-Edit-2"] {
            registry.get_or_create(id, AgentRole::Worker, vec![]);
        }

        let ids: Vec<String> = registry
            .snapshot()
            .iter()
            .map(|agent| agent.id().to_string())
            .collect();

        assert_eq!(ids, ["main", "tool-Read-1", "tool-Edit-2"]);
    }

    #[test]
    fn ids_with_status_filters() {
        let mut registry = AgentRegistry::new();
        registry.get_or_create("a", AgentRole::Worker, vec![]);
        registry.get_or_create("b", AgentRole::Worker, vec![]);
        registry.update("b", AgentPatch::status(AgentStatus::Working));

        assert_eq!(registry.ids_with_status(AgentStatus::Working), ["b"]);
        assert_eq!(registry.ids_with_status(AgentStatus::Idle), ["a"]);
    }
}
