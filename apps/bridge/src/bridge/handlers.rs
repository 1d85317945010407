// Handlers for classified upstream records
//
// Every handler mutates the registry and broadcasts the resulting events in
// the order they are produced. None of them can fail.

use serde_json::Value;

use super::classifier::{self, Message, ResultRecord, UpstreamRecord};
use super::registry::AgentRegistry;
use super::scheduler::TimerAction;
use super::Bridge;
use crate::domain::agent::{
    AgentPatch, AgentRole, AgentStatus, DomainEvent, Task, COORDINATOR_ID,
};
use crate::domain::tools::ToolProfile;

/// Task shown on the coordinator while the model is responding
pub const THINKING_TASK: &str = "Analyzing task...";

/// Id prefix of workers spawned by real tool invocations
pub const TOOL_ID_PREFIX: &str = "tool";

/// Decides which agents a `result` record finishes
///
/// Upstream results do not say which tool call they answer. Implementations
/// encode a guess from the registry and the record's `subtype` and `is_error`;
/// a protocol with explicit correlation ids can plug in here without touching
/// the registry or the broadcast path.
pub trait ResultCorrelator: Send {
    fn completed_by(&self, registry: &AgentRegistry, record: &ResultRecord) -> Vec<String>;
}

/// Treats every agent still working as finished by the result
///
/// This is an approximation: concurrent tool calls cannot be told apart, so a
/// single result completes all of them at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllWorking;

impl ResultCorrelator for AllWorking {
    fn completed_by(&self, registry: &AgentRegistry, _record: &ResultRecord) -> Vec<String> {
        registry.ids_with_status(AgentStatus::Working)
    }
}

/// Hands out transient agent ids
///
/// The sequence number keeps ids distinct even when the same tool is invoked
/// twice within one millisecond.
#[derive(Debug, Default)]
pub struct SpawnIds {
    seq: u64,
}

impl SpawnIds {
    pub fn next(&mut self, prefix: &str, tool: &str) -> String {
        self.seq += 1;
        format!(
            "{prefix}-{tool}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            self.seq
        )
    }
}

impl Bridge {
    /// Routes one decoded record to its handler
    pub(super) fn dispatch(&mut self, record: UpstreamRecord) {
        if record.is_init() {
            self.ensure_coordinator();
            return;
        }
        match record {
            UpstreamRecord::Assistant { message } => self.on_assistant(message),
            UpstreamRecord::User { message } => self.on_user(message.as_ref()),
            UpstreamRecord::Result(result) => self.handle_tool_result(&result),
            UpstreamRecord::System { .. } | UpstreamRecord::Other => {}
        }
    }

    fn ensure_coordinator(&mut self) {
        let (_, joined) = self
            .registry
            .get_or_create(COORDINATOR_ID, AgentRole::Manager, Vec::new());
        self.emit_opt(joined);
    }

    fn on_assistant(&mut self, message: Option<Message>) {
        self.ensure_coordinator();
        let thinking = self.registry.update(
            COORDINATOR_ID,
            AgentPatch::status(AgentStatus::Thinking).with_task(THINKING_TASK),
        );
        self.emit_opt(thinking);

        let Some(message) = message else {
            return;
        };
        for tool_use in message.tool_uses() {
            self.handle_tool_use(&tool_use.name, tool_use.input, None, TOOL_ID_PREFIX);
        }
    }

    fn on_user(&mut self, message: Option<&Message>) {
        let Some(description) = classifier::task_description(message) else {
            tracing::trace!("user record without task text");
            return;
        };
        let task = Task::new(description);
        tracing::info!(task_id = %task.id, "new task from user");
        self.emit(DomainEvent::NewTask { task });
    }

    /// Spawns a working agent for one tool invocation; returns its id
    ///
    /// Broadcasts `work_started`, then `agent_joined`, then `agent_updated`.
    pub(super) fn handle_tool_use(
        &mut self,
        tool: &str,
        input: Option<Value>,
        task: Option<String>,
        prefix: &str,
    ) -> String {
        let agent_id = self.spawn_ids.next(prefix, tool);
        let profile = ToolProfile::for_tool(tool);

        self.emit(DomainEvent::WorkStarted {
            agent_id: agent_id.clone(),
            tool: tool.to_string(),
            input,
        });
        let (_, joined) = self
            .registry
            .get_or_create(&agent_id, profile.role, profile.skill_tags());
        self.emit_opt(joined);

        let task = task.unwrap_or_else(|| format!("Using {tool}"));
        let working = self.registry.update(
            &agent_id,
            AgentPatch::status(AgentStatus::Working).with_task(task),
        );
        self.emit_opt(working);

        tracing::info!(agent_id = %agent_id, tool, role = %profile.role, "tool invoked");
        agent_id
    }

    /// Completes whatever the correlator says the result finishes
    pub(super) fn handle_tool_result(&mut self, record: &ResultRecord) {
        let finished = self.correlator.completed_by(&self.registry, record);
        tracing::debug!(
            subtype = record.subtype.as_deref().unwrap_or("none"),
            is_error = record.is_error.unwrap_or(false),
            finished = finished.len(),
            "tool result"
        );
        if finished.is_empty() {
            return;
        }
        for agent_id in finished {
            self.complete_agent(&agent_id);
        }
    }

    /// Marks one agent completed and schedules its return to idle
    ///
    /// Returns `false` if the agent is unknown.
    pub(super) fn complete_agent(&mut self, agent_id: &str) -> bool {
        let patch = AgentPatch::status(AgentStatus::Completed)
            .clear_task()
            .complete_one();
        let Some(updated) = self.registry.update(agent_id, patch) else {
            return false;
        };
        self.emit(updated);
        self.emit(DomainEvent::WorkCompleted {
            agent_id: agent_id.to_string(),
        });
        self.scheduler.schedule(
            self.timings.idle_revert,
            TimerAction::RevertToIdle {
                agent_id: agent_id.to_string(),
            },
        );
        true
    }

    /// Puts a completed agent back to idle, if it still exists
    pub(super) fn revert_to_idle(&mut self, agent_id: &str) {
        let idle = self
            .registry
            .update(agent_id, AgentPatch::status(AgentStatus::Idle));
        self.emit_opt(idle);
    }
}
