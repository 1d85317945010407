// Demo generator
//
// Synthetic activity for when nothing is piped in. It drives the same tool-use
// and completion paths as real input, so observers cannot tell the difference
// beyond the `demo-` id prefix.

use super::scheduler::TimerAction;
use super::Bridge;
use crate::domain::agent::{AgentRole, COORDINATOR_ID};

/// Id prefix of demo workers
pub const DEMO_ID_PREFIX: &str = "demo";

/// Reply a demo worker sends when it is done
pub const DEMO_REPLY: &str = "Done!";

/// One entry of the demo script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoTask {
    pub tool: &'static str,
    pub description: &'static str,
}

/// Cyclic demo script
pub const DEMO_TASKS: [DemoTask; 5] = [
    DemoTask {
        tool: "Read",
        description: "Reading project files...",
    },
    DemoTask {
        tool: "bash",
        description: "Running tests...",
    },
    DemoTask {
        tool: "Write",
        description: "Writing new code...",
    },
    DemoTask {
        tool: "Edit",
        description: "Fixing bugs...",
    },
    DemoTask {
        tool: "WebSearch",
        description: "Researching solutions...",
    },
];

impl DemoTask {
    /// What the coordinator says when handing this task over
    pub fn delegation_message(&self) -> String {
        format!("Could you take care of this: {}", self.description.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoState {
    Dormant,
    Running,
}

/// Two-state demo generator; once running it never goes dormant again
#[derive(Debug)]
pub struct DemoGenerator {
    state: DemoState,
    cursor: usize,
}

impl Default for DemoGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoGenerator {
    pub fn new() -> Self {
        Self {
            state: DemoState::Dormant,
            cursor: 0,
        }
    }

    pub fn state(&self) -> DemoState {
        self.state
    }

    /// Decides, once the grace period is over, whether to start
    ///
    /// Starts only if no input line was seen and someone is watching.
    /// Returns `true` on the transition to running.
    pub fn try_activate(&mut self, lines_seen: u64, observers: usize) -> bool {
        if self.state == DemoState::Running || lines_seen > 0 || observers == 0 {
            return false;
        }
        self.state = DemoState::Running;
        true
    }

    /// Next task of the script, or `None` while dormant
    pub fn next_task(&mut self) -> Option<DemoTask> {
        if self.state == DemoState::Dormant {
            return None;
        }
        let task = DEMO_TASKS[self.cursor % DEMO_TASKS.len()];
        self.cursor += 1;
        Some(task)
    }
}

impl Bridge {
    /// Grace period is over: start the demo if nothing else is happening
    pub(super) fn on_demo_grace_elapsed(&mut self) {
        if !self
            .demo
            .try_activate(self.lines_seen, self.observers.len())
        {
            tracing::debug!(
                lines_seen = self.lines_seen,
                observers = self.observers.len(),
                "demo mode stays dormant"
            );
            return;
        }
        tracing::info!("no input received, starting demo mode");
        let (_, joined) = self
            .registry
            .get_or_create(COORDINATOR_ID, AgentRole::Manager, Vec::new());
        self.emit_opt(joined);
        self.scheduler
            .every(self.timings.demo_interval, TimerAction::DemoTick);
    }

    /// Runs one step of the demo script
    pub(super) fn on_demo_tick(&mut self) {
        let Some(task) = self.demo.next_task() else {
            return;
        };
        let agent_id = self.handle_tool_use(
            task.tool,
            None,
            Some(task.description.to_string()),
            DEMO_ID_PREFIX,
        );
        self.scheduler.schedule(
            self.timings.delegation_delay,
            TimerAction::Delegate {
                agent_id: agent_id.clone(),
                message: task.delegation_message(),
            },
        );
        self.scheduler.schedule(
            self.timings.completion_delay(),
            TimerAction::CompleteDemoWork { agent_id },
        );
    }

    /// A demo worker is done: complete it and queue its report
    pub(super) fn on_demo_work_done(&mut self, agent_id: &str) {
        if self.complete_agent(agent_id) {
            self.scheduler.schedule(
                self.timings.report_delay,
                TimerAction::ReportBack {
                    agent_id: agent_id.to_string(),
                },
            );
        }
    }
}
