// Delayed and periodic work for the hub
//
// Timers run as detached tokio tasks that sleep and then post a `Fire`
// command back to the hub, so their effects are applied on the hub task like
// any other input. Each pending timer is tracked with its abort handle and is
// keyed by the agent it concerns.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant};

use super::Command;

/// Shortest period of a repeating timer
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What the hub does when a timer fires
#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    /// Put a completed agent back to idle
    RevertToIdle { agent_id: String },
    /// Coordinator hands a demo task to a worker
    Delegate { agent_id: String, message: String },
    /// A demo worker finishes its task
    CompleteDemoWork { agent_id: String },
    /// A demo worker reports back to the coordinator
    ReportBack { agent_id: String },
    /// Grace period for real input is over
    DemoGraceElapsed,
    /// Next demo task is due
    DemoTick,
}

impl TimerAction {
    /// The agent this timer belongs to, if any
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            TimerAction::RevertToIdle { agent_id }
            | TimerAction::Delegate { agent_id, .. }
            | TimerAction::CompleteDemoWork { agent_id }
            | TimerAction::ReportBack { agent_id } => Some(agent_id.as_str()),
            TimerAction::DemoGraceElapsed | TimerAction::DemoTick => None,
        }
    }
}

#[derive(Debug)]
struct PendingTimer {
    action: TimerAction,
    handle: AbortHandle,
    repeating: bool,
}

/// Registry of pending timers
#[derive(Debug)]
pub struct Scheduler {
    commands: mpsc::UnboundedSender<Command>,
    pending: BTreeMap<TimerId, PendingTimer>,
    next_id: u64,
}

impl Scheduler {
    pub fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            commands,
            pending: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Fires `action` once after `delay`
    pub fn schedule(&mut self, delay: Duration, action: TimerAction) -> TimerId {
        let timer = self.allocate();
        let commands = self.commands.clone();
        let fired = action.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::Fire {
                timer,
                action: fired,
            });
        });
        self.track(timer, action, task.abort_handle(), false);
        timer
    }

    /// Fires `action` every `period`, starting one period from now
    ///
    /// Periods shorter than [`MIN_PERIOD`] are raised to it.
    pub fn every(&mut self, period: Duration, action: TimerAction) -> TimerId {
        let period = period.max(MIN_PERIOD);
        let timer = self.allocate();
        let commands = self.commands.clone();
        let fired = action.clone();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let command = Command::Fire {
                    timer,
                    action: fired.clone(),
                };
                if commands.send(command).is_err() {
                    break;
                }
            }
        });
        self.track(timer, action, task.abort_handle(), true);
        timer
    }

    /// Acknowledges a `Fire` for `timer`
    ///
    /// Returns `false` when the timer was cancelled after it had already
    /// posted; the hub must then ignore the action.
    pub fn fired(&mut self, timer: TimerId) -> bool {
        match self.pending.get(&timer) {
            Some(pending) if pending.repeating => true,
            Some(_) => {
                self.pending.remove(&timer);
                true
            }
            None => false,
        }
    }

    /// Cancels every timer belonging to `agent_id`; returns how many
    pub fn cancel_for(&mut self, agent_id: &str) -> usize {
        self.cancel_where(|action| action.agent_id() == Some(agent_id))
            .len()
    }

    /// Cancels every timer whose action matches, returning the cancelled
    /// actions in scheduling order
    pub fn cancel_where(
        &mut self,
        mut predicate: impl FnMut(&TimerAction) -> bool,
    ) -> Vec<TimerAction> {
        let timers: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|(_, pending)| predicate(&pending.action))
            .map(|(timer, _)| *timer)
            .collect();

        timers
            .into_iter()
            .filter_map(|timer| self.pending.remove(&timer))
            .map(|pending| {
                pending.handle.abort();
                pending.action
            })
            .collect()
    }

    /// Cancels everything
    pub fn cancel_all(&mut self) {
        for pending in std::mem::take(&mut self.pending).into_values() {
            pending.handle.abort();
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn allocate(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    fn track(&mut self, timer: TimerId, action: TimerAction, handle: AbortHandle, repeating: bool) {
        self.pending.insert(
            timer,
            PendingTimer {
                action,
                handle,
                repeating,
            },
        );
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
