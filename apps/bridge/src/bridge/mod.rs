// Event-to-state bridge
//
// The hub task owns a single `Bridge` context: the agent registry, the
// observer set, pending timers and the demo generator. Everything else talks
// to it through `Command`s, and it handles one command to completion before
// looking at the next, so no state here is ever shared or locked.

pub mod broadcast;
pub mod classifier;
pub mod demo;
pub mod errors;
pub mod handlers;
pub mod input;
pub mod registry;
pub mod scheduler;

use std::net::SocketAddr;
use std::ops::ControlFlow;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub use broadcast::{ObserverId, ObserverReceiver, ObserverSender, Observers};
pub use demo::{DemoGenerator, DemoState};
pub use errors::{BridgeError, BridgeResult};
pub use handlers::{AllWorking, ResultCorrelator};
pub use registry::AgentRegistry;
pub use scheduler::{Scheduler, TimerAction, TimerId};

use crate::config::{BridgeConfig, Timings};
use crate::domain::agent::{Agent, DomainEvent, COORDINATOR_ID};
use handlers::SpawnIds;

/// Work items for the hub task
#[derive(Debug)]
pub enum Command {
    /// One raw line of upstream input, without its newline
    Line(Vec<u8>),
    /// Upstream input reached end of stream
    StreamEnded,
    /// A new observer wants the snapshot and then live events
    Connect {
        observer: ObserverId,
        sender: ObserverSender,
    },
    Disconnect(ObserverId),
    Snapshot(oneshot::Sender<Vec<Agent>>),
    /// A scheduled timer is due
    Fire { timer: TimerId, action: TimerAction },
    Shutdown,
}

/// The bridge context, owned by the hub task
pub struct Bridge {
    registry: AgentRegistry,
    observers: Observers,
    scheduler: Scheduler,
    correlator: Box<dyn ResultCorrelator>,
    demo: DemoGenerator,
    spawn_ids: SpawnIds,
    timings: Timings,
    lines_seen: u64,
    stream_ended: bool,
}

impl Bridge {
    /// Creates an empty bridge whose timers post back to `commands`
    pub fn new(timings: Timings, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            registry: AgentRegistry::new(),
            observers: Observers::new(),
            scheduler: Scheduler::new(commands),
            correlator: Box::new(AllWorking),
            demo: DemoGenerator::new(),
            spawn_ids: SpawnIds::default(),
            timings,
            lines_seen: 0,
            stream_ended: false,
        }
    }

    /// Replaces the strategy that maps results to finished agents
    pub fn with_correlator(mut self, correlator: impl ResultCorrelator + 'static) -> Self {
        self.correlator = Box::new(correlator);
        self
    }

    /// Starts the demo grace period
    pub fn arm_demo(&mut self) {
        self.scheduler
            .schedule(self.timings.demo_grace, TimerAction::DemoGraceElapsed);
    }

    /// Handles one command; `Break` means the hub should stop
    pub fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Line(line) => self.handle_line(&line),
            Command::StreamEnded => self.end_stream(),
            Command::Connect { observer, sender } => self.connect(observer, sender),
            Command::Disconnect(observer) => {
                if self.observers.detach(observer) {
                    tracing::info!(observer = %observer, "observer disconnected");
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::Fire { timer, action } => self.on_fire(timer, action),
            Command::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Classifies one raw input line and applies it
    ///
    /// Lines that do not decode leave no trace. Lines arriving after the end
    /// of stream are ignored.
    pub fn handle_line(&mut self, line: &[u8]) {
        if self.stream_ended {
            return;
        }
        self.lines_seen += 1;
        if let Some(record) = classifier::classify(line) {
            self.dispatch(record);
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn demo_state(&self) -> DemoState {
        self.demo.state()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_len()
    }

    fn connect(&mut self, observer: ObserverId, sender: ObserverSender) {
        if self
            .observers
            .attach(observer, sender, self.registry.snapshot())
        {
            tracing::info!(
                observer = %observer,
                observers = self.observers.len(),
                "observer connected"
            );
        }
    }

    /// Settles pending idle reversions, then announces the end once
    fn end_stream(&mut self) {
        if self.stream_ended {
            return;
        }
        self.stream_ended = true;
        tracing::info!(lines = self.lines_seen, "input stream closed");

        let pending = self
            .scheduler
            .cancel_where(|action| matches!(action, TimerAction::RevertToIdle { .. }));
        for action in pending {
            if let TimerAction::RevertToIdle { agent_id } = action {
                self.revert_to_idle(&agent_id);
            }
        }
        self.emit(DomainEvent::StreamEnded);
    }

    fn on_fire(&mut self, timer: TimerId, action: TimerAction) {
        if !self.scheduler.fired(timer) {
            return;
        }
        match action {
            TimerAction::RevertToIdle { agent_id } => self.revert_to_idle(&agent_id),
            TimerAction::Delegate { agent_id, message } => {
                self.emit(DomainEvent::Communication {
                    from: COORDINATOR_ID.to_string(),
                    to: agent_id,
                    message,
                });
            }
            TimerAction::CompleteDemoWork { agent_id } => self.on_demo_work_done(&agent_id),
            TimerAction::ReportBack { agent_id } => {
                self.emit(DomainEvent::Communication {
                    from: agent_id,
                    to: COORDINATOR_ID.to_string(),
                    message: demo::DEMO_REPLY.to_string(),
                });
            }
            TimerAction::DemoGraceElapsed => self.on_demo_grace_elapsed(),
            TimerAction::DemoTick => self.on_demo_tick(),
        }
    }

    fn shutdown(&mut self) {
        tracing::info!(agents = self.registry.len(), "shutting down bridge");
        self.scheduler.cancel_all();
        self.observers.clear();
    }

    fn emit(&mut self, event: DomainEvent) {
        self.observers.broadcast(&event);
    }

    fn emit_opt(&mut self, event: Option<DomainEvent>) {
        if let Some(event) = event {
            self.emit(event);
        }
    }
}

/// Cloneable client side of the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl HubHandle {
    /// Registers a new observer and returns its id and frame queue
    ///
    /// The first frame on the queue is always the `init` snapshot.
    pub fn connect(&self) -> BridgeResult<(ObserverId, ObserverReceiver)> {
        let observer = ObserverId::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.send(Command::Connect { observer, sender })?;
        Ok((observer, receiver))
    }

    pub fn disconnect(&self, observer: ObserverId) {
        let _ = self.send(Command::Disconnect(observer));
    }

    pub fn push_line(&self, line: Vec<u8>) -> BridgeResult<()> {
        self.send(Command::Line(line))
    }

    pub fn end_stream(&self) -> BridgeResult<()> {
        self.send(Command::StreamEnded)
    }

    /// Current agents, in creation order
    pub async fn snapshot(&self) -> BridgeResult<Vec<Agent>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| BridgeError::HubClosed)
    }

    pub fn shutdown(&self) {
        let _ = self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> BridgeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::HubClosed)
    }
}

/// Binds the observer listener
///
/// A taken or unavailable address is fatal for the bridge.
pub async fn bind(addr: SocketAddr) -> BridgeResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind { addr, source })
}

/// Spawns the hub task
///
/// Must be called from within a tokio runtime.
pub fn spawn_hub(config: &BridgeConfig) -> (HubHandle, JoinHandle<()>) {
    let (commands, inbox) = mpsc::unbounded_channel();
    let mut bridge = Bridge::new(config.timings.clone(), commands.clone());
    if config.demo_enabled {
        bridge.arm_demo();
    }
    let task = tokio::spawn(run(bridge, inbox));
    (HubHandle { commands }, task)
}

/// Hub loop: applies commands until shutdown
pub async fn run(mut bridge: Bridge, mut inbox: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = inbox.recv().await {
        if bridge.handle(command).is_break() {
            break;
        }
    }
    tracing::debug!("hub stopped");
}
