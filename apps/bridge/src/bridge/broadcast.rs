use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::agent::{Agent, DomainEvent};

/// Sending half of an observer's outbound queue; carries serialized frames
pub type ObserverSender = mpsc::UnboundedSender<String>;

/// Receiving half, drained by the observer's socket task
pub type ObserverReceiver = mpsc::UnboundedReceiver<String>;

/// Identity of one connected observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of connected observers
///
/// Delivery is at-most-once and best effort: an observer whose queue is
/// closed is dropped on the next broadcast, and nothing is buffered for it.
#[derive(Debug, Default)]
pub struct Observers {
    members: HashMap<ObserverId, ObserverSender>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an observer, sending it the `init` snapshot first
    ///
    /// The snapshot is queued before the observer joins the set, so it always
    /// precedes every later broadcast. Returns `false` if the observer was
    /// already gone.
    pub fn attach(&mut self, id: ObserverId, sender: ObserverSender, agents: Vec<Agent>) -> bool {
        let init = DomainEvent::Init { agents };
        let frame = match init.to_wire() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(observer = %id, error = %err, "failed to serialize snapshot");
                return false;
            }
        };
        if sender.send(frame).is_err() {
            tracing::debug!(observer = %id, "observer closed before snapshot");
            return false;
        }
        self.members.insert(id, sender);
        true
    }

    /// Removes an observer; returns whether it was present
    pub fn detach(&mut self, id: ObserverId) -> bool {
        self.members.remove(&id).is_some()
    }

    /// Serializes `event` once and queues it for every open observer
    ///
    /// Returns the number of observers the frame was queued for.
    pub fn broadcast(&mut self, event: &DomainEvent) -> usize {
        if self.is_empty() {
            return 0;
        }
        let frame = match event.to_wire() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize event");
                return 0;
            }
        };
        let mut delivered = 0;
        self.members.retain(|id, sender| {
            if sender.send(frame.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!(observer = %id, "dropping closed observer");
                false
            }
        });
        delivered
    }

    /// Drops every observer, closing their queues
    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentRole;
    use serde_json::Value;

    fn frames(rx: &mut ObserverReceiver) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[test]
    fn attach_sends_snapshot_first() {
        let mut observers = Observers::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agents = vec![Agent::new("main", AgentRole::Manager, vec![], 0)];

        assert!(observers.attach(ObserverId::new(), tx, agents));
        observers.broadcast(&DomainEvent::StreamEnded);

        let received = frames(&mut rx);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0]["type"], "init");
        assert_eq!(received[0]["agents"][0]["id"], "main");
        assert_eq!(received[1]["type"], "stream_ended");
    }

    #[test]
    fn late_joiner_misses_earlier_broadcasts() {
        let mut observers = Observers::new();
        let (early_tx, mut early_rx) = mpsc::unbounded_channel();
        observers.attach(ObserverId::new(), early_tx, vec![]);

        observers.broadcast(&DomainEvent::StreamEnded);

        let (late_tx, mut late_rx) = mpsc::unbounded_channel();
        observers.attach(ObserverId::new(), late_tx, vec![]);

        assert_eq!(frames(&mut early_rx).len(), 2);
        let late = frames(&mut late_rx);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0]["type"], "init");
    }

    #[test]
    fn closed_observers_are_dropped_silently() {
        let mut observers = Observers::new();
        let (open_tx, mut open_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        observers.attach(ObserverId::new(), open_tx, vec![]);
        observers.attach(ObserverId::new(), closed_tx, vec![]);
        drop(closed_rx);

        let delivered = observers.broadcast(&DomainEvent::StreamEnded);

        assert_eq!(delivered, 1);
        assert_eq!(observers.len(), 1);
        assert_eq!(frames(&mut open_rx).len(), 2);
    }

    #[test]
    fn attach_rejects_already_closed_observer() {
        let mut observers = Observers::new();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert!(!observers.attach(ObserverId::new(), tx, vec![]));
        assert!(observers.is_empty());
    }

    #[test]
    fn detach_removes_observer() {
        let mut observers = Observers::new();
        let id = ObserverId::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        observers.attach(id, tx, vec![]);

        assert!(observers.detach(id));
        assert!(!observers.detach(id));
        assert_eq!(observers.broadcast(&DomainEvent::StreamEnded), 0);
    }
}
