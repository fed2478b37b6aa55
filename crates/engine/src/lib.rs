use player_bridge_core::Snapshot;
use std::time::Duration;
use tracing::{debug, warn};

/// What the notifier last reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NotifierState {
    /// Nothing emitted yet.
    #[default]
    Idle,
    /// Holds the wire form of the last emission.
    Armed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierAction {
    Emit(String),
    None,
}

#[derive(Debug, Clone)]
pub struct NotifierOutput {
    pub action: NotifierAction,
    pub next_poll_in: Duration,
}

/// Turns a stream of snapshots into a stream of changes.
///
/// The first tick always emits. Later ticks emit only when the encoded
/// snapshot differs byte-for-byte from the last emission.
#[derive(Debug)]
pub struct ChangeNotifier {
    poll_interval: Duration,
    state: NotifierState,
}

impl ChangeNotifier {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            state: NotifierState::Idle,
        }
    }

    pub fn state(&self) -> &NotifierState {
        &self.state
    }

    pub fn tick(&mut self, snapshot: &Snapshot) -> NotifierOutput {
        let action = match snapshot.to_wire() {
            Ok(wire) => self.observe(wire),
            Err(err) => {
                warn!(error = %err, "failed to encode snapshot; skipping tick");
                NotifierAction::None
            }
        };

        NotifierOutput {
            action,
            next_poll_in: self.poll_interval,
        }
    }

    /// Compares an encoded snapshot with the held one, taking ownership of it
    /// when it is new.
    pub fn observe(&mut self, wire: String) -> NotifierAction {
        match &self.state {
            NotifierState::Armed(held) if *held == wire => NotifierAction::None,
            _ => {
                debug!(bytes = wire.len(), "player state changed");
                self.state = NotifierState::Armed(wire.clone());
                NotifierAction::Emit(wire)
            }
        }
    }
}
