//! The shared room gate.

use pylon_core::{Notice, RoomCommand};

/// Whether join/leave notices are currently admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomState {
    /// Presence notices flow to all peers.
    Open,
    /// Presence notices are suppressed.
    Closed,
}

/// Process-wide room state machine. Starts OPEN, cycles for the lifetime
/// of the process; there is no terminal state.
pub struct Room {
    state: RoomState,
}

impl Room {
    /// Create a room in the initial OPEN state.
    pub fn new() -> Self {
        Self {
            state: RoomState::Open,
        }
    }

    /// Apply a control command.
    ///
    /// Only a real transition produces a notice to broadcast; `close` while
    /// CLOSED and `open` while OPEN are silent no-ops.
    pub fn apply(&mut self, cmd: RoomCommand) -> Option<Notice> {
        match (cmd, self.state) {
            (RoomCommand::Close, RoomState::Open) => {
                self.state = RoomState::Closed;
                Some(Notice::RoomClosed)
            }
            (RoomCommand::Open, RoomState::Closed) => {
                self.state = RoomState::Open;
                Some(Notice::RoomOpened)
            }
            _ => None,
        }
    }

    /// Whether the room is currently OPEN.
    pub fn is_open(&self) -> bool {
        self.state == RoomState::Open
    }

    /// Current state.
    pub fn state(&self) -> RoomState {
        self.state
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}
