//! Generation turn state machine.
//!
//! One turn runs from a submitted message until the provider's stream ends:
//!
//! ```text
//! Idle ──► Requesting ──► Streaming ──► Completed
//!              │              │
//!              └──► Failed ◄──┘
//! ```
//!
//! `Completed` and `Failed` accept the next turn. An edit abandons an active
//! turn by moving it back to `Idle`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Where the current generation turn of a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// No turn has run since the session opened or was last reset.
    #[default]
    Idle,

    /// Request sent, no chunk received yet.
    Requesting,

    /// At least one chunk applied to the placeholder.
    Streaming,

    Completed,

    Failed,
}

impl StreamState {
    /// Returns true while a turn owns the session.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requesting | Self::Streaming)
    }
}

impl StateMachine for StreamState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StreamState::*;
        matches!(
            (self, target),
            (Idle, Requesting)
                | (Requesting, Streaming)
                | (Requesting, Failed)
                | (Streaming, Completed)
                | (Streaming, Failed)
                // superseded by an edit
                | (Requesting, Idle)
                | (Streaming, Idle)
                | (Completed, Requesting)
                | (Completed, Idle)
                | (Failed, Requesting)
                | (Failed, Idle)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use StreamState::*;
        match self {
            Idle => vec![Requesting],
            Requesting => vec![Streaming, Failed, Idle],
            Streaming => vec![Completed, Failed, Idle],
            Completed | Failed => vec![Requesting, Idle],
        }
    }
}

/// Monotonic sequence number identifying one generation turn.
///
/// Anything tagged with a generation other than the session's current one
/// belongs to a superseded turn and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
