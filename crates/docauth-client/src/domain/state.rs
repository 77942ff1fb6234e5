//! Session lifecycle states.
//!
//! ```text
//! Uninitialized ──initialize──→ Initializing ──ok──→ Ready
//!                                    │                 │
//!                                    └──fail──→ Failed ←┘ (link lost)
//!
//! Initializing | Ready | Failed ──dispose──→ Disposed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    /// Connection, handshake or link failure. Only `dispose` leaves it.
    Failed,
    Disposed,
}

impl SessionState {
    /// Whether `process` may be called.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    /// Whether `dispose` has work to do in this state.
    pub fn holds_resources(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing | SessionState::Ready | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
            SessionState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}
