use crate::domain::config::{ConnectionMode, TransportTarget};
use crate::domain::error::{SeqComError, SeqComResult};
use serde::{Deserialize, Serialize};

/// Primary connection state axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "Disconnected"),
            LinkState::Connecting => write!(f, "Connecting"),
            LinkState::Connected => write!(f, "Connected"),
            LinkState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// The single owned connection record.
///
/// `checking` and `sending` are orthogonal flags layered over the primary
/// state; a mode switch replaces the whole record rather than mutating it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub mode: ConnectionMode,
    pub target: TransportTarget,
    pub state: LinkState,
    pub checking: bool,
    pub sending: bool,
    pub last_error: Option<String>,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub mode: ConnectionMode,
    pub connected: bool,
    pub checking: bool,
    pub sending: bool,
    pub last_error: Option<String>,
}

impl Session {
    pub fn new(mode: ConnectionMode, target: TransportTarget) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            target,
            state: LinkState::Disconnected,
            checking: false,
            sending: false,
            last_error: None,
        }
    }

    /// Single transition point for the primary state.
    ///
    /// Legal edges: Disconnected -> Connecting -> {Connected, Disconnected},
    /// Connected -> Disconnecting -> Disconnected. Anything else is rejected,
    /// and the transient flags are dropped whenever Connected is left.
    pub fn transition(&mut self, next: LinkState) -> SeqComResult<()> {
        use LinkState::*;

        let legal = matches!(
            (self.state, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnecting)
                | (Disconnecting, Disconnected)
        );

        if !legal {
            return Err(SeqComError::Precondition(format!(
                "illegal session transition {} -> {}",
                self.state, next
            )));
        }

        if self.state == Connected {
            self.sending = false;
            self.checking = false;
        }

        self.state = next;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            connected: self.is_connected(),
            checking: self.checking,
            sending: self.sending,
            last_error: self.last_error.clone(),
        }
    }
}
