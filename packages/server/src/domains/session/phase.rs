//! Session phases and the transitions allowed between them.

use std::fmt;

use serde::Serialize;

pub const WAITING_FOR_QR: &str = "Waiting for QR code...";
pub const QR_AVAILABLE: &str = "QR code available, scan it with your phone.";
pub const CONNECTED: &str = "Connected and ready.";
pub const RESTARTING: &str = "Restarting client...";

/// Connection phase of the messaging session.
///
/// There is no terminal phase: a session keeps cycling through
/// `Disconnected -> AwaitingPairing -> Connected` until the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    AwaitingPairing,
    Connected,
    Disconnected,
    Restarting,
}

impl Phase {
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, next),
            (
                Uninitialized,
                AwaitingPairing | Connected | Disconnected | Restarting
            ) | (
                AwaitingPairing,
                AwaitingPairing | Connected | Disconnected | Restarting
            ) | (Connected, Disconnected | Restarting)
                | (
                    Disconnected,
                    AwaitingPairing | Connected | Disconnected | Restarting
                )
                | (Restarting, AwaitingPairing | Connected | Disconnected)
        )
    }

    pub fn is_ready(self) -> bool {
        self == Phase::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::AwaitingPairing => "awaiting_pairing",
            Phase::Connected => "connected",
            Phase::Disconnected => "disconnected",
            Phase::Restarting => "restarting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
