//! Session domain - connection lifecycle of the single messaging account
//!
//! Architecture:
//!   transport events → ReconnectionController (single writer) → SessionState → HTTP readers

pub mod controller;
pub mod events;
pub mod pairing;
pub mod phase;
pub mod state;

// Re-export commonly used types
pub use controller::{ActiveSession, ControllerConfig, ControllerHandle, ReconnectionController};
pub use events::{TransportEvent, TransportEventSink};
pub use pairing::{PairingToken, PairingTokenStore};
pub use phase::Phase;
pub use state::{RestartOutcome, SessionError, SessionSnapshot, SessionState};
