//! Pairing token storage.
//!
//! Holds the most recent pairing payload issued by the transport. The store
//! itself is a plain value; `SessionState` keeps it behind the same lock as
//! the phase so that leaving `AwaitingPairing` and clearing the token happen
//! in one step.

use chrono::{DateTime, Utc};

/// An opaque pairing payload and when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingToken {
    pub payload: String,
    pub issued_at: DateTime<Utc>,
}

impl PairingToken {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Most recent unconsumed pairing token, if any.
///
/// An absent token is a normal condition (not yet issued, or already
/// consumed by a successful connection), not an error.
#[derive(Debug, Default)]
pub struct PairingTokenStore {
    current: Option<PairingToken>,
}

impl PairingTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token with a freshly issued one.
    pub fn set(&mut self, payload: impl Into<String>) -> &PairingToken {
        self.current.insert(PairingToken::new(payload))
    }

    pub fn get(&self) -> Option<&PairingToken> {
        self.current.as_ref()
    }

    /// Drop the current token, returning it if there was one.
    pub fn clear(&mut self) -> Option<PairingToken> {
        self.current.take()
    }

    pub fn is_present(&self) -> bool {
        self.current.is_some()
    }
}
