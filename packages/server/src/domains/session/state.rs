//! Process-wide session state.
//!
//! Phase, status message, timestamps, the restart latch and the pairing token
//! all live behind one lock. Callers only ever see immutable snapshots; every
//! mutation goes through a method that updates the whole field group at once.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::pairing::{PairingToken, PairingTokenStore};
use super::phase::{Phase, QR_AVAILABLE, RESTARTING, WAITING_FOR_QR};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}

/// Immutable view of the session at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub status_message: String,
    pub connected_since: Option<DateTime<Utc>>,
    pub disconnected_since: Option<DateTime<Utc>>,
    pub has_pairing_token: bool,
    pub restart_in_progress: bool,
}

impl SessionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.phase.is_ready()
    }
}

/// Result of asking for an operator restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The latch was free; a new restart sequence was started.
    Started,
    /// A restart was already in flight; nothing new was started.
    AlreadyInProgress,
}

struct Inner {
    phase: Phase,
    status_message: String,
    connected_since: Option<DateTime<Utc>>,
    disconnected_since: Option<DateTime<Utc>>,
    restart_in_progress: bool,
    pairing: PairingTokenStore,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            status_message: self.status_message.clone(),
            connected_since: self.connected_since,
            disconnected_since: self.disconnected_since,
            has_pairing_token: self.pairing.is_present(),
            restart_in_progress: self.restart_in_progress,
        }
    }

    fn apply(&mut self, phase: Phase, message: String) -> Result<(), SessionError> {
        if !self.phase.can_transition_to(phase) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                to: phase,
            });
        }

        match phase {
            Phase::Connected if self.phase != Phase::Connected => {
                self.connected_since = Some(Utc::now());
                self.disconnected_since = None;
            }
            Phase::Disconnected if self.phase != Phase::Disconnected => {
                self.disconnected_since = Some(Utc::now());
                self.connected_since = None;
            }
            _ => {}
        }

        if phase != Phase::AwaitingPairing {
            self.pairing.clear();
        }

        self.phase = phase;
        self.status_message = message;
        Ok(())
    }
}

/// Single source of truth for the connection phase.
///
/// Shared between the reconnection controller (the only writer of
/// transport-driven transitions) and the HTTP handlers (readers, plus the
/// restart latch).
pub struct SessionState {
    inner: RwLock<Inner>,
    updates: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        let inner = Inner {
            phase: Phase::Uninitialized,
            status_message: WAITING_FOR_QR.to_string(),
            connected_since: None,
            disconnected_since: None,
            restart_in_progress: false,
            pairing: PairingTokenStore::new(),
        };
        let (updates, _) = watch::channel(inner.snapshot());

        Self {
            inner: RwLock::new(inner),
            updates,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    /// Atomically replace phase and status message.
    ///
    /// Leaving (or never entering) `AwaitingPairing` clears the pairing token
    /// in the same critical section.
    pub fn transition_to(
        &self,
        phase: Phase,
        message: impl Into<String>,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.write();
        inner.apply(phase, message.into())?;
        Ok(self.publish(&inner))
    }

    /// Store a freshly issued pairing payload and (re-)enter `AwaitingPairing`.
    pub fn set_pairing_token(
        &self,
        payload: impl Into<String>,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.write();
        inner.apply(Phase::AwaitingPairing, QR_AVAILABLE.to_string())?;
        inner.pairing.set(payload);
        Ok(self.publish(&inner))
    }

    pub fn pairing_token(&self) -> Option<PairingToken> {
        self.read().pairing.get().cloned()
    }

    pub fn has_pairing_token(&self) -> bool {
        self.read().pairing.is_present()
    }

    /// Operator restart: take the single-flight latch and move to `Restarting`.
    ///
    /// Both happen under one lock acquisition, so two concurrent callers can
    /// never both observe a free latch.
    pub fn try_begin_restart(&self) -> RestartOutcome {
        let mut inner = self.write();
        if inner.restart_in_progress {
            return RestartOutcome::AlreadyInProgress;
        }

        // Restarting is reachable from every phase except itself, and the
        // latch is held for as long as the phase is Restarting.
        if inner.apply(Phase::Restarting, RESTARTING.to_string()).is_err() {
            return RestartOutcome::AlreadyInProgress;
        }
        inner.restart_in_progress = true;
        self.publish(&inner);
        RestartOutcome::Started
    }

    /// Automatic reconnect: take the latch without changing phase.
    pub fn try_acquire_restart_latch(&self) -> bool {
        let mut inner = self.write();
        if inner.restart_in_progress {
            return false;
        }
        inner.restart_in_progress = true;
        self.publish(&inner);
        true
    }

    pub fn finish_restart(&self) {
        let mut inner = self.write();
        inner.restart_in_progress = false;
        self.publish(&inner);
    }

    /// Receive every snapshot published after a change, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    fn publish(&self, inner: &Inner) -> SessionSnapshot {
        let snapshot = inner.snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
