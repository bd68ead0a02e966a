//! Reconnection controller.
//!
//! Owns the transport session for its whole lifetime: creation, teardown and
//! re-creation after disconnects and operator restarts. It runs as a single
//! background task consuming a bounded queue, so it is the only writer of
//! transport-driven session transitions.
//!
//! # Architecture
//!
//! ```text
//! transport session ──(sink: generation + event)──┐
//! GET /restart ──(latch + Restarting)──► Restart ──┤
//! boot ──────────────────────────────────► Start ──┼──► mpsc ──► controller loop
//! delayed timer ──────────────────────► RetryStart ┘                 │
//!                                                                    ├─► SessionState
//!                                                                    └─► ActiveSession slot
//! ```

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::events::{ControlMessage, TransportEvent, TransportEventSink};
use super::phase::{Phase, CONNECTED, WAITING_FOR_QR};
use super::state::{RestartOutcome, SessionState};
use crate::kernel::{BaseTransportProvider, BaseTransportSession};

/// Timing and sizing for the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fixed delay before reconnecting after a disconnect, and the base of
    /// the exponential backoff after failed initialization.
    pub reconnect_delay: Duration,
    /// Upper bound for the initialization backoff.
    pub max_backoff: Duration,
    /// How long teardown may take before it is abandoned.
    pub restart_grace_period: Duration,
    /// Capacity of the inbound event queue.
    pub event_queue_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            restart_grace_period: Duration::from_secs(10),
            event_queue_capacity: 64,
        }
    }
}

/// Read access to the currently active transport session.
///
/// Only the controller replaces the slot. The dispatcher clones the `Arc` out
/// under a short read lock and calls the session after releasing it.
#[derive(Clone, Default)]
pub struct ActiveSession {
    slot: Arc<RwLock<Option<Arc<dyn BaseTransportSession>>>>,
}

impl ActiveSession {
    pub fn current(&self) -> Option<Arc<dyn BaseTransportSession>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn replace(&self, session: Option<Arc<dyn BaseTransportSession>>) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = session;
    }
}

/// Cloneable handle used by the HTTP layer to talk to the controller.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControlMessage>,
    state: Arc<SessionState>,
    active: ActiveSession,
}

impl ControllerHandle {
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn active_session(&self) -> ActiveSession {
        self.active.clone()
    }

    /// Ask the controller to bring up a session. A no-op if one is already live.
    pub async fn start(&self) {
        if self.tx.send(ControlMessage::Start).await.is_err() {
            error!("reconnection controller is not running, start request dropped");
        }
    }

    /// Operator-triggered restart.
    ///
    /// Returns immediately. Concurrent calls collapse into the one restart
    /// that took the latch; the others get `AlreadyInProgress`.
    pub async fn restart(&self) -> RestartOutcome {
        let outcome = self.state.try_begin_restart();
        if outcome == RestartOutcome::AlreadyInProgress {
            debug!("restart already in progress");
            return outcome;
        }

        info!("restart requested");
        if self.tx.send(ControlMessage::Restart).await.is_err() {
            error!("reconnection controller is not running, restart request dropped");
            self.state.finish_restart();
        }
        outcome
    }

    /// Tear down the session and stop the controller loop.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ControlMessage::Shutdown).await;
    }
}

struct LiveHandle {
    session: Arc<dyn BaseTransportSession>,
    generation: u64,
    live: bool,
}

/// Background task owning the transport session.
pub struct ReconnectionController {
    provider: Arc<dyn BaseTransportProvider>,
    state: Arc<SessionState>,
    active: ActiveSession,
    config: ControllerConfig,
    tx: mpsc::Sender<ControlMessage>,
    rx: mpsc::Receiver<ControlMessage>,
    handle: Option<LiveHandle>,
    generation: u64,
    failed_attempts: u32,
    /// When the one pending `RetryStart` fires, if any.
    retry_deadline: Option<Instant>,
}

impl ReconnectionController {
    /// Spawn the controller loop. Nothing is started until `ControllerHandle::start`.
    pub fn spawn(
        provider: Arc<dyn BaseTransportProvider>,
        state: Arc<SessionState>,
        config: ControllerConfig,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let active = ActiveSession::default();

        let handle = ControllerHandle {
            tx: tx.clone(),
            state: state.clone(),
            active: active.clone(),
        };

        let controller = Self {
            provider,
            state,
            active,
            config,
            tx,
            rx,
            handle: None,
            generation: 0,
            failed_attempts: 0,
            retry_deadline: None,
        };

        (handle, tokio::spawn(controller.run()))
    }

    async fn run(mut self) {
        info!(
            reconnect_delay_ms = self.config.reconnect_delay.as_millis() as u64,
            grace_period_ms = self.config.restart_grace_period.as_millis() as u64,
            "reconnection controller starting"
        );

        while let Some(message) = self.rx.recv().await {
            match message {
                ControlMessage::Start => self.start().await,
                ControlMessage::Restart => self.restart().await,
                ControlMessage::RetryStart => self.retry_start().await,
                ControlMessage::Transport { generation, event } => {
                    self.on_transport_event(generation, event)
                }
                ControlMessage::Shutdown => {
                    self.teardown().await;
                    break;
                }
            }
        }

        info!("reconnection controller stopped");
    }

    /// Bring up a session unless a live one exists.
    ///
    /// Failures are absorbed: the session moves to `Disconnected` and a retry
    /// is scheduled with exponential backoff.
    async fn start(&mut self) {
        if self.handle.as_ref().is_some_and(|h| h.live) {
            debug!(generation = self.generation, "session already live, start is a no-op");
            return;
        }

        // A dead handle must be gone before its replacement exists.
        self.teardown().await;

        self.generation += 1;
        let generation = self.generation;
        let sink = TransportEventSink::new(generation, self.tx.clone());

        let session = match self.provider.create_session(sink) {
            Ok(session) => session,
            Err(e) => {
                self.on_initialization_failed(generation, &e);
                return;
            }
        };

        self.handle = Some(LiveHandle {
            session: session.clone(),
            generation,
            live: true,
        });
        self.active.replace(Some(session.clone()));

        info!(generation, "initializing transport session");
        if let Err(e) = session.initialize().await {
            self.teardown().await;
            self.on_initialization_failed(generation, &e);
            return;
        }

        self.failed_attempts = 0;
        // Events queued during initialize are applied after this, so a qr or
        // ready event from this session still lands on top.
        self.transition(Phase::AwaitingPairing, WAITING_FOR_QR);
    }

    /// Operator restart. The latch was taken by `ControllerHandle::restart`.
    async fn restart(&mut self) {
        self.teardown().await;
        self.start().await;
        self.state.finish_restart();
        info!(phase = %self.state.snapshot().phase, "restart complete");
    }

    /// Automatic reconnect after a disconnect or failed initialization.
    async fn retry_start(&mut self) {
        self.retry_deadline = None;

        if !self.state.try_acquire_restart_latch() {
            debug!("operator restart in flight, dropping scheduled reconnect");
            return;
        }

        self.start().await;
        self.state.finish_restart();
    }

    fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        // A handle that already reported a disconnect is as good as replaced.
        let current = self
            .handle
            .as_ref()
            .filter(|h| h.live)
            .map(|h| h.generation);
        if current != Some(generation) {
            debug!(
                generation,
                current = ?current,
                event = event.name(),
                "ignoring event from a dead or replaced session"
            );
            return;
        }

        match event {
            TransportEvent::Qr(payload) => {
                info!(generation, "pairing code received");
                if let Err(e) = self.state.set_pairing_token(payload) {
                    warn!(generation, error = %e, "pairing code ignored");
                }
            }
            TransportEvent::Ready => {
                info!(generation, "transport session ready");
                self.failed_attempts = 0;
                self.transition(Phase::Connected, CONNECTED);
            }
            TransportEvent::Disconnected(reason) => {
                warn!(generation, reason = %reason, "transport session disconnected");
                if let Some(handle) = self.handle.as_mut() {
                    handle.live = false;
                }
                self.active.replace(None);

                let delay = self.schedule_retry(self.config.reconnect_delay);
                self.transition(
                    Phase::Disconnected,
                    format!("Disconnected ({reason}). Reconnecting in {delay:?}."),
                );
            }
            TransportEvent::MessageReceived { from } => {
                debug!(generation, from = %from, "inbound message");
            }
        }
    }

    /// Destroy the current session, giving up after the grace period.
    ///
    /// Errors and timeouts are logged and never block what comes next.
    async fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.active.replace(None);

        let generation = handle.generation;
        match tokio::time::timeout(self.config.restart_grace_period, handle.session.destroy())
            .await
        {
            Ok(Ok(())) => debug!(generation, "transport session destroyed"),
            Ok(Err(e)) => warn!(generation, error = %e, "transport teardown failed"),
            Err(_) => warn!(
                generation,
                grace_period_ms = self.config.restart_grace_period.as_millis() as u64,
                "transport teardown did not finish within the grace period, abandoning it"
            ),
        }
    }

    fn on_initialization_failed(&mut self, generation: u64, err: &anyhow::Error) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        let delay = self.schedule_retry(self.backoff_delay());

        error!(
            generation,
            attempt = self.failed_attempts,
            retry_in_ms = delay.as_millis() as u64,
            error = %err,
            "failed to initialize transport session"
        );

        self.transition(
            Phase::Disconnected,
            format!("Failed to initialize client: {err}. Retrying in {delay:?}."),
        );
    }

    fn backoff_delay(&self) -> Duration {
        backoff_delay(
            self.config.reconnect_delay,
            self.config.max_backoff,
            self.failed_attempts,
        )
    }

    /// Arm the retry timer unless one is already pending.
    ///
    /// Returns how long until the retry that will actually run.
    fn schedule_retry(&mut self, delay: Duration) -> Duration {
        let now = Instant::now();
        if let Some(deadline) = self.retry_deadline {
            let remaining = deadline.saturating_duration_since(now);
            debug!(remaining_ms = remaining.as_millis() as u64, "reconnect already scheduled");
            return remaining;
        }
        self.retry_deadline = Some(now + delay);

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControlMessage::RetryStart).await;
        });
        delay
    }

    fn transition(&self, phase: Phase, message: impl Into<String>) {
        if let Err(e) = self.state.transition_to(phase, message) {
            warn!(error = %e, "session transition rejected");
        }
    }
}

/// `base * 2^(attempt - 1)`, capped at `max`.
fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}
