//! Server dependencies (using traits for testability)
//!
//! This module provides the dependency container handed to the app builder,
//! plus the adapters that put the device bridge behind the transport traits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bridge::models::BridgeEventKind;
use bridge::BridgeService;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domains::messaging::MessageAck;
use crate::domains::session::{TransportEvent, TransportEventSink};
use crate::kernel::{BaseCodeRenderer, BaseTransportProvider, BaseTransportSession};

/// Consecutive failed polls before the bridge is treated as gone.
const MAX_POLL_FAILURES: u32 = 3;

// =============================================================================
// Bridge adapters (implement the transport traits)
// =============================================================================

/// Creates bridge-backed sessions.
pub struct BridgeTransportProvider {
    service: Arc<BridgeService>,
    poll_interval: Duration,
}

impl BridgeTransportProvider {
    pub fn new(service: Arc<BridgeService>, poll_interval: Duration) -> Self {
        Self {
            service,
            poll_interval,
        }
    }
}

impl BaseTransportProvider for BridgeTransportProvider {
    fn create_session(&self, events: TransportEventSink) -> Result<Arc<dyn BaseTransportSession>> {
        Ok(Arc::new(BridgeSession {
            service: self.service.clone(),
            events,
            poll_interval: self.poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            poller: Mutex::new(None),
        }))
    }
}

/// One bridge session plus the background task that polls its events.
pub struct BridgeSession {
    service: Arc<BridgeService>,
    events: TransportEventSink,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeSession {
    fn stop_polling(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(poller) = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take() {
            poller.abort();
        }
    }
}

#[async_trait]
impl BaseTransportSession for BridgeSession {
    async fn initialize(&self) -> Result<()> {
        let info = self
            .service
            .start_session()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        info!(
            session_id = %info.session_id,
            status = ?info.status,
            generation = self.events.generation(),
            "bridge session started"
        );

        let poller = tokio::spawn(poll_bridge_events(
            self.service.clone(),
            self.events.clone(),
            self.poll_interval,
            self.shutdown.clone(),
        ));
        *self.poller.lock().unwrap_or_else(|e| e.into_inner()) = Some(poller);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.stop_polling();
        debug!(
            session_id = %self.service.session_id(),
            generation = self.events.generation(),
            "destroying bridge session"
        );
        self.service
            .destroy_session()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn send_message(&self, chat_id: &str, body: &str) -> Result<MessageAck> {
        let sent = self
            .service
            .send_message(chat_id, body)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(MessageAck {
            message_id: sent.id,
        })
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

/// Poll the bridge until shutdown, a disconnect, or the bridge going away.
///
/// Exactly one `Disconnected` is emitted when the loop ends on its own.
async fn poll_bridge_events(
    service: Arc<BridgeService>,
    events: TransportEventSink,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let generation = events.generation();
    let mut cursor = 0u64;
    let mut failures = 0u32;

    debug!(
        session_id = %service.session_id(),
        generation,
        poll_interval_ms = interval.as_millis() as u64,
        "bridge poller starting"
    );

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match service.poll_events(cursor).await {
            Ok(batch) => {
                failures = 0;
                for event in batch {
                    cursor = cursor.max(event.seq);
                    let Some(event) = to_transport_event(event.kind) else {
                        continue;
                    };
                    let ended = matches!(event, TransportEvent::Disconnected(_));
                    if !events.emit(event).await || ended {
                        debug!(generation, "bridge poller finished");
                        return;
                    }
                }
            }
            Err(e) if e.is_rejection() => {
                warn!(generation, error = %e, "bridge rejected event poll");
                events.emit(TransportEvent::Disconnected(e.to_string())).await;
                return;
            }
            Err(e) => {
                failures += 1;
                error!(generation, attempt = failures, error = %e, "failed to poll bridge events");
                if failures >= MAX_POLL_FAILURES {
                    events
                        .emit(TransportEvent::Disconnected(format!("bridge unreachable: {e}")))
                        .await;
                    return;
                }
            }
        }

        tokio::time::sleep(interval).await;
    }

    debug!(generation, "bridge poller stopped");
}

fn to_transport_event(kind: BridgeEventKind) -> Option<TransportEvent> {
    match kind {
        BridgeEventKind::Qr { qr } => Some(TransportEvent::Qr(qr)),
        BridgeEventKind::Ready => Some(TransportEvent::Ready),
        BridgeEventKind::Disconnected { reason } => Some(TransportEvent::Disconnected(reason)),
        BridgeEventKind::Message { from } => Some(TransportEvent::MessageReceived { from }),
        BridgeEventKind::Unknown => None,
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub transport: Arc<dyn BaseTransportProvider>,
    pub renderer: Arc<dyn BaseCodeRenderer>,
}

impl ServerDeps {
    pub fn new(
        transport: Arc<dyn BaseTransportProvider>,
        renderer: Arc<dyn BaseCodeRenderer>,
    ) -> Self {
        Self {
            transport,
            renderer,
        }
    }
}
