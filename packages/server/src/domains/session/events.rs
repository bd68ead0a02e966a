//! Transport lifecycle events and the queue that carries them to the controller.

use tokio::sync::mpsc;

/// Lifecycle events emitted asynchronously by a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A new pairing payload must be shown to the user.
    Qr(String),
    /// The session is authenticated and can send messages.
    Ready,
    /// The session was lost, with the provider's reason.
    Disconnected(String),
    /// An inbound message arrived. Only the sender is carried.
    MessageReceived { from: String },
}

impl TransportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Qr(_) => "qr",
            TransportEvent::Ready => "ready",
            TransportEvent::Disconnected(_) => "disconnected",
            TransportEvent::MessageReceived { .. } => "message",
        }
    }
}

/// Messages consumed by the reconnection controller loop.
#[derive(Debug)]
pub(crate) enum ControlMessage {
    Start,
    Restart,
    RetryStart,
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    Shutdown,
}

/// Where a transport session publishes its events.
///
/// Each sink is bound to the generation of the session it was handed to, so
/// events from a session that has since been replaced are recognised and
/// dropped by the controller.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    generation: u64,
    tx: mpsc::Sender<ControlMessage>,
}

impl TransportEventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::Sender<ControlMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue an event, waiting for room if the queue is full.
    ///
    /// Returns `false` once the controller has stopped.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(ControlMessage::Transport {
                generation: self.generation,
                event,
            })
            .await
            .is_ok()
    }
}
