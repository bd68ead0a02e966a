// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no session logic.
// The reconnection controller and dispatcher are written against these so
// tests can swap in the doubles from test_dependencies.
//
// Naming convention: Base* for trait names (e.g., BaseTransportProvider)

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::messaging::MessageAck;
use crate::domains::session::TransportEventSink;

// =============================================================================
// Transport Trait (Infrastructure - chat-network session)
// =============================================================================

/// One live chat-network session.
#[async_trait]
pub trait BaseTransportSession: Send + Sync {
    /// Bring the session up. Pairing payloads and readiness are reported
    /// through the event sink, not through the return value.
    async fn initialize(&self) -> Result<()>;

    /// Tear the session down and release its resources.
    async fn destroy(&self) -> Result<()>;

    /// Send a message to a fully-qualified chat id.
    async fn send_message(&self, chat_id: &str, body: &str) -> Result<MessageAck>;
}

/// Factory for transport sessions.
pub trait BaseTransportProvider: Send + Sync {
    /// Construct (but do not initialize) a session that reports to `events`.
    fn create_session(&self, events: TransportEventSink) -> Result<Arc<dyn BaseTransportSession>>;
}

// =============================================================================
// Code Renderer Trait (Infrastructure - pairing payload to image)
// =============================================================================

#[async_trait]
pub trait BaseCodeRenderer: Send + Sync {
    /// Render a pairing payload as a displayable image (data URL).
    async fn encode_to_image(&self, payload: &str) -> Result<String>;
}
