//! Messaging domain - outbound message dispatch gated on session readiness

pub mod dispatcher;
pub mod errors;
pub mod models;

pub use dispatcher::ReadinessGatedDispatcher;
pub use errors::DispatchError;
pub use models::{MessageAck, OutboundMessageRequest};
