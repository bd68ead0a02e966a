use thiserror::Error;

/// Why an outbound message was not delivered to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Client not ready: {0}")]
    NotReady(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
