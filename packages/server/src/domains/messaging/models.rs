use super::errors::DispatchError;

/// An outbound message as accepted from a caller. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessageRequest {
    pub recipient: String,
    pub body: String,
}

impl OutboundMessageRequest {
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            body: body.into(),
        }
    }

    /// Both fields are required and must contain more than whitespace.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.recipient.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "phoneNumber is required".to_string(),
            ));
        }
        if self.body.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "message is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// The transport's immediate acknowledgement of a send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAck {
    pub message_id: Option<String>,
}
