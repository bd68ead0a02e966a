use std::sync::Arc;

use tracing::{info, warn};

use super::errors::DispatchError;
use super::models::{MessageAck, OutboundMessageRequest};
use crate::domains::session::{ActiveSession, SessionState};

/// Suffix the transport expects on individual chat ids.
pub const DEFAULT_CHAT_ID_SUFFIX: &str = "@c.us";

/// Forwards outbound messages to the active transport session, but only while
/// the session is `Connected`.
///
/// Readiness is checked against one snapshot and the session handle is cloned
/// out of its slot before sending, so no lock is held across the transport call.
#[derive(Clone)]
pub struct ReadinessGatedDispatcher {
    state: Arc<SessionState>,
    active: ActiveSession,
    chat_id_suffix: String,
}

impl ReadinessGatedDispatcher {
    pub fn new(state: Arc<SessionState>, active: ActiveSession) -> Self {
        Self::with_chat_id_suffix(state, active, DEFAULT_CHAT_ID_SUFFIX)
    }

    pub fn with_chat_id_suffix(
        state: Arc<SessionState>,
        active: ActiveSession,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            state,
            active,
            chat_id_suffix: suffix.into(),
        }
    }

    pub async fn dispatch(
        &self,
        request: &OutboundMessageRequest,
    ) -> Result<MessageAck, DispatchError> {
        request.validate()?;

        let snapshot = self.state.snapshot();
        if !snapshot.is_ready() {
            return Err(DispatchError::NotReady(format!(
                "client is {} ({})",
                snapshot.phase, snapshot.status_message
            )));
        }

        // The session can be replaced between the snapshot and here.
        let Some(session) = self.active.current() else {
            return Err(DispatchError::NotReady(
                "no active transport session".to_string(),
            ));
        };

        let chat_id = self.chat_id(&request.recipient);
        match session.send_message(&chat_id, &request.body).await {
            Ok(ack) => {
                info!(chat_id = %chat_id, message_id = ?ack.message_id, "message sent");
                Ok(ack)
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "message send failed");
                Err(DispatchError::Transport(e.to_string()))
            }
        }
    }

    /// Qualify a bare phone number. Recipients that already carry a domain
    /// (`...@c.us`, `...@g.us`) pass through untouched.
    fn chat_id(&self, recipient: &str) -> String {
        let recipient = recipient.trim();
        if recipient.contains('@') {
            recipient.to_string()
        } else {
            format!("{recipient}{}", self.chat_id_suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::session::phase::CONNECTED;
    use crate::domains::session::{Phase, TransportEventSink};
    use crate::kernel::test_dependencies::{MockTransportProvider, MockTransportSession};
    use crate::kernel::BaseTransportProvider;
    use tokio::sync::mpsc;

    fn dispatcher_with_session(
        phase: Phase,
        session: Option<Arc<MockTransportSession>>,
    ) -> ReadinessGatedDispatcher {
        let state = Arc::new(SessionState::new());
        if phase != Phase::Uninitialized {
            state.transition_to(phase, CONNECTED).unwrap();
        }
        let active = ActiveSession::default();
        active.replace(session.map(|s| s as Arc<dyn crate::kernel::BaseTransportSession>));
        ReadinessGatedDispatcher::new(state, active)
    }

    fn mock_session(provider: &MockTransportProvider) -> Arc<MockTransportSession> {
        let (tx, _rx) = mpsc::channel(1);
        provider
            .create_session(TransportEventSink::new(1, tx))
            .unwrap();
        provider.last_session().unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_when_connected_qualifies_chat_id() {
        let provider = MockTransportProvider::new();
        let session = mock_session(&provider);
        let dispatcher = dispatcher_with_session(Phase::Connected, Some(session.clone()));

        let ack = dispatcher
            .dispatch(&OutboundMessageRequest::new("5215550001", "hello"))
            .await
            .unwrap();

        assert!(ack.message_id.is_some());
        assert_eq!(
            session.sent_messages(),
            vec![("5215550001@c.us".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_dispatch_keeps_qualified_recipient() {
        let provider = MockTransportProvider::new();
        let session = mock_session(&provider);
        let dispatcher = dispatcher_with_session(Phase::Connected, Some(session.clone()));

        dispatcher
            .dispatch(&OutboundMessageRequest::new("120363@g.us", "hello group"))
            .await
            .unwrap();

        assert_eq!(session.sent_messages()[0].0, "120363@g.us");
    }

    #[tokio::test]
    async fn test_not_ready_never_reaches_transport() {
        for phase in [Phase::Uninitialized, Phase::Disconnected, Phase::Restarting] {
            let provider = MockTransportProvider::new();
            let session = mock_session(&provider);
            let dispatcher = dispatcher_with_session(phase, Some(session.clone()));

            let err = dispatcher
                .dispatch(&OutboundMessageRequest::new("5215550001", "hello"))
                .await
                .unwrap_err();

            assert!(matches!(err, DispatchError::NotReady(_)), "{phase}");
            assert!(session.sent_messages().is_empty(), "{phase}");
        }
    }

    #[tokio::test]
    async fn test_connected_without_session_is_not_ready() {
        let dispatcher = dispatcher_with_session(Phase::Connected, None);

        let err = dispatcher
            .dispatch(&OutboundMessageRequest::new("5215550001", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_is_checked_first() {
        let dispatcher = dispatcher_with_session(Phase::Uninitialized, None);

        let err = dispatcher
            .dispatch(&OutboundMessageRequest::new("", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let provider = MockTransportProvider::new().fail_sends();
        let session = mock_session(&provider);
        let dispatcher = dispatcher_with_session(Phase::Connected, Some(session));

        let err = dispatcher
            .dispatch(&OutboundMessageRequest::new("5215550001", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
    }
}
