// TestDependencies - mock implementations for testing
//
// Provides mock transport and renderer services that can be injected into
// the app builder in place of the device bridge.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{BaseCodeRenderer, BaseTransportProvider, BaseTransportSession, ServerDeps};
use crate::domains::messaging::MessageAck;
use crate::domains::session::{TransportEvent, TransportEventSink};

// =============================================================================
// Mock Transport
// =============================================================================

/// Call counters and failure switches shared by a provider and its sessions.
#[derive(Default)]
struct TransportLog {
    creates: AtomicUsize,
    initializes: AtomicUsize,
    destroys: AtomicUsize,
    fail_creates: AtomicUsize,
    fail_initializes: AtomicUsize,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

impl TransportLog {
    /// Consume one scheduled failure from `counter`, if any remain.
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct MockTransportProvider {
    log: Arc<TransportLog>,
    destroy_delay: Duration,
    sinks: Mutex<Vec<TransportEventSink>>,
    sessions: Mutex<Vec<Arc<MockTransportSession>>>,
}

impl MockTransportProvider {
    pub fn new() -> Self {
        Self {
            log: Arc::new(TransportLog::default()),
            destroy_delay: Duration::ZERO,
            sinks: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Make `destroy` take this long, e.g. to hold a restart in flight.
    pub fn with_destroy_delay(mut self, delay: Duration) -> Self {
        self.destroy_delay = delay;
        self
    }

    /// Fail the next `times` calls to `create_session`.
    pub fn fail_create_times(self, times: usize) -> Self {
        self.log.fail_creates.store(times, Ordering::SeqCst);
        self
    }

    /// Fail the next `times` calls to `initialize`.
    pub fn fail_initialize_times(self, times: usize) -> Self {
        self.fail_next_initializes(times);
        self
    }

    /// Like `fail_initialize_times`, for a provider already handed out.
    pub fn fail_next_initializes(&self, times: usize) {
        self.log.fail_initializes.store(times, Ordering::SeqCst);
    }

    /// Make every send fail.
    pub fn fail_sends(self) -> Self {
        self.log.fail_sends.store(true, Ordering::SeqCst);
        self
    }

    /// Push an event through the most recently created session's sink.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        let sink = self
            .sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned();

        match sink {
            Some(sink) => sink.emit(event).await,
            None => false,
        }
    }

    /// The sink handed to the `index`-th successfully created session.
    pub fn sink(&self, index: usize) -> Option<TransportEventSink> {
        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    pub fn last_session(&self) -> Option<Arc<MockTransportSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// Calls to `create_session`, including failed ones.
    pub fn create_count(&self) -> usize {
        self.log.creates.load(Ordering::SeqCst)
    }

    pub fn initialize_count(&self) -> usize {
        self.log.initializes.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.log.destroys.load(Ordering::SeqCst)
    }

    /// Every `(chat_id, body)` sent through any session.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.log.sent_messages()
    }
}

impl Default for MockTransportProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseTransportProvider for MockTransportProvider {
    fn create_session(&self, events: TransportEventSink) -> Result<Arc<dyn BaseTransportSession>> {
        self.log.creates.fetch_add(1, Ordering::SeqCst);
        if TransportLog::take_failure(&self.log.fail_creates) {
            anyhow::bail!("mock create failure");
        }

        let session = Arc::new(MockTransportSession {
            log: self.log.clone(),
            destroy_delay: self.destroy_delay,
        });

        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(events);
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(session.clone());

        Ok(session)
    }
}

pub struct MockTransportSession {
    log: Arc<TransportLog>,
    destroy_delay: Duration,
}

impl MockTransportSession {
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.log.sent_messages()
    }
}

#[async_trait]
impl BaseTransportSession for MockTransportSession {
    async fn initialize(&self) -> Result<()> {
        self.log.initializes.fetch_add(1, Ordering::SeqCst);
        if TransportLog::take_failure(&self.log.fail_initializes) {
            anyhow::bail!("mock initialize failure");
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.log.destroys.fetch_add(1, Ordering::SeqCst);
        if !self.destroy_delay.is_zero() {
            tokio::time::sleep(self.destroy_delay).await;
        }
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, body: &str) -> Result<MessageAck> {
        if self.log.fail_sends.load(Ordering::SeqCst) {
            anyhow::bail!("mock send failure");
        }

        let mut sent = self.log.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push((chat_id.to_string(), body.to_string()));
        Ok(MessageAck {
            message_id: Some(format!("mock-msg-{}", sent.len())),
        })
    }
}

// =============================================================================
// Mock Code Renderer
// =============================================================================

pub struct MockCodeRenderer {
    calls: Arc<Mutex<Vec<String>>>,
    fail: AtomicBool,
}

impl MockCodeRenderer {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let renderer = Self::new();
        renderer.fail.store(true, Ordering::SeqCst);
        renderer
    }

    /// Payloads passed to `encode_to_image`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockCodeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCodeRenderer for MockCodeRenderer {
    async fn encode_to_image(&self, payload: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payload.to_string());

        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mock render failure");
        }
        Ok(format!("data:image/png;base64,MOCK:{payload}"))
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub transport: Arc<MockTransportProvider>,
    pub renderer: Arc<MockCodeRenderer>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(MockTransportProvider::new()),
            renderer: Arc::new(MockCodeRenderer::new()),
        }
    }

    /// Set a mock transport provider
    pub fn mock_transport(mut self, transport: MockTransportProvider) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Set a mock renderer
    pub fn mock_renderer(mut self, renderer: MockCodeRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn into_server_deps(self) -> ServerDeps {
        ServerDeps::new(self.transport, self.renderer)
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
