//! Test harness driving the full router against mock transport dependencies.
//!
//! Each test gets a fresh SessionState, controller task and mock provider.
//! Requests go through `tower::ServiceExt::oneshot`, so no socket is bound.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use gateway_core::domains::session::{ControllerConfig, ControllerHandle, SessionState, TransportEvent};
use gateway_core::kernel::test_dependencies::{MockCodeRenderer, MockTransportProvider};
use gateway_core::kernel::TestDependencies;
use gateway_core::server::build_app;
use serde_json::Value;
use test_context::AsyncTestContext;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Controller timings short enough that reconnects happen within a test.
pub fn test_controller_config() -> ControllerConfig {
    ControllerConfig {
        reconnect_delay: Duration::from_millis(50),
        max_backoff: Duration::from_millis(200),
        restart_grace_period: Duration::from_millis(500),
        event_queue_capacity: 16,
    }
}

/// Test harness that wires the app around mock dependencies.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(GatewayHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &GatewayHarness) {
///     ctx.emit(TransportEvent::Ready).await;
///     // ... test code
/// }
/// ```
pub struct GatewayHarness {
    pub router: Router,
    pub deps: TestDependencies,
    pub controller: ControllerHandle,
    controller_task: Option<JoinHandle<()>>,
}

impl AsyncTestContext for GatewayHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(mut self) {
        self.shutdown().await;
    }
}

impl GatewayHarness {
    pub async fn new() -> Result<Self> {
        Self::with_deps(TestDependencies::new()).await
    }

    pub async fn with_transport(transport: MockTransportProvider) -> Result<Self> {
        Self::with_deps(TestDependencies::new().mock_transport(transport)).await
    }

    pub async fn with_renderer(renderer: MockCodeRenderer) -> Result<Self> {
        Self::with_deps(TestDependencies::new().mock_renderer(renderer)).await
    }

    /// Build the app and wait for the controller to bring up its first session.
    pub async fn with_deps(deps: TestDependencies) -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let (router, controller, controller_task) = build_app(
            deps.clone().into_server_deps(),
            test_controller_config(),
            "@c.us".to_string(),
        )
        .await;

        let harness = Self {
            router,
            deps,
            controller,
            controller_task: Some(controller_task),
        };

        let transport = harness.transport().clone();
        harness
            .wait_until(|| transport.initialize_count() >= 1)
            .await
            .context("controller never initialized a session")?;

        Ok(harness)
    }

    pub fn transport(&self) -> &Arc<MockTransportProvider> {
        &self.deps.transport
    }

    pub fn session(&self) -> &Arc<SessionState> {
        self.controller.state()
    }

    /// Push a transport event as if the current session had raised it.
    pub async fn emit(&self, event: TransportEvent) {
        assert!(
            self.transport().emit(event).await,
            "no session to emit through"
        );
    }

    /// Poll `condition` until it holds, for up to two seconds.
    pub async fn wait_until(&self, mut condition: impl FnMut() -> bool) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .context("condition not reached within 2s")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, &body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, json)
    }

    pub async fn shutdown(&mut self) {
        self.controller.shutdown().await;
        if let Some(task) = self.controller_task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
        }
    }
}
