//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::messaging::ReadinessGatedDispatcher;
use crate::domains::session::{
    ControllerConfig, ControllerHandle, ReconnectionController, SessionState,
};
use crate::kernel::{BaseCodeRenderer, ServerDeps};
use crate::server::routes::{
    events_handler, health_handler, qr_handler, restart_handler, root_handler,
    send_message_handler, status_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionState>,
    pub controller: ControllerHandle,
    pub dispatcher: ReadinessGatedDispatcher,
    pub renderer: Arc<dyn BaseCodeRenderer>,
}

/// Build the Axum application router
///
/// Spawns the reconnection controller and asks it to bring up the first
/// session before returning, so the transport starts connecting while the
/// listener binds.
///
/// Returns (Router, ControllerHandle, JoinHandle) - the handle and task are
/// needed for graceful shutdown.
pub async fn build_app(
    deps: ServerDeps,
    controller_config: ControllerConfig,
    chat_id_suffix: String,
) -> (Router, ControllerHandle, JoinHandle<()>) {
    let session = Arc::new(SessionState::new());

    let (controller, controller_task) =
        ReconnectionController::spawn(deps.transport.clone(), session.clone(), controller_config);

    let dispatcher = ReadinessGatedDispatcher::with_chat_id_suffix(
        session.clone(),
        controller.active_session(),
        chat_id_suffix,
    );

    let app_state = AppState {
        session,
        controller: controller.clone(),
        dispatcher,
        renderer: deps.renderer.clone(),
    };

    controller.start().await;

    (build_router(app_state), controller, controller_task)
}

/// Routes and middleware around an already-wired state.
pub fn build_router(app_state: AppState) -> Router {
    // CORS configuration - allow any origin, the API carries no credentials
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(root_handler))
        .route("/status", get(status_handler))
        .route("/qr", get(qr_handler))
        .route("/send-message", post(send_message_handler))
        .route("/restart", get(restart_handler))
        .route("/events", get(events_handler))
        // Health check
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
