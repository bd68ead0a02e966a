//! Integration tests for GET /qr.

mod common;

use std::sync::Arc;

use crate::common::{test_controller_config, GatewayHarness};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gateway_core::domains::session::TransportEvent;
use gateway_core::kernel::test_dependencies::{MockCodeRenderer, MockTransportProvider};
use gateway_core::kernel::{QrCodeRenderer, ServerDeps};
use gateway_core::server::build_app;
use serde_json::{json, Value};
use test_context::test_context;
use tower::ServiceExt;

#[test_context(GatewayHarness)]
#[tokio::test]
async fn no_pairing_code_is_not_found(ctx: &GatewayHarness) {
    let (status, body) = ctx.get("/qr").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    assert!(ctx.deps.renderer.calls().is_empty());
}

#[test_context(GatewayHarness)]
#[tokio::test]
async fn refreshed_code_replaces_previous(ctx: &GatewayHarness) {
    ctx.emit(TransportEvent::Qr("first".to_string())).await;
    ctx.emit(TransportEvent::Qr("second".to_string())).await;
    ctx.wait_until(|| {
        ctx.session()
            .pairing_token()
            .is_some_and(|t| t.payload == "second")
    })
    .await
    .unwrap();

    let (status, body) = ctx.get("/qr").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qr"], json!("second"));
}

#[tokio::test]
async fn render_failure_is_internal_error() {
    let mut ctx = GatewayHarness::with_renderer(MockCodeRenderer::failing())
        .await
        .unwrap();
    ctx.emit(TransportEvent::Qr("ABC123".to_string())).await;
    ctx.wait_until(|| ctx.session().has_pairing_token())
        .await
        .unwrap();

    let (status, body) = ctx.get("/qr").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Failed to generate QR code"));
    assert!(body["details"].is_string());

    ctx.shutdown().await;
}

/// Payload from a `qr` event survives rendering and scanning unchanged.
#[tokio::test]
async fn served_image_scans_back_to_payload() {
    let transport = Arc::new(MockTransportProvider::new());
    let deps = ServerDeps::new(transport.clone(), Arc::new(QrCodeRenderer::new()));
    let (router, controller, task) =
        build_app(deps, test_controller_config(), "@c.us".to_string()).await;

    while transport.initialize_count() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let payload = "2@Yf0cX3b1QkL9pQ,A1b2C3d4Zx8y7W6v,7Hq0pLm2Nn4Rr6Tt";
    assert!(transport.emit(TransportEvent::Qr(payload.to_string())).await);
    while !controller.state().has_pairing_token() {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = router
        .oneshot(Request::builder().uri("/qr").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    let data_url = body["qrImage"].as_str().unwrap();
    let png = STANDARD
        .decode(data_url.strip_prefix("data:image/png;base64,").unwrap())
        .unwrap();
    let image = image::load_from_memory(&png).unwrap().to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    let (_, decoded) = grids[0].decode().unwrap();

    assert_eq!(decoded, payload);

    controller.shutdown().await;
    let _ = task.await;
}
