//! Route behavior, exercised in-process through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use visage_core::{PresetCatalog, VisageConfig};
use visage_expression::{FaceEngine, FaceHandle};
use visage_gateway::GatewayServer;

fn setup() -> (FaceEngine, FaceHandle, Router) {
    let engine = FaceEngine::new(
        Arc::new(PresetCatalog::builtin().unwrap()),
        &VisageConfig::default(),
    );
    let handle = engine.handle();
    let router = GatewayServer::new(handle.clone(), "127.0.0.1", 0).router();
    (engine, handle, router)
}

async fn call(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

#[tokio::test]
async fn health_says_ok() {
    let (_engine, _handle, router) = setup();
    let (status, body) = call(router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn frame_is_camel_case_json() {
    let (mut engine, _handle, router) = setup();
    engine.step(0.016, 0.016);
    let (status, body) = call(router, Method::GET, "/frame", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sequence"], 1);
    assert_eq!(body["presetId"], "neutral");
    assert!(body["pose"]["leftEye"]["openness"].is_number());
}

#[tokio::test]
async fn presets_lists_catalog_in_order() {
    let (_engine, handle, router) = setup();
    let (status, body) = call(router, Method::GET, "/presets", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, handle.catalog().ids());
}

#[tokio::test]
async fn impulse_created_then_merged() {
    let (_engine, handle, router) = setup();
    let (status, body) = call(
        router.clone(),
        Method::POST,
        "/impulse",
        Some(json!({"preset": "angry", "weight": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "created");

    let (_, body) = call(
        router,
        Method::POST,
        "/impulse",
        Some(json!({"preset": "angry", "weight": 0.6, "duration": 2.0})),
    )
    .await;
    assert_eq!(body["outcome"], "merged");
    assert_eq!(handle.active_impulses()[0].weight, 1.0);
}

#[tokio::test]
async fn unknown_preset_is_404() {
    let (_engine, handle, router) = setup();
    let (status, body) = call(
        router.clone(),
        Method::POST,
        "/impulse",
        Some(json!({"preset": "ecstatic"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["outcome"], "unknown_preset");

    let (status, _) = call(router, Method::POST, "/preset", Some(json!({"id": "ecstatic"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(handle.selection(), "neutral");
}

#[tokio::test]
async fn select_preset_clears_impulses() {
    let (_engine, handle, router) = setup();
    handle.push_impulse("happy", None, None);
    let (status, _) = call(router, Method::POST, "/preset", Some(json!({"id": "sad"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(handle.active_impulses().is_empty());
    assert_eq!(handle.selection(), "sad");
}

#[tokio::test]
async fn manual_parameter_validation() {
    let (mut engine, handle, router) = setup();
    let (status, _) = call(
        router.clone(),
        Method::POST,
        "/manual",
        Some(json!({"path": "color", "value": "#112233"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(engine.step(0.016, 0.016).unwrap().color, "#112233");

    let (status, body) = call(
        router,
        Method::POST,
        "/manual",
        Some(json!({"path": "gazeX.inner", "value": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("gazeX.inner"));
    assert_eq!(handle.selection(), "neutral");
}
