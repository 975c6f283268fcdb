//! HTTP-level tests for the Pawprint router

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use pawprint_classifiers::mock::{StaticClassifier, StaticModelLoader};
use pawprint_classifiers::ImageClassifier;
use pawprint_core::{ClassLabels, ANIMALS10};
use pawprint_server::{build_app, AppState, LoadMode, ServerConfig};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "pawprint-test-boundary";

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn dog_classifier() -> Arc<dyn ImageClassifier> {
    Arc::new(StaticClassifier::new(ClassLabels::animals10(), 4, 0.9))
}

async fn ready_app(config: ServerConfig) -> Router {
    let state = AppState::new(config, Arc::new(StaticModelLoader::ready(dog_classifier())));
    state.load_now().await;
    build_app(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_predict_returns_label_and_confidence() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let label = body["prediction"].as_str().unwrap();
    assert_eq!(label, "dog");
    assert!(ANIMALS10.contains(&label));

    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&confidence));
    assert!((confidence - 90.0).abs() < 1e-6);
    assert!(body.get("top_predictions").is_none());
}

#[tokio::test]
async fn test_image_field_name_accepted() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("image", "dog.png", &png_bytes())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "dog");
}

#[tokio::test]
async fn test_repeated_uploads_agree() {
    let app = ready_app(ServerConfig::default()).await;
    let image = png_bytes();

    let (_, first) = send(
        &app,
        predict_request("/predict", multipart_body("file", "a.png", &image)),
    )
    .await;
    let (_, second) = send(
        &app,
        predict_request("/predict", multipart_body("file", "a.png", &image)),
    )
    .await;

    assert_eq!(first["prediction"], second["prediction"]);
    assert_eq!(first["confidence"], second["confidence"]);
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("avatar", "dog.png", &png_bytes())),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_non_multipart_body() {
    let app = ready_app(ServerConfig::default()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_empty_filename() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(&app, predict_request("/predict", multipart_body("file", "", b""))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");
}

#[tokio::test]
async fn test_empty_file() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "empty.png", b"")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_file_too_large() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..Default::default()
    };
    let app = ready_app(config).await;

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "big.png", &vec![7u8; 4096])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File too large. Maximum size is 1KB");
}

#[tokio::test]
async fn test_body_over_outer_limit() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..Default::default()
    };
    let app = ready_app(config).await;

    let (status, body) = send(
        &app,
        predict_request(
            "/predict",
            multipart_body("file", "huge.png", &vec![7u8; 256 * 1024]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("File too large"));
}

#[tokio::test]
async fn test_undecodable_image_is_server_error() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request(
            "/predict",
            multipart_body("file", "notes.png", b"definitely not an image"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_model_loading_returns_503() {
    let loader = Arc::new(StaticModelLoader::ready(dog_classifier()).gated());
    let state = AppState::new(ServerConfig::default(), loader.clone());
    let task = state.ensure_loading().unwrap();
    let app = build_app(state.clone());

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["model_loading"], true);

    let (_, health) = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(health["status"], "loading");
    assert_eq!(health["model_loaded"], false);

    loader.release();
    task.await.unwrap();

    let (status, _) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_model_returns_503() {
    let state = AppState::new(
        ServerConfig::default(),
        Arc::new(StaticModelLoader::failing("weights missing")),
    );
    state.load_now().await;
    let app = build_app(state);

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["model_loading"], false);
    assert!(body["error"].as_str().unwrap().contains("weights missing"));

    let (_, health) = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_lazy_mode_loads_on_first_request() {
    let config = ServerConfig {
        load_mode: LoadMode::Lazy,
        ..Default::default()
    };
    let state = AppState::new(config, Arc::new(StaticModelLoader::ready(dog_classifier())));
    let app = build_app(state.clone());

    let (status, body) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["model_loading"], true);

    for _ in 0..100 {
        if state.slot.is_ready() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.slot.is_ready());

    let (status, _) = send(
        &app,
        predict_request("/predict", multipart_body("file", "dog.png", &png_bytes())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_top_k() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        predict_request(
            "/predict?top_k=3",
            multipart_body("file", "dog.png", &png_bytes()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let top = body["top_predictions"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0]["label"], "dog");

    let (_, body) = send(
        &app,
        predict_request(
            "/predict?top_k=50",
            multipart_body("file", "dog.png", &png_bytes()),
        ),
    )
    .await;
    assert_eq!(body["top_predictions"].as_array().unwrap().len(), 5);

    let (status, _) = send(
        &app,
        predict_request(
            "/predict?top_k=0",
            multipart_body("file", "dog.png", &png_bytes()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_when_ready() {
    let app = ready_app(ServerConfig::default()).await;

    let (status, body) = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model"], "static");
    assert!(body["loaded_at"].is_string());
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = ready_app(ServerConfig::default()).await;

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_and_assets() {
    let app = ready_app(ServerConfig::default()).await;

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&html).contains("/predict"));

    let response = app
        .clone()
        .oneshot(Request::get("/static/script.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.contains("javascript"));

    let response = app
        .oneshot(Request::get("/static/missing.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_headers_only_when_enabled() {
    let request = || {
        Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap()
    };

    let app = ready_app(ServerConfig::default()).await;
    let response = app.clone().oneshot(request()).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let mut config = ServerConfig::default();
    config.cors.enabled = true;
    let app = ready_app(config).await;
    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_origin_list() {
    let mut config = ServerConfig::default();
    config.cors.enabled = true;
    config.cors.allowed_origins = vec!["https://pets.example".to_string()];
    let app = ready_app(config).await;

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://pets.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://pets.example"
    );
}
