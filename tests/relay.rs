use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use makeup_mirror::{
    config::ALLOWED_ORIGIN,
    relay::{MemoryStore, ObjectStore, StoreError, build_app},
};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "look-boundary";

fn app_with(store: Arc<dyn ObjectStore>) -> Router {
    build_app(store)
}

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new("looks"));
    (app_with(store.clone()), store)
}

fn red_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(10, 10, image::Rgb([220, 20, 60]));
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&img)
        .unwrap();
    out
}

fn multipart_body(
    field: &str,
    filename: Option<&str>,
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let filename = filename
        .map(|name| format!("; filename=\"{name}\""))
        .unwrap_or_default();
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"{filename}\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn list(app: &Router) -> Vec<String> {
    let (status, body) = send(app, Request::get("/files").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn upload_list_delete_cycle() {
    let (app, store) = app();
    let jpeg = red_jpeg();

    let (status, body) = send(
        &app,
        upload_request(multipart_body("file", None, "image/jpeg", &jpeg)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("https://storage.googleapis.com/looks/"));
    assert!(url.ends_with("-upload.jpg"));

    let name = url.rsplit('/').next().unwrap().to_string();
    let stored = store.get(&name).await.unwrap();
    assert_eq!(stored.bytes, jpeg);
    assert_eq!(stored.content_type, "image/jpeg");

    assert_eq!(list(&app).await, vec![url.clone()]);

    let (status, body) = send(
        &app,
        Request::delete(format!("/delete/{name}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], Value::Bool(true));
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn upload_keeps_original_extension() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        upload_request(multipart_body("file", Some("Selfie.PNG"), "image/png", b"not really png")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().ends_with("-upload.PNG"));
}

#[tokio::test]
async fn upload_without_file_part_is_rejected() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        upload_request(multipart_body("picture", Some("look.jpg"), "image/jpeg", &red_jpeg())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file received");
    assert!(store.list().await.unwrap().is_empty());

    let (status, body) = send(
        &app,
        Request::post("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file received");
}

#[tokio::test]
async fn listing_is_stable_without_writes() {
    let (app, _) = app();
    for name in ["a.jpg", "b.jpg"] {
        send(
            &app,
            upload_request(multipart_body("file", Some(name), "image/jpeg", &red_jpeg())),
        )
        .await;
        // Names are keyed by millisecond.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let first = list(&app).await;
    assert_eq!(first.len(), 2);
    assert_eq!(list(&app).await, first);
}

#[tokio::test]
async fn deleting_unknown_object_is_a_server_error() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Request::delete("/delete/missing.jpg")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("missing.jpg"));
}

#[tokio::test]
async fn foreign_origins_are_forbidden() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Request::get("/files")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not allowed by CORS");

    let response = app
        .clone()
        .oneshot(
            Request::get("/files")
                .header(header::ORIGIN, ALLOWED_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );

    assert!(list(&app).await.is_empty());
}

struct BrokenStore;

#[async_trait]
impl ObjectStore for BrokenStore {
    fn bucket(&self) -> &str {
        "looks"
    }

    async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("bucket is read-only".to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Backend("listing disabled".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("delete disabled".to_string()))
    }
}

#[tokio::test]
async fn store_failures_become_500_with_message() {
    let app = app_with(Arc::new(BrokenStore));

    let (status, body) = send(
        &app,
        upload_request(multipart_body("file", Some("look.jpg"), "image/jpeg", &red_jpeg())),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "bucket is read-only");

    let (status, body) = send(&app, Request::get("/files").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "listing disabled");
}
