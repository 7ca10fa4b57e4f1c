use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::prelude::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{Value, json};
use tower::ServiceExt;

use gesture_server::landmark::NUM_LANDMARKS;
use gesture_server::{
    AppState, ClassifyError, DetectError, GestureClassifier, GestureLabels, HandDetector,
    HandLandmarks, Pipeline, WorkerPool, router,
};

/// Reports a hand only when the frame's top-left pixel (after mirroring) is white.
struct MarkerDetector;

impl HandDetector for MarkerDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
        if image.get_pixel(0, 0).0 != [255, 255, 255] {
            return Ok(Vec::new());
        }
        let positions = (0..NUM_LANDMARKS)
            .map(|i| [0.3 + i as f32 * 0.02, 0.9 - i as f32 * 0.03, 0.0])
            .collect();
        Ok(vec![HandLandmarks::new(positions, 0.99, 0.9)])
    }
}

struct BrokenDetector;

impl HandDetector for BrokenDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
        Err(DetectError::UnexpectedOutput("palm boxes have shape [1, 3]".into()))
    }
}

struct SlowDetector;

impl HandDetector for SlowDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(Vec::new())
    }
}

struct FixedClass(usize);

impl GestureClassifier for FixedClass {
    fn classify(&mut self, features: &[f32]) -> Result<usize, ClassifyError> {
        assert_eq!(features.len(), 42);
        Ok(self.0)
    }
}

fn app_with(detector: Box<dyn HandDetector>, class: usize, timeout: Duration) -> axum::Router {
    let labels = Arc::new(GestureLabels::new(vec![
        "Open".to_string(),
        "Close".to_string(),
        "Pointer".to_string(),
    ]));
    let pipeline = Pipeline::new(detector, Box::new(FixedClass(class)), labels);
    router(AppState::new(WorkerPool::new(vec![pipeline]), timeout))
}

fn app(class: usize) -> axum::Router {
    app_with(Box::new(MarkerDetector), class, Duration::from_secs(10))
}

/// A PNG whose top-right pixel is white, which lands top-left once the frame is mirrored.
fn frame_base64(with_hand: bool) -> String {
    let mut image = RgbImage::new(64, 48);
    if with_hand {
        image.put_pixel(63, 0, image::Rgb([255, 255, 255]));
    }
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    BASE64_STANDARD.encode(buf.into_inner())
}

async fn post_json(app: axum::Router, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/process-image")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn process(app: axum::Router, base64_image: &str) -> (StatusCode, Value) {
    post_json(app, json!({ "base64_image": base64_image }).to_string()).await
}

#[tokio::test]
async fn root_reports_liveness() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(0).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "Gesture recognition server is running" }));
}

#[tokio::test]
async fn non_base64_payload_is_bad_request() {
    let (status, body) = process(app(0), "definitely not base64 ###").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn base64_that_is_not_an_image_is_bad_request() {
    let payload = BASE64_STANDARD.encode(b"just some text");
    let (status, body) = process(app(0), &payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn frame_without_hand() {
    let (status, body) = process(app(1), &frame_base64(false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "gesture": "No hand" }));
}

#[tokio::test]
async fn frame_with_known_gesture() {
    let (status, body) = process(app(1), &frame_base64(true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "gesture": "Close" }));
}

#[tokio::test]
async fn data_uri_prefix_is_accepted() {
    let payload = format!("data:image/png;base64,{}", frame_base64(true));
    let (status, body) = process(app(2), &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "gesture": "Pointer" }));
}

#[tokio::test]
async fn class_index_past_label_table_is_unknown() {
    let (status, body) = process(app(3), &frame_base64(true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "gesture": "Unknown" }));
}

#[tokio::test]
async fn pipeline_failure_is_server_error_with_message() {
    let app = app_with(Box::new(BrokenDetector), 0, Duration::from_secs(10));
    let (status, body) = process(app, &frame_base64(true)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "unexpected detector output: palm boxes have shape [1, 3]" })
    );
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (status, body) = post_json(app(0), r#"{"image": "abc"}"#.to_string()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn slow_inference_times_out() {
    let app = app_with(Box::new(SlowDetector), 0, Duration::from_millis(20));
    let (status, body) = process(app, &frame_base64(true)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("did not finish"));
}
