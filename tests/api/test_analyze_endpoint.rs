// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /api/analyze
//!
//! These tests drive the full router in-process with a mocked detector and
//! verify that:
//! - Uploads are validated before any detection runs
//! - Detections, images and plant info come back in the documented shape
//! - Staged uploads never outlive their request
//! - Processing failures are reported without leaking detail

use axum::http::{header, StatusCode};
use plant_vision::vision::{decode_data_uri, decode_image_bytes, Detection, DetectionError};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use image::{GenericImageView, ImageFormat};

use super::support::{
    analyze_request, app_with, app_with_limit, jpeg_bytes, json_body, rgba_bytes, staged_files,
    MockDetector, Part,
};

fn detector_returning(detections: Vec<Detection>) -> MockDetector {
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .times(1)
        .returning(move |_, _| Ok(detections.clone()));
    detector
}

fn detector_never_called() -> MockDetector {
    let mut detector = MockDetector::new();
    detector.expect_detect().never();
    detector
}

// =============================================================================
// Successful analysis
// =============================================================================

#[tokio::test]
async fn test_monstera_detection_returns_plant_info() {
    let dir = TempDir::new().unwrap();
    let app = app_with(
        detector_returning(vec![Detection::new(
            0,
            "monstera",
            0.87,
            [10.0, 20.0, 200.0, 220.0],
        )]),
        dir.path(),
    );

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(320, 240))]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0]["class"], "monstera");
    assert!((detections[0]["confidence"].as_f64().unwrap() - 0.87).abs() < 1e-6);
    assert_eq!(
        detections[0]["box"],
        serde_json::json!([10.0, 20.0, 200.0, 220.0])
    );

    assert_eq!(json["plant_info"]["name"], "Monstera Deliciosa");
    assert_eq!(json["plant_info"]["scientificName"], "Monstera deliciosa");
    assert_eq!(json["plant_info"]["careInstructions"]["soil"], "Well-draining potting mix");

    assert!(json["original_image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert!(json["result_image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));

    assert_eq!(staged_files(dir.path()), 0, "staged upload was not removed");
}

#[tokio::test]
async fn test_original_image_round_trips_dimensions() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_returning(vec![]), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpeg", jpeg_bytes(123, 77))]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    for key in ["original_image", "result_image"] {
        let bytes = decode_data_uri(json[key].as_str().unwrap()).unwrap();
        let (image, _) = decode_image_bytes(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (123, 77), "{}", key);
    }
}

/// Decode a returned data URI, checking it is a JPEG of the given size
fn returned_image(json: &serde_json::Value, key: &str, size: (u32, u32)) -> image::DynamicImage {
    let bytes = decode_data_uri(json[key].as_str().unwrap()).unwrap();
    let (image, info) = decode_image_bytes(&bytes).unwrap();
    assert_eq!(info.format, ImageFormat::Jpeg, "{}", key);
    assert_eq!(image.dimensions(), size, "{}", key);
    image
}

#[tokio::test]
async fn test_png_with_alpha_is_flattened_to_jpeg() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_returning(vec![]), dir.path());
    let png = rgba_bytes(40, 24, [200, 30, 30, 128], ImageFormat::Png);

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.png", png)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    for key in ["original_image", "result_image"] {
        let image = returned_image(&json, key, (40, 24));
        let pixel = image.to_rgb8().get_pixel(20, 12).0;
        // Colour channels survive, alpha is dropped
        assert!(pixel[0] > 170 && pixel[1] < 60 && pixel[2] < 60, "{:?}", pixel);
    }
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_gif_upload_is_analyzed() {
    let dir = TempDir::new().unwrap();
    let app = app_with(
        detector_returning(vec![Detection::new(0, "monstera", 0.7, [2.0, 2.0, 20.0, 20.0])]),
        dir.path(),
    );
    let gif = rgba_bytes(32, 32, [30, 160, 60, 255], ImageFormat::Gif);

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.gif", gif)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    returned_image(&json, "original_image", (32, 32));
    returned_image(&json, "result_image", (32, 32));
    assert_eq!(json["plant_info"]["name"], "Monstera Deliciosa");
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_long_filename_is_accepted() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_returning(vec![]), dir.path());
    let filename = format!("{}.jpg", "a".repeat(300));

    let response = app
        .oneshot(analyze_request(&[Part::file(&filename, jpeg_bytes(32, 32))]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_no_detections_has_null_plant_info() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_returning(vec![]), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.png", jpeg_bytes(64, 64))]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["detections"], serde_json::json!([]));
    assert!(json["plant_info"].is_null());
}

#[tokio::test]
async fn test_unknown_class_has_null_plant_info() {
    let dir = TempDir::new().unwrap();
    let app = app_with(
        detector_returning(vec![Detection::new(4, "orchid", 0.91, [1.0, 1.0, 30.0, 30.0])]),
        dir.path(),
    );

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(64, 64))]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["detections"][0]["class"], "orchid");
    assert!(json["plant_info"].is_null());
}

#[tokio::test]
async fn test_plant_info_follows_most_confident_detection() {
    let dir = TempDir::new().unwrap();
    let app = app_with(
        detector_returning(vec![
            Detection::new(1, "pothos", 0.55, [0.0, 0.0, 20.0, 20.0]),
            Detection::new(0, "monstera", 0.92, [5.0, 5.0, 60.0, 60.0]),
        ]),
        dir.path(),
    );

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(64, 64))]))
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["detections"][0]["class"], "monstera");
    assert_eq!(json["detections"][1]["class"], "pothos");
    assert_eq!(json["plant_info"]["name"], "Monstera Deliciosa");
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_returning(vec![]), dir.path());

    let response = app
        .oneshot(analyze_request(&[
            Part::text("note", "from the kitchen window"),
            Part::file("leaf.jpg", jpeg_bytes(32, 32)),
            Part::file("second.txt", b"ignored".to_vec()),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_uploads_with_same_name() {
    let dir = TempDir::new().unwrap();
    let mut detector = MockDetector::new();
    detector.expect_detect().times(2).returning(|_, _| Ok(vec![]));
    let app = app_with(detector, dir.path());

    let (first, second) = tokio::join!(
        app.clone()
            .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(40, 30))])),
        app.clone()
            .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(30, 40))])),
    );

    let first = json_body(first.unwrap()).await;
    let second = json_body(second.unwrap()).await;

    let dims = |json: &serde_json::Value| {
        let bytes = decode_data_uri(json["original_image"].as_str().unwrap()).unwrap();
        let (image, _) = decode_image_bytes(&bytes).unwrap();
        (image.width(), image.height())
    };
    assert_eq!(dims(&first), (40, 30));
    assert_eq!(dims(&second), (30, 40));
    assert_eq!(staged_files(dir.path()), 0);
}

// =============================================================================
// Validation failures
// =============================================================================

#[tokio::test]
async fn test_disallowed_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file("notes.txt", b"hello".to_vec())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "File type not allowed");
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_file_part_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::text("image", "leaf.jpg")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "No file part");
}

#[tokio::test]
async fn test_file_field_without_filename_is_missing() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::text("file", "just text")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file part");
}

#[tokio::test]
async fn test_empty_filename_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file("", Vec::new())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No selected file");
}

#[tokio::test]
async fn test_corrupt_image_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file(
            "leaf.jpg",
            b"definitely not a jpeg".to_vec(),
        )]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Invalid image"));
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"file": "leaf.jpg"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with_limit(detector_never_called(), dir.path(), 1024);

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpg", vec![0xAB; 8 * 1024])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(staged_files(dir.path()), 0);
}

// =============================================================================
// Processing failures
// =============================================================================

#[tokio::test]
async fn test_detector_failure_returns_opaque_error() {
    let dir = TempDir::new().unwrap();
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .times(1)
        .returning(|_, _| Err(DetectionError::Inference("output tensor missing".to_string())));
    let app = app_with(detector, dir.path());

    let response = app
        .oneshot(analyze_request(&[Part::file("leaf.jpg", jpeg_bytes(48, 48))]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!({"error": "Failed to process image"}));
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let dir = TempDir::new().unwrap();
    let app = app_with(detector_never_called(), dir.path());

    let mut request = analyze_request(&[Part::file("notes.txt", b"x".to_vec())]);
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
