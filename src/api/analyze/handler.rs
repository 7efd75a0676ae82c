// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis endpoint handler

use std::time::Instant;

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::pipeline::AnalyzeError;
use super::request::read_upload;
use super::response::AnalysisResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /api/analyze - Detect plants in an uploaded image
///
/// # Request
/// Multipart form with the image in the `file` field. The filename must end
/// in png, jpg, jpeg or gif.
///
/// # Response
/// - `original_image`: Uploaded image as a JPEG data URI
/// - `result_image`: Image with boxes drawn, as a JPEG data URI
/// - `detections`: `{class, confidence, box}` entries, most confident first
/// - `plant_info`: Record for the most confident class, or null
///
/// # Errors
/// - 400 Bad Request: Missing file, empty filename, disallowed type, undecodable image
/// - 413 Payload Too Large: Body over the configured limit
/// - 500 Internal Server Error: Processing failed (detail is only logged)
pub async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    let multipart = multipart.map_err(|e| {
        warn!("[{}] Rejected multipart request: {}", request_id, e);
        ApiError::InvalidRequest(e.to_string())
    })?;

    // 1. Extract and validate the upload
    let upload = read_upload(multipart).await.map_err(|e| {
        warn!("[{}] Upload rejected: {}", request_id, e);
        e
    })?;

    if let Err(e) = upload.validate() {
        warn!("[{}] Upload validation failed: {}", request_id, e);
        return Err(e.into());
    }

    debug!(
        "[{}] Received {} ({} bytes)",
        request_id,
        upload.filename,
        upload.bytes.len()
    );

    // 2. Run the CPU-bound pipeline off the async workers
    let started = Instant::now();
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.analyze(&upload))
        .await
        .map_err(|e| {
            error!("[{}] Analysis worker failed: {}", request_id, e);
            ApiError::InternalError(e.to_string())
        })?;

    let response = result.map_err(|e| {
        match &e {
            AnalyzeError::InvalidImage(_) => warn!("[{}] {}", request_id, e),
            _ => error!("[{}] Analysis failed: {}", request_id, e),
        }
        ApiError::from(e)
    })?;

    info!(
        "[{}] Analysis complete: {} detections, plant_info: {}, {}ms",
        request_id,
        response.detection_count(),
        response
            .plant_info
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("none"),
        started.elapsed().as_millis()
    );

    Ok(Json(response))
}
