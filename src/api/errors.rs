// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::analyze::{AnalyzeError, ValidationError};

/// Body returned to clients for any failed request
pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to process image";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    ValidationError { field: String, message: String },
    InvalidImage(String),
    InvalidRequest(String),
    PayloadTooLarge(String),
    /// Detail is for logs only; clients get an opaque message
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::InvalidImage(msg) => format!("Invalid image: {}", msg),
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::InternalError(_) => PROCESSING_FAILED_MESSAGE.to_string(),
        };

        ErrorResponse { error }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. }
            | ApiError::InvalidImage(_)
            | ApiError::InvalidRequest(_) => 400,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::ValidationError {
            field: "file".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::InvalidRequest(err.body_text())
        }
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        match err {
            AnalyzeError::InvalidImage(e) => ApiError::InvalidImage(e.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
