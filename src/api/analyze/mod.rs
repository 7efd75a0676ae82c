// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis endpoint module
//!
//! Provides POST /api/analyze for detecting plants in an uploaded image.

pub mod handler;
pub mod pipeline;
pub mod request;
pub mod response;

pub use handler::analyze_handler;
pub use pipeline::{AnalysisPipeline, AnalyzeError};
pub use request::{allowed_file, read_upload, UploadedFile, ValidationError, ALLOWED_EXTENSIONS};
pub use response::AnalysisResponse;
