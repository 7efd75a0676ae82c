// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request analysis: stage, decode, detect, annotate, encode

use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

use super::request::UploadedFile;
use super::response::AnalysisResponse;
use crate::plants::PlantCatalog;
use crate::storage::{StagingArea, StagingError};
use crate::vision::detection::{primary_detection, Detector, DetectionError, Thresholds};
use crate::vision::image_utils::{decode_image_file, to_jpeg_data_uri, DEFAULT_JPEG_QUALITY};
use crate::vision::{Annotator, ImageError};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Failed to read staged upload: {0}")]
    StagedRead(std::io::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(ImageError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("Failed to encode result: {0}")]
    Encoding(ImageError),
}

/// Shared, immutable state for running analyses
///
/// Built once at startup and handed to every request.
pub struct AnalysisPipeline {
    detector: Arc<dyn Detector>,
    staging: StagingArea,
    annotator: Annotator,
    catalog: PlantCatalog,
    thresholds: Thresholds,
    jpeg_quality: u8,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("staging", &self.staging)
            .field("annotator", &self.annotator)
            .field("catalog_entries", &self.catalog.len())
            .field("thresholds", &self.thresholds)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl AnalysisPipeline {
    pub fn new(detector: Arc<dyn Detector>, staging: StagingArea, catalog: PlantCatalog) -> Self {
        Self {
            detector,
            staging,
            annotator: Annotator::default(),
            catalog,
            thresholds: Thresholds::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Run the full analysis for one validated upload
    ///
    /// Blocking; call from a blocking worker. The staged copy of the upload
    /// is removed before returning, whatever the outcome.
    pub fn analyze(&self, upload: &UploadedFile) -> Result<AnalysisResponse, AnalyzeError> {
        let staged = self.staging.stage(&upload.filename, &upload.bytes)?;

        let (image, info) = decode_image_file(staged.path()).map_err(|e| match e {
            ImageError::Io(io) => AnalyzeError::StagedRead(io),
            other => AnalyzeError::InvalidImage(other),
        })?;
        debug!(
            "Decoded {}: {}x{} {:?}, {} bytes",
            staged.original_name(),
            info.width,
            info.height,
            info.format,
            info.size_bytes
        );

        let mut detections = self.detector.detect(&image, self.thresholds)?;
        // Stable, so equal scores keep detector order
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        debug!("{} detections", detections.len());

        let annotated = DynamicImage::ImageRgb8(self.annotator.annotate(&image, &detections));

        let original_image =
            to_jpeg_data_uri(&image, self.jpeg_quality).map_err(AnalyzeError::Encoding)?;
        let result_image =
            to_jpeg_data_uri(&annotated, self.jpeg_quality).map_err(AnalyzeError::Encoding)?;

        let plant_info = primary_detection(&detections)
            .and_then(|d| self.catalog.lookup(&d.class_name))
            .cloned();

        staged.remove();

        Ok(AnalysisResponse {
            original_image,
            result_image,
            detections,
            plant_info,
        })
    }
}
