// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection for uploaded plant images
//!
//! Components:
//! - `preprocessing` - Letterbox resize and NCHW tensor layout
//! - `postprocess` - Output decoding and non-maximum suppression
//! - `labels` - Class name resolution
//! - `model` - ONNX Runtime backed detector

pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocessing;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use labels::ClassLabels;
pub use model::{YoloConfig, YoloDetector};
pub use postprocess::{iou, non_max_suppression};
pub use preprocessing::{letterbox, LetterboxInfo};

/// Default minimum confidence for a detection to be reported
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default IoU above which overlapping boxes of one class are merged
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// One object found in an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the class in the model's output
    #[serde(skip)]
    pub class_id: usize,
    /// Human readable class label
    #[serde(rename = "class")]
    pub class_name: String,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box corners `[x1, y1, x2, y2]` in original image pixels
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
}

impl Detection {
    pub fn new(class_id: usize, class_name: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    pub fn width(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bbox[3] - self.bbox[1]).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Confidence and overlap thresholds applied by a detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confidence: f32,
    pub iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            iou: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(confidence: f32, iou: f32) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            iou: iou.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Detection model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("Detection inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output shape: {0:?}")]
    OutputShape(Vec<usize>),

    #[error("Detection session lock poisoned")]
    SessionPoisoned,

    #[error("Failed to read labels: {0}")]
    Labels(String),
}

/// An object detector that can be shared across request handlers
///
/// Implementations must be safe to call from several blocking workers at
/// once; the ONNX backed detector serialises access to its session.
pub trait Detector: Send + Sync {
    /// Detect objects in `image`, sorted by confidence (highest first)
    fn detect(
        &self,
        image: &DynamicImage,
        thresholds: Thresholds,
    ) -> Result<Vec<Detection>, DetectionError>;
}

/// Pick the detection used for the metadata lookup
///
/// The most confident detection wins; on a tie the earliest one is kept.
pub fn primary_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best: Option<&Detection>, d| match best {
        Some(b) if b.confidence >= d.confidence => Some(b),
        _ => Some(d),
    })
}
