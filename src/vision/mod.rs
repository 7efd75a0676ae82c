// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for plant image analysis
//!
//! This module provides:
//! - Object detection with a YOLO model exported to ONNX
//! - Box and label rendering onto the analysed image
//! - Image decoding and JPEG data-URI encoding

pub mod annotate;
pub mod detection;
pub mod image_utils;

pub use annotate::{AnnotateError, Annotator};
pub use detection::{Detection, DetectionError, Detector, Thresholds, YoloConfig, YoloDetector};
pub use image_utils::{
    decode_data_uri, decode_image_bytes, decode_image_file, detect_format, encode_jpeg,
    to_jpeg_data_uri, ImageError, ImageInfo,
};
