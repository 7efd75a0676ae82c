// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration from command line flags and environment

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::vision::detection::preprocessing::DEFAULT_INPUT_SIZE;
use crate::vision::detection::{
    Thresholds, YoloConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD,
};
use crate::vision::image_utils::DEFAULT_JPEG_QUALITY;

/// Default cap on a request body, 16 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Plant vision analysis server
#[derive(Parser, Debug, Clone)]
#[command(name = "plant-vision")]
#[command(version)]
#[command(about = "HTTP service that detects plants in uploaded images", long_about = None)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Directory where uploads are staged during analysis
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// YOLO detection model exported to ONNX
    #[arg(long, env = "MODEL_PATH", default_value = "best.onnx")]
    pub model_path: PathBuf,

    /// Class names file, one per line (defaults to model metadata)
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// JSON file of extra plant records keyed by class name
    #[arg(long, env = "PLANT_CATALOG")]
    pub plant_catalog: Option<PathBuf>,

    /// TrueType font used for box labels
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub iou_threshold: f32,

    /// Square model input size in pixels
    #[arg(long, env = "MODEL_INPUT_SIZE", default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: u32,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// JPEG quality for returned images (1-100)
    #[arg(long, env = "JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 4000,
            upload_dir: PathBuf::from("uploads"),
            model_path: PathBuf::from("best.onnx"),
            labels_path: None,
            plant_catalog: None,
            font_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
            intra_threads: 4,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::invalid(
                "confidence_threshold",
                format!("{} is outside 0.0-1.0", self.confidence_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(ConfigError::invalid(
                "iou_threshold",
                format!("{} is outside 0.0-1.0", self.iou_threshold),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::invalid(
                "jpeg_quality",
                format!("{} is outside 1-100", self.jpeg_quality),
            ));
        }
        if self.input_size == 0 || self.input_size % 32 != 0 {
            return Err(ConfigError::invalid(
                "input_size",
                format!("{} is not a positive multiple of 32", self.input_size),
            ));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::invalid("intra_threads", "must be at least 1"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::invalid("max_upload_bytes", "must be at least 1"));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.confidence_threshold, self.iou_threshold)
    }

    pub fn detector_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            input_size: self.input_size,
            intra_threads: self.intra_threads,
        }
    }
}
