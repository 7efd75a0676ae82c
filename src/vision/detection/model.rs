// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 detection model running on ONNX Runtime
//!
//! The model is loaded once at startup and shared by every request. It runs
//! on CPU only; calls are serialised through a mutex around the session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info, warn};

use super::labels::NAMES_METADATA_KEY;
use super::postprocess::{decode_predictions, non_max_suppression};
use super::preprocessing::{preprocess_for_detection, DEFAULT_INPUT_SIZE};
use super::{ClassLabels, Detection, DetectionError, Detector, Thresholds};

/// Configuration for loading a YOLO detection model
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Optional labels file overriding the names embedded in the model
    pub labels_path: Option<PathBuf>,
    /// Square input size the model was exported with
    pub input_size: u32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("best.onnx"),
            labels_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            intra_threads: 4,
        }
    }
}

/// YOLO object detector
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square input size
    input_size: u32,
    /// Class names
    labels: ClassLabels,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("classes", &self.labels.len())
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a YOLO detection model
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The labels file cannot be read
    pub fn new(config: &YoloConfig) -> Result<Self, DetectionError> {
        let model_path = config.model_path.as_path();

        if !model_path.exists() {
            return Err(DetectionError::ModelNotFound(model_path.display().to_string()));
        }

        info!("Loading detection model from {}", model_path.display());

        // Load ONNX model with CPU-only execution
        let session = Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| load_error(model_path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(model_path, e))?
            .with_intra_threads(config.intra_threads.max(1))
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input shape: {:?}", input.input_type);
        }

        let labels = match config.labels_path.as_deref() {
            Some(path) => ClassLabels::from_file(path)?,
            None => Self::labels_from_metadata(&session, model_path),
        };

        info!(
            "Detection model loaded - input: {}, size: {}, classes: {}",
            input_name,
            config.input_size,
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size: config.input_size,
            labels,
        })
    }

    fn labels_from_metadata(session: &Session, model_path: &Path) -> ClassLabels {
        let names = session
            .metadata()
            .and_then(|metadata| metadata.custom(NAMES_METADATA_KEY))
            .ok()
            .flatten();

        match names.as_deref().and_then(ClassLabels::from_metadata) {
            Some(labels) => labels,
            None => {
                warn!(
                    "No class names in {} metadata, using generated names",
                    model_path.display()
                );
                ClassLabels::default()
            }
        }
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Detector for YoloDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        thresholds: Thresholds,
    ) -> Result<Vec<Detection>, DetectionError> {
        let (input, letterbox) = preprocess_for_detection(image, self.input_size);

        let input_value =
            Value::from_array(input).map_err(|e| DetectionError::Inference(e.to_string()))?;

        let candidates = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| DetectionError::SessionPoisoned)?;

            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .map_err(|e| DetectionError::Inference(e.to_string()))?;

            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| DetectionError::Inference(e.to_string()))?;

            debug!("Detection output shape: {:?}", output_tensor.shape());

            decode_predictions(output_tensor.view(), thresholds.confidence, &self.labels)?
        };

        let mut detections = non_max_suppression(candidates, thresholds.iou);
        for detection in &mut detections {
            detection.bbox = letterbox.to_original(detection.bbox);
        }

        debug!("Detected {} objects", detections.len());

        Ok(detections)
    }
}

fn load_error(model_path: &Path, err: impl std::fmt::Display) -> DetectionError {
    DetectionError::ModelLoad(format!("{}: {}", model_path.display(), err))
}
