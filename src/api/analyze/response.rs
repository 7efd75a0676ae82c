// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis response types

use serde::{Deserialize, Serialize};

use crate::plants::PlantInfo;
use crate::vision::Detection;

/// Response from image analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Uploaded image re-encoded as a JPEG data URI
    pub original_image: String,
    /// Image with detections drawn, as a JPEG data URI
    pub result_image: String,
    /// Detections sorted by confidence, highest first
    pub detections: Vec<Detection>,
    /// Record for the most confident detection's class, null if unknown
    pub plant_info: Option<PlantInfo>,
}

impl AnalysisResponse {
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }
}
