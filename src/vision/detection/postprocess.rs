// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression

use std::cmp::Ordering;

use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};

use super::{ClassLabels, Detection, DetectionError};

/// Upper bound on detections returned for one image
pub const MAX_DETECTIONS: usize = 300;

/// Decode a raw YOLOv8 output tensor into candidate detections
///
/// The tensor is `[1, 4 + C, N]` (the exporter default) or the transposed
/// `[1, N, 4 + C]`. Each candidate holds `cx, cy, w, h` followed by one score
/// per class. Boxes are returned as `[x1, y1, x2, y2]` in model input space.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
    labels: &ClassLabels,
) -> Result<Vec<Detection>, DetectionError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectionError::OutputShape(shape));
    }

    let predictions = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|_| DetectionError::OutputShape(shape.clone()))?;

    // Attributes run along the shorter axis: 4 + C is far below the anchor count
    let predictions: ArrayView2<f32> = if shape[1] <= shape[2] {
        predictions
    } else {
        predictions.reversed_axes()
    };

    let num_attributes = predictions.nrows();
    if num_attributes < 5 {
        return Err(DetectionError::OutputShape(shape));
    }

    let mut detections = Vec::new();
    for candidate in predictions.columns() {
        let (class_id, score) = candidate
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::MIN), |best, (id, &score)| {
                if score > best.1 {
                    (id, score)
                } else {
                    best
                }
            });

        if score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (candidate[0], candidate[1], candidate[2], candidate[3]);
        detections.push(Detection::new(
            class_id,
            labels.name(class_id),
            score,
            [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
        ));
    }

    Ok(detections)
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Class-aware greedy non-maximum suppression
///
/// Detections are visited in descending confidence order; one is dropped
/// when it overlaps an already kept detection of the same class by more
/// than `iou_threshold`. The result is sorted by confidence, highest first,
/// and holds at most [`MAX_DETECTIONS`] entries.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= MAX_DETECTIONS {
            break;
        }

        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });

        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}
