// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection post-processing tests without a model
//!
//! A synthetic YOLO output tensor is pushed through decoding, NMS and
//! letterbox mapping to check the boxes land on original image pixels.

use image::{DynamicImage, RgbImage};
use ndarray::Array3;
use plant_vision::vision::detection::{
    letterbox,
    postprocess::{decode_predictions, non_max_suppression},
    ClassLabels,
};

/// Build a `[1, 4 + C, N]` tensor from `(cx, cy, w, h, scores)` rows
fn yolo_output(candidates: &[(f32, f32, f32, f32, Vec<f32>)], num_anchors: usize) -> Array3<f32> {
    let num_classes = candidates[0].4.len();
    let mut output = Array3::<f32>::zeros((1, 4 + num_classes, num_anchors));
    for (i, (cx, cy, w, h, scores)) in candidates.iter().enumerate() {
        output[[0, 0, i]] = *cx;
        output[[0, 1, i]] = *cy;
        output[[0, 2, i]] = *w;
        output[[0, 3, i]] = *h;
        for (c, score) in scores.iter().enumerate() {
            output[[0, 4 + c, i]] = *score;
        }
    }
    output
}

fn labels() -> ClassLabels {
    ClassLabels::new(vec!["monstera".to_string(), "pothos".to_string()])
}

#[test]
fn test_boxes_map_back_to_original_pixels() {
    // 1280x640 image letterboxed to 640: scale 0.5, 160px bars top and bottom
    let image = DynamicImage::ImageRgb8(RgbImage::new(1280, 640));
    let (_, info) = letterbox(&image, 640);
    assert!((info.scale - 0.5).abs() < 1e-6);
    assert!((info.pad_y - 160.0).abs() < 1e-6);

    let output = yolo_output(&[(320.0, 320.0, 100.0, 50.0, vec![0.9, 0.1])], 32);
    let detections = decode_predictions(output.view().into_dyn(), 0.25, &labels()).unwrap();
    let detections = non_max_suppression(detections, 0.45);

    assert_eq!(detections.len(), 1);
    let bbox = info.to_original(detections[0].bbox);
    let expected = [540.0, 270.0, 740.0, 370.0];
    for (got, want) in bbox.iter().zip(expected) {
        assert!((got - want).abs() < 1e-3, "{:?}", bbox);
    }
}

#[test]
fn test_duplicate_boxes_collapse_per_class() {
    let output = yolo_output(
        &[
            (100.0, 100.0, 80.0, 80.0, vec![0.90, 0.0]),
            (102.0, 101.0, 80.0, 80.0, vec![0.80, 0.0]),
            (101.0, 100.0, 80.0, 80.0, vec![0.0, 0.70]),
            (400.0, 400.0, 50.0, 50.0, vec![0.60, 0.0]),
            (300.0, 300.0, 50.0, 50.0, vec![0.10, 0.05]),
        ],
        64,
    );

    let detections = decode_predictions(output.view().into_dyn(), 0.25, &labels()).unwrap();
    assert_eq!(detections.len(), 4);

    let kept = non_max_suppression(detections, 0.45);
    let summary: Vec<(&str, f32)> = kept
        .iter()
        .map(|d| (d.class_name.as_str(), d.confidence))
        .collect();

    assert_eq!(
        summary,
        vec![("monstera", 0.90), ("pothos", 0.70), ("monstera", 0.60)]
    );
}

#[test]
fn test_detection_is_deterministic() {
    let output = yolo_output(
        &[
            (50.0, 60.0, 20.0, 30.0, vec![0.4, 0.6]),
            (200.0, 210.0, 40.0, 40.0, vec![0.8, 0.2]),
        ],
        16,
    );

    let run = || {
        non_max_suppression(
            decode_predictions(output.view().into_dyn(), 0.25, &labels()).unwrap(),
            0.45,
        )
    };

    assert_eq!(run(), run());
}
