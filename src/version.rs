// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the plant vision service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Full version string with feature description
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"), "-yolo-onnx");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-detection",
    "onnx-runtime-cpu",
    "class-aware-nms",
    "box-annotation",
    "jpeg-data-uri",
    "plant-catalog",
    "multipart-upload",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Plant Vision {}", VERSION_NUMBER)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "features": FEATURES,
    })
}
