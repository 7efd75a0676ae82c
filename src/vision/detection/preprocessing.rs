// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detection

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size of YOLOv8 exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Grey used by the YOLO letterbox for padding
pub const PAD_VALUE: u8 = 114;

/// Scale factor and offsets applied by [`letterbox`]
///
/// Used to map boxes predicted in letterbox space back to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the original image
    pub scale: f32,
    /// Horizontal padding (left edge) in letterbox pixels
    pub pad_x: f32,
    /// Vertical padding (top edge) in letterbox pixels
    pub pad_y: f32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Map a `[x1, y1, x2, y2]` box from letterbox space to original pixels
    ///
    /// The result is clamped to the original image bounds.
    pub fn to_original(&self, bbox: [f32; 4]) -> [f32; 4] {
        let max_x = self.original_width as f32;
        let max_y = self.original_height as f32;
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };

        [
            ((bbox[0] - self.pad_x) / scale).clamp(0.0, max_x),
            ((bbox[1] - self.pad_y) / scale).clamp(0.0, max_y),
            ((bbox[2] - self.pad_x) / scale).clamp(0.0, max_x),
            ((bbox[3] - self.pad_y) / scale).clamp(0.0, max_y),
        ]
    }
}

/// Resize an image onto a square canvas, preserving aspect ratio
///
/// The scaled image is centred and the remaining area is filled with
/// [`PAD_VALUE`] grey.
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));

    if orig_w == 0 || orig_h == 0 {
        let info = LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            original_width: orig_w,
            original_height: orig_h,
        };
        return (canvas, info);
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;
    imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let info = LetterboxInfo {
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
        original_width: orig_w,
        original_height: orig_h,
    };

    (canvas, info)
}

/// Preprocess an image for YOLO detection
///
/// Steps:
/// 1. Letterbox to `input_size` x `input_size`
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &DynamicImage, input_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (canvas, info) = letterbox(image, input_size);
    let size = input_size as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}
