// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws detection boxes and labels onto a copy of the analysed image

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::vision::detection::Detection;

/// Box colours, cycled by class id
pub const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Failed to read font {path}: {source}")]
    FontIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid font file: {0}")]
    InvalidFont(String),
}

/// Colour used for a class id
pub fn color_for_class(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Box outline width for an image, in pixels
pub fn line_width(width: u32, height: u32) -> u32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as u32).max(2)
}

/// Renders detections onto images
///
/// Label text needs a TrueType font; without one the banners are left blank.
#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// Build an annotator that labels boxes using the font at `path`
    pub fn from_font_file(path: &Path) -> Result<Self, AnnotateError> {
        let bytes = std::fs::read(path).map_err(|source| AnnotateError::FontIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_font_bytes(bytes)
    }

    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self, AnnotateError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| AnnotateError::InvalidFont(e.to_string()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Return an RGB copy of `image` with every detection drawn on it
    pub fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return canvas;
        }

        let thickness = line_width(width, height);

        for detection in detections {
            // Zero-width, zero-height and inverted boxes have nothing to outline
            if detection.area() <= 0.0 {
                continue;
            }

            let color = color_for_class(detection.class_id);
            let [x1, y1, x2, y2] = detection.bbox;

            let left = (x1.round() as i32).clamp(0, width as i32 - 1);
            let top = (y1.round() as i32).clamp(0, height as i32 - 1);
            let right = (x2.round() as i32).clamp(left + 1, width as i32);
            let bottom = (y2.round() as i32).clamp(top + 1, height as i32);

            // Concentric outlines, growing inwards
            for i in 0..thickness as i32 {
                let w = right - left - 2 * i;
                let h = bottom - top - 2 * i;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(left + i, top + i).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            draw_label(&mut canvas, self.font.as_ref(), detection, left, top, thickness, color);
        }

        canvas
    }
}

fn draw_label(
    canvas: &mut RgbImage,
    font: Option<&FontVec>,
    detection: &Detection,
    left: i32,
    top: i32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let label = format!("{} {:.2}", detection.class_name, detection.confidence);
    let scale = PxScale::from((thickness as f32 * 6.0).max(14.0));
    let (text_w, text_h) = match font {
        Some(font) => text_size(scale, font, &label),
        None => (
            (label.chars().count() as f32 * scale.x * 0.5).round() as u32,
            scale.y.round() as u32,
        ),
    };

    let banner_w = text_w + 4;
    let banner_h = text_h + 4;

    // Above the box when there is room, otherwise just inside it
    let banner_top = if top >= banner_h as i32 {
        top - banner_h as i32
    } else {
        top
    };

    draw_filled_rect_mut(
        canvas,
        Rect::at(left, banner_top).of_size(banner_w, banner_h),
        color,
    );
    if let Some(font) = font {
        draw_text_mut(canvas, TEXT_COLOR, left + 2, banner_top + 2, scale, font, &label);
    }
}
