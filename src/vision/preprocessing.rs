// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detection

use image::{imageops, DynamicImage};
use ndarray::Array4;

/// Gray value filling the letterbox margins
const PAD_GRAY: u8 = 114;

/// Geometry of an aspect-preserving fit into a square model input.
///
/// Computed once per request and used twice: to place the scaled image
/// inside the input tensor, and to map detections back out of letterbox
/// space into source-image pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    /// Source-to-letterbox scale factor
    pub scale: f32,
    /// Margin columns left of the scaled image
    pub pad_x: u32,
    /// Margin rows above the scaled image
    pub pad_y: u32,
    /// Scaled image width inside the square
    pub scaled_w: u32,
    /// Scaled image height inside the square
    pub scaled_h: u32,
    /// Source image width
    pub source_width: u32,
    /// Source image height
    pub source_height: u32,
}

impl Letterbox {
    /// Fit a `source_width` x `source_height` image into a centered
    /// `target_size` square without distorting its aspect ratio.
    pub fn fit(source_width: u32, source_height: u32, target_size: u32) -> Self {
        // A degenerate source has nothing to place; keep an identity scale
        // so coordinate mapping stays finite
        if source_width == 0 || source_height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0,
                pad_y: 0,
                scaled_w: 0,
                scaled_h: 0,
                source_width,
                source_height,
            };
        }

        let target = target_size as f32;
        let scale = f32::min(target / source_width as f32, target / source_height as f32);
        let scaled_w = ((source_width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_h = ((source_height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            pad_x: (target_size - scaled_w) / 2,
            pad_y: (target_size - scaled_h) / 2,
            scaled_w,
            scaled_h,
            source_width,
            source_height,
        }
    }

    /// Map a letterbox-space coordinate back to source-image space
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Build the model input tensor for an image.
///
/// The image is scaled to fit a `target_size` square, centered over gray
/// margins, and written as an NCHW `[1, 3, H, W]` tensor with pixel values
/// in [0, 1]. Returns the tensor together with the letterbox geometry
/// needed to map detections back to source coordinates.
pub fn preprocess_for_detection(
    image: &DynamicImage,
    target_size: u32,
) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::fit(image.width(), image.height(), target_size);

    let size = target_size as usize;
    let mut tensor = Array4::from_elem((1, 3, size, size), PAD_GRAY as f32 / 255.0);

    if letterbox.scaled_w > 0 && letterbox.scaled_h > 0 {
        let scaled = imageops::resize(
            &image.to_rgb8(),
            letterbox.scaled_w,
            letterbox.scaled_h,
            imageops::FilterType::Triangle,
        );

        for (x, y, pixel) in scaled.enumerate_pixels() {
            let tx = (x + letterbox.pad_x) as usize;
            let ty = (y + letterbox.pad_y) as usize;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    (tensor, letterbox)
}
