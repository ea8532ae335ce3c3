// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Box drawing for the annotated response image

use image::{DynamicImage, Rgb, RgbImage};

use super::detector::Detection;

/// Box colors, cycled by class id
const PALETTE: [[u8; 3]; 8] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 140, 255],
    [146, 204, 23],
];

const BOX_THICKNESS: u32 = 3;

/// Draw each detection's bounding box onto a copy of the input image
pub fn annotate(image: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for detection in detections {
        let x1 = detection.xmin.round().max(0.0) as u32;
        let y1 = detection.ymin.round().max(0.0) as u32;
        let x2 = detection.xmax.round().max(0.0) as u32;
        let y2 = detection.ymax.round().max(0.0) as u32;
        draw_rectangle(&mut canvas, x1, y1, x2, y2, color_for_class(detection.class_id));
    }

    canvas
}

fn color_for_class(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draw a hollow rectangle, clipping at the image edges
fn draw_rectangle(image: &mut RgbImage, x1: u32, y1: u32, x2: u32, y2: u32, color: Rgb<u8>) {
    // Horizontal edges
    for dy in 0..BOX_THICKNESS {
        let y1_thick = y1.saturating_add(dy);
        let y2_thick = y2.saturating_add(dy);

        for x in x1..=x2 {
            if x < image.width() {
                if y1_thick < image.height() {
                    image.put_pixel(x, y1_thick, color);
                }
                if y2_thick < image.height() {
                    image.put_pixel(x, y2_thick, color);
                }
            }
        }
    }

    // Vertical edges
    for dx in 0..BOX_THICKNESS {
        let x1_thick = x1.saturating_add(dx);
        let x2_thick = x2.saturating_add(dx);

        for y in y1..=y2 {
            if y < image.height() {
                if x1_thick < image.width() {
                    image.put_pixel(x1_thick, y, color);
                }
                if x2_thick < image.width() {
                    image.put_pixel(x2_thick, y, color);
                }
            }
        }
    }
}
