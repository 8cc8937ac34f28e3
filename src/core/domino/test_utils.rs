//! Synthetic frames for unit tests.

use image::{Rgb, RgbImage};

use super::filter::TileRegion;
use super::frame::Frame;

const PIP_LAYOUTS: [&[(i32, i32)]; 7] = [
    &[],
    &[(0, 0)],
    &[(-1, -1), (1, 1)],
    &[(-1, -1), (0, 0), (1, 1)],
    &[(-1, -1), (-1, 1), (1, -1), (1, 1)],
    &[(-1, -1), (-1, 1), (0, 0), (1, -1), (1, 1)],
    &[(-1, -1), (-1, 0), (-1, 1), (1, -1), (1, 0), (1, 1)],
];

/// White square with black pips in the classic 0-6 layouts.
pub fn render_half(value: u32, size: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));
    let center = (size / 2) as i32;
    let radius = (size / 12) as i32;
    let spacing = (size / 4) as i32;

    for &(dx, dy) in PIP_LAYOUTS[value as usize] {
        let cx = center + dx * spacing;
        let cy = center + dy * spacing;
        for y in (cy - radius)..=(cy + radius) {
            for x in (cx - radius)..=(cx + radius) {
                let inside = (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius;
                if inside && x >= 0 && y >= 0 && x < size as i32 && y < size as i32 {
                    image.put_pixel(x as u32, y as u32, Rgb([0, 0, 0]));
                }
            }
        }
    }
    image
}

pub fn solid_frame(width: u32, height: u32, fill: u8) -> Frame {
    Frame::new(width, height, vec![fill; (width * height * 3) as usize], 0, 0)
}

/// White frame with a horizontal `value1|value2` tile whose top-left corner is at (x, y).
pub fn frame_with_tile(
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    half_size: u32,
    value1: u32,
    value2: u32,
) -> Frame {
    let mut frame = solid_frame(width, height, 255);
    for (offset, value) in [(0, value1), (half_size, value2)] {
        let half = render_half(value, half_size);
        for (hx, hy, pixel) in half.enumerate_pixels() {
            let fx = x + offset + hx;
            let fy = y + hy;
            if fx < width && fy < height {
                let idx = ((fy * width + fx) * 3) as usize;
                frame.data[idx..idx + 3].copy_from_slice(&pixel.0);
            }
        }
    }
    frame
}

pub fn region(x: f32, y: f32, width: f32, height: f32) -> TileRegion {
    TileRegion {
        x,
        y,
        width,
        height,
        confidence: 0.9,
        class_id: 0,
    }
}
