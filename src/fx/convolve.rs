use image::{Rgba, RgbaImage};

/// 3x3 kernel applied as `sum(k * px) / divisor + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kernel3 {
    pub weights: [[f32; 3]; 3],
    pub divisor: f32,
    pub offset: f32,
}

/// Gaussian blur used by the OCR probe.
pub const GAUSSIAN_3X3: Kernel3 = Kernel3 {
    weights: [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]],
    divisor: 16.0,
    offset: 0.0,
};

/// Quick edge detector; flat regions map to mid gray.
pub const EDGE_DETECT_3X3: Kernel3 = Kernel3 {
    weights: [[-1.0, 0.0, -1.0], [0.0, 4.0, 0.0], [-1.0, 0.0, -1.0]],
    divisor: 1.0,
    offset: 127.0,
};

/// Convolve the RGB channels with edge clamping. Alpha is copied from the source.
///
/// Results are clamped to `[0, 255]` and truncated.
pub fn convolve3x3(src: &RgbaImage, kernel: &Kernel3) -> RgbaImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as i64, height as i64);
    let mut dst = RgbaImage::new(width, height);

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (j, row) in kernel.weights.iter().enumerate() {
                let sy = (y - 1 + j as i64).clamp(0, h - 1) as u32;
                for (i, &k) in row.iter().enumerate() {
                    if k == 0.0 {
                        continue;
                    }
                    let sx = (x - 1 + i as i64).clamp(0, w - 1) as u32;
                    let px = src.get_pixel(sx, sy);
                    for c in 0..3 {
                        acc[c] += k * f32::from(px.0[c]);
                    }
                }
            }
            let alpha = src.get_pixel(x as u32, y as u32).0[3];
            let ch = |v: f32| (v / kernel.divisor + kernel.offset).clamp(0.0, 255.0) as u8;
            dst.put_pixel(
                x as u32,
                y as u32,
                Rgba([ch(acc[0]), ch(acc[1]), ch(acc[2]), alpha]),
            );
        }
    }
    dst
}

#[cfg(test)]
#[path = "../../tests/unit/fx/convolve.rs"]
mod tests;
