use image::Rgba;
use kurbo::{Point, Vec2};
use rand::Rng;
use rayon::prelude::*;

use crate::canvas::{Canvas, OPAQUE_BLACK};

/// Random inputs of one warp. Fixing them makes [`warp`] fully deterministic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpParams {
    /// Focal point of the radial ripple, anywhere in `[0,w] x [0,h]`.
    pub center: (i32, i32),
    /// Phase of the vertical shear wave, integral in `[0, 10]`.
    pub phase: f64,
    /// Shear amplitude in `[1.1, 1.1 + 1/3]`.
    pub scale: f64,
}

impl WarpParams {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: u32, height: u32) -> Self {
        let center = (
            rng.random_range(0..=width as i32),
            rng.random_range(0..=height as i32),
        );
        let phase = f64::from(rng.random_range(0..=10));
        let scale = 1.1 + f64::from(rng.random_range(0..=10_000)) / 30_000.0;
        Self {
            center,
            phase,
            scale,
        }
    }

    /// Where destination pixel `(x, y)` reads from in the source.
    pub fn source_point(&self, x: u32, y: u32) -> Point {
        let center = Point::new(f64::from(self.center.0), f64::from(self.center.1));
        let v: Vec2 = Point::new(f64::from(x), f64::from(y)) - center;
        let vn = v.hypot();

        let mut n = if vn != 0.0 {
            let vn2 = vn + 4.0 * (vn / 30.0).sin();
            center + v * (vn2 / vn)
        } else {
            center
        };
        n.y += self.scale * (self.phase + n.x * 0.2).sin();
        n
    }
}

/// Per-channel bilinear blend of the four lattice neighbors around a sample.
///
/// `fx`/`fy` are the fractional offsets from `nw`; integral coordinates return `nw`
/// unchanged.
pub fn bilinear(fx: f64, fy: f64, [nw, ne, sw, se]: [Rgba<u8>; 4]) -> Rgba<u8> {
    let (cx, cy) = (1.0 - fx, 1.0 - fy);
    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = cx * f64::from(nw.0[c]) + fx * f64::from(ne.0[c]);
        let bottom = cx * f64::from(sw.0[c]) + fx * f64::from(se.0[c]);
        *slot = (cy * top + fy * bottom).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn sample(src: &Canvas, p: Point, interpolate: bool) -> Rgba<u8> {
    let fallback = src.background();
    if interpolate {
        let (x0, y0) = (p.x.floor(), p.y.floor());
        let (x1, y1) = (p.x.ceil(), p.y.ceil());
        let at = |x: f64, y: f64| src.sample_or(x as i64, y as i64, fallback);
        bilinear(
            p.x - x0,
            p.y - y0,
            [at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1)],
        )
    } else {
        src.sample_or(p.x.round() as i64, p.y.round() as i64, fallback)
    }
}

/// Inverse-map every destination pixel through the ripple and shear field.
///
/// Returns a new canvas of the same size. Interpolation is skipped on transparent
/// canvases. Samples that come out opaque black are replaced by the background.
pub fn warp(src: &Canvas, params: &WarpParams, interpolate: bool) -> Canvas {
    let interpolate = interpolate && !src.save_alpha();
    let background = src.background();
    let mut out = src.blank_like();
    let row_len = out.width() as usize * 4;

    out.image_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let p = params.source_point(x as u32, y as u32);
                let mut color = sample(src, p, interpolate);
                if color == OPAQUE_BLACK {
                    color = background;
                }
                px.copy_from_slice(&color.0);
            }
        });
    out
}

#[cfg(test)]
#[path = "../../tests/unit/fx/warp.rs"]
mod tests;
