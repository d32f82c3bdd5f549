use image::Rgba;
use rand::Rng;

use crate::canvas::Canvas;
use crate::fx::convolve::{EDGE_DETECT_3X3, convolve3x3};

/// Which filters one post-effect pass applied, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostEffectsReport {
    pub scattered: bool,
    pub negated: bool,
    pub edge_detected: bool,
    pub contrast: i32,
    pub colorize: Option<[i32; 3]>,
}

/// Run the randomized filter chain.
///
/// Scatter (p = 3/4, only when `allow_scatter`), negate (1/2), edge detect (1/11,
/// unscattered only), contrast (always, level in `[-50, 10]`), colorize (1/6,
/// unscattered only, offsets in `[-80, 50]`).
pub fn apply_post_effects<R: Rng + ?Sized>(
    canvas: &mut Canvas,
    rng: &mut R,
    allow_scatter: bool,
) -> PostEffectsReport {
    let mut report = PostEffectsReport::default();

    if allow_scatter && rng.random_range(0..=3) != 0 {
        report.scattered = true;
        let background = canvas.background();
        scatter(canvas, rng, 0, 2, &[background]);
    }

    if rng.random_range(0..=1) == 0 {
        report.negated = true;
        negate(canvas);
    }

    if !report.scattered && rng.random_range(0..=10) == 0 {
        report.edge_detected = true;
        edge_detect(canvas);
    }

    report.contrast = rng.random_range(-50..=10);
    contrast(canvas, report.contrast);

    if !report.scattered && rng.random_range(0..=5) == 0 {
        let offsets = [
            rng.random_range(-80..=50),
            rng.random_range(-80..=50),
            rng.random_range(-80..=50),
        ];
        report.colorize = Some(offsets);
        colorize(canvas, offsets);
    }

    tracing::debug!(?report, "post effects applied");
    report
}

/// Swap pixels of the given colors with a random neighbor `[sub, plus)` pixels away
/// (down/right). Pixels of other colors stay put unless a swap moves them.
pub fn scatter<R: Rng + ?Sized>(
    canvas: &mut Canvas,
    rng: &mut R,
    sub: i32,
    plus: i32,
    colors: &[Rgba<u8>],
) {
    if plus <= sub {
        return;
    }
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    for y in 0..h {
        for x in 0..w {
            let dx = x + i64::from(rng.random_range(sub..plus));
            let dy = y + i64::from(rng.random_range(sub..plus));
            if dx < 0 || dy < 0 || dx >= w || dy >= h {
                continue;
            }
            let pixel = canvas.pixel_at(x, y);
            if !colors.contains(&pixel) {
                continue;
            }
            let other = canvas.pixel_at(dx, dy);
            canvas.set_pixel(x as u32, y as u32, other);
            canvas.set_pixel(dx as u32, dy as u32, pixel);
        }
    }
}

fn map_rgb(canvas: &mut Canvas, f: impl Fn(u8) -> u8) {
    for px in canvas.image_mut().pixels_mut() {
        for c in &mut px.0[..3] {
            *c = f(*c);
        }
    }
}

pub fn negate(canvas: &mut Canvas) {
    map_rgb(canvas, |c| 255 - c);
}

pub fn edge_detect(canvas: &mut Canvas) {
    let edges = convolve3x3(canvas.image(), &EDGE_DETECT_3X3);
    *canvas.image_mut() = edges;
}

/// Negative levels raise contrast, positive levels flatten toward mid gray.
pub fn contrast(canvas: &mut Canvas, level: i32) {
    let k = (100.0 - f64::from(level)) / 100.0;
    let k = k * k;
    map_rgb(canvas, |c| {
        let v = ((f64::from(c) / 255.0 - 0.5) * k + 0.5) * 255.0;
        v.round().clamp(0.0, 255.0) as u8
    });
}

pub fn colorize(canvas: &mut Canvas, [dr, dg, db]: [i32; 3]) {
    for px in canvas.image_mut().pixels_mut() {
        for (c, d) in px.0[..3].iter_mut().zip([dr, dg, db]) {
            *c = (i32::from(*c) + d).clamp(0, 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fx/post.rs"]
mod tests;
