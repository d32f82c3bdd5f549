use image::Rgba;
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use kurbo::Vec2;
use rand::Rng;

use crate::canvas::Canvas;
use crate::foundation::color::RgbColor;

/// One decorative stroke, kept so builds can report what they drew.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (i32, i32),
    pub end: (i32, i32),
    pub thickness: u32,
    pub color: Rgba<u8>,
}

/// Number of lines for one pass: uniform in `[surface/3000, surface/2000]`, capped by
/// a positive `limit`. A zero limit is handled by the caller (the pass is skipped).
pub fn line_budget<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    limit: Option<u32>,
) -> usize {
    let surface = u64::from(width) * u64::from(height);
    let count = rng.random_range(surface / 3000..=surface / 2000) as usize;
    match limit {
        Some(max) if max > 0 => count.min(max as usize),
        _ => count,
    }
}

/// Pick a random segment spanning the canvas.
///
/// Horizontal segments run from the left half to the right half, vertical ones from
/// the top half to the bottom half. Without an explicit `color` the stroke uses
/// `line_color`, or a light random color with channels in `[100, 255]`.
pub fn random_segment<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    color: Option<Rgba<u8>>,
    line_color: Option<RgbColor>,
) -> LineSegment {
    let (w, h) = (width as i32, height as i32);
    let (start, end) = if rng.random_bool(0.5) {
        (
            (rng.random_range(0..=w / 2), rng.random_range(0..=h)),
            (rng.random_range(w / 2..=w), rng.random_range(0..=h)),
        )
    } else {
        (
            (rng.random_range(0..=w), rng.random_range(0..=h / 2)),
            (rng.random_range(0..=w), rng.random_range(h / 2..=h)),
        )
    };
    let color = color.unwrap_or_else(|| {
        line_color
            .unwrap_or_else(|| RgbColor::random(rng, 100..=255))
            .to_rgba()
    });
    LineSegment {
        start,
        end,
        thickness: rng.random_range(1..=3),
        color,
    }
}

pub fn draw_segment(canvas: &mut Canvas, seg: &LineSegment) {
    let a = Vec2::new(f64::from(seg.start.0), f64::from(seg.start.1));
    let b = Vec2::new(f64::from(seg.end.0), f64::from(seg.end.1));
    let dir = b - a;
    let len = dir.hypot();

    if len == 0.0 {
        let (x, y) = seg.start;
        if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
            canvas.set_pixel(x as u32, y as u32, seg.color);
        }
        return;
    }
    if seg.thickness <= 1 {
        draw_line_segment_mut(
            canvas.image_mut(),
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            seg.color,
        );
        return;
    }

    let half = f64::from(seg.thickness) / 2.0;
    let normal = Vec2::new(-dir.y, dir.x) * (half / len);
    let corner = |v: Vec2| Point::new(v.x.round() as i32, v.y.round() as i32);
    let poly = [
        corner(a + normal),
        corner(b + normal),
        corner(b - normal),
        corner(a - normal),
    ];
    if poly[0] == poly[3] {
        draw_line_segment_mut(
            canvas.image_mut(),
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            seg.color,
        );
    } else {
        draw_polygon_mut(canvas.image_mut(), &poly, seg.color);
    }
}

/// Draw one random line and return it.
pub fn draw_line<R: Rng + ?Sized>(
    canvas: &mut Canvas,
    rng: &mut R,
    color: Option<Rgba<u8>>,
    line_color: Option<RgbColor>,
) -> LineSegment {
    let seg = random_segment(rng, canvas.width(), canvas.height(), color, line_color);
    draw_segment(canvas, &seg);
    seg
}

#[cfg(test)]
#[path = "../../tests/unit/draw/lines.rs"]
mod tests;
