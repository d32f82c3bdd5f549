use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, OutlineCurve, PxScale, ScaleFont, point};
use anyhow::Context as _;
use image::Rgba;
use rand::Rng;
use tiny_skia::{FillRule, Mask, Path as SkPath, PathBuilder, Transform};

use crate::canvas::Canvas;
use crate::foundation::error::{CaptchaError, CaptchaResult};
use crate::phrase::Phrase;

/// Bundled fonts a builder picks from when no font is configured.
pub const FONT_POOL: [&str; 5] = [
    concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSans-Bold.ttf"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSansMono-Bold.ttf"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSerif-Bold.ttf"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSansCondensed-Bold.ttf"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSans.ttf"),
];

// Font sizes are points at 96 dpi.
const PX_PER_PT: f32 = 96.0 / 72.0;

pub fn pick_font<R: Rng + ?Sized>(rng: &mut R) -> PathBuf {
    PathBuf::from(FONT_POOL[rng.random_range(0..FONT_POOL.len())])
}

/// Extent of a laid-out string: advance width and ink height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBox {
    pub width: f32,
    pub height: f32,
}

/// Where one character of the phrase ended up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPlacement {
    pub ch: char,
    pub x: f32,
    /// Baseline, jitter included.
    pub y: f32,
    pub angle_deg: i32,
    pub offset: i32,
    pub advance: f32,
}

/// A loaded outline font.
pub struct GlyphFont {
    path: PathBuf,
    font: FontVec,
}

impl std::fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphFont").field("path", &self.path).finish()
    }
}

impl GlyphFont {
    pub fn load(path: &Path) -> CaptchaResult<Self> {
        if !path.exists() {
            return Err(CaptchaError::missing_file(path));
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| CaptchaError::config(format!("invalid font '{}': {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            font,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn px_scale(&self, size_pt: f32) -> PxScale {
        let em_px = size_pt * PX_PER_PT;
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(em_px * self.font.height_unscaled() / units_per_em)
    }

    /// Advance width and ink height of `text` laid out on one baseline, no kerning.
    pub fn measure(&self, size_pt: f32, text: &str) -> TextBox {
        let scale = self.px_scale(size_pt);
        let scaled = self.font.as_scaled(scale);

        let mut pen = 0.0f32;
        let (mut top, mut bottom) = (f32::MAX, f32::MIN);
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            let glyph = id.with_scale_and_position(scale, point(pen, 0.0));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let b = outlined.px_bounds();
                top = top.min(b.min.y);
                bottom = bottom.max(b.max.y);
            }
            pen += scaled.h_advance(id);
        }
        let height = if top <= bottom {
            bottom - top
        } else {
            scaled.ascent() - scaled.descent()
        };
        TextBox { width: pen, height }
    }

    /// Outline of `ch` in pixels: baseline origin at `(0, 0)`, y pointing down.
    fn glyph_path(&self, ch: char, size_pt: f32) -> Option<SkPath> {
        let scaled = self.font.as_scaled(self.px_scale(size_pt));
        let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
        let outline = self.font.outline(self.font.glyph_id(ch))?;
        let to_px = |p: ab_glyph::Point| (p.x * sx, -p.y * sy);

        let mut pb = PathBuilder::new();
        let mut last: Option<ab_glyph::Point> = None;
        for curve in &outline.curves {
            let start = match curve {
                OutlineCurve::Line(p0, _)
                | OutlineCurve::Quad(p0, _, _)
                | OutlineCurve::Cubic(p0, _, _, _) => *p0,
            };
            if last != Some(start) {
                if last.is_some() {
                    pb.close();
                }
                let (x, y) = to_px(start);
                pb.move_to(x, y);
            }
            last = Some(match *curve {
                OutlineCurve::Line(_, p1) => {
                    let (x, y) = to_px(p1);
                    pb.line_to(x, y);
                    p1
                }
                OutlineCurve::Quad(_, c, p1) => {
                    let ((cx, cy), (x, y)) = (to_px(c), to_px(p1));
                    pb.quad_to(cx, cy, x, y);
                    p1
                }
                OutlineCurve::Cubic(_, c0, c1, p1) => {
                    let ((ax, ay), (bx, by), (x, y)) = (to_px(c0), to_px(c1), to_px(p1));
                    pb.cubic_to(ax, ay, bx, by, x, y);
                    p1
                }
            });
        }
        if last.is_some() {
            pb.close();
        }
        pb.finish()
    }

    /// Rasterize `ch` with its baseline origin at `(x, y)`, rotated counter-clockwise
    /// by `angle_deg` around that origin, blending `color` by glyph coverage.
    ///
    /// Coverage is only computed for the part of the rotated glyph that lies on the
    /// canvas.
    pub fn draw_char(
        &self,
        canvas: &mut Canvas,
        ch: char,
        size_pt: f32,
        (x, y): (f32, f32),
        angle_deg: f32,
        color: Rgba<u8>,
    ) {
        let Some(path) = self.glyph_path(ch, size_pt) else {
            return;
        };
        let placement = Transform::from_rotate(-angle_deg).post_translate(x, y);
        let Some(path) = path.transform(placement) else {
            return;
        };

        let bounds = path.bounds();
        let x0 = bounds.left().floor().max(0.0) as u32;
        let y0 = bounds.top().floor().max(0.0) as u32;
        let x1 = (bounds.right().ceil().max(0.0) as u32).min(canvas.width());
        let y1 = (bounds.bottom().ceil().max(0.0) as u32).min(canvas.height());
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let (mw, mh) = (x1 - x0, y1 - y0);
        let Some(mut mask) = Mask::new(mw, mh) else {
            return;
        };
        mask.fill_path(
            &path,
            FillRule::Winding,
            true,
            Transform::from_translate(-(x0 as f32), -(y0 as f32)),
        );

        for (i, &a) in mask.data().iter().enumerate() {
            if a == 0 {
                continue;
            }
            let cx = x0 + i as u32 % mw;
            let cy = y0 + i as u32 / mw;
            let dst = *canvas.image().get_pixel(cx, cy);
            canvas.set_pixel(cx, cy, blend_over(dst, color, a));
        }
    }
}

/// Straight-alpha "over" of `color` at `coverage/255` onto `dst`.
fn blend_over(dst: Rgba<u8>, color: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    if coverage == 255 {
        return color;
    }
    let a = f32::from(coverage) / 255.0;
    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = a + da * (1.0 - a);
    if out_a <= 0.0 {
        return dst;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (f32::from(color.0[c]) * a + f32::from(dst.0[c]) * da * (1.0 - a)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Lay out the phrase centered on the canvas and draw it glyph by glyph.
///
/// Each glyph gets its own rotation in `[-max_angle, max_angle]` degrees and vertical
/// jitter in `[-max_offset, max_offset]`; the pen advances by the unrotated width, so
/// neighbors may overlap or leave gaps.
pub fn write_phrase<R: Rng + ?Sized>(
    canvas: &mut Canvas,
    rng: &mut R,
    phrase: &Phrase,
    font: &GlyphFont,
    color: Rgba<u8>,
    max_angle: i32,
    max_offset: i32,
) -> Vec<GlyphPlacement> {
    let length = phrase.char_len();
    if length == 0 {
        return Vec::new();
    }

    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let size = ((width / length as f32).round() as i32 - rng.random_range(0..=3) - 1).max(1);
    let size_pt = size as f32;

    let text = font.measure(size_pt, phrase.as_str());
    let mut x = ((width - text.width) / 2.0).round();
    let y = ((height - text.height) / 2.0).round() + size_pt;

    let mut placements = Vec::with_capacity(length);
    for ch in phrase.as_str().chars() {
        let advance = font.measure(size_pt, ch.encode_utf8(&mut [0u8; 4])).width;
        let angle_deg = rng.random_range(-max_angle..=max_angle);
        let offset = rng.random_range(-max_offset..=max_offset);
        let baseline = y + offset as f32;
        font.draw_char(canvas, ch, size_pt, (x, baseline), angle_deg as f32, color);
        placements.push(GlyphPlacement {
            ch,
            x,
            y: baseline,
            angle_deg,
            offset,
            advance,
        });
        x += advance;
    }
    placements
}

#[cfg(test)]
#[path = "../../tests/unit/draw/glyphs.rs"]
mod tests;
