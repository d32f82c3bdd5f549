use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, GrayImage, ImageEncoder as _, Luma, Rgba, RgbaImage};

use crate::canvas::Canvas;
use crate::foundation::error::CaptchaResult;
use crate::fx::convolve::{GAUSSIAN_3X3, convolve3x3};

/// Unsharp-mask settings for the OCR probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProbeOptions {
    /// Gain applied to `original - blurred`.
    pub amount: i32,
    /// Minimum per-channel difference before a channel is sharpened; `0` sharpens all.
    pub threshold: i32,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            amount: 80,
            threshold: 3,
        }
    }
}

/// High-pass sharpen against a 3x3 Gaussian blur. Alpha is kept.
pub fn unsharp_mask(image: &RgbaImage, opts: ProbeOptions) -> RgbaImage {
    let blurred = convolve3x3(image, &GAUSSIAN_3X3);
    let mut out = image.clone();
    for (px, blur) in out.pixels_mut().zip(blurred.pixels()) {
        let Rgba(orig) = *px;
        for c in 0..3 {
            let diff = i32::from(orig[c]) - i32::from(blur.0[c]);
            if opts.threshold <= 0 || diff.abs() >= opts.threshold {
                px.0[c] = (opts.amount * diff + i32::from(orig[c])).clamp(0, 255) as u8;
            }
        }
    }
    out
}

/// Luma with `0.3 R + 0.59 G + 0.11 B`, truncated.
pub fn to_luma(image: &RgbaImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (dst, src) in gray.pixels_mut().zip(image.pixels()) {
        let [r, g, b, _] = src.0;
        let l = 0.3 * f64::from(r) + 0.59 * f64::from(g) + 0.11 * f64::from(b);
        *dst = Luma([l.clamp(0.0, 255.0) as u8]);
    }
    gray
}

/// Grayscale, sharpened copy of the canvas that OCR engines get to see.
pub fn probe_image(canvas: &Canvas, opts: ProbeOptions) -> GrayImage {
    to_luma(&unsharp_mask(canvas.image(), opts))
}

/// Binary portable graymap (`P5`, max value 255).
pub fn encode_pgm(gray: &GrayImage) -> CaptchaResult<Vec<u8>> {
    let mut buf = Vec::new();
    PnmEncoder::new(&mut buf)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(
            gray.as_raw(),
            gray.width(),
            gray.height(),
            ExtendedColorType::L8,
        )
        .context("encode pgm probe")?;
    Ok(buf)
}

/// Write the probe of `canvas` to a uniquely named `captcha*.pgm` temporary in `dir`.
///
/// The file is deleted when the returned handle drops.
pub fn write_probe(
    canvas: &Canvas,
    opts: ProbeOptions,
    dir: &Path,
) -> CaptchaResult<tempfile::NamedTempFile> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create probe directory '{}'", dir.display()))?;
    let pgm = encode_pgm(&probe_image(canvas, opts))?;
    let mut file = tempfile::Builder::new()
        .prefix("captcha")
        .suffix(".pgm")
        .tempfile_in(dir)
        .with_context(|| format!("create probe file in '{}'", dir.display()))?;
    file.write_all(&pgm).context("write pgm probe")?;
    file.flush().context("flush pgm probe")?;
    Ok(file)
}

#[cfg(test)]
#[path = "../../tests/unit/ocr/probe.rs"]
mod tests;
