use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};

use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Formats accepted as background images.
pub const BACKGROUND_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// Sniff the container from its magic bytes and decode to RGBA8.
///
/// Only JPEG, PNG and GIF are accepted; anything else is
/// [`CaptchaError::UnsupportedFormat`] naming the detected MIME type.
pub fn decode_background(bytes: &[u8]) -> CaptchaResult<RgbaImage> {
    let format = match image::guess_format(bytes) {
        Ok(f) if BACKGROUND_FORMATS.contains(&f) => f,
        Ok(f) => {
            return Err(CaptchaError::unsupported_format(format!(
                "background image type '{}' is not supported",
                f.to_mime_type()
            )));
        }
        Err(_) => {
            return Err(CaptchaError::unsupported_format(
                "background image type could not be detected",
            ));
        }
    };
    let img = image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("decode {format:?} background"))?;
    Ok(img.to_rgba8())
}

/// Read a background image from disk and fit it to `width x height`.
pub fn load_background(path: &Path, width: u32, height: u32) -> CaptchaResult<RgbaImage> {
    if !path.is_file() {
        return Err(CaptchaError::missing_file(path));
    }
    let bytes = std::fs::read(path)
        .with_context(|| format!("read background image '{}'", path.display()))?;
    let img = decode_background(&bytes)?;
    if img.dimensions() == (width, height) {
        return Ok(img);
    }
    tracing::debug!(
        from_w = img.width(),
        from_h = img.height(),
        width,
        height,
        "resizing background image"
    );
    Ok(image::imageops::resize(&img, width, height, FilterType::Triangle))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
