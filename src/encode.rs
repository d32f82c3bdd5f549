use std::io::{Cursor, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder as _, ImageFormat};

use crate::canvas::Canvas;
use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Quality used when callers have no preference.
pub const DEFAULT_QUALITY: u8 = 90;

/// Container formats a finished captcha can be written as.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gif,
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> CaptchaResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                CaptchaError::unsupported_format(format!(
                    "cannot infer image format from '{}'",
                    path.display()
                ))
            })?;
        ext.parse()
    }
}

impl FromStr for OutputFormat {
    type Err = CaptchaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(CaptchaError::unsupported_format(format!(
                "unknown output format '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Map a `0..=100` quality onto PNG deflate effort.
pub fn png_compression(quality: u8) -> CompressionType {
    match quality {
        0..=3 => CompressionType::Fast,
        4..=8 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode the canvas into `format`.
///
/// JPEG drops alpha and clamps `quality` to `1..=100`. PNG keeps alpha only for
/// canvases with a transparent background. GIF ignores `quality`.
pub fn encode(canvas: &Canvas, quality: u8, format: OutputFormat) -> CaptchaResult<Vec<u8>> {
    let (width, height) = canvas.dimensions();
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.image().clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .context("encode jpeg")?;
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buf,
                png_compression(quality),
                PngFilter::Adaptive,
            );
            if canvas.save_alpha() {
                encoder
                    .write_image(
                        canvas.image().as_raw(),
                        width,
                        height,
                        ExtendedColorType::Rgba8,
                    )
                    .context("encode png")?;
            } else {
                let rgb = DynamicImage::ImageRgba8(canvas.image().clone()).to_rgb8();
                encoder
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .context("encode png")?;
            }
        }
        OutputFormat::Gif => {
            DynamicImage::ImageRgba8(canvas.image().clone())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
                .context("encode gif")?;
        }
    }
    tracing::debug!(%format, quality, bytes = buf.len(), "encoded captcha");
    Ok(buf)
}

/// Encode and stream to `out`.
pub fn write_to<W: Write>(
    canvas: &Canvas,
    quality: u8,
    format: OutputFormat,
    out: &mut W,
) -> CaptchaResult<()> {
    let bytes = encode(canvas, quality, format)?;
    out.write_all(&bytes).context("write encoded captcha")?;
    out.flush().context("flush encoded captcha")?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> CaptchaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Write the canvas to `path`, choosing the format from its extension.
pub fn save(canvas: &Canvas, path: &Path, quality: u8) -> CaptchaResult<()> {
    let format = OutputFormat::from_path(path)?;
    let bytes = encode(canvas, quality, format)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write captcha to '{}'", path.display()))?;
    Ok(())
}

/// `data:<mime>;base64,<payload>` for embedding in markup.
pub fn data_uri(canvas: &Canvas, quality: u8, format: OutputFormat) -> CaptchaResult<String> {
    let bytes = encode(canvas, quality, format)?;
    Ok(format!("data:{};base64,{}", format.mime(), STANDARD.encode(bytes)))
}

#[cfg(test)]
#[path = "../tests/unit/encode/encode.rs"]
mod tests;
