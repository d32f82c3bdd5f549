//! Pixel buffer under construction for a single build.

use image::{Rgba, RgbaImage};
use rand::Rng;

use crate::foundation::color::{BackgroundColor, RgbColor};
use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Fully transparent color used when the background is `transparent`.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Opaque pure black. The warp treats it as "no content" and swaps in the background.
pub const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Mutable RGBA canvas plus the two colors every later stage depends on.
///
/// `background` is the fallback returned for out-of-range samples; `text` is set once
/// the glyph color has been chosen and is reused by the front line pass.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
    background: Rgba<u8>,
    text: Option<Rgba<u8>>,
    save_alpha: bool,
}

impl Canvas {
    /// Allocate a zeroed `width x height` canvas.
    pub fn new(width: u32, height: u32) -> CaptchaResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptchaError::config(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            background: OPAQUE_BLACK,
            text: None,
            save_alpha: false,
        })
    }

    /// Adopt a decoded image. The background color is read from its top-left pixel.
    pub fn from_background_image(image: RgbaImage) -> CaptchaResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptchaError::config("background image is empty"));
        }
        let background = *image.get_pixel(0, 0);
        Ok(Self {
            image,
            background,
            text: None,
            save_alpha: false,
        })
    }

    /// Blank canvas of the same size that inherits background, text color and alpha mode.
    pub fn blank_like(&self) -> Self {
        let mut image = RgbaImage::new(self.width(), self.height());
        if self.save_alpha {
            image.pixels_mut().for_each(|p| *p = TRANSPARENT);
        }
        Self {
            image,
            background: self.background,
            text: self.text,
            save_alpha: self.save_alpha,
        }
    }

    /// Flat-fill the canvas and record the fill as background color.
    ///
    /// `None` picks a light color, each channel uniform in `[200, 255]`.
    pub fn fill<R: Rng + ?Sized>(&mut self, color: Option<BackgroundColor>, rng: &mut R) {
        let code = match color {
            Some(BackgroundColor::Transparent) => {
                self.save_alpha = true;
                TRANSPARENT
            }
            Some(BackgroundColor::Rgb(rgb)) => rgb.to_rgba(),
            None => RgbColor::random(rng, 200..=255).to_rgba(),
        };
        self.background = code;
        self.image.pixels_mut().for_each(|p| *p = code);
    }

    pub fn set_text_color(&mut self, color: RgbColor) -> Rgba<u8> {
        let code = color.to_rgba();
        self.text = Some(code);
        code
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn text_color(&self) -> Option<Rgba<u8>> {
        self.text
    }

    /// Whether the alpha channel must survive encoding (transparent background).
    pub fn save_alpha(&self) -> bool {
        self.save_alpha
    }

    /// Sample at `(x, y)`, returning `fallback` outside `[0,w) x [0,h)`.
    pub fn sample_or(&self, x: i64, y: i64, fallback: Rgba<u8>) -> Rgba<u8> {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return fallback;
        }
        *self.image.get_pixel(x as u32, y as u32)
    }

    /// [`Self::sample_or`] with the background color as fallback.
    pub fn pixel_at(&self, x: i64, y: i64) -> Rgba<u8> {
        self.sample_or(x, y, self.background)
    }

    /// Unconditional write; callers stay in bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.image.put_pixel(x, y, color);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

#[cfg(test)]
#[path = "../tests/unit/canvas/canvas.rs"]
mod tests;
