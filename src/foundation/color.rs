use std::ops::RangeInclusive;
use std::str::FromStr;

use image::Rgba;
use rand::Rng;

use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Opaque RGB color as accepted by the configuration layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ColorRepr", into = "ColorRepr")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from loosely typed channel values.
    ///
    /// Fails unless there are exactly three channels, each within `0..=255`.
    pub fn from_channels(channels: &[i64]) -> CaptchaResult<Self> {
        let [r, g, b] = channels else {
            return Err(CaptchaError::config(format!(
                "invalid RGB color: expected 3 channels, got {}",
                channels.len()
            )));
        };
        let channel = |v: i64| {
            u8::try_from(v).map_err(|_| {
                CaptchaError::config(format!("invalid RGB channel {v}: must be within 0..=255"))
            })
        };
        Ok(Self::new(channel(*r)?, channel(*g)?, channel(*b)?))
    }

    /// Draw every channel independently and uniformly from `range`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<u8>) -> Self {
        Self {
            r: rng.random_range(range.clone()),
            g: rng.random_range(range.clone()),
            b: rng.random_range(range),
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl FromStr for RgbColor {
    type Err = CaptchaError;

    /// Accepts `#rrggbb`, `#rgb` and `r,g,b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if s.contains(',') {
            let channels = s
                .split(',')
                .map(|part| {
                    part.trim().parse::<i64>().map_err(|_| {
                        CaptchaError::config(format!("invalid RGB channel '{}'", part.trim()))
                    })
                })
                .collect::<CaptchaResult<Vec<_>>>()?;
            return Self::from_channels(&channels);
        }
        Err(CaptchaError::config(format!("invalid color '{s}'")))
    }
}

fn parse_hex(hex: &str) -> CaptchaResult<RgbColor> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => {
            return Err(CaptchaError::config(format!(
                "invalid hex color '#{hex}': expected 3 or 6 digits"
            )));
        }
    };
    let byte = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| CaptchaError::config(format!("invalid hex color '#{hex}'")))
    };
    Ok(RgbColor::new(byte(0)?, byte(2)?, byte(4)?))
}

/// Canvas background: a flat color or full transparency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ColorRepr", into = "ColorRepr")]
pub enum BackgroundColor {
    Transparent,
    Rgb(RgbColor),
}

impl BackgroundColor {
    pub fn is_transparent(self) -> bool {
        matches!(self, Self::Transparent)
    }
}

impl FromStr for BackgroundColor {
    type Err = CaptchaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("transparent") {
            Ok(Self::Transparent)
        } else {
            s.parse().map(Self::Rgb)
        }
    }
}

/// Wire shape of a color in JSON configs.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Channels(Vec<i64>),
    Text(String),
}

impl TryFrom<ColorRepr> for RgbColor {
    type Error = CaptchaError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Channels(c) => Self::from_channels(&c),
            ColorRepr::Text(s) => s.parse(),
        }
    }
}

impl From<RgbColor> for ColorRepr {
    fn from(c: RgbColor) -> Self {
        Self::Channels(vec![i64::from(c.r), i64::from(c.g), i64::from(c.b)])
    }
}

impl TryFrom<ColorRepr> for BackgroundColor {
    type Error = CaptchaError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Channels(c) => RgbColor::from_channels(&c).map(Self::Rgb),
            ColorRepr::Text(s) => s.parse(),
        }
    }
}

impl From<BackgroundColor> for ColorRepr {
    fn from(c: BackgroundColor) -> Self {
        match c {
            BackgroundColor::Transparent => Self::Text("transparent".to_string()),
            BackgroundColor::Rgb(rgb) => rgb.into(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
