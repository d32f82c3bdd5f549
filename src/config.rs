//! Per-build effect configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::color::{BackgroundColor, RgbColor};
use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Options gating each pipeline stage or parameterizing its randomness.
///
/// `None` generally means "pick at random within the documented range". The line
/// limits are special: `Some(0)` suppresses a pass, `None` leaves the count uncapped.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectConfig {
    /// Run the nonlinear warp (requires `apply_effects`).
    pub distort: bool,
    /// Bilinear resampling in the warp; ignored on transparent backgrounds.
    pub interpolate: bool,
    /// Umbrella switch for lines, warp and post effects.
    pub apply_effects: bool,
    pub apply_post_effects: bool,
    pub apply_scatter_effect: bool,
    /// Glyph rotation bound in degrees.
    pub max_angle: i32,
    /// Vertical glyph jitter bound in pixels.
    pub max_offset: i32,
    pub max_lines_behind: Option<u32>,
    pub max_lines_front: Option<u32>,
    pub bg_color: Option<BackgroundColor>,
    pub line_color: Option<RgbColor>,
    pub text_color: Option<RgbColor>,
    /// Image (JPEG, PNG or GIF) used instead of a flat background.
    pub bg_image: Option<PathBuf>,
    /// TrueType/OpenType font; chosen from the bundled pool when unset.
    pub font: Option<PathBuf>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            distort: true,
            interpolate: true,
            apply_effects: true,
            apply_post_effects: true,
            apply_scatter_effect: true,
            max_angle: 8,
            max_offset: 5,
            max_lines_behind: None,
            max_lines_front: None,
            bg_color: None,
            line_color: None,
            text_color: None,
            bg_image: None,
            font: None,
        }
    }
}

impl EffectConfig {
    /// Configuration with every effect switched off: flat background and plain glyphs.
    pub fn plain() -> Self {
        Self {
            apply_effects: false,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> CaptchaResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CaptchaError::config(format!("invalid config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CaptchaResult<Self> {
        if !path.exists() {
            return Err(CaptchaError::missing_file(path));
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> CaptchaResult<()> {
        if !(0..=180).contains(&self.max_angle) {
            return Err(CaptchaError::config(format!(
                "max_angle must be within 0..=180, got {}",
                self.max_angle
            )));
        }
        if self.max_offset < 0 {
            return Err(CaptchaError::config(format!(
                "max_offset must be >= 0, got {}",
                self.max_offset
            )));
        }
        Ok(())
    }

    /// Whether the line pass behind the text runs at all.
    pub fn lines_behind_enabled(&self) -> bool {
        self.apply_effects && self.max_lines_behind != Some(0)
    }

    pub fn lines_front_enabled(&self) -> bool {
        self.apply_effects && self.max_lines_front != Some(0)
    }

    pub fn distort_enabled(&self) -> bool {
        self.apply_effects && self.distort
    }

    pub fn post_effects_enabled(&self) -> bool {
        self.apply_effects && self.apply_post_effects
    }

    /// Interpolation is skipped on transparent canvases.
    pub fn interpolate_enabled(&self) -> bool {
        self.interpolate && !self.bg_color.is_some_and(BackgroundColor::is_transparent)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
