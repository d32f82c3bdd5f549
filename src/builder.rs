//! Orchestration of one captcha build, from background to post effects.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

use crate::assets::decode::load_background;
use crate::canvas::Canvas;
use crate::config::EffectConfig;
use crate::draw::glyphs::{GlyphFont, GlyphPlacement, pick_font, write_phrase};
use crate::draw::lines::{LineSegment, draw_line, line_budget};
use crate::encode::{self, OutputFormat};
use crate::foundation::color::RgbColor;
use crate::foundation::error::{CaptchaError, CaptchaResult};
use crate::fx::post::{PostEffectsReport, apply_post_effects};
use crate::fx::warp::{WarpParams, warp};
use crate::ocr::evaluator::OcrEvaluator;
use crate::phrase::{DEFAULT_CHARSET, DEFAULT_PHRASE_LENGTH, Phrase};

pub const DEFAULT_WIDTH: u32 = 150;
pub const DEFAULT_HEIGHT: u32 = 40;

/// Pipeline stage a builder has reached. Skipped stages are never entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildState {
    Empty,
    BackgroundInitialized,
    LinesBehindDrawn,
    TextWritten,
    LinesFrontDrawn,
    Distorted,
    PostEffected,
    Finalized,
}

/// What the last build did, stage by stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildStats {
    pub states: Vec<BuildState>,
    pub lines_behind: Vec<LineSegment>,
    pub lines_front: Vec<LineSegment>,
    pub glyphs: Vec<GlyphPlacement>,
    pub warp: Option<WarpParams>,
    pub post_effects: Option<PostEffectsReport>,
    /// Builds run by the last `build*` call; above 1 only for the OCR loop.
    pub attempts: u32,
}

/// Encoded captcha together with the phrase it shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Captcha {
    pub phrase: String,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Builds captcha images for one phrase.
///
/// The phrase and font are fixed at construction; every [`build`](Self::build) starts
/// over from [`BuildState::Empty`] with fresh randomness from the builder's own RNG.
/// A builder is single-threaded; run several builders to render in parallel.
#[derive(Debug)]
pub struct CaptchaBuilder {
    phrase: Phrase,
    config: EffectConfig,
    pool_font: PathBuf,
    font: Option<Arc<GlyphFont>>,
    rng: ChaCha8Rng,
    canvas: Option<Canvas>,
    state: BuildState,
    stats: BuildStats,
}

impl CaptchaBuilder {
    /// Builder seeded from the thread RNG. `None` or `""` generates a random phrase.
    pub fn new(phrase: Option<&str>) -> CaptchaResult<Self> {
        Self::with_seed(phrase, rand::random())
    }

    /// Reproducible builder: same seed, phrase and config give the same pixels.
    pub fn with_seed(phrase: Option<&str>, seed: u64) -> CaptchaResult<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let phrase = match phrase.filter(|p| !p.is_empty()) {
            Some(text) => Phrase::new(text)?,
            None => Phrase::generate(&mut rng, DEFAULT_PHRASE_LENGTH, DEFAULT_CHARSET)?,
        };
        Ok(Self::from_parts(phrase, rng))
    }

    /// Builder for an already generated phrase, e.g. one with a custom charset.
    pub fn from_phrase(phrase: Phrase, seed: u64) -> Self {
        Self::from_parts(phrase, ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_parts(phrase: Phrase, mut rng: ChaCha8Rng) -> Self {
        let pool_font = pick_font(&mut rng);
        Self {
            phrase,
            config: EffectConfig::default(),
            pool_font,
            font: None,
            rng,
            canvas: None,
            state: BuildState::Empty,
            stats: BuildStats::default(),
        }
    }

    /// Replace the effect configuration after validating it.
    pub fn with_config(mut self, config: EffectConfig) -> CaptchaResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Mutable access; the config is validated again at the start of every build.
    pub fn config_mut(&mut self) -> &mut EffectConfig {
        &mut self.config
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    /// Font used for glyphs: the configured one, else the pool pick made at construction.
    pub fn font_path(&self) -> &Path {
        self.config.font.as_deref().unwrap_or(self.pool_font.as_path())
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// The finished canvas of the last build.
    pub fn canvas(&self) -> CaptchaResult<&Canvas> {
        match (&self.canvas, self.state) {
            (Some(canvas), BuildState::Finalized) => Ok(canvas),
            _ => Err(CaptchaError::config("captcha has not been built yet")),
        }
    }

    /// Confusable-insensitive comparison against the phrase.
    pub fn compare(&self, candidate: &str) -> bool {
        self.phrase.matches(candidate)
    }

    fn enter(&mut self, state: BuildState) {
        tracing::trace!(?state, "build state");
        self.state = state;
        self.stats.states.push(state);
    }

    fn load_font(&mut self) -> CaptchaResult<Arc<GlyphFont>> {
        let path = self.font_path().to_path_buf();
        if let Some(font) = self.font.as_ref().filter(|f| f.path() == path) {
            return Ok(Arc::clone(font));
        }
        let font = Arc::new(GlyphFont::load(&path)?);
        self.font = Some(Arc::clone(&font));
        Ok(font)
    }

    fn background(&mut self, width: u32, height: u32) -> CaptchaResult<Canvas> {
        if let Some(path) = &self.config.bg_image {
            return Canvas::from_background_image(load_background(path, width, height)?);
        }
        let mut canvas = Canvas::new(width, height)?;
        canvas.fill(self.config.bg_color, &mut self.rng);
        Ok(canvas)
    }

    /// Run the full pipeline once.
    ///
    /// Stages: background, lines behind the text, glyphs, lines in front (text color),
    /// warp, post effects. The line passes, warp and post effects only run with
    /// `apply_effects`; see [`EffectConfig`] for the individual switches.
    #[tracing::instrument(skip(self), fields(phrase = %self.phrase))]
    pub fn build(&mut self, width: u32, height: u32) -> CaptchaResult<&mut Self> {
        self.config.validate()?;
        self.canvas = None;
        self.stats = BuildStats {
            attempts: 1,
            ..BuildStats::default()
        };
        self.enter(BuildState::Empty);

        let font = self.load_font()?;
        let mut canvas = self.background(width, height)?;
        self.enter(BuildState::BackgroundInitialized);

        let cfg = &self.config;
        if cfg.apply_effects {
            let count = line_budget(&mut self.rng, width, height, cfg.max_lines_behind);
            if cfg.lines_behind_enabled() {
                for _ in 0..count {
                    let seg = draw_line(&mut canvas, &mut self.rng, None, cfg.line_color);
                    self.stats.lines_behind.push(seg);
                }
                tracing::debug!(count, "lines drawn behind text");
                self.enter(BuildState::LinesBehindDrawn);
            }
        }

        let cfg = &self.config;
        let text = cfg
            .text_color
            .unwrap_or_else(|| RgbColor::random(&mut self.rng, 0..=150));
        let text_code = canvas.set_text_color(text);
        self.stats.glyphs = write_phrase(
            &mut canvas,
            &mut self.rng,
            &self.phrase,
            &font,
            text_code,
            cfg.max_angle,
            cfg.max_offset,
        );
        self.enter(BuildState::TextWritten);

        let cfg = &self.config;
        if cfg.apply_effects {
            let count = line_budget(&mut self.rng, width, height, cfg.max_lines_front);
            if cfg.lines_front_enabled() {
                for _ in 0..count {
                    let seg = draw_line(&mut canvas, &mut self.rng, Some(text_code), None);
                    self.stats.lines_front.push(seg);
                }
                tracing::debug!(count, "lines drawn in front of text");
                self.enter(BuildState::LinesFrontDrawn);
            }

            let cfg = &self.config;
            if cfg.distort {
                let params = WarpParams::random(&mut self.rng, width, height);
                tracing::debug!(?params, "distorting");
                canvas = warp(&canvas, &params, cfg.interpolate_enabled());
                self.stats.warp = Some(params);
                self.enter(BuildState::Distorted);
            }
        }

        let cfg = &self.config;
        if cfg.post_effects_enabled() {
            let report = apply_post_effects(&mut canvas, &mut self.rng, cfg.apply_scatter_effect);
            self.stats.post_effects = Some(report);
            self.enter(BuildState::PostEffected);
        }

        self.canvas = Some(canvas);
        self.enter(BuildState::Finalized);
        Ok(self)
    }

    /// [`build`](Self::build) at 150x40.
    pub fn build_default(&mut self) -> CaptchaResult<&mut Self> {
        self.build(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Rebuild until no OCR engine of `evaluator` reads the phrase back.
    ///
    /// Gives up with [`CaptchaError::ResistanceNotAchieved`] after `max_attempts`
    /// builds (at least one build always runs). Evaluator errors abort the loop.
    #[tracing::instrument(skip(self, evaluator))]
    pub fn build_against_ocr(
        &mut self,
        width: u32,
        height: u32,
        evaluator: &OcrEvaluator,
        max_attempts: u32,
    ) -> CaptchaResult<&mut Self> {
        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            self.build(width, height)?;
            self.stats.attempts = attempt;
            let readable = match &self.canvas {
                Some(canvas) => evaluator.is_readable(canvas, &self.phrase)?,
                None => false,
            };
            if !readable {
                tracing::debug!(attempt, "captcha resisted ocr");
                return Ok(self);
            }
            tracing::debug!(attempt, "captcha readable by ocr, rebuilding");
        }
        Err(CaptchaError::ResistanceNotAchieved {
            attempts: max_attempts,
        })
    }

    /// Encoded bytes of the last build.
    pub fn fetch(&self, quality: u8, format: OutputFormat) -> CaptchaResult<Vec<u8>> {
        encode::encode(self.canvas()?, quality, format)
    }

    /// Write the encoded image to `out`.
    pub fn output<W: Write>(
        &self,
        out: &mut W,
        quality: u8,
        format: OutputFormat,
    ) -> CaptchaResult<()> {
        encode::write_to(self.canvas()?, quality, format, out)
    }

    /// Save to `path`; the extension picks the format.
    pub fn save(&self, path: &Path, quality: u8) -> CaptchaResult<()> {
        encode::save(self.canvas()?, path, quality)
    }

    /// `data:` URI of the encoded image.
    pub fn inline(&self, quality: u8, format: OutputFormat) -> CaptchaResult<String> {
        encode::data_uri(self.canvas()?, quality, format)
    }

    pub fn finish(&self, quality: u8, format: OutputFormat) -> CaptchaResult<Captcha> {
        Ok(Captcha {
            phrase: self.phrase.as_str().to_string(),
            format,
            bytes: self.fetch(quality, format)?,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/builder/builder.rs"]
mod tests;
