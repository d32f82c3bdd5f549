//! Captcha image synthesis.
//!
//! A [`CaptchaBuilder`] renders one phrase onto a small raster: background fill or
//! image, decorative lines behind and in front of the text, per-glyph rotation and
//! jitter, a nonlinear warp, then a randomized chain of post filters. Finished images
//! are encoded as JPEG, PNG or GIF, or inlined as a `data:` URI.
//!
//! - Pick a phrase and build with [`CaptchaBuilder::build`]
//! - Optionally retry until OCR fails with [`CaptchaBuilder::build_against_ocr`]
//! - Encode with [`CaptchaBuilder::fetch`], [`CaptchaBuilder::save`] or
//!   [`CaptchaBuilder::inline`]
//!
//! Every builder owns a seedable RNG, so builds are reproducible with
//! [`CaptchaBuilder::with_seed`] and independent builders can run in parallel.
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod builder;
pub mod canvas;
pub mod config;
pub mod draw;
pub mod encode;
pub mod fx;
pub mod ocr;
pub mod phrase;

pub use crate::foundation::color::{BackgroundColor, RgbColor};
pub use crate::foundation::error::{CaptchaError, CaptchaResult};

pub use crate::builder::{BuildState, BuildStats, Captcha, CaptchaBuilder};
pub use crate::canvas::Canvas;
pub use crate::config::EffectConfig;
pub use crate::encode::{DEFAULT_QUALITY, OutputFormat};
pub use crate::ocr::engine::{CommandEngine, OcrEngine};
pub use crate::ocr::evaluator::{DEFAULT_MAX_OCR_ATTEMPTS, OcrEvaluator};
pub use crate::ocr::probe::ProbeOptions;
pub use crate::phrase::Phrase;
