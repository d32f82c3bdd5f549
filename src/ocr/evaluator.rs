use std::path::PathBuf;

use crate::canvas::Canvas;
use crate::foundation::error::{CaptchaError, CaptchaResult};
use crate::ocr::engine::{OcrEngine, clean_output, detect_engines};
use crate::ocr::probe::{ProbeOptions, write_probe};
use crate::phrase::Phrase;

/// Rebuild cap used when callers do not pick one.
pub const DEFAULT_MAX_OCR_ATTEMPTS: u32 = 32;

/// Decides whether a rendered captcha is machine-readable.
///
/// Every registered engine reads the same sharpened grayscale probe. The captcha is
/// readable when any engine's cleaned output matches the phrase (see
/// [`Phrase::matches`]).
pub struct OcrEvaluator {
    engines: Vec<Box<dyn OcrEngine>>,
    options: ProbeOptions,
    probe_dir: Option<PathBuf>,
}

impl std::fmt::Debug for OcrEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEvaluator")
            .field("engines", &self.engine_names())
            .field("options", &self.options)
            .field("probe_dir", &self.probe_dir)
            .finish()
    }
}

impl Default for OcrEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEvaluator {
    /// Evaluator without engines. Register some before asking it anything.
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            options: ProbeOptions::default(),
            probe_dir: None,
        }
    }

    /// Evaluator over whichever of `ocrad` and `tesseract` are installed.
    pub fn detect() -> Self {
        Self {
            engines: detect_engines(),
            ..Self::new()
        }
    }

    pub fn with_engine(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.register(Box::new(engine));
        self
    }

    pub fn register(&mut self, engine: Box<dyn OcrEngine>) {
        self.engines.push(engine);
    }

    pub fn with_probe_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    /// Directory for probe files; created on first use. Defaults to the system temp dir.
    pub fn with_probe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.probe_dir = Some(dir.into());
        self
    }

    pub fn has_engines(&self) -> bool {
        !self.engines.is_empty()
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn probe_options(&self) -> ProbeOptions {
        self.options
    }

    /// Run every engine over a probe of `canvas`.
    ///
    /// Fails with [`CaptchaError::ToolingUnavailable`] when no engine is registered.
    /// Engine failures propagate; the probe file is removed either way.
    #[tracing::instrument(skip_all, fields(engines = self.engines.len()))]
    pub fn is_readable(&self, canvas: &Canvas, phrase: &Phrase) -> CaptchaResult<bool> {
        if self.engines.is_empty() {
            return Err(CaptchaError::tooling_unavailable(
                "OCR detection requires either \"ocrad\" or \"tesseract\" to be installed",
            ));
        }

        let dir = self
            .probe_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let probe = write_probe(canvas, self.options, &dir)?;

        let mut readable = false;
        for engine in &self.engines {
            let raw = engine.recognize(probe.path()).inspect_err(|e| {
                tracing::warn!(engine = engine.name(), error = %e, "ocr engine failed");
            })?;
            let text = clean_output(&raw);
            let hit = phrase.matches(&text);
            tracing::debug!(engine = engine.name(), recognized = %text, hit, "ocr probe read");
            readable |= hit;
        }
        Ok(readable)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ocr/evaluator.rs"]
mod tests;
