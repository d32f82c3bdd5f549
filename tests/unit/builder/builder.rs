use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgba, RgbaImage};
use rand::SeedableRng;

use super::*;
use crate::foundation::color::BackgroundColor;
use crate::ocr::engine::OcrEngine;

struct Echo {
    text: String,
    calls: Arc<AtomicUsize>,
}

impl OcrEngine for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn recognize(&self, _probe: &Path) -> CaptchaResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

fn evaluator(text: &str) -> (OcrEvaluator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let eval = OcrEvaluator::new().with_engine(Echo {
        text: text.to_string(),
        calls: calls.clone(),
    });
    (eval, calls)
}

fn seeded(phrase: &str, seed: u64) -> CaptchaBuilder {
    CaptchaBuilder::with_seed(Some(phrase), seed).unwrap()
}

#[test]
fn missing_or_empty_phrase_is_generated() {
    for input in [None, Some("")] {
        let b = CaptchaBuilder::new(input).unwrap();
        assert_eq!(b.phrase().char_len(), DEFAULT_PHRASE_LENGTH);
        assert!(b.phrase().as_str().chars().all(|c| DEFAULT_CHARSET.contains(c)));
    }
    assert_eq!(seeded("ab3XQ", 1).phrase().as_str(), "ab3XQ");
}

#[test]
fn same_seed_same_phrase_font_and_pixels() {
    let mut a = CaptchaBuilder::with_seed(None, 42).unwrap();
    let mut b = CaptchaBuilder::with_seed(None, 42).unwrap();
    assert_eq!(a.phrase(), b.phrase());
    assert_eq!(a.font_path(), b.font_path());

    a.build_default().unwrap();
    b.build_default().unwrap();
    assert_eq!(a.canvas().unwrap().image(), b.canvas().unwrap().image());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn rebuilding_draws_fresh_randomness() {
    let mut b = seeded("ab3XQ", 7);
    b.build_default().unwrap();
    let first = b.canvas().unwrap().image().clone();
    b.build_default().unwrap();
    assert_ne!(&first, b.canvas().unwrap().image());
}

#[test]
fn plain_config_only_visits_unconditional_states() {
    let mut b = seeded("ab3XQ", 3).with_config(EffectConfig::plain()).unwrap();
    b.build_default().unwrap();
    assert_eq!(
        b.stats().states,
        [
            BuildState::Empty,
            BuildState::BackgroundInitialized,
            BuildState::TextWritten,
            BuildState::Finalized,
        ]
    );
    assert!(b.stats().lines_behind.is_empty() && b.stats().lines_front.is_empty());
    assert!(b.stats().warp.is_none() && b.stats().post_effects.is_none());
    assert_eq!(b.stats().glyphs.len(), 5);
    assert_eq!(b.state(), BuildState::Finalized);
}

#[test]
fn default_config_visits_every_state_in_order() {
    let mut b = seeded("ab3XQ", 3);
    b.build_default().unwrap();
    assert_eq!(
        b.stats().states,
        [
            BuildState::Empty,
            BuildState::BackgroundInitialized,
            BuildState::LinesBehindDrawn,
            BuildState::TextWritten,
            BuildState::LinesFrontDrawn,
            BuildState::Distorted,
            BuildState::PostEffected,
            BuildState::Finalized,
        ]
    );
    // 150x40 -> between 2 and 3 lines per pass
    for lines in [&b.stats().lines_behind, &b.stats().lines_front] {
        assert!((2..=3).contains(&lines.len()));
    }
    assert_eq!(b.stats().attempts, 1);
}

#[test]
fn front_lines_use_the_text_color() {
    let mut cfg = EffectConfig::default();
    cfg.text_color = Some(RgbColor::new(12, 34, 56));
    cfg.line_color = Some(RgbColor::new(200, 100, 0));
    let mut b = seeded("ab3XQ", 5).with_config(cfg).unwrap();
    b.build_default().unwrap();
    for seg in &b.stats().lines_front {
        assert_eq!(seg.color, Rgba([12, 34, 56, 255]));
    }
    for seg in &b.stats().lines_behind {
        assert_eq!(seg.color, Rgba([200, 100, 0, 255]));
    }
}

#[test]
fn zero_line_limit_skips_the_pass() {
    let mut cfg = EffectConfig::default();
    cfg.max_lines_behind = Some(0);
    cfg.max_lines_front = Some(1);
    let mut b = seeded("ab3XQ", 9).with_config(cfg).unwrap();
    b.build_default().unwrap();
    let stats = b.stats();
    assert!(stats.lines_behind.is_empty());
    assert!(!stats.states.contains(&BuildState::LinesBehindDrawn));
    assert_eq!(stats.lines_front.len(), 1);
    assert!(stats.states.contains(&BuildState::LinesFrontDrawn));
}

#[test]
fn distort_and_post_switches_gate_their_stages() {
    let mut cfg = EffectConfig::default();
    cfg.distort = false;
    cfg.apply_post_effects = false;
    let mut b = seeded("ab3XQ", 9).with_config(cfg).unwrap();
    b.build_default().unwrap();
    let states = &b.stats().states;
    assert!(!states.contains(&BuildState::Distorted));
    assert!(!states.contains(&BuildState::PostEffected));
    assert!(states.contains(&BuildState::LinesFrontDrawn));
}

#[test]
fn dimensions_hold_for_every_configuration() {
    let mut configs = vec![EffectConfig::default(), EffectConfig::plain()];
    let mut transparent = EffectConfig::default();
    transparent.bg_color = Some(BackgroundColor::Transparent);
    configs.push(transparent);
    let mut no_interp = EffectConfig::default();
    no_interp.interpolate = false;
    no_interp.apply_scatter_effect = false;
    configs.push(no_interp);

    for (seed, cfg) in configs.into_iter().enumerate() {
        let mut b = seeded("ab3XQ", seed as u64).with_config(cfg).unwrap();
        b.build(150, 40).unwrap();
        assert_eq!(b.canvas().unwrap().dimensions(), (150, 40));
        b.build(61, 17).unwrap();
        assert_eq!(b.canvas().unwrap().dimensions(), (61, 17));
    }
}

#[test]
fn transparent_background_keeps_alpha() {
    let mut cfg = EffectConfig::plain();
    cfg.bg_color = Some(BackgroundColor::Transparent);
    let mut b = seeded("ab3XQ", 2).with_config(cfg).unwrap();
    b.build_default().unwrap();
    let canvas = b.canvas().unwrap();
    assert!(canvas.save_alpha());
    assert_eq!(canvas.image().get_pixel(0, 0).0[3], 0);
}

#[test]
fn background_image_sets_background_color() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bg.png");
    RgbaImage::from_pixel(300, 80, Rgba([20, 200, 120, 255]))
        .save(&path)
        .unwrap();

    let mut cfg = EffectConfig::plain();
    cfg.bg_image = Some(path);
    let mut b = seeded("ab3XQ", 2).with_config(cfg).unwrap();
    b.build_default().unwrap();
    let canvas = b.canvas().unwrap();
    assert_eq!(canvas.dimensions(), (150, 40));
    assert_eq!(canvas.background(), Rgba([20, 200, 120, 255]));
    assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([20, 200, 120, 255]));
}

#[test]
fn missing_background_image_fails_the_build() {
    let mut cfg = EffectConfig::plain();
    cfg.bg_image = Some(PathBuf::from("/nope/bg.png"));
    let mut b = seeded("ab3XQ", 2).with_config(cfg).unwrap();
    assert!(matches!(
        b.build_default().unwrap_err(),
        CaptchaError::MissingFile(_)
    ));
    assert!(b.canvas().is_err());
}

#[test]
fn invalid_config_is_rejected() {
    let mut cfg = EffectConfig::default();
    cfg.max_offset = -1;
    assert!(seeded("ab3XQ", 1).with_config(cfg).is_err());

    let mut b = seeded("ab3XQ", 1);
    b.config_mut().max_angle = 500;
    assert!(matches!(
        b.build_default().unwrap_err(),
        CaptchaError::Config(_)
    ));
}

#[test]
fn outputs_require_a_build() {
    let b = seeded("ab3XQ", 1);
    assert_eq!(b.state(), BuildState::Empty);
    assert!(b.canvas().is_err());
    assert!(b.fetch(90, OutputFormat::Png).is_err());
    assert!(b.inline(90, OutputFormat::Png).is_err());
}

#[test]
fn compare_folds_case_and_confusables() {
    let b = seeded("Hel1o", 1);
    assert!(b.compare("hello"));
    assert!(b.compare("HELLO"));
    assert!(!b.compare("help"));
}

#[test]
fn finish_bundles_phrase_and_bytes() {
    let mut b = seeded("ab3XQ", 4);
    b.build_default().unwrap();
    let captcha = b.finish(80, OutputFormat::Png).unwrap();
    assert_eq!(captcha.phrase, "ab3XQ");
    assert_eq!(captcha.format, OutputFormat::Png);
    assert!(captcha.bytes.starts_with(b"\x89PNG"));
    assert!(b.inline(80, OutputFormat::Jpeg).unwrap().starts_with("data:image/jpeg;base64,"));

    let mut out = Vec::new();
    b.output(&mut out, 80, OutputFormat::Png).unwrap();
    assert_eq!(out, captcha.bytes);
}

#[test]
fn ocr_loop_stops_after_first_unreadable_build() {
    let (eval, calls) = evaluator("zzzzz");
    let mut b = seeded("ab3XQ", 11);
    b.build_against_ocr(150, 40, &eval, 10).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(b.stats().attempts, 1);
    assert_eq!(b.state(), BuildState::Finalized);
}

#[test]
fn ocr_loop_is_capped() {
    let (eval, calls) = evaluator("AB3XQ");
    let mut b = seeded("ab3XQ", 11);
    let err = b.build_against_ocr(150, 40, &eval, 3).unwrap_err();
    assert!(matches!(err, CaptchaError::ResistanceNotAchieved { attempts: 3 }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn ocr_loop_without_engines_is_tooling_unavailable() {
    let mut b = seeded("ab3XQ", 11);
    let err = b
        .build_against_ocr(150, 40, &OcrEvaluator::new(), 3)
        .unwrap_err();
    assert!(matches!(err, CaptchaError::ToolingUnavailable(_)));
}

#[test]
fn custom_phrase_builder_uses_given_phrase() {
    let phrase = Phrase::generate(&mut ChaCha8Rng::seed_from_u64(0), 8, "XYZ").unwrap();
    let b = CaptchaBuilder::from_phrase(phrase.clone(), 0);
    assert_eq!(b.phrase(), &phrase);
    assert_eq!(b.phrase().char_len(), 8);
}
