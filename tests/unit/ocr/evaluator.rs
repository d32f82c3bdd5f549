use super::*;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FixedEngine {
    text: &'static str,
    calls: Arc<AtomicUsize>,
}

impl FixedEngine {
    fn new(text: &'static str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                text,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl OcrEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn recognize(&self, probe: &Path) -> CaptchaResult<String> {
        assert!(probe.exists());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

struct BrokenEngine;

impl OcrEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn recognize(&self, _probe: &Path) -> CaptchaResult<String> {
        Err(CaptchaError::Other(anyhow::anyhow!("engine crashed")))
    }
}

fn canvas() -> Canvas {
    Canvas::new(20, 10).unwrap()
}

#[test]
fn no_engines_is_tooling_unavailable() {
    let phrase = Phrase::new("ab3XQ").unwrap();
    let err = OcrEvaluator::new()
        .is_readable(&canvas(), &phrase)
        .unwrap_err();
    assert!(matches!(err, CaptchaError::ToolingUnavailable(_)));
    assert!(err.to_string().contains("ocrad"));
}

#[test]
fn cleaned_match_is_readable() {
    let (engine, calls) = FixedEngine::new(" AB3xq \n");
    let eval = OcrEvaluator::new().with_engine(engine);
    let phrase = Phrase::new("ab3XQ").unwrap();
    assert!(eval.is_readable(&canvas(), &phrase).unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn digit_confusions_still_count_as_a_read() {
    let (engine, _) = FixedEngine::new("he11o");
    let eval = OcrEvaluator::new().with_engine(engine);
    assert!(eval
        .is_readable(&canvas(), &Phrase::new("HeLLo").unwrap())
        .unwrap());
}

#[test]
fn any_engine_matching_is_enough_and_all_engines_run() {
    let (miss, miss_calls) = FixedEngine::new("zzzzz");
    let (hit, hit_calls) = FixedEngine::new("ab3xq");
    let eval = OcrEvaluator::new().with_engine(hit).with_engine(miss);
    assert!(eval
        .is_readable(&canvas(), &Phrase::new("ab3XQ").unwrap())
        .unwrap());
    assert_eq!(hit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(miss_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn mismatch_is_unreadable() {
    let (engine, _) = FixedEngine::new("");
    let eval = OcrEvaluator::new().with_engine(engine);
    assert!(!eval
        .is_readable(&canvas(), &Phrase::new("ab3XQ").unwrap())
        .unwrap());
}

#[test]
fn engine_failure_propagates_and_probe_is_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let probe_dir = dir.path().join("nested").join("probes");
    let eval = OcrEvaluator::new()
        .with_engine(BrokenEngine)
        .with_probe_dir(&probe_dir);
    let err = eval
        .is_readable(&canvas(), &Phrase::new("ab3XQ").unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("engine crashed"));
    assert!(probe_dir.is_dir());
    assert_eq!(std::fs::read_dir(&probe_dir).unwrap().count(), 0);
}

#[test]
fn debug_lists_engine_names() {
    let (engine, _) = FixedEngine::new("x");
    let eval = OcrEvaluator::new().with_engine(engine);
    assert_eq!(eval.engine_names(), ["fixed"]);
    assert!(format!("{eval:?}").contains("fixed"));
    assert!(eval.has_engines());
    assert_eq!(eval.probe_options(), ProbeOptions::default());
}
