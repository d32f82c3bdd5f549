use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;

#[test]
fn generated_phrases_use_charset_and_length() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for length in 1..12 {
        let phrase = Phrase::generate(&mut rng, length, DEFAULT_CHARSET).unwrap();
        assert_eq!(phrase.char_len(), length);
        assert!(phrase.as_str().chars().all(|c| DEFAULT_CHARSET.contains(c)));
    }

    let phrase = Phrase::generate(&mut rng, 8, "äx").unwrap();
    assert_eq!(phrase.char_len(), 8);
    assert!(phrase.as_str().chars().all(|c| c == 'ä' || c == 'x'));
}

#[test]
fn generation_is_reproducible_per_seed() {
    let a = Phrase::generate(&mut ChaCha8Rng::seed_from_u64(9), 5, DEFAULT_CHARSET).unwrap();
    let b = Phrase::generate(&mut ChaCha8Rng::seed_from_u64(9), 5, DEFAULT_CHARSET).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_charset_is_config_error() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = Phrase::generate(&mut rng, 5, "").unwrap_err();
    assert!(matches!(err, CaptchaError::Config(_)));
    assert!(Phrase::generate(&mut rng, 0, DEFAULT_CHARSET).is_err());
    assert!(Phrase::new("").is_err());
}

#[test]
fn normalize_is_idempotent() {
    for s in ["", "AbC01", "l0O1", "ÄÖ10xyz", "zzz"] {
        let once = normalize(s);
        assert_eq!(normalize(&once), once);
        assert!(matches(s, s));
    }
    assert_eq!(normalize("AbC01"), "abcol");
}

#[test]
fn confusable_characters_are_equivalent() {
    assert!(matches("l0O1", "1oO1"));
    assert!(Phrase::new("1oO1").unwrap().matches("L00L"));
    assert!(!matches("abc", "abd"));
    assert!(!matches("abc", "abcd"));
}
