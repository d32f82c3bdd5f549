//! Challenge phrases and confusable-insensitive comparison.

use std::fmt;

use rand::Rng;

use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Characters used for random phrases. `o` and `0` are left out on purpose.
pub const DEFAULT_CHARSET: &str = "abcdefghijklmnpqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ123456789";

/// Number of characters in a generated phrase.
pub const DEFAULT_PHRASE_LENGTH: usize = 5;

/// Immutable challenge text. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Phrase(String);

impl Phrase {
    /// Wrap caller-supplied text.
    pub fn new(text: impl Into<String>) -> CaptchaResult<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(CaptchaError::config("phrase must be non-empty"));
        }
        Ok(Self(text))
    }

    /// Draw `length` characters from `charset`, uniformly and with replacement.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        length: usize,
        charset: &str,
    ) -> CaptchaResult<Self> {
        let chars: Vec<char> = charset.chars().collect();
        if chars.is_empty() {
            return Err(CaptchaError::config("charset must be non-empty"));
        }
        if length == 0 {
            return Err(CaptchaError::config("phrase length must be > 0"));
        }
        let text = (0..length)
            .map(|_| chars[rng.random_range(0..chars.len())])
            .collect();
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Confusable-insensitive comparison against a user (or OCR) answer.
    pub fn matches(&self, candidate: &str) -> bool {
        matches(candidate, &self.0)
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, then fold `0 -> o` and `1 -> l`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            other => other,
        })
        .collect()
}

pub fn matches(candidate: &str, phrase: &str) -> bool {
    normalize(candidate) == normalize(phrase)
}

#[cfg(test)]
#[path = "../tests/unit/phrase/phrase.rs"]
mod tests;
