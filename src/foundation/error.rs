use std::path::PathBuf;

/// Convenience result type used across the crate.
pub type CaptchaResult<T> = Result<T, CaptchaError>;

/// Top-level error taxonomy used by builder, codec and OCR APIs.
#[derive(thiserror::Error, Debug)]
pub enum CaptchaError {
    /// Invalid user-provided configuration (empty charset, bad color arity, ...).
    #[error("config error: {0}")]
    Config(String),

    /// Unknown input MIME type or output format name.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A referenced file (background image, font) does not exist.
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),

    /// No OCR engine could be found on this system.
    #[error("tooling unavailable: {0}")]
    ToolingUnavailable(String),

    /// The OCR resistance loop gave up after its attempt budget.
    #[error("ocr resistance not achieved after {attempts} attempts")]
    ResistanceNotAchieved {
        /// Number of complete builds that were tried.
        attempts: u32,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptchaError {
    /// Build a [`CaptchaError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`CaptchaError::UnsupportedFormat`] value.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Build a [`CaptchaError::MissingFile`] value.
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile(path.into())
    }

    /// Build a [`CaptchaError::ToolingUnavailable`] value.
    pub fn tooling_unavailable(msg: impl Into<String>) -> Self {
        Self::ToolingUnavailable(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
