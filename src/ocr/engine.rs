use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Placeholder in [`CommandEngine`] arguments that is replaced by the probe path.
pub const PROBE_PLACEHOLDER: &str = "{probe}";

/// Something that can read text out of a grayscale probe file.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Raw recognized text. Callers clean it with [`clean_output`].
    fn recognize(&self, probe: &Path) -> CaptchaResult<String>;
}

/// External OCR program invoked once per probe; recognized text is read from stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEngine {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `ocrad --scale=2 --charset=ascii <probe>`
    pub fn ocrad() -> Self {
        Self::new(
            "ocrad",
            "ocrad",
            ["--scale=2", "--charset=ascii", PROBE_PLACEHOLDER],
        )
    }

    /// `tesseract <probe> stdout -l eng --dpi 2200`
    pub fn tesseract() -> Self {
        Self::new(
            "tesseract",
            "tesseract",
            [PROBE_PLACEHOLDER, "stdout", "-l", "eng", "--dpi", "2200"],
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        is_on_path(&self.program)
    }

    fn command_for(&self, probe: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            if arg == PROBE_PLACEHOLDER {
                cmd.arg(probe);
            } else {
                cmd.arg(arg);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl OcrEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, probe: &Path) -> CaptchaResult<String> {
        let output = self
            .command_for(probe)
            .output()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptchaError::Other(anyhow::anyhow!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether `program --version` runs and exits successfully.
pub fn is_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// The built-in engines that are installed on this machine, ocrad first.
pub fn detect_engines() -> Vec<Box<dyn OcrEngine>> {
    let mut engines: Vec<Box<dyn OcrEngine>> = Vec::new();
    for engine in [CommandEngine::ocrad(), CommandEngine::tesseract()] {
        if engine.is_available() {
            tracing::debug!(engine = engine.name(), "ocr engine available");
            engines.push(Box::new(engine));
        }
    }
    engines
}

/// Keep ASCII letters and digits only.
pub fn clean_output(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/ocr/engine.rs"]
mod tests;
