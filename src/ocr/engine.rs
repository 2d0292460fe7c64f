use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

/// Progress reported by an engine while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrProgress {
    /// Engine is loading its language data.
    Loading { language: String },
    /// Recognition has started on an image of the given size.
    Recognizing { width: u32, height: u32 },
    /// Recognition finished; `chars` characters of text were returned.
    Done { chars: usize },
}

/// An external OCR engine.
///
/// Implementations receive the binarized capture band and return the raw
/// recognized text, lines separated by `\n`.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(
        &self,
        img: &GrayImage,
        progress: &mut dyn FnMut(OcrProgress),
    ) -> Result<String>;
}

/// Tesseract invoked through its command-line program.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    page_seg_mode: u8,
}

impl TesseractEngine {
    pub fn new(
        executable: PathBuf,
        tessdata: Option<PathBuf>,
        language: impl Into<String>,
        page_seg_mode: u8,
    ) -> Self {
        Self {
            executable,
            tessdata,
            language: language.into(),
            page_seg_mode,
        }
    }

    fn command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string());
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(
        &self,
        img: &GrayImage,
        progress: &mut dyn FnMut(OcrProgress),
    ) -> Result<String> {
        progress(OcrProgress::Loading {
            language: self.language.clone(),
        });

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write capture band for Tesseract")?;

        progress(OcrProgress::Recognizing {
            width: img.width(),
            height: img.height(),
        });

        let output = self
            .command(temp_input.path())
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        progress(OcrProgress::Done {
            chars: text.chars().count(),
        });

        Ok(text)
    }
}
