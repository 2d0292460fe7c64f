//! Plate Scanner
//!
//! A desktop application that reads vehicle license plates from a camera.
//! A horizontal band of each captured frame is binarized and sent to
//! Tesseract; the recognized lines are checked against the car and
//! motorcycle plate formats. Plates can also be typed in manually.
//!
//! Run without arguments for the scanning window, or with an image path to
//! recognize a single picture from the command line.

mod capture;
mod config;
mod gui;
mod ocr;
mod paths;
mod plate;
mod session;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use ocr::{OcrEngine, TesseractEngine};
use session::{CaptureRequest, PlateSession, SessionSettings, NO_PLATE_MESSAGE};

/// Longest the command-line mode waits for Tesseract.
const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(120);

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("plate_scanner.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<ExitCode> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    config::init_config();
    let config = config::get_config();

    // OCR is optional: without it the window still accepts manual entry
    let engine = match build_engine(config) {
        Ok(engine) => Some(engine),
        Err(e) => {
            log(&format!("Warning: OCR unavailable: {:#}", e));
            log("Capture will not recognize plates; manual entry still works.");
            None
        }
    };

    if let Some(image_path) = std::env::args_os().nth(1) {
        let code = match recognize_file(Path::new(&image_path), config, engine)? {
            Ok(plate) => {
                println!("{}", plate);
                ExitCode::SUCCESS
            }
            Err(message) => {
                println!("{}", message);
                ExitCode::FAILURE
            }
        };
        return Ok(code);
    }

    log("Starting GUI application...");
    match gui::run_gui(config, engine) {
        Ok(()) => {
            log("GUI application exited normally");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log(&format!("GUI error: {}", e));
            Err(anyhow!("GUI error: {}", e))
        }
    }
}

/// Sets up Tesseract for the configured language.
fn build_engine(config: &AppConfig) -> Result<Arc<dyn OcrEngine>> {
    let paths = ocr::ensure_tesseract(&config.ocr_language)?;
    Ok(Arc::new(TesseractEngine::new(
        paths.executable,
        paths.tessdata,
        config.ocr_language.clone(),
        config.ocr_page_seg_mode,
    )))
}

/// Command-line mode: runs one capture on an image file.
///
/// Returns `Ok(plate)` for an accepted plate, or `Err(message)` with the
/// user-facing message when none was found.
fn recognize_file(
    path: &Path,
    config: &AppConfig,
    engine: Option<Arc<dyn OcrEngine>>,
) -> Result<std::result::Result<String, String>> {
    log(&format!("Recognizing {}", path.display()));

    let frame = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgba8();

    let mut session = PlateSession::new(SessionSettings::from_config(config), engine);
    session.draw_frame(frame);

    match session.request_capture() {
        CaptureRequest::Started { .. } => {
            session
                .wait_for_recognition(ONE_SHOT_TIMEOUT)
                .ok_or_else(|| anyhow!("OCR timed out after {:?}", ONE_SHOT_TIMEOUT))?;
        }
        // The no-plate message is already set
        CaptureRequest::NoEngine => {}
        other => return Err(anyhow!("Capture did not start: {:?}", other)),
    }

    Ok(match session.plates().last() {
        Some(record) => Ok(record.text.clone()),
        None => Err(session
            .error_message()
            .unwrap_or(NO_PLATE_MESSAGE)
            .to_string()),
    })
}
