//! Application configuration.
//!
//! Loads settings from config.json at startup. Every field is optional in the
//! file; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Where video frames come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoSource {
    /// A camera device by index (requires the `camera` feature).
    Camera {
        #[serde(default)]
        index: u32,
    },
    /// A single image file or a folder of images, replayed in a loop.
    Images { path: PathBuf },
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::Camera { index: 0 }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub video_source: VideoSource,
    /// Canvas size frames are scaled to before drawing and capture.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Capture band height as a fraction of the canvas height.
    pub band_height_ratio: f32,
    /// Pixels whose channel average is above this become white.
    pub binarize_threshold: u8,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Tesseract page segmentation mode (6 = single uniform block of text).
    pub ocr_page_seg_mode: u8,
    /// Delay between frames read from the video source (milliseconds).
    pub frame_interval_ms: u64,
    /// Save every binarized capture band to the debug directory.
    pub save_debug_bands: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video_source: VideoSource::default(),
            canvas_width: 640,
            canvas_height: 480,
            band_height_ratio: 0.15,
            binarize_threshold: 127,
            ocr_language: "eng".to_string(),
            ocr_page_seg_mode: 6,
            frame_interval_ms: 33,
            save_debug_bands: false,
        }
    }
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if !path.exists() {
        crate::log("config.json not found. Using default config.");
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                crate::log("Config loaded from config.json");
                config
            }
            Err(e) => {
                crate::log(&format!(
                    "Failed to parse config.json: {}. Using defaults.",
                    e
                ));
                AppConfig::default()
            }
        },
        Err(e) => {
            crate::log(&format!(
                "Failed to read config.json: {}. Using defaults.",
                e
            ));
            AppConfig::default()
        }
    }
}

/// Initializes the global configuration from config.json next to the
/// executable. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&crate::paths::get_config_path()));
}

/// Returns the global configuration, falling back to defaults if
/// `init_config()` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
