//! GUI status display.
//!
//! Derives the status line shown under the canvas from the session.

use eframe::egui::Color32;

use crate::session::PlateSession;

/// Scanner status for display in GUI.
#[derive(Clone, Debug, PartialEq)]
pub enum ScannerStatus {
    /// Stream running, waiting for the first frame
    Starting,
    /// Frames are being drawn
    Live,
    /// A capture is being recognized
    Recognizing,
    /// No video; manual entry only
    NoVideo(String),
}

impl ScannerStatus {
    pub fn from_session(session: &PlateSession) -> Self {
        if session.is_busy() {
            return Self::Recognizing;
        }
        if let Some(err) = session.video_error() {
            return Self::NoVideo(err.to_string());
        }
        match (session.has_stream(), session.canvas().is_some()) {
            (_, true) => Self::Live,
            (true, false) => Self::Starting,
            (false, false) => Self::NoVideo("no video source".to_string()),
        }
    }

    /// Get display text for current status.
    pub fn status_text(&self) -> String {
        match self {
            Self::Starting => "Starting video...".to_string(),
            Self::Live => "Live".to_string(),
            Self::Recognizing => "Recognizing...".to_string(),
            Self::NoVideo(reason) => format!("No video ({}). Manual entry only.", reason),
        }
    }

    pub fn color(&self) -> Color32 {
        match self {
            Self::Starting => Color32::GRAY,
            Self::Live => Color32::from_rgb(0, 150, 0),
            Self::Recognizing => Color32::from_rgb(0, 120, 200),
            Self::NoVideo(_) => Color32::from_rgb(200, 150, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSettings;
    use image::RgbaImage;

    fn session() -> PlateSession {
        PlateSession::new(
            SessionSettings {
                canvas_width: 8,
                canvas_height: 8,
                band_height_ratio: 0.15,
                binarize_threshold: 127,
                debug_dir: None,
            },
            None,
        )
    }

    #[test]
    fn test_status_without_stream() {
        let status = ScannerStatus::from_session(&session());
        assert!(matches!(status, ScannerStatus::NoVideo(_)));
        assert!(status.status_text().contains("Manual entry only"));
    }

    #[test]
    fn test_status_live_with_canvas() {
        let mut session = session();
        session.draw_frame(RgbaImage::new(8, 8));
        assert_eq!(ScannerStatus::from_session(&session), ScannerStatus::Live);
    }
}
