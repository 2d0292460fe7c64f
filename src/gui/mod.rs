//! GUI module for the application.
//!
//! Provides the scanning window using egui/eframe: the live canvas with the
//! capture band, the capture button, manual entry, and the plate list.

pub mod render;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, TextureHandle, Vec2};

use crate::capture::{open_source, FrameStream};
use crate::config::AppConfig;
use crate::ocr::OcrEngine;
use crate::session::{CaptureRequest, PlateSession, SessionSettings};

use state::ScannerStatus;

/// Main GUI application struct.
///
/// Dropping the app drops the session, which stops the frame thread.
pub struct ScannerApp {
    session: PlateSession,
    /// Canvas texture and the canvas version it was uploaded from.
    texture: Option<(TextureHandle, u64)>,
    repaint_interval: Duration,
}

impl ScannerApp {
    pub fn new(session: PlateSession, repaint_interval: Duration) -> Self {
        Self {
            session,
            texture: None,
            repaint_interval,
        }
    }

    /// Upload the canvas to the GPU when it changed since the last upload.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        let version = self.session.canvas_version();
        let Some(canvas) = self.session.canvas() else {
            self.texture = None;
            return;
        };

        if let Some((_, uploaded)) = &self.texture {
            if *uploaded == version {
                return;
            }
        }

        let size = [canvas.width() as usize, canvas.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, canvas.as_raw());

        match &mut self.texture {
            Some((handle, uploaded)) => {
                handle.set(color_image, egui::TextureOptions::LINEAR);
                *uploaded = version;
            }
            None => {
                let handle = ctx.load_texture("canvas", color_image, egui::TextureOptions::LINEAR);
                self.texture = Some((handle, version));
            }
        }
    }

    /// Handle capture button click.
    fn handle_capture(&mut self) {
        match self.session.request_capture() {
            CaptureRequest::Started { job_id } => {
                crate::log(&format!("GUI: capture #{} started", job_id));
            }
            CaptureRequest::Busy => crate::log("GUI: capture rejected, recognition pending"),
            CaptureRequest::NoFrame => crate::log("GUI: capture rejected, no frame"),
            CaptureRequest::NoEngine => crate::log("GUI: capture skipped, no OCR engine"),
        }
    }
}

impl eframe::App for ScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Render loop: newest frame onto the canvas
        self.session.pump_frames();

        if let Some(outcome) = self.session.poll_recognition() {
            crate::log(&format!("GUI: recognition finished: {:?}", outcome));
        }

        self.sync_texture(ctx);

        // Keep repainting while frames arrive or OCR is pending
        if self.session.has_stream() || self.session.is_busy() {
            ctx.request_repaint_after(self.repaint_interval);
        }

        let status = ScannerStatus::from_session(&self.session);
        let can_capture = !self.session.is_busy() && self.session.canvas().is_some();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Plate Scanner");
            ui.add_space(8.0);

            render::render_canvas(
                ui,
                self.texture.as_ref().map(|(handle, _)| handle),
                self.session.canvas_size(),
                &self.session.capture_band(),
            );

            if render::render_controls(ui, &status, can_capture) {
                self.handle_capture();
            }

            if render::render_manual_entry(ui, self.session.manual_input_mut()) {
                self.session.submit_manual();
            }

            render::render_error(ui, self.session.error_message());
            render::render_plate_list(ui, self.session.plates());
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(config: &AppConfig, engine: Option<Arc<dyn OcrEngine>>) -> eframe::Result<()> {
    let mut session = PlateSession::new(SessionSettings::from_config(config), engine);

    let source = config.video_source.clone();
    let interval = Duration::from_millis(config.frame_interval_ms.max(1));
    crate::log(&format!("GUI: starting video source {:?}", source));
    session.attach_stream(FrameStream::start(move || open_source(&source), interval));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(720.0, 820.0))
            .with_min_inner_size(Vec2::new(400.0, 500.0))
            .with_title("Plate Scanner"),
        ..Default::default()
    };

    eframe::run_native(
        "Plate Scanner",
        options,
        Box::new(move |_cc| {
            crate::log("GUI: creating ScannerApp instance...");
            Ok(Box::new(ScannerApp::new(session, interval)))
        }),
    )
}
