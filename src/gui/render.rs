//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use eframe::egui::{self, Color32, RichText, Stroke, TextureHandle, Vec2};

use crate::ocr::CaptureBand;
use crate::plate::{normalize_manual_input, validate_plate_format, PlateList};

use super::state::ScannerStatus;

const MASK_COLOR: Color32 = Color32::from_black_alpha(128);
const BAND_BORDER: Color32 = Color32::from_rgb(0, 255, 0);
const BAND_BORDER_WIDTH: f32 = 3.0;
const ERROR_COLOR: Color32 = Color32::from_rgb(200, 0, 0);

/// Render the canvas with the capture band overlay.
///
/// The frame is scaled to the available width, keeping the canvas aspect
/// ratio. The area above and below the band is dimmed and the band outlined.
pub fn render_canvas(
    ui: &mut egui::Ui,
    texture: Option<&TextureHandle>,
    canvas_size: (u32, u32),
    band: &CaptureBand,
) {
    let (canvas_w, canvas_h) = (canvas_size.0 as f32, canvas_size.1 as f32);
    let width = ui.available_width().min(canvas_w.max(1.0) * 1.5);
    let scale = width / canvas_w.max(1.0);
    let size = Vec2::new(width, canvas_h * scale);

    let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
    let painter = ui.painter_at(rect);

    let Some(texture) = texture else {
        // Placeholder when there is no frame
        painter.rect_filled(rect, 4.0, Color32::from_gray(40));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No video",
            egui::FontId::proportional(18.0),
            Color32::from_gray(160),
        );
        return;
    };

    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    painter.image(texture.id(), rect, uv, Color32::WHITE);

    let band_top = rect.top() + band.y * scale;
    let band_bottom = rect.top() + band.bottom() * scale;

    painter.rect_filled(
        egui::Rect::from_min_max(rect.left_top(), egui::pos2(rect.right(), band_top)),
        0.0,
        MASK_COLOR,
    );
    painter.rect_filled(
        egui::Rect::from_min_max(egui::pos2(rect.left(), band_bottom), rect.right_bottom()),
        0.0,
        MASK_COLOR,
    );
    painter.rect_stroke(
        egui::Rect::from_min_max(
            egui::pos2(rect.left(), band_top),
            egui::pos2(rect.right(), band_bottom),
        ),
        0.0,
        Stroke::new(BAND_BORDER_WIDTH, BAND_BORDER),
    );
}

/// Render the status line and capture button.
/// Returns true if capture was clicked.
pub fn render_controls(ui: &mut egui::Ui, status: &ScannerStatus, can_capture: bool) -> bool {
    let mut capture_clicked = false;

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        // Disabled while a recognition is pending or there is no frame
        ui.add_enabled_ui(can_capture, |ui| {
            if ui.button(RichText::new("📷 Capture plate").size(16.0)).clicked() {
                capture_clicked = true;
            }
        });

        ui.add_space(20.0);
        ui.label(RichText::new(status.status_text()).color(status.color()));
    });

    capture_clicked
}

/// Render the manual entry field.
/// Returns true if Enter was pressed in it.
///
/// Text that would be rejected on Enter is drawn in red while typing.
pub fn render_manual_entry(ui: &mut egui::Ui, input: &mut String) -> bool {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    let candidate = normalize_manual_input(input);
    let looks_valid = candidate.is_empty() || validate_plate_format(&candidate);

    let mut submitted = false;
    ui.horizontal(|ui| {
        ui.label("Manual entry:");
        let mut edit = egui::TextEdit::singleline(input)
            .hint_text("e.g. AB 123")
            .desired_width(200.0);
        if !looks_valid {
            edit = edit.text_color(ERROR_COLOR);
        }
        let response = ui.add(edit);
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submitted = true;
            response.request_focus();
        }
    });

    submitted
}

/// Render the error message, if any.
pub fn render_error(ui: &mut egui::Ui, error: Option<&str>) {
    if let Some(msg) = error {
        ui.add_space(4.0);
        ui.label(RichText::new(msg).color(ERROR_COLOR));
    }
}

/// Render the accepted plates, oldest first.
pub fn render_plate_list(ui: &mut egui::Ui, plates: &PlateList) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.heading(format!("Plates ({})", plates.len()));
    ui.add_space(4.0);

    if plates.is_empty() {
        ui.label(RichText::new("No plates yet").color(Color32::GRAY));
        return;
    }

    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for record in plates.records() {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&record.text).monospace().size(16.0));
                    ui.label(
                        RichText::new(format!(
                            "{} · {:?} · {}",
                            record.format,
                            record.origin,
                            record.accepted_at.format("%H:%M:%S")
                        ))
                        .color(Color32::GRAY),
                    );
                });
            }
        });
}
