pub mod engine;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrEngine, OcrProgress, TesseractEngine};
pub use preprocess::{band_to_gray, binarize_in_place, crop_band, CaptureBand};
pub use setup::ensure_tesseract;

use image::{GrayImage, RgbaImage};

/// Canvas → OCR input: binarizes the canvas in place, then cuts out the
/// capture band as grayscale.
///
/// The canvas itself keeps the binarized pixels until the next frame replaces
/// it, so the operator sees what was sent to OCR.
pub fn prepare_band(canvas: &mut RgbaImage, threshold: u8, band_height_ratio: f32) -> GrayImage {
    binarize_in_place(canvas, threshold);
    let band = CaptureBand::for_canvas(canvas.width(), canvas.height(), band_height_ratio);
    band_to_gray(&crop_band(canvas, &band))
}
