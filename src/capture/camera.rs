//! Camera frame source backed by nokhwa.

use anyhow::{anyhow, Context, Result};
use image::{RgbImage, RgbaImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use super::FrameSource;

pub struct CameraSource {
    camera: Camera,
    index: u32,
}

impl CameraSource {
    /// Opens camera `index` and starts streaming.
    ///
    /// Must be called on the thread that will read frames.
    pub fn open(index: u32) -> Result<Self> {
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .with_context(|| format!("Failed to open camera {}", index))?;
        camera
            .open_stream()
            .with_context(|| format!("Failed to start stream on camera {}", index))?;

        let resolution = camera.resolution();
        crate::log(&format!(
            "Camera {} streaming at {}x{}",
            index,
            resolution.width(),
            resolution.height()
        ));

        Ok(Self { camera, index })
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> String {
        format!("camera {}", self.index)
    }

    fn next_frame(&mut self) -> Result<RgbaImage> {
        let buffer = self.camera.frame().context("Failed to read camera frame")?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .context("Failed to decode camera frame")?;

        // Rebuild through raw bytes so the frame does not depend on nokhwa's
        // image version.
        let (width, height) = (decoded.width(), decoded.height());
        let rgb = RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| anyhow!("Camera frame has unexpected size"))?;
        Ok(image::DynamicImage::ImageRgb8(rgb).to_rgba8())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            crate::log(&format!("Failed to stop camera {}: {}", self.index, e));
        }
    }
}
