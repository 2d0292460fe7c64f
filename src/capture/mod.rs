//! Video acquisition.
//!
//! This module provides:
//! - The `FrameSource` trait for anything that produces RGBA frames
//! - A camera source (with the `camera` feature) and a still-image source
//! - `FrameStream`, which runs a source on a background thread

#[cfg(feature = "camera")]
pub mod camera;
pub mod still;
pub mod stream;

use anyhow::Result;
use image::RgbaImage;

use crate::config::VideoSource;

pub use still::StillImageSource;
pub use stream::FrameStream;

/// Anything that produces video frames.
pub trait FrameSource {
    /// Human-readable description for logs.
    fn name(&self) -> String;

    /// Returns the next frame, blocking until one is available.
    fn next_frame(&mut self) -> Result<RgbaImage>;
}

/// Opens the configured video source.
///
/// Call on the thread that will read from it.
pub fn open_source(source: &VideoSource) -> Result<Box<dyn FrameSource>> {
    match source {
        VideoSource::Camera { index } => open_camera(*index),
        VideoSource::Images { path } => Ok(Box::new(StillImageSource::open(path)?)),
    }
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(camera::CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Err(anyhow::anyhow!(
        "Camera {} requested but this build has no camera support (enable the `camera` feature)",
        index
    ))
}

/// Scales a frame to the canvas size. Frames already at that size are
/// returned unchanged.
pub fn scale_to_canvas(frame: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if frame.dimensions() == (width, height) {
        return frame;
    }
    image::imageops::resize(&frame, width, height, image::imageops::FilterType::Triangle)
}
