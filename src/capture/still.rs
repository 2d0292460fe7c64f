//! Still-image frame source.
//!
//! Replays a single image file, or every image in a folder sorted by file
//! name, as an endless sequence of frames.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use super::FrameSource;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub struct StillImageSource {
    files: Vec<PathBuf>,
    next: usize,
}

impl StillImageSource {
    /// Opens `path`, which may be an image file or a folder of images.
    pub fn open(path: &Path) -> Result<Self> {
        let files = if path.is_dir() {
            list_images(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(anyhow!("Image source not found: {}", path.display()));
        };

        if files.is_empty() {
            return Err(anyhow!("No images found in {}", path.display()));
        }

        Ok(Self { files, next: 0 })
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    files.sort();
    Ok(files)
}

impl FrameSource for StillImageSource {
    fn name(&self) -> String {
        match self.files.as_slice() {
            [single] => format!("image {}", single.display()),
            files => format!("{} images", files.len()),
        }
    }

    fn next_frame(&mut self) -> Result<RgbaImage> {
        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        let img = image::open(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(img.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn write_image(path: &Path, shade: u8) {
        RgbaImage::from_pixel(4, 3, Rgba([shade, shade, shade, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_folder_cycles_in_name_order() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("b.png"), 20);
        write_image(&dir.path().join("a.png"), 10);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = StillImageSource::open(dir.path()).unwrap();
        assert_eq!(source.name(), "2 images");

        let shades: Vec<u8> = (0..3)
            .map(|_| source.next_frame().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 10]);
    }

    #[test]
    fn test_single_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plate.png");
        write_image(&path, 200);

        let mut source = StillImageSource::open(&path).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.get_pixel(1, 1)[0], 200);
    }

    #[test]
    fn test_empty_folder_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(StillImageSource::open(dir.path()).is_err());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(StillImageSource::open(&dir.path().join("missing")).is_err());
    }
}
