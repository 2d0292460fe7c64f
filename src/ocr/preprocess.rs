use image::{GrayImage, RgbaImage};

/// Binarizes an image in place with a fixed global threshold.
///
/// Each pixel's R, G and B are averaged; an average strictly above
/// `threshold` turns the pixel white (255), anything else black (0).
/// Alpha is left untouched.
///
/// `sum > 3 * threshold` is the integer form of `sum / 3 > threshold`.
pub fn binarize_in_place(img: &mut RgbaImage, threshold: u8) {
    let limit = threshold as u16 * 3;

    for pixel in img.pixels_mut() {
        let sum = pixel[0] as u16 + pixel[1] as u16 + pixel[2] as u16;
        let value = if sum > limit { 255u8 } else { 0u8 };
        pixel[0] = value;
        pixel[1] = value;
        pixel[2] = value;
    }
}

/// Horizontal region of the canvas sent to OCR.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureBand {
    /// Top edge in canvas pixels.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CaptureBand {
    /// Band of `height_ratio` of the canvas height, centered vertically and
    /// spanning the full width.
    pub fn for_canvas(width: u32, height: u32, height_ratio: f32) -> Self {
        let band_height = height as f32 * height_ratio.clamp(0.0, 1.0);
        Self {
            y: (height as f32 - band_height) / 2.0,
            width: width as f32,
            height: band_height,
        }
    }

    /// Bottom edge in canvas pixels.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Integer pixel rows `(y, height)` covered by the band, clamped to
    /// `canvas_height`. Always at least one row when the canvas has rows.
    pub fn pixel_rows(&self, canvas_height: u32) -> (u32, u32) {
        let y0 = (self.y.max(0.0) as u32).min(canvas_height);
        let rows = (self.height as u32).max(1).min(canvas_height - y0);
        (y0, rows)
    }
}

/// Extracts the band region from the canvas.
pub fn crop_band(canvas: &RgbaImage, band: &CaptureBand) -> RgbaImage {
    let (w, h) = canvas.dimensions();
    let (y0, rows) = band.pixel_rows(h);
    image::imageops::crop_imm(canvas, 0, y0, w, rows).to_image()
}

/// Converts a binarized band to single-channel grayscale for OCR.
pub fn band_to_gray(band: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(band.width(), band.height(), |x, y| {
        image::Luma([band.get_pixel(x, y)[0]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_binarize_bright_pixel_becomes_white() {
        // Average 133.3 > 127
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 140, 160, 255]));
        binarize_in_place(&mut img, 127);
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_binarize_threshold_boundary() {
        let mut img: RgbaImage = RgbaImage::new(3, 1);
        // Average exactly 127 stays black
        img.put_pixel(0, 0, Rgba([127, 127, 127, 255]));
        // Average 127.33 becomes white
        img.put_pixel(1, 0, Rgba([127, 127, 128, 255]));
        // Average 126.67 stays black
        img.put_pixel(2, 0, Rgba([127, 127, 126, 200]));

        binarize_in_place(&mut img, 127);

        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgba([0, 0, 0, 200]), "Alpha should be kept");
    }

    #[test]
    fn test_band_for_standard_canvas() {
        let band = CaptureBand::for_canvas(640, 480, 0.15);
        assert!((band.height - 72.0).abs() < 1e-3);
        assert!((band.y - 204.0).abs() < 1e-3);
        assert!((band.bottom() - 276.0).abs() < 1e-3);
        assert_eq!(band.pixel_rows(480), (204, 72));
    }

    #[test]
    fn test_crop_band_takes_center_rows() {
        let img = RgbaImage::from_fn(640, 480, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let band = CaptureBand::for_canvas(640, 480, 0.15);
        let cropped = crop_band(&img, &band);

        assert_eq!(cropped.dimensions(), (640, 72));
        assert_eq!(cropped.get_pixel(5, 0)[0], 5);
        assert_eq!(cropped.get_pixel(0, 0)[1], 204);
        assert_eq!(cropped.get_pixel(0, 71)[1], (275u32 % 256) as u8);
    }

    #[test]
    fn test_crop_band_tiny_canvas_keeps_one_row() {
        let img = RgbaImage::new(4, 2);
        let band = CaptureBand::for_canvas(4, 2, 0.15);
        assert_eq!(crop_band(&img, &band).dimensions(), (4, 1));
    }

    #[test]
    fn test_band_to_gray() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let gray = band_to_gray(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
    }
}
