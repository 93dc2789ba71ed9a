//! Equirectangular texture frames
//!
//! A [`TextureFrame`] is a row-major grid of RGB cells, usually replaced
//! once per animation tick by an external producer. The pipeline only
//! ever reads from it.

use image::{DynamicImage, RgbImage};
use std::path::Path;
use thiserror::Error;

use crate::config::SphereConfig;
use crate::models::{Color, BLACK};
use crate::quantize::Resolution;

/// Error type for frame construction and decoding
#[derive(Debug, Error)]
pub enum FrameError {
    /// Image decoding or encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// The frame has no cells
    #[error("frame has zero size ({0})")]
    Empty(Resolution),
}

/// One panorama frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureFrame {
    image: RgbImage,
}

impl TextureFrame {
    /// A black frame.
    pub fn new(resolution: Resolution) -> Self {
        Self::filled(resolution, BLACK)
    }

    /// A frame with every cell set to `color`.
    pub fn filled(resolution: Resolution, color: Color) -> Self {
        Self { image: RgbImage::from_pixel(resolution.width, resolution.height, color) }
    }

    /// Wrap an RGB image. Zero-sized images are rejected.
    pub fn from_image(image: RgbImage) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Empty(Resolution::new(width, height)));
        }
        Ok(Self { image })
    }

    /// Convert any decoded image, dropping alpha.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, FrameError> {
        Self::from_image(image.to_rgb8())
    }

    /// Decode a frame from an image file (PNG, JPEG, ... as supported by `image`).
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        let image = image::open(path)?;
        Self::from_dynamic(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.image.width(), self.image.height())
    }

    /// Color at `(px, py)`, or `None` outside the frame.
    pub fn get(&self, px: u32, py: u32) -> Option<Color> {
        if px < self.width() && py < self.height() {
            Some(*self.image.get_pixel(px, py))
        } else {
            None
        }
    }

    /// Set one cell; writes outside the frame are ignored.
    pub fn set(&mut self, px: u32, py: u32, color: Color) {
        if px < self.width() && py < self.height() {
            self.image.put_pixel(px, py, color);
        }
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Paint columns `start..=end` over every row.
    ///
    /// When `start > end` the band wraps across the longitude seam.
    /// Columns past the right edge are ignored.
    pub fn paint_column_band(&mut self, start: u32, end: u32, color: Color) {
        let width = self.width();
        if width == 0 {
            return;
        }
        for px in band_columns(start, end, width) {
            for py in 0..self.height() {
                self.image.put_pixel(px, py, color);
            }
        }
    }
}

/// Column indices of an inclusive band that may wrap around the seam.
pub(crate) fn band_columns(start: u32, end: u32, width: u32) -> Vec<u32> {
    if start <= end {
        (start..=end).filter(|&px| px < width).collect()
    } else {
        (start..width).chain(0..=end.min(width.saturating_sub(1))).collect()
    }
}

/// Black frame with every configured feature band painted in its color.
///
/// A feature without a band paints its nominal column only. This is the
/// verification pattern for checking that each band is wide enough to
/// reach all its elements.
pub fn feature_test_pattern(config: &SphereConfig) -> TextureFrame {
    let resolution = config.resolution();
    let mut frame = TextureFrame::new(resolution);
    for feature in &config.features {
        let [start, end] = feature.painted_columns(resolution);
        frame.paint_column_band(start, end, image::Rgb(feature.color));
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use image::Rgb;

    #[test]
    fn test_new_is_black() {
        let frame = TextureFrame::new(Resolution::new(4, 2));
        assert_eq!(frame.resolution(), Resolution::new(4, 2));
        assert_eq!(frame.get(3, 1), Some(BLACK));
        assert_eq!(frame.get(4, 0), None);
    }

    #[test]
    fn test_from_image_rejects_empty() {
        let result = TextureFrame::from_image(RgbImage::new(0, 10));
        assert!(matches!(result, Err(FrameError::Empty(_))));
    }

    #[test]
    fn test_from_dynamic_drops_alpha() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 40]));
        let frame = TextureFrame::from_dynamic(DynamicImage::ImageRgba8(rgba)).unwrap();
        assert_eq!(frame.get(1, 1), Some(Rgb([10, 20, 30])));
    }

    #[test]
    fn test_paint_column_band() {
        let mut frame = TextureFrame::new(Resolution::new(10, 3));
        frame.paint_column_band(2, 4, Rgb([0, 255, 0]));
        for py in 0..3 {
            assert_eq!(frame.get(1, py), Some(BLACK));
            assert_eq!(frame.get(2, py), Some(Rgb([0, 255, 0])));
            assert_eq!(frame.get(4, py), Some(Rgb([0, 255, 0])));
            assert_eq!(frame.get(5, py), Some(BLACK));
        }
    }

    #[test]
    fn test_paint_wrapping_band() {
        let mut frame = TextureFrame::new(Resolution::new(10, 1));
        frame.paint_column_band(8, 1, Rgb([255, 0, 0]));
        let painted: Vec<u32> =
            (0..10).filter(|&px| frame.get(px, 0) == Some(Rgb([255, 0, 0]))).collect();
        assert_eq!(painted, vec![0, 1, 8, 9]);
    }

    #[test]
    fn test_band_columns_clipped_to_width() {
        assert_eq!(band_columns(8, 12, 10), vec![8, 9]);
        assert_eq!(band_columns(3, 3, 10), vec![3]);
    }

    #[test]
    fn test_feature_test_pattern() {
        let mut config = SphereConfig::default();
        config.features = vec![
            FeatureConfig::new("west", -90.0).with_band(74, 85).with_color([0, 255, 0]),
            FeatureConfig::new("east", 90.0).with_band(233, 245).with_color([255, 0, 0]),
            FeatureConfig::new("meridian", 0.0).with_color([0, 0, 255]),
        ];
        let frame = feature_test_pattern(&config);
        assert_eq!(frame.get(80, 10), Some(Rgb([0, 255, 0])));
        assert_eq!(frame.get(240, 150), Some(Rgb([255, 0, 0])));
        assert_eq!(frame.get(160, 80), Some(Rgb([0, 0, 255])));
        assert_eq!(frame.get(159, 80), Some(BLACK));
        assert_eq!(frame.get(161, 80), Some(BLACK));
        assert_eq!(frame.get(86, 0), Some(BLACK));
    }
}
