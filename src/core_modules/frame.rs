// THEORY:
// A `Frame` is the only thing the capture adapter hands to the core. It is a
// read-only intensity image plus the moment it was captured. The IR camera
// delivers colour frames, but under IR illumination only brightness carries
// information, so frames are reduced to a single luma channel on construction
// and never touched again.

use crate::error::FrameError;
use image::{DynamicImage, GrayImage, RgbImage};

const RGB_CHANNELS: usize = 3;

/// A single captured image, reduced to its intensity channel.
#[derive(Debug, Clone)]
pub struct Frame {
    luma: GrayImage,
    /// Capture time in milliseconds, on whatever clock the capture adapter uses.
    timestamp_ms: u64,
}

impl Frame {
    pub fn new(luma: GrayImage, timestamp_ms: u64) -> Self {
        Self { luma, timestamp_ms }
    }

    /// Builds a frame from a tightly packed 8-bit intensity buffer.
    pub fn from_luma_bytes(
        width: u32,
        height: u32,
        bytes: Vec<u8>,
        timestamp_ms: u64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        let found = bytes.len();
        let luma = GrayImage::from_raw(width, height, bytes)
            .filter(|_| found == expected)
            .ok_or(FrameError::BufferLength { expected, found })?;
        Ok(Self::new(luma, timestamp_ms))
    }

    /// Builds a frame from a tightly packed RGB888 buffer, converting to luma.
    pub fn from_rgb_bytes(
        width: u32,
        height: u32,
        bytes: Vec<u8>,
        timestamp_ms: u64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        let found = bytes.len();
        let rgb = RgbImage::from_raw(width, height, bytes)
            .filter(|_| found == expected)
            .ok_or(FrameError::BufferLength { expected, found })?;
        Ok(Self::from_rgb(rgb, timestamp_ms))
    }

    pub fn from_rgb(rgb: RgbImage, timestamp_ms: u64) -> Self {
        Self::new(DynamicImage::ImageRgb8(rgb).to_luma8(), timestamp_ms)
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.luma.dimensions()
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Intensity at `(x, y)`, or `None` outside the frame.
    pub fn intensity(&self, x: u32, y: u32) -> Option<u8> {
        self.luma.get_pixel_checked(x, y).map(|p| p.0[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_buffer_with_wrong_length_is_rejected() {
        let err = Frame::from_luma_bytes(4, 4, vec![0; 15], 0).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferLength {
                expected: 16,
                found: 15
            }
        );
        assert!(Frame::from_luma_bytes(4, 4, vec![0; 17], 0).is_err());
        assert!(Frame::from_luma_bytes(4, 4, vec![0; 16], 0).is_ok());
    }

    #[test]
    fn rgb_white_converts_to_full_intensity() {
        let frame = Frame::from_rgb_bytes(2, 2, vec![255; 12], 42).unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert_eq!(frame.timestamp_ms(), 42);
        assert_eq!(frame.intensity(1, 1), Some(255));
        assert_eq!(frame.intensity(2, 0), None);
    }
}
