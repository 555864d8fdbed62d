//! Image frame types

use crate::CaptureError;

/// Raw interleaved pixel buffer produced once per capture tick
#[derive(Debug, Clone)]
pub struct ImageFrame {
    /// Pixel data (width * height * channels, row-major, interleaved)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Channels per pixel (1 = gray, 3 = RGB, 4 = RGBA)
    pub channels: u8,
    /// Capture timestamp (milliseconds since epoch)
    pub timestamp_ms: u64,
    /// Frame sequence number
    pub sequence: u64,
}

impl ImageFrame {
    /// Create a new frame, checking the buffer length against the geometry
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        sequence: u64,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CaptureError::Format(format!(
                "buffer holds {} bytes, {}x{}x{} needs {}",
                data.len(),
                width,
                height,
                channels,
                expected
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            timestamp_ms: now_ms(),
            sequence,
        })
    }

    /// Create a frame filled with a single value on every channel
    pub fn filled(width: u32, height: u32, channels: u8, value: u8, sequence: u64) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            data: vec![value; len],
            width,
            height,
            channels,
            timestamp_ms: now_ms(),
            sequence,
        }
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(img: image::RgbImage, sequence: u64) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            channels: 3,
            timestamp_ms: now_ms(),
            sequence,
        }
    }

    /// Number of bytes the geometry calls for
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Get the channel values of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        self.data.get(idx..idx + c)
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_short_buffer() {
        let err = ImageFrame::new(vec![0; 10], 2, 2, 3, 0).unwrap_err();
        assert!(matches!(err, CaptureError::Format(_)));
    }

    #[test]
    fn test_pixel_lookup() {
        let data = vec![
            1, 2, 3, /**/ 4, 5, 6, //
            7, 8, 9, /**/ 10, 11, 12,
        ];
        let frame = ImageFrame::new(data, 2, 2, 3, 7).unwrap();

        assert_eq!(frame.pixel(1, 1), Some(&[10u8, 11, 12][..]));
        assert_eq!(frame.pixel(0, 1), Some(&[7u8, 8, 9][..]));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_from_rgb_image() {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([9, 8, 7]));
        let frame = ImageFrame::from_rgb_image(img, 1);

        assert_eq!((frame.width, frame.height, frame.channels), (4, 3, 3));
        assert_eq!(frame.data.len(), frame.expected_len());
        assert_eq!(frame.pixel(3, 2), Some(&[9u8, 8, 7][..]));
    }
}
