//! Frame preprocessing
//!
//! Turns one [`ImageFrame`] into the rank-4 `[1, H, W, C]` tensor the
//! classifier expects: nearest-neighbour resize, optional grayscale
//! reduction, then normalization.

use std::fmt;
use std::str::FromStr;

use camera_capture::ImageFrame;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::PreprocessError;

/// Default square input size of the classifier
pub const DEFAULT_INPUT_SIZE: u32 = 96;

/// Channel layout fed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ChannelMode {
    /// Unweighted mean of the colour channels, one output channel
    Grayscale,
    /// First three channels as R, G, B
    Rgb,
}

impl ChannelMode {
    /// Channels in the produced tensor
    pub fn channels(&self) -> usize {
        match self {
            ChannelMode::Grayscale => 1,
            ChannelMode::Rgb => 3,
        }
    }
}

impl FromStr for ChannelMode {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "gray" | "grey" => Ok(ChannelMode::Grayscale),
            "rgb" | "color" | "colour" => Ok(ChannelMode::Rgb),
            other => Err(PreprocessError::UnsupportedChannelMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for ChannelMode {
    type Error = PreprocessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Pixel value normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `x / 255`, range `[0, 1]`
    #[default]
    UnitRange,
    /// `(x - 127.5) / 127.5`, range `[-1, 1]`
    Symmetric,
}

impl Normalization {
    /// Inclusive output range
    pub fn range(&self) -> (f32, f32) {
        match self {
            Normalization::UnitRange => (0.0, 1.0),
            Normalization::Symmetric => (-1.0, 1.0),
        }
    }

    /// Normalize a pixel intensity in `[0, 255]`
    pub fn apply(&self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        let v = match self {
            Normalization::UnitRange => value / 255.0,
            Normalization::Symmetric => (value - 127.5) / 127.5,
        };
        v.clamp(lo, hi)
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::UnitRange => write!(f, "x/255"),
            Normalization::Symmetric => write!(f, "(x-127.5)/127.5"),
        }
    }
}

/// Preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Square target size in pixels
    pub target_size: u32,
    /// Channel layout
    pub channel_mode: ChannelMode,
    /// Value normalization
    pub normalization: Normalization,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_INPUT_SIZE,
            channel_mode: ChannelMode::Grayscale,
            normalization: Normalization::UnitRange,
        }
    }
}

impl PreprocessConfig {
    /// Reject configurations that can never produce a tensor
    pub fn validate(&self) -> Result<(), PreprocessError> {
        if self.target_size == 0 {
            return Err(PreprocessError::ShapeMismatch(
                "target size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Shape of the tensor this configuration produces
    pub fn input_shape(&self) -> [usize; 4] {
        let size = self.target_size as usize;
        [1, size, size, self.channel_mode.channels()]
    }
}

/// Normalized model input, `[1, H, W, C]`
#[derive(Debug, Clone)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    /// Wrap an array that is already in model layout
    pub fn from_array(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    /// Contiguous values in row-major order
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.data.as_slice()
    }

    pub fn view(&self) -> ndarray::ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// Resize, reduce and normalize one frame.
///
/// The frame is consumed; its buffer is released when this returns.
pub fn preprocess(frame: ImageFrame, config: &PreprocessConfig) -> Result<InputTensor, PreprocessError> {
    config.validate()?;

    if frame.width == 0 || frame.height == 0 || frame.channels == 0 {
        return Err(PreprocessError::ShapeMismatch(format!(
            "empty frame {}x{}x{}",
            frame.width, frame.height, frame.channels
        )));
    }
    if frame.data.len() != frame.expected_len() {
        return Err(PreprocessError::ShapeMismatch(format!(
            "frame buffer holds {} bytes, expected {}",
            frame.data.len(),
            frame.expected_len()
        )));
    }
    if config.channel_mode == ChannelMode::Rgb && frame.channels < 3 {
        return Err(PreprocessError::UnsupportedChannelMode(format!(
            "rgb needs 3 channels, frame has {}",
            frame.channels
        )));
    }

    let size = config.target_size as usize;
    let out_channels = config.channel_mode.channels();
    // Alpha does not take part in the grayscale mean
    let color_channels = (frame.channels as usize).min(3);
    let src_channels = frame.channels as usize;
    let (src_w, src_h) = (frame.width as usize, frame.height as usize);

    let mut tensor = Array4::<f32>::zeros((1, size, size, out_channels));
    for y in 0..size {
        let src_y = y * src_h / size;
        for x in 0..size {
            let src_x = x * src_w / size;
            let idx = (src_y * src_w + src_x) * src_channels;
            let pixel = &frame.data[idx..idx + src_channels];

            match config.channel_mode {
                ChannelMode::Grayscale => {
                    let sum: f32 = pixel[..color_channels].iter().map(|&v| v as f32).sum();
                    let mean = sum / color_channels as f32;
                    tensor[[0, y, x, 0]] = config.normalization.apply(mean);
                }
                ChannelMode::Rgb => {
                    for c in 0..3 {
                        tensor[[0, y, x, c]] = config.normalization.apply(pixel[c] as f32);
                    }
                }
            }
        }
    }

    Ok(InputTensor::from_array(tensor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> ImageFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 255]);
            }
        }
        ImageFrame::new(data, width, height, 3, 0).unwrap()
    }

    #[test]
    fn test_grayscale_shape_and_range() {
        let config = PreprocessConfig::default();
        let tensor = preprocess(gradient_frame(20, 10), &config).unwrap();

        assert_eq!(tensor.shape(), [1, 96, 96, 1]);
        assert!(tensor.view().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_grayscale_is_unweighted_mean() {
        let frame = ImageFrame::new(vec![30, 60, 90], 1, 1, 3, 0).unwrap();
        let config = PreprocessConfig {
            target_size: 2,
            ..Default::default()
        };
        let tensor = preprocess(frame, &config).unwrap();

        let expected = 60.0 / 255.0;
        assert!(tensor.view().iter().all(|&v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn test_nearest_neighbour_sampling() {
        // 4x1 strip downsampled to 2x2 picks source columns 0 and 2
        let frame = ImageFrame::new(vec![0, 100, 200, 255], 4, 1, 1, 0).unwrap();
        let config = PreprocessConfig {
            target_size: 2,
            ..Default::default()
        };
        let tensor = preprocess(frame, &config).unwrap();
        let view = tensor.view();

        assert!((view[[0, 0, 0, 0]] - 0.0).abs() < 1e-6);
        assert!((view[[0, 0, 1, 0]] - 200.0 / 255.0).abs() < 1e-6);
        assert!((view[[0, 1, 1, 0]] - 200.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_rgb() {
        let frame = ImageFrame::new(vec![0, 255, 128, 7], 1, 1, 4, 0).unwrap();
        let config = PreprocessConfig {
            target_size: 1,
            channel_mode: ChannelMode::Rgb,
            normalization: Normalization::Symmetric,
        };
        let tensor = preprocess(frame, &config).unwrap();
        let view = tensor.view();

        assert_eq!(tensor.shape(), [1, 1, 1, 3]);
        assert!((view[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((view[[0, 0, 0, 1]] - 1.0).abs() < 1e-6);
        assert!((view[[0, 0, 0, 2]] - 0.5 / 127.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_size_is_shape_mismatch() {
        let config = PreprocessConfig {
            target_size: 0,
            ..Default::default()
        };
        let err = preprocess(gradient_frame(2, 2), &config).unwrap_err();
        assert!(matches!(err, PreprocessError::ShapeMismatch(_)));
    }

    #[test]
    fn test_rgb_on_gray_frame_is_unsupported() {
        let frame = ImageFrame::filled(4, 4, 1, 10, 0);
        let config = PreprocessConfig {
            channel_mode: ChannelMode::Rgb,
            ..Default::default()
        };
        let err = preprocess(frame, &config).unwrap_err();
        assert!(matches!(err, PreprocessError::UnsupportedChannelMode(_)));
    }

    #[test]
    fn test_channel_mode_parsing() {
        assert_eq!("Grayscale".parse::<ChannelMode>().unwrap(), ChannelMode::Grayscale);
        assert_eq!("rgb".parse::<ChannelMode>().unwrap(), ChannelMode::Rgb);
        assert!(matches!(
            "hsv".parse::<ChannelMode>(),
            Err(PreprocessError::UnsupportedChannelMode(_))
        ));
    }
}
