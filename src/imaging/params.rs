//! Parameter types for image conversion.
//!
//! These describe *what* to convert, not *how*. The [`backend`](super::backend)
//! does the pixel work, which lets tests swap in a mock.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lossless output formats a raw scan can be converted to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    #[default]
    Tiff,
    Png,
}

impl ConvertFormat {
    /// File extension written for this format (lowercase, no dot).
    pub fn extension(self) -> &'static str {
        match self {
            ConvertFormat::Tiff => "tif",
            ConvertFormat::Png => "png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ConvertFormat::Tiff => ImageFormat::Tiff,
            ConvertFormat::Png => ImageFormat::Png,
        }
    }
}

/// Which source extensions get converted, and to what.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRule {
    /// Lowercase extensions without the dot, e.g. `"bmp"`.
    pub extensions: Vec<String>,
    pub format: ConvertFormat,
}

impl ConversionRule {
    /// Target format for a source extension, or `None` to keep it as is.
    pub fn target_for(&self, extension: &str) -> Option<ConvertFormat> {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
            .then_some(self.format)
    }
}

/// Parameters for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: ConvertFormat,
}
