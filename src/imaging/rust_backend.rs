//! Pure Rust conversion backend built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (BMP, JPEG, TIFF, PNG) | `image::ImageReader` |
//! | Encode → TIFF | `tiff::encoder::TiffEncoder`, LZW |
//! | Encode → PNG | `image::DynamicImage::save_with_format` |
//!
//! Both output formats are lossless; the decoded pixel buffer, including its
//! bit depth, is written back unchanged. TIFF goes through the `tiff` crate
//! directly because `image` only writes it uncompressed.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ConvertFormat, ConvertParams};
use image::{DynamicImage, ImageReader};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tiff::TiffResult;
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{Compression, TiffEncoder, TiffValue};
use tiff::tags::Predictor;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to identify {}: {}", path.display(), e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        match params.format {
            ConvertFormat::Tiff => save_tiff(&img, &params.output),
            ConvertFormat::Png => img
                .save_with_format(&params.output, params.format.image_format())
                .map_err(|e| encode_error(&params.output, e)),
        }
    }
}

fn encode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
}

/// Write `img` as an LZW-compressed TIFF with its sample type unchanged.
///
/// Integer samples use the horizontal predictor; float samples cannot.
fn save_tiff(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    let (width, height) = (img.width(), img.height());
    let mut buffer = Cursor::new(Vec::new());
    let encoder = TiffEncoder::new(&mut buffer)
        .map_err(|e| encode_error(path, e))?
        .with_compression(Compression::Lzw);

    let int = Predictor::Horizontal;
    let written = match img {
        DynamicImage::ImageLuma8(buf) => {
            write_tiff::<colortype::Gray8, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageLuma16(buf) => {
            write_tiff::<colortype::Gray16, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageRgb8(buf) => {
            write_tiff::<colortype::RGB8, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageRgb16(buf) => {
            write_tiff::<colortype::RGB16, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageRgba8(buf) => {
            write_tiff::<colortype::RGBA8, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageRgba16(buf) => {
            write_tiff::<colortype::RGBA16, _>(encoder, int, width, height, buf.as_raw())
        }
        // No gray+alpha layout in the encoder; widening to RGBA keeps every value.
        DynamicImage::ImageLumaA8(_) => {
            let buf = img.to_rgba8();
            write_tiff::<colortype::RGBA8, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageLumaA16(_) => {
            let buf = img.to_rgba16();
            write_tiff::<colortype::RGBA16, _>(encoder, int, width, height, buf.as_raw())
        }
        DynamicImage::ImageRgb32F(buf) => write_tiff::<colortype::RGB32Float, _>(
            encoder,
            Predictor::None,
            width,
            height,
            buf.as_raw(),
        ),
        DynamicImage::ImageRgba32F(buf) => write_tiff::<colortype::RGBA32Float, _>(
            encoder,
            Predictor::None,
            width,
            height,
            buf.as_raw(),
        ),
        other => {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot write {:?} samples as TIFF: {}",
                other.color(),
                path.display()
            )));
        }
    };
    written.map_err(|e| encode_error(path, e))?;

    std::fs::write(path, buffer.into_inner())?;
    Ok(())
}

fn write_tiff<C, W>(
    encoder: TiffEncoder<W>,
    predictor: Predictor,
    width: u32,
    height: u32,
    data: &[C::Inner],
) -> TiffResult<()>
where
    C: ColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    encoder
        .with_predictor(predictor)
        .write_image::<C>(width, height, data)
}
