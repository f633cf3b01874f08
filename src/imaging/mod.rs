//! Image conversion, pure Rust.
//!
//! Some scanner exports write uncompressed bitmaps. Those are re-encoded to a
//! lossless format on their way to their canonical name.
//!
//! The module is split into:
//! - **Parameters**: what to convert and into which format
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use params::{ConversionRule, ConvertFormat, ConvertParams};
pub use rust_backend::RustBackend;
