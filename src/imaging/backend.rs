//! Image conversion backend trait and shared types.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Conversion failures are per-file: the orchestrator records them and
//! moves on.

use super::params::ConvertParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image conversion backends.
///
/// `Sync` so one backend can be shared across the rayon pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `params.source` and write it losslessly to `params.output`.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::ConvertFormat;
    use std::sync::Mutex;

    /// Mock backend that records operations instead of decoding pixels.
    ///
    /// `convert` copies the source bytes to the output so later stages see a
    /// file. Sources whose name contains `fail_on` are rejected. With
    /// `remove_source`, the source is deleted once copied.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub fail_on: Option<String>,
        pub remove_source: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Convert {
            source: String,
            output: String,
            format: ConvertFormat,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(name: &str) -> Self {
            Self {
                fail_on: Some(name.to_string()),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            Ok(Dimensions {
                width: 1,
                height: 1,
            })
        }

        fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
            let source = params.source.to_string_lossy().to_string();
            self.operations.lock().unwrap().push(RecordedOp::Convert {
                source: source.clone(),
                output: params.output.to_string_lossy().to_string(),
                format: params.format,
            });
            if let Some(fail_on) = &self.fail_on
                && source.contains(fail_on.as_str())
            {
                return Err(BackendError::ProcessingFailed(format!(
                    "mock refused {source}"
                )));
            }
            std::fs::copy(&params.source, &params.output)?;
            if self.remove_source {
                std::fs::remove_file(&params.source)?;
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_convert() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("000001.bmp");
        std::fs::write(&source, "raw").unwrap();
        let backend = MockBackend::new();

        backend
            .convert(&ConvertParams {
                source: source.clone(),
                output: tmp.path().join("out.tif"),
                format: ConvertFormat::Tiff,
            })
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Convert {
                format: ConvertFormat::Tiff,
                ..
            }
        ));
        assert!(tmp.path().join("out.tif").exists());
    }

    #[test]
    fn mock_can_fail() {
        let backend = MockBackend::failing_on("bad");
        let result = backend.convert(&ConvertParams {
            source: "/x/bad.bmp".into(),
            output: "/x/bad.tif".into(),
            format: ConvertFormat::Tiff,
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
