//! Capture metadata writing.
//!
//! Photo managers (Lightroom, Capture One, Photos) sort by EXIF capture time.
//! Scanner exports carry no usable capture time, and their file modification
//! times change whenever a file is rotated in a browser, so every output file
//! is tagged with its planned timestamp:
//!
//! | Tag | Value |
//! |---|---|
//! | `EXIF:DateTimeOriginal` | `YYYY:MM:DD HH:MM:SS` |
//! | `EXIF:DateTimeDigitized` | same |
//! | `EXIF:SubSecTimeOriginal` | milliseconds, 3 digits |
//! | `EXIF:SubSecTimeDigitized` | same |
//! | `EXIF:Make` / `EXIF:Model` | optional, from config |
//!
//! Writing is delegated to `exiftool`. A missing tool is fatal for the run and
//! is checked once before any file is touched; a failed write is per-file.

use chrono::{NaiveDateTime, Timelike};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const SUCCESSFUL_WRITE: &str = "1 image files updated";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata tool not available: {program} ({reason})")]
    ToolMissing { program: String, reason: String },
    #[error("Failed to run metadata tool: {0}")]
    Io(#[from] io::Error),
    #[error("Metadata tool failed on {}: {output}", path.display())]
    WriteFailed { path: PathBuf, output: String },
}

/// Tags to write for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTags {
    pub timestamp: NaiveDateTime,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl CaptureTags {
    /// `(tag, value)` pairs in write order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let datetime = self.timestamp.format(EXIF_DATETIME_FORMAT).to_string();
        let subsec = subsec_millis(self.timestamp);
        let mut pairs = vec![
            ("EXIF:DateTimeOriginal", datetime.clone()),
            ("EXIF:DateTimeDigitized", datetime),
            ("EXIF:SubSecTimeOriginal", subsec.clone()),
            ("EXIF:SubSecTimeDigitized", subsec),
        ];
        if let Some(make) = &self.make {
            pairs.push(("EXIF:Make", make.clone()));
        }
        if let Some(model) = &self.model {
            pairs.push(("EXIF:Model", model.clone()));
        }
        pairs
    }
}

/// Millisecond part of an instant as three zero-padded digits.
pub fn subsec_millis(timestamp: NaiveDateTime) -> String {
    // Leap-second nanos run past 1e9; clamp to keep three digits.
    let millis = (timestamp.nanosecond() / 1_000_000).min(999);
    format!("{millis:03}")
}

/// Something that can stamp capture tags onto a file in place.
pub trait MetadataWriter: Sync {
    /// Fail fast if the writer cannot work at all.
    fn ensure_available(&self) -> Result<(), MetadataError>;

    fn write(&self, path: &Path, tags: &CaptureTags) -> Result<(), MetadataError>;
}

/// `exiftool` driven as a subprocess, one invocation per file.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: String,
}

impl ExifTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one write, excluding the program.
    pub fn write_args(path: &Path, tags: &CaptureTags) -> Vec<String> {
        let mut args = vec!["-overwrite_original".to_string(), "-n".to_string()];
        args.extend(tags.pairs().into_iter().map(|(k, v)| format!("-{k}={v}")));
        args.push(path.to_string_lossy().into_owned());
        args
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl MetadataWriter for ExifTool {
    fn ensure_available(&self) -> Result<(), MetadataError> {
        let missing = |reason: String| MetadataError::ToolMissing {
            program: self.program.clone(),
            reason,
        };
        let output = Command::new(&self.program)
            .arg("-ver")
            .output()
            .map_err(|e| missing(e.to_string()))?;
        if !output.status.success() {
            return Err(missing(format!("exited with {}", output.status)));
        }
        tracing::debug!(
            program = %self.program,
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "metadata tool available"
        );
        Ok(())
    }

    fn write(&self, path: &Path, tags: &CaptureTags) -> Result<(), MetadataError> {
        let output = Command::new(&self.program)
            .args(Self::write_args(path, tags))
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && stdout.contains(SUCCESSFUL_WRITE) {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(MetadataError::WriteFailed {
            path: path.to_path_buf(),
            output: format!("{} {}", stdout.trim(), stderr.trim())
                .trim()
                .to_string(),
        })
    }
}
