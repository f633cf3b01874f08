//! Applying a plan to disk.
//!
//! Once a [`RunPlan`] exists every name and timestamp is fixed, so files are
//! independent and are handled in parallel with [rayon](https://docs.rs/rayon).
//! Each file goes through, in order:
//!
//! 1. **Convert** (only if planned): decode the source and write it losslessly
//!    straight to its destination, then check the dimensions survived.
//! 2. **Tag**: write capture tags through the [`MetadataWriter`].
//! 3. **Move**: rename the source to its destination (skipped when converted,
//!    the converted file is already there and the source is deleted; a
//!    source that cannot be deleted is only a warning).
//!
//! A failure in any step is recorded for that file and the source is left
//! where it was; the run continues. The only run-fatal condition here is a
//! metadata writer that cannot work at all, which is checked before any file
//! is touched.
//!
//! Nothing here is transactional: files completed before an abort stay renamed.
//!
//! ## Reorganized runs
//!
//! When files are moved into the `order/date/roll` tree, source directories
//! left empty (export subfolders, then the roll directory) are removed.
//! Directories that still hold anything are left alone.

use crate::imaging::{BackendError, ConvertParams, ImageBackend};
use crate::metadata::{CaptureTags, MetadataError, MetadataWriter};
use crate::plan::{PlannedFile, RunPlan};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Metadata writer unavailable: {0}")]
    Metadata(#[from] MetadataError),
}

/// Why a single file could not be completed.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Conversion failed: {0}")]
    Convert(#[from] BackendError),
    #[error("Tagging failed: {0}")]
    Tag(#[from] MetadataError),
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("Conversion changed dimensions of {}", .0.display())]
    DimensionMismatch(PathBuf),
}

/// Device tags stamped alongside the capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub make: Option<String>,
    pub model: Option<String>,
}

impl TagOptions {
    fn for_timestamp(&self, timestamp: NaiveDateTime) -> CaptureTags {
        CaptureTags {
            timestamp,
            make: self.make.clone(),
            model: self.model.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub tags: TagOptions,
    /// Remove source directories emptied by the run, stopping at this root.
    pub prune_empty_under: Option<PathBuf>,
}

/// Progress reported while files are being applied.
///
/// Events from different files interleave in completion order.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    FileApplied(AppliedFile),
    FileFailed { source: PathBuf, error: String },
    DirectoryRemoved(PathBuf),
}

/// A file that reached its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub timestamp: NaiveDateTime,
    pub converted: bool,
    pub tagged: bool,
}

#[derive(Debug)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: FileError,
}

#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Completed files, in plan order.
    pub applied: Vec<AppliedFile>,
    pub failures: Vec<FileFailure>,
    pub removed_dirs: Vec<PathBuf>,
}

impl ProcessResult {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Apply every file of `plan`.
///
/// `writer` is `None` when tagging is disabled.
pub fn process(
    plan: &RunPlan,
    options: &ProcessOptions,
    backend: &impl ImageBackend,
    writer: Option<&dyn MetadataWriter>,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    if let Some(writer) = writer {
        writer.ensure_available()?;
    }

    let files: Vec<&PlannedFile> = plan.files().collect();
    let outcomes: Vec<Result<AppliedFile, FileFailure>> = files
        .par_iter()
        .map_with(progress.clone(), |progress, file| {
            let outcome = apply_file(file, backend, writer, &options.tags).map_err(|error| {
                FileFailure {
                    source: file.source().to_path_buf(),
                    error,
                }
            });
            if let Some(tx) = progress {
                let event = match &outcome {
                    Ok(applied) => ProcessEvent::FileApplied(applied.clone()),
                    Err(failure) => ProcessEvent::FileFailed {
                        source: failure.source.clone(),
                        error: failure.error.to_string(),
                    },
                };
                tx.send(event).ok();
            }
            outcome
        })
        .collect();

    let mut result = ProcessResult::default();
    for outcome in outcomes {
        match outcome {
            Ok(applied) => result.applied.push(applied),
            Err(failure) => {
                tracing::warn!(
                    source = %failure.source.display(),
                    "file not processed: {}", failure.error
                );
                result.failures.push(failure);
            }
        }
    }

    if let Some(root) = &options.prune_empty_under {
        result.removed_dirs = prune_empty_dirs(&result.applied, root);
        if let Some(tx) = &progress {
            for dir in &result.removed_dirs {
                tx.send(ProcessEvent::DirectoryRemoved(dir.clone())).ok();
            }
        }
    }

    Ok(result)
}

fn apply_file(
    file: &PlannedFile,
    backend: &impl ImageBackend,
    writer: Option<&dyn MetadataWriter>,
    tags: &TagOptions,
) -> Result<AppliedFile, FileError> {
    let source = file.source();
    let destination = file.destination();
    if destination.exists() {
        return Err(FileError::DestinationExists(destination));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let capture = tags.for_timestamp(file.timestamp());

    match file.convert_to {
        Some(format) => {
            let params = ConvertParams {
                source: source.to_path_buf(),
                output: destination.clone(),
                format,
            };
            // Never leave a half-made output behind a failure.
            let converted = convert_checked(backend, &params)
                .and_then(|()| tag(writer, &destination, &capture));
            if let Err(e) = converted {
                fs::remove_file(&destination).ok();
                return Err(e);
            }
            // The destination is complete and tagged, so the file counts as
            // applied even if the original cannot be removed.
            if let Err(e) = fs::remove_file(source) {
                tracing::warn!(
                    source = %source.display(),
                    "converted, but the source could not be removed: {e}"
                );
            }
        }
        None => {
            tag(writer, source, &capture)?;
            fs::rename(source, &destination)?;
        }
    }

    Ok(AppliedFile {
        source: source.to_path_buf(),
        destination,
        timestamp: file.timestamp(),
        converted: file.convert_to.is_some(),
        tagged: writer.is_some(),
    })
}

fn convert_checked(backend: &impl ImageBackend, params: &ConvertParams) -> Result<(), FileError> {
    backend.convert(params)?;
    if backend.identify(&params.source)? != backend.identify(&params.output)? {
        return Err(FileError::DimensionMismatch(params.source.clone()));
    }
    Ok(())
}

fn tag(
    writer: Option<&dyn MetadataWriter>,
    path: &Path,
    capture: &CaptureTags,
) -> Result<(), FileError> {
    if let Some(writer) = writer {
        writer.write(path, capture)?;
    }
    Ok(())
}

/// Remove directories emptied by moving files out, deepest first.
fn prune_empty_dirs(applied: &[AppliedFile], root: &Path) -> Vec<PathBuf> {
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    for file in applied {
        for dir in file.source.ancestors().skip(1) {
            if !dir.starts_with(root) || dir == root {
                break;
            }
            candidates.insert(dir.to_path_buf());
        }
    }

    let mut ordered: Vec<PathBuf> = candidates.into_iter().collect();
    ordered.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    let mut removed = Vec::new();
    for dir in ordered {
        match fs::remove_dir(&dir) {
            Ok(()) => removed.push(dir),
            Err(e) => tracing::debug!(dir = %dir.display(), "keeping directory: {e}"),
        }
    }
    removed
}
