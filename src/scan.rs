//! Source tree discovery.
//!
//! Walks the source root, stamps every candidate image with its discovery
//! order, and hands it to the run's [`SourceConvention`]. The walk is sorted by
//! file name at every level, so discovery order is stable across reruns over
//! the same tree.
//!
//! ## Ordering guarantee
//!
//! `discovery_order` is assigned while enumerating, before any parsing. Parsing
//! then runs in parallel on the rayon pool; results are collected back in index
//! order, so parallelism can never reorder units.
//!
//! ## What counts as a candidate
//!
//! - Regular files with an image extension (`jpg`, `jpeg`, `tif`, `tiff`, `bmp`,
//!   any case).
//! - Hidden entries (leading `.`) are skipped, including hidden directories.
//! - The run config file and anything else are ignored silently.
//!
//! Candidates the convention cannot parse are returned as [`Skipped`] entries
//! (warnings), never as errors.

use crate::convention::{ConventionError, SourceConvention};
use crate::types::ScanUnit;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "bmp"];

/// A candidate file the convention rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: ConventionError,
}

/// Everything discovered under one source root.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Recognized units, sorted by `discovery_order`.
    pub units: Vec<ScanUnit>,
    pub skipped: Vec<Skipped>,
}

/// Walk `root` and parse every candidate image with `convention`.
pub fn scan(root: &Path, convention: &dyn SourceConvention) -> Result<ScanResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let candidates = collect_candidates(root)?;
    Ok(parse_candidates(&candidates, convention))
}

/// Enumerate candidate image files in traversal order.
pub fn collect_candidates(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut candidates = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            candidates.push(entry.into_path());
        }
    }
    Ok(candidates)
}

/// Parse candidates in parallel; `discovery_order` is the candidate's index.
pub fn parse_candidates(candidates: &[PathBuf], convention: &dyn SourceConvention) -> ScanResult {
    let parsed: Vec<Result<ScanUnit, Skipped>> = candidates
        .par_iter()
        .enumerate()
        .map(|(order, path)| {
            convention.parse(path, order).map_err(|reason| Skipped {
                path: path.clone(),
                reason,
            })
        })
        .collect();

    let mut result = ScanResult::default();
    for item in parsed {
        match item {
            Ok(unit) => result.units.push(unit),
            Err(skipped) => {
                tracing::warn!(path = %skipped.path.display(), "skipping: {}", skipped.reason);
                result.skipped.push(skipped);
            }
        }
    }
    result
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

pub fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
