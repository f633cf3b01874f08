//! Shared test utilities for the scanroll test suite.
//!
//! Builders for pipeline values (`ScanUnit`, `Roll`) and small filesystem
//! helpers for tests that walk a real directory tree.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! touch(tmp.path(), "Customer001234/000001.jpg");
//!
//! let roll = roll_of(vec![unit("Customer", 1234, "000001", 0)]);
//! assert_eq!(roll.len(), 1);
//! ```

use crate::types::{Roll, RollKey, ScanUnit};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

// =========================================================================
// Pipeline values
// =========================================================================

/// Fixed run start: 2024-03-15 14:30:00.000.
pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_milli_opt(14, 30, 0, 0))
        .unwrap()
}

/// A unit with a synthetic path derived from its identity.
pub fn unit(order: &str, roll: u32, label: &str, discovery: usize) -> ScanUnit {
    ScanUnit {
        source_path: PathBuf::from(format!("/scans/{order}{roll:06}/{label}.jpg")),
        order_id: order.to_string(),
        roll_number: roll,
        raw_frame_label: label.to_string(),
        discovery_order: discovery,
    }
}

/// A unit at an explicit path. The frame label is the file stem.
pub fn unit_at(path: &str, order: &str, roll: u32, discovery: usize) -> ScanUnit {
    let source_path = PathBuf::from(path);
    let label = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    ScanUnit {
        source_path,
        order_id: order.to_string(),
        roll_number: roll,
        raw_frame_label: label,
        discovery_order: discovery,
    }
}

/// Wrap units in a roll keyed by the first member.
pub fn roll_of(members: Vec<ScanUnit>) -> Roll {
    let key = members.first().map(ScanUnit::roll_key).unwrap_or(RollKey {
        order_id: String::new(),
        roll_number: 0,
    });
    Roll { key, members }
}

// =========================================================================
// Filesystem
// =========================================================================

/// Create `root/rel` (and its parents) with placeholder content.
pub fn touch(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, rel).unwrap();
    path
}

/// Sorted names of the regular files directly inside `dir`.
pub fn file_names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
