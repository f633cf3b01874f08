//! Source format adapters for the two scanner export layouts.
//!
//! Both adapters turn a single source path into a [`ScanUnit`]. Everything
//! downstream (grouping, reindexing, timestamps, naming) only sees that shared
//! contract, so the convention is chosen exactly once, at run start.
//!
//! ## Directory convention (`directory`)
//!
//! Order id and roll number live in the parent directory name, the leaf is a
//! six-digit frame counter produced by the scanner's frame sensor:
//!
//! ```text
//! Customer001234/      <- order id "Customer" + roll 001234
//!   000001.jpg         <- raw frame label (unreliable)
//!   000007.jpg
//! 000001007466/        <- order id "000001" + roll 007466
//!   000001.tif
//! ```
//!
//! ## Filename convention (`filename`)
//!
//! The nearest ancestor `<customer>_<order>` directory gives the order id; the
//! roll number and an explicit frame label are in the leaf name. Images may be
//! nested in export folders:
//!
//! ```text
//! Customer_001234/
//!   Export JPG NoResize/
//!     R1-00131-0001.JPG       <- roll 131, frame label "0001"
//!     R1-00131-0000A_0001.JPG <- roll 131, frame label "0000A_0001"
//! ```

use crate::types::ScanUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Digits in a roll or order token embedded in a directory name.
const DIR_NUMBER_DIGITS: usize = 6;
/// Maximum characters the scanner software allows for an order/customer id.
const MAX_ID_CHARS: usize = 10;
/// Digits in the frame counter of the directory convention.
const FRAME_COUNTER_DIGITS: usize = 6;
/// Digits in the roll token of the filename convention.
const FILE_ROLL_DIGITS: usize = 5;
const FILE_PREFIX: &str = "R1-";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConventionError {
    #[error("Unrecognized {convention} layout ({reason}): {}", path.display())]
    UnrecognizedFormat {
        convention: Convention,
        path: PathBuf,
        reason: &'static str,
    },
}

/// Which export layout a run parses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// Order + roll in the directory name, six-digit frame counter as file name.
    #[default]
    #[value(alias = "a")]
    Directory,
    /// Roll + frame label in the file name, order in a `<name>_<order>` directory.
    #[value(alias = "b")]
    Filename,
}

impl Convention {
    /// The adapter implementing this convention.
    pub fn adapter(self) -> &'static dyn SourceConvention {
        match self {
            Convention::Directory => &DirectoryConvention,
            Convention::Filename => &FilenameConvention,
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convention::Directory => f.write_str("directory"),
            Convention::Filename => f.write_str("filename"),
        }
    }
}

/// A parser for one export layout.
///
/// Implementations are pure: no filesystem access, no ordering decisions.
/// The caller supplies `discovery_order` from its own traversal.
pub trait SourceConvention: Sync {
    fn convention(&self) -> Convention;

    fn parse(&self, path: &Path, discovery_order: usize) -> Result<ScanUnit, ConventionError>;
}

/// Convention A: `<order><roll:6>/<frame:6>.<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryConvention;

impl SourceConvention for DirectoryConvention {
    fn convention(&self) -> Convention {
        Convention::Directory
    }

    fn parse(&self, path: &Path, discovery_order: usize) -> Result<ScanUnit, ConventionError> {
        let reject = |reason| unrecognized(Convention::Directory, path, reason);

        let stem = file_stem(path).ok_or_else(|| reject("no file name"))?;
        if !is_digits(stem, FRAME_COUNTER_DIGITS) {
            return Err(reject("file name is not a six-digit frame counter"));
        }

        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .ok_or_else(|| reject("no parent directory"))?;
        let (order_id, roll) = split_trailing_number(dir_name, DIR_NUMBER_DIGITS)
            .ok_or_else(|| reject("directory is not <order><roll:6>"))?;
        if !valid_id(order_id) {
            return Err(reject("order id must be 1-10 characters"));
        }

        Ok(ScanUnit {
            source_path: path.to_path_buf(),
            order_id: order_id.to_string(),
            roll_number: parse_number(roll).ok_or_else(|| reject("roll number out of range"))?,
            raw_frame_label: stem.to_string(),
            discovery_order,
        })
    }
}

/// Convention B: `<name>_<order:6>/**/R1-<roll:5>-<label>.<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameConvention;

impl SourceConvention for FilenameConvention {
    fn convention(&self) -> Convention {
        Convention::Filename
    }

    fn parse(&self, path: &Path, discovery_order: usize) -> Result<ScanUnit, ConventionError> {
        let reject = |reason| unrecognized(Convention::Filename, path, reason);

        let stem = file_stem(path).ok_or_else(|| reject("no file name"))?;
        let rest = stem
            .strip_prefix(FILE_PREFIX)
            .ok_or_else(|| reject("file name does not start with R1-"))?;
        let (roll, label) = rest
            .split_once('-')
            .ok_or_else(|| reject("file name is not R1-<roll>-<frame>"))?;
        if !is_digits(roll, FILE_ROLL_DIGITS) {
            return Err(reject("roll token is not five digits"));
        }
        if label.is_empty() {
            return Err(reject("empty frame label"));
        }

        let order_id = path
            .ancestors()
            .skip(1)
            .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()))
            .find_map(order_from_roll_dir)
            .ok_or_else(|| reject("no <name>_<order:6> ancestor directory"))?;

        Ok(ScanUnit {
            source_path: path.to_path_buf(),
            order_id: order_id.to_string(),
            roll_number: parse_number(roll).ok_or_else(|| reject("roll number out of range"))?,
            raw_frame_label: label.to_string(),
            discovery_order,
        })
    }
}

/// Extract the order token from a `<customer>_<order:6>` directory name.
fn order_from_roll_dir(name: &str) -> Option<&str> {
    let (customer, order) = name.rsplit_once('_')?;
    (valid_id(customer) && is_digits(order, DIR_NUMBER_DIGITS)).then_some(order)
}

fn unrecognized(convention: Convention, path: &Path, reason: &'static str) -> ConventionError {
    ConventionError::UnrecognizedFormat {
        convention,
        path: path.to_path_buf(),
        reason,
    }
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn valid_id(id: &str) -> bool {
    (1..=MAX_ID_CHARS).contains(&id.chars().count())
}

fn parse_number(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

/// Split `name` into a prefix and its trailing `digits`-long number.
fn split_trailing_number(name: &str, digits: usize) -> Option<(&str, &str)> {
    let split = name.len().checked_sub(digits)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (prefix, number) = name.split_at(split);
    is_digits(number, digits).then_some((prefix, number))
}

// ============================================================================
// Frame label ranking
// ============================================================================

/// Sort key for a raw frame label, used when a roll trusts its labels.
///
/// Film edge markings run `X`, `00`, `0`, `1`, ..., `E`, each optionally
/// followed by an `A` half-frame. Scanner software appends `_NNNN` when the
/// same label is exported twice and writes half-frame pairs as `L-R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelRank {
    class: u8,
    number: u32,
    half: bool,
    copy: u32,
}

/// Rank a frame label, or `None` if it has no recognizable shape.
pub fn label_rank(label: &str) -> Option<LabelRank> {
    let (base, copy) = match label.split_once('_') {
        Some((base, copy)) => (base, copy.parse().ok()?),
        None => (label, 0),
    };
    // Half-frame pairs sort by their left side.
    let base = base.split('-').next().unwrap_or(base);
    let (base, half) = match base.strip_suffix(['A', 'a']) {
        Some(b) => (b, true),
        None => (base, false),
    };

    // The `00` edge marker sits between `X` and `0`; longer runs of zeros
    // are ordinary padded numbers.
    let (class, number) = match base {
        "X" | "x" => (0, 0),
        "00" => (1, 0),
        "E" | "e" => (3, 0),
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            (2, digits.parse().ok()?)
        }
        _ => return None,
    };

    Some(LabelRank {
        class,
        number,
        half,
        copy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str) -> Result<ScanUnit, ConventionError> {
        DirectoryConvention.parse(Path::new(path), 0)
    }

    fn file(path: &str) -> Result<ScanUnit, ConventionError> {
        FilenameConvention.parse(Path::new(path), 0)
    }

    // =========================================================================
    // Directory convention
    // =========================================================================

    #[test]
    fn directory_named_order() {
        let unit = dir("/scans/Customer001234/000007.jpg").unwrap();
        assert_eq!(unit.order_id, "Customer");
        assert_eq!(unit.roll_number, 1234);
        assert_eq!(unit.raw_frame_label, "000007");
    }

    #[test]
    fn directory_all_digit_order() {
        let unit = dir("000001007466/000001.tif").unwrap();
        assert_eq!(unit.order_id, "000001");
        assert_eq!(unit.roll_number, 7466);
    }

    #[test]
    fn directory_keeps_discovery_order_from_caller() {
        let unit = DirectoryConvention
            .parse(Path::new("Smith000012/000003.jpg"), 42)
            .unwrap();
        assert_eq!(unit.discovery_order, 42);
    }

    #[test]
    fn directory_rejects_non_counter_file_name() {
        assert!(dir("Customer001234/R1234F1.jpg").is_err());
        assert!(dir("Customer001234/00001.jpg").is_err());
        assert!(dir("Customer001234/0000001.jpg").is_err());
    }

    #[test]
    fn directory_rejects_bad_directory() {
        // No order id before the roll number
        assert!(dir("001234/000001.jpg").is_err());
        // Order id longer than ten characters
        assert!(dir("VeryLongCustomer001234/000001.jpg").is_err());
        // Roll number not six digits
        assert!(dir("Customer1234/000001.jpg").is_err());
    }

    #[test]
    fn directory_multibyte_order_id() {
        let unit = dir("Müller000005/000002.jpg").unwrap();
        assert_eq!(unit.order_id, "Müller");
        assert_eq!(unit.roll_number, 5);
    }

    #[test]
    fn directory_error_names_convention() {
        let err = dir("loose/photo.jpg").unwrap_err();
        assert!(matches!(
            err,
            ConventionError::UnrecognizedFormat {
                convention: Convention::Directory,
                ..
            }
        ));
        assert!(err.to_string().contains("photo.jpg"));
    }

    // =========================================================================
    // Filename convention
    // =========================================================================

    #[test]
    fn filename_basic() {
        let unit = file("Customer_001234/R1-00131-0001.JPG").unwrap();
        assert_eq!(unit.order_id, "001234");
        assert_eq!(unit.roll_number, 131);
        assert_eq!(unit.raw_frame_label, "0001");
    }

    #[test]
    fn filename_nested_in_export_folder() {
        let unit = file("/x/Smith_007466/Export JPG NoResize/R1-00046-0000A_0001.JPG").unwrap();
        assert_eq!(unit.order_id, "007466");
        assert_eq!(unit.roll_number, 46);
        assert_eq!(unit.raw_frame_label, "0000A_0001");
    }

    #[test]
    fn filename_rejects_wrong_layout() {
        assert!(file("Customer_001234/000001.jpg").is_err());
        assert!(file("Customer_001234/R1-131-0001.jpg").is_err());
        assert!(file("Customer_001234/R1-00131-.jpg").is_err());
        assert!(file("Customer_001234/R2-00131-0001.jpg").is_err());
    }

    #[test]
    fn filename_requires_order_directory() {
        assert!(file("Customer001234/R1-00131-0001.JPG").is_err());
        assert!(file("R1-00131-0001.JPG").is_err());
    }

    #[test]
    fn convention_selects_adapter() {
        assert_eq!(
            Convention::Directory.adapter().convention(),
            Convention::Directory
        );
        assert_eq!(
            Convention::Filename.adapter().convention(),
            Convention::Filename
        );
    }

    // =========================================================================
    // Label ranking
    // =========================================================================

    fn rank(label: &str) -> LabelRank {
        label_rank(label).unwrap_or_else(|| panic!("label {label} should rank"))
    }

    #[test]
    fn numeric_labels_rank_by_value() {
        assert!(rank("000002") < rank("000010"));
        assert!(rank("0009") < rank("0010"));
    }

    #[test]
    fn film_edge_markers_order() {
        assert!(rank("X") < rank("00"));
        assert!(rank("00") < rank("00A"));
        assert!(rank("00A") < rank("0"));
        assert!(rank("00-00A") < rank("0-0A"));
        assert!(rank("0") < rank("0A"));
        assert!(rank("0A") < rank("1"));
        assert!(rank("36A") < rank("E"));
    }

    #[test]
    fn padded_zero_is_numeric_not_edge_marker() {
        assert_eq!(rank("0000"), rank("0"));
        assert!(rank("00") < rank("0000"));
    }

    #[test]
    fn copy_suffix_follows_base() {
        assert!(rank("0000A") < rank("0000A_0001"));
        assert!(rank("0000A_0001") < rank("0001"));
    }

    #[test]
    fn half_frame_pairs_use_left_side() {
        assert_eq!(rank("3-3A"), rank("3"));
        assert!(rank("2-2A") < rank("3-3A"));
    }

    #[test]
    fn garbage_labels_do_not_rank() {
        assert_eq!(label_rank(""), None);
        assert_eq!(label_rank("frame"), None);
        assert_eq!(label_rank("12_x"), None);
    }
}
