//! Canonical output names.
//!
//! Every output file is named `R<roll>F<frame>.<ext>`:
//!
//! - `Customer001234/000007.jpg`, second frame of roll 1234 → `R1234F2.jpg`
//! - `Customer_001234/R1-00131-0001.JPG`, first frame of roll 131 → `R131F01.JPG`
//!
//! Roll and frame are zero-padded to a configured minimum width; wider
//! numbers are never truncated. The extension keeps its original case.
//!
//! ## Destination directory
//!
//! - **Flat**: the directory the roll's first member was found in.
//! - **Reorganized**: `<root>/<order_id>/<YYYYMMDD>/<roll>/`, the date taken
//!   from the roll's first assigned timestamp so one roll never straddles two
//!   date directories.

use crate::types::{CanonicalName, RollKey, TimestampedFrame};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum digit widths for the roll and frame numbers in a canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub roll: usize,
    pub frame: usize,
}

/// Where a roll's renamed files land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Rename in place.
    Flat,
    /// Move under `root/order/date/roll/`.
    Reorganized { root: PathBuf },
}

/// Build the canonical file name for a roll/frame pair.
pub fn canonical_file_name(
    roll_number: u32,
    frame_number: u32,
    extension: &str,
    padding: Padding,
) -> String {
    let stem = format!(
        "R{}F{}",
        pad(roll_number, padding.roll),
        pad(frame_number, padding.frame)
    );
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

/// Roll number as it appears in names and directory labels.
pub fn roll_label(roll_number: u32, padding: Padding) -> String {
    pad(roll_number, padding.roll)
}

fn pad(value: u32, width: usize) -> String {
    format!("{value:0>width$}")
}

/// Destination directory for a roll.
///
/// `first_source` is the source path of the roll's first member and
/// `first_timestamp` its assigned capture instant.
pub fn destination_dir(
    layout: &Layout,
    key: &RollKey,
    first_source: &Path,
    first_timestamp: NaiveDateTime,
    padding: Padding,
) -> PathBuf {
    match layout {
        Layout::Flat => first_source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        Layout::Reorganized { root } => root
            .join(&key.order_id)
            .join(date_label(first_timestamp))
            .join(roll_label(key.roll_number, padding)),
    }
}

/// `YYYYMMDD` directory label for an instant.
pub fn date_label(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y%m%d").to_string()
}

/// Name one frame, given its roll's destination directory and output extension.
pub fn name(
    frame: &TimestampedFrame,
    directory: &Path,
    extension: &str,
    padding: Padding,
) -> CanonicalName {
    CanonicalName {
        file_name: canonical_file_name(
            frame.unit().roll_number,
            frame.frame.corrected_frame_number,
            extension,
            padding,
        ),
        directory: directory.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::t0;

    const DIRECTORY_PADDING: Padding = Padding { roll: 4, frame: 1 };
    const FILENAME_PADDING: Padding = Padding { roll: 1, frame: 2 };

    #[test]
    fn directory_convention_names() {
        let names: Vec<String> = (1..=3)
            .map(|f| canonical_file_name(1234, f, "jpg", DIRECTORY_PADDING))
            .collect();
        assert_eq!(names, vec!["R1234F1.jpg", "R1234F2.jpg", "R1234F3.jpg"]);
    }

    #[test]
    fn filename_convention_name_keeps_extension_case() {
        assert_eq!(
            canonical_file_name(131, 1, "JPG", FILENAME_PADDING),
            "R131F01.JPG"
        );
    }

    #[test]
    fn short_roll_is_padded() {
        assert_eq!(
            canonical_file_name(46, 7, "tif", DIRECTORY_PADDING),
            "R0046F7.tif"
        );
    }

    #[test]
    fn wide_numbers_not_truncated() {
        assert_eq!(
            canonical_file_name(123456, 123, "jpg", FILENAME_PADDING),
            "R123456F123.jpg"
        );
    }

    #[test]
    fn missing_extension() {
        assert_eq!(canonical_file_name(1, 1, "", FILENAME_PADDING), "R1F01");
    }

    #[test]
    fn naming_is_deterministic() {
        let a = canonical_file_name(77, 12, "jpg", DIRECTORY_PADDING);
        let b = canonical_file_name(77, 12, "jpg", DIRECTORY_PADDING);
        assert_eq!(a, b);
    }

    #[test]
    fn flat_destination_is_source_dir() {
        let key = RollKey {
            order_id: "Customer".into(),
            roll_number: 1234,
        };
        let dir = destination_dir(
            &Layout::Flat,
            &key,
            Path::new("/scans/Customer001234/000001.jpg"),
            t0(),
            DIRECTORY_PADDING,
        );
        assert_eq!(dir, PathBuf::from("/scans/Customer001234"));
    }

    #[test]
    fn reorganized_destination() {
        let key = RollKey {
            order_id: "001234".into(),
            roll_number: 131,
        };
        let layout = Layout::Reorganized {
            root: PathBuf::from("/scans"),
        };
        let dir = destination_dir(
            &layout,
            &key,
            Path::new("/scans/Smith_001234/Export/R1-00131-0001.JPG"),
            t0(),
            DIRECTORY_PADDING,
        );
        assert_eq!(dir, PathBuf::from("/scans/001234/20240315/0131"));
    }

    #[test]
    fn date_label_format() {
        assert_eq!(date_label(t0()), "20240315");
    }
}
