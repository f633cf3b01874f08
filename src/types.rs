//! Shared types passed between pipeline stages.
//!
//! Every stage downstream of the adapters is convention-agnostic: it only sees
//! [`ScanUnit`]s and the types derived from them.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One scanned image, as discovered on disk.
///
/// Created once per source file by a source convention and never mutated.
/// `discovery_order` is stamped by the walker, not by the adapter, and is the
/// authoritative capture sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanUnit {
    pub source_path: PathBuf,
    pub order_id: String,
    pub roll_number: u32,
    /// Frame label as written by the scanner software. Not trusted by default.
    pub raw_frame_label: String,
    pub discovery_order: usize,
}

impl ScanUnit {
    pub fn roll_key(&self) -> RollKey {
        RollKey {
            order_id: self.order_id.clone(),
            roll_number: self.roll_number,
        }
    }

    /// Source extension with its original case, without the dot.
    pub fn extension(&self) -> String {
        self.source_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Roll identity: `(order_id, roll_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RollKey {
    pub order_id: String,
    pub roll_number: u32,
}

impl fmt::Display for RollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.order_id, self.roll_number)
    }
}

/// All units of one roll, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roll {
    pub key: RollKey,
    pub members: Vec<ScanUnit>,
}

impl Roll {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A scan unit with its repaired, 1-based frame number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFrame {
    pub unit: ScanUnit,
    pub corrected_frame_number: u32,
}

/// A resolved frame with its assigned capture instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampedFrame {
    pub frame: ResolvedFrame,
    pub assigned_timestamp: NaiveDateTime,
}

impl TimestampedFrame {
    pub fn unit(&self) -> &ScanUnit {
        &self.frame.unit
    }
}

/// Final identity of an output file: its file name and the directory it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalName {
    pub file_name: String,
    pub directory: PathBuf,
}

impl CanonicalName {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}
