//! CLI output formatting for the plan and run stages.
//!
//! # Roll-First Display
//!
//! Output is organized by roll, the unit an operator checks against the lab
//! order. Each roll leads with its positional index and identity; files follow
//! indented, old name first and new name after the arrow. Paths are shown
//! relative to the source root.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! 001 Customer/1234 (3 frames)
//!     Destination: Customer001234/
//!     001 000001.jpg → R1234F1.jpg  2024-03-15 14:30:00.000
//!     002 000007.jpg → R1234F2.jpg  2024-03-15 14:30:00.001
//!     003 000008.bmp → R1234F3.tif  2024-03-15 14:30:00.002 (convert)
//!
//! Skipped
//!     Customer001234/IMG_2201.jpg: frame is not a six-digit counter
//!
//! Planned 3 files in 1 roll
//! ```
//!
//! ## Run
//!
//! ```text
//! Renamed Customer001234/000001.jpg → Customer001234/R1234F1.jpg
//! Converted Customer001234/000008.bmp → Customer001234/R1234F3.tif
//! Failed Customer001234/000007.jpg: Tagging failed: ...
//!
//! Processed 2 files (1 converted), 1 failed
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::convention::ConventionError;
use crate::plan::{PlannedFile, RunPlan};
use crate::process::{ProcessEvent, ProcessResult};
use crate::scan::Skipped;
use chrono::NaiveDateTime;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Path relative to the source root when it lies beneath it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn display_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

// ============================================================================
// Plan output
// ============================================================================

fn planned_file_line(index: usize, file: &PlannedFile) -> String {
    let convert = if file.convert_to.is_some() {
        " (convert)"
    } else {
        ""
    };
    format!(
        "    {} {} → {}  {}{}",
        format_index(index),
        file_name(file.source()),
        file.name.file_name,
        display_timestamp(file.timestamp()),
        convert
    )
}

/// Format the dry-run view of a plan.
pub fn format_plan(plan: &RunPlan, skipped: &[Skipped], source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, roll) in plan.rolls.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            roll.key,
            plural(roll.files.len(), "frame", "frames")
        ));
        lines.push(format!(
            "    Destination: {}/",
            display_path(&roll.destination, source_root)
        ));
        for (j, file) in roll.files.iter().enumerate() {
            lines.push(planned_file_line(j + 1, file));
        }
    }

    lines.extend(format_skipped(skipped, source_root));

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Planned {} in {}",
        plural(plan.file_count(), "file", "files"),
        plural(plan.rolls.len(), "roll", "rolls")
    ));
    lines
}

/// Format the list of candidates no convention could parse.
///
/// Empty when nothing was skipped.
pub fn format_skipped(skipped: &[Skipped], source_root: &Path) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Skipped".to_string()];
    for s in skipped {
        let ConventionError::UnrecognizedFormat { reason, .. } = &s.reason;
        lines.push(format!(
            "    {}: {}",
            display_path(&s.path, source_root),
            reason
        ));
    }
    lines
}

/// Print the plan to stdout.
pub fn print_plan(plan: &RunPlan, skipped: &[Skipped], source_root: &Path) {
    for line in format_plan(plan, skipped, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Run output
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent, source_root: &Path) -> Vec<String> {
    match event {
        ProcessEvent::FileApplied(applied) => {
            let verb = if applied.converted {
                "Converted"
            } else {
                "Renamed"
            };
            vec![format!(
                "{} {} → {}",
                verb,
                display_path(&applied.source, source_root),
                display_path(&applied.destination, source_root)
            )]
        }
        ProcessEvent::FileFailed { source, error } => {
            vec![format!(
                "Failed {}: {}",
                display_path(source, source_root),
                error
            )]
        }
        ProcessEvent::DirectoryRemoved(dir) => {
            vec![format!("Removed {}/", display_path(dir, source_root))]
        }
    }
}

/// Format the closing summary of a run.
pub fn format_summary(result: &ProcessResult, skipped: usize) -> Vec<String> {
    let converted = result.applied.iter().filter(|a| a.converted).count();
    let mut summary = format!(
        "Processed {}",
        plural(result.applied.len(), "file", "files")
    );
    if converted > 0 {
        summary.push_str(&format!(" ({converted} converted)"));
    }
    if result.has_failures() {
        summary.push_str(&format!(", {} failed", result.failures.len()));
    }
    if skipped > 0 {
        summary.push_str(&format!(", {skipped} skipped"));
    }
    if !result.removed_dirs.is_empty() {
        summary.push_str(&format!(
            ", removed {}",
            plural(result.removed_dirs.len(), "directory", "directories")
        ));
    }
    vec![String::new(), summary]
}

pub fn print_summary(result: &ProcessResult, skipped: usize) {
    for line in format_summary(result, skipped) {
        println!("{}", line);
    }
}
