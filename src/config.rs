//! Run configuration module.
//!
//! Handles loading, validating, and merging `scanroll.toml`. Stock defaults
//! are overridden by an optional `scanroll.toml` in the source root, which is
//! in turn overridden by command-line flags.
//!
//! ## Config File Location
//!
//! ```text
//! scans/
//! ├── scanroll.toml          # Optional, overrides stock defaults
//! ├── Customer001234/
//! │   └── ...
//! └── Customer001235/
//!     └── ...
//! ```
//!
//! The file is not an image, so the scanner never treats it as a candidate.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! convention = "directory"  # or "filename"
//! reorg = false             # move rolls into <order>/<date>/<roll>/
//!
//! [directory]
//! frame_order = "discovery" # or "label"
//! roll_padding = 4
//! frame_padding = 1
//!
//! [filename]
//! frame_order = "discovery"
//! roll_padding = 1
//! frame_padding = 2
//!
//! [timeline]
//! step_ms = 1               # gap between consecutive frames
//!
//! [tags]
//! enabled = true
//! tool = "exiftool"
//! # make = "FUJI PHOTO FILM CO., LTD."
//! # model = "SP-3000"
//!
//! [conversion]
//! extensions = ["bmp"]      # re-encoded losslessly
//! format = "tiff"           # or "png"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::convention::Convention;
use crate::imaging::{ConversionRule, ConvertFormat};
use crate::naming::{Layout, Padding};
use crate::plan::PlanOptions;
use crate::process::TagOptions;
use crate::reindex::FrameOrder;
use crate::scan::IMAGE_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the source root.
pub const CONFIG_FILE_NAME: &str = "scanroll.toml";

/// Widest roll or frame number field accepted.
const MAX_PADDING: usize = 9;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `scanroll.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Which export layout to parse.
    pub convention: Convention,
    /// Move rolls into `<order>/<date>/<roll>/` under the source root.
    pub reorg: bool,
    /// Settings used when `convention = "directory"`.
    pub directory: ConventionConfig,
    /// Settings used when `convention = "filename"`.
    pub filename: ConventionConfig,
    pub timeline: TimelineConfig,
    /// Capture metadata written into every output file.
    pub tags: TagsConfig,
    /// Lossless re-encoding of raw exports.
    pub conversion: ConversionConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            convention: Convention::default(),
            reorg: false,
            directory: ConventionConfig::directory_defaults(),
            filename: ConventionConfig::filename_defaults(),
            timeline: TimelineConfig::default(),
            tags: TagsConfig::default(),
            conversion: ConversionConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, conv) in [("directory", &self.directory), ("filename", &self.filename)] {
            for (key, value) in [
                ("roll_padding", conv.roll_padding),
                ("frame_padding", conv.frame_padding),
            ] {
                if !(1..=MAX_PADDING).contains(&value) {
                    return Err(ConfigError::Validation(format!(
                        "{section}.{key} must be 1-{MAX_PADDING}"
                    )));
                }
            }
        }
        if self.timeline.step_ms == 0 {
            return Err(ConfigError::Validation(
                "timeline.step_ms must be at least 1".into(),
            ));
        }
        if self.tags.enabled && self.tags.tool.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tags.tool must not be empty when tagging is enabled".into(),
            ));
        }
        for ext in &self.conversion.extensions {
            if !IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::Validation(format!(
                    "conversion.extensions: '{ext}' is not a scanned image extension (expected one of {})",
                    IMAGE_EXTENSIONS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Settings for the active convention.
    pub fn active(&self) -> &ConventionConfig {
        match self.convention {
            Convention::Directory => &self.directory,
            Convention::Filename => &self.filename,
        }
    }

    /// Mutable settings for the active convention, for command-line overrides.
    pub fn active_mut(&mut self) -> &mut ConventionConfig {
        match self.convention {
            Convention::Directory => &mut self.directory,
            Convention::Filename => &mut self.filename,
        }
    }

    pub fn conversion_rule(&self) -> ConversionRule {
        ConversionRule {
            extensions: self
                .conversion
                .extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            format: self.conversion.format,
        }
    }

    /// Planner options for a run rooted at `root`.
    pub fn plan_options(&self, root: &Path) -> PlanOptions {
        let active = self.active();
        PlanOptions {
            convention: self.convention,
            frame_order: active.frame_order,
            padding: active.padding(),
            layout: if self.reorg {
                Layout::Reorganized {
                    root: root.to_path_buf(),
                }
            } else {
                Layout::Flat
            },
            conversion: self.conversion_rule(),
        }
    }

    pub fn tag_options(&self) -> TagOptions {
        TagOptions {
            make: self.tags.make.clone(),
            model: self.tags.model.clone(),
        }
    }
}

/// Per-convention naming and ordering settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConventionConfig {
    /// What decides a frame's number within its roll.
    pub frame_order: FrameOrder,
    /// Minimum digits for the roll number in output names.
    pub roll_padding: usize,
    /// Minimum digits for the frame number in output names.
    pub frame_padding: usize,
}

impl ConventionConfig {
    /// `R1234F1`: roll numbers are short order-scoped counters.
    pub fn directory_defaults() -> Self {
        Self {
            frame_order: FrameOrder::Discovery,
            roll_padding: 4,
            frame_padding: 1,
        }
    }

    /// `R131F01`: roll numbers are lab-wide and already wide.
    pub fn filename_defaults() -> Self {
        Self {
            frame_order: FrameOrder::Discovery,
            roll_padding: 1,
            frame_padding: 2,
        }
    }

    pub fn padding(&self) -> Padding {
        Padding {
            roll: self.roll_padding,
            frame: self.frame_padding,
        }
    }
}

/// Timestamp spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    /// Milliseconds between consecutive frames of the run.
    pub step_ms: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { step_ms: 1 }
    }
}

/// Capture metadata settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagsConfig {
    /// Write capture tags at all.
    pub enabled: bool,
    /// `exiftool` executable, looked up on `PATH` unless absolute.
    pub tool: String,
    /// Optional `EXIF:Make`.
    pub make: Option<String>,
    /// Optional `EXIF:Model`.
    pub model: Option<String>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tool: "exiftool".to_string(),
            make: None,
            model: None,
        }
    }
}

/// Lossless conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Source extensions to re-encode, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Output format for converted files.
    pub format: ConvertFormat,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["bmp".to_string()],
            format: ConvertFormat::Tiff,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel file workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(RunConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `scanroll.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RunConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RunConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `scanroll.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<RunConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `scanroll.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# scanroll configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as scanroll.toml in the directory you run scanroll on.
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# Export layout of the scans:
#   "directory" - <order><6-digit roll>/<6-digit frame>.jpg
#   "filename"  - <customer>_<order>/R1-<5-digit roll>-<frame label>.jpg
convention = "directory"

# Move every roll into <order>/<YYYYMMDD>/<roll>/ under the source root
# instead of renaming in place. Emptied source directories are removed.
reorg = false

# ---------------------------------------------------------------------------
# Per-convention naming
# ---------------------------------------------------------------------------
# frame_order decides frame numbers within a roll:
#   "discovery" - sorted file-name order, ignoring the scanner's frame label
#   "label"     - the scanner's frame label (X < 1..N < E, copies last)
# Paddings are minimum digit counts in R<roll>F<frame>.
[directory]
frame_order = "discovery"
roll_padding = 4
frame_padding = 1

[filename]
frame_order = "discovery"
roll_padding = 1
frame_padding = 2

# ---------------------------------------------------------------------------
# Timestamps
# ---------------------------------------------------------------------------
[timeline]
# Milliseconds between consecutive frames. The whole run shares one
# timeline starting at the run's start time (now, or --start).
step_ms = 1

# ---------------------------------------------------------------------------
# Capture metadata
# ---------------------------------------------------------------------------
[tags]
# Write EXIF DateTimeOriginal/DateTimeDigitized (+ sub-seconds).
enabled = true

# Metadata tool executable.
tool = "exiftool"

# Optional scanner identification.
# make = "FUJI PHOTO FILM CO., LTD."
# model = "SP-3000"

# ---------------------------------------------------------------------------
# Lossless conversion
# ---------------------------------------------------------------------------
[conversion]
# Source extensions to re-encode. The original is deleted once the
# converted file is written and tagged.
extensions = ["bmp"]

# "tiff" or "png"
format = "tiff"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel file workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
