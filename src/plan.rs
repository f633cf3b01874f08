//! Run planning: everything that decides names and timestamps.
//!
//! ```text
//! scan units → group_rolls → reindex (per roll) → assign (all rolls) → name
//! ```
//!
//! A [`RunPlan`] is computed for the whole run before any file is touched.
//! Side effects in [`process`](crate::process) only ever read it, which is
//! what lets them run in parallel without threatening the ordering
//! guarantees established here.
//!
//! The plan is also the dry-run output: `scanroll plan` prints it and stops.

use crate::convention::Convention;
use crate::group::group_rolls;
use crate::imaging::{ConversionRule, ConvertFormat};
use crate::naming::{self, Layout, Padding};
use crate::reindex::{FrameOrder, reindex};
use crate::scan::{self, ScanError, Skipped};
use crate::timeline::{self, TimelineError, TimestampCursor};
use crate::types::{CanonicalName, ResolvedFrame, RollKey, ScanUnit, TimestampedFrame};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Timestamp assignment failed: {0}")]
    Timeline(#[from] TimelineError),
    #[error(
        "Internal error: {} and {} would both be written to {}",
        first.display(),
        second.display(),
        path.display()
    )]
    NameCollision {
        path: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Everything the planner needs besides the units and the cursor.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub convention: Convention,
    pub frame_order: FrameOrder,
    pub padding: Padding,
    pub layout: Layout,
    pub conversion: ConversionRule,
}

/// One file's fate.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub frame: TimestampedFrame,
    pub name: CanonicalName,
    /// Set when the source must be re-encoded on the way to `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_to: Option<ConvertFormat>,
}

impl PlannedFile {
    pub fn source(&self) -> &Path {
        &self.frame.unit().source_path
    }

    pub fn destination(&self) -> PathBuf {
        self.name.path()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.frame.assigned_timestamp
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedRoll {
    pub key: RollKey,
    pub destination: PathBuf,
    pub files: Vec<PlannedFile>,
}

/// The complete, validated outcome of naming and timestamping a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub convention: Convention,
    pub rolls: Vec<PlannedRoll>,
}

impl RunPlan {
    /// All files in roll order, then capture order.
    pub fn files(&self) -> impl Iterator<Item = &PlannedFile> {
        self.rolls.iter().flat_map(|r| r.files.iter())
    }

    pub fn file_count(&self) -> usize {
        self.rolls.iter().map(|r| r.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}

/// Plan plus the candidates the convention could not parse.
#[derive(Debug)]
pub struct PlanOutcome {
    pub plan: RunPlan,
    pub skipped: Vec<Skipped>,
}

/// Scan `root` and plan every recognized file.
pub fn plan_directory(
    root: &Path,
    options: &PlanOptions,
    cursor: &mut TimestampCursor,
) -> Result<PlanOutcome, PlanError> {
    let scanned = scan::scan(root, options.convention.adapter())?;
    let plan = build_plan(&scanned.units, options, cursor)?;
    Ok(PlanOutcome {
        plan,
        skipped: scanned.skipped,
    })
}

/// Group, reindex, timestamp and name a run's units.
pub fn build_plan(
    units: &[ScanUnit],
    options: &PlanOptions,
    cursor: &mut TimestampCursor,
) -> Result<RunPlan, PlanError> {
    let rolls = group_rolls(units);
    let resolved: Vec<Vec<ResolvedFrame>> = rolls
        .iter()
        .map(|roll| reindex(roll, options.frame_order))
        .collect();
    let mut stamped = timeline::assign(&resolved, cursor)?.into_iter();

    let mut planned_rolls = Vec::with_capacity(rolls.len());
    for (roll, frames) in rolls.iter().zip(&resolved) {
        let frames: Vec<TimestampedFrame> = stamped.by_ref().take(frames.len()).collect();
        let Some(first) = frames.first() else {
            continue;
        };
        let destination = naming::destination_dir(
            &options.layout,
            &roll.key,
            &first.unit().source_path,
            first.assigned_timestamp,
            options.padding,
        );
        let files = frames
            .into_iter()
            .map(|frame| {
                let convert_to = options.conversion.target_for(&frame.unit().extension());
                let extension = match convert_to {
                    Some(format) => format.extension().to_string(),
                    None => frame.unit().extension(),
                };
                let name = naming::name(&frame, &destination, &extension, options.padding);
                PlannedFile {
                    frame,
                    name,
                    convert_to,
                }
            })
            .collect();
        tracing::debug!(roll = %roll.key, destination = %destination.display(), "planned roll");
        planned_rolls.push(PlannedRoll {
            key: roll.key.clone(),
            destination,
            files,
        });
    }

    let plan = RunPlan {
        convention: options.convention,
        rolls: planned_rolls,
    };
    check_unique_destinations(&plan)?;
    Ok(plan)
}

/// Canonical names must be injective over the run.
fn check_unique_destinations(plan: &RunPlan) -> Result<(), PlanError> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(plan.file_count());
    for file in plan.files() {
        let destination = file.destination();
        if let Some(first) = seen.get(&destination) {
            return Err(PlanError::NameCollision {
                path: destination,
                first: first.to_path_buf(),
                second: file.source().to_path_buf(),
            });
        }
        seen.insert(destination, file.source());
    }
    Ok(())
}
