//! # scanroll
//!
//! Gives film-scanner exports a stable identity and a capture order.
//!
//! Lab scanners (Noritsu, Frontier) export one file per frame, but their file
//! names are counters or sensor guesses, and they carry no capture time. Photo
//! managers then sort a roll by file modification time, which breaks the moment
//! a file is rotated or copied. scanroll renames every frame to a canonical
//! `R<roll>F<frame>` name and stamps a strictly increasing capture timestamp,
//! so any tool that sorts by name or by EXIF time sees the roll in order.
//!
//! # Architecture: Plan, Then Apply
//!
//! ```text
//! 1. Scan     source tree  →  ScanUnits    (convention adapter per file)
//! 2. Group    ScanUnits    →  Rolls        (by order + roll, first-seen order)
//! 3. Reindex  Roll         →  frames 1..N  (discovery order, or scanner label)
//! 4. Assign   all frames   →  T0, T0+δ, …  (one timeline for the whole run)
//! 5. Name     frame        →  R1234F1.jpg  (+ destination directory)
//! 6. Apply    RunPlan      →  disk         (convert, tag, move; in parallel)
//! ```
//!
//! Steps 1–5 build a [`plan::RunPlan`] without touching any file. The plan is
//! checked for colliding names as a whole before step 6 starts, and step 6
//! only reads it, so parallel side effects cannot disturb the order decided
//! in the plan. `scanroll plan` prints the plan and stops there.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`convention`] | Source layouts: directory-named rolls or file-named rolls |
//! | [`scan`] | Walks the source root, stamps discovery order, runs the adapter |
//! | [`group`] | Partitions units into rolls |
//! | [`reindex`] | Dense 1-based frame numbers within a roll |
//! | [`timeline`] | Run-wide timestamp cursor |
//! | [`naming`] | Canonical file names and destination directories |
//! | [`plan`] | Composes the steps above into a validated [`plan::RunPlan`] |
//! | [`process`] | Applies a plan: conversion, tagging, moves, cleanup |
//! | [`imaging`] | Lossless re-encoding of raw exports via the `image` crate |
//! | [`metadata`] | EXIF capture tags via `exiftool` |
//! | [`config`] | `scanroll.toml` loading, validation, and merging |
//! | [`types`] | Shared types passed between stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Discovery Order Over Frame Labels
//!
//! Scanner frame labels come from reading the film edge and are often wrong
//! (`X`, `00`, `E`, duplicates from rescans). The sorted file-name order of the
//! export is what the operator saw on the scanner, so by default it decides
//! frame numbers. The label order is available per convention through
//! `frame_order = "label"`.
//!
//! ## One Timeline Per Run
//!
//! The cursor is never reset between rolls. Frame `N` of roll `k+1` is always
//! later than every frame of roll `k`, so rolls processed together sort
//! together in any photo manager.

pub mod config;
pub mod convention;
pub mod group;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod plan;
pub mod process;
pub mod reindex;
pub mod scan;
pub mod timeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
