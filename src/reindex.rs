//! Frame reindexing.
//!
//! The scanner's frame counter skips, repeats and reorders numbers, so raw
//! labels are not used as frame numbers. Each roll is renumbered `1..=N` in
//! capture order. Gaps are never preserved.
//!
//! Capture order is discovery order unless the roll's convention is
//! configured with [`FrameOrder::Label`], in which case members are stably
//! sorted by [`label_rank`] first. Labels that do not rank keep their
//! discovery position relative to each other and sort after ranked labels.

use crate::convention::label_rank;
use crate::types::{ResolvedFrame, Roll, ScanUnit};
use serde::{Deserialize, Serialize};

/// What decides the capture order within a roll.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FrameOrder {
    /// Order in which files were discovered on disk.
    #[default]
    Discovery,
    /// Raw frame labels from the file names, discovery order breaking ties.
    Label,
}

/// Renumber a roll's members as contiguous frames starting at 1.
pub fn reindex(roll: &Roll, order: FrameOrder) -> Vec<ResolvedFrame> {
    let mut members: Vec<&ScanUnit> = roll.members.iter().collect();
    members.sort_by_key(|u| u.discovery_order);
    if order == FrameOrder::Label {
        // Stable: equal ranks stay in discovery order.
        members.sort_by_key(|u| {
            let rank = label_rank(&u.raw_frame_label);
            (rank.is_none(), rank)
        });
    }

    members
        .into_iter()
        .zip(1u32..)
        .map(|(unit, frame)| ResolvedFrame {
            unit: unit.clone(),
            corrected_frame_number: frame,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{roll_of, unit};

    fn frames(resolved: &[ResolvedFrame]) -> Vec<u32> {
        resolved.iter().map(|f| f.corrected_frame_number).collect()
    }

    fn labels(resolved: &[ResolvedFrame]) -> Vec<&str> {
        resolved
            .iter()
            .map(|f| f.unit.raw_frame_label.as_str())
            .collect()
    }

    #[test]
    fn empty_roll_yields_nothing() {
        let roll = roll_of(vec![]);
        assert!(reindex(&roll, FrameOrder::Discovery).is_empty());
    }

    #[test]
    fn single_member_is_frame_one() {
        let roll = roll_of(vec![unit("A", 1, "000017", 0)]);
        assert_eq!(frames(&reindex(&roll, FrameOrder::Discovery)), vec![1]);
    }

    #[test]
    fn skipped_labels_become_contiguous() {
        let roll = roll_of(vec![
            unit("Customer", 1234, "000001", 0),
            unit("Customer", 1234, "000007", 1),
            unit("Customer", 1234, "000008", 2),
        ]);
        let resolved = reindex(&roll, FrameOrder::Discovery);
        assert_eq!(frames(&resolved), vec![1, 2, 3]);
        assert_eq!(labels(&resolved), vec!["000001", "000007", "000008"]);
    }

    #[test]
    fn duplicate_and_missing_labels_still_one_to_n() {
        let roll = roll_of(vec![
            unit("A", 1, "000003", 0),
            unit("A", 1, "000003", 1),
            unit("A", 1, "", 2),
            unit("A", 1, "000001", 3),
        ]);
        assert_eq!(
            frames(&reindex(&roll, FrameOrder::Discovery)),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn discovery_order_beats_labels() {
        let roll = roll_of(vec![
            unit("A", 1, "000009", 2),
            unit("A", 1, "000002", 0),
            unit("A", 1, "000005", 1),
        ]);
        let resolved = reindex(&roll, FrameOrder::Discovery);
        assert_eq!(labels(&resolved), vec!["000002", "000005", "000009"]);
    }

    #[test]
    fn label_order_sorts_by_rank() {
        let roll = roll_of(vec![
            unit("A", 1, "0002", 0),
            unit("A", 1, "0000A", 1),
            unit("A", 1, "X", 2),
            unit("A", 1, "E", 3),
            unit("A", 1, "0000A_0001", 4),
        ]);
        let resolved = reindex(&roll, FrameOrder::Label);
        assert_eq!(
            labels(&resolved),
            vec!["X", "0000A", "0000A_0001", "0002", "E"]
        );
        assert_eq!(frames(&resolved), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn label_order_keeps_unrankable_in_discovery_order_at_end() {
        let roll = roll_of(vec![
            unit("A", 1, "junk-b", 0),
            unit("A", 1, "0003", 1),
            unit("A", 1, "?", 2),
            unit("A", 1, "0001", 3),
        ]);
        let resolved = reindex(&roll, FrameOrder::Label);
        assert_eq!(labels(&resolved), vec!["0001", "0003", "junk-b", "?"]);
    }

    #[test]
    fn label_order_ties_keep_discovery_order() {
        let roll = roll_of(vec![unit("A", 1, "0001", 1), unit("A", 1, "0001", 0)]);
        let resolved = reindex(&roll, FrameOrder::Label);
        let orders: Vec<usize> = resolved.iter().map(|f| f.unit.discovery_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }
}
