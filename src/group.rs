//! Roll grouping.
//!
//! Partitions a run's scan units by `(order_id, roll_number)`. Rolls come out
//! in order of their first discovered member, and members keep their
//! discovery order, so the result is fully determined by the walk.

use crate::types::{Roll, RollKey, ScanUnit};
use std::collections::HashMap;

/// Group units into rolls, ordered by first discovery.
///
/// Input order does not matter: members are sorted by `discovery_order`
/// before partitioning.
pub fn group_rolls(units: &[ScanUnit]) -> Vec<Roll> {
    let mut sorted: Vec<&ScanUnit> = units.iter().collect();
    sorted.sort_by_key(|u| u.discovery_order);

    let mut index: HashMap<RollKey, usize> = HashMap::new();
    let mut rolls: Vec<Roll> = Vec::new();
    for unit in sorted {
        let key = unit.roll_key();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            rolls.push(Roll {
                key,
                members: Vec::new(),
            });
            rolls.len() - 1
        });
        rolls[slot].members.push(unit.clone());
    }
    rolls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::unit;

    fn find_roll<'a>(rolls: &'a [Roll], key: &RollKey) -> Option<&'a Roll> {
        rolls.iter().find(|r| &r.key == key)
    }

    #[test]
    fn empty_input_yields_no_rolls() {
        assert!(group_rolls(&[]).is_empty());
    }

    #[test]
    fn partitions_by_order_and_roll() {
        let units = vec![
            unit("A", 1, "000001", 0),
            unit("A", 2, "000001", 1),
            unit("B", 1, "000001", 2),
            unit("A", 1, "000002", 3),
        ];
        let rolls = group_rolls(&units);

        assert_eq!(rolls.len(), 3);
        let total: usize = rolls.iter().map(Roll::len).sum();
        assert_eq!(total, units.len());

        let a1 = find_roll(
            &rolls,
            &RollKey {
                order_id: "A".into(),
                roll_number: 1,
            },
        )
        .unwrap();
        assert_eq!(a1.len(), 2);
    }

    #[test]
    fn same_roll_number_different_orders_stay_apart() {
        let units = vec![unit("A", 7, "000001", 0), unit("B", 7, "000001", 1)];
        let rolls = group_rolls(&units);
        assert_eq!(rolls.len(), 2);
        assert!(rolls.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn rolls_ordered_by_first_discovery() {
        let units = vec![
            unit("Z", 9, "000001", 0),
            unit("A", 1, "000001", 1),
            unit("Z", 9, "000002", 2),
        ];
        let rolls = group_rolls(&units);
        assert_eq!(rolls[0].key.order_id, "Z");
        assert_eq!(rolls[1].key.order_id, "A");
    }

    #[test]
    fn members_keep_discovery_order_regardless_of_input_order() {
        let units = vec![
            unit("A", 1, "000009", 5),
            unit("A", 1, "000001", 2),
            unit("A", 1, "000004", 3),
        ];
        let rolls = group_rolls(&units);
        let orders: Vec<usize> = rolls[0].members.iter().map(|u| u.discovery_order).collect();
        assert_eq!(orders, vec![2, 3, 5]);
    }
}
