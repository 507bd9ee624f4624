//! Slot reconciliation
//!
//! Stored configs only contain assigned slots, so their ids can have gaps.
//! The editor works on a dense list where every id from 1 up to the highest
//! one is present. [`densify`] fills the gaps with empty placeholders and
//! [`sparsify`] strips them again before the list is persisted.

use std::collections::HashSet;

use coe_core::Slot;

/// Fill id gaps with empty placeholders and sort by id.
///
/// The upper bound is the id of the *last* slot, so the input must already
/// be sorted ascending by id. An empty input stays empty. The slot cap is
/// not checked here.
pub fn densify(slots: &[Slot]) -> Vec<Slot> {
    let Some(last) = slots.last() else {
        return Vec::new();
    };

    let present: HashSet<u32> = slots.iter().map(|s| s.id).collect();

    let mut dense = slots.to_vec();
    dense.extend(
        (1..=last.id)
            .filter(|id| !present.contains(id))
            .map(Slot::empty),
    );
    dense.sort_by_key(|s| s.id);
    dense
}

/// Drop unassigned slots, keeping the order and the original ids.
pub fn sparsify(slots: &[Slot]) -> Vec<Slot> {
    slots.iter().filter(|s| !s.is_empty()).cloned().collect()
}

/// True when the ids are exactly `1..=len` in order
pub fn is_dense(slots: &[Slot]) -> bool {
    slots
        .iter()
        .enumerate()
        .all(|(index, slot)| slot.id as usize == index + 1)
}
