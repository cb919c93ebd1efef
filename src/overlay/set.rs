//! `TSS` overlay (`spec.md §4.E`): add/remove delta buffers over set slots.

use std::collections::HashSet;

use super::OverlayCore;
use crate::time::Time;

/// Add/remove delta buffer for one tick, with insert/erase cancellation
/// within the tick (`spec.md §4.E`, §8: "set delta cancellation").
#[derive(Default)]
pub struct SetDelta {
    last_delta_time: Time,
    added: HashSet<usize>,
    removed: HashSet<usize>,
}

impl SetDelta {
    /// An empty delta buffer.
    pub fn new() -> Self {
        SetDelta::default()
    }

    fn maybe_reset(&mut self, t: Time) {
        if t != self.last_delta_time {
            self.added.clear();
            self.removed.clear();
            self.last_delta_time = t;
        }
    }

    /// Record that `slot` was inserted at `t`. Returns `true` if this is a
    /// net addition (`false` if it cancelled a same-tick removal of the
    /// same slot).
    pub fn record_added(&mut self, slot: usize, t: Time) -> bool {
        self.maybe_reset(t);
        if self.removed.remove(&slot) {
            // erase-then-insert within the tick: both sides are recorded
            // (slot reuse semantics, `spec.md §8`).
            self.removed.insert(slot);
            self.added.insert(slot);
            true
        } else {
            self.added.insert(slot);
            true
        }
    }

    /// Record that `slot` was erased at `t`. Returns `true` if this is a
    /// net removal (`false` if it cancelled a same-tick insertion of the
    /// same slot).
    pub fn record_removed(&mut self, slot: usize, t: Time) -> bool {
        self.maybe_reset(t);
        if self.added.remove(&slot) {
            // insert-then-erase within the tick: net zero effect.
            false
        } else {
            self.removed.insert(slot);
            true
        }
    }

    /// Slots added this tick.
    pub fn added(&self) -> impl Iterator<Item = &usize> {
        self.added.iter()
    }

    /// Slots removed this tick.
    pub fn removed(&self) -> impl Iterator<Item = &usize> {
        self.removed.iter()
    }

    /// `true` iff `slot` was added this tick.
    pub fn was_added(&self, slot: usize) -> bool {
        self.added.contains(&slot)
    }

    /// `true` iff `slot` was removed this tick.
    pub fn was_removed(&self, slot: usize) -> bool {
        self.removed.contains(&slot)
    }

    /// Drop this tick's add/remove buffers, independent of whether a write
    /// lands on the next tick to trigger [`SetDelta::maybe_reset`] lazily
    /// (`spec.md §6`: the scheduler's delta-reset hook).
    pub fn end_tick(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

/// Overlay for a set of scalars.
#[derive(Default)]
pub struct SetOverlay {
    pub(super) core: OverlayCore,
    pub delta: SetDelta,
}

impl SetOverlay {
    /// A fresh, never-modified overlay with an empty delta buffer.
    pub fn new() -> Self {
        SetOverlay::default()
    }

    /// Record an insertion and advance the set's own timestamp only if it
    /// had a net effect (`spec.md §9` open question, resolved in
    /// `SPEC_FULL.md §13`: a zero-net change does not bump the set's own
    /// `last_modified_time`).
    pub fn record_added(&mut self, slot: usize, t: Time) {
        if self.delta.record_added(slot, t) {
            self.core.bump(t);
            self.core.notify(t);
        }
    }

    /// Record a removal, with the same zero-net-change policy as
    /// [`SetOverlay::record_added`].
    pub fn record_removed(&mut self, slot: usize, t: Time) {
        if self.delta.record_removed(slot, t) {
            self.core.bump(t);
            self.core.notify(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_then_erase_same_tick_cancels() {
        let mut delta = SetDelta::new();
        let t = Time::new(5);
        assert!(delta.record_added(10, t));
        assert!(!delta.record_removed(10, t));
        assert!(!delta.was_added(10));
        assert!(!delta.was_removed(10));
    }

    #[test]
    fn erase_then_insert_same_tick_records_both() {
        let mut delta = SetDelta::new();
        let t = Time::new(5);
        assert!(delta.record_removed(10, t));
        assert!(delta.record_added(10, t));
        assert!(delta.was_added(10));
        assert!(delta.was_removed(10));
    }

    #[test]
    fn zero_net_change_does_not_advance_set_timestamp() {
        let mut overlay = SetOverlay::new();
        let t = Time::new(5);
        overlay.record_added(10, t);
        overlay.record_removed(10, t);
        assert!(!overlay.core.has_value(), "zero-net change must not bump the set's own timestamp");
    }
}
