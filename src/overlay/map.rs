//! `TSD` overlay (`spec.md §4.E`): key add/remove/update delta buffers plus
//! a child overlay per live entry, lazily created on first key insertion.

use std::collections::HashMap;

use super::{Overlay, OverlayCore};
use crate::time::Time;
use crate::value::{Scalar, Value};

/// Key add/remove/update delta buffer for one tick, plus the buffered
/// key/value/overlay of anything removed this tick (`spec.md §4.E`: "kept
/// for this tick before destruction").
#[derive(Default)]
pub struct MapDelta {
    last_delta_time: Time,
    added: std::collections::HashSet<usize>,
    removed: std::collections::HashSet<usize>,
    updated: std::collections::HashSet<usize>,
    buffered_removed: HashMap<usize, (Scalar, Value, Overlay)>,
}

impl MapDelta {
    /// An empty delta buffer.
    pub fn new() -> Self {
        MapDelta::default()
    }

    fn maybe_reset(&mut self, t: Time) {
        if t != self.last_delta_time {
            self.added.clear();
            self.removed.clear();
            self.updated.clear();
            self.buffered_removed.clear();
            self.last_delta_time = t;
        }
    }

    /// Record that `slot` received a new key at `t`.
    pub fn record_key_added(&mut self, slot: usize, t: Time) {
        self.maybe_reset(t);
        if self.removed.remove(&slot) {
            self.removed.insert(slot);
        }
        self.added.insert(slot);
    }

    /// Record that `slot`'s value was rewritten in place at `t` (key
    /// unchanged).
    pub fn record_value_updated(&mut self, slot: usize, t: Time) {
        self.maybe_reset(t);
        if !self.added.contains(&slot) {
            self.updated.insert(slot);
        }
    }

    /// Record that `slot` was removed at `t`, buffering its key, value, and
    /// child overlay so they remain reachable until the next tick begins
    /// (`spec.md §8`: map delta key buffers).
    pub fn record_key_removed(&mut self, slot: usize, t: Time, key: Scalar, value: Value, overlay: Overlay) {
        self.maybe_reset(t);
        if !self.added.remove(&slot) {
            self.removed.insert(slot);
        }
        self.buffered_removed.insert(slot, (key, value, overlay));
    }

    /// Keys (slots) added this tick.
    pub fn added(&self) -> impl Iterator<Item = &usize> {
        self.added.iter()
    }

    /// Keys (slots) removed this tick.
    pub fn removed(&self) -> impl Iterator<Item = &usize> {
        self.removed.iter()
    }

    /// Keys (slots) whose value changed in place this tick.
    pub fn updated(&self) -> impl Iterator<Item = &usize> {
        self.updated.iter()
    }

    /// The buffered (key, value, overlay) for a slot removed this tick.
    pub fn buffered_removal(&self, slot: usize) -> Option<&(Scalar, Value, Overlay)> {
        self.buffered_removed.get(&slot)
    }

    /// Drop this tick's add/remove/update buffers and the buffered
    /// removed-entry payloads, freeing whatever they hold
    /// (`spec.md §6`: the scheduler's delta-reset hook; §8: "the removed
    /// value overlay and the key string remain accessible until tick 10
    /// begins").
    pub fn end_tick(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.updated.clear();
        self.buffered_removed.clear();
    }
}

/// Overlay for a key -> time-series mapping.
#[derive(Default)]
pub struct MapOverlay {
    pub(super) core: OverlayCore,
    pub delta: MapDelta,
    pub(super) entries: HashMap<usize, Overlay>,
    /// Tracks empty <-> non-empty transitions so subscribers can observe
    /// emptiness changes without scanning (`spec.md §4.E`).
    empty_transition: OverlayCore,
}

impl MapOverlay {
    /// A fresh, empty overlay.
    pub fn new() -> Self {
        MapOverlay::default()
    }

    /// Create the child overlay for a newly inserted key (`spec.md §4.E`:
    /// "TSD value overlays are created on `record_key_added`").
    pub fn insert_entry(&mut self, slot: usize, overlay: Overlay, t: Time) {
        let was_empty = self.entries.is_empty();
        self.entries.insert(slot, overlay);
        self.delta.record_key_added(slot, t);
        self.core.bump(t);
        self.core.notify(t);
        if was_empty {
            self.empty_transition.bump(t);
            self.empty_transition.notify(t);
        }
    }

    /// Remove and return the child overlay for `slot`, buffering it (with
    /// `key`/`value`) in the delta for the rest of the tick.
    pub fn remove_entry(&mut self, slot: usize, key: Scalar, value: Value, t: Time) {
        if let Some(overlay) = self.entries.remove(&slot) {
            self.delta.record_key_removed(slot, t, key, value, overlay);
            self.core.bump(t);
            self.core.notify(t);
            if self.entries.is_empty() {
                self.empty_transition.bump(t);
                self.empty_transition.notify(t);
            }
        }
    }

    /// Record that `slot`'s value changed in place (key unchanged) and
    /// advance the map's own timestamp.
    pub fn update_entry(&mut self, slot: usize, t: Time) {
        self.delta.record_value_updated(slot, t);
        self.core.bump(t);
        self.core.notify(t);
    }

    /// Borrow the child overlay for a live entry.
    pub fn entry(&self, slot: usize) -> Option<&Overlay> {
        self.entries.get(&slot)
    }

    /// Mutably borrow the child overlay for a live entry.
    pub fn entry_mut(&mut self, slot: usize) -> Option<&mut Overlay> {
        self.entries.get_mut(&slot)
    }

    /// `true` iff the map currently has no live entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
