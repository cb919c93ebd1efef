//! Set container storage (`spec.md §4.B`).

use crate::container::slot::{SlotObserver, SlotTable};
use crate::value::Scalar;

/// A set of scalar keys backed by a [`SlotTable`].
///
/// `erase` marks a slot dead rather than freeing it immediately, so the
/// overlay layer can still answer "what was removed, and what was its
/// value" for the rest of the tick.
#[derive(Debug, Clone, Default)]
pub struct SetStorage {
    slots: SlotTable<Scalar>,
}

impl SetStorage {
    /// An empty set.
    pub fn new() -> Self {
        SetStorage { slots: SlotTable::new() }
    }

    /// Insert `key`, notifying `observers`. Returns the slot index.
    pub fn insert(&mut self, key: Scalar, observers: &mut [&mut dyn SlotObserver]) -> usize {
        self.slots.insert(key, observers)
    }

    /// Erase `key` if present, notifying `observers`.
    pub fn erase(&mut self, key: &Scalar, observers: &mut [&mut dyn SlotObserver]) -> Option<usize> {
        self.slots.erase(key, observers)
    }

    /// `true` if `key` is currently a live member.
    pub fn contains(&self, key: &Scalar) -> bool {
        self.slots.contains(key)
    }

    /// Locate the live slot for `key`.
    pub fn find(&self, key: &Scalar) -> Option<usize> {
        self.slots.find(key)
    }

    /// The key occupying `slot`, live or dead-this-tick.
    pub fn key_at_slot(&self, slot: usize) -> Option<&Scalar> {
        self.slots.key_at_slot(slot)
    }

    /// Erase every member.
    pub fn clear(&mut self, observers: &mut [&mut dyn SlotObserver]) {
        self.slots.clear(observers)
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if there are no live members.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate live members in slot order.
    pub fn live_keys(&self) -> impl Iterator<Item = &Scalar> {
        self.slots.live().map(|(_, k)| k)
    }

    /// Iterate (slot, key) for live members.
    pub fn live(&self) -> impl Iterator<Item = (usize, &Scalar)> {
        self.slots.live()
    }

    /// Free slots erased during the tick that just ended.
    pub fn end_tick(&mut self) {
        self.slots.end_tick()
    }

    /// Structural equality: same live members, order independent.
    pub fn sets_equal(&self, other: &SetStorage) -> bool {
        self.len() == other.len() && self.live_keys().all(|k| other.contains(k))
    }
}
