//! Map container storage: a key [`crate::container::set::SetStorage`]
//! composed with a parallel value array (`spec.md §4.B`).

use crate::container::slot::{SlotObserver, SlotTable};
use crate::value::{Scalar, Value};

/// A key -> value mapping.
///
/// The value array registers itself as a slot observer on the key table so
/// that key insertion/erasure drives matching value-slot
/// creation/destruction; `value_at_slot(s)` is valid iff the corresponding
/// key slot is live (`spec.md §4.B`).
#[derive(Debug, Clone, Default)]
pub struct MapStorage {
    keys: SlotTable<Scalar>,
    values: Vec<Option<Value>>,
}

impl MapStorage {
    /// An empty map.
    pub fn new() -> Self {
        MapStorage { keys: SlotTable::new(), values: Vec::new() }
    }

    fn sync_capacity(&mut self) {
        if self.values.len() < self.keys.capacity() {
            self.values.resize_with(self.keys.capacity(), || None);
        }
    }

    /// Insert or overwrite `key` -> `value`. Notifies `observers` of the
    /// underlying key-table events (insert or update).
    pub fn insert(&mut self, key: Scalar, value: Value, observers: &mut [&mut dyn SlotObserver]) -> usize {
        if let Some(slot) = self.keys.find(&key) {
            self.values[slot] = Some(value);
            for o in observers.iter_mut() {
                o.on_update(slot);
            }
            return slot;
        }
        let slot = self.keys.insert(key, observers);
        self.sync_capacity();
        self.values[slot] = Some(value);
        slot
    }

    /// Remove `key`, returning its value if present.
    pub fn remove(&mut self, key: &Scalar, observers: &mut [&mut dyn SlotObserver]) -> Option<Value> {
        self.remove_with_slot(key, observers).map(|(_, v)| v)
    }

    /// Remove `key`, returning its slot and value if present. The slot lets
    /// the caller buffer the matching overlay child for the rest of the
    /// tick (`spec.md §4.E`).
    pub fn remove_with_slot(&mut self, key: &Scalar, observers: &mut [&mut dyn SlotObserver]) -> Option<(usize, Value)> {
        let slot = self.keys.erase(key, observers)?;
        self.values[slot].take().map(|v| (slot, v))
    }

    /// Locate the live slot for `key`, if any.
    pub fn find_slot(&self, key: &Scalar) -> Option<usize> {
        self.keys.find(key)
    }

    /// Borrow the value for `key`, if live.
    pub fn get(&self, key: &Scalar) -> Option<&Value> {
        let slot = self.keys.find(key)?;
        self.values.get(slot).and_then(|v| v.as_ref())
    }

    /// Mutably borrow the value for `key`, if live.
    pub fn get_mut(&mut self, key: &Scalar) -> Option<&mut Value> {
        let slot = self.keys.find(key)?;
        self.values.get_mut(slot).and_then(|v| v.as_mut())
    }

    /// The value still readable at `slot` (live or dead-this-tick key).
    pub fn value_at_slot(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot).and_then(|v| v.as_ref())
    }

    /// Mutably borrow the value at `slot`, for recursing into a live
    /// entry's own nested delta state at a tick boundary.
    pub fn value_at_slot_mut(&mut self, slot: usize) -> Option<&mut Value> {
        self.values.get_mut(slot).and_then(|v| v.as_mut())
    }

    /// The key occupying `slot`, live or dead-this-tick.
    pub fn key_at_slot(&self, slot: usize) -> Option<&Scalar> {
        self.keys.key_at_slot(slot)
    }

    /// `true` iff `key` currently maps to a live value.
    pub fn contains_key(&self, key: &Scalar) -> bool {
        self.keys.contains(key)
    }

    /// Remove every entry.
    pub fn clear(&mut self, observers: &mut [&mut dyn SlotObserver]) {
        self.keys.clear(observers);
        for v in self.values.iter_mut() {
            *v = None;
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if the map has no live entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate live (key, value) pairs.
    pub fn live_entries(&self) -> impl Iterator<Item = (&Scalar, &Value)> {
        self.keys.live().filter_map(move |(slot, k)| self.values[slot].as_ref().map(|v| (k, v)))
    }

    /// Free key slots erased during the tick that just ended.
    pub fn end_tick(&mut self) {
        self.keys.end_tick()
    }

    /// Structural equality over live entries.
    pub fn entries_equal(&self, other: &MapStorage) -> bool {
        self.len() == other.len()
            && self
                .live_entries()
                .all(|(k, v)| other.get(k).map(|ov| ov.values_equal(v)).unwrap_or(false))
    }
}
