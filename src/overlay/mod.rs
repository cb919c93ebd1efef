//! The time-series overlay tree: per-element modification timestamps,
//! observer lists, and delta buffers, mirroring container storage shape
//! (`spec.md §3`, §4.E).
//!
//! Each overlay node holds a raw parent *pointer* in the original design
//! notes' own words (`spec.md §9`); in safe Rust that back-pointer is
//! realised instead as the recursive call stack of [`Overlay::mark_modified`]
//! descending from the tree's root along the same [`crate::path::Path`] a
//! mutation took, and propagating the timestamp upward again as each
//! recursive call returns. This is the "index-based parent link" §9
//! recommends, just expressed as control flow instead of a stored index —
//! it reaches the root in exactly `path.len()` frames, matching the O(depth)
//! requirement, without any node ever storing a pointer to its parent.

pub mod bundle;
pub mod list;
pub mod map;
pub mod reference;
pub mod scalar;
pub mod set;
pub mod signal;
pub mod window;

use crate::observer::{Notifiable, ObserverList};
use crate::path::PathElement;
use crate::time::Time;
use crate::value::Value;

pub use bundle::BundleOverlay;
pub use list::ListOverlay;
pub use map::MapOverlay;
pub use reference::ReferenceOverlay;
pub use scalar::ScalarOverlay;
pub use set::{SetDelta, SetOverlay};
pub use signal::SignalOverlay;
pub use window::WindowOverlay;

/// Fields shared by every overlay kind.
#[derive(Default)]
pub struct OverlayCore {
    last_modified_time: Time,
    observers: ObserverList,
}

impl OverlayCore {
    /// A fresh overlay core, never modified.
    pub fn new() -> Self {
        OverlayCore::default()
    }

    /// `last_modified_time == t` (`spec.md §4.E`).
    pub fn modified_at(&self, t: Time) -> bool {
        self.last_modified_time == t
    }

    /// `last_modified_time > Time::MIN` (`spec.md §4.E`).
    pub fn has_value(&self) -> bool {
        self.last_modified_time.has_value()
    }

    /// The most recent modification time.
    pub fn last_modified_time(&self) -> Time {
        self.last_modified_time
    }

    /// Update the local timestamp to `max(current, t)`. Returns `true` if it
    /// advanced.
    fn bump(&mut self, t: Time) -> bool {
        if self.last_modified_time < t {
            self.last_modified_time = t;
            true
        } else {
            false
        }
    }

    /// Reset to the sentinel with no propagation (`spec.md §4.E`:
    /// "`mark_invalid` ... does not propagate").
    fn invalidate(&mut self) {
        self.last_modified_time = Time::MIN;
    }

    /// Subscribe `subscriber` to modifications at this level or any
    /// descendant.
    pub fn subscribe(&mut self, subscriber: &std::rc::Rc<dyn Notifiable>) -> bool {
        self.observers.add(subscriber)
    }

    /// Unsubscribe `subscriber`. Idempotent.
    pub fn unsubscribe(&mut self, subscriber: &std::rc::Rc<dyn Notifiable>) {
        self.observers.remove(subscriber)
    }

    fn notify(&mut self, t: Time) {
        self.observers.notify_all(t);
    }
}

/// One node of the overlay tree, tagged by the same kind its paired
/// container value has.
pub enum Overlay {
    /// `TS[T]` overlay: a modification flag, nothing more.
    Scalar(ScalarOverlay),
    /// `TSB` overlay: one child overlay per bundle field.
    Bundle(BundleOverlay),
    /// `TSL` overlay: one child overlay per list element.
    List(ListOverlay),
    /// `TSS` overlay: add/remove delta buffers, no children.
    Set(SetOverlay),
    /// `TSD` overlay: add/remove key buffers plus a child overlay per live
    /// entry.
    Map(MapOverlay),
    /// `TSW` overlay: a timestamped ring, no children.
    Window(WindowOverlay),
    /// `REF` overlay: a modification flag marking reference changes.
    Reference(ReferenceOverlay),
    /// `SIGNAL` overlay: a modification flag, no payload.
    Signal(SignalOverlay),
}

impl Overlay {
    /// Borrow the fields common to every kind.
    pub fn core(&self) -> &OverlayCore {
        match self {
            Overlay::Scalar(o) => &o.core,
            Overlay::Bundle(o) => &o.core,
            Overlay::List(o) => &o.core,
            Overlay::Set(o) => &o.core,
            Overlay::Map(o) => &o.core,
            Overlay::Window(o) => &o.core,
            Overlay::Reference(o) => &o.core,
            Overlay::Signal(o) => &o.core,
        }
    }

    /// Mutably borrow the fields common to every kind.
    pub fn core_mut(&mut self) -> &mut OverlayCore {
        match self {
            Overlay::Scalar(o) => &mut o.core,
            Overlay::Bundle(o) => &mut o.core,
            Overlay::List(o) => &mut o.core,
            Overlay::Set(o) => &mut o.core,
            Overlay::Map(o) => &mut o.core,
            Overlay::Window(o) => &mut o.core,
            Overlay::Reference(o) => &mut o.core,
            Overlay::Signal(o) => &mut o.core,
        }
    }

    fn child_mut(&mut self, element: &PathElement) -> Option<&mut Overlay> {
        match (self, element) {
            (Overlay::Bundle(b), PathElement::Field { index, .. }) => b.fields.get_mut(*index),
            (Overlay::List(l), PathElement::Index(i)) => l.elements.get_mut(*i),
            (Overlay::Map(m), PathElement::Index(slot)) => m.entries.get_mut(slot),
            _ => None,
        }
    }

    /// Mark the node reached by `path` (relative to `self`) modified at `t`,
    /// then propagate the timestamp upward through every ancestor on this
    /// call's way back out, notifying each level's observers as it goes
    /// (`spec.md §4.E`: "upward propagation reaches root in O(depth)";
    /// §8: "observers ... notified exactly once with argument t").
    pub fn mark_modified(&mut self, path: &[PathElement], t: Time) {
        let changed_below = match path.split_first() {
            None => false,
            Some((head, rest)) => match self.child_mut(head) {
                Some(child) => {
                    child.mark_modified(rest, t);
                    true
                }
                None => false,
            },
        };
        let changed_here = self.core_mut().bump(t);
        if changed_here || changed_below {
            self.core_mut().notify(t);
        }
    }

    /// Reset the node reached by `path` to "never modified", with no
    /// propagation to ancestors (`spec.md §4.E`).
    pub fn mark_invalid(&mut self, path: &[PathElement]) {
        match path.split_first() {
            None => self.core_mut().invalidate(),
            Some((head, rest)) => {
                if let Some(child) = self.child_mut(head) {
                    child.mark_invalid(rest);
                }
            }
        }
    }

    /// `last_modified_time == t` at the node reached by `path`.
    pub fn modified_at(&self, path: &[PathElement], t: Time) -> bool {
        self.at_path(path).map(|o| o.core().modified_at(t)).unwrap_or(false)
    }

    /// Navigate (read-only) to the overlay node at `path`.
    pub fn at_path(&self, path: &[PathElement]) -> Option<&Overlay> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.child(head)?.at_path(rest),
        }
    }

    fn child(&self, element: &PathElement) -> Option<&Overlay> {
        match (self, element) {
            (Overlay::Bundle(b), PathElement::Field { index, .. }) => b.fields.get(*index),
            (Overlay::List(l), PathElement::Index(i)) => l.elements.get(*i),
            (Overlay::Map(m), PathElement::Index(slot)) => m.entries.get(slot),
            _ => None,
        }
    }

    /// Free dead container slots and clear this tick's delta buffers,
    /// recursing into every live child (`spec.md §6`: "Delta cache (for
    /// sets/maps) is registered for end-of-tick clearing via a hook the
    /// scheduler calls"). A no-op for kinds with no delta/slot state of
    /// their own.
    pub fn end_tick(&mut self, value: &mut Value) {
        match (self, value) {
            (Overlay::Bundle(b), Value::Bundle(items)) => {
                for (child, item) in b.fields.iter_mut().zip(items.iter_mut()) {
                    child.end_tick(item);
                }
            }
            (Overlay::List(l), Value::List(items)) => {
                for (child, item) in l.elements.iter_mut().zip(items.iter_mut()) {
                    child.end_tick(item);
                }
            }
            (Overlay::Set(o), Value::Set(set)) => {
                set.end_tick();
                o.delta.end_tick();
            }
            (Overlay::Map(o), Value::Map(map)) => {
                let slots: Vec<usize> = o.entries.keys().copied().collect();
                for slot in slots {
                    if let (Some(child), Some(v)) = (o.entries.get_mut(&slot), map.value_at_slot_mut(slot)) {
                        child.end_tick(v);
                    }
                }
                map.end_tick();
                o.delta.end_tick();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::path::Path;

    #[test]
    fn mark_modified_propagates_to_root_and_notifies_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Probe(Cell<u32>);
        impl Notifiable for Probe {
            fn notify(&self, _t: Time) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut root = Overlay::Bundle(BundleOverlay::new(vec![Overlay::Scalar(ScalarOverlay::new()), Overlay::Scalar(ScalarOverlay::new())]));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();
        root.core_mut().subscribe(&dyn_probe);

        let path = Path::root().extended(PathElement::Field { name: "y".into(), index: 1 });
        root.mark_modified(path.elements(), Time::new(3));

        assert!(root.modified_at(&[], Time::new(3)));
        assert!(root.modified_at(path.elements(), Time::new(3)));
        assert!(!root.modified_at(&[PathElement::Field { name: "x".into(), index: 0 }], Time::new(3)));
        assert_eq!(probe.0.get(), 1);
    }

    #[test]
    fn mark_invalid_does_not_touch_parent() {
        let mut root = Overlay::Bundle(BundleOverlay::new(vec![Overlay::Scalar(ScalarOverlay::new())]));
        root.mark_modified(&[PathElement::Field { name: "x".into(), index: 0 }], Time::new(2));
        root.mark_invalid(&[PathElement::Field { name: "x".into(), index: 0 }]);
        assert!(!root.modified_at(&[PathElement::Field { name: "x".into(), index: 0 }], Time::new(2)));
        assert!(root.modified_at(&[], Time::new(2)), "parent timestamp must be untouched by mark_invalid");
    }
}
