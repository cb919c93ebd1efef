//! Observers and notification (`spec.md §4.G`).

use std::rc::{Rc, Weak};

use crate::time::Time;

/// Anything that can be notified of a modification at a given time.
///
/// Implemented by access strategies and by signal-subscription objects;
/// `notify` is called synchronously, within the call stack of the mutation
/// that triggered it (`spec.md §4.G`, §5: "all notifications are synchronous
/// function calls").
pub trait Notifiable {
    /// React to a modification at `t`.
    fn notify(&self, t: Time);
}

/// A lazily-allocated, pointer-deduplicated list of weak subscriber
/// references.
///
/// Observers are stored as `Weak` so a dropped subscriber (e.g. an unbound
/// strategy) disappears on its own; `notify_all` prunes dead entries as it
/// goes rather than requiring an explicit unsubscribe, though callers are
/// still expected to call [`ObserverList::remove`] on `unbind` for the
/// common case (`spec.md §9`: duplicate-add rejection uses pointer
/// identity).
#[derive(Default)]
pub struct ObserverList {
    subscribers: Vec<Weak<dyn Notifiable>>,
}

impl ObserverList {
    /// An empty list; no allocation happens until the first `add`.
    pub fn new() -> Self {
        ObserverList { subscribers: Vec::new() }
    }

    /// Add `subscriber`, unless a pointer-identical one is already present.
    /// Returns `false` if rejected as a duplicate.
    pub fn add(&mut self, subscriber: &Rc<dyn Notifiable>) -> bool {
        let already_present = self.subscribers.iter().any(|w| matches!(w.upgrade(), Some(existing) if Rc::ptr_eq(&existing, subscriber)));
        if already_present {
            return false;
        }
        self.subscribers.push(Rc::downgrade(subscriber));
        true
    }

    /// Remove a subscriber by pointer identity. Idempotent.
    pub fn remove(&mut self, subscriber: &Rc<dyn Notifiable>) {
        self.subscribers.retain(|w| w.upgrade().map_or(false, |existing| !Rc::ptr_eq(&existing, subscriber)));
    }

    /// Notify every live subscriber with `t`, pruning any that have been
    /// dropped. Snapshots the list before iterating so a subscriber that
    /// removes itself (or another) during `notify` cannot corrupt the walk
    /// or be visited twice (`spec.md §5`: "tolerate subscriber removal from
    /// within `notify` ... by snapshotting before iterating").
    pub fn notify_all(&mut self, t: Time) {
        let snapshot: Vec<Rc<dyn Notifiable>> = self.subscribers.iter().filter_map(Weak::upgrade).collect();
        self.subscribers.retain(|w| w.strong_count() > 0);
        for subscriber in snapshot {
            subscriber.notify(t);
        }
    }

    /// `true` if there are no (live or dead) subscribers registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.iter().all(|w| w.upgrade().is_none())
    }

    /// Count of currently-live subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.iter().filter(|w| w.upgrade().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    struct Counter(Cell<u64>);
    impl Notifiable for Counter {
        fn notify(&self, t: Time) {
            self.0.set(t.raw());
        }
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut list = ObserverList::new();
        let sub: Rc<dyn Notifiable> = Rc::new(Counter(Cell::new(0)));
        assert!(list.add(&sub));
        assert!(!list.add(&sub));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn dropped_subscriber_is_pruned_on_notify() {
        let mut list = ObserverList::new();
        {
            let sub: Rc<dyn Notifiable> = Rc::new(Counter(Cell::new(0)));
            list.add(&sub);
        }
        assert_eq!(list.len(), 0);
        list.notify_all(Time::new(1));
        assert!(list.is_empty());
    }

    #[test]
    fn notify_delivers_current_time_once() {
        let mut list = ObserverList::new();
        let sub = Rc::new(Counter(Cell::new(0)));
        let dyn_sub: Rc<dyn Notifiable> = sub.clone();
        list.add(&dyn_sub);
        list.notify_all(Time::new(5));
        assert_eq!(sub.0.get(), 5);
    }
}
