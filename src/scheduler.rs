//! The scheduler collaborator's tick-boundary hook (`spec.md §6`:
//! "Scheduler collaborator: `register_delta_reset_callback(fn)` — must call
//! `fn` at tick boundary").
//!
//! The evaluation scheduler itself is out of scope (`spec.md §1`, §5); this
//! module only gives it something to call. [`TSOutput::new`] registers its
//! own delta/dead-slot reset through [`register_delta_reset_callback`]
//! automatically, so node authors never need to call it directly — but the
//! registration point stays public for anything else built on top of a
//! [`crate::ts_value::TSValue`] outside a `TSOutput`.

use std::cell::RefCell;

thread_local! {
    static CALLBACKS: RefCell<Vec<Box<dyn FnMut()>>> = RefCell::new(Vec::new());
}

/// Register `callback` to run once per tick boundary. Registrations are
/// never removed; a callback closing over a `Weak` handle (as
/// [`crate::io::TSOutput`] does) is expected to no-op once its target is
/// dropped, the same lifetime pattern [`crate::observer::ObserverList`]
/// uses for subscribers.
pub fn register_delta_reset_callback(callback: impl FnMut() + 'static) {
    CALLBACKS.with(|cell| cell.borrow_mut().push(Box::new(callback)));
}

/// Run every registered callback once. The scheduler calls this at each
/// tick boundary, after the last mutation of the tick that just ended and
/// before the first of the next (`spec.md §4.E`: "buffers are valid for
/// exactly one tick").
pub fn run_delta_reset_callbacks() {
    CALLBACKS.with(|cell| {
        for callback in cell.borrow_mut().iter_mut() {
            callback();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn registered_callbacks_run_on_every_tick_boundary() {
        let count = Rc::new(Cell::new(0u32));
        let count_for_callback = count.clone();
        register_delta_reset_callback(move || count_for_callback.set(count_for_callback.get() + 1));

        run_delta_reset_callbacks();
        run_delta_reset_callbacks();

        assert_eq!(count.get(), 2);
    }
}
