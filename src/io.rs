//! `TSInput`/`TSOutput` facades: a node's typed endpoints for producing and
//! consuming a time series (`spec.md §4.I`, §6).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::Config;
use crate::container::reference::{ReferenceTarget, TargetHandle};
use crate::error::{Error, Result};
use crate::observer::Notifiable;
use crate::scheduler::register_delta_reset_callback;
use crate::strategy::{self, Strategy};
use crate::time::Time;
use crate::ts_meta::TSMeta;
use crate::ts_value::TSValue;
use crate::value::Value;

/// A node's endpoint for producing a time series.
///
/// Holds the only strong reference to its backing `TSValue`; bound inputs
/// and `REF` targets only ever see a `Weak` one through
/// [`TSOutput::target_handle`] (`spec.md §4.B`).
pub struct TSOutput {
    state: Rc<RefCell<TSValue>>,
}

impl TSOutput {
    /// A fresh output for `schema`, using default engine config.
    pub fn new(schema: &'static TSMeta) -> Self {
        let output = TSOutput { state: Rc::new(RefCell::new(TSValue::new(schema))) };
        output.register_delta_reset();
        output
    }

    /// A fresh output for `schema`, honoring `config`.
    pub fn with_config(schema: &'static TSMeta, config: &Config) -> Self {
        let output = TSOutput { state: Rc::new(RefCell::new(TSValue::with_config(schema, config))) };
        output.register_delta_reset();
        output
    }

    /// Register this output's tick-boundary reset with the scheduler hook
    /// (`spec.md §6`), so dead set/map slots and buffered map removals are
    /// freed without every node needing to drive `end_tick` itself. The
    /// registered closure holds only a `Weak` handle and no-ops once this
    /// output is dropped.
    fn register_delta_reset(&self) {
        let weak = Rc::downgrade(&self.state);
        register_delta_reset_callback(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().end_tick();
            }
        });
    }

    /// Drive this output's tick-boundary reset directly, without going
    /// through the scheduler hook. Mainly useful for tests; production
    /// callers should rely on [`TSOutput::new`]'s automatic registration.
    pub fn end_tick(&self) {
        self.state.borrow_mut().end_tick();
    }

    /// This output's schema.
    pub fn schema(&self) -> &'static TSMeta {
        self.state.borrow().schema()
    }

    /// A read-only snapshot of this output's current value. Detached from
    /// the live overlay: callers needing delta/observer state should go
    /// through [`TSOutput::subscribe`] and [`TSOutput::modified_at`]
    /// instead (`spec.md §4.I`: `TSOutput::view(t)`).
    pub fn view(&self, _t: Time) -> Value {
        self.state.borrow().value().clone()
    }

    /// Overwrite this output's root value at `t`.
    pub fn set_value(&self, t: Time, value: Value) {
        self.state.borrow_mut().set(value, t);
    }

    /// This output's most recent modification time.
    pub fn last_modified_time(&self) -> Time {
        self.state.borrow().last_modified_time()
    }

    /// `true` iff this output was modified exactly at `t`.
    pub fn modified_at(&self, t: Time) -> bool {
        self.state.borrow().modified_at(t)
    }

    /// Subscribe to modifications at this output or any descendant.
    pub fn subscribe(&self, subscriber: &Rc<dyn Notifiable>) -> bool {
        self.state.borrow_mut().subscribe(subscriber)
    }

    /// Unsubscribe `subscriber`. Idempotent.
    pub fn unsubscribe(&self, subscriber: &Rc<dyn Notifiable>) {
        self.state.borrow_mut().unsubscribe(subscriber)
    }

    /// A non-owning handle, bindable to a `REF`'s container storage
    /// (`spec.md §4.B`).
    pub fn target_handle(&self) -> TargetHandle {
        let dyn_target: Rc<RefCell<dyn ReferenceTarget>> = self.state.clone();
        Rc::downgrade(&dyn_target)
    }

    /// The concrete handle the binding machine needs to build strategies
    /// against this output (`spec.md §4.H`).
    pub(crate) fn handle(&self) -> Rc<RefCell<TSValue>> {
        self.state.clone()
    }

    /// Read the backing `TSValue` directly, for queries `TSOutput`'s
    /// convenience methods do not cover (e.g. a window's oldest/newest
    /// entries).
    pub fn with_value<R>(&self, f: impl FnOnce(&TSValue) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Mutate the backing `TSValue` directly, for setters beyond whole-root
    /// `set_value` (per-field, per-element, set/map/window/REF operations).
    pub fn with_value_mut<R>(&self, f: impl FnOnce(&mut TSValue) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

/// Forwards overlay notifications to the owning node's scheduler callback
/// (`spec.md §4.I`: "`notify(t)` forwards to the owning node").
pub struct InputNotifier {
    last_notified: Cell<Time>,
    callback: RefCell<Option<Box<dyn FnMut(Time)>>>,
}

impl InputNotifier {
    fn new() -> Rc<Self> {
        Rc::new(InputNotifier { last_notified: Cell::new(Time::MIN), callback: RefCell::new(None) })
    }

    /// The last time this input was notified, for tests and diagnostics.
    pub fn last_notified(&self) -> Time {
        self.last_notified.get()
    }
}

impl Notifiable for InputNotifier {
    fn notify(&self, t: Time) {
        self.last_notified.set(t);
        if let Some(callback) = self.callback.borrow_mut().as_mut() {
            callback(t);
        }
    }
}

/// A node's endpoint for consuming a time series, bound to a [`TSOutput`]
/// via an access strategy (`spec.md §4.H`, §4.I).
pub struct TSInput {
    schema: &'static TSMeta,
    strategy: Option<Strategy>,
    active: bool,
    notifier: Rc<InputNotifier>,
}

impl TSInput {
    /// A fresh, unbound input expecting `schema`.
    pub fn new(schema: &'static TSMeta) -> Self {
        TSInput { schema, strategy: None, active: false, notifier: InputNotifier::new() }
    }

    /// This input's schema.
    pub fn schema(&self) -> &'static TSMeta {
        self.schema
    }

    /// Install the scheduler callback invoked on every forwarded `notify(t)`.
    pub fn on_notify(&self, callback: impl FnMut(Time) + 'static) {
        *self.notifier.callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Build (or rebuild) the access strategy tree binding this input to
    /// `output`, replacing any prior binding (`spec.md §4.H`).
    pub fn bind_output(&mut self, output: &TSOutput) -> Result<()> {
        self.unbind_output();
        let subscriber: Rc<dyn Notifiable> = self.notifier.clone();
        let mut built = strategy::bind(self.schema, output.handle(), &subscriber)?;
        if self.active {
            built.make_active();
        }
        self.strategy = Some(built);
        Ok(())
    }

    /// Tear down the current binding. Idempotent (`spec.md §4.H`).
    pub fn unbind_output(&mut self) {
        if let Some(mut strategy) = self.strategy.take() {
            strategy.unbind();
        }
    }

    /// Enter the active state: the binding's subscriptions are opened per
    /// its strategy kind's rules (`spec.md §4.H`'s subscription table).
    pub fn make_active(&mut self) {
        self.active = true;
        if let Some(strategy) = &mut self.strategy {
            strategy.make_active();
        }
    }

    /// Enter the passive state: drop the subscriptions opened by
    /// `make_active`, keeping the binding itself intact.
    pub fn make_passive(&mut self) {
        self.active = false;
        if let Some(strategy) = &mut self.strategy {
            strategy.make_passive();
        }
    }

    /// `true` iff this input is in the active state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `true` iff this input currently has a bound strategy.
    pub fn is_bound(&self) -> bool {
        self.strategy.is_some()
    }

    /// The bound value, read fresh through the strategy tree.
    pub fn value(&self) -> Result<Value> {
        self.strategy.as_ref().ok_or(Error::UnboundInput)?.value()
    }

    /// `true` iff the bound output (or the relevant part of it) was
    /// modified at `t`. `false` for an unbound input.
    pub fn modified_at(&self, t: Time) -> bool {
        self.strategy.as_ref().map(|s| s.modified_at(t)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ts_meta::ts_scalar;
    use crate::type_meta::{register, TypeDescriptor};
    use crate::value::Scalar;
    use std::cell::Cell;
    use std::rc::Rc;

    fn int_schema() -> &'static crate::type_meta::TypeMeta {
        register(TypeDescriptor::scalar(format!("int-{}", line!()))).unwrap()
    }

    #[test]
    fn bound_active_input_tracks_output_and_forwards_notifications() {
        let schema = ts_scalar(int_schema());
        let output = TSOutput::new(schema);
        let mut input = TSInput::new(schema);

        let seen = Rc::new(Cell::new(Time::MIN));
        let seen_for_callback = seen.clone();
        input.on_notify(move |t| seen_for_callback.set(t));

        input.bind_output(&output).unwrap();
        input.make_active();

        output.set_value(Time::new(1), Value::Scalar(Scalar::Int(5)));

        assert!(input.value().unwrap().values_equal(&Value::Scalar(Scalar::Int(5))));
        assert_eq!(seen.get(), Time::new(1));
    }

    #[test]
    fn unbound_input_reports_unbound_error() {
        let schema = ts_scalar(int_schema());
        let input = TSInput::new(schema);
        assert!(matches!(input.value(), Err(Error::UnboundInput)));
    }

    #[test]
    fn passive_input_does_not_receive_notifications() {
        let schema = ts_scalar(int_schema());
        let output = TSOutput::new(schema);
        let mut input = TSInput::new(schema);

        let seen = Rc::new(Cell::new(0u32));
        let seen_for_callback = seen.clone();
        input.on_notify(move |_| seen_for_callback.set(seen_for_callback.get() + 1));

        input.bind_output(&output).unwrap();
        output.set_value(Time::new(1), Value::Scalar(Scalar::Int(1)));
        assert_eq!(seen.get(), 0, "passive input must not subscribe");

        input.make_active();
        output.set_value(Time::new(2), Value::Scalar(Scalar::Int(2)));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn rebinding_drops_the_previous_subscription() {
        let schema = ts_scalar(int_schema());
        let first = TSOutput::new(schema);
        let second = TSOutput::new(schema);
        let mut input = TSInput::new(schema);

        input.bind_output(&first).unwrap();
        input.make_active();
        input.bind_output(&second).unwrap();

        first.set_value(Time::new(1), Value::Scalar(Scalar::Int(9)));
        assert!(!input.modified_at(Time::new(1)), "rebind must drop the old subscription");

        second.set_value(Time::new(2), Value::Scalar(Scalar::Int(3)));
        assert!(input.modified_at(Time::new(2)));
    }
}
