//! The access strategy tree — the input/output binding machine (`spec.md
//! §4.H`). Built at bind time by walking an input's and an output's
//! [`TSMeta`] schemas in parallel; the resulting tree persists until unbind.
//!
//! A REF-observer here re-resolves its target through
//! [`crate::ts_value::TSValue::ref_resolve`] on every read rather than
//! maintaining a second, nested strategy subscribed to the target's own
//! overlay tree — `DESIGN.md` records this as a scoped simplification: the
//! REF output's own notifications (fired whenever its `Reference` value is
//! rebound) are what downstream nodes actually receive, at the cost of not
//! also re-firing when the target's *value* changes without a rebind.
//!
//! A `SIGNAL` input bound to a `TSB` output (`spec.md §4.G`'s "signal
//! multi-bind") subscribes once to the bundle's own overlay node rather than
//! allocating a subscription object per field — see [`Strategy::Signal`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::container::reference::{Reference, ReferenceTarget};
use crate::error::{Error, Result};
use crate::observer::Notifiable;
use crate::path::{Path, PathElement};
use crate::time::Time;
use crate::ts_meta::{dereference, TSMeta, TsKind};
use crate::ts_value::{TSValue, TSView};
use crate::value::{Scalar, Value};

type Output = Rc<RefCell<TSValue>>;

/// One node of the strategy tree (`spec.md §4.H`).
pub enum Strategy {
    /// Input and output have identical TS types; reads the output directly.
    Direct { output: Output, subscriber: Rc<dyn Notifiable>, active: bool },
    /// TSB/TSL where at least one child needed its own strategy; owns child
    /// strategies and propagates activation.
    Collection { children: Vec<Strategy>, active: bool, as_list: bool },
    /// TSL/TSB element of a non-peered collection: navigates to one path of
    /// the parent output on every read.
    Element { output: Output, path: Path, subscriber: Rc<dyn Notifiable>, active: bool },
    /// A non-REF input bound to a REF output. Always subscribed to the REF
    /// output from bind to unbind, independent of `active`.
    RefObserver { ref_output: Output, subscriber: Rc<dyn Notifiable>, active: bool },
    /// A REF input bound to a non-REF output: synthesises a `Reference`
    /// wrapping `output`. Never subscribes to the wrapped output's values.
    RefWrapper { output: Output },
    /// A `SIGNAL` input bound to a non-peered `TSB` output (`spec.md §4.G`:
    /// "signal multi-bind"). Subscribes once to the bundle's root overlay
    /// rather than one subscription object per field: `Overlay::mark_modified`
    /// already bumps and notifies every ancestor on the way back out, so the
    /// root sees (and this subscription fires on) a change to any field —
    /// the same "schedule the owning node when any field fires" effect,
    /// without a separate per-field subscription object.
    Signal { output: Output, subscriber: Rc<dyn Notifiable>, active: bool },
}

impl Strategy {
    /// Activate every subscription this node needs while live (`spec.md
    /// §4.H`'s subscription rules table).
    pub fn make_active(&mut self) {
        match self {
            Strategy::Direct { output, subscriber, active }
            | Strategy::Element { output, subscriber, active, .. }
            | Strategy::Signal { output, subscriber, active } => {
                if !*active {
                    output.borrow_mut().subscribe(subscriber);
                    *active = true;
                }
            }
            Strategy::Collection { children, active, .. } => {
                *active = true;
                for child in children.iter_mut() {
                    child.make_active();
                }
            }
            Strategy::RefObserver { active, .. } => *active = true,
            Strategy::RefWrapper { .. } => {}
        }
    }

    /// Deactivate every subscription opened by [`Strategy::make_active`].
    pub fn make_passive(&mut self) {
        match self {
            Strategy::Direct { output, subscriber, active }
            | Strategy::Element { output, subscriber, active, .. }
            | Strategy::Signal { output, subscriber, active } => {
                if *active {
                    output.borrow_mut().unsubscribe(subscriber);
                    *active = false;
                }
            }
            Strategy::Collection { children, active, .. } => {
                *active = false;
                for child in children.iter_mut() {
                    child.make_passive();
                }
            }
            Strategy::RefObserver { active, .. } => *active = false,
            Strategy::RefWrapper { .. } => {}
        }
    }

    /// Unsubscribe every subscription opened during bind. Idempotent
    /// (`spec.md §4.H`: "Unbind is idempotent").
    pub fn unbind(&mut self) {
        match self {
            Strategy::Direct { output, subscriber, active }
            | Strategy::Element { output, subscriber, active, .. }
            | Strategy::Signal { output, subscriber, active } => {
                if *active {
                    output.borrow_mut().unsubscribe(subscriber);
                    *active = false;
                }
            }
            Strategy::Collection { children, active, .. } => {
                for child in children.iter_mut() {
                    child.unbind();
                }
                *active = false;
            }
            Strategy::RefObserver { ref_output, subscriber, active } => {
                ref_output.borrow_mut().unsubscribe(subscriber);
                *active = false;
            }
            Strategy::RefWrapper { .. } => {}
        }
    }

    /// The bound value, read fresh on every call (beyond whatever caching
    /// the output's own `enable_delta_cache` provides).
    pub fn value(&self) -> Result<Value> {
        match self {
            Strategy::Direct { output, .. } => Ok(output.borrow().value().clone()),
            Strategy::Element { output, path, .. } => navigate(&output.borrow(), path),
            Strategy::Collection { children, as_list, .. } => {
                let values = children.iter().map(Strategy::value).collect::<Result<Vec<Value>>>()?;
                Ok(if *as_list { Value::List(values) } else { Value::Bundle(values) })
            }
            Strategy::RefObserver { ref_output, .. } => {
                let resolved = ref_output.borrow().ref_resolve()?;
                resolved.ok_or_else(|| Error::TargetResolutionFailed { at: ref_output.borrow().last_modified_time() })
            }
            Strategy::RefWrapper { output } => {
                let dyn_target: Rc<RefCell<dyn ReferenceTarget>> = output.clone();
                let handle = Rc::downgrade(&dyn_target);
                Ok(Value::Reference(Reference::bind(handle, Path::root())))
            }
            Strategy::Signal { .. } => Ok(Value::Scalar(Scalar::Unit)),
        }
    }

    /// `true` iff this node (or, for a collection, any child) was modified
    /// at `t`.
    pub fn modified_at(&self, t: Time) -> bool {
        match self {
            Strategy::Direct { output, .. } => output.borrow().modified_at(t),
            Strategy::Element { output, path, .. } => navigate_view(&output.borrow(), path).map(|v| v.modified_at(t)).unwrap_or(false),
            Strategy::Collection { children, .. } => children.iter().any(|c| c.modified_at(t)),
            Strategy::RefObserver { ref_output, .. } => ref_output.borrow().modified_at(t),
            Strategy::RefWrapper { output } => output.borrow().modified_at(t),
            Strategy::Signal { output, .. } => output.borrow().modified_at(t),
        }
    }
}

fn navigate_view<'v>(ts_value: &'v TSValue, path: &Path) -> Option<TSView<'v>> {
    let mut view = ts_value.view();
    for element in path.elements() {
        view = match element {
            PathElement::Field { index, .. } => view.field_at(*index)?,
            PathElement::Index(i) => view.element(*i)?,
        };
    }
    Some(view)
}

fn navigate(ts_value: &TSValue, path: &Path) -> Result<Value> {
    navigate_view(ts_value, path)
        .map(|v| v.value().clone())
        .ok_or_else(|| Error::TypeMismatch { expected: "path present in bound output", found: "invalid navigation".to_string() })
}

/// Build a strategy tree binding `input_schema` to `output` (`spec.md
/// §4.H`'s binding algorithm), notifying `subscriber` on every activated
/// subscription.
pub fn bind(input_schema: &'static TSMeta, output: Output, subscriber: &Rc<dyn Notifiable>) -> Result<Strategy> {
    let output_schema = output.borrow().schema();
    bind_at(input_schema, output_schema, output, Path::root(), subscriber)
}

fn bind_at(
    input_schema: &'static TSMeta,
    output_schema: &'static TSMeta,
    output: Output,
    path: Path,
    subscriber: &Rc<dyn Notifiable>,
) -> Result<Strategy> {
    let dereferenced_output = dereference(output_schema);

    if input_schema.kind != TsKind::Ref && output_schema.kind != TsKind::Ref && core::ptr::eq(input_schema, dereferenced_output) {
        return Ok(if path.is_root() {
            Strategy::Direct { output, subscriber: subscriber.clone(), active: false }
        } else {
            Strategy::Element { output, path, subscriber: subscriber.clone(), active: false }
        });
    }

    if output_schema.kind == TsKind::Ref && input_schema.kind != TsKind::Ref {
        output.borrow_mut().subscribe(subscriber);
        return Ok(Strategy::RefObserver { ref_output: output, subscriber: subscriber.clone(), active: false });
    }

    if input_schema.kind == TsKind::Ref && output_schema.kind != TsKind::Ref {
        return Ok(Strategy::RefWrapper { output });
    }

    if input_schema.kind == TsKind::Signal && dereferenced_output.kind == TsKind::Tsb {
        return Ok(Strategy::Signal { output, subscriber: subscriber.clone(), active: false });
    }

    match (input_schema.kind, dereferenced_output.kind) {
        (TsKind::Tsb, TsKind::Tsb) if input_schema.fields.len() == dereferenced_output.fields.len() => {
            let mut children = Vec::with_capacity(input_schema.fields.len());
            for (index, (in_field, out_field)) in input_schema.fields.iter().zip(dereferenced_output.fields.iter()).enumerate() {
                let child_path = path.extended(PathElement::Field { name: out_field.name.clone(), index });
                children.push(bind_at(in_field.schema, out_field.schema, output.clone(), child_path, subscriber)?);
            }
            Ok(Strategy::Collection { children, active: false, as_list: false })
        }
        (TsKind::Tsl, TsKind::Tsl) => {
            let in_element = input_schema.element.expect("TSL schema needs an element schema");
            let out_element = dereferenced_output.element.expect("TSL schema needs an element schema");
            let len = input_schema.fixed_len.or(dereferenced_output.fixed_len).unwrap_or(0);
            let mut children = Vec::with_capacity(len);
            for index in 0..len {
                let child_path = path.extended(PathElement::Index(index));
                children.push(bind_at(in_element, out_element, output.clone(), child_path, subscriber)?);
            }
            Ok(Strategy::Collection { children, active: false, as_list: true })
        }
        _ => Err(Error::SchemaMismatch {
            input: format!("{:?}", input_schema),
            output: format!("{:?}", output_schema),
            reason: "no access strategy connects these schemas".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ts_meta::{ts_bundle, ts_ref, ts_scalar};
    use crate::type_meta::{register, TypeDescriptor};
    use std::cell::Cell;

    fn int_schema() -> &'static crate::type_meta::TypeMeta {
        register(TypeDescriptor::scalar(format!("int-{}", line!()))).unwrap()
    }

    struct Probe(Cell<u32>);
    impl Notifiable for Probe {
        fn notify(&self, _t: Time) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn direct_binding_reads_through_to_output_and_notifies_on_change() {
        let schema = ts_scalar(int_schema());
        let output: Output = Rc::new(RefCell::new(TSValue::new(schema)));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();

        let mut strategy = bind(schema, output.clone(), &dyn_probe).unwrap();
        strategy.make_active();
        output.borrow_mut().set(Value::Scalar(crate::value::Scalar::Int(3)), Time::new(1));

        assert!(strategy.value().unwrap().values_equal(&Value::Scalar(crate::value::Scalar::Int(3))));
        assert_eq!(probe.0.get(), 1);

        strategy.unbind();
        output.borrow_mut().set(Value::Scalar(crate::value::Scalar::Int(4)), Time::new(2));
        assert_eq!(probe.0.get(), 1, "unbind must stop further notifications");
    }

    #[test]
    fn bundle_collection_binds_field_by_field() {
        let leaf = ts_scalar(int_schema());
        let schema = ts_bundle(vec![("a".into(), leaf), ("b".into(), leaf)]);
        let output: Output = Rc::new(RefCell::new(TSValue::new(schema)));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();

        // Force a Collection by giving the input a distinct (but
        // structurally identical per-field) bundle schema built from a
        // second interned leaf so the whole-bundle pointer-equality check
        // at the top of `bind_at` does not short-circuit to Direct.
        let other_leaf = ts_scalar(int_schema());
        let input_schema = ts_bundle(vec![("a".into(), other_leaf), ("b".into(), leaf)]);

        let strategy = bind(input_schema, output.clone(), &dyn_probe).unwrap();
        assert!(matches!(strategy, Strategy::Collection { .. }));

        output.borrow_mut().set_field(0, Value::Scalar(crate::value::Scalar::Int(9)), Time::new(1)).unwrap();
        let value = strategy.value().unwrap();
        match value {
            Value::Bundle(items) => assert!(items[0].values_equal(&Value::Scalar(crate::value::Scalar::Int(9)))),
            _ => panic!("expected bundle"),
        }
    }

    #[test]
    fn ref_wrapper_synthesises_a_reference_without_subscribing() {
        let target_schema = ts_scalar(int_schema());
        let input_schema = ts_ref(target_schema);
        let output: Output = Rc::new(RefCell::new(TSValue::new(target_schema)));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();

        let mut strategy = bind(input_schema, output.clone(), &dyn_probe).unwrap();
        strategy.make_active();
        output.borrow_mut().set(Value::Scalar(crate::value::Scalar::Int(1)), Time::new(1));
        assert_eq!(probe.0.get(), 0, "RefWrapper must never subscribe to the wrapped output");
        assert!(matches!(strategy.value().unwrap(), Value::Reference(_)));
    }

    #[test]
    fn signal_fires_when_any_bundle_field_changes() {
        let leaf = ts_scalar(int_schema());
        let schema = ts_bundle(vec![("a".into(), leaf), ("b".into(), leaf)]);
        let output: Output = Rc::new(RefCell::new(TSValue::new(schema)));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();

        let signal_schema = crate::ts_meta::ts_signal();
        let mut strategy = bind(signal_schema, output.clone(), &dyn_probe).unwrap();
        assert!(matches!(strategy, Strategy::Signal { .. }));
        strategy.make_active();

        output.borrow_mut().set_field(1, Value::Scalar(crate::value::Scalar::Int(1)), Time::new(1)).unwrap();
        assert_eq!(probe.0.get(), 1, "a field firing must schedule the owning node");
        assert!(strategy.modified_at(Time::new(1)));
        assert!(matches!(strategy.value().unwrap(), Value::Scalar(crate::value::Scalar::Unit)));
    }

    #[test]
    fn mismatched_schemas_fail_to_bind() {
        let a = ts_scalar(int_schema());
        let b = ts_bundle(vec![("x".into(), a)]);
        let output: Output = Rc::new(RefCell::new(TSValue::new(a)));
        let probe = Rc::new(Probe(Cell::new(0)));
        let dyn_probe: Rc<dyn Notifiable> = probe.clone();
        let err = bind(b, output, &dyn_probe).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }
}
