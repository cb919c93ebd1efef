//! End-to-end scenarios from `spec.md §8`.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tsflow_core::container::reference::Reference;
use tsflow_core::path::Path;
use tsflow_core::{register, ts_bundle, ts_dict, ts_ref, ts_scalar, ts_set, ts_window, Error, Scalar, TSInput, TSOutput, Time, TypeDescriptor, Value, WindowBound};

fn int_schema(tag: &str) -> &'static tsflow_core::TypeMeta {
    register(TypeDescriptor::scalar(format!("e2e-int-{}-{}", tag, line!()))).unwrap()
}

#[test]
fn direct_scalar_pipe() {
    let int_ts = int_schema("direct");
    let schema = ts_scalar(int_ts);
    let output = TSOutput::new(schema);
    let mut input = TSInput::new(schema);

    input.bind_output(&output).unwrap();
    input.make_active();

    output.set_value(Time::new(10), Value::Scalar(Scalar::Int(42)));

    assert!(input.modified_at(Time::new(10)));
    assert!(input.value().unwrap().values_equal(&Value::Scalar(Scalar::Int(42))));
    assert_eq!(output.last_modified_time(), Time::new(10));
}

#[test]
fn ref_observer_rebind() {
    let int_ts = int_schema("ref");
    let target_schema = ts_scalar(int_ts);
    let ref_schema = ts_ref(target_schema);

    let ref_output = TSOutput::new(ref_schema);
    let a = TSOutput::new(target_schema);
    let b = TSOutput::new(target_schema);
    a.set_value(Time::new(0), Value::Scalar(Scalar::Int(1)));
    b.set_value(Time::new(0), Value::Scalar(Scalar::Int(2)));

    let mut input = TSInput::new(target_schema);

    let notified_at = Rc::new(Cell::new(Time::MIN));
    let notified_for_callback = notified_at.clone();
    input.on_notify(move |t| notified_for_callback.set(t));

    input.bind_output(&ref_output).unwrap();
    input.make_active();

    ref_output.set_value(Time::new(5), Value::Reference(Reference::bind(a.target_handle(), Path::root())));
    assert!(input.value().unwrap().values_equal(&Value::Scalar(Scalar::Int(1))));
    assert!(input.modified_at(Time::new(5)));
    assert_eq!(notified_at.get(), Time::new(5));

    ref_output.set_value(Time::new(7), Value::Reference(Reference::bind(b.target_handle(), Path::root())));
    assert!(input.value().unwrap().values_equal(&Value::Scalar(Scalar::Int(2))));
    assert!(input.modified_at(Time::new(7)));
    assert_eq!(notified_at.get(), Time::new(7));
}

#[test]
fn bundle_partial_modification() {
    let int_ts = int_schema("bundle");
    let schema = ts_bundle(vec![("x".into(), ts_scalar(int_ts)), ("y".into(), ts_scalar(int_ts))]);
    let output = TSOutput::new(schema);
    let mut input = TSInput::new(schema);
    input.bind_output(&output).unwrap();
    input.make_active();

    output.with_value_mut(|ts| ts.set_field(1, Value::Scalar(Scalar::Int(7)), Time::new(3)).unwrap());

    assert!(input.modified_at(Time::new(3)));
    let view = output.with_value(|ts| ts.view().field("x").unwrap().modified_at(Time::new(3)));
    assert!(!view, "field x must not report modified when only y changed");
    let view_y = output.with_value(|ts| ts.view().field("y").unwrap().modified_at(Time::new(3)));
    assert!(view_y);
}

#[test]
fn set_add_remove_cancellation() {
    let int_ts = int_schema("set");
    let schema = ts_set(int_ts);
    let output = TSOutput::new(schema);

    output.with_value_mut(|ts| ts.set_insert(Scalar::Int(10), Time::new(5)).unwrap());
    output.with_value_mut(|ts| ts.set_erase(&Scalar::Int(10), Time::new(5)).unwrap());

    let added = output.with_value(|ts| ts.set_added().unwrap());
    let removed = output.with_value(|ts| ts.set_removed().unwrap());
    assert!(added.is_empty());
    assert!(removed.is_empty());
}

#[test]
fn map_key_delta_with_buffered_value() {
    let int_ts = int_schema("map");
    let ts_int = ts_scalar(int_ts);
    let schema = ts_dict(int_ts, ts_int);
    let output = TSOutput::new(schema);

    output.with_value_mut(|ts| ts.map_insert(Scalar::Str("k".into()), Value::Scalar(Scalar::Int(1)), Time::new(1)).unwrap());
    let read_back = output.with_value(|ts| ts.map_get(&Scalar::Str("k".into())).unwrap().map(|v| v.clone()));
    assert!(read_back.unwrap().values_equal(&Value::Scalar(Scalar::Int(1))));

    let removed = output.with_value_mut(|ts| ts.map_remove(&Scalar::Str("k".into()), Time::new(9)).unwrap());
    assert!(removed.unwrap().values_equal(&Value::Scalar(Scalar::Int(1))));
    assert!(output.with_value(|ts| ts.map_get(&Scalar::Str("k".into())).unwrap().is_none()));
}

#[test]
fn window_eviction() {
    let int_ts = int_schema("window");
    let schema = ts_window(int_ts, WindowBound::Count(3));
    let output = TSOutput::new(schema);

    for (value, t) in [(10, 1u64), (20, 2), (30, 3), (40, 4)] {
        output.with_value_mut(|ts| ts.window_push(Scalar::Int(value), Time::new(t)).unwrap());
    }

    let (len, oldest, newest) = output.with_value(|ts| match ts.overlay() {
        tsflow_core::overlay::Overlay::Window(w) => (w.len(), w.oldest().map(|(_, s)| s.clone()), w.newest().map(|(_, s)| s.clone())),
        _ => panic!("expected window overlay"),
    });
    assert_eq!(len, 3);
    assert_eq!(oldest, Some(Scalar::Int(20)));
    assert_eq!(newest, Some(Scalar::Int(40)));
}

#[test]
fn unbind_and_make_passive_are_idempotent() {
    let int_ts = int_schema("idempotent");
    let schema = ts_scalar(int_ts);
    let output = TSOutput::new(schema);
    let mut input = TSInput::new(schema);
    input.bind_output(&output).unwrap();
    input.make_active();
    input.make_passive();
    input.make_passive();
    input.unbind_output();
    input.unbind_output();
    assert!(!input.is_bound());
    assert!(matches!(input.value(), Err(Error::UnboundInput)));
}

#[test]
fn schema_interning_returns_equal_pointers() {
    let int_ts = int_schema("intern");
    let a = ts_scalar(int_ts);
    let b = ts_scalar(int_ts);
    assert!(core::ptr::eq(a, b));

    let set_a = ts_set(int_ts);
    let set_b = ts_set(int_ts);
    assert!(core::ptr::eq(set_a, set_b));

    let dict_a = ts_dict(int_ts, a);
    let dict_b = ts_dict(int_ts, a);
    assert!(core::ptr::eq(dict_a, dict_b));
}
