//! Composed container-value + overlay pairs for each TS schema kind, and the
//! facade that mutates both in lockstep (`spec.md §3`, §4.D, §4.E).
//!
//! [`build`] is the TS-level analogue of [`crate::type_meta::default_value`]:
//! every [`TsKind`] maps to a fresh zero-valued [`Value`] paired with a fresh
//! [`Overlay`] of matching shape. [`TSValue`] then owns exactly one such pair
//! and every mutating method updates the `Value` tree and calls into the
//! matching `Overlay` method (or [`Overlay::mark_modified`] for kinds with no
//! dedicated delta buffer) in the same call, so the two trees never drift
//! apart.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::Config;
use crate::container::cyclic::CyclicBuffer;
use crate::container::map::MapStorage;
use crate::container::reference::{Reference, ReferenceTarget, TargetHandle};
use crate::container::set::SetStorage;
use crate::error::{Error, Result};
use crate::observer::Notifiable;
use crate::overlay::{
    BundleOverlay, ListOverlay, MapOverlay, Overlay, ReferenceOverlay, ScalarOverlay, SetOverlay, SignalOverlay, WindowOverlay,
};
use crate::path::{Path, PathElement};
use crate::time::Time;
use crate::ts_meta::{TSMeta, TsKind, WindowBound};
use crate::type_meta::default_value;
use crate::value::{Scalar, Value};
use crate::view::View;

/// Build the zero-valued container/overlay pair for `schema`, recursing into
/// children for the composite kinds (`TSB`, fixed-length `TSL`).
pub fn build(schema: &'static TSMeta) -> (Value, Overlay) {
    match schema.kind {
        TsKind::Ts => {
            let value_schema = schema.value.expect("TS schema needs a value schema");
            (default_value(value_schema), Overlay::Scalar(ScalarOverlay::new()))
        }
        TsKind::Tsb => {
            let mut values = Vec::with_capacity(schema.fields.len());
            let mut overlays = Vec::with_capacity(schema.fields.len());
            for field in &schema.fields {
                let (value, overlay) = build(field.schema);
                values.push(value);
                overlays.push(overlay);
            }
            (Value::Bundle(values), Overlay::Bundle(BundleOverlay::new(overlays)))
        }
        TsKind::Tsl => {
            let element = schema.element.expect("TSL schema needs an element schema");
            let n = schema.fixed_len.unwrap_or(0);
            let mut values = Vec::with_capacity(n);
            let mut overlays = Vec::with_capacity(n);
            for _ in 0..n {
                let (value, overlay) = build(element);
                values.push(value);
                overlays.push(overlay);
            }
            (Value::List(values), Overlay::List(ListOverlay::new(overlays)))
        }
        TsKind::Tsd => (Value::Map(MapStorage::new()), Overlay::Map(MapOverlay::new())),
        TsKind::Tss => (Value::Set(SetStorage::new()), Overlay::Set(SetOverlay::new())),
        TsKind::Tsw => {
            let bound = schema.window.expect("TSW schema needs a window bound");
            // The overlay's own ring is authoritative for window queries
            // (eviction by count or duration); the container buffer mirrors
            // it only so generic `Operations` (to_string/to_encoded) have a
            // uniform `Value` to dispatch against, sized by `Count(n)` or by
            // `min` for a duration bound (`DESIGN.md` records this as a
            // deliberate non-duplication of the duration-eviction logic).
            let capacity = match bound {
                WindowBound::Count(n) => n.max(1),
                WindowBound::Duration { min, .. } => min.max(1),
            };
            (Value::CyclicBuffer(CyclicBuffer::new(capacity)), Overlay::Window(WindowOverlay::new(bound)))
        }
        TsKind::Ref => (Value::Reference(Reference::empty()), Overlay::Reference(ReferenceOverlay::new())),
        TsKind::Signal => (Value::Scalar(Scalar::Unit), Overlay::Signal(SignalOverlay::new())),
    }
}

fn kind_mismatch(expected: &'static str, schema: &'static TSMeta) -> Error {
    Error::TypeMismatch { expected, found: format!("{:?}", schema.kind) }
}

/// An owned TS node: a container [`Value`] and its [`Overlay`], kept in
/// lockstep, plus a tick-scoped encoded-value cache (`spec.md §6`:
/// `enable_delta_cache`).
pub struct TSValue {
    schema: &'static TSMeta,
    value: Value,
    overlay: Overlay,
    cached_encoded: RefCell<Option<Vec<u8>>>,
    cache_enabled: bool,
}

impl TSValue {
    /// A fresh, zero-valued node for `schema`, using default engine config.
    pub fn new(schema: &'static TSMeta) -> Self {
        Self::with_config(schema, &Config::default())
    }

    /// A fresh, zero-valued node for `schema`, honoring `config`.
    pub fn with_config(schema: &'static TSMeta, config: &Config) -> Self {
        let (value, overlay) = build(schema);
        TSValue { schema, value, overlay, cached_encoded: RefCell::new(None), cache_enabled: config.enable_delta_cache }
    }

    /// This node's schema.
    pub fn schema(&self) -> &'static TSMeta {
        self.schema
    }

    /// Borrow the container value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Borrow the overlay.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// A read-only [`TSView`] rooted at this node.
    pub fn view(&self) -> TSView<'_> {
        TSView::new(self.schema, &self.value, &self.overlay)
    }

    /// The node's most recent modification time.
    pub fn last_modified_time(&self) -> Time {
        self.overlay.core().last_modified_time()
    }

    /// `true` once this node has ever been modified.
    pub fn has_value(&self) -> bool {
        self.overlay.core().has_value()
    }

    /// `true` iff this node was modified exactly at `t`.
    pub fn modified_at(&self, t: Time) -> bool {
        self.overlay.core().modified_at(t)
    }

    /// Subscribe to modifications at this node or any descendant.
    pub fn subscribe(&mut self, subscriber: &Rc<dyn Notifiable>) -> bool {
        self.overlay.core_mut().subscribe(subscriber)
    }

    /// Unsubscribe `subscriber`. Idempotent.
    pub fn unsubscribe(&mut self, subscriber: &Rc<dyn Notifiable>) {
        self.overlay.core_mut().unsubscribe(subscriber)
    }

    fn invalidate_cache(&mut self) {
        *self.cached_encoded.get_mut() = None;
    }

    /// Free dead set/map slots and clear this tick's delta buffers
    /// throughout this node's tree. Driven by the scheduler's delta-reset
    /// hook (`spec.md §6`), registered automatically for every
    /// [`crate::io::TSOutput`] via
    /// [`crate::scheduler::register_delta_reset_callback`].
    pub fn end_tick(&mut self) {
        self.overlay.end_tick(&mut self.value);
    }

    /// The schema's `to-encoded` operation, memoised for the rest of the
    /// tick when `enable_delta_cache` is set.
    pub fn encoded(&self) -> Vec<u8> {
        if !self.cache_enabled {
            return self.value.to_bytes();
        }
        if let Some(cached) = self.cached_encoded.borrow().as_ref() {
            return cached.clone();
        }
        let bytes = self.value.to_bytes();
        *self.cached_encoded.borrow_mut() = Some(bytes.clone());
        bytes
    }

    /// Overwrite a `TS[T]` leaf at the root.
    pub fn set(&mut self, value: Value, t: Time) {
        self.value = value;
        self.overlay.mark_modified(&[], t);
        self.invalidate_cache();
    }

    /// Overwrite one `TSB` field by position.
    pub fn set_field(&mut self, index: usize, value: Value, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tsb {
            return Err(kind_mismatch("TSB", self.schema));
        }
        let name = self
            .schema
            .fields
            .get(index)
            .map(|f| f.name.clone())
            .ok_or(Error::IndexOutOfRange { index, len: self.schema.fields.len() })?;
        match &mut self.value {
            Value::Bundle(items) if index < items.len() => items[index] = value,
            Value::Bundle(items) => return Err(Error::IndexOutOfRange { index, len: items.len() }),
            _ => unreachable!("TSB schema always pairs with Value::Bundle"),
        }
        self.overlay.mark_modified(&[PathElement::Field { name, index }], t);
        self.invalidate_cache();
        Ok(())
    }

    /// Overwrite one `TSL` element in place by position.
    pub fn set_element(&mut self, index: usize, value: Value, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tsl {
            return Err(kind_mismatch("TSL", self.schema));
        }
        match &mut self.value {
            Value::List(items) if index < items.len() => items[index] = value,
            Value::List(items) => return Err(Error::IndexOutOfRange { index, len: items.len() }),
            _ => unreachable!("TSL schema always pairs with Value::List"),
        }
        self.overlay.mark_modified(&[PathElement::Index(index)], t);
        self.invalidate_cache();
        Ok(())
    }

    /// Append an element to a dynamic `TSL`, extending container and overlay
    /// together.
    pub fn push_element(&mut self, value: Value, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tsl {
            return Err(kind_mismatch("TSL", self.schema));
        }
        let element_schema = self.schema.element.expect("TSL schema needs an element schema");
        let (_, child_overlay) = build(element_schema);
        let index = match &mut self.value {
            Value::List(items) => {
                items.push(value);
                items.len() - 1
            }
            _ => unreachable!("TSL schema always pairs with Value::List"),
        };
        if let Overlay::List(list_overlay) = &mut self.overlay {
            list_overlay.push(child_overlay);
        }
        self.overlay.mark_modified(&[PathElement::Index(index)], t);
        self.invalidate_cache();
        Ok(())
    }

    /// Remove an element from a dynamic `TSL`, shrinking container and
    /// overlay together. Only the list's own timestamp advances — a
    /// removed index has no identity left to mark modified.
    pub fn remove_element(&mut self, index: usize, t: Time) -> Result<Value> {
        if self.schema.kind != TsKind::Tsl {
            return Err(kind_mismatch("TSL", self.schema));
        }
        let removed = match &mut self.value {
            Value::List(items) if index < items.len() => items.remove(index),
            Value::List(items) => return Err(Error::IndexOutOfRange { index, len: items.len() }),
            _ => unreachable!("TSL schema always pairs with Value::List"),
        };
        if let Overlay::List(list_overlay) = &mut self.overlay {
            list_overlay.remove(index);
        }
        self.overlay.mark_modified(&[], t);
        self.invalidate_cache();
        Ok(removed)
    }

    /// Insert `key` into a `TSS`, recording the add in the set's delta.
    pub fn set_insert(&mut self, key: Scalar, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tss {
            return Err(kind_mismatch("TSS", self.schema));
        }
        match (&mut self.value, &mut self.overlay) {
            (Value::Set(set), Overlay::Set(overlay)) => {
                let slot = set.insert(key, &mut []);
                overlay.record_added(slot, t);
            }
            _ => unreachable!("TSS schema always pairs with Value::Set and Overlay::Set"),
        }
        self.invalidate_cache();
        Ok(())
    }

    /// Erase `key` from a `TSS`. Returns `true` if it was present.
    pub fn set_erase(&mut self, key: &Scalar, t: Time) -> Result<bool> {
        if self.schema.kind != TsKind::Tss {
            return Err(kind_mismatch("TSS", self.schema));
        }
        let erased = match (&mut self.value, &mut self.overlay) {
            (Value::Set(set), Overlay::Set(overlay)) => match set.erase(key, &mut []) {
                Some(slot) => {
                    overlay.record_removed(slot, t);
                    true
                }
                None => false,
            },
            _ => unreachable!("TSS schema always pairs with Value::Set and Overlay::Set"),
        };
        self.invalidate_cache();
        Ok(erased)
    }

    /// Scalars added to a `TSS` this tick.
    pub fn set_added(&self) -> Result<Vec<Scalar>> {
        match (&self.value, &self.overlay) {
            (Value::Set(set), Overlay::Set(overlay)) => {
                Ok(overlay.delta.added().filter_map(|slot| set.key_at_slot(*slot).cloned()).collect())
            }
            _ => Err(kind_mismatch("TSS", self.schema)),
        }
    }

    /// Scalars removed from a `TSS` this tick (still readable: erased slots
    /// stay valid for one tick, per `spec.md §4.B`).
    pub fn set_removed(&self) -> Result<Vec<Scalar>> {
        match (&self.value, &self.overlay) {
            (Value::Set(set), Overlay::Set(overlay)) => {
                Ok(overlay.delta.removed().filter_map(|slot| set.key_at_slot(*slot).cloned()).collect())
            }
            _ => Err(kind_mismatch("TSS", self.schema)),
        }
    }

    /// Insert or overwrite `key` -> `value` in a `TSD`, distinguishing a
    /// fresh child overlay (new key) from an in-place value update.
    pub fn map_insert(&mut self, key: Scalar, value: Value, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tsd {
            return Err(kind_mismatch("TSD", self.schema));
        }
        let element_schema = self.schema.element.expect("TSD schema needs an element schema");
        let existed = match &self.value {
            Value::Map(map) => map.find_slot(&key).is_some(),
            _ => unreachable!("TSD schema always pairs with Value::Map"),
        };
        let slot = match &mut self.value {
            Value::Map(map) => map.insert(key, value, &mut []),
            _ => unreachable!("TSD schema always pairs with Value::Map"),
        };
        match &mut self.overlay {
            Overlay::Map(overlay) if existed => overlay.update_entry(slot, t),
            Overlay::Map(overlay) => {
                let (_, child_overlay) = build(element_schema);
                overlay.insert_entry(slot, child_overlay, t);
            }
            _ => unreachable!("TSD schema always pairs with Overlay::Map"),
        }
        self.invalidate_cache();
        Ok(())
    }

    /// Remove `key` from a `TSD`, buffering its value and child overlay in
    /// the map's delta for the rest of the tick.
    pub fn map_remove(&mut self, key: &Scalar, t: Time) -> Result<Option<Value>> {
        if self.schema.kind != TsKind::Tsd {
            return Err(kind_mismatch("TSD", self.schema));
        }
        let removed = match &mut self.value {
            Value::Map(map) => map.remove_with_slot(key, &mut []),
            _ => unreachable!("TSD schema always pairs with Value::Map"),
        };
        let Some((slot, value)) = removed else {
            return Ok(None);
        };
        match &mut self.overlay {
            Overlay::Map(overlay) => overlay.remove_entry(slot, key.clone(), value.clone(), t),
            _ => unreachable!("TSD schema always pairs with Overlay::Map"),
        }
        self.invalidate_cache();
        Ok(Some(value))
    }

    /// Borrow the value for `key`, if live.
    pub fn map_get(&self, key: &Scalar) -> Result<Option<&Value>> {
        match &self.value {
            Value::Map(map) => Ok(map.get(key)),
            _ => Err(kind_mismatch("TSD", self.schema)),
        }
    }

    /// Push a timestamped scalar onto a `TSW`, evicting per its bound.
    pub fn window_push(&mut self, value: Scalar, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Tsw {
            return Err(kind_mismatch("TSW", self.schema));
        }
        match (&mut self.value, &mut self.overlay) {
            (Value::CyclicBuffer(buf), Overlay::Window(window)) => {
                window.push(t, value.clone());
                buf.push(Value::Scalar(value));
            }
            _ => unreachable!("TSW schema always pairs with Value::CyclicBuffer and Overlay::Window"),
        }
        self.invalidate_cache();
        Ok(())
    }

    /// Bind a `REF` to a resolved target.
    pub fn ref_bind(&mut self, target: TargetHandle, path: Path, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Ref {
            return Err(kind_mismatch("REF", self.schema));
        }
        match &mut self.value {
            Value::Reference(r) => *r = Reference::bind(target, path),
            _ => unreachable!("REF schema always pairs with Value::Reference"),
        }
        self.overlay.mark_modified(&[], t);
        self.invalidate_cache();
        Ok(())
    }

    /// Drop a `REF`'s binding, returning it to [`Reference::Empty`].
    pub fn ref_unbind(&mut self, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Ref {
            return Err(kind_mismatch("REF", self.schema));
        }
        match &mut self.value {
            Value::Reference(r) => r.unbind(),
            _ => unreachable!("REF schema always pairs with Value::Reference"),
        }
        self.overlay.mark_modified(&[], t);
        self.invalidate_cache();
        Ok(())
    }

    /// Resolve a `REF`'s current target value, if bound and live.
    pub fn ref_resolve(&self) -> Result<Option<Value>> {
        match &self.value {
            Value::Reference(r) => Ok(r.resolve()),
            _ => Err(kind_mismatch("REF", self.schema)),
        }
    }

    /// Fire a `SIGNAL` at `t` (an edge with no payload).
    pub fn signal_fire(&mut self, t: Time) -> Result<()> {
        if self.schema.kind != TsKind::Signal {
            return Err(kind_mismatch("SIGNAL", self.schema));
        }
        self.overlay.mark_modified(&[], t);
        self.invalidate_cache();
        Ok(())
    }
}

impl core::fmt::Debug for TSValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TSValue")
            .field("kind", &self.schema.kind)
            .field("last_modified", &self.last_modified_time())
            .finish()
    }
}

/// Lets a `TSValue` sit behind a `REF` (`spec.md §4.B`): resolving a bound
/// reference snapshots the target's current container value, independent of
/// its overlay/delta state.
impl ReferenceTarget for TSValue {
    fn resolve(&self) -> Value {
        self.value.clone()
    }
}

/// A read-only, lockstep view of a TS node's container value and overlay
/// (`spec.md §4.C`, §4.H): the TS-tree analogue of [`View`], navigating
/// independently timestamped bundle fields, list elements, and map entries
/// instead of a single schema's scalar composite.
#[derive(Clone, Copy)]
pub struct TSView<'v> {
    schema: &'static TSMeta,
    value: &'v Value,
    overlay: &'v Overlay,
    path: Path,
}

impl<'v> TSView<'v> {
    /// A view rooted at `(value, overlay)` under `schema`.
    pub fn new(schema: &'static TSMeta, value: &'v Value, overlay: &'v Overlay) -> Self {
        TSView { schema, value, overlay, path: Path::root() }
    }

    /// This node's schema.
    pub fn schema(&self) -> &'static TSMeta {
        self.schema
    }

    /// The path used to reach this view from its root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the container value.
    pub fn value(&self) -> &'v Value {
        self.value
    }

    /// This node's most recent modification time.
    pub fn last_modified_time(&self) -> Time {
        self.overlay.core().last_modified_time()
    }

    /// `true` once this node has ever been modified.
    pub fn has_value(&self) -> bool {
        self.overlay.core().has_value()
    }

    /// `true` iff this node was modified exactly at `t`.
    pub fn modified_at(&self, t: Time) -> bool {
        self.overlay.core().modified_at(t)
    }

    fn stepped(&self, schema: &'static TSMeta, value: &'v Value, overlay: &'v Overlay, element: PathElement) -> TSView<'v> {
        TSView { schema, value, overlay, path: self.path.extended(element) }
    }

    /// Step into a `TSB` field by name.
    pub fn field(&self, name: &str) -> Option<TSView<'v>> {
        self.field_at(self.schema.field_index(name)?)
    }

    /// Step into a `TSB` field by position.
    pub fn field_at(&self, index: usize) -> Option<TSView<'v>> {
        let field = self.schema.fields.get(index)?;
        let value = match self.value {
            Value::Bundle(items) => items.get(index)?,
            _ => return None,
        };
        let overlay = match self.overlay {
            Overlay::Bundle(b) => b.field(index)?,
            _ => return None,
        };
        Some(self.stepped(field.schema, value, overlay, PathElement::Field { name: field.name.clone(), index }))
    }

    /// Step into a `TSL` element by position.
    pub fn element(&self, index: usize) -> Option<TSView<'v>> {
        let element_schema = self.schema.element?;
        let value = match self.value {
            Value::List(items) => items.get(index)?,
            _ => return None,
        };
        let overlay = match self.overlay {
            Overlay::List(l) => l.element(index)?,
            _ => return None,
        };
        Some(self.stepped(element_schema, value, overlay, PathElement::Index(index)))
    }

    /// Step into a `TSD` entry by key.
    pub fn entry(&self, key: &Scalar) -> Option<TSView<'v>> {
        let element_schema = self.schema.element?;
        let (map, map_overlay) = match (self.value, self.overlay) {
            (Value::Map(m), Overlay::Map(o)) => (m, o),
            _ => return None,
        };
        let slot = map.find_slot(key)?;
        let value = map.value_at_slot(slot)?;
        let overlay = map_overlay.entry(slot)?;
        Some(self.stepped(element_schema, value, overlay, PathElement::Index(slot)))
    }

    /// Drop to a `TS` leaf's own `TypeMeta`-composite payload (e.g. the
    /// `Bundle` fields of a `TS[Point3D]` leaf), escaping to the
    /// single-timestamp [`View`] world.
    pub fn leaf_view(&self) -> Result<View<'v>> {
        let value_schema = self.schema.value.ok_or_else(|| kind_mismatch("TS", self.schema))?;
        Ok(View::new(self.value, value_schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ts_meta::{ts_bundle, ts_list, ts_scalar, ts_set};
    use crate::type_meta::{register, TypeDescriptor};

    fn int_schema() -> &'static crate::type_meta::TypeMeta {
        register(TypeDescriptor::scalar(format!("int-{}", line!()))).unwrap()
    }

    #[test]
    fn scalar_build_starts_unmodified() {
        let ts = TSValue::new(ts_scalar(int_schema()));
        assert!(!ts.has_value());
        assert!(ts.value().values_equal(&Value::Scalar(Scalar::Unit)));
    }

    #[test]
    fn set_on_scalar_marks_modified() {
        let mut ts = TSValue::new(ts_scalar(int_schema()));
        ts.set(Value::Scalar(Scalar::Int(42)), Time::new(1));
        assert!(ts.modified_at(Time::new(1)));
        assert!(ts.value().values_equal(&Value::Scalar(Scalar::Int(42))));
    }

    #[test]
    fn bundle_field_set_propagates_to_root_without_touching_sibling() {
        let schema = ts_bundle(vec![("x".into(), ts_scalar(int_schema())), ("y".into(), ts_scalar(int_schema()))]);
        let mut ts = TSValue::new(schema);
        ts.set_field(1, Value::Scalar(Scalar::Int(7)), Time::new(2)).unwrap();
        assert!(ts.modified_at(Time::new(2)));
        let view = ts.view();
        assert!(view.field("y").unwrap().modified_at(Time::new(2)));
        assert!(!view.field("x").unwrap().modified_at(Time::new(2)));
    }

    #[test]
    fn list_push_then_set_element_tracks_independently() {
        let schema = ts_list(ts_scalar(int_schema()), None);
        let mut ts = TSValue::new(schema);
        ts.push_element(Value::Scalar(Scalar::Int(1)), Time::new(1)).unwrap();
        ts.push_element(Value::Scalar(Scalar::Int(2)), Time::new(1)).unwrap();
        ts.set_element(0, Value::Scalar(Scalar::Int(9)), Time::new(2)).unwrap();
        let view = ts.view();
        assert!(view.element(0).unwrap().modified_at(Time::new(2)));
        assert!(!view.element(1).unwrap().modified_at(Time::new(2)));
    }

    #[test]
    fn set_insert_erase_round_trips_through_ts_value() {
        let schema = ts_set(int_schema());
        let mut ts = TSValue::new(schema);
        ts.set_insert(Scalar::Int(5), Time::new(1)).unwrap();
        assert_eq!(ts.set_added().unwrap(), vec![Scalar::Int(5)]);
        assert!(ts.set_erase(&Scalar::Int(5), Time::new(2)).unwrap());
        assert_eq!(ts.set_removed().unwrap(), vec![Scalar::Int(5)]);
    }

    #[test]
    fn map_insert_distinguishes_new_key_from_value_update() {
        let schema = crate::ts_meta::ts_dict(int_schema(), ts_scalar(int_schema()));
        let mut ts = TSValue::new(schema);
        ts.map_insert(Scalar::Int(1), Value::Scalar(Scalar::Int(100)), Time::new(1)).unwrap();
        ts.map_insert(Scalar::Int(1), Value::Scalar(Scalar::Int(200)), Time::new(2)).unwrap();
        let stored = ts.map_get(&Scalar::Int(1)).unwrap().expect("key present");
        assert!(stored.values_equal(&Value::Scalar(Scalar::Int(200))));
    }

    #[test]
    fn window_push_mirrors_into_container_buffer() {
        let schema = crate::ts_meta::ts_window(int_schema(), WindowBound::Count(2));
        let mut ts = TSValue::new(schema);
        ts.window_push(Scalar::Int(1), Time::new(1)).unwrap();
        ts.window_push(Scalar::Int(2), Time::new(2)).unwrap();
        ts.window_push(Scalar::Int(3), Time::new(3)).unwrap();
        match ts.value() {
            Value::CyclicBuffer(buf) => assert_eq!(buf.len(), 2),
            _ => panic!("expected cyclic buffer"),
        }
    }

    #[test]
    fn encoded_cache_is_invalidated_by_mutation() {
        let mut ts = TSValue::new(ts_scalar(int_schema()));
        ts.set(Value::Scalar(Scalar::Int(1)), Time::new(1));
        let first = ts.encoded();
        ts.set(Value::Scalar(Scalar::Int(2)), Time::new(2));
        let second = ts.encoded();
        assert_ne!(first, second);
    }
}
