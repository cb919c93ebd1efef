//! Read-only and mutable views over container storage (`spec.md §4.C`).
//!
//! A [`Value`] carries no pointer back to its schema, so a view is the pair
//! (reference into the value tree, schema) plus the path used to reach it.
//! Navigation never panics: stepping off the end of a bundle/list/tuple, or
//! stepping through a schema mismatch, yields an *invalid* view (one with no
//! backing reference) rather than an error. Only the typed accessors
//! (`as_scalar` and friends) report [`Error::TypeMismatch`], matching
//! `spec.md`'s "operations on invalid views return invalid child views
//! rather than panicking, except `as<T>`".

use crate::error::{Error, Result};
use crate::path::{Path, PathElement};
use crate::type_meta::TypeMeta;
use crate::value::{Scalar, Value};

/// A read-only navigator over a [`Value`] tree.
#[derive(Clone, Copy)]
pub struct View<'v> {
    data: Option<&'v Value>,
    schema: &'static TypeMeta,
    path: Path,
}

impl<'v> View<'v> {
    /// A valid view rooted at `data` under `schema`.
    pub fn new(data: &'v Value, schema: &'static TypeMeta) -> Self {
        View { data: Some(data), schema, path: Path::root() }
    }

    /// An invalid view carrying only a schema (used as the result of a
    /// navigation that could not find its target).
    pub fn invalid(schema: &'static TypeMeta) -> Self {
        View { data: None, schema, path: Path::root() }
    }

    /// `true` iff this view refers to an actual value.
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// The view's schema (always present, even when invalid).
    pub fn schema(&self) -> &'static TypeMeta {
        self.schema
    }

    /// The path used to reach this view from its root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the underlying value, if valid.
    pub fn value(&self) -> Option<&'v Value> {
        self.data
    }

    fn stepped(&self, data: Option<&'v Value>, schema: &'static TypeMeta, element: PathElement) -> View<'v> {
        View { data, schema, path: self.path.extended(element) }
    }

    /// Navigate to a named bundle field. Invalid if this view is invalid,
    /// the schema has no such field, or the field is out of sync with the
    /// value (should not happen for well-formed bundles).
    pub fn field(&self, name: &str) -> View<'v> {
        let Some(index) = self.schema.field_index(name) else {
            return self.stepped(None, self.schema, PathElement::Field { name: name.to_string(), index: 0 });
        };
        self.field_at(index)
    }

    /// Navigate to a bundle (or tuple) field by position.
    pub fn field_at(&self, index: usize) -> View<'v> {
        let field_schema = match self.schema.field_at(index) {
            Some(fm) => fm.schema,
            None => self.schema,
        };
        let name = self.schema.field_at(index).map(|f| f.name.clone()).unwrap_or_default();
        let element = PathElement::Field { name, index };
        match self.data {
            Some(Value::Bundle(items)) | Some(Value::Tuple(items)) => {
                self.stepped(items.get(index), field_schema, element)
            }
            _ => self.stepped(None, field_schema, element),
        }
    }

    /// Navigate to a list element by index.
    pub fn element(&self, index: usize) -> View<'v> {
        let element_schema = self.schema.element.unwrap_or(self.schema);
        match self.data {
            Some(Value::List(items)) => self.stepped(items.get(index), element_schema, PathElement::Index(index)),
            _ => self.stepped(None, element_schema, PathElement::Index(index)),
        }
    }

    /// The element count, for list/set/map/cyclic-buffer/queue kinds.
    pub fn len(&self) -> Option<usize> {
        match self.data? {
            Value::Tuple(items) | Value::Bundle(items) | Value::List(items) => Some(items.len()),
            Value::Set(s) => Some(s.len()),
            Value::Map(m) => Some(m.len()),
            Value::CyclicBuffer(b) => Some(b.len()),
            Value::Queue(q) => Some(q.len()),
            Value::Scalar(_) | Value::Reference(_) => None,
        }
    }

    /// Typed scalar access; fails with [`Error::TypeMismatch`] if this view
    /// is invalid or does not hold a scalar (`spec.md §4.C`: "checked mode").
    pub fn as_scalar(&self) -> Result<&'v Scalar> {
        match self.data {
            Some(Value::Scalar(s)) => Ok(s),
            Some(other) => Err(Error::TypeMismatch { expected: "scalar", found: format!("{:?}", other) }),
            None => Err(Error::TypeMismatch { expected: "scalar", found: "invalid view".to_string() }),
        }
    }
}

/// A mutable navigator over a [`Value`] tree.
///
/// Mirrors [`View`]'s navigation but returns exclusive borrows; it does not
/// itself call `mark_modified` — callers (`crate::ts_value`) are
/// responsible for pairing a write with the matching overlay update.
pub struct ViewMut<'v> {
    data: Option<&'v mut Value>,
    schema: &'static TypeMeta,
    path: Path,
}

impl<'v> ViewMut<'v> {
    /// A valid mutable view rooted at `data` under `schema`.
    pub fn new(data: &'v mut Value, schema: &'static TypeMeta) -> Self {
        ViewMut { data: Some(data), schema, path: Path::root() }
    }

    /// `true` iff this view refers to an actual value.
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// The view's schema.
    pub fn schema(&self) -> &'static TypeMeta {
        self.schema
    }

    /// The path used to reach this view from its root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the underlying value immutably.
    pub fn value(&self) -> Option<&Value> {
        self.data.as_deref()
    }

    /// Borrow the underlying value mutably.
    pub fn value_mut(&mut self) -> Option<&mut Value> {
        self.data.as_deref_mut()
    }

    /// Overwrite the value in place. No-op (returns `false`) on an invalid
    /// view.
    pub fn set(&mut self, value: Value) -> bool {
        match self.data.as_deref_mut() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Navigate to a bundle/tuple field by position, consuming this view
    /// (avoids holding two overlapping mutable borrows of the same tree).
    pub fn into_field_at(self, index: usize) -> ViewMut<'v> {
        let field_schema = self.schema.field_at(index).map(|f| f.schema).unwrap_or(self.schema);
        let name = self.schema.field_at(index).map(|f| f.name.clone()).unwrap_or_default();
        let element = PathElement::Field { name, index };
        let path = self.path.extended(element);
        let data = match self.data {
            Some(Value::Bundle(items)) | Some(Value::Tuple(items)) => items.get_mut(index),
            _ => None,
        };
        ViewMut { data, schema: field_schema, path }
    }

    /// Navigate to a list element by index, consuming this view.
    pub fn into_element(self, index: usize) -> ViewMut<'v> {
        let element_schema = self.schema.element.unwrap_or(self.schema);
        let path = self.path.extended(PathElement::Index(index));
        let data = match self.data {
            Some(Value::List(items)) => items.get_mut(index),
            _ => None,
        };
        ViewMut { data, schema: element_schema, path }
    }
}
