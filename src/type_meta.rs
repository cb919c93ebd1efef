//! Interned schemas and the type-erased operation table (`spec.md §3`, §4.A).
//!
//! `Value`'s variants already give every container kind a uniform way to
//! compare, render, and encode itself ([`crate::value::Value::values_equal`],
//! `render`, `to_bytes`/`from_bytes`); that is this crate's realisation of
//! "one function dispatches many concrete types". [`Operations`] exists
//! where genuine per-schema customisation is still needed — principally for
//! scalar leaves bridging to host-language representations — and falls back
//! to the generic `Value` methods for every composite kind.
//!
//! `construct`/`destruct`/`copy-assign`/`move-assign`/`move-construct` are
//! not carried as table entries: `Value` is a plain Rust enum, so
//! `Clone`/`Drop`/ownership moves already give every schema those operations
//! uniformly, without per-type fn pointers (`DESIGN.md` records this as a
//! deliberate simplification of the operation table).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::container::cyclic::CyclicBuffer;
use crate::container::map::MapStorage;
use crate::container::queue::Queue;
use crate::container::reference::Reference;
use crate::container::set::SetStorage;
use crate::container::Kind;
use crate::error::{Error, Result};
use crate::value::{Scalar, Value};

/// Feature flags describing what operations and comparisons a schema
/// supports (`spec.md §3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    /// Copying the value never requires visiting children (scalars only).
    pub trivially_copyable: bool,
    /// `hash` is meaningful (no non-hashable leaf, e.g. no `Float`).
    pub hashable: bool,
    /// `equals` is meaningful (true for every kind in this crate).
    pub equatable: bool,
    /// `less-than` is meaningful (scalars and schemas that define one).
    pub comparable: bool,
    /// Supports `to_bytes`/`from_bytes` host-bridging encode.
    pub buffer_compatible: bool,
    /// A tuple with a variable field count (unused by any builder here;
    /// reserved for host languages with variadic tuples).
    pub variadic_tuple: bool,
    /// `true` for every non-scalar kind.
    pub container: bool,
}

/// The type-erased operation table (`spec.md §3`: "required: construct,
/// destruct, copy-assign, move-assign, move-construct, equals, to-string,
/// to-encoded, from-encoded... optional: hash, less-than, length, ...").
#[derive(Clone, Copy)]
pub struct Operations {
    /// Structural equality (`spec.md` required: `equals`).
    pub equals: fn(&Value, &Value) -> bool,
    /// Human-readable rendering (`spec.md` required: `to-string`).
    pub to_string: fn(&Value) -> String,
    /// Host-bridging encode (`spec.md` required: `to-encoded`).
    pub to_encoded: fn(&Value) -> Vec<u8>,
    /// Host-bridging decode (`spec.md` required: `from-encoded`).
    pub from_encoded: fn(&[u8]) -> Result<Value>,
    /// Best-effort hash; `None` (not merely a sentinel) when the schema can
    /// never be hashed at all (`spec.md §4.A` distinguishes a schema with no
    /// `hash` entry from a hashable schema whose *value* reports
    /// `TypeNotHashable`; the latter is a `Value::Scalar(Float)` leaf).
    pub hash: Option<fn(&Value) -> Option<u64>>,
    /// Total order, where one exists.
    pub less_than: Option<fn(&Value, &Value) -> bool>,
    /// Element/member count, for collection kinds.
    pub length: Option<fn(&Value) -> usize>,
}

fn scalar_hash(v: &Value) -> Option<u64> {
    match v {
        Value::Scalar(s) => s.try_hash(),
        _ => None,
    }
}

fn scalar_less_than(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => x.partial_cmp(y) == Some(core::cmp::Ordering::Less),
        _ => false,
    }
}

impl Operations {
    /// The operation table shared by every composite kind: dispatches
    /// through `Value`'s own generic methods.
    pub fn generic() -> Operations {
        Operations {
            equals: Value::values_equal,
            to_string: Value::render,
            to_encoded: Value::to_bytes,
            from_encoded: Value::from_bytes,
            hash: None,
            less_than: None,
            length: None,
        }
    }

    /// The operation table for scalar leaves: same encode/equals/render as
    /// `generic`, plus hashing (when the leaf kind supports it) and
    /// ordering.
    pub fn scalar() -> Operations {
        Operations {
            equals: Value::values_equal,
            to_string: Value::render,
            to_encoded: Value::to_bytes,
            from_encoded: Value::from_bytes,
            hash: Some(scalar_hash),
            less_than: Some(scalar_less_than),
            length: None,
        }
    }
}

/// One field of a [`TypeMeta::Bundle`] schema.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    /// Field name, unique within the bundle.
    pub name: String,
    /// The field's own schema.
    pub schema: &'static TypeMeta,
}

/// An interned, process-scope schema (`spec.md §3`).
///
/// Schema pointers compare by identity; the [`registry`] guarantees
/// structurally identical schemas resolve to the same `&'static TypeMeta`.
pub struct TypeMeta {
    /// The value shape this schema describes.
    pub kind: Kind,
    /// Feature flags.
    pub flags: Flags,
    /// Optional human-readable name, as given at registration.
    pub name: Option<String>,
    /// Element schema, for List/Set/CyclicBuffer/Queue.
    pub element: Option<&'static TypeMeta>,
    /// Key schema, for Map.
    pub key: Option<&'static TypeMeta>,
    /// Target schema, for Reference.
    pub target: Option<&'static TypeMeta>,
    /// Ordered fields, for Tuple/Bundle.
    pub fields: Vec<FieldMeta>,
    /// `Some(n)` for a fixed-length List; `None` for dynamic.
    pub fixed_len: Option<usize>,
    /// The operation table.
    pub ops: Operations,
}

impl core::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|fm| fm.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl TypeMeta {
    /// Field lookup by name, O(n) — "small record assumption; linear is
    /// acceptable" (`spec.md §4.B`).
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field lookup by position, O(1).
    pub fn field_at(&self, index: usize) -> Option<&FieldMeta> {
        self.fields.get(index)
    }
}

/// Pointer-identity type check: is `meta` exactly this process's interned
/// scalar schema of this kind? (`spec.md §4.A`: "type introspection...uses
/// pointer identity").
pub fn is_type(a: &'static TypeMeta, b: &'static TypeMeta) -> bool {
    core::ptr::eq(a, b)
}

/// A request to register (or look up) a schema (`spec.md §4.A`).
///
/// Builder for every [`Kind`]; pass to [`register`].
pub struct TypeDescriptor {
    pub(crate) kind: Kind,
    pub(crate) name: Option<String>,
    pub(crate) element: Option<&'static TypeMeta>,
    pub(crate) key: Option<&'static TypeMeta>,
    pub(crate) target: Option<&'static TypeMeta>,
    pub(crate) fields: Vec<FieldMeta>,
    pub(crate) fixed_len: Option<usize>,
    pub(crate) ops: Operations,
    pub(crate) flags: Flags,
}

impl TypeDescriptor {
    /// A scalar leaf schema, named after its host-language kind.
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeDescriptor {
            kind: Kind::Scalar,
            name: Some(name.into()),
            element: None,
            key: None,
            target: None,
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::scalar(),
            flags: Flags { equatable: true, comparable: true, buffer_compatible: true, hashable: true, trivially_copyable: true, ..Default::default() },
        }
    }

    /// A fixed-arity tuple of `fields` (unnamed; stored with empty names).
    pub fn tuple(fields: Vec<&'static TypeMeta>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, schema)| FieldMeta { name: i.to_string(), schema })
            .collect();
        TypeDescriptor {
            kind: Kind::Tuple,
            name: None,
            element: None,
            key: None,
            target: None,
            fields,
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A named record with ordered `(name, schema)` fields.
    pub fn bundle(name: impl Into<String>, fields: Vec<(String, &'static TypeMeta)>) -> Self {
        let fields = fields.into_iter().map(|(name, schema)| FieldMeta { name, schema }).collect();
        TypeDescriptor {
            kind: Kind::Bundle,
            name: Some(name.into()),
            element: None,
            key: None,
            target: None,
            fields,
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A homogeneous list. `fixed_len = Some(0)` means dynamic
    /// (`spec.md §3`: "`TSL[TS, N]`...N=0 means dynamic").
    pub fn list(element: &'static TypeMeta, fixed_len: Option<usize>) -> Self {
        TypeDescriptor {
            kind: Kind::List,
            name: None,
            element: Some(element),
            key: None,
            target: None,
            fields: Vec::new(),
            fixed_len,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A set of `element` scalars.
    pub fn set(element: &'static TypeMeta) -> Self {
        TypeDescriptor {
            kind: Kind::Set,
            name: None,
            element: Some(element),
            key: None,
            target: None,
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A `key -> value` mapping.
    pub fn map(key: &'static TypeMeta, value: &'static TypeMeta) -> Self {
        TypeDescriptor {
            kind: Kind::Map,
            name: None,
            element: Some(value),
            key: Some(key),
            target: None,
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A fixed-capacity ring buffer of `element`.
    pub fn cyclic_buffer(element: &'static TypeMeta) -> Self {
        TypeDescriptor {
            kind: Kind::CyclicBuffer,
            name: None,
            element: Some(element),
            key: None,
            target: None,
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A FIFO queue of `element`.
    pub fn queue(element: &'static TypeMeta) -> Self {
        TypeDescriptor {
            kind: Kind::Queue,
            name: None,
            element: Some(element),
            key: None,
            target: None,
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, buffer_compatible: true, ..Default::default() },
        }
    }

    /// A reference to another value of schema `target`.
    pub fn reference(target: &'static TypeMeta) -> Self {
        TypeDescriptor {
            kind: Kind::Reference,
            name: None,
            element: None,
            key: None,
            target: Some(target),
            fields: Vec::new(),
            fixed_len: None,
            ops: Operations::generic(),
            flags: Flags { equatable: true, container: true, ..Default::default() },
        }
    }

    fn structural_key(&self) -> StructuralKey {
        let ptr = |m: &'static TypeMeta| m as *const TypeMeta as usize;
        match self.kind {
            Kind::Scalar => StructuralKey::Scalar(self.name.clone().unwrap_or_default()),
            Kind::Tuple => StructuralKey::Tuple(self.fields.iter().map(|f| ptr(f.schema)).collect()),
            Kind::Bundle => StructuralKey::Bundle(self.fields.iter().map(|f| (f.name.clone(), ptr(f.schema))).collect()),
            Kind::List => StructuralKey::List(ptr(self.element.expect("list descriptor needs an element schema")), self.fixed_len),
            Kind::Set => StructuralKey::Set(ptr(self.element.expect("set descriptor needs an element schema"))),
            Kind::Map => StructuralKey::Map(
                ptr(self.key.expect("map descriptor needs a key schema")),
                ptr(self.element.expect("map descriptor needs a value schema")),
            ),
            Kind::CyclicBuffer => StructuralKey::CyclicBuffer(ptr(self.element.expect("cyclic buffer descriptor needs an element schema"))),
            Kind::Queue => StructuralKey::Queue(ptr(self.element.expect("queue descriptor needs an element schema"))),
            Kind::Reference => StructuralKey::Reference(ptr(self.target.expect("reference descriptor needs a target schema"))),
        }
    }

    fn into_meta(self) -> TypeMeta {
        TypeMeta {
            kind: self.kind,
            flags: self.flags,
            name: self.name,
            element: self.element,
            key: self.key,
            target: self.target,
            fields: self.fields,
            fixed_len: self.fixed_len,
            ops: self.ops,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum StructuralKey {
    Scalar(String),
    Tuple(Vec<usize>),
    Bundle(Vec<(String, usize)>),
    List(usize, Option<usize>),
    Set(usize),
    Map(usize, usize),
    CyclicBuffer(usize),
    Queue(usize),
    Reference(usize),
}

#[derive(Default)]
struct Registry {
    structural: HashMap<StructuralKey, &'static TypeMeta>,
    named: HashMap<String, &'static TypeMeta>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

/// Register (or look up) a schema (`spec.md §4.A`).
///
/// Returns the existing pointer when the same structure is re-registered.
/// Fails with [`Error::SchemaAlreadyRegistered`] when `descriptor.name`
/// names an already-registered schema of different structure.
pub fn register(descriptor: TypeDescriptor) -> Result<&'static TypeMeta> {
    let key = descriptor.structural_key();
    let name = descriptor.name.clone();
    let mut registry = REGISTRY.lock();

    if let Some(existing) = registry.structural.get(&key).copied() {
        if let Some(name) = &name {
            match registry.named.get(name).copied() {
                Some(named) if !core::ptr::eq(named, existing) => {
                    return Err(Error::SchemaAlreadyRegistered { name: name.clone() });
                }
                Some(_) => {}
                None => {
                    registry.named.insert(name.clone(), existing);
                }
            }
        }
        log::debug!("type schema already interned: kind={:?} name={:?}", existing.kind, existing.name);
        return Ok(existing);
    }

    if let Some(name) = &name {
        if registry.named.contains_key(name) {
            return Err(Error::SchemaAlreadyRegistered { name: name.clone() });
        }
    }

    let meta: &'static TypeMeta = Box::leak(Box::new(descriptor.into_meta()));
    registry.structural.insert(key, meta);
    if let Some(name) = &name {
        registry.named.insert(name.clone(), meta);
    }
    log::debug!("registered new type schema: kind={:?} name={:?}", meta.kind, meta.name);
    Ok(meta)
}

/// The zero/empty value for any schema, used to seed newly constructed
/// `TSValue`s before their first `set` (`spec.md §9`: the operation table's
/// `construct` entry, realised generically here since every kind's "empty"
/// shape can be built the same way regardless of payload type).
pub fn default_value(schema: &'static TypeMeta) -> Value {
    match schema.kind {
        Kind::Scalar => Value::Scalar(Scalar::Unit),
        Kind::Tuple => Value::Tuple(schema.fields.iter().map(|f| default_value(f.schema)).collect()),
        Kind::Bundle => Value::Bundle(schema.fields.iter().map(|f| default_value(f.schema)).collect()),
        Kind::List => match schema.fixed_len {
            Some(n) if n > 0 => {
                let element = schema.element.expect("list schema needs an element schema");
                Value::List((0..n).map(|_| default_value(element)).collect())
            }
            _ => Value::List(Vec::new()),
        },
        Kind::Set => Value::Set(SetStorage::new()),
        Kind::Map => Value::Map(MapStorage::new()),
        Kind::CyclicBuffer => Value::CyclicBuffer(CyclicBuffer::new(1)),
        Kind::Queue => Value::Queue(Queue::unbounded()),
        Kind::Reference => Value::Reference(Reference::empty()),
    }
}

/// Look up a previously registered schema by name.
pub fn lookup(name: &str) -> Option<&'static TypeMeta> {
    REGISTRY.lock().named.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structurally_identical_schemas_intern_to_one_pointer() {
        let a = register(TypeDescriptor::scalar(format!("int-{}", line!()))).unwrap();
        let b = register(TypeDescriptor::list(a, None)).unwrap();
        let c = register(TypeDescriptor::list(a, None)).unwrap();
        assert!(is_type(b, c));
    }

    #[test]
    fn re_registering_a_name_with_different_structure_fails() {
        let name = format!("dup-{}", line!());
        let int_schema = register(TypeDescriptor::scalar(name.clone())).unwrap();
        let _ = int_schema;
        let err = register(TypeDescriptor::bundle(name, vec![])).unwrap_err();
        assert!(matches!(err, Error::SchemaAlreadyRegistered { .. }));
    }

    #[test]
    fn scalar_hash_reports_none_for_float() {
        let float_schema = register(TypeDescriptor::scalar(format!("float-{}", line!()))).unwrap();
        let hash = float_schema.ops.hash.unwrap();
        assert_eq!(hash(&Value::Scalar(crate::value::Scalar::Float(1.5))), None);
    }
}
