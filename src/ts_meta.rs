//! Time-series schema variants and their interning registry (`spec.md §3`,
//! §4.D).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::type_meta::TypeMeta;

/// A window's bound: either a fixed element count or a duration, each with
/// a minimum retained element count (`spec.md §3`: "`TSW[T, period|duration,
/// min]`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowBound {
    /// Size-bounded: evict the oldest entry once at capacity.
    Count(usize),
    /// Duration-bounded, in engine time units: drop entries older than
    /// `newest - range`, never below `min` entries.
    Duration { range: u64, min: usize },
}

/// One field of a `TSB` bundle schema.
#[derive(Debug, Clone)]
pub struct TsFieldMeta {
    /// Field name, unique within the bundle.
    pub name: String,
    /// The field's own time-series schema.
    pub schema: &'static TSMeta,
}

/// The kind of a [`TSMeta`] (`spec.md §3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsKind {
    /// Single-scalar time series.
    Ts,
    /// Bundle of named time-series fields.
    Tsb,
    /// Homogeneous list of time series.
    Tsl,
    /// Key -> time-series mapping.
    Tsd,
    /// Set of scalars.
    Tss,
    /// Fixed- or duration-bounded window of timestamped scalars.
    Tsw,
    /// Reference to another time series.
    Ref,
    /// Pure edge-trigger, no payload.
    Signal,
}

/// An interned time-series schema.
pub struct TSMeta {
    /// The schema variant.
    pub kind: TsKind,
    /// Scalar payload schema: for `TS`, the leaf type; for `TSL`/`TSS`/`TSW`,
    /// the element type. `None` for `TSB`, `TSD`, `Ref`, `Signal`.
    pub value: Option<&'static TypeMeta>,
    /// Ordered fields, for `TSB`.
    pub fields: Vec<TsFieldMeta>,
    /// Key schema, for `TSD`.
    pub key: Option<&'static TypeMeta>,
    /// Element schema, for `TSD`/`TSL` (the contained time series).
    pub element: Option<&'static TSMeta>,
    /// `Some(n)` for a fixed-length `TSL`; `None` for dynamic.
    pub fixed_len: Option<usize>,
    /// Window bound, for `TSW`.
    pub window: Option<WindowBound>,
    /// Target schema, for `Ref`.
    pub target: Option<&'static TSMeta>,
}

impl core::fmt::Debug for TSMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TSMeta")
            .field("kind", &self.kind)
            .field("fields", &self.fields.iter().map(|fm| fm.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl TSMeta {
    /// Field lookup by name for `TSB` schemas.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum StructuralKey {
    Ts(usize),
    Tsb(Vec<(String, usize)>),
    Tsl(usize, Option<usize>),
    Tsd(usize, usize),
    Tss(usize),
    Tsw(usize, WindowBound),
    Ref(usize),
    Signal,
}

fn ptr_of(m: &'static TSMeta) -> usize {
    m as *const TSMeta as usize
}

fn value_ptr(m: &'static TypeMeta) -> usize {
    m as *const TypeMeta as usize
}

#[derive(Default)]
struct Registry {
    structural: HashMap<StructuralKey, &'static TSMeta>,
    dereference_cache: HashMap<usize, &'static TSMeta>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

fn intern(key: StructuralKey, build: impl FnOnce() -> TSMeta) -> &'static TSMeta {
    let mut registry = REGISTRY.lock();
    if let Some(existing) = registry.structural.get(&key) {
        return existing;
    }
    let meta: &'static TSMeta = Box::leak(Box::new(build()));
    registry.structural.insert(key, meta);
    log::debug!("registered new ts schema: kind={:?}", meta.kind);
    meta
}

/// `TS[value]`: a single-scalar time series.
pub fn ts_scalar(value: &'static TypeMeta) -> &'static TSMeta {
    intern(StructuralKey::Ts(value_ptr(value)), || TSMeta {
        kind: TsKind::Ts,
        value: Some(value),
        fields: Vec::new(),
        key: None,
        element: None,
        fixed_len: None,
        window: None,
        target: None,
    })
}

/// `TSB[{name: TS, ...}]`: a bundle of named time-series fields, interned by
/// ordered `(name, child-TS)` pairs.
pub fn ts_bundle(fields: Vec<(String, &'static TSMeta)>) -> &'static TSMeta {
    let key = StructuralKey::Tsb(fields.iter().map(|(n, s)| (n.clone(), ptr_of(s))).collect());
    let fields_for_build = fields.clone();
    intern(key, move || TSMeta {
        kind: TsKind::Tsb,
        value: None,
        fields: fields_for_build.into_iter().map(|(name, schema)| TsFieldMeta { name, schema }).collect(),
        key: None,
        element: None,
        fixed_len: None,
        window: None,
        target: None,
    })
}

/// `TSL[TS, N]`: a homogeneous list of `element`; `fixed_len = None` means
/// dynamic.
pub fn ts_list(element: &'static TSMeta, fixed_len: Option<usize>) -> &'static TSMeta {
    intern(StructuralKey::Tsl(ptr_of(element), fixed_len), || TSMeta {
        kind: TsKind::Tsl,
        value: None,
        fields: Vec::new(),
        key: None,
        element: Some(element),
        fixed_len,
        window: None,
        target: None,
    })
}

/// `TSD[K, TS]`: a key -> time-series mapping.
pub fn ts_dict(key: &'static TypeMeta, element: &'static TSMeta) -> &'static TSMeta {
    intern(StructuralKey::Tsd(value_ptr(key), ptr_of(element)), || TSMeta {
        kind: TsKind::Tsd,
        value: None,
        fields: Vec::new(),
        key: Some(key),
        element: Some(element),
        fixed_len: None,
        window: None,
        target: None,
    })
}

/// `TSS[T]`: a set of scalars.
pub fn ts_set(value: &'static TypeMeta) -> &'static TSMeta {
    intern(StructuralKey::Tss(value_ptr(value)), || TSMeta {
        kind: TsKind::Tss,
        value: Some(value),
        fields: Vec::new(),
        key: None,
        element: None,
        fixed_len: None,
        window: None,
        target: None,
    })
}

/// `TSW[T, bound]`: a fixed- or duration-bounded window of timestamped
/// scalars.
pub fn ts_window(value: &'static TypeMeta, bound: WindowBound) -> &'static TSMeta {
    intern(StructuralKey::Tsw(value_ptr(value), bound), || TSMeta {
        kind: TsKind::Tsw,
        value: Some(value),
        fields: Vec::new(),
        key: None,
        element: None,
        fixed_len: None,
        window: Some(bound),
        target: None,
    })
}

/// `REF[TS]`: a reference to another time series of schema `target`.
pub fn ts_ref(target: &'static TSMeta) -> &'static TSMeta {
    intern(StructuralKey::Ref(ptr_of(target)), || TSMeta {
        kind: TsKind::Ref,
        value: None,
        fields: Vec::new(),
        key: None,
        element: None,
        fixed_len: None,
        window: None,
        target: Some(target),
    })
}

/// `SIGNAL`: a pure edge-trigger with no payload. A process-wide singleton.
pub fn ts_signal() -> &'static TSMeta {
    intern(StructuralKey::Signal, || TSMeta {
        kind: TsKind::Signal,
        value: None,
        fields: Vec::new(),
        key: None,
        element: None,
        fixed_len: None,
        window: None,
        target: None,
    })
}

/// Strip leading `REF` wrappers from `schema` for schema comparisons
/// (`spec.md §4.D`: "recursive and cached").
pub fn dereference(schema: &'static TSMeta) -> &'static TSMeta {
    if schema.kind != TsKind::Ref {
        return schema;
    }
    let key = ptr_of(schema);
    {
        let registry = REGISTRY.lock();
        if let Some(cached) = registry.dereference_cache.get(&key) {
            return cached;
        }
    }
    let target = schema.target.expect("Ref schema without a target");
    let resolved = dereference(target);
    REGISTRY.lock().dereference_cache.insert(key, resolved);
    resolved
}

/// `true` iff `schema` is (after dereferencing) a `TSB`, so field lookups
/// via [`TSMeta::field_index`] are meaningful.
pub fn require_bundle(schema: &'static TSMeta) -> Result<&'static TSMeta> {
    let resolved = dereference(schema);
    if resolved.kind == TsKind::Tsb {
        Ok(resolved)
    } else {
        Err(Error::TypeMismatch { expected: "TSB", found: format!("{:?}", resolved.kind) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::type_meta::{register, TypeDescriptor};

    fn int_schema(tag: &str) -> &'static TypeMeta {
        register(TypeDescriptor::scalar(format!("int-{}-{}", tag, line!()))).unwrap()
    }

    #[test]
    fn identical_construction_interns_to_one_pointer() {
        let int_ts = int_schema("a");
        let a = ts_scalar(int_ts);
        let b = ts_scalar(int_ts);
        assert!(core::ptr::eq(a, b));
    }

    #[test]
    fn dereference_strips_ref_recursively() {
        let int_ts = int_schema("b");
        let ts = ts_scalar(int_ts);
        let ref_once = ts_ref(ts);
        let ref_twice = ts_ref(ref_once);
        assert!(core::ptr::eq(dereference(ref_twice), ts));
    }

    #[test]
    fn dereference_is_identity_for_non_ref() {
        let int_ts = int_schema("c");
        let ts = ts_scalar(int_ts);
        assert!(core::ptr::eq(dereference(ts), ts));
    }
}
