//! The type-erased value representation container storages are built from.
//!
//! `spec.md §3` describes container storages as "POD laid out so views can
//! compute child addresses from (data, field-offset)". This crate realises
//! that contract with a safe tagged tree instead of raw byte layouts: a
//! [`Value`] plays the role of "the data behind a schema", and the
//! operation table in [`crate::type_meta`] dispatches on it the same way a
//! byte-oriented vtable would dispatch on a raw pointer. Concrete container
//! storages ([`crate::container`]) are thin typed views over one `Value`
//! variant each.

use codec::{Decode, Encode, Input, Output};

use crate::container::{cyclic::CyclicBuffer, map::MapStorage, queue::Queue, reference::Reference, set::SetStorage};
use crate::error::{Error, Result};

/// A host-supplied scalar leaf value.
///
/// The set of scalar kinds a value tree can hold at its leaves; this stands
/// in for "host-supplied primitives" (`spec.md` treats scalar types as
/// externally supplied and opaque to the core beyond their operation table).
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Scalar {
    /// The empty scalar, used for SIGNAL payloads and unit tuples.
    Unit,
    /// Boolean leaf.
    Bool(bool),
    /// Signed 64-bit integer leaf.
    Int(i64),
    /// 64-bit float leaf.
    Float(f64),
    /// UTF-8 string leaf.
    Str(String),
    /// Opaque byte-string leaf.
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Best-effort hash for composite hashing; returns `None` for `Float`,
    /// which is not `Hash` (`spec.md §4.A`: hashing a composite containing a
    /// non-hashable leaf must report `TypeNotHashable`).
    pub fn try_hash(&self) -> Option<u64> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            Scalar::Unit => 0u8.hash(&mut hasher),
            Scalar::Bool(b) => b.hash(&mut hasher),
            Scalar::Int(i) => i.hash(&mut hasher),
            Scalar::Float(_) => return None,
            Scalar::Str(s) => s.hash(&mut hasher),
            Scalar::Bytes(b) => b.hash(&mut hasher),
        }
        Some(hasher.finish())
    }
}

// `f64` is intentionally not derived via `codec`'s own numeric impls (the
// crate has historically kept floats out of its default encodings); it is
// carried through as its raw bits so encoding stays total and round-trips
// bit-for-bit, including NaN payloads.
impl Encode for Scalar {
    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        match self {
            Scalar::Unit => dest.push_byte(0),
            Scalar::Bool(b) => {
                dest.push_byte(1);
                b.encode_to(dest);
            }
            Scalar::Int(i) => {
                dest.push_byte(2);
                i.encode_to(dest);
            }
            Scalar::Float(x) => {
                dest.push_byte(3);
                x.to_bits().encode_to(dest);
            }
            Scalar::Str(s) => {
                dest.push_byte(4);
                s.encode_to(dest);
            }
            Scalar::Bytes(b) => {
                dest.push_byte(5);
                b.encode_to(dest);
            }
        }
    }
}

impl Decode for Scalar {
    fn decode<I: Input>(input: &mut I) -> core::result::Result<Self, codec::Error> {
        match input.read_byte()? {
            0 => Ok(Scalar::Unit),
            1 => Ok(Scalar::Bool(bool::decode(input)?)),
            2 => Ok(Scalar::Int(i64::decode(input)?)),
            3 => Ok(Scalar::Float(f64::from_bits(u64::decode(input)?))),
            4 => Ok(Scalar::Str(String::decode(input)?)),
            5 => Ok(Scalar::Bytes(Vec::<u8>::decode(input)?)),
            _ => Err("invalid Scalar discriminant".into()),
        }
    }
}

impl core::fmt::Display for Scalar {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Scalar::Unit => write!(f, "()"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::Bytes(b) => write!(f, "{:?}", b),
        }
    }
}

/// The type-erased value behind any schema.
///
/// One variant per [`crate::type_meta::Kind`]. A `Value` never carries its
/// own schema pointer; the schema is always supplied alongside by the owning
/// [`crate::view::View`] or [`crate::ts_value::TSValue`].
#[derive(Debug, Clone)]
pub enum Value {
    /// A single scalar leaf.
    Scalar(Scalar),
    /// A fixed-arity, possibly heterogeneous tuple.
    Tuple(Vec<Value>),
    /// A named record; children are stored positionally in schema field
    /// order (`spec.md §4.B`: "field lookup O(1) by index").
    Bundle(Vec<Value>),
    /// A homogeneous list, fixed or dynamic.
    List(Vec<Value>),
    /// A set of scalar keys.
    Set(SetStorage),
    /// A key -> value mapping.
    Map(MapStorage),
    /// A fixed-capacity ring buffer.
    CyclicBuffer(CyclicBuffer),
    /// A FIFO queue, optionally capacity-bounded.
    Queue(Queue),
    /// A reference to another time-series output.
    Reference(Reference),
}

impl Value {
    /// Structural equality, deferring to each container kind's own
    /// `PartialEq`. Composite equality short-circuits on kind mismatch.
    pub fn values_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Bundle(a), Value::Bundle(b)) | (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.values_equal(y))
            }
            (Value::Set(a), Value::Set(b)) => a.sets_equal(b),
            (Value::Map(a), Value::Map(b)) => a.entries_equal(b),
            (Value::CyclicBuffer(a), Value::CyclicBuffer(b)) => {
                let (a, b) = (a.as_slice(), b.as_slice());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.values_equal(y))
            }
            (Value::Queue(a), Value::Queue(b)) => {
                let (a, b) = (a.as_slice(), b.as_slice());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.values_equal(y))
            }
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => false,
        }
    }

    /// A human-readable rendering, used by `to_string` operation table
    /// entries and by diagnostics.
    pub fn render(&self) -> String {
        match self {
            Value::Scalar(s) => s.to_string(),
            Value::Tuple(items) | Value::Bundle(items) | Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Set(s) => format!("{{{}}}", s.live_keys().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")),
            Value::Map(m) => format!(
                "{{{}}}",
                m.live_entries()
                    .map(|(k, v)| format!("{}: {}", k, v.render()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::CyclicBuffer(b) => format!("ring{:?}", b.as_slice().iter().map(Value::render).collect::<Vec<_>>()),
            Value::Queue(q) => format!("queue{:?}", q.as_slice().iter().map(Value::render).collect::<Vec<_>>()),
            Value::Reference(r) => format!("{:?}", r),
        }
    }

    /// The schema's `to-encoded` operation table entry.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    /// The schema's `from-encoded` operation table entry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
        let mut input = bytes;
        Value::decode(&mut input).map_err(|e| Error::TypeMismatch { expected: "decodable value bytes", found: e.to_string() })
    }
}

// Sets and maps encode as their live (key[, value]) pairs, not their
// internal slot layout: decoding rebuilds fresh storage with the same
// members, which is all `values_equal` ever compares. A bound `Reference`
// encodes the snapshot of its current target for host-language
// introspection, but a pointer cannot be reconstructed from bytes, so
// decoding a reference always yields `Reference::Empty` — the one place
// this schema's round-trip law does not hold, by necessity rather than
// oversight.
impl Encode for Value {
    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        match self {
            Value::Scalar(s) => {
                dest.push_byte(0);
                s.encode_to(dest);
            }
            Value::Tuple(items) => {
                dest.push_byte(1);
                items.encode_to(dest);
            }
            Value::Bundle(items) => {
                dest.push_byte(2);
                items.encode_to(dest);
            }
            Value::List(items) => {
                dest.push_byte(3);
                items.encode_to(dest);
            }
            Value::Set(s) => {
                dest.push_byte(4);
                let keys: Vec<Scalar> = s.live_keys().cloned().collect();
                keys.encode_to(dest);
            }
            Value::Map(m) => {
                dest.push_byte(5);
                let entries: Vec<(Scalar, Value)> = m.live_entries().map(|(k, v)| (k.clone(), v.clone())).collect();
                entries.encode_to(dest);
            }
            Value::CyclicBuffer(b) => {
                dest.push_byte(6);
                let items: Vec<Value> = b.as_slice().into_iter().cloned().collect();
                items.encode_to(dest);
            }
            Value::Queue(q) => {
                dest.push_byte(7);
                let items: Vec<Value> = q.as_slice().into_iter().cloned().collect();
                items.encode_to(dest);
            }
            Value::Reference(r) => {
                dest.push_byte(8);
                r.resolve().encode_to(dest);
            }
        }
    }
}

impl Decode for Value {
    fn decode<I: Input>(input: &mut I) -> core::result::Result<Self, codec::Error> {
        match input.read_byte()? {
            0 => Ok(Value::Scalar(Scalar::decode(input)?)),
            1 => Ok(Value::Tuple(Vec::<Value>::decode(input)?)),
            2 => Ok(Value::Bundle(Vec::<Value>::decode(input)?)),
            3 => Ok(Value::List(Vec::<Value>::decode(input)?)),
            4 => {
                let keys = Vec::<Scalar>::decode(input)?;
                let mut set = SetStorage::new();
                for k in keys {
                    set.insert(k, &mut []);
                }
                Ok(Value::Set(set))
            }
            5 => {
                let entries = Vec::<(Scalar, Value)>::decode(input)?;
                let mut map = MapStorage::new();
                for (k, v) in entries {
                    map.insert(k, v, &mut []);
                }
                Ok(Value::Map(map))
            }
            6 => {
                let items = Vec::<Value>::decode(input)?;
                let mut buf = CyclicBuffer::new(items.len().max(1));
                for item in items {
                    buf.push(item);
                }
                Ok(Value::CyclicBuffer(buf))
            }
            7 => {
                let items = Vec::<Value>::decode(input)?;
                let mut queue = Queue::unbounded();
                for item in items {
                    let _ = queue.push(item);
                }
                Ok(Value::Queue(queue))
            }
            8 => {
                let _snapshot = Option::<Value>::decode(input)?;
                Ok(Value::Reference(Reference::empty()))
            }
            _ => Err("invalid Value discriminant".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_round_trips() {
        let values = vec![
            Value::Scalar(Scalar::Unit),
            Value::Scalar(Scalar::Bool(true)),
            Value::Scalar(Scalar::Int(-7)),
            Value::Scalar(Scalar::Float(3.5)),
            Value::Scalar(Scalar::Str("hi".into())),
            Value::Scalar(Scalar::Bytes(vec![1, 2, 3])),
        ];
        for v in values {
            let decoded = Value::from_bytes(&v.to_bytes()).unwrap();
            assert!(v.values_equal(&decoded));
        }
    }

    #[test]
    fn tuple_and_list_round_trip() {
        let v = Value::Tuple(vec![Value::Scalar(Scalar::Int(1)), Value::Scalar(Scalar::Bool(false))]);
        let decoded = Value::from_bytes(&v.to_bytes()).unwrap();
        assert!(v.values_equal(&decoded));

        let l = Value::List(vec![Value::Scalar(Scalar::Int(1)), Value::Scalar(Scalar::Int(2))]);
        let decoded = Value::from_bytes(&l.to_bytes()).unwrap();
        assert!(l.values_equal(&decoded));
    }

    #[test]
    fn set_round_trips_as_live_members() {
        let mut set = SetStorage::new();
        set.insert(Scalar::Int(1), &mut []);
        set.insert(Scalar::Int(2), &mut []);
        let v = Value::Set(set);
        let decoded = Value::from_bytes(&v.to_bytes()).unwrap();
        assert!(v.values_equal(&decoded));
    }

    #[test]
    fn unbound_reference_decodes_as_empty() {
        let v = Value::Reference(Reference::empty());
        let decoded = Value::from_bytes(&v.to_bytes()).unwrap();
        assert!(matches!(decoded, Value::Reference(Reference::Empty)));
    }
}
