//! Reference container storage: a REF value points at another time-series
//! output without owning it (`spec.md §3`, §4.B: "an input's bound output
//! outlives the input, or `unbind` is called first").
//!
//! A bound reference is realised as a [`std::rc::Weak`] pointing at the
//! target's shared state, the owning output holding the matching
//! [`std::rc::Rc`]. This mirrors the `Observable`/`Subscription` split used
//! for cross-node subscriptions elsewhere in the runtime: the producer owns
//! the strong reference, dependents only ever see a `Weak` one, and a stale
//! target shows up as a failed `upgrade()` rather than a dangling pointer.

use std::cell::RefCell;
use std::rc::Weak;

use crate::path::Path;
use crate::value::Value;

/// Anything a [`Reference`] can be bound to.
///
/// Implemented by the shared output state in `crate::io`; kept as a trait
/// here so container storage does not depend on the I/O layer built on top
/// of it.
pub trait ReferenceTarget: core::fmt::Debug {
    /// Snapshot the target's current value.
    fn resolve(&self) -> Value;
}

/// A non-owning handle to a bound reference target.
pub type TargetHandle = Weak<RefCell<dyn ReferenceTarget>>;

/// A name awaiting resolution to a concrete output (`spec.md §4.B`: binding
/// can be requested before the target exists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTarget {
    /// The address the binding machine will retry resolving.
    pub address: String,
}

/// Reference container storage: empty, bound to a live target, or carrying
/// one or more unresolved binding requests.
#[derive(Debug, Clone)]
pub enum Reference {
    /// No binding has ever been requested.
    Empty,
    /// Bound to `target`, navigated via `path` from the target's root
    /// (`spec.md §4.C`).
    Bound { target: TargetHandle, path: Path },
    /// Binding was requested but the target could not be resolved yet; kept
    /// so the binding machine can retry (`spec.md §7`: `TargetResolutionFailed`
    /// is recoverable, not terminal).
    Unbound { pending: Vec<PendingTarget> },
}

impl Reference {
    /// The unbound reference value.
    pub fn empty() -> Self {
        Reference::Empty
    }

    /// Bind directly to a resolved target.
    pub fn bind(target: TargetHandle, path: Path) -> Self {
        Reference::Bound { target, path }
    }

    /// Queue an address for retry, preserving any requests already pending.
    pub fn defer(&mut self, address: String) {
        match self {
            Reference::Unbound { pending } => pending.push(PendingTarget { address }),
            _ => *self = Reference::Unbound { pending: vec![PendingTarget { address }] },
        }
    }

    /// `true` if the target is bound and still alive.
    pub fn is_live(&self) -> bool {
        matches!(self, Reference::Bound { target, .. } if target.upgrade().is_some())
    }

    /// Resolve the bound target's current value, if any.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Reference::Bound { target, .. } => target.upgrade().map(|t| t.borrow().resolve()),
            _ => None,
        }
    }

    /// The navigation path from the bound target's root, if bound.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Reference::Bound { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Drop any binding, returning to [`Reference::Empty`].
    pub fn unbind(&mut self) {
        *self = Reference::Empty;
    }
}

impl PartialEq for Reference {
    /// Bound references compare by target identity and path, never by
    /// resolved value: two references to equal-but-distinct outputs are not
    /// the same reference (`spec.md §4.B`).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reference::Empty, Reference::Empty) => true,
            (Reference::Bound { target: a, path: pa }, Reference::Bound { target: b, path: pb }) => {
                Weak::ptr_eq(a, b) && pa == pb
            }
            (Reference::Unbound { pending: a }, Reference::Unbound { pending: b }) => a == b,
            _ => false,
        }
    }
}
