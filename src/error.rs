//! Crate-wide error type.

use crate::time::Time;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the typed-value core, the time-series overlay, and the
/// input/output binding machine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A typed accessor asked for a type that does not match the schema.
    #[error("type mismatch: expected `{expected}`, schema describes `{found}`")]
    TypeMismatch {
        /// Name of the type the caller requested.
        expected: &'static str,
        /// Name (or debug description) of the schema actually present.
        found: String,
    },

    /// The input and output time-series schemas cannot be bound by any
    /// access strategy.
    #[error("cannot bind input schema `{input}` to output schema `{output}`: {reason}")]
    SchemaMismatch {
        /// Debug description of the input's TSMeta.
        input: String,
        /// Debug description of the output's TSMeta.
        output: String,
        /// Human-readable reason the binding algorithm gave up.
        reason: String,
    },

    /// A name was re-registered against an incompatible structure.
    #[error("schema name `{name}` is already registered with a different structure")]
    SchemaAlreadyRegistered {
        /// The name that was re-bound.
        name: String,
    },

    /// `value()` was read on an input that has never been bound.
    #[error("input is not bound to any output")]
    UnboundInput,

    /// A REF target could not be resolved while rebinding.
    #[error("reference target could not be resolved at time {at:?}")]
    TargetResolutionFailed {
        /// The engine time at which resolution was attempted.
        at: Time,
    },

    /// Hashing was attempted on a composite value containing a non-hashable
    /// leaf.
    #[error("schema `{schema}` is not hashable")]
    TypeNotHashable {
        /// Debug description of the offending schema.
        schema: String,
    },

    /// A bounded queue was pushed to while already at capacity and its
    /// overflow policy is `reject`.
    #[error("queue at capacity {capacity} rejected push")]
    CapacityExceeded {
        /// The queue's configured capacity.
        capacity: usize,
    },

    /// A list/tuple/bundle index was out of bounds.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// The index that was requested.
        index: usize,
        /// The length of the container at the time of access.
        len: usize,
    },

    /// A map lookup found no entry for the requested key.
    #[error("no entry found for key `{key}`")]
    MissingKey {
        /// Debug description of the key that was missing.
        key: String,
    },
}
