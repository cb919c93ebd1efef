//! Engine-wide configuration (`spec.md §6`).

/// Whether cyclic buffer / window overlays repack eagerly or only when asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCompaction {
    /// Repack is deferred until `window_compact` is called explicitly.
    Lazy,
    /// Repack happens on every read.
    Eager,
}

impl Default for WindowCompaction {
    fn default() -> Self {
        WindowCompaction::Lazy
    }
}

/// Configuration options enumerated in `spec.md §6`.
///
/// `subscription_dedup` is not a field: it is always on (observer lists
/// reject duplicate pointer adds unconditionally) and is documented here as
/// a standing contract rather than a knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Whether a `TSValue` memoises its encoded representation and delta
    /// across repeated reads within one tick.
    pub enable_delta_cache: bool,
    /// Compaction policy for window/cyclic-buffer overlays.
    pub window_compaction: WindowCompaction,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enable_delta_cache: true,
            window_compaction: WindowCompaction::default(),
        }
    }
}
