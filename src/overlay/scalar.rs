//! `TS[T]` overlay (`spec.md §4.E`): nothing beyond the shared modification
//! flag.

use super::OverlayCore;

/// Overlay for a single-scalar time series.
#[derive(Default)]
pub struct ScalarOverlay {
    pub(super) core: OverlayCore,
}

impl ScalarOverlay {
    /// A fresh, never-modified overlay.
    pub fn new() -> Self {
        ScalarOverlay { core: OverlayCore::new() }
    }
}
