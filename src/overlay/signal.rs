//! `SIGNAL` overlay (`spec.md §4.E`): a pure edge-trigger, no payload.

use super::OverlayCore;

/// Overlay for a signal (edge-trigger with no payload).
#[derive(Default)]
pub struct SignalOverlay {
    pub(super) core: OverlayCore,
}

impl SignalOverlay {
    /// A fresh, never-fired overlay.
    pub fn new() -> Self {
        SignalOverlay::default()
    }
}
