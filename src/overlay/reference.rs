//! `REF` overlay (`spec.md §4.E`): a modification flag marking when the
//! reference's target changed.

use super::OverlayCore;

/// Overlay for a reference to another time series.
#[derive(Default)]
pub struct ReferenceOverlay {
    pub(super) core: OverlayCore,
}

impl ReferenceOverlay {
    /// A fresh, never-modified overlay.
    pub fn new() -> Self {
        ReferenceOverlay::default()
    }
}
