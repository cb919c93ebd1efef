//! `TSB` overlay (`spec.md §4.E`): one child overlay per bundle field,
//! positioned to match the field's index in the bundle's schema.

use super::{Overlay, OverlayCore};

/// Overlay for a bundle of named time-series fields.
pub struct BundleOverlay {
    pub(super) core: OverlayCore,
    pub(super) fields: Vec<Overlay>,
}

impl BundleOverlay {
    /// Build a bundle overlay with one child overlay per field, in schema
    /// order.
    pub fn new(fields: Vec<Overlay>) -> Self {
        BundleOverlay { core: OverlayCore::new(), fields }
    }

    /// Borrow a field's overlay by position.
    pub fn field(&self, index: usize) -> Option<&Overlay> {
        self.fields.get(index)
    }
}
