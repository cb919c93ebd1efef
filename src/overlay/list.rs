//! `TSL` overlay (`spec.md §4.E`): one child overlay per list element.

use super::{Overlay, OverlayCore};

/// Overlay for a homogeneous list of time series.
pub struct ListOverlay {
    pub(super) core: OverlayCore,
    pub(super) elements: Vec<Overlay>,
}

impl ListOverlay {
    /// Build a list overlay with `elements` pre-populated (for a fixed-size
    /// list, this is the full element count up front).
    pub fn new(elements: Vec<Overlay>) -> Self {
        ListOverlay { core: OverlayCore::new(), elements }
    }

    /// Append a new element overlay, keeping pace with a dynamic list's
    /// container growth.
    pub fn push(&mut self, element: Overlay) {
        self.elements.push(element);
    }

    /// Drop the element overlay at `index`, keeping pace with a dynamic
    /// list's container shrinkage.
    pub fn remove(&mut self, index: usize) -> Overlay {
        self.elements.remove(index)
    }

    /// Borrow an element's overlay by position.
    pub fn element(&self, index: usize) -> Option<&Overlay> {
        self.elements.get(index)
    }

    /// Current element overlay count.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// `true` if there are no element overlays.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
