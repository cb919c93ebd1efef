//! Diagnostic navigation paths (`spec.md §4.C`).

use smallvec::SmallVec;

/// One step in a [`Path`]: a bundle field (by name and index) or a list/set
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// A bundle field, identified by name and its fixed schema index.
    Field {
        /// Field name.
        name: String,
        /// Field's position in the bundle's schema.
        index: usize,
    },
    /// A list, tuple, or slot index.
    Index(usize),
}

impl core::fmt::Display for PathElement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PathElement::Field { name, .. } => write!(f, ".{}", name),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A chain of [`PathElement`]s recording how a [`crate::view::View`] was
/// navigated from its root.
///
/// Mainly diagnostic, but REF-aware inputs replay a path against a new
/// target after a reference change, so paths must be cheap to clone and
/// stable across rebind (`spec.md §4.C`).
///
/// Most paths never leave the tree's upper levels, so elements are kept
/// inline up to depth 4 before spilling to the heap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(SmallVec<[PathElement; 4]>);

impl Path {
    /// The empty (root) path.
    pub fn root() -> Self {
        Path(SmallVec::new())
    }

    /// Extend the path with one more element, returning a new `Path`.
    pub fn extended(&self, element: PathElement) -> Self {
        let mut elements = self.0.clone();
        elements.push(element);
        Path(elements)
    }

    /// The path's elements, root-to-leaf.
    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    /// `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "$")?;
        for e in &self.0 {
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}
