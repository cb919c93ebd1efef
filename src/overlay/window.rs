//! `TSW` overlay (`spec.md §4.E`): a timestamped ring of scalars, bounded by
//! count or duration.

use std::collections::VecDeque;

use super::OverlayCore;
use crate::ts_meta::WindowBound;
use crate::time::Time;
use crate::value::Scalar;

/// Overlay for a fixed- or duration-bounded window of timestamped scalars.
pub struct WindowOverlay {
    pub(super) core: OverlayCore,
    bound: WindowBound,
    entries: VecDeque<(Time, Scalar)>,
}

impl WindowOverlay {
    /// A fresh, empty window overlay bounded by `bound`.
    pub fn new(bound: WindowBound) -> Self {
        WindowOverlay { core: OverlayCore::new(), bound, entries: VecDeque::new() }
    }

    /// Push a new timestamped value, evicting according to the window's
    /// bound (`spec.md §4.E`: `window_push`).
    pub fn push(&mut self, t: Time, value: Scalar) {
        self.entries.push_back((t, value));
        match self.bound {
            WindowBound::Count(capacity) => {
                while self.entries.len() > capacity.max(1) {
                    self.entries.pop_front();
                }
            }
            WindowBound::Duration { .. } => self.evict_expired(),
        }
        self.core.bump(t);
        self.core.notify(t);
    }

    /// Drop entries older than `newest - range`, never below `min` entries
    /// (`spec.md §4.E`: `window_evict_expired`).
    pub fn evict_expired(&mut self) {
        let WindowBound::Duration { range, min } = self.bound else { return };
        let Some(newest) = self.entries.back().map(|(t, _)| *t) else { return };
        while self.entries.len() > min {
            let Some((oldest, _)) = self.entries.front() else { break };
            if newest.raw().saturating_sub(oldest.raw()) <= range {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Repack the backing storage (a no-op for a `VecDeque`-backed ring but
    /// kept as an explicit operation so `window_compaction: Eager` callers
    /// have something to invoke; `spec.md §6`).
    pub fn compact(&mut self) {
        self.entries.make_contiguous();
    }

    /// Drop every entry, without touching the timestamp.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The oldest retained entry.
    pub fn oldest(&self) -> Option<&(Time, Scalar)> {
        self.entries.front()
    }

    /// The most recently pushed entry.
    pub fn newest(&self) -> Option<&(Time, Scalar)> {
        self.entries.back()
    }

    /// Entries oldest-first.
    pub fn as_slice(&self) -> Vec<&(Time, Scalar)> {
        self.entries.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn count_bounded_window_evicts_oldest() {
        let mut w = WindowOverlay::new(WindowBound::Count(3));
        w.push(Time::new(1), Scalar::Int(10));
        w.push(Time::new(2), Scalar::Int(20));
        w.push(Time::new(3), Scalar::Int(30));
        w.push(Time::new(4), Scalar::Int(40));
        assert_eq!(w.len(), 3);
        assert_eq!(w.oldest().unwrap().1, Scalar::Int(20));
        assert_eq!(w.newest().unwrap().1, Scalar::Int(40));
    }

    #[test]
    fn duration_bounded_window_respects_minimum() {
        let mut w = WindowOverlay::new(WindowBound::Duration { range: 5, min: 1 });
        w.push(Time::new(1), Scalar::Int(1));
        w.push(Time::new(20), Scalar::Int(2));
        assert_eq!(w.len(), 1, "entries older than range must be evicted down to min");
        assert_eq!(w.newest().unwrap().1, Scalar::Int(2));
    }
}
