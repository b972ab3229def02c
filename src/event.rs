//! [`PairEvent`]: a predicted contact or overlap between two particles.

use ordered_float::OrderedFloat;

/// A predicted sphere-sphere contact, or an already-present overlap.
///
/// `overlap > 0.0` marks the event as an overlap (penetration already
/// present at `t`); otherwise it is a trajectory-intersection event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvent {
    /// First particle index.
    pub i: usize,
    /// Second particle index.
    pub j: usize,
    /// Sub-step time within `[0, dt)` at which the event occurs.
    pub t: f64,
    /// `1 - |Δr|^2 / (r_i + r_j)^2` evaluated at `t`; positive means overlap.
    pub overlap: f64,
}

impl PairEvent {
    /// Builds a trajectory-intersection event.
    pub fn collision(i: usize, j: usize, t: f64) -> Self {
        Self {
            i,
            j,
            t,
            overlap: 0.0,
        }
    }

    /// Builds an overlap event.
    pub fn overlap(i: usize, j: usize, t: f64, overlap: f64) -> Self {
        Self { i, j, t, overlap }
    }

    /// Whether this event represents an overlap rather than a future contact.
    pub fn is_overlap(&self) -> bool {
        self.overlap > 0.0
    }

    /// The other endpoint of the pair, given one of its two indices.
    pub fn other(&self, idx: usize) -> usize {
        debug_assert!(self.i == idx || self.j == idx);
        if self.i == idx {
            self.j
        } else {
            self.i
        }
    }

    /// Whether this event is exactly the unordered pair `{a, b}`.
    pub fn is_pair(&self, a: usize, b: usize) -> bool {
        (self.i == a && self.j == b) || (self.i == b && self.j == a)
    }

    /// The ordering key used by [`crate::event_set::EventSet`]: ascending
    /// `t`, then descending `overlap` (deeper penetrations first), then
    /// lexicographic on indices.
    pub fn key(&self) -> EventKey {
        EventKey {
            t: OrderedFloat(self.t),
            neg_overlap: OrderedFloat(-self.overlap),
            i: self.i,
            j: self.j,
        }
    }
}

/// Ordering key for a [`PairEvent`]: earliest time first, then deepest overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    t: OrderedFloat<f64>,
    neg_overlap: OrderedFloat<f64>,
    i: usize,
    j: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_time_sorts_first() {
        let a = PairEvent::collision(0, 1, 0.1).key();
        let b = PairEvent::collision(2, 3, 0.2).key();
        assert!(a < b);
    }

    #[test]
    fn deeper_overlap_sorts_first_among_simultaneous() {
        let shallow = PairEvent::overlap(0, 1, 0.1, 0.2).key();
        let deep = PairEvent::overlap(2, 3, 0.1, 0.8).key();
        assert!(deep < shallow);
    }

    #[test]
    fn other_returns_companion_index() {
        let e = PairEvent::collision(3, 7, 0.0);
        assert_eq!(e.other(3), 7);
        assert_eq!(e.other(7), 3);
    }

    #[test]
    fn is_pair_is_order_independent() {
        let e = PairEvent::collision(3, 7, 0.0);
        assert!(e.is_pair(3, 7));
        assert!(e.is_pair(7, 3));
        assert!(!e.is_pair(3, 8));
    }
}
