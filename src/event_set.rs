//! [`EventSet`]: indexed priority container of [`PairEvent`]s.
//!
//! A `BTreeSet` ordered by `(t, -overlap, i, j)` paired with a per-particle
//! index, matching the original's `std::set<CollisionRecord>` +
//! `std::multimap<Size, CollisionRecord>` one-for-one.

use std::collections::{BTreeMap, BTreeSet};

use crate::event::{EventKey, PairEvent};

/// Ordered set of [`PairEvent`]s with a secondary per-particle index.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    events: BTreeMap<EventKey, PairEvent>,
    index: BTreeMap<usize, BTreeSet<EventKey>>,
}

impl EventSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the set holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Inserts an event, deduplicating on its ordering key.
    pub fn insert(&mut self, event: PairEvent) {
        let key = event.key();
        if self.events.insert(key, event).is_some() {
            // Already present under this exact key; index entries are
            // unchanged, nothing more to do.
            return;
        }
        self.index.entry(event.i).or_default().insert(key);
        self.index.entry(event.j).or_default().insert(key);
        debug_assert!(self.check_consistency());
    }

    /// Returns the minimum event without removing it.
    pub fn top(&self) -> Option<&PairEvent> {
        self.events.values().next()
    }

    /// Whether any event currently references `idx`.
    pub fn has(&self, idx: usize) -> bool {
        self.index.get(&idx).is_some_and(|keys| !keys.is_empty())
    }

    /// Removes exactly the given event.
    pub fn remove(&mut self, event: &PairEvent) {
        let key = event.key();
        if self.events.remove(&key).is_none() {
            return;
        }
        Self::remove_from_index(&mut self.index, event.i, key);
        Self::remove_from_index(&mut self.index, event.j, key);
        debug_assert!(self.check_consistency());
    }

    /// Removes every event referencing `idx`, returning the set of
    /// companion indices (the *other* endpoint of each removed event). The
    /// returned set always includes `idx` itself.
    pub fn remove_all_with(&mut self, idx: usize, companions: &mut std::collections::BTreeSet<usize>) {
        companions.insert(idx);
        let Some(keys) = self.index.remove(&idx) else {
            return;
        };
        for key in keys {
            let Some(event) = self.events.remove(&key) else {
                continue;
            };
            let other = event.other(idx);
            companions.insert(other);
            Self::remove_from_index(&mut self.index, other, key);
        }
        debug_assert!(self.check_consistency());
    }

    fn remove_from_index(index: &mut BTreeMap<usize, BTreeSet<EventKey>>, idx: usize, key: EventKey) {
        if let Some(keys) = index.get_mut(&idx) {
            keys.remove(&key);
            if keys.is_empty() {
                index.remove(&idx);
            }
        }
    }

    /// Event-graph consistency: every event appears exactly twice in the
    /// index (once per endpoint), and every index entry points to a live
    /// event. Only run under `debug_assert!`.
    fn check_consistency(&self) -> bool {
        let indexed_total: usize = self.index.values().map(|keys| keys.len()).sum();
        if indexed_total != 2 * self.events.len() {
            return false;
        }
        for event in self.events.values() {
            let key = event.key();
            if !self.index.get(&event.i).is_some_and(|k| k.contains(&key)) {
                return false;
            }
            if !self.index.get(&event.j).is_some_and(|k| k.contains(&key)) {
                return false;
            }
        }
        true
    }
}
