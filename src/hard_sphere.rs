//! [`HardSphereStep`]: the main per-step orchestration.
//!
//! Control flow matches `HardSphereSolver::integrate` / `::collide` in
//! `core/gravity/NBodySolver.cpp` one phase at a time: gravity build and
//! evaluation, a parallel initial collision sweep, a strictly serial
//! priority-ordered resolution loop with rewind/un-rewind around each
//! handler call, then a single deferred structural removal.

use std::collections::BTreeSet;

use crate::config::Config;
use crate::contact::{overlap_value, time_of_impact};
use crate::error::Result;
use crate::event::PairEvent;
use crate::event_set::EventSet;
use crate::frame::advance_frames;
use crate::gravity::Gravity;
use crate::handlers::{self, Outcome};
use crate::neighbor::NeighborFinder;
use crate::scheduler::Scheduler;
use crate::stats::StepStats;
use crate::storage::Storage;

/// Margin added past a resolved collision's time so the refinement query
/// does not immediately re-find the event just resolved.
const REWIND_EPSILON: f64 = 1.0e-9;

/// Which neighbor query a [`HardSphereStep`] sweep pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    /// Initial pass: rank-ordered scan over every unordered pair once.
    FindLowerRank,
    /// Refinement pass: reuse the `search_radius` recorded by the initial
    /// pass for particle `i`.
    UseRadii,
}

/// Orchestrates gravity evaluation and predictive collision resolution for
/// one integration step.
pub struct HardSphereStep<G, N, S> {
    config: Config,
    gravity: G,
    neighbor_finder: N,
    scheduler: S,
    /// Upper bound on each particle's travel over the remaining step,
    /// recorded once per step and reused across both sweep passes.
    search_radius: Vec<f64>,
    bounce_count: Vec<u32>,
}

impl<G: Gravity, N: NeighborFinder + Sync, S: Scheduler> HardSphereStep<G, N, S> {
    /// Validates `config` and builds a step ready to run.
    pub fn new(config: Config, gravity: G, neighbor_finder: N, scheduler: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gravity,
            neighbor_finder,
            scheduler,
            search_radius: Vec::new(),
            bounce_count: Vec::new(),
        })
    }

    /// Phase A: builds gravity and accumulates self- plus attractor-gravity
    /// into the acceleration column. Zeroes the radius-derivative slots
    /// (particle radii are not evolved by the time integrator).
    pub fn integrate(&mut self, storage: &mut Storage, stats: &mut StepStats) {
        puffin::profile_function!();
        let start = std::time::Instant::now();

        self.gravity.build(storage);

        debug_assert!(
            storage.accelerations().iter().all(|a| *a == crate::math::Vector::ZERO),
            "accelerations must be zero on entry to HardSphereStep::integrate"
        );

        let n = storage.len();
        let mut accelerations = vec![crate::math::Vector::ZERO; n];
        self.gravity.eval_self_gravity(&self.scheduler, storage, &mut accelerations);
        self.gravity.eval_attractors(storage.attractors(), storage, &mut accelerations);
        storage.accelerations_mut().copy_from_slice(&accelerations);

        stats.gravity_eval_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("gravity evaluated for {n} particles in {:.3}ms", stats.gravity_eval_ms);
    }

    /// Phases B-D: predictive collision sweep, serial priority-ordered
    /// resolution, deferred commit. No-op if no collision handler is
    /// configured.
    pub fn collide(&mut self, storage: &mut Storage, stats: &mut StepStats, dt: f64) {
        puffin::profile_function!();
        if self.config.collision_handler == handlers::CollisionHandler::None {
            return;
        }

        let start = std::time::Instant::now();
        let n = storage.len();

        if self.config.rigid_body {
            advance_frames(storage, dt, self.config.max_rotation_angle);
        }

        // Rank by worst-case travel sphere so `find_lower_rank` visits each
        // unordered pair exactly once. `own_travel[i]` is particle `i`'s own
        // worst-case travel radius; `search_radius` starts at that baseline
        // but is widened during the initial pass below (a lower-ranked
        // neighbor inherits the larger querying particle's travel radius,
        // not just its own).
        let own_travel: Vec<f64> = (0..n)
            .map(|i| storage.radii()[i] + storage.velocities()[i].length() * dt)
            .collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| own_travel[a].partial_cmp(&own_travel[b]).unwrap());
        let mut rank_of = vec![0usize; n];
        for (position, &idx) in order.iter().enumerate() {
            rank_of[idx] = position;
        }
        self.neighbor_finder.build_with_rank(storage.positions(), &rank_of);

        self.bounce_count = vec![0; n];
        self.search_radius = own_travel.clone();

        let mut removed: BTreeSet<usize> = BTreeSet::new();
        let mut events = EventSet::new();

        // Phase B: parallel initial pass. Each worker accumulates into its
        // own scratch buffer; buffers are sorted and reduced into the event
        // set here, on the calling thread, for deterministic insertion
        // order. Every neighbor `j` encountered while querying on behalf of
        // `i` also has its travel radius widened to `own_travel[i]` here,
        // via a `(index, radius)` update folded in with `max` on the calling
        // thread — order-independent, so still deterministic.
        let storage_ref: &Storage = storage;
        let buffers = self.scheduler.for_each_indexed(
            n,
            || (Vec::<PairEvent>::new(), Vec::<(usize, f64)>::new()),
            |i, (events_local, radius_updates): &mut (Vec<PairEvent>, Vec<(usize, f64)>)| {
                let mut neighbors = Vec::new();
                if let Some(event) = find_closest_collision(
                    &self.config,
                    storage_ref,
                    &self.neighbor_finder,
                    &self.search_radius,
                    &self.bounce_count,
                    &removed,
                    i,
                    SearchMode::FindLowerRank,
                    0.0,
                    dt,
                    &mut neighbors,
                ) {
                    events_local.push(event);
                }
                for &j in &neighbors {
                    radius_updates.push((j, own_travel[i]));
                }
            },
        );
        let mut initial_events: Vec<PairEvent> = Vec::new();
        for (events_local, radius_updates) in buffers {
            initial_events.extend(events_local);
            for (j, radius) in radius_updates {
                if radius > self.search_radius[j] {
                    self.search_radius[j] = radius;
                }
            }
        }
        initial_events.sort_by_key(|event| event.key());
        for event in initial_events {
            events.insert(event);
        }

        // Phase C: strictly serial resolution loop.
        let mut neighbors_scratch = Vec::new();
        while let Some(event) = events.top().copied() {
            let t_coll = event.t;
            debug_assert!(t_coll < dt);
            let i = event.i;
            let j = event.j;

            storage.positions_mut()[i] += storage.velocities()[i] * t_coll;
            storage.positions_mut()[j] += storage.velocities()[j] * t_coll;
            debug_assert!(storage.positions()[i].is_finite() && storage.positions()[j].is_finite());

            let is_overlap = event.is_overlap();
            let outcome = if is_overlap {
                let mut removed_now = Vec::new();
                let outcome = handlers::resolve_overlap(&self.config, storage, i, j, &mut removed_now);
                removed.extend(removed_now.iter().copied());
                stats.record(outcome, true);
                outcome
            } else {
                let mut removed_now = Vec::new();
                let outcome = handlers::resolve_collision(&self.config, storage, i, j, &mut removed_now);
                removed.extend(removed_now.iter().copied());
                stats.record(outcome, false);
                outcome
            };

            storage.positions_mut()[i] -= storage.velocities()[i] * t_coll;
            storage.positions_mut()[j] -= storage.velocities()[j] * t_coll;
            debug_assert!(storage.positions()[i].is_finite() && storage.positions()[j].is_finite());

            // An overlap event is always treated as a resolved contact for
            // bookkeeping and control flow, even when the handler itself
            // did nothing (e.g. InternalBounce on a non-approaching pair):
            // only a non-overlap event that turned out not to be real skips
            // invalidation. Statistics still reflect the handler's real
            // outcome via `stats.record` above.
            if outcome == Outcome::None && !is_overlap {
                events.remove(&event);
                continue;
            }

            let mut invalid = BTreeSet::new();
            events.remove_all_with(i, &mut invalid);
            events.remove_all_with(j, &mut invalid);

            self.bounce_count[i] += 1;
            self.bounce_count[j] += 1;

            let lower = t_coll + REWIND_EPSILON;
            if lower < dt {
                for &k in &invalid {
                    if removed.contains(&k) || self.bounce_count[k] > self.config.max_bounces {
                        continue;
                    }
                    neighbors_scratch.clear();
                    if let Some(candidate) = find_closest_collision(
                        &self.config,
                        storage,
                        &self.neighbor_finder,
                        &self.search_radius,
                        &self.bounce_count,
                        &removed,
                        k,
                        SearchMode::UseRadii,
                        lower,
                        dt,
                        &mut neighbors_scratch,
                    ) {
                        if candidate.is_pair(i, j) {
                            continue;
                        }
                        events.insert(candidate);
                    }
                }
            }
        }

        // Phase D: commit.
        if !removed.is_empty() {
            let sorted: Vec<usize> = removed.into_iter().collect();
            storage.remove(&sorted);
        }
        debug_assert!(storage.is_valid());

        stats.collision_eval_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!(
            "step resolved {} collisions ({} mergers, {} bounces, {} overlaps) in {:.3}ms",
            stats.collisions,
            stats.mergers,
            stats.bounces,
            stats.overlaps,
            stats.collision_eval_ms
        );
    }
}

/// Finds the earliest trajectory-intersection event touching particle `i`
/// within `[lower, upper)`, or an immediate overlap event if one is found
/// first and the configured overlap handler cares about overlaps at all
/// (`findClosestCollision` in the original).
#[allow(clippy::too_many_arguments)]
fn find_closest_collision<NF: NeighborFinder>(
    config: &Config,
    storage: &Storage,
    neighbor_finder: &NF,
    search_radius: &[f64],
    bounce_count: &[u32],
    removed: &BTreeSet<usize>,
    i: usize,
    mode: SearchMode,
    lower: f64,
    upper: f64,
    neighbors: &mut Vec<usize>,
) -> Option<PairEvent> {
    neighbors.clear();
    match mode {
        SearchMode::FindLowerRank => {
            neighbor_finder.find_lower_rank(i, 2.0 * search_radius[i], neighbors);
        }
        SearchMode::UseRadii => {
            if search_radius[i] <= 0.0 {
                return None;
            }
            neighbor_finder.find_all(i, 2.0 * search_radius[i], neighbors);
        }
    }

    let mut closest: Option<PairEvent> = None;
    for &j in neighbors.iter() {
        if i == j || removed.contains(&j) {
            continue;
        }
        if bounce_count[j] > config.max_bounces {
            continue;
        }

        let r1 = storage.positions()[i] + storage.velocities()[i] * lower;
        let r2 = storage.positions()[j] + storage.velocities()[j] * lower;
        let overlap = overlap_value(r1, storage.radii()[i], r2, storage.radii()[j]);
        if overlap > crate::math::sqr(config.allowed_overlap) {
            if handlers::overlap_is_reportable(config) {
                return Some(PairEvent::overlap(i, j, lower, overlap));
            }
            continue;
        }

        if let Some(t_rel) = time_of_impact(
            r1,
            storage.velocities()[i],
            storage.radii()[i],
            r2,
            storage.velocities()[j],
            storage.radii()[j],
            upper - lower,
        ) {
            let candidate = PairEvent::collision(i, j, t_rel + lower);
            closest = match closest {
                Some(current) if current.key() <= candidate.key() => Some(current),
                _ => Some(candidate),
            };
        }
    }
    closest
}
