//! [`SoftSphereStep`]: continuous spring-dashpot contact model.
//!
//! An alternative to [`crate::hard_sphere::HardSphereStep`] for runs where
//! contacts should be resolved as a continuous force rather than an
//! instantaneous event. Grounded on `SoftSphereSolver::integrate` /
//! `::evalCollisions` in `core/gravity/NBodySolver.cpp`: gravity first, then
//! a single parallel pass accumulating spring-dashpot forces from
//! overlapping neighbors directly into each particle's own acceleration
//! slot (no cross-thread writes, so no reduction step is needed here).

use std::f64::consts::PI;

use crate::config::Config;
use crate::gravity::Gravity;
use crate::math::Vector;
use crate::neighbor::NeighborFinder;
use crate::scheduler::Scheduler;
use crate::stats::StepStats;
use crate::storage::Storage;

/// Keplerian two-body orbital period for total mass `mass` and separation
/// `a`, the characteristic time scale a soft-sphere contact is tuned to
/// last a fixed fraction of.
fn orbit_time(mass: f64, a: f64, gravitational_constant: f64) -> f64 {
    let rhs = (gravitational_constant * mass) / (4.0 * PI * PI);
    (a.powi(3) / rhs).sqrt()
}

/// Orchestrates gravity evaluation and continuous spring-dashpot contact
/// forces for one integration step.
pub struct SoftSphereStep<G, N, S> {
    config: Config,
    gravity: G,
    neighbor_finder: N,
    scheduler: S,
    /// `m_eff·π²`, precomputed once from the restitution coefficient so it
    /// is not recomputed per contact.
    h1: f64,
    /// `2π/√(π²/ln²ε + 1)`, the dashpot coefficient's shared factor.
    h2: f64,
}

impl<G: Gravity, N: NeighborFinder + Sync, S: Scheduler> SoftSphereStep<G, N, S> {
    pub fn new(config: Config, gravity: G, neighbor_finder: N, scheduler: S) -> crate::error::Result<Self> {
        config.validate()?;
        let epsilon = config.soft_sphere_restitution;
        let h1 = PI * PI;
        let h2 = 2.0 * PI / ((PI * PI) / epsilon.ln().powi(2) + 1.0).sqrt();
        Ok(Self { config, gravity, neighbor_finder, scheduler, h1, h2 })
    }

    /// Builds gravity and accumulates self- plus attractor-gravity into the
    /// acceleration column (identical shape to
    /// [`crate::hard_sphere::HardSphereStep::integrate`]).
    pub fn integrate(&mut self, storage: &mut Storage, stats: &mut StepStats) {
        let start = std::time::Instant::now();

        self.gravity.build(storage);
        let n = storage.len();
        let mut accelerations = vec![Vector::ZERO; n];
        self.gravity.eval_self_gravity(&self.scheduler, storage, &mut accelerations);
        self.gravity.eval_attractors(storage.attractors(), storage, &mut accelerations);
        storage.accelerations_mut().copy_from_slice(&accelerations);

        stats.gravity_eval_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("gravity evaluated for {n} particles in {:.3}ms", stats.gravity_eval_ms);
    }

    /// Rebuilds the neighbor finder at a single search radius covering
    /// every particle's contact range, then adds spring-dashpot forces from
    /// every overlapping neighbor to each particle's own acceleration.
    pub fn evaluate_contacts(&mut self, storage: &mut Storage, stats: &mut StepStats) {
        puffin::profile_function!();
        let start = std::time::Instant::now();
        let n = storage.len();
        if n == 0 {
            return;
        }

        let search_radius = storage.radii().iter().fold(0.0_f64, |max, &r| max.max(2.0 * r));
        let rank: Vec<usize> = (0..n).collect();
        self.neighbor_finder.build_with_rank(storage.positions(), &rank);

        let positions = storage.positions().to_vec();
        let velocities = storage.velocities().to_vec();
        let radii = storage.radii().to_vec();
        let masses = storage.masses().to_vec();

        let buffers = self.scheduler.for_each_indexed(
            n,
            Vec::new,
            |i, local: &mut Vec<(usize, Vector)>| {
                let mut neighbors = Vec::new();
                self.neighbor_finder.find_all(i, search_radius, &mut neighbors);

                let mut force_accum = Vector::ZERO;
                for &j in &neighbors {
                    if i == j {
                        continue;
                    }
                    let delta = positions[j] - positions[i];
                    let dist = delta.length();
                    if dist >= radii[i] + radii[j] || dist <= 0.0 {
                        continue;
                    }
                    let dir = delta / dist;
                    let alpha = radii[i] + radii[j] - dist;
                    let delta_v = velocities[j] - velocities[i];
                    let alpha_dot = -delta_v.dot(dir);
                    let m_eff = (masses[i] * masses[j]) / (masses[i] + masses[j]);
                    let t_dur = self.config.soft_sphere_spring_constant
                        * orbit_time(masses[i] + masses[j], radii[i] + radii[j], crate::gravity::GRAVITATIONAL_CONSTANT);
                    let k1 = m_eff * self.h1 / (t_dur * t_dur);
                    let k2 = m_eff * self.h2 / t_dur;
                    let force = dir * (k1 * alpha + k2 * alpha_dot);
                    force_accum -= force / masses[i];
                }
                local.push((i, force_accum));
            },
        );

        let accelerations = storage.accelerations_mut();
        for buffer in buffers {
            for (i, contribution) in buffer {
                accelerations[i] += contribution;
            }
        }

        stats.collision_eval_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("soft-sphere contacts evaluated for {n} particles in {:.3}ms", stats.collision_eval_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::BruteForceGravity;
    use crate::neighbor::NaiveNeighborFinder;
    use crate::scheduler::SequentialScheduler;

    fn step(config: Config) -> SoftSphereStep<BruteForceGravity, NaiveNeighborFinder, SequentialScheduler> {
        SoftSphereStep::new(config, BruteForceGravity, NaiveNeighborFinder::default(), SequentialScheduler).unwrap()
    }

    #[test]
    fn overlapping_pair_is_pushed_apart_by_a_repulsive_acceleration() {
        let mut storage = Storage::new();
        storage.push(Vector::new(0.4, 0.0, 0.0), 1.0, 1.0);
        storage.push(Vector::new(-0.4, 0.0, 0.0), 1.0, 1.0);

        let mut solver = step(Config::default());
        let mut stats = StepStats::new();
        solver.evaluate_contacts(&mut storage, &mut stats);

        assert!(storage.accelerations()[0].x > 0.0);
        assert!(storage.accelerations()[1].x < 0.0);
    }

    #[test]
    fn separated_pair_receives_no_contact_force() {
        let mut storage = Storage::new();
        storage.push(Vector::new(5.0, 0.0, 0.0), 1.0, 1.0);
        storage.push(Vector::new(-5.0, 0.0, 0.0), 1.0, 1.0);

        let mut solver = step(Config::default());
        let mut stats = StepStats::new();
        solver.evaluate_contacts(&mut storage, &mut stats);

        assert_eq!(storage.accelerations()[0], Vector::ZERO);
        assert_eq!(storage.accelerations()[1], Vector::ZERO);
    }

    #[test]
    fn approaching_pair_gets_extra_damping_beyond_spring_alone() {
        let mut approaching = Storage::new();
        approaching.push(Vector::new(0.4, 0.0, 0.0), 1.0, 1.0);
        approaching.push(Vector::new(-0.4, 0.0, 0.0), 1.0, 1.0);
        approaching.velocities_mut()[0] = Vector::new(-1.0, 0.0, 0.0);
        approaching.velocities_mut()[1] = Vector::new(1.0, 0.0, 0.0);

        let mut still = Storage::new();
        still.push(Vector::new(0.4, 0.0, 0.0), 1.0, 1.0);
        still.push(Vector::new(-0.4, 0.0, 0.0), 1.0, 1.0);

        let mut solver = step(Config::default());
        let mut stats = StepStats::new();
        solver.evaluate_contacts(&mut approaching, &mut stats);
        let mut solver2 = step(Config::default());
        solver2.evaluate_contacts(&mut still, &mut stats);

        assert!(approaching.accelerations()[0].x > still.accelerations()[0].x);
    }
}
