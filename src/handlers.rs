//! [`ContactHandlers`]: pure outcome policies for a resolved pair.
//!
//! Handlers have no mutable state between calls; each is a tagged variant
//! dispatched by a single `match` rather than a dynamically-dispatched
//! trait object.

use crate::config::Config;
use crate::contact::time_of_impact;
use crate::math::Vector;
use crate::storage::{sphere_inertia, Storage};

/// Which outcome policy resolves a trajectory-intersection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionHandler {
    /// Ignore all collisions; the collision sweep does not even run.
    None,
    /// Always merge the colliding pair.
    PerfectMerge,
    /// Reflect relative velocity along the line of centers.
    ElasticBounce,
    /// Merge if the relative speed is below mutual escape velocity and the
    /// post-merge spin would stay below breakup, otherwise bounce.
    MergeOrBounce,
}

/// Which policy resolves an already-interpenetrating pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapHandler {
    /// Ignore overlaps entirely; no events are generated for them.
    None,
    /// Always merge.
    ForceMerge,
    /// Push particles apart along the line of centers until just touching;
    /// may also bounce.
    Repel,
    /// Like [`OverlapHandler::Repel`], but merges instead of separating when
    /// the pair is slow enough to qualify under [`Config::bounce_merge_limit`].
    RepelOrMerge,
    /// Allow the overlap to persist; only bounce if still approaching.
    InternalBounce,
    /// Let particles pass through unless they are slow, in which case merge.
    PassOrMerge,
}

/// What a handler invocation actually did, used both to drive removal and
/// to classify statistics by the handler's real outcome rather than a
/// fixed always-a-bounce default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event turned out not to be real; nothing changed.
    None,
    /// Velocities were changed, no particle removed.
    Bounce,
    /// `j` was merged into `i`; `j` must be removed.
    Merger,
}

/// Resolves a trajectory-intersection event between particles `i` and `j`
/// at the already-rewound contact instant.
pub fn resolve_collision(
    config: &Config,
    storage: &mut Storage,
    i: usize,
    j: usize,
    removed: &mut Vec<usize>,
) -> Outcome {
    match config.collision_handler {
        CollisionHandler::None => Outcome::None,
        CollisionHandler::ElasticBounce => {
            bounce(storage, i, j, config.normal_restitution, config.tangent_restitution);
            Outcome::Bounce
        }
        CollisionHandler::PerfectMerge => {
            merge(storage, i, j, removed);
            Outcome::Merger
        }
        CollisionHandler::MergeOrBounce => {
            if should_merge(config, storage, i, j) {
                merge(storage, i, j, removed);
                Outcome::Merger
            } else {
                bounce(storage, i, j, config.normal_restitution, config.tangent_restitution);
                Outcome::Bounce
            }
        }
    }
}

/// Whether a candidate overlap between `i` and `j` needs to be reported as
/// an event at all, given the configured overlap handler.
pub fn overlap_is_reportable(config: &Config) -> bool {
    config.overlap_handler != OverlapHandler::None
}

/// Resolves an overlap event between particles `i` and `j` at the already
/// rewound contact instant.
pub fn resolve_overlap(
    config: &Config,
    storage: &mut Storage,
    i: usize,
    j: usize,
    removed: &mut Vec<usize>,
) -> Outcome {
    match config.overlap_handler {
        OverlapHandler::None => Outcome::None,
        OverlapHandler::ForceMerge => {
            merge(storage, i, j, removed);
            Outcome::Merger
        }
        OverlapHandler::Repel => {
            separate(storage, i, j);
            if approaching(storage, i, j) {
                bounce(storage, i, j, config.normal_restitution, config.tangent_restitution);
            }
            Outcome::Bounce
        }
        OverlapHandler::RepelOrMerge => {
            if should_merge(config, storage, i, j) {
                merge(storage, i, j, removed);
                Outcome::Merger
            } else {
                separate(storage, i, j);
                if approaching(storage, i, j) {
                    bounce(storage, i, j, config.normal_restitution, config.tangent_restitution);
                }
                Outcome::Bounce
            }
        }
        OverlapHandler::InternalBounce => {
            if approaching(storage, i, j) {
                bounce(storage, i, j, config.normal_restitution, config.tangent_restitution);
                Outcome::Bounce
            } else {
                Outcome::None
            }
        }
        OverlapHandler::PassOrMerge => {
            if approaching(storage, i, j) && is_slow(config, storage, i, j) {
                merge(storage, i, j, removed);
                Outcome::Merger
            } else {
                Outcome::None
            }
        }
    }
}

fn approaching(storage: &Storage, i: usize, j: usize) -> bool {
    let dr = storage.positions()[i] - storage.positions()[j];
    let dv = storage.velocities()[i] - storage.velocities()[j];
    dv.dot(dr) < 0.0
}

/// Mutual escape velocity of the pair at their current separation.
fn escape_velocity(storage: &Storage, i: usize, j: usize) -> f64 {
    const G: f64 = 6.674e-11;
    let dr = (storage.positions()[i] - storage.positions()[j]).length();
    let total_mass = storage.masses()[i] + storage.masses()[j];
    (2.0 * G * total_mass / dr.max(f64::EPSILON)).sqrt()
}

fn is_slow(config: &Config, storage: &Storage, i: usize, j: usize) -> bool {
    let relative_speed = (storage.velocities()[i] - storage.velocities()[j]).length();
    relative_speed <= config.bounce_merge_limit * escape_velocity(storage, i, j)
}

/// Whether merging `i` and `j` satisfies both the relative-speed and
/// post-merge-spin criteria of [`CollisionHandler::MergeOrBounce`] /
/// [`OverlapHandler::RepelOrMerge`].
fn should_merge(config: &Config, storage: &Storage, i: usize, j: usize) -> bool {
    if !is_slow(config, storage, i, j) {
        return false;
    }
    if config.rotation_merge_limit <= 0.0 || !storage.has_rigid_body() {
        return true;
    }
    let merged_spin = merged_angular_frequency(storage, i, j);
    let merged_radius = merged_radius(storage, i, j);
    let merged_mass = storage.masses()[i] + storage.masses()[j];
    let breakup = breakup_frequency(merged_mass, merged_radius);
    merged_spin.length() * config.rotation_merge_limit < breakup
}

/// Angular frequency at which a homogeneous sphere would fly apart under
/// its own spin: `ω_breakup = sqrt(G m / r^3)`.
fn breakup_frequency(mass: f64, radius: f64) -> f64 {
    const G: f64 = 6.674e-11;
    (G * mass / radius.powi(3)).sqrt()
}

fn merged_radius(storage: &Storage, i: usize, j: usize) -> f64 {
    let ri = storage.radii()[i];
    let rj = storage.radii()[j];
    (ri.powi(3) + rj.powi(3)).cbrt()
}

/// Reflects relative velocity along the line of centers with independent
/// normal/tangential restitution coefficients.
fn bounce(storage: &mut Storage, i: usize, j: usize, normal_restitution: f64, tangent_restitution: f64) {
    let dr = storage.positions()[i] - storage.positions()[j];
    let normal = dr.normalize();
    let mi = storage.masses()[i];
    let mj = storage.masses()[j];

    let vi = storage.velocities()[i];
    let vj = storage.velocities()[j];
    let dv = vi - vj;

    let normal_component = dv.dot(normal) * normal;
    let tangent_component = dv - normal_component;

    let new_dv = -normal_restitution * normal_component + tangent_restitution * tangent_component;
    let delta = new_dv - dv;

    // Momentum-conserving impulse split by inverse mass.
    let total_inv_mass = mi.recip() + mj.recip();
    let impulse = delta / total_inv_mass;

    storage.velocities_mut()[i] += impulse / mi;
    storage.velocities_mut()[j] -= impulse / mj;
}

/// Pushes `i` and `j` apart along the line of centers until just touching.
fn separate(storage: &mut Storage, i: usize, j: usize) {
    let dr = storage.positions()[i] - storage.positions()[j];
    let dist = dr.length();
    let contact_distance = storage.radii()[i] + storage.radii()[j];
    if dist >= contact_distance || dist <= f64::EPSILON {
        return;
    }
    let normal = dr / dist;
    let correction = (contact_distance - dist) / 2.0;
    let mi = storage.masses()[i];
    let mj = storage.masses()[j];
    let total_mass = mi + mj;

    storage.positions_mut()[i] += normal * correction * (mj / total_mass) * 2.0;
    storage.positions_mut()[j] -= normal * correction * (mi / total_mass) * 2.0;
}

/// Replaces `i` with the merger of `i` and `j`, marking `j` for removal,
/// conserving momentum and angular momentum.
fn merge(storage: &mut Storage, i: usize, j: usize, removed: &mut Vec<usize>) {
    let mi = storage.masses()[i];
    let mj = storage.masses()[j];
    let total_mass = mi + mj;

    let ri = storage.positions()[i];
    let rj = storage.positions()[j];
    let vi = storage.velocities()[i];
    let vj = storage.velocities()[j];

    let merged_position = (ri * mi + rj * mj) / total_mass;
    let merged_velocity = (vi * mi + vj * mj) / total_mass;
    let merged_radius = merged_radius(storage, i, j);

    let mut merged_angular_momentum = Vector::ZERO;
    if storage.has_rigid_body() {
        merged_angular_momentum = merged_angular_momentum_about(storage, i, j, merged_position);
    }

    storage.positions_mut()[i] = merged_position;
    storage.velocities_mut()[i] = merged_velocity;
    storage.radii_mut()[i] = merged_radius;
    storage.masses_mut()[i] = total_mass;
    debug_assert!((merged_position - ri).is_finite());

    if storage.has_rigid_body() {
        storage.angular_momenta_mut()[i] = merged_angular_momentum;
        storage.moments_of_inertia_mut()[i] = sphere_inertia(total_mass, merged_radius);
        let inertia = storage.moments_of_inertia()[i];
        storage.angular_frequencies_mut()[i] = inertia.inverse() * merged_angular_momentum;
    }

    removed.push(j);
}

/// Spin angular momentum of both particles plus their orbital angular
/// momentum about the new merged center.
fn merged_angular_frequency(storage: &Storage, i: usize, j: usize) -> Vector {
    if !storage.has_rigid_body() {
        return Vector::ZERO;
    }
    let mi = storage.masses()[i];
    let mj = storage.masses()[j];
    let ri = storage.positions()[i];
    let rj = storage.positions()[j];
    let merged_position = (ri * mi + rj * mj) / (mi + mj);
    let l = merged_angular_momentum_about(storage, i, j, merged_position);
    let radius = merged_radius(storage, i, j);
    let inertia = sphere_inertia(mi + mj, radius);
    inertia.inverse() * l
}

fn merged_angular_momentum_about(storage: &Storage, i: usize, j: usize, center: Vector) -> Vector {
    let mi = storage.masses()[i];
    let mj = storage.masses()[j];

    let spin_i = storage.angular_momenta()[i];
    let spin_j = storage.angular_momenta()[j];

    let orbital_i = mi * (storage.positions()[i] - center).cross(storage.velocities()[i]);
    let orbital_j = mj * (storage.positions()[j] - center).cross(storage.velocities()[j]);

    spin_i + spin_j + orbital_i + orbital_j
}

/// Collision-time-safe wrapper kept for callers that only have raw vectors
/// (e.g. unit tests exercising the handler math directly without a full
/// [`Storage`]).
pub fn predict_time_of_impact(
    r1: Vector,
    v1: Vector,
    radius1: f64,
    r2: Vector,
    v2: Vector,
    radius2: f64,
    dt: f64,
) -> Option<f64> {
    time_of_impact(r1, v1, radius1, r2, v2, radius2, dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;

    fn two_body(pos_a: Vector, vel_a: Vector, pos_b: Vector, vel_b: Vector, mass: f64, radius: f64) -> Storage {
        let mut storage = Storage::new();
        storage.push(pos_a, radius, mass);
        storage.push(pos_b, radius, mass);
        storage.velocities_mut()[0] = vel_a;
        storage.velocities_mut()[1] = vel_b;
        storage
    }

    #[test]
    fn perfect_merge_conserves_momentum() {
        let mut storage = two_body(
            Vector::new(2.0, 0.0, 0.0),
            Vector::new(-5.0, 0.0, 0.0),
            Vector::new(-2.0, 0.0, 0.0),
            Vector::new(5.0, 0.0, 0.0),
            2.0,
            1.0,
        );
        let mut removed = Vec::new();
        merge(&mut storage, 0, 1, &mut removed);

        assert_eq!(removed, vec![1]);
        assert!(storage.velocities()[0].length() < 1e-9);
        assert!(storage.positions()[0].length() < 1e-9);
    }

    #[test]
    fn elastic_bounce_swaps_velocities_for_equal_masses() {
        let mut storage = two_body(
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(-5.0, 0.0, 0.0),
            Vector::new(-1.0, 0.0, 0.0),
            Vector::new(5.0, 0.0, 0.0),
            2.0,
            0.5,
        );
        bounce(&mut storage, 0, 1, 1.0, 1.0);

        assert!((storage.velocities()[0].x - 5.0).abs() < 1e-9);
        assert!((storage.velocities()[1].x - -5.0).abs() < 1e-9);
    }

    #[test]
    fn separate_pushes_penetrating_pair_apart_to_contact() {
        let mut storage = two_body(
            Vector::new(0.0, 0.0, 0.0),
            Vector::ZERO,
            Vector::new(0.5, 0.0, 0.0),
            Vector::ZERO,
            1.0,
            1.0,
        );
        separate(&mut storage, 0, 1);

        let dist = (storage.positions()[0] - storage.positions()[1]).length();
        assert!((dist - 2.0).abs() < 1e-9);
    }
}
