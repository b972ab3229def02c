//! Integration scenarios seeded by the collision solver's testable
//! properties: off-center merges, large-population implosion, and
//! long-run free-flywheel angular-momentum conservation.

use hard_sphere_nbody::gravity::BruteForceGravity;
use hard_sphere_nbody::handlers::{CollisionHandler, OverlapHandler};
use hard_sphere_nbody::neighbor::NaiveNeighborFinder;
use hard_sphere_nbody::scheduler::SequentialScheduler;
use hard_sphere_nbody::{Config, HardSphereStep, StepStats, Storage, Vector};

fn solver(config: Config) -> HardSphereStep<BruteForceGravity, NaiveNeighborFinder, SequentialScheduler> {
    HardSphereStep::new(config, BruteForceGravity, NaiveNeighborFinder::default(), SequentialScheduler).unwrap()
}

/// An off-center merge between an equal-mass pair induces spin whose
/// angular momentum matches the orbital angular momentum at contact.
#[test]
fn off_center_merge_induces_spin_matching_orbital_angular_momentum() {
    let config = Config {
        collision_handler: CollisionHandler::PerfectMerge,
        overlap_handler: OverlapHandler::None,
        bounce_merge_limit: 0.0,
        ..Config::default()
    };

    let radius = 1.0;
    let offset = 2.0 * radius - 1.0e-5;
    let mut storage = Storage::new();
    storage.enable_rigid_body();
    storage.push(Vector::new(2.0, offset / 2.0, 0.0), radius, 1.0);
    storage.push(Vector::new(-2.0, -offset / 2.0, 0.0), radius, 1.0);
    storage.velocities_mut()[0] = Vector::new(-5.0, 0.0, 0.0);
    storage.velocities_mut()[1] = Vector::new(5.0, 0.0, 0.0);

    // Orbital angular momentum about the centroid (origin) at contact time,
    // computed from the pre-merge state the same way the handler does.
    let mi = storage.masses()[0];
    let mj = storage.masses()[1];
    let expected_l = mi * storage.positions()[0].cross(storage.velocities()[0])
        + mj * storage.positions()[1].cross(storage.velocities()[1]);

    let mut step = solver(config);
    let mut stats = StepStats::new();
    step.collide(&mut storage, &mut stats, 1.0);

    assert_eq!(storage.len(), 1);
    assert_eq!(stats.mergers, 1);

    let omega = storage.angular_frequencies()[0];
    assert!(omega.length() > 1.0e-9, "merge must induce non-zero spin");

    let inertia = storage.moments_of_inertia()[0];
    let l = inertia * omega;
    let relative_error = (l.length() - expected_l.length()).abs() / expected_l.length();
    assert!(relative_error < 1.0e-6, "relative error {relative_error} too large");
}

/// A cloud of particles falling toward their common centroid eventually
/// merges down to a single particle.
#[test]
fn cloud_implode_merges_down_to_one_particle() {
    let config = Config {
        collision_handler: CollisionHandler::PerfectMerge,
        overlap_handler: OverlapHandler::ForceMerge,
        bounce_merge_limit: 0.0,
        ..Config::default()
    };

    let mut storage = Storage::new();
    // Deterministic "random" points on a unit sphere via a fixed angular
    // spiral, avoiding a dependency on a random number generator for a
    // population that only needs to be spread out, not uniform.
    let n = 100;
    for k in 0..n {
        let t = k as f64 / n as f64;
        let phi = (1.0 - 2.0 * t).acos();
        let theta = std::f64::consts::PI * (1.0 + 5.0_f64.sqrt()) * k as f64;
        let x = phi.sin() * theta.cos();
        let y = phi.sin() * theta.sin();
        let z = phi.cos();
        let position = Vector::new(x, y, z);
        storage.push(position, 0.01, 1.0);
        let idx = storage.len() - 1;
        storage.velocities_mut()[idx] = -5.0 * position;
    }

    let mut step = solver(config);
    let mut stats = StepStats::new();
    let dt = 0.05;
    for _ in 0..200 {
        if storage.len() == 1 {
            break;
        }
        step.integrate(&mut storage, &mut stats);
        for i in 0..storage.len() {
            let a = storage.accelerations()[i];
            storage.velocities_mut()[i] += a * dt;
        }
        for i in 0..storage.len() {
            let v = storage.velocities()[i];
            storage.positions_mut()[i] += v * dt;
        }
        step.collide(&mut storage, &mut stats, dt);
        storage.accelerations_mut().iter_mut().for_each(|a| *a = Vector::ZERO);
    }

    assert_eq!(storage.len(), 1);
}

/// A free flywheel with anisotropic inertia conserves |L|, |omega|, L.omega
/// and the inertia eigenvalues over many steps.
#[test]
fn free_flywheel_conserves_angular_momentum_over_many_steps() {
    use hard_sphere_nbody::frame::advance_frames;
    use hard_sphere_nbody::math::Matrix;

    let inertia = Matrix::from_diagonal(Vector::new(3.0, 3.0, 1.2));
    let omega0 = Vector::new(2.5, -4.0, 9.0);

    let mut storage = Storage::new();
    storage.push(Vector::ZERO, 1.0, 1.0);
    storage.enable_rigid_body();
    storage.moments_of_inertia_mut()[0] = inertia;
    storage.angular_frequencies_mut()[0] = omega0;
    storage.angular_momenta_mut()[0] = inertia * omega0;

    let l0 = storage.angular_momenta()[0];
    let l0_mag = l0.length();
    let omega0_mag = omega0.length();
    let l_dot_omega0 = l0.dot(omega0);

    let dt = 1.0e-5;
    for _ in 0..10_000 {
        advance_frames(&mut storage, dt, 0.05);
    }

    let frame = storage.local_frames()[0];
    let world_inertia = frame * inertia * frame.transpose();
    let omega = storage.angular_frequencies()[0];
    let l = world_inertia * omega;

    assert!((l.length() - l0_mag).abs() / l0_mag < 1.0e-4);
    assert!((omega.length() - omega0_mag).abs() / omega0_mag < 1.0e-4);
    assert!((l.dot(omega) - l_dot_omega0).abs() / l_dot_omega0.abs() < 1.0e-4);

    let eigenvalues = [world_inertia.x_axis.x, world_inertia.y_axis.y, world_inertia.z_axis.z];
    let expected = [3.0, 3.0, 1.2];
    let mut sorted = eigenvalues;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut expected_sorted = expected;
    expected_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for (got, want) in sorted.iter().zip(expected_sorted.iter()) {
        assert!((got - want).abs() / want < 1.0e-4);
    }
}

/// After a step resolving an overlap with the Repel policy, the pair's
/// overlap value no longer exceeds the allowed ratio.
#[test]
fn repel_policy_leaves_no_retained_overlap() {
    let config = Config {
        collision_handler: CollisionHandler::ElasticBounce,
        overlap_handler: OverlapHandler::Repel,
        allowed_overlap: 0.01,
        ..Config::default()
    };

    let mut storage = Storage::new();
    storage.push(Vector::new(0.3, 0.0, 0.0), 1.0, 1.0);
    storage.push(Vector::new(-0.3, 0.0, 0.0), 1.0, 1.0);
    storage.velocities_mut()[0] = Vector::new(-1.0, 0.0, 0.0);
    storage.velocities_mut()[1] = Vector::new(1.0, 0.0, 0.0);

    let mut step = solver(config);
    let mut stats = StepStats::new();
    step.collide(&mut storage, &mut stats, 1.0e-3);

    let dist = (storage.positions()[0] - storage.positions()[1]).length();
    let contact_distance = storage.radii()[0] + storage.radii()[1];
    let overlap = 1.0 - (dist * dist) / (contact_distance * contact_distance);
    assert!(overlap <= 0.01, "overlap {overlap} exceeds allowed ratio");
}
