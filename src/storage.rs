//! Typed particle-quantity storage.
//!
//! The original looks columns up at runtime by a `QuantityId`
//! enum (`storage.getValue<Vector>(QuantityId::POSITION)`); Rust's type
//! system makes that indirection unnecessary, so each quantity is a named,
//! compile-time-checked column instead. The *set* of columns, their
//! lifecycle (lazily-created rigid-body columns, deferred structural
//! removal) and the remove-with-propagation semantics are unchanged.

use crate::math::{Matrix, Vector};

/// An external massive point that exerts gravity but never collides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    /// World position.
    pub position: Vector,
    /// Mass.
    pub mass: f64,
}

/// Particle columns, indexed `0..len()`, all parallel arrays.
///
/// Rigid-body columns (`angular_momentum`, `angular_frequency`,
/// `moment_of_inertia`, `local_frame`) are created lazily by
/// [`Storage::enable_rigid_body`] and are empty otherwise.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    position: Vec<Vector>,
    velocity: Vec<Vector>,
    acceleration: Vec<Vector>,
    radius: Vec<f64>,
    mass: Vec<f64>,
    angular_momentum: Vec<Vector>,
    angular_frequency: Vec<Vector>,
    moment_of_inertia: Vec<Matrix>,
    local_frame: Vec<Matrix>,
    attractors: Vec<Attractor>,
    rigid_body: bool,
}

impl Storage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a particle with zero velocity, acceleration and angular
    /// momentum, returning its index.
    pub fn push(&mut self, position: Vector, radius: f64, mass: f64) -> usize {
        let index = self.position.len();
        self.position.push(position);
        self.velocity.push(Vector::ZERO);
        self.acceleration.push(Vector::ZERO);
        self.radius.push(radius);
        self.mass.push(mass);
        if self.rigid_body {
            self.angular_momentum.push(Vector::ZERO);
            self.angular_frequency.push(Vector::ZERO);
            self.moment_of_inertia
                .push(sphere_inertia(mass, radius));
            self.local_frame.push(Matrix::IDENTITY);
        }
        index
    }

    /// Enables rigid-body columns, backfilling solid-sphere inertia tensors
    /// for every particle already present.
    pub fn enable_rigid_body(&mut self) {
        if self.rigid_body {
            return;
        }
        self.rigid_body = true;
        let n = self.position.len();
        self.angular_momentum = vec![Vector::ZERO; n];
        self.angular_frequency = vec![Vector::ZERO; n];
        self.moment_of_inertia = (0..n)
            .map(|i| sphere_inertia(self.mass[i], self.radius[i]))
            .collect();
        self.local_frame = vec![Matrix::IDENTITY; n];
    }

    /// Whether rigid-body columns are present.
    pub fn has_rigid_body(&self) -> bool {
        self.rigid_body
    }

    /// Number of particles currently stored.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    /// Whether there are no particles.
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn positions(&self) -> &[Vector] {
        &self.position
    }

    pub fn positions_mut(&mut self) -> &mut [Vector] {
        &mut self.position
    }

    pub fn velocities(&self) -> &[Vector] {
        &self.velocity
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector] {
        &mut self.velocity
    }

    pub fn accelerations(&self) -> &[Vector] {
        &self.acceleration
    }

    pub fn accelerations_mut(&mut self) -> &mut [Vector] {
        &mut self.acceleration
    }

    pub fn radii(&self) -> &[f64] {
        &self.radius
    }

    pub fn radii_mut(&mut self) -> &mut [f64] {
        &mut self.radius
    }

    pub fn masses(&self) -> &[f64] {
        &self.mass
    }

    pub fn masses_mut(&mut self) -> &mut [f64] {
        &mut self.mass
    }

    pub fn angular_momenta(&self) -> &[Vector] {
        &self.angular_momentum
    }

    pub fn angular_momenta_mut(&mut self) -> &mut [Vector] {
        &mut self.angular_momentum
    }

    pub fn angular_frequencies(&self) -> &[Vector] {
        &self.angular_frequency
    }

    pub fn angular_frequencies_mut(&mut self) -> &mut [Vector] {
        &mut self.angular_frequency
    }

    pub fn moments_of_inertia(&self) -> &[Matrix] {
        &self.moment_of_inertia
    }

    pub fn moments_of_inertia_mut(&mut self) -> &mut [Matrix] {
        &mut self.moment_of_inertia
    }

    pub fn local_frames(&self) -> &[Matrix] {
        &self.local_frame
    }

    pub fn local_frames_mut(&mut self) -> &mut [Matrix] {
        &mut self.local_frame
    }

    pub fn attractors(&self) -> &[Attractor] {
        &self.attractors
    }

    /// Registers an attractor.
    pub fn add_attractor(&mut self, attractor: Attractor) {
        self.attractors.push(attractor);
    }

    /// Removes the given indices from every column, including dependent
    /// rigid-body columns if present.
    ///
    /// `indices` must be sorted ascending and free of duplicates; this is
    /// `Storage::remove` in the original with the `SORTED` and
    /// `PROPAGATE` flags always applied, since the solver never needs an
    /// unsorted or non-propagating removal.
    pub fn remove(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));

        let mut keep = vec![true; self.len()];
        for &i in indices {
            keep[i] = false;
        }

        retain_by_mask(&mut self.position, &keep);
        retain_by_mask(&mut self.velocity, &keep);
        retain_by_mask(&mut self.acceleration, &keep);
        retain_by_mask(&mut self.radius, &keep);
        retain_by_mask(&mut self.mass, &keep);
        if self.rigid_body {
            retain_by_mask(&mut self.angular_momentum, &keep);
            retain_by_mask(&mut self.angular_frequency, &keep);
            retain_by_mask(&mut self.moment_of_inertia, &keep);
            retain_by_mask(&mut self.local_frame, &keep);
        }
    }

    /// Post-condition check: every column has the same length.
    ///
    /// Mirrors the original's `storage.isValid()`, asserted after every
    /// commit phase.
    pub fn is_valid(&self) -> bool {
        let n = self.position.len();
        let base_ok = self.velocity.len() == n
            && self.acceleration.len() == n
            && self.radius.len() == n
            && self.mass.len() == n;
        if !self.rigid_body {
            return base_ok;
        }
        base_ok
            && self.angular_momentum.len() == n
            && self.angular_frequency.len() == n
            && self.moment_of_inertia.len() == n
            && self.local_frame.len() == n
    }
}

fn retain_by_mask<T>(column: &mut Vec<T>, keep: &[bool]) {
    let mut iter = keep.iter();
    column.retain(|_| *iter.next().unwrap());
}

/// Moment of inertia tensor of a homogeneous solid sphere: `I = 2/5 m r^2`.
pub fn sphere_inertia(mass: f64, radius: f64) -> Matrix {
    Matrix::from_diagonal(Vector::splat(0.4 * mass * radius * radius))
}
