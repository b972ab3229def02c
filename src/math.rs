//! Shared vector/matrix aliases used throughout the solver.

use glam::DVec3;

/// World-space position, velocity or acceleration.
pub type Vector = DVec3;

/// Orthonormal body-to-world frame, or a symmetric moment-of-inertia tensor.
pub type Matrix = glam::DMat3;

/// Squares a scalar.
#[inline]
pub fn sqr(x: f64) -> f64 {
    x * x
}

/// Returns true if all components of the vector are finite.
#[inline]
pub fn is_finite(v: Vector) -> bool {
    v.is_finite()
}

/// Returns true if the matrix is orthogonal (its columns are orthonormal) within `tol`.
pub fn is_orthogonal(m: Matrix, tol: f64) -> bool {
    let should_be_identity = m.transpose() * m;
    let identity = Matrix::IDENTITY;
    (0..3).all(|c| {
        let col_a = should_be_identity.col(c);
        let col_b = identity.col(c);
        (col_a - col_b).length() < tol
    })
}
