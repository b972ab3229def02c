//! [`advance_frames`]: rigid-body orientation update.
//!
//! `ω` is always *derived* from the conserved angular momentum `L` and the
//! transported inertia tensor, never integrated directly — this is what
//! keeps `L` exactly conserved and eliminates secular drift.

use crate::math::{is_orthogonal, Matrix, Vector};
use crate::storage::Storage;

/// Tolerance for treating a moment-of-inertia tensor as isotropic: all
/// diagonal entries within this of the trace-mean skip sub-stepping
/// entirely, matching the original's `almostEqual(..., 1e-6)`.
const ISOTROPY_TOLERANCE: f64 = 1.0e-6;

/// Advances every particle's orthonormal body frame by `ω·dt`, sub-stepping
/// when the inertia tensor is anisotropic.
///
/// No-op for particles with zero angular momentum and for storages without
/// rigid-body columns enabled.
pub fn advance_frames(storage: &mut Storage, dt: f64, max_angle: f64) {
    if !storage.has_rigid_body() {
        return;
    }

    let n = storage.len();
    debug_assert_eq!(storage.local_frames().len(), n);

    for i in 0..n {
        let l = storage.angular_momenta()[i];
        if l == Vector::ZERO {
            continue;
        }

        let mut frame = storage.local_frames()[i];
        let omega = storage.angular_frequencies()[i];
        let omega_mag = omega.length();
        let dphi = omega_mag * dt;
        let inertia_body = storage.moments_of_inertia()[i];

        debug_assert!(is_orthogonal(frame, 1e-6));

        if is_isotropic(inertia_body) {
            let axis = omega / omega_mag;
            let rotation = Matrix::from_axis_angle(axis, dphi);
            frame = rotation * frame;
            storage.local_frames_mut()[i] = frame;
            continue;
        }

        let mut total_rotated = 0.0;
        let mut omega = omega;
        while total_rotated < dphi {
            let axis = omega / omega.length();
            let step = max_angle.min(dphi - total_rotated);
            let rotation = Matrix::from_axis_angle(axis, step);

            debug_assert!(is_orthogonal(frame, 1e-6));
            frame = rotation * frame;

            let world_inertia = frame * inertia_body * frame.transpose();
            omega = world_inertia.inverse() * l;

            total_rotated += step;
        }

        storage.local_frames_mut()[i] = frame;
        storage.angular_frequencies_mut()[i] = omega;
    }
}

/// A tensor is isotropic if all its diagonal entries are within
/// [`ISOTROPY_TOLERANCE`] of the trace mean. Moment-of-inertia tensors here
/// are always diagonal in the body frame (principal axes), so this simple
/// comparison is equivalent to an eigenvalue check without needing one.
fn is_isotropic(inertia: Matrix) -> bool {
    let trace_mean = (inertia.x_axis.x + inertia.y_axis.y + inertia.z_axis.z) / 3.0;
    (inertia.x_axis.x - trace_mean).abs() < ISOTROPY_TOLERANCE
        && (inertia.y_axis.y - trace_mean).abs() < ISOTROPY_TOLERANCE
        && (inertia.z_axis.z - trace_mean).abs() < ISOTROPY_TOLERANCE
}
