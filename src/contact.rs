//! [`ContactPredictor`]: closed-form sphere-sphere time-of-impact.

use crate::math::{sqr, Vector};

/// Computes the earliest time `t in [0, dt]` at which two spheres on
/// straight-line trajectories first touch, if any.
///
/// `r1, r2` are centers at `t = 0`, `v1, v2` are (constant) velocities,
/// `radius1 + radius2` is the contact distance.
pub fn time_of_impact(
    r1: Vector,
    v1: Vector,
    radius1: f64,
    r2: Vector,
    v2: Vector,
    radius2: f64,
    dt: f64,
) -> Option<f64> {
    let dr = r1 - r2;
    let dv = v1 - v2;
    let dv_dr = dv.dot(dr);
    if dv_dr >= 0.0 {
        // Not approaching.
        return None;
    }

    let dv2 = dv.length_squared();
    let dr_perp = dr - (dv_dr / dv2) * dv;
    let contact_distance = radius1 + radius2;
    if dr_perp.length_squared() > sqr(contact_distance) {
        // Miss distance exceeds contact.
        return None;
    }

    let det = 1.0 - (dr.length_squared() - sqr(contact_distance)) / sqr(dv_dr) * dv2;
    let sqrt_det = det.max(0.0).sqrt();
    // The (1 - sqrt(det)) branch picks the first crossing; for det > 1 (the
    // spheres already overlap along the approach direction) (1 + sqrt(det))
    // is the physically meaningful root instead. Stable through grazing hits.
    let root = if det > 1.0 { 1.0 + sqrt_det } else { 1.0 - sqrt_det };
    let t = -dv_dr / dv2 * root;
    debug_assert!(t.is_finite() && t >= 0.0);

    if t <= dt {
        Some(t)
    } else {
        None
    }
}

/// Overlap value `1 - |Δr|^2 / (r1+r2)^2` at the given centers; positive
/// means the spheres are already interpenetrating.
pub fn overlap_value(r1: Vector, radius1: f64, r2: Vector, radius2: f64) -> f64 {
    1.0 - (r1 - r2).length_squared() / sqr(radius1 + radius2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_on_approach_finds_contact_time() {
        let r1 = Vector::new(-2.0, 0.0, 0.0);
        let r2 = Vector::new(2.0, 0.0, 0.0);
        let v1 = Vector::new(1.0, 0.0, 0.0);
        let v2 = Vector::new(-1.0, 0.0, 0.0);

        let t = time_of_impact(r1, v1, 0.5, r2, v2, 0.5, 10.0).unwrap();
        // Gap closes from 4.0 to 1.0 (sum of radii) at relative speed 2.0.
        assert!((t - 1.5).abs() < 1e-9);
    }

    #[test]
    fn receding_spheres_report_no_contact() {
        let r1 = Vector::new(-2.0, 0.0, 0.0);
        let r2 = Vector::new(2.0, 0.0, 0.0);
        let v1 = Vector::new(-1.0, 0.0, 0.0);
        let v2 = Vector::new(1.0, 0.0, 0.0);

        assert!(time_of_impact(r1, v1, 0.5, r2, v2, 0.5, 10.0).is_none());
    }

    #[test]
    fn grazing_miss_reports_no_contact() {
        let r1 = Vector::new(-2.0, 1.5 + 1e-5, 0.0);
        let r2 = Vector::new(2.0, 0.0, 0.0);
        let v1 = Vector::new(1.0, 0.0, 0.0);
        let v2 = Vector::new(-1.0, 0.0, 0.0);

        assert!(time_of_impact(r1, v1, 1.0, r2, v2, 0.5, 10.0).is_none());
    }

    #[test]
    fn contact_beyond_window_reports_none() {
        let r1 = Vector::new(-100.0, 0.0, 0.0);
        let r2 = Vector::new(100.0, 0.0, 0.0);
        let v1 = Vector::new(1.0, 0.0, 0.0);
        let v2 = Vector::new(-1.0, 0.0, 0.0);

        assert!(time_of_impact(r1, v1, 0.5, r2, v2, 0.5, 1e-4).is_none());
    }

    #[test]
    fn overlap_value_is_positive_for_penetrating_pair() {
        let r1 = Vector::new(0.0, 0.0, 0.0);
        let r2 = Vector::new(0.5, 0.0, 0.0);
        assert!(overlap_value(r1, 1.0, r2, 1.0) > 0.0);
    }

    #[test]
    fn overlap_value_is_negative_for_separated_pair() {
        let r1 = Vector::new(0.0, 0.0, 0.0);
        let r2 = Vector::new(5.0, 0.0, 0.0);
        assert!(overlap_value(r1, 1.0, r2, 1.0) < 0.0);
    }
}
