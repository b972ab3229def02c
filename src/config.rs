//! Configuration keys recognised by the core solver.

use crate::error::{Result, SolverError};
use crate::handlers::{CollisionHandler, OverlapHandler};

/// Tunables for [`crate::hard_sphere::HardSphereStep`] and
/// [`crate::soft_sphere::SoftSphereStep`].
///
/// Defaults mirror the original's `RunSettings` defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which outcome policy resolves a trajectory-intersection event.
    pub collision_handler: CollisionHandler,
    /// Which policy resolves an already-interpenetrating pair.
    pub overlap_handler: OverlapHandler,
    /// Penetration ratio below which a pair is not reported as an overlap.
    pub allowed_overlap: f64,
    /// Cap on per-particle resolved contacts within a single step.
    pub max_bounces: u32,
    /// Coefficient of restitution along the line of centers.
    pub normal_restitution: f64,
    /// Coefficient of restitution perpendicular to the line of centers.
    pub tangent_restitution: f64,
    /// Multiplier of mutual escape velocity used by merge-or-bounce.
    pub bounce_merge_limit: f64,
    /// Multiplier of breakup frequency used by merge-or-bounce.
    pub rotation_merge_limit: f64,
    /// Enables anisotropic rigid-body frame integration.
    pub rigid_body: bool,
    /// Maximum rotation angle per frame-integrator sub-step, in radians.
    pub max_rotation_angle: f64,
    /// Spring-constant multiplier `k_s` for the soft-sphere step.
    pub soft_sphere_spring_constant: f64,
    /// Coefficient of restitution `ε` for the soft-sphere spring-dashpot.
    pub soft_sphere_restitution: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collision_handler: CollisionHandler::PerfectMerge,
            overlap_handler: OverlapHandler::Repel,
            allowed_overlap: 0.01,
            max_bounces: 10,
            normal_restitution: 0.5,
            tangent_restitution: 1.0,
            bounce_merge_limit: 1.0,
            rotation_merge_limit: 1.0,
            rigid_body: false,
            max_rotation_angle: 0.05,
            soft_sphere_spring_constant: 1.0,
            soft_sphere_restitution: 0.1,
        }
    }
}

impl Config {
    /// Checks for contradictory or out-of-range settings.
    ///
    /// Surfaces at construction time, never mid-step.
    pub fn validate(&self) -> Result<()> {
        if self.overlap_handler != OverlapHandler::None && self.collision_handler == CollisionHandler::None
        {
            return Err(SolverError::ContradictoryHandlers {
                overlap: self.overlap_handler,
            });
        }
        if !(0.0..=1.0).contains(&self.allowed_overlap) {
            return Err(SolverError::InvalidConfig(format!(
                "allowed_overlap must be in [0, 1], got {}",
                self.allowed_overlap
            )));
        }
        if !(0.0..=1.0).contains(&self.normal_restitution) {
            return Err(SolverError::InvalidConfig(format!(
                "normal_restitution must be in [0, 1], got {}",
                self.normal_restitution
            )));
        }
        if !(0.0..=1.0).contains(&self.tangent_restitution) {
            return Err(SolverError::InvalidConfig(format!(
                "tangent_restitution must be in [0, 1], got {}",
                self.tangent_restitution
            )));
        }
        if self.max_rotation_angle <= 0.0 {
            return Err(SolverError::InvalidConfig(
                "max_rotation_angle must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
