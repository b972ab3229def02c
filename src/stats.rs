//! Statistics sink.
//!
//! A plain counters-and-timings struct, filled in from each handler's
//! actual return value rather than a hardcoded branch, so a
//! `MergeOrBounce` handler that happened to bounce every pair this step
//! is reported honestly as all-bounces.

/// Per-step counters and timings produced by [`crate::hard_sphere::HardSphereStep`]
/// and [`crate::soft_sphere::SoftSphereStep`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Trajectory-intersection events resolved this step (bounce + merger).
    pub collisions: u32,
    /// Events resolved as a merger.
    pub mergers: u32,
    /// Events resolved as a bounce.
    pub bounces: u32,
    /// Overlap events resolved (any outcome).
    pub overlaps: u32,
    /// Wall-clock time spent in gravity evaluation this step, in milliseconds.
    pub gravity_eval_ms: f64,
    /// Wall-clock time spent in collision detection and resolution this
    /// step, in milliseconds.
    pub collision_eval_ms: f64,
}

impl StepStats {
    /// A fresh, all-zero set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an [`crate::handlers::Outcome`] against the appropriate
    /// counter; `is_overlap` distinguishes an overlap event from a
    /// trajectory-intersection event for the purposes of the `overlaps`
    /// counter.
    pub fn record(&mut self, outcome: crate::handlers::Outcome, is_overlap: bool) {
        use crate::handlers::Outcome;
        match outcome {
            Outcome::None => {}
            Outcome::Bounce => {
                if is_overlap {
                    self.overlaps += 1;
                } else {
                    self.collisions += 1;
                    self.bounces += 1;
                }
            }
            Outcome::Merger => {
                if is_overlap {
                    self.overlaps += 1;
                } else {
                    self.collisions += 1;
                }
                self.mergers += 1;
            }
        }
    }
}
