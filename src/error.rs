//! Error types surfaced at solver construction time.
//!
//! Nothing below this layer throws during a step: assertion violations are
//! programmer errors (`debug_assert!`), and transient per-event conditions
//! (stale neighbors, bounce-cap hits, no-op handler results) are silently
//! absorbed by the resolution loop rather than reported as errors.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while constructing or configuring a solver.
#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    /// The configured overlap handler requires a collision handler to be
    /// present (e.g. "repel-or-merge" needs somewhere to send the merge).
    #[error("overlap handler {overlap:?} requires a collision handler, but none is configured")]
    #[diagnostic(help("configure a collision handler or pick an overlap handler that doesn't merge"))]
    ContradictoryHandlers {
        /// The overlap handler that was rejected.
        overlap: crate::handlers::OverlapHandler,
    },

    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
