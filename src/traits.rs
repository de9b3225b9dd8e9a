//! Seams between the planner stages.
//!
//! A run is `build -> solve -> decode -> extract`. The two formulations
//! implement [`Formulation`]; the solver backend implements [`MipSolver`].

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{Location, PlanningInput};
use crate::matrix::MoveTimeMatrix;
use crate::mip::{Assignment, MipModel, SolveLimits, SolveOutcome};
use crate::output::DaySelection;

/// Produces a move-time matrix for a set of locations.
pub trait MoveTimeProvider {
    fn matrix_for(&self, locations: &[Location]) -> MoveTimeMatrix;
}

/// Opaque mixed-integer solver.
///
/// A call blocks until the backend terminates or `limits.time_limit`
/// expires, whichever comes first. It never retries.
pub trait MipSolver: Sync {
    fn solve(&self, model: MipModel, limits: &SolveLimits) -> SolveOutcome;
}

/// A model-building strategy for the whole horizon.
pub trait Formulation {
    type Decoder: Decoder;

    const NAME: &'static str;

    /// Declares variables, constraints and the objective. Any solver work
    /// the formulation needs up front (pattern generation) happens here.
    fn build(
        input: &PlanningInput,
        config: &PlannerConfig,
        solver: &dyn MipSolver,
    ) -> Result<(MipModel, Self::Decoder), PlanError>;
}

/// Reads a solved assignment back into per-day arc and order selections.
pub trait Decoder {
    fn decode(
        &self,
        assignment: &Assignment,
        input: &PlanningInput,
    ) -> Result<Vec<DaySelection>, PlanError>;
}
