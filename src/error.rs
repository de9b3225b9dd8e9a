//! Error taxonomy for a planning run.

use std::fmt;
use std::io;

use crate::input::{Day, LocationId};
use crate::mip::SolveStatus;

#[derive(Debug)]
pub enum PlanError {
    /// Master data violates an input invariant (duplicate ids, unknown destination, ...).
    InvalidInput(String),
    /// A pair of locations used by the model has no travel time.
    MissingMoveTime { from: LocationId, to: LocationId },
    /// Solver terminated with a status other than `Optimal`/`Feasible`.
    SolverFailure(SolveStatus),
    /// Selected arcs do not form a single closed walk through the depot.
    Reconstruction { day: Day, reason: String },
    Config(String),
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            PlanError::MissingMoveTime { from, to } => {
                write!(f, "no move time defined from {} to {}", from, to)
            }
            PlanError::SolverFailure(status) => {
                write!(f, "optimization did not complete: {:?}", status)
            }
            PlanError::Reconstruction { day, reason } => {
                write!(f, "route reconstruction failed on day {}: {}", day, reason)
            }
            PlanError::Config(msg) => write!(f, "invalid config: {}", msg),
            PlanError::Io(err) => write!(f, "io error: {}", err),
            PlanError::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Io(err) => Some(err),
            PlanError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PlanError {
    fn from(err: io::Error) -> Self {
        PlanError::Io(err)
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Json(err)
    }
}
