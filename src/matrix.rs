//! Move-time matrix and a coordinate-based provider.
//!
//! The matrix is keyed by ordered location pairs and may be asymmetric.
//! [`EuclideanMoveTime`] derives one from planar coordinates when a dataset
//! carries coordinates but no distance table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::input::{Location, LocationId};
use crate::traits::MoveTimeProvider;

/// Directed connection between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Arc {
    pub from: LocationId,
    pub to: LocationId,
}

impl Arc {
    pub fn new(from: LocationId, to: LocationId) -> Self {
        Self { from, to }
    }
}

/// One row of the distance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveTimeEntry {
    pub from: LocationId,
    pub to: LocationId,
    pub time: f64,
}

/// Travel time (hours) between ordered pairs of locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MoveTimeEntry>", into = "Vec<MoveTimeEntry>")]
pub struct MoveTimeMatrix {
    times: HashMap<Arc, f64>,
}

impl MoveTimeMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the travel time for `from -> to`, replacing any previous value.
    pub fn insert(&mut self, from: LocationId, to: LocationId, time: f64) {
        self.times.insert(Arc::new(from, to), time);
    }

    pub fn get(&self, from: &LocationId, to: &LocationId) -> Option<f64> {
        self.times
            .get(&Arc::new(from.clone(), to.clone()))
            .copied()
    }

    pub fn time(&self, from: &LocationId, to: &LocationId) -> Result<f64, PlanError> {
        self.get(from, to).ok_or_else(|| PlanError::MissingMoveTime {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Total travel time over a set of arcs.
    pub fn arcs_time<'a>(&self, arcs: impl IntoIterator<Item = &'a Arc>) -> Result<f64, PlanError> {
        arcs.into_iter()
            .map(|arc| self.time(&arc.from, &arc.to))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Fails on the first ordered pair of distinct locations without a
    /// non-negative travel time.
    pub fn check_covers(&self, locations: &[Location]) -> Result<(), PlanError> {
        for from in locations {
            for to in locations {
                if from.id == to.id {
                    continue;
                }
                let time = self.time(&from.id, &to.id)?;
                if !time.is_finite() || time < 0.0 {
                    return Err(PlanError::InvalidInput(format!(
                        "move time from {} to {} must be non-negative, got {}",
                        from.id, to.id, time
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<MoveTimeEntry>> for MoveTimeMatrix {
    fn from(entries: Vec<MoveTimeEntry>) -> Self {
        let mut matrix = MoveTimeMatrix::new();
        for entry in entries {
            matrix.insert(entry.from, entry.to, entry.time);
        }
        matrix
    }
}

impl From<MoveTimeMatrix> for Vec<MoveTimeEntry> {
    fn from(matrix: MoveTimeMatrix) -> Self {
        let mut entries: Vec<MoveTimeEntry> = matrix
            .times
            .into_iter()
            .map(|(arc, time)| MoveTimeEntry {
                from: arc.from,
                to: arc.to,
                time,
            })
            .collect();
        entries.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        entries
    }
}

/// Straight-line travel time at a constant speed.
///
/// Ignores the road network. Coordinates and speed share the same length
/// unit, so the resulting times are in hours when speed is per hour.
#[derive(Debug, Clone)]
pub struct EuclideanMoveTime {
    pub speed: f64,
}

impl Default for EuclideanMoveTime {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

impl EuclideanMoveTime {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    fn distance(from: &Location, to: &Location) -> f64 {
        ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt()
    }
}

impl MoveTimeProvider for EuclideanMoveTime {
    fn matrix_for(&self, locations: &[Location]) -> MoveTimeMatrix {
        let mut matrix = MoveTimeMatrix::new();
        for from in locations {
            for to in locations {
                let time = if from.id == to.id {
                    0.0
                } else {
                    Self::distance(from, to) / self.speed
                };
                matrix.insert(from.id.clone(), to.id.clone(), time);
            }
        }
        matrix
    }
}
