//! Rebuilds a day's visiting order from an unordered set of selected arcs.

use std::collections::HashMap;

use crate::error::PlanError;
use crate::input::{Day, LocationId};
use crate::matrix::Arc;

/// Walks the successor map from the depot back to the depot.
///
/// The result starts and ends with the depot and lists every other
/// location once. A day without arcs yields `[depot, depot]`. Arcs that
/// are not on the depot's closed walk mean the formulation (or the solver's
/// rounding) broke an invariant, and are reported rather than dropped.
pub fn reconstruct_route(
    day: Day,
    depot: &LocationId,
    arcs: &[Arc],
) -> Result<Vec<LocationId>, PlanError> {
    if arcs.is_empty() {
        return Ok(vec![depot.clone(), depot.clone()]);
    }

    let mut successors: HashMap<&LocationId, &LocationId> = HashMap::with_capacity(arcs.len());
    for arc in arcs {
        if successors.insert(&arc.from, &arc.to).is_some() {
            return Err(PlanError::Reconstruction {
                day,
                reason: format!("{} is left more than once", arc.from),
            });
        }
    }

    let mut route = Vec::with_capacity(arcs.len() + 1);
    route.push(depot.clone());
    let mut current = depot;
    loop {
        let Some(&next) = successors.get(current) else {
            return Err(PlanError::Reconstruction {
                day,
                reason: format!("route stops at {}", current),
            });
        };
        route.push(next.clone());
        if next == depot {
            break;
        }
        if route.len() > arcs.len() {
            return Err(PlanError::Reconstruction {
                day,
                reason: format!("route cycles without returning to {}", depot),
            });
        }
        current = next;
    }

    let used = route.len() - 1;
    if used < arcs.len() {
        return Err(PlanError::Reconstruction {
            day,
            reason: format!("{} arcs are not on the depot tour", arcs.len() - used),
        });
    }

    Ok(route)
}
