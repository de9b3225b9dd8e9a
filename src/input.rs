//! Input model: locations, orders, move times and the planning horizon.
//!
//! [`PlanningInput`] is assembled once by a loader and stays read-only for
//! the whole run. Construction validates every invariant the model builders
//! rely on, so the builders themselves never see inconsistent data.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::matrix::MoveTimeMatrix;

/// Delivery day index.
pub type Day = i32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub x: f64,
    pub y: f64,
    pub is_depot: bool,
}

impl Location {
    pub fn depot(id: &str, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            is_depot: true,
        }
    }

    pub fn store(id: &str, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            is_depot: false,
        }
    }
}

/// A parcel for one store, deliverable on any day of `[start_day, end_day]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub destination: LocationId,
    /// Weight in kg.
    pub weight: f64,
    pub start_day: Day,
    pub end_day: Day,
}

impl Order {
    pub fn new(id: &str, destination: &str, weight: f64, start_day: Day, end_day: Day) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            weight,
            start_day,
            end_day,
        }
    }

    pub fn deliverable_on(&self, day: Day) -> bool {
        self.start_day <= day && day <= self.end_day
    }
}

/// Serialized shape of [`PlanningInput`]; deserializing goes through
/// [`PlanningInput::new`] so snapshots are validated like fresh loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningInputData {
    pub locations: Vec<Location>,
    pub orders: Vec<Order>,
    pub move_times: MoveTimeMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PlanningInputData", into = "PlanningInputData")]
pub struct PlanningInput {
    locations: Vec<Location>,
    orders: Vec<Order>,
    move_times: MoveTimeMatrix,
    depot_index: usize,
    order_index: HashMap<OrderId, usize>,
}

impl PlanningInput {
    pub fn new(
        locations: Vec<Location>,
        orders: Vec<Order>,
        move_times: MoveTimeMatrix,
    ) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        for location in &locations {
            if !seen.insert(&location.id) {
                return Err(PlanError::InvalidInput(format!(
                    "duplicate location id {}",
                    location.id
                )));
            }
        }

        let depots: Vec<usize> = locations
            .iter()
            .enumerate()
            .filter(|(_, location)| location.is_depot)
            .map(|(index, _)| index)
            .collect();
        let depot_index = match depots.as_slice() {
            [index] => *index,
            _ => {
                return Err(PlanError::InvalidInput(format!(
                    "exactly one depot required, found {}",
                    depots.len()
                )));
            }
        };

        let stores: HashSet<&LocationId> = locations
            .iter()
            .filter(|location| !location.is_depot)
            .map(|location| &location.id)
            .collect();

        let mut order_index = HashMap::new();
        for (index, order) in orders.iter().enumerate() {
            if order_index.insert(order.id.clone(), index).is_some() {
                return Err(PlanError::InvalidInput(format!(
                    "duplicate order id {}",
                    order.id
                )));
            }
            if !stores.contains(&order.destination) {
                return Err(PlanError::InvalidInput(format!(
                    "order {} targets {}, which is not a known store",
                    order.id, order.destination
                )));
            }
            if order.start_day > order.end_day {
                return Err(PlanError::InvalidInput(format!(
                    "order {} has an empty window [{}, {}]",
                    order.id, order.start_day, order.end_day
                )));
            }
            if !order.weight.is_finite() || order.weight < 0.0 {
                return Err(PlanError::InvalidInput(format!(
                    "order {} has invalid weight {}",
                    order.id, order.weight
                )));
            }
        }

        move_times.check_covers(&locations)?;

        Ok(Self {
            locations,
            orders,
            move_times,
            depot_index,
            order_index,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn depot(&self) -> &Location {
        &self.locations[self.depot_index]
    }

    pub fn stores(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|location| !location.is_depot)
    }

    pub fn store_ids(&self) -> Vec<LocationId> {
        self.stores().map(|store| store.id.clone()).collect()
    }

    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.iter().find(|location| &location.id == id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.order_index.get(id).map(|&index| &self.orders[index])
    }

    pub fn move_times(&self) -> &MoveTimeMatrix {
        &self.move_times
    }

    /// Planning horizon: every day from the earliest window start to the
    /// latest window end. Empty when there are no orders.
    pub fn days(&self) -> Vec<Day> {
        let start = self.orders.iter().map(|order| order.start_day).min();
        let end = self.orders.iter().map(|order| order.end_day).max();
        match (start, end) {
            (Some(start), Some(end)) => (start..=end).collect(),
            _ => Vec::new(),
        }
    }

    /// Orders whose window contains `day`, in input order.
    pub fn orders_on(&self, day: Day) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|order| order.deliverable_on(day))
            .collect()
    }
}

impl TryFrom<PlanningInputData> for PlanningInput {
    type Error = PlanError;

    fn try_from(data: PlanningInputData) -> Result<Self, Self::Error> {
        PlanningInput::new(data.locations, data.orders, data.move_times)
    }
}

impl From<PlanningInput> for PlanningInputData {
    fn from(input: PlanningInput) -> Self {
        Self {
            locations: input.locations,
            orders: input.orders,
            move_times: input.move_times,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::EuclideanMoveTime;
    use crate::traits::MoveTimeProvider;

    fn locations() -> Vec<Location> {
        vec![
            Location::depot("P", 0.0, 0.0),
            Location::store("S1", 1.0, 0.0),
            Location::store("S2", 0.0, 1.0),
        ]
    }

    fn build(locations: Vec<Location>, orders: Vec<Order>) -> Result<PlanningInput, PlanError> {
        let matrix = EuclideanMoveTime::default().matrix_for(&locations);
        PlanningInput::new(locations, orders, matrix)
    }

    #[test]
    fn test_horizon_spans_all_windows() {
        let input = build(
            locations(),
            vec![Order::new("r1", "S1", 10.0, 2, 3), Order::new("r2", "S2", 10.0, 4, 6)],
        )
        .unwrap();
        assert_eq!(input.days(), vec![2, 3, 4, 5, 6]);
        assert_eq!(input.orders_on(3).len(), 1);
        assert!(input.orders_on(7).is_empty());
    }

    #[test]
    fn test_requires_single_depot() {
        let mut two_depots = locations();
        two_depots[1].is_depot = true;
        assert!(matches!(
            build(two_depots, Vec::new()),
            Err(PlanError::InvalidInput(_))
        ));

        let no_depot: Vec<Location> = locations().into_iter().skip(1).collect();
        assert!(matches!(build(no_depot, Vec::new()), Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_order_to_depot() {
        let err = build(locations(), vec![Order::new("r1", "P", 10.0, 1, 1)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let err = build(locations(), vec![Order::new("r1", "S1", 10.0, 3, 1)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_duplicate_order() {
        let orders = vec![Order::new("r1", "S1", 10.0, 1, 1), Order::new("r1", "S2", 5.0, 1, 1)];
        assert!(matches!(build(locations(), orders), Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_move_time_fails_fast() {
        let mut matrix = EuclideanMoveTime::default().matrix_for(&locations()[..2]);
        matrix.insert("P".into(), "S2".into(), 1.0);
        let err = PlanningInput::new(locations(), Vec::new(), matrix).unwrap_err();
        assert!(matches!(err, PlanError::MissingMoveTime { .. }));
    }

    #[test]
    fn test_json_snapshot_round_trips() {
        let input = build(locations(), vec![Order::new("r1", "S1", 12.5, 1, 2)]).unwrap();
        let json = serde_json::to_string(&input).unwrap();
        let restored = PlanningInput::from_json_str(&json).unwrap();
        assert_eq!(restored.locations(), input.locations());
        assert_eq!(restored.orders(), input.orders());
        assert_eq!(restored.move_times(), input.move_times());
        assert_eq!(restored.depot().id, LocationId::from("P"));
    }
}
