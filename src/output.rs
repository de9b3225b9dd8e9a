//! Plan output and the aggregation that turns day selections into it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{Day, LocationId, OrderId, PlanningInput};
use crate::matrix::Arc;
use crate::route::reconstruct_route;

/// What a formulation decided for one day: the arcs driven and the orders
/// carried on them.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySelection {
    pub day: Day,
    pub arcs: Vec<Arc>,
    pub orders: Vec<OrderId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    /// Depot first and last, stores in visiting order.
    pub route: Vec<LocationId>,
    pub total_weight: f64,
    pub move_time: f64,
    pub overtime: f64,
    pub overtime_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub delivered_day: Option<Day>,
    pub outsourced: bool,
    pub outsourcing_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub days: BTreeMap<Day, DailyPlan>,
    pub orders: BTreeMap<OrderId, DeliveryStatus>,
    pub total_overtime: f64,
    pub total_overtime_cost: f64,
    pub total_outsourcing_cost: f64,
    pub total_cost: f64,
    pub total_move_time: f64,
}

impl PlanOutput {
    pub fn from_json_str(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn outsourced_orders(&self) -> impl Iterator<Item = &OrderId> {
        self.orders
            .iter()
            .filter(|(_, status)| status.outsourced)
            .map(|(id, _)| id)
    }

    pub fn orders_delivered_on(&self, day: Day) -> impl Iterator<Item = &OrderId> {
        self.orders
            .iter()
            .filter(move |(_, status)| status.delivered_day == Some(day))
            .map(|(id, _)| id)
    }
}

/// Builds the output record for a full horizon.
///
/// Every horizon day gets a plan (days without a selection stay at the
/// depot); every order is either delivered exactly once on a day inside its
/// window whose route visits its store, or outsourced. Any selection that
/// breaks this fails the whole run.
pub fn extract(
    selections: &[DaySelection],
    input: &PlanningInput,
    config: &PlannerConfig,
) -> Result<PlanOutput, PlanError> {
    let horizon = input.days();
    let mut by_day: BTreeMap<Day, &DaySelection> = BTreeMap::new();
    for selection in selections {
        if !horizon.contains(&selection.day) {
            return Err(PlanError::Reconstruction {
                day: selection.day,
                reason: "day is outside the planning horizon".to_string(),
            });
        }
        if by_day.insert(selection.day, selection).is_some() {
            return Err(PlanError::Reconstruction {
                day: selection.day,
                reason: "day selected twice".to_string(),
            });
        }
    }

    let depot = &input.depot().id;
    let mut days = BTreeMap::new();
    let mut delivered: BTreeMap<OrderId, Day> = BTreeMap::new();

    for &day in &horizon {
        let (arcs, orders) = match by_day.get(&day) {
            Some(selection) => (selection.arcs.as_slice(), selection.orders.as_slice()),
            None => (&[] as &[Arc], &[] as &[OrderId]),
        };

        let route = reconstruct_route(day, depot, arcs)?;
        let visited: HashSet<&LocationId> = route.iter().collect();
        let move_time = input.move_times().arcs_time(arcs)?;

        let mut total_weight = 0.0;
        for order_id in orders {
            let order = input.order(order_id).ok_or_else(|| {
                PlanError::InvalidInput(format!("selected unknown order {}", order_id))
            })?;
            if !order.deliverable_on(day) {
                return Err(PlanError::Reconstruction {
                    day,
                    reason: format!("order {} delivered outside its window", order_id),
                });
            }
            if !visited.contains(&order.destination) {
                return Err(PlanError::Reconstruction {
                    day,
                    reason: format!(
                        "order {} carried but {} not visited",
                        order_id, order.destination
                    ),
                });
            }
            if let Some(previous) = delivered.insert(order_id.clone(), day) {
                return Err(PlanError::Reconstruction {
                    day,
                    reason: format!("order {} already delivered on day {}", order_id, previous),
                });
            }
            total_weight += order.weight;
        }

        let overtime = config.overtime_for(move_time);
        days.insert(
            day,
            DailyPlan {
                route,
                total_weight,
                move_time,
                overtime,
                overtime_cost: overtime * config.overtime_cost_per_hour,
            },
        );
    }

    let orders: BTreeMap<OrderId, DeliveryStatus> = input
        .orders()
        .iter()
        .map(|order| {
            let status = match delivered.get(&order.id) {
                Some(&day) => DeliveryStatus {
                    delivered_day: Some(day),
                    outsourced: false,
                    outsourcing_cost: None,
                },
                None => DeliveryStatus {
                    delivered_day: None,
                    outsourced: true,
                    outsourcing_cost: Some(order.weight * config.outsourcing_cost_per_weight),
                },
            };
            (order.id.clone(), status)
        })
        .collect();

    let total_overtime = days.values().map(|plan| plan.overtime).sum();
    let total_overtime_cost: f64 = days.values().map(|plan| plan.overtime_cost).sum();
    let total_move_time = days.values().map(|plan| plan.move_time).sum();
    let total_outsourcing_cost: f64 = orders
        .values()
        .filter_map(|status| status.outsourcing_cost)
        .sum();

    Ok(PlanOutput {
        days,
        orders,
        total_overtime,
        total_overtime_cost,
        total_outsourcing_cost,
        total_cost: total_overtime_cost + total_outsourcing_cost,
        total_move_time,
    })
}
