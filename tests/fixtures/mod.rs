//! Test fixtures for delivery-planner.
//!
//! Provides a builder for small depot/store geometries with explicit move
//! times, plus checks every finished plan must pass.

#![allow(dead_code)]

use delivery_planner::traits::MipSolver;
use delivery_planner::{
    HighsSolver, Location, LocationId, MicroLpSolver, ModelType, MoveTimeMatrix, Order,
    PlanOutput, PlannerConfig, PlanningInput,
};

pub const DEPOT: &str = "P";

// ============================================================================
// Scenario Builder
// ============================================================================

/// Builder for a single-depot scenario. Move times are symmetric.
#[derive(Clone, Debug)]
pub struct ScenarioBuilder {
    locations: Vec<Location>,
    matrix: MoveTimeMatrix,
    orders: Vec<Order>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            locations: vec![Location::depot(DEPOT, 0.0, 0.0)],
            matrix: MoveTimeMatrix::new(),
            orders: Vec::new(),
        }
    }

    /// Adds a store `hours` away from the depot.
    pub fn store(mut self, id: &str, hours: f64) -> Self {
        let x = self.locations.len() as f64;
        self.locations.push(Location::store(id, x, 0.0));
        self.link(DEPOT, id, hours)
    }

    pub fn link(mut self, a: &str, b: &str, hours: f64) -> Self {
        self.matrix.insert(a.into(), b.into(), hours);
        self.matrix.insert(b.into(), a.into(), hours);
        self
    }

    pub fn order(
        mut self,
        id: &str,
        destination: &str,
        weight: f64,
        start_day: i32,
        end_day: i32,
    ) -> Self {
        self.orders
            .push(Order::new(id, destination, weight, start_day, end_day));
        self
    }

    pub fn build(self) -> PlanningInput {
        PlanningInput::new(self.locations, self.orders, self.matrix)
            .expect("scenario input should be valid")
    }
}

/// Depot `P` with stores `S1`, `S2`, both 2h away, `s1_s2` hours apart.
pub fn two_stores(s1_s2: f64) -> ScenarioBuilder {
    ScenarioBuilder::new()
        .store("S1", 2.0)
        .store("S2", 2.0)
        .link("S1", "S2", s1_s2)
}

/// Default costs and limits (8h standard, 3h overtime, 4000 kg, 46/kg).
pub fn config(model_type: ModelType) -> PlannerConfig {
    PlannerConfig {
        dataset_name: "scenario".to_string(),
        model_type,
        time_limit: 30.0,
        ..PlannerConfig::default()
    }
}

pub const BOTH_MODELS: [ModelType; 2] = [ModelType::ArcModel, ModelType::PatternModel];

/// Every bundled backend, labelled for assertion messages.
pub const SOLVERS: [(&str, &dyn MipSolver); 2] =
    [("microlp", &MicroLpSolver), ("highs", &HighsSolver)];

// ============================================================================
// Plan Checks
// ============================================================================

const EPS: f64 = 1e-6;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

/// Asserts the properties every plan must have, whatever the formulation.
pub fn assert_plan_valid(input: &PlanningInput, config: &PlannerConfig, output: &PlanOutput) {
    let depot = LocationId::from(DEPOT);

    for order in input.orders() {
        let status = output
            .orders
            .get(&order.id)
            .unwrap_or_else(|| panic!("order {} missing from output", order.id));
        match status.delivered_day {
            Some(day) => {
                assert!(!status.outsourced, "order {} delivered and outsourced", order.id);
                assert!(order.deliverable_on(day), "order {} delivered outside window", order.id);
                let plan = &output.days[&day];
                assert!(
                    plan.route.contains(&order.destination),
                    "route of day {} skips {}",
                    day,
                    order.destination
                );
            }
            None => {
                assert!(status.outsourced, "order {} neither delivered nor outsourced", order.id);
                let cost = status.outsourcing_cost.expect("outsourced order should be costed");
                assert!(approx(cost, order.weight * config.outsourcing_cost_per_weight));
            }
        }
    }

    for (day, plan) in &output.days {
        assert_eq!(plan.route.first(), Some(&depot), "day {} route must start at depot", day);
        assert_eq!(plan.route.last(), Some(&depot), "day {} route must end at depot", day);
        let interior = &plan.route[1..plan.route.len() - 1];
        let mut seen = interior.to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), interior.len(), "day {} revisits a store", day);
        assert!(!interior.contains(&depot), "day {} passes the depot mid-route", day);

        assert!(plan.total_weight <= config.truck_capacity + EPS, "day {} over capacity", day);
        let expected_overtime = (plan.move_time - config.standard_work_time).max(0.0);
        assert!(approx(plan.overtime, expected_overtime), "day {} overtime mismatch", day);
        assert!(plan.overtime <= config.max_overtime + EPS, "day {} over overtime cap", day);
    }

    assert!(approx(
        output.total_cost,
        output.total_overtime_cost + output.total_outsourcing_cost
    ));
}

pub fn ids(items: impl Iterator<Item = impl ToString>) -> Vec<String> {
    let mut ids: Vec<String> = items.map(|id| id.to_string()).collect();
    ids.sort();
    ids
}
