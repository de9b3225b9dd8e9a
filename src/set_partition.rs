//! Pattern-based formulation: one tour pattern per day, each order either
//! carried by exactly one chosen pattern or outsourced.

use std::collections::{BTreeMap, HashMap};

use good_lp::{Expression, Variable, constraint};
use tracing::info;

use crate::assembler::{DayPattern, PatternAssembler};
use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{Day, OrderId, PlanningInput};
use crate::mip::{Assignment, MipModel};
use crate::output::DaySelection;
use crate::pattern::PatternGenerator;
use crate::traits::{Decoder, Formulation, MipSolver};

pub struct PatternFormulation;

impl Formulation for PatternFormulation {
    type Decoder = SetPartitionDecoder;

    const NAME: &'static str = "pattern_model";

    fn build(
        input: &PlanningInput,
        config: &PlannerConfig,
        solver: &dyn MipSolver,
    ) -> Result<(MipModel, SetPartitionDecoder), PlanError> {
        let memo = PatternGenerator::new(input, config, solver).generate()?;
        let candidates = PatternAssembler::new(input, config, &memo).assemble();
        Ok(build_set_partition(input, config, candidates))
    }
}

/// Builds the day/pattern selection model from assembled candidates.
pub fn build_set_partition(
    input: &PlanningInput,
    config: &PlannerConfig,
    candidates: BTreeMap<Day, Vec<DayPattern>>,
) -> (MipModel, SetPartitionDecoder) {
    let mut model = MipModel::new(PatternFormulation::NAME);

    let mut choices: BTreeMap<Day, Vec<(Variable, DayPattern)>> = BTreeMap::new();
    for (day, patterns) in candidates {
        let vars = patterns
            .into_iter()
            .enumerate()
            .map(|(index, pattern)| (model.add_binary(format!("x_{}_q{}", day, index)), pattern))
            .collect();
        choices.insert(day, vars);
    }

    let outsourced: HashMap<OrderId, Variable> = input
        .orders()
        .iter()
        .map(|order| {
            let var = model.add_continuous(format!("y_{}", order.id), 0.0, Some(1.0));
            (order.id.clone(), var)
        })
        .collect();

    // An empty candidate list leaves `0 == 1` here, which the solver reports.
    for options in choices.values() {
        let chosen: Expression = options.iter().map(|(var, _)| *var).sum();
        model.add_constraint(constraint!(chosen == 1.0));
    }

    let mut coverage: HashMap<&OrderId, Expression> = input
        .orders()
        .iter()
        .map(|order| (&order.id, Expression::from(outsourced[&order.id])))
        .collect();
    for options in choices.values() {
        for (var, pattern) in options {
            for order in &pattern.orders {
                if let Some(expression) = coverage.get_mut(order) {
                    *expression += *var;
                }
            }
        }
    }
    for order in input.orders() {
        if let Some(expression) = coverage.remove(&order.id) {
            model.add_constraint(constraint!(expression == 1.0));
        }
    }

    let mut objective = Expression::from(0.0);
    if config.total_cost_objective.is_applied {
        let overtime: Expression = choices
            .values()
            .flatten()
            .map(|(var, pattern)| *var * pattern.pattern.overtime)
            .sum();
        let overtime_cost = model.add_intermediate(
            "total_overtime_cost".to_string(),
            overtime * config.overtime_cost_per_hour,
        );
        let outsourced_weight: Expression = input
            .orders()
            .iter()
            .map(|order| outsourced[&order.id] * order.weight)
            .sum();
        let outsourcing_cost = model.add_intermediate(
            "total_outsourcing_cost".to_string(),
            outsourced_weight * config.outsourcing_cost_per_weight,
        );
        objective += overtime_cost + outsourcing_cost;
    }
    if config.total_move_time_objective.is_applied {
        let move_time: Expression = choices
            .values()
            .flatten()
            .map(|(var, pattern)| *var * pattern.pattern.move_time)
            .sum();
        objective += model.add_intermediate("total_move_time".to_string(), move_time);
    }
    model.minimise(objective);

    info!(
        days = choices.len(),
        candidates = choices.values().map(Vec::len).sum::<usize>(),
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        "set-partition model built"
    );

    (model, SetPartitionDecoder { choices })
}

/// Maps the chosen pattern of each day back to arcs and carried orders.
pub struct SetPartitionDecoder {
    choices: BTreeMap<Day, Vec<(Variable, DayPattern)>>,
}

impl SetPartitionDecoder {
    pub fn candidate_count(&self, day: Day) -> usize {
        self.choices.get(&day).map_or(0, Vec::len)
    }
}

impl Decoder for SetPartitionDecoder {
    fn decode(
        &self,
        assignment: &Assignment,
        _input: &PlanningInput,
    ) -> Result<Vec<DaySelection>, PlanError> {
        self.choices
            .iter()
            .map(|(&day, options)| {
                let mut chosen = options
                    .iter()
                    .filter(|(var, _)| assignment.is_set(*var))
                    .map(|(_, pattern)| pattern);
                let pattern = match (chosen.next(), chosen.next()) {
                    (Some(pattern), None) => pattern,
                    (None, _) => {
                        return Err(PlanError::Reconstruction {
                            day,
                            reason: "no pattern selected".to_string(),
                        });
                    }
                    (Some(_), Some(_)) => {
                        return Err(PlanError::Reconstruction {
                            day,
                            reason: "more than one pattern selected".to_string(),
                        });
                    }
                };
                Ok(DaySelection {
                    day,
                    arcs: pattern.pattern.arcs.clone(),
                    orders: pattern.orders.clone(),
                })
            })
            .collect()
    }
}
