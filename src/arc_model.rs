//! Exact arc-based formulation over the whole planning horizon.
//!
//! One routing model per day is stacked into a single MIP: arc variables
//! `x[d,k1,k2]`, visiting-order variables `u[d,k]` for MTZ subtour
//! elimination, delivery flags `y[d,r]` and overtime hours `h[d]`.

use std::collections::HashMap;

use good_lp::{Expression, Variable, constraint};
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{Day, LocationId, OrderId, PlanningInput};
use crate::matrix::Arc;
use crate::mip::{Assignment, MipModel};
use crate::output::DaySelection;
use crate::traits::{Decoder, Formulation, MipSolver};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayArc {
    pub day: Day,
    pub arc: Arc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayOrder {
    pub day: Day,
    pub order: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayLocation {
    pub day: Day,
    pub location: LocationId,
}

pub struct ArcFormulation;

impl Formulation for ArcFormulation {
    type Decoder = ArcDecoder;

    const NAME: &'static str = "arc_model";

    fn build(
        input: &PlanningInput,
        config: &PlannerConfig,
        _solver: &dyn MipSolver,
    ) -> Result<(MipModel, ArcDecoder), PlanError> {
        let mut builder = ArcModelBuilder::new(input, config);
        builder.add_variables();
        builder.add_constraints()?;
        builder.add_objectives()?;
        Ok(builder.finish())
    }
}

struct ArcModelBuilder<'a> {
    input: &'a PlanningInput,
    config: &'a PlannerConfig,
    model: MipModel,
    days: Vec<Day>,
    locations: Vec<LocationId>,
    stores: Vec<LocationId>,
    depot: LocationId,
    x: HashMap<DayArc, Variable>,
    u: HashMap<DayLocation, Variable>,
    y: HashMap<DayOrder, Variable>,
    h: HashMap<Day, Variable>,
}

impl<'a> ArcModelBuilder<'a> {
    fn new(input: &'a PlanningInput, config: &'a PlannerConfig) -> Self {
        Self {
            input,
            config,
            model: MipModel::new(ArcFormulation::NAME),
            days: input.days(),
            locations: input
                .locations()
                .iter()
                .map(|location| location.id.clone())
                .collect(),
            stores: input.store_ids(),
            depot: input.depot().id.clone(),
            x: HashMap::new(),
            u: HashMap::new(),
            y: HashMap::new(),
            h: HashMap::new(),
        }
    }

    /// Ordered pairs of distinct locations.
    fn arcs(&self) -> impl Iterator<Item = Arc> + '_ {
        self.locations.iter().flat_map(move |from| {
            self.locations
                .iter()
                .filter(move |to| *to != from)
                .map(move |to| Arc::new(from.clone(), to.clone()))
        })
    }

    fn x(&self, day: Day, from: &LocationId, to: &LocationId) -> Variable {
        self.x[&DayArc {
            day,
            arc: Arc::new(from.clone(), to.clone()),
        }]
    }

    fn y(&self, day: Day, order: &OrderId) -> Variable {
        self.y[&DayOrder {
            day,
            order: order.clone(),
        }]
    }

    fn inflow(&self, day: Day, location: &LocationId) -> Expression {
        self.locations
            .iter()
            .filter(|other| *other != location)
            .map(|other| self.x(day, other, location))
            .sum()
    }

    fn outflow(&self, day: Day, location: &LocationId) -> Expression {
        self.locations
            .iter()
            .filter(|other| *other != location)
            .map(|other| self.x(day, location, other))
            .sum()
    }

    fn move_time(&self, day: Day) -> Result<Expression, PlanError> {
        let mut total = Expression::from(0.0);
        for arc in self.arcs() {
            let time = self.input.move_times().time(&arc.from, &arc.to)?;
            total += time * self.x(day, &arc.from, &arc.to);
        }
        Ok(total)
    }

    fn add_variables(&mut self) {
        let max_order = (self.locations.len() - 1) as f64;
        let arcs: Vec<Arc> = self.arcs().collect();

        for &day in &self.days {
            for arc in &arcs {
                let var = self
                    .model
                    .add_binary(format!("x_{}_{}_{}", day, arc.from, arc.to));
                self.x.insert(
                    DayArc {
                        day,
                        arc: arc.clone(),
                    },
                    var,
                );
            }

            for location in &self.locations {
                let lower = if *location == self.depot { 0.0 } else { 1.0 };
                let var = self.model.add_integer(
                    format!("u_{}_{}", day, location),
                    lower,
                    max_order.max(lower),
                );
                self.u.insert(
                    DayLocation {
                        day,
                        location: location.clone(),
                    },
                    var,
                );
            }

            for order in self.input.orders() {
                let var = self.model.add_binary(format!("y_{}_{}", day, order.id));
                self.y.insert(
                    DayOrder {
                        day,
                        order: order.id.clone(),
                    },
                    var,
                );
            }

            let var = self
                .model
                .add_continuous(format!("h_{}", day), 0.0, None);
            self.h.insert(day, var);
        }
    }

    fn add_constraints(&mut self) -> Result<(), PlanError> {
        let mut constraints = Vec::new();

        for &day in &self.days {
            for location in &self.locations {
                let inflow = self.inflow(day, location);
                let outflow = self.outflow(day, location);
                constraints.push(constraint!(inflow.clone() == outflow));
                // Applied to the depot too, so each day is a single closed walk.
                constraints.push(constraint!(inflow <= 1.0));
            }

            let depot_order = self.u[&DayLocation {
                day,
                location: self.depot.clone(),
            }];
            constraints.push(constraint!(depot_order == 0.0));

            let big_m = (self.locations.len() - 1) as f64;
            for s1 in &self.stores {
                for s2 in &self.stores {
                    if s1 == s2 {
                        continue;
                    }
                    let u1 = self.u[&DayLocation {
                        day,
                        location: s1.clone(),
                    }];
                    let u2 = self.u[&DayLocation {
                        day,
                        location: s2.clone(),
                    }];
                    let x = self.x(day, s1, s2);
                    constraints.push(constraint!(u1 + 1.0 <= u2 + big_m - big_m * x));
                }
            }

            for order in self.input.orders() {
                let y = self.y(day, &order.id);
                let visits = self.inflow(day, &order.destination);
                constraints.push(constraint!(y <= visits));
                if !order.deliverable_on(day) {
                    constraints.push(constraint!(y == 0.0));
                }
            }

            let h = self.h[&day];
            let move_time = self.move_time(day)?;
            let standard = self.config.standard_work_time;
            constraints.push(constraint!(move_time - standard <= h));
        }

        for order in self.input.orders() {
            let deliveries: Expression = self.days.iter().map(|&day| self.y(day, &order.id)).sum();
            constraints.push(constraint!(deliveries <= 1.0));
        }

        if self.config.truck_capacity_constraint.is_applied {
            let capacity = self.config.truck_capacity;
            for &day in &self.days {
                let load: Expression = self
                    .input
                    .orders()
                    .iter()
                    .map(|order| order.weight * self.y(day, &order.id))
                    .sum();
                constraints.push(constraint!(load <= capacity));
            }
        }

        if self.config.max_overtime_constraint.is_applied {
            let max_overtime = self.config.max_overtime;
            for &day in &self.days {
                let h = self.h[&day];
                constraints.push(constraint!(h <= max_overtime));
            }
        }

        for constraint in constraints {
            self.model.add_constraint(constraint);
        }
        Ok(())
    }

    fn add_objectives(&mut self) -> Result<(), PlanError> {
        let mut objective = Expression::from(0.0);

        if self.config.total_cost_objective.is_applied {
            let overtime: Expression = self.days.iter().map(|day| self.h[day]).sum();
            let overtime_cost = self.model.add_intermediate(
                "total_overtime_cost".to_string(),
                overtime * self.config.overtime_cost_per_hour,
            );

            let mut outsourced_weight = Expression::from(0.0);
            for order in self.input.orders() {
                let deliveries: Expression =
                    self.days.iter().map(|&day| self.y(day, &order.id)).sum();
                outsourced_weight = outsourced_weight + order.weight - deliveries * order.weight;
            }
            let outsourcing_cost = self.model.add_intermediate(
                "total_outsourcing_cost".to_string(),
                outsourced_weight * self.config.outsourcing_cost_per_weight,
            );
            objective += overtime_cost + outsourcing_cost;
        }

        if self.config.total_move_time_objective.is_applied {
            let mut move_time = Expression::from(0.0);
            for &day in &self.days {
                move_time += self.move_time(day)?;
            }
            let total_move_time = self
                .model
                .add_intermediate("total_move_time".to_string(), move_time);
            objective += total_move_time;
        }

        self.model.minimise(objective);
        Ok(())
    }

    fn finish(self) -> (MipModel, ArcDecoder) {
        info!(
            days = self.days.len(),
            variables = self.model.num_variables(),
            constraints = self.model.num_constraints(),
            "arc model built"
        );
        let decoder = ArcDecoder {
            days: self.days,
            x: self.x,
            y: self.y,
        };
        (self.model, decoder)
    }
}

/// Reads selected arcs and delivery flags back per day.
pub struct ArcDecoder {
    days: Vec<Day>,
    x: HashMap<DayArc, Variable>,
    y: HashMap<DayOrder, Variable>,
}

impl Decoder for ArcDecoder {
    fn decode(
        &self,
        assignment: &Assignment,
        input: &PlanningInput,
    ) -> Result<Vec<DaySelection>, PlanError> {
        let mut selections: Vec<DaySelection> = self
            .days
            .iter()
            .map(|&day| DaySelection {
                day,
                arcs: Vec::new(),
                orders: Vec::new(),
            })
            .collect();
        let position: HashMap<Day, usize> = self
            .days
            .iter()
            .enumerate()
            .map(|(index, &day)| (day, index))
            .collect();

        for (key, &var) in &self.x {
            if assignment.is_set(var) {
                selections[position[&key.day]].arcs.push(key.arc.clone());
            }
        }

        for selection in &mut selections {
            selection.arcs.sort();
            for order in input.orders() {
                let key = DayOrder {
                    day: selection.day,
                    order: order.id.clone(),
                };
                if self.y.get(&key).is_some_and(|&var| assignment.is_set(var)) {
                    selection.orders.push(order.id.clone());
                }
            }
            debug!(
                day = selection.day,
                arcs = selection.arcs.len(),
                orders = selection.orders.len(),
                "decoded day"
            );
        }

        Ok(selections)
    }
}
