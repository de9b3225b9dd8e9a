//! Matches each day's deliverable order subsets to generated tours.

use std::collections::BTreeMap;
use std::rc::Rc;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::input::{Day, OrderId, PlanningInput};
use crate::pattern::{Pattern, PatternMemo, StoreSet};

/// A tour on a given day together with the exact orders it carries.
#[derive(Debug, Clone)]
pub struct DayPattern {
    pub day: Day,
    pub pattern: Rc<Pattern>,
    pub orders: Vec<OrderId>,
    pub weight: f64,
}

pub struct PatternAssembler<'a> {
    input: &'a PlanningInput,
    config: &'a PlannerConfig,
    memo: &'a PatternMemo,
}

impl<'a> PatternAssembler<'a> {
    pub fn new(input: &'a PlanningInput, config: &'a PlannerConfig, memo: &'a PatternMemo) -> Self {
        Self {
            input,
            config,
            memo,
        }
    }

    /// Every subset of the orders deliverable on `day` that fits the truck
    /// and whose stores have a tour, smallest subsets first.
    pub fn candidates_for(&self, day: Day) -> Vec<DayPattern> {
        let orders = self.input.orders_on(day);
        let check_capacity = self.config.truck_capacity_constraint.is_applied;

        let mut candidates = Vec::new();
        for subset in orders.into_iter().powerset() {
            let weight: f64 = subset.iter().map(|order| order.weight).sum();
            if check_capacity && weight > self.config.truck_capacity {
                continue;
            }

            let stores = StoreSet::new(subset.iter().map(|order| order.destination.clone()));
            let Some(pattern) = self.memo.get(&stores) else {
                continue;
            };

            candidates.push(DayPattern {
                day,
                pattern: Rc::clone(pattern),
                orders: subset.iter().map(|order| order.id.clone()).collect(),
                weight,
            });
        }
        candidates
    }

    /// Candidates for every horizon day. A day may end up with none; the
    /// set-partition model then becomes infeasible instead of skipping it.
    pub fn assemble(&self) -> BTreeMap<Day, Vec<DayPattern>> {
        self.input
            .days()
            .into_iter()
            .map(|day| {
                let candidates = self.candidates_for(day);
                if candidates.is_empty() {
                    warn!(day, "no pattern candidates");
                } else {
                    debug!(day, candidates = candidates.len(), "day patterns assembled");
                }
                (day, candidates)
            })
            .collect()
    }
}
