//! Route patterns: cheapest closed tours over subsets of stores.
//!
//! Each subset gets its own small TSP model (exact single visit, MTZ
//! subtour elimination, optional duration cap). Subsets are solved level
//! by level, smallest first; tours within one level are independent and run
//! on the rayon pool. Accepted tours are memoized by their store set.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use good_lp::{Expression, Variable, constraint};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{LocationId, PlanningInput};
use crate::matrix::Arc;
use crate::mip::{MipModel, SolveLimits, SolveStatus};
use crate::traits::MipSolver;

/// Order-independent key for a set of stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreSet(Vec<LocationId>);

impl StoreSet {
    pub fn new(stores: impl IntoIterator<Item = LocationId>) -> Self {
        let mut stores: Vec<LocationId> = stores.into_iter().collect();
        stores.sort();
        stores.dedup();
        Self(stores)
    }

    pub fn stores(&self) -> &[LocationId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A closed depot tour visiting exactly the stores of `stores`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub stores: StoreSet,
    pub arcs: Vec<Arc>,
    pub move_time: f64,
    /// Hours beyond the standard work time.
    pub overtime: f64,
}

/// Tours found so far, keyed by store set.
#[derive(Debug, Default)]
pub struct PatternMemo {
    patterns: HashMap<StoreSet, Rc<Pattern>>,
}

impl PatternMemo {
    pub fn get(&self, stores: &StoreSet) -> Option<&Rc<Pattern>> {
        self.patterns.get(stores)
    }

    pub fn insert(&mut self, pattern: Pattern) {
        self.patterns
            .insert(pattern.stores.clone(), Rc::new(pattern));
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

pub struct PatternGenerator<'a> {
    input: &'a PlanningInput,
    config: &'a PlannerConfig,
    solver: &'a dyn MipSolver,
    limits: SolveLimits,
}

impl<'a> PatternGenerator<'a> {
    pub fn new(
        input: &'a PlanningInput,
        config: &'a PlannerConfig,
        solver: &'a dyn MipSolver,
    ) -> Self {
        Self {
            input,
            config,
            solver,
            limits: SolveLimits::from_config(config),
        }
    }

    /// Cheapest tour through the depot and `stores`, or `None` when no tour
    /// fits the duration cap.
    pub fn solve_tour(&self, stores: &StoreSet) -> Result<Option<Pattern>, PlanError> {
        if stores.is_empty() {
            return Ok(Some(self.pattern(stores.clone(), Vec::new(), 0.0)));
        }

        let depot = &self.input.depot().id;
        let nodes: Vec<&LocationId> = std::iter::once(depot).chain(stores.stores()).collect();
        let max_order = (nodes.len() - 1) as f64;

        let mut model = MipModel::new(format!("tsp_{}", stores.len()));
        let mut x: HashMap<(usize, usize), Variable> = HashMap::new();
        let mut move_time = Expression::from(0.0);
        for (i, from) in nodes.iter().enumerate() {
            for (j, to) in nodes.iter().enumerate() {
                if i == j {
                    continue;
                }
                let var = model.add_binary(format!("x_{}_{}", from, to));
                move_time += self.input.move_times().time(from, to)? * var;
                x.insert((i, j), var);
            }
        }
        let u: Vec<Variable> = nodes
            .iter()
            .map(|node| model.add_integer(format!("u_{}", node), 0.0, max_order))
            .collect();

        for i in 0..nodes.len() {
            let others: Vec<usize> = (0..nodes.len()).filter(|&j| j != i).collect();
            let outflow: Expression = others.iter().map(|&j| x[&(i, j)]).sum();
            let inflow: Expression = others.iter().map(|&j| x[&(j, i)]).sum();
            model.add_constraint(constraint!(outflow == 1.0));
            model.add_constraint(constraint!(inflow == 1.0));
        }

        let depot_order = u[0];
        model.add_constraint(constraint!(depot_order == 0.0));
        for i in 1..nodes.len() {
            for j in 1..nodes.len() {
                if i == j {
                    continue;
                }
                let (ui, uj, xij) = (u[i], u[j], x[&(i, j)]);
                model.add_constraint(constraint!(ui + 1.0 <= uj + max_order - max_order * xij));
            }
        }

        if let Some(cap) = self.config.max_route_duration() {
            model.add_constraint(constraint!(move_time.clone() <= cap));
        }
        let total_time = model.add_intermediate("total_time".to_string(), move_time);
        model.minimise(Expression::from(total_time));

        let outcome = self.solver.solve(model, &self.limits);
        match outcome.status {
            status if status.is_usable() => {
                let mut arcs: Vec<Arc> = x
                    .iter()
                    .filter(|(_, var)| outcome.assignment.is_set(**var))
                    .map(|(&(i, j), _)| Arc::new(nodes[i].clone(), nodes[j].clone()))
                    .collect();
                arcs.sort();
                // Recomputed from the matrix so the time carries no solver round-off.
                let time = self.input.move_times().arcs_time(&arcs)?;
                Ok(Some(self.pattern(stores.clone(), arcs, time)))
            }
            SolveStatus::NotSolved => {
                debug!(stores = ?stores.stores(), "tour search hit the time limit");
                Ok(None)
            }
            SolveStatus::Infeasible => Ok(None),
            status => {
                warn!(stores = ?stores.stores(), ?status, "tour search failed, subset dropped");
                Ok(None)
            }
        }
    }

    fn pattern(&self, stores: StoreSet, arcs: Vec<Arc>, move_time: f64) -> Pattern {
        Pattern {
            stores,
            arcs,
            move_time,
            overtime: self.config.overtime_for(move_time),
        }
    }

    /// Store sets some day could need: subsets of the destinations of the
    /// orders deliverable that day.
    fn day_store_sets(&self) -> Vec<BTreeSet<LocationId>> {
        let mut sets: Vec<BTreeSet<LocationId>> = self
            .input
            .days()
            .into_iter()
            .map(|day| {
                self.input
                    .orders_on(day)
                    .into_iter()
                    .map(|order| order.destination.clone())
                    .collect()
            })
            .collect();
        sets.sort();
        sets.dedup();
        sets
    }

    /// Solves every store subset that at least one day can use, smallest
    /// subsets first, and memoizes the feasible tours.
    pub fn generate(&self) -> Result<PatternMemo, PlanError> {
        let day_sets = self.day_store_sets();
        let universe: BTreeSet<LocationId> = day_sets.iter().flatten().cloned().collect();
        let universe: Vec<LocationId> = universe.into_iter().collect();

        let mut memo = PatternMemo::default();
        if let Some(empty) = self.solve_tour(&StoreSet::default())? {
            memo.insert(empty);
        }

        for size in 1..=universe.len() {
            let subsets: Vec<StoreSet> = universe
                .iter()
                .cloned()
                .combinations(size)
                .filter(|subset| {
                    day_sets
                        .iter()
                        .any(|day_set| subset.iter().all(|store| day_set.contains(store)))
                })
                .map(StoreSet::new)
                .collect();
            if subsets.is_empty() {
                break;
            }

            let tours: Vec<Option<Pattern>> = subsets
                .par_iter()
                .map(|stores| self.solve_tour(stores))
                .collect::<Result<_, _>>()?;

            let mut accepted = 0;
            for pattern in tours.into_iter().flatten() {
                memo.insert(pattern);
                accepted += 1;
            }
            debug!(size, candidates = subsets.len(), accepted, "pattern level solved");
        }

        info!(patterns = memo.len(), stores = universe.len(), "patterns generated");
        Ok(memo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Location, Order};
    use crate::matrix::MoveTimeMatrix;
    use crate::mip::{Assignment, MicroLpSolver, SolveOutcome};

    /// Answers every model with the same status and no values.
    struct FixedStatus(SolveStatus);

    impl MipSolver for FixedStatus {
        fn solve(&self, _model: MipModel, _limits: &SolveLimits) -> SolveOutcome {
            SolveOutcome {
                status: self.0,
                assignment: Assignment::default(),
            }
        }
    }

    fn input(s1_s2: f64) -> PlanningInput {
        let locations = vec![
            Location::depot("P", 0.0, 0.0),
            Location::store("S1", 1.0, 0.0),
            Location::store("S2", 0.0, 1.0),
            Location::store("S3", 5.0, 5.0),
        ];
        let mut matrix = MoveTimeMatrix::new();
        let times = [
            ("P", "S1", 2.0),
            ("P", "S2", 2.0),
            ("S1", "S2", s1_s2),
            ("P", "S3", 3.0),
            ("S1", "S3", 3.0),
            ("S2", "S3", 3.0),
        ];
        for (a, b, time) in times {
            matrix.insert(a.into(), b.into(), time);
            matrix.insert(b.into(), a.into(), time);
        }
        let orders = vec![
            Order::new("r1", "S1", 100.0, 1, 1),
            Order::new("r2", "S2", 100.0, 1, 1),
            Order::new("r3", "S3", 100.0, 2, 2),
        ];
        PlanningInput::new(locations, orders, matrix).unwrap()
    }

    fn set(stores: &[&str]) -> StoreSet {
        StoreSet::new(stores.iter().map(|&store| LocationId::from(store)))
    }

    #[test]
    fn test_store_set_ignores_order_and_duplicates() {
        assert_eq!(set(&["S2", "S1", "S2"]), set(&["S1", "S2"]));
        assert_eq!(set(&["S2", "S1"]).len(), 2);
    }

    #[test]
    fn test_single_store_tour() {
        let input = input(3.0);
        let config = PlannerConfig::default();
        let generator = PatternGenerator::new(&input, &config, &MicroLpSolver);

        let pattern = generator.solve_tour(&set(&["S1"])).unwrap().unwrap();
        assert_eq!(pattern.arcs.len(), 2);
        assert_eq!(pattern.move_time, 4.0);
        assert_eq!(pattern.overtime, 0.0);
    }

    #[test]
    fn test_two_store_tour_respects_cap() {
        let input = input(20.0);
        let config = PlannerConfig::default();
        let generator = PatternGenerator::new(&input, &config, &MicroLpSolver);
        assert!(generator.solve_tour(&set(&["S1", "S2"])).unwrap().is_none());

        let mut uncapped = config.clone();
        uncapped.max_overtime_constraint.is_applied = false;
        let generator = PatternGenerator::new(&input, &uncapped, &MicroLpSolver);
        let pattern = generator.solve_tour(&set(&["S1", "S2"])).unwrap().unwrap();
        assert_eq!(pattern.move_time, 24.0);
        assert_eq!(pattern.overtime, 16.0);
    }

    #[test]
    fn test_generate_only_solves_day_reachable_sets() {
        let input = input(3.0);
        let config = PlannerConfig::default();
        let memo = PatternGenerator::new(&input, &config, &MicroLpSolver)
            .generate()
            .unwrap();

        // {}, {S1}, {S2}, {S1,S2}, {S3}; S3 never shares a day with S1 or S2
        assert_eq!(memo.len(), 5);
        let both = memo.get(&set(&["S1", "S2"])).unwrap();
        assert_eq!(both.move_time, 7.0);
        assert!(memo.get(&set(&["S1", "S3"])).is_none());
        assert!(memo.get(&StoreSet::default()).unwrap().arcs.is_empty());
    }

    #[test]
    fn test_failed_tour_search_drops_the_subset() {
        let input = input(3.0);
        let config = PlannerConfig::default();
        for status in [
            SolveStatus::Infeasible,
            SolveStatus::Unbounded,
            SolveStatus::Undefined,
            SolveStatus::NotSolved,
        ] {
            let solver = FixedStatus(status);
            let generator = PatternGenerator::new(&input, &config, &solver);
            assert!(generator.solve_tour(&set(&["S1"])).unwrap().is_none(), "{:?}", status);

            // only the stay-at-depot pattern survives
            let memo = generator.generate().unwrap();
            assert_eq!(memo.len(), 1, "{:?}", status);
            assert!(memo.get(&StoreSet::default()).is_some());
        }
    }
}
