//! Solver adapter: a backend-agnostic model plus one blocking solve call.
//!
//! Builders declare variables and constraints on a [`MipModel`]; a
//! [`MipSolver`] consumes it and answers with a [`SolveStatus`] and an
//! [`Assignment`] covering every declared variable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use good_lp::solvers::SolutionStatus;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    constraint, variable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::traits::MipSolver;

/// Termination status reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    /// The time limit expired before any solution was found.
    NotSolved,
    Unbounded,
    Infeasible,
    Undefined,
}

impl SolveStatus {
    /// Whether the assignment that came with this status can be read.
    pub fn is_usable(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveLimits {
    pub time_limit: Duration,
    /// Parallel search threads for backends that support them.
    pub threads: usize,
}

impl SolveLimits {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            time_limit: Duration::from_secs_f64(config.time_limit),
            threads: config.threads,
        }
    }
}

/// Values of the declared variables after a solve.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: HashMap<Variable, f64>,
}

impl Assignment {
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Reads a binary variable, tolerating solver round-off.
    pub fn is_set(&self, var: Variable) -> bool {
        self.value(var) > 0.5
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignment: Assignment,
}

impl SolveOutcome {
    fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            assignment: Assignment::default(),
        }
    }
}

/// Minimization model owned by one formulation for one solve.
pub struct MipModel {
    name: String,
    variables: ProblemVariables,
    declared: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Expression,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: ProblemVariables::new(),
            declared: Vec::new(),
            constraints: Vec::new(),
            objective: Expression::from(0.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, var: Variable) -> Variable {
        self.declared.push(var);
        var
    }

    pub fn add_binary(&mut self, name: String) -> Variable {
        let var = self.variables.add(variable().binary().name(name));
        self.declare(var)
    }

    pub fn add_integer(&mut self, name: String, lower: f64, upper: f64) -> Variable {
        let var = self
            .variables
            .add(variable().integer().min(lower).max(upper).name(name));
        self.declare(var)
    }

    /// Continuous variable with the given bounds; `None` leaves the upper side open.
    pub fn add_continuous(&mut self, name: String, lower: f64, upper: Option<f64>) -> Variable {
        let definition = match upper {
            Some(upper) => variable().min(lower).max(upper),
            None => variable().min(lower),
        };
        let var = self.variables.add(definition.name(name));
        self.declare(var)
    }

    /// Continuous variable pinned to `expression`, so reporting can read
    /// aggregate terms straight from the assignment.
    pub fn add_intermediate(&mut self, name: String, expression: Expression) -> Variable {
        let var = self.variables.add(variable().name(name));
        self.add_constraint(constraint!(var == expression));
        self.declare(var)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn minimise(&mut self, objective: Expression) {
        self.objective = objective;
    }

    pub fn num_variables(&self) -> usize {
        self.declared.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

fn log_start(model: &MipModel, limits: &SolveLimits) {
    debug!(
        model = %model.name,
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        threads = limits.threads,
        time_limit_s = limits.time_limit.as_secs_f64(),
        "solving"
    );
}

fn log_finish(name: &str, outcome: &SolveOutcome, started: Instant) {
    debug!(
        model = %name,
        status = ?outcome.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "solved"
    );
}

fn read_assignment(
    status: SolveStatus,
    declared: &[Variable],
    solution: &impl Solution,
) -> SolveOutcome {
    let values = declared
        .iter()
        .map(|&var| (var, solution.value(var)))
        .collect();
    SolveOutcome {
        status,
        assignment: Assignment { values },
    }
}

fn resolution_failure(name: &str, err: ResolutionError) -> SolveOutcome {
    match err {
        ResolutionError::Infeasible => SolveOutcome::failed(SolveStatus::Infeasible),
        ResolutionError::Unbounded => SolveOutcome::failed(SolveStatus::Unbounded),
        err => {
            warn!(model = %name, "solver error: {}", err);
            SolveOutcome::failed(SolveStatus::Undefined)
        }
    }
}

/// HiGHS backend. The time limit and thread count are handed to HiGHS as
/// options, so the call returns once the limit passes and leaves nothing
/// running behind it.
///
/// An incumbent found before the time limit is not read back: the run
/// reports `NotSolved` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl MipSolver for HighsSolver {
    fn solve(&self, model: MipModel, limits: &SolveLimits) -> SolveOutcome {
        let started = Instant::now();
        log_start(&model, limits);
        let MipModel {
            name,
            variables,
            declared,
            constraints,
            objective,
        } = model;

        let threads = i32::try_from(limits.threads).unwrap_or(i32::MAX);
        let mut problem = variables
            .minimise(objective)
            .using(good_lp::highs)
            .set_option("output_flag", false)
            .set_option("threads", threads)
            .set_option("time_limit", limits.time_limit.as_secs_f64());
        for constraint in constraints {
            problem = problem.with(constraint);
        }

        let outcome = match problem.solve() {
            Ok(solution) => match solution.status() {
                SolutionStatus::Optimal => {
                    read_assignment(SolveStatus::Optimal, &declared, &solution)
                }
                SolutionStatus::TimeLimit => {
                    warn!(model = %name, "time limit of {:?} reached", limits.time_limit);
                    SolveOutcome::failed(SolveStatus::NotSolved)
                }
                _ => read_assignment(SolveStatus::Feasible, &declared, &solution),
            },
            Err(err) => resolution_failure(&name, err),
        };
        log_finish(&name, &outcome, started);
        outcome
    }
}

/// Pure-Rust branch-and-bound backend (`good_lp` + microlp).
///
/// Solves in the calling thread. microlp takes neither a time limit nor a
/// thread count, so `limits` is only logged and the call lasts as long as
/// the search does. Use [`HighsSolver`] when the deadline matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl MipSolver for MicroLpSolver {
    fn solve(&self, model: MipModel, limits: &SolveLimits) -> SolveOutcome {
        let started = Instant::now();
        log_start(&model, limits);
        let MipModel {
            name,
            variables,
            declared,
            constraints,
            objective,
        } = model;

        let mut problem = variables.minimise(objective).using(good_lp::microlp);
        for constraint in constraints {
            problem = problem.with(constraint);
        }

        let outcome = match problem.solve() {
            Ok(solution) => read_assignment(SolveStatus::Optimal, &declared, &solution),
            Err(err) => resolution_failure(&name, err),
        };
        log_finish(&name, &outcome, started);
        outcome
    }
}
