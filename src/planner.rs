//! Planning pipeline: build the configured formulation, solve it, extract
//! the output.

use tracing::{info, warn};

use crate::arc_model::ArcFormulation;
use crate::config::{ModelType, PlannerConfig};
use crate::error::PlanError;
use crate::input::PlanningInput;
use crate::mip::SolveLimits;
use crate::output::{PlanOutput, extract};
use crate::set_partition::PatternFormulation;
use crate::traits::{Decoder, Formulation, MipSolver};

/// Runs the formulation selected by `config.model_type`.
pub fn plan(
    input: &PlanningInput,
    config: &PlannerConfig,
    solver: &dyn MipSolver,
) -> Result<PlanOutput, PlanError> {
    match config.model_type {
        ModelType::ArcModel => run::<ArcFormulation>(input, config, solver),
        ModelType::PatternModel => run::<PatternFormulation>(input, config, solver),
    }
}

/// Runs one formulation end to end. Any solver status other than
/// `Optimal`/`Feasible` fails the run; there is no retry or partial result.
pub fn run<F: Formulation>(
    input: &PlanningInput,
    config: &PlannerConfig,
    solver: &dyn MipSolver,
) -> Result<PlanOutput, PlanError> {
    config.validate()?;
    info!(
        formulation = F::NAME,
        dataset = %config.dataset_name,
        orders = input.orders().len(),
        days = input.days().len(),
        "planning"
    );

    let (model, decoder) = F::build(input, config, solver)?;
    let outcome = solver.solve(model, &SolveLimits::from_config(config));
    if !outcome.status.is_usable() {
        warn!(formulation = F::NAME, status = ?outcome.status, "optimization did not complete");
        return Err(PlanError::SolverFailure(outcome.status));
    }

    let selections = decoder.decode(&outcome.assignment, input)?;
    let output = extract(&selections, input, config)?;

    info!(
        formulation = F::NAME,
        status = ?outcome.status,
        total_cost = output.total_cost,
        overtime_cost = output.total_overtime_cost,
        outsourcing_cost = output.total_outsourcing_cost,
        move_time = output.total_move_time,
        "plan complete"
    );
    Ok(output)
}
