//! Report tables and JSON snapshots of a finished run.
//!
//! The report mirrors the three spreadsheet sheets of a run (summary,
//! per-day, per-order). Snapshots of input, config and output are written
//! next to it so a run can be reloaded later.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::input::{Day, LocationId, OrderId, PlanningInput};
use crate::output::PlanOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub indicator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub day: Day,
    pub route: String,
    pub total_weight: f64,
    pub move_time: f64,
    pub overtime: f64,
    pub overtime_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order: OrderId,
    pub destination: LocationId,
    pub weight: f64,
    pub delivered_day: Option<Day>,
    pub outsourced: bool,
    pub outsourcing_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Vec<SummaryRow>,
    pub daily_info: Vec<DailyRow>,
    pub orders_info: Vec<OrderRow>,
}

impl Report {
    pub fn new(input: &PlanningInput, output: &PlanOutput) -> Self {
        let days = input.days();
        let period = match (days.first(), days.last()) {
            (Some(first), Some(last)) => format!("[{}~{}]", first, last),
            _ => "[]".to_string(),
        };
        let summary = [
            ("planning_period", period),
            ("total_cost", output.total_cost.to_string()),
            ("overtime_cost", output.total_overtime_cost.to_string()),
            ("outsourcing_cost", output.total_outsourcing_cost.to_string()),
            ("total_move_time", output.total_move_time.to_string()),
        ]
        .into_iter()
        .map(|(indicator, value)| SummaryRow {
            indicator: indicator.to_string(),
            value,
        })
        .collect();

        let daily_info = output
            .days
            .iter()
            .map(|(&day, plan)| DailyRow {
                day,
                route: render_route(&plan.route),
                total_weight: plan.total_weight,
                move_time: plan.move_time,
                overtime: plan.overtime,
                overtime_cost: plan.overtime_cost,
            })
            .collect();

        let orders_info = input
            .orders()
            .iter()
            .filter_map(|order| {
                let status = output.orders.get(&order.id)?;
                Some(OrderRow {
                    order: order.id.clone(),
                    destination: order.destination.clone(),
                    weight: order.weight,
                    delivered_day: status.delivered_day,
                    outsourced: status.outsourced,
                    outsourcing_cost: status.outsourcing_cost,
                })
            })
            .collect();

        Self {
            summary,
            daily_info,
            orders_info,
        }
    }
}

/// Renders a route as `P→S1→S2→P`.
pub fn render_route(route: &[LocationId]) -> String {
    route
        .iter()
        .map(|location| location.0.as_str())
        .collect::<Vec<_>>()
        .join("→")
}

/// Directory for a named run under the configured output root.
pub fn run_dir(config: &PlannerConfig, run_name: &str) -> PathBuf {
    config.output_root.join(run_name)
}

/// Writes `input_data.json`, `config.json`, `output_data.json` and
/// `report.json` into `dir`, creating it if needed.
pub fn write_run(
    dir: &Path,
    input: &PlanningInput,
    config: &PlannerConfig,
    output: &PlanOutput,
) -> Result<(), PlanError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("input_data.json"), serde_json::to_string_pretty(input)?)?;
    fs::write(dir.join("config.json"), serde_json::to_string_pretty(config)?)?;
    fs::write(dir.join("output_data.json"), serde_json::to_string_pretty(output)?)?;
    let report = Report::new(input, output);
    fs::write(dir.join("report.json"), serde_json::to_string_pretty(&report)?)?;
    info!(dir = %dir.display(), "run written");
    Ok(())
}
