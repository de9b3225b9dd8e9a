//! Run snapshots written by `report::write_run` reload as the same run.

mod fixtures;

use std::fs;

use delivery_planner::report::{Report, write_run};
use delivery_planner::{HighsSolver, ModelType, PlanOutput, PlannerConfig, PlanningInput, plan};
use tempfile::TempDir;

use fixtures::*;

#[test]
fn test_write_run_snapshots_reload() {
    let input = two_stores(20.0)
        .order("r1", "S1", 100.0, 1, 1)
        .order("r2", "S2", 100.0, 1, 1)
        .build();
    let config = config(ModelType::PatternModel);
    let output = plan(&input, &config, &HighsSolver).expect("plan should succeed");

    let dir = TempDir::new().unwrap();
    let run = dir.path().join("pattern_run");
    write_run(&run, &input, &config, &output).unwrap();

    for file in ["input_data.json", "config.json", "output_data.json", "report.json"] {
        assert!(run.join(file).exists(), "{} not written", file);
    }

    let json = fs::read_to_string(run.join("input_data.json")).unwrap();
    let restored_input = PlanningInput::from_json_str(&json).unwrap();
    assert_eq!(restored_input.orders(), input.orders());
    assert_eq!(restored_input.move_times(), input.move_times());

    let restored_config = PlannerConfig::from_json_file(run.join("config.json")).unwrap();
    assert_eq!(restored_config.model_type, ModelType::PatternModel);
    assert_eq!(restored_config.time_limit, config.time_limit);

    let json = fs::read_to_string(run.join("output_data.json")).unwrap();
    let restored_output = PlanOutput::from_json_str(&json).unwrap();
    assert_eq!(restored_output, output);
}

#[test]
fn test_report_tables() {
    let input = two_stores(3.0)
        .order("r1", "S1", 100.0, 1, 2)
        .order("r2", "S2", 5000.0, 2, 2)
        .build();
    let config = config(ModelType::ArcModel);
    let output = plan(&input, &config, &HighsSolver).expect("plan should succeed");

    let report = Report::new(&input, &output);

    let period = report
        .summary
        .iter()
        .find(|row| row.indicator == "planning_period")
        .unwrap();
    assert_eq!(period.value, "[1~2]");
    assert_eq!(report.daily_info.len(), 2);
    assert_eq!(report.orders_info.len(), 2);

    // r2 is over capacity on its own
    let r2 = report.orders_info.iter().find(|row| row.order.0 == "r2").unwrap();
    assert!(r2.outsourced);
    assert!(approx(r2.outsourcing_cost.unwrap(), 5000.0 * 46.0));

    let r1 = report.orders_info.iter().find(|row| row.order.0 == "r1").unwrap();
    let day = r1.delivered_day.unwrap();
    let row = report.daily_info.iter().find(|row| row.day == day).unwrap();
    assert!(row.route == "P→S1→P", "unexpected route {}", row.route);
}
