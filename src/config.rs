//! Run configuration: solver limits, cost parameters and model switches.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Which formulation a run builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// One exact arc-based model over the whole horizon.
    ArcModel,
    /// Route patterns per store subset, then set partitioning over days.
    PatternModel,
}

/// Switch for an objective term or an optional constraint. When off, the
/// term or constraint is left out of the model entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub is_applied: bool,
}

impl Toggle {
    pub const ON: Toggle = Toggle { is_applied: true };
    pub const OFF: Toggle = Toggle { is_applied: false };
}

impl Default for Toggle {
    fn default() -> Self {
        Self::ON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Dataset the loader reads; informational for the core.
    pub dataset_name: String,
    pub model_type: ModelType,
    /// Wall-clock limit per solver call, in seconds.
    pub time_limit: f64,
    pub threads: usize,
    /// Regular working hours per day.
    pub standard_work_time: f64,
    /// Overtime hours allowed per day.
    pub max_overtime: f64,
    pub overtime_cost_per_hour: f64,
    pub outsourcing_cost_per_weight: f64,
    /// Truck capacity in kg.
    pub truck_capacity: f64,
    pub total_move_time_objective: Toggle,
    pub total_cost_objective: Toggle,
    pub max_overtime_constraint: Toggle,
    pub truck_capacity_constraint: Toggle,
    /// Root directory for run reports.
    pub output_root: PathBuf,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dataset_name: "small_dataset".to_string(),
            model_type: ModelType::PatternModel,
            time_limit: 10.0,
            threads: 4,
            standard_work_time: 8.0,
            max_overtime: 3.0,
            overtime_cost_per_hour: 3000.0,
            outsourcing_cost_per_weight: 46.0,
            truck_capacity: 4000.0,
            total_move_time_objective: Toggle::ON,
            total_cost_objective: Toggle::ON,
            max_overtime_constraint: Toggle::ON,
            truck_capacity_constraint: Toggle::ON,
            output_root: PathBuf::from("outputs"),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PlanError> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let non_negative = [
            ("time_limit", self.time_limit),
            ("standard_work_time", self.standard_work_time),
            ("max_overtime", self.max_overtime),
            ("overtime_cost_per_hour", self.overtime_cost_per_hour),
            ("outsourcing_cost_per_weight", self.outsourcing_cost_per_weight),
            ("truck_capacity", self.truck_capacity),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.time_limit == 0.0 {
            return Err(PlanError::Config("time_limit must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(PlanError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Longest single-day route a pattern may take, if capped.
    pub fn max_route_duration(&self) -> Option<f64> {
        self.max_overtime_constraint
            .is_applied
            .then(|| self.standard_work_time + self.max_overtime)
    }

    /// Overtime hours for a day with the given travel time.
    pub fn overtime_for(&self, move_time: f64) -> f64 {
        (move_time - self.standard_work_time).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_toggles() {
        let json = r#"{
            "dataset_name": "medium_dataset",
            "model_type": "arc_model",
            "time_limit": 30,
            "threads": 2,
            "truck_capacity_constraint": { "is_applied": false }
        }"#;
        let config = PlannerConfig::from_json_str(json).unwrap();
        assert_eq!(config.dataset_name, "medium_dataset");
        assert_eq!(config.model_type, ModelType::ArcModel);
        assert_eq!(config.threads, 2);
        assert!(!config.truck_capacity_constraint.is_applied);
        assert!(config.max_overtime_constraint.is_applied);
        assert_eq!(config.outsourcing_cost_per_weight, 46.0);
    }

    #[test]
    fn test_rejects_zero_threads() {
        let err = PlannerConfig::from_json_str(r#"{ "threads": 0 }"#).unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[test]
    fn test_rejects_negative_capacity() {
        let err = PlannerConfig::from_json_str(r#"{ "truck_capacity": -1.0 }"#).unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[test]
    fn test_route_duration_cap_follows_toggle() {
        let mut config = PlannerConfig::default();
        assert_eq!(config.max_route_duration(), Some(11.0));
        config.max_overtime_constraint = Toggle::OFF;
        assert_eq!(config.max_route_duration(), None);
    }

    #[test]
    fn test_overtime_is_clamped_at_zero() {
        let config = PlannerConfig::default();
        assert_eq!(config.overtime_for(7.0), 0.0);
        assert_eq!(config.overtime_for(9.5), 1.5);
    }
}
