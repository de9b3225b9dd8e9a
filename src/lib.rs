//! delivery-planner core
//!
//! Multi-day delivery planning for one depot and one truck: every order is
//! either delivered on a day inside its time window or outsourced, at
//! minimum overtime-plus-outsourcing cost. Two interchangeable MIP
//! formulations (an exact arc model, and route patterns with set
//! partitioning) share one build/solve/extract pipeline.

pub mod error;
pub mod input;
pub mod matrix;
pub mod config;
pub mod traits;
pub mod mip;
pub mod route;
pub mod output;
pub mod arc_model;
pub mod pattern;
pub mod assembler;
pub mod set_partition;
pub mod planner;
pub mod report;

pub use config::{ModelType, PlannerConfig, Toggle};
pub use error::PlanError;
pub use input::{Day, Location, LocationId, Order, OrderId, PlanningInput};
pub use matrix::{Arc, EuclideanMoveTime, MoveTimeMatrix};
pub use mip::{HighsSolver, MicroLpSolver, SolveStatus};
pub use output::PlanOutput;
pub use planner::plan;
