//! # Engine
//!
//! Validation, scheduling and parallel execution of a run. [`Config`] is the
//! entry point; [`options`] holds its numeric attributes and [`schedule`] the
//! static assignment of streams and trials to units.

pub mod config;
mod launcher;
pub mod options;
pub mod schedule;

pub use config::{CancelHandle, Config};
pub use options::{ExecutionOptions, ExecutionOptionsBuilder};
pub use schedule::UnitPlan;
