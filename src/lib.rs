//! # evorun
//!
//! A parallel execution engine for evolutionary algorithms. The engine runs
//! many independent trials of a user-defined evolutionary search across a
//! fixed number of worker units and reports aggregate outcome statistics.
//!
//! The engine does not know what a gene is. A [`Config`] is given the
//! operators that create, score, select, recombine and mutate genes, plus a
//! predicate that decides when a trial has succeeded. [`Config::execute`] then
//! splits the trials across units, runs every unit on its own thread with its
//! own random streams, and merges the per-unit [`Stats`].
//!
//! With the default [`RngMode::Independent`], a run is fully determined by its
//! configuration: the same seed and stream count give the same statistics no
//! matter how the threads are scheduled.
//!
//! ## Modules
//!
//! - [`engine`]: configuration, validation, scheduling and execution
//! - [`context`]: the per-unit state handed to operators
//! - [`operators`]: the operator traits and hook types
//! - [`rng`]: seeded random streams
//! - [`stats`]: outcome statistics and their aggregation
//! - [`selection`]: ready-made selection strategies
//! - [`error`]: error types

pub mod context;
pub mod engine;
pub mod error;
pub mod operators;
pub mod rng;
pub mod selection;
pub mod stats;

pub use context::{BreedEvent, UnitContext};
pub use engine::{CancelHandle, Config, ExecutionOptions};
pub use error::{EvoError, OptionExt, Result, ValidationError};
pub use operators::{
    CrossoverOperator, FitnessOperator, MutationOperator, PopulationFinalizer,
    PopulationInitializer, SelectionOperator, SuccessPredicate,
};
pub use rng::{RandomStream, RngMode};
pub use stats::{Stats, TrialOutcome};
