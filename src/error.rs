//! # Error Types
//!
//! This module defines the error types returned by the execution engine.
//! Configuration problems are reported through [`ValidationError`] so callers
//! can tell an invalid configuration apart from one that simply has not run yet.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use evorun::error::{EvoError, Result};
//!
//! fn some_function() -> Result<()> {
//!     // Function implementation
//!     Ok(())
//! }
//!
//! fn caller() {
//!     match some_function() {
//!         Ok(_) => println!("Success!"),
//!         Err(e) => println!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use evorun::error::{EvoError, OptionExt, ValidationError};
//!
//! fn first_unit(units: &[usize]) -> evorun::error::Result<usize> {
//!     units.first().copied().ok_or_else_evo(||
//!         EvoError::Validation(ValidationError::MissingAttribute("unit count"))
//!     )
//! }
//! ```

use thiserror::Error;

/// The reason a configuration was rejected by [`Config::execute`](crate::Config::execute).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required numeric attribute is zero or was never set.
    #[error("required attribute `{0}` is not set")]
    MissingAttribute(&'static str),

    /// A required operator was never registered.
    #[error("required operator `{0}` is not registered")]
    MissingOperator(&'static str),

    /// The total trial count cannot be split evenly across units.
    #[error("{trials} trials cannot be divided evenly across {units} units")]
    IndivisibleTrials { trials: usize, units: usize },

    /// Fewer random streams than units were requested.
    #[error("{streams} random streams is fewer than the {units} units")]
    TooFewStreams { streams: usize, units: usize },
}

/// Represents errors that can occur while configuring or executing trials.
#[derive(Error, Debug)]
pub enum EvoError {
    /// The configuration is incomplete or inconsistent. The config stays unused.
    #[error("Configuration error: {0}")]
    Validation(#[from] ValidationError),

    /// The configuration has already been executed once.
    #[error("Configuration has already been used")]
    AlreadyUsed,

    /// A population initializer could not set up the population.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// A selection operator declared a breeding event outside the population.
    #[error("Breeding index {index} is out of range for a population of {population_size}")]
    BreedIndexOutOfRange { index: usize, population_size: usize },

    /// A selection or other operator reported a failure.
    #[error("Operator error: {0}")]
    Operator(String),

    /// A unit stopped because one of its operators failed.
    #[error("Unit {unit} failed: {source}")]
    Unit {
        unit: usize,
        #[source]
        source: Box<EvoError>,
    },

    /// A unit's worker thread panicked.
    #[error("Unit {unit} panicked")]
    WorkerPanicked { unit: usize },

    /// An I/O error, such as failing to spawn a worker thread.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for engine operations.
///
/// ## Examples
///
/// ```rust
/// use evorun::error::Result;
///
/// fn may_fail() -> Result<i32> {
///     Ok(42)
/// }
/// ```
pub type Result<T> = std::result::Result<T, EvoError>;

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, EvoError>` using a closure to
    /// generate the error.
    fn ok_or_else_evo<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> EvoError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_evo<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> EvoError,
    {
        self.ok_or_else(err_fn)
    }
}
