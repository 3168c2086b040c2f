//! # ExecutionOptions
//!
//! The numeric attributes of a run: how many units execute in parallel, how
//! many trials they share, how long a trial may run, how large its population
//! is, and how the random streams are seeded.
//!
//! ## Example
//!
//! ```rust
//! use evorun::engine::options::ExecutionOptions;
//!
//! let options = ExecutionOptions::builder()
//!     .unit_count(4)
//!     .trials(64)
//!     .max_iterations(500)
//!     .population_size(32)
//!     .random_seed(7)
//!     .random_stream_count(16)
//!     .build();
//!
//! assert_eq!(options.get_trials_per_unit(), 16);
//! assert!(options.validate().is_ok());
//! ```
//!
//! ## Fields
//!
//! - `unit_count`: number of units running in parallel.
//! - `trials`: total number of trials, split evenly across units.
//! - `max_iterations`: generations after which a trial counts as a failure.
//! - `population_size`: number of genes in every population.
//! - `random_seed`: seed of the first random stream.
//! - `random_stream_count`: number of random streams, one per unit by default.
//! - `rng_mode`: whether units own their generator or share a locked one.

use crate::{error::ValidationError, rng::RngMode};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOptions {
    unit_count: usize,
    trials: usize,
    max_iterations: usize,
    population_size: usize,
    random_seed: u64,
    random_stream_count: Option<usize>,
    rng_mode: RngMode,
}

impl ExecutionOptions {
    pub fn new(
        unit_count: usize,
        trials: usize,
        max_iterations: usize,
        population_size: usize,
    ) -> Self {
        Self {
            unit_count,
            trials,
            max_iterations,
            population_size,
            ..Self::default()
        }
    }

    pub fn get_unit_count(&self) -> usize {
        self.unit_count
    }

    pub fn get_trials(&self) -> usize {
        self.trials
    }

    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn get_population_size(&self) -> usize {
        self.population_size
    }

    pub fn get_random_seed(&self) -> u64 {
        self.random_seed
    }

    /// Returns the number of random streams, falling back to one per unit.
    pub fn get_random_stream_count(&self) -> usize {
        self.random_stream_count.unwrap_or(self.unit_count)
    }

    pub fn get_rng_mode(&self) -> RngMode {
        self.rng_mode
    }

    /// Returns how many trials each unit runs. Zero if no units are set.
    pub fn get_trials_per_unit(&self) -> usize {
        self.trials.checked_div(self.unit_count).unwrap_or(0)
    }

    /// Sets the number of units.
    pub fn set_unit_count(&mut self, unit_count: usize) {
        self.unit_count = unit_count;
    }

    /// Sets the total number of trials.
    pub fn set_trials(&mut self, trials: usize) {
        self.trials = trials;
    }

    /// Sets the iteration limit of a trial.
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    /// Sets the population size.
    pub fn set_population_size(&mut self, population_size: usize) {
        self.population_size = population_size;
    }

    /// Sets the seed of the first random stream.
    pub fn set_random_seed(&mut self, random_seed: u64) {
        self.random_seed = random_seed;
    }

    /// Overrides the default of one random stream per unit.
    pub fn set_random_stream_count(&mut self, random_stream_count: usize) {
        self.random_stream_count = Some(random_stream_count);
    }

    /// Sets how units obtain random numbers.
    pub fn set_rng_mode(&mut self, rng_mode: RngMode) {
        self.rng_mode = rng_mode;
    }

    /// Checks the attributes on their own, without looking at operators.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("unit count", self.unit_count),
            ("trials", self.trials),
            ("max iterations", self.max_iterations),
            ("population size", self.population_size),
        ];
        if let Some(&(name, _)) = required.iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::MissingAttribute(name));
        }

        if self.trials % self.unit_count != 0 {
            return Err(ValidationError::IndivisibleTrials {
                trials: self.trials,
                units: self.unit_count,
            });
        }

        let streams = self.get_random_stream_count();
        if streams < self.unit_count {
            return Err(ValidationError::TooFewStreams {
                streams,
                units: self.unit_count,
            });
        }

        Ok(())
    }

    /// Returns a builder for creating an `ExecutionOptions` instance.
    pub fn builder() -> ExecutionOptionsBuilder {
        ExecutionOptionsBuilder::default()
    }
}

/// Builder for `ExecutionOptions`.
///
/// Attributes that are never set stay unset, and fail validation if required.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptionsBuilder {
    unit_count: Option<usize>,
    trials: Option<usize>,
    max_iterations: Option<usize>,
    population_size: Option<usize>,
    random_seed: Option<u64>,
    random_stream_count: Option<usize>,
    rng_mode: Option<RngMode>,
}

impl ExecutionOptionsBuilder {
    /// Sets the number of units.
    pub fn unit_count(mut self, value: usize) -> Self {
        self.unit_count = Some(value);
        self
    }

    /// Sets the total number of trials.
    pub fn trials(mut self, value: usize) -> Self {
        self.trials = Some(value);
        self
    }

    /// Sets the iteration limit of a trial.
    pub fn max_iterations(mut self, value: usize) -> Self {
        self.max_iterations = Some(value);
        self
    }

    /// Sets the population size.
    pub fn population_size(mut self, value: usize) -> Self {
        self.population_size = Some(value);
        self
    }

    /// Sets the seed of the first random stream.
    pub fn random_seed(mut self, value: u64) -> Self {
        self.random_seed = Some(value);
        self
    }

    /// Sets the number of random streams.
    pub fn random_stream_count(mut self, value: usize) -> Self {
        self.random_stream_count = Some(value);
        self
    }

    /// Sets how units obtain random numbers.
    pub fn rng_mode(mut self, value: RngMode) -> Self {
        self.rng_mode = Some(value);
        self
    }

    /// Builds the `ExecutionOptions` instance.
    pub fn build(self) -> ExecutionOptions {
        ExecutionOptions {
            unit_count: self.unit_count.unwrap_or(0),
            trials: self.trials.unwrap_or(0),
            max_iterations: self.max_iterations.unwrap_or(0),
            population_size: self.population_size.unwrap_or(0),
            random_seed: self.random_seed.unwrap_or(0),
            random_stream_count: self.random_stream_count,
            rng_mode: self.rng_mode.unwrap_or_default(),
        }
    }
}
