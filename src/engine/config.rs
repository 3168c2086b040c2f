//! # Config
//!
//! A `Config` collects the attributes, operators and callbacks of one run and
//! executes it. A configuration is single-use: once [`Config::execute`] has
//! started, every setter is ignored and a second execution is refused.
//!
//! ## Example
//!
//! ```rust
//! use evorun::{error::Result, rng::RandomStream, Config, UnitContext};
//!
//! let mut config: Config<u32> = Config::new();
//! config
//!     .set_unit_count(2)
//!     .set_trials(4)
//!     .set_max_iterations(20)
//!     .set_population_size(8)
//!     .set_random_seed(11);
//!
//! config
//!     .set_population_initializer(|ctx: &mut UnitContext<u32>, size: usize| -> Result<()> {
//!         let (population, rng) = ctx.population_and_rng_mut();
//!         population.clear();
//!         population.extend((0..size).map(|_| rng.next_int(0, 100) as u32));
//!         Ok(())
//!     })
//!     .set_population_finalizer(|ctx: &mut UnitContext<u32>, _size: usize| {
//!         ctx.population_mut().clear();
//!     })
//!     .set_fitness_operator(|_ctx: &UnitContext<u32>, gene: &u32| f64::from(*gene))
//!     .set_selection_operator(|ctx: &mut UnitContext<u32>, size: usize| -> Result<()> {
//!         for start in (0..size.saturating_sub(3)).step_by(4) {
//!             ctx.add_breed_event(start, start + 1, start + 2, start + 3)?;
//!         }
//!         Ok(())
//!     })
//!     .set_crossover_operator(
//!         |_rng: &mut RandomStream, a: &u32, b: &u32, ca: &mut u32, cb: &mut u32| {
//!             *ca = (*a).max(*b);
//!             *cb = (*a).min(*b);
//!         },
//!     )
//!     .set_mutation_operator(|rng: &mut RandomStream, gene: &mut u32| {
//!         *gene = gene.saturating_add(rng.next_int(0, 3) as u32);
//!     })
//!     .set_success_predicate(|ctx: &UnitContext<u32>| ctx.best_fitness() >= 100.0);
//!
//! config.execute().unwrap();
//! let stats = config.stats().unwrap();
//! assert_eq!(stats.trials, 4);
//! assert!(config.is_used());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use super::{launcher::Launch, options::ExecutionOptions, schedule::plan_units};
use crate::{
    context::UnitContext,
    error::{EvoError, Result},
    operators::{
        CrossoverOperator, FitnessOperator, MutationOperator, OperatorSet, PopulationFinalizer,
        PopulationInitializer, SelectionOperator, SuccessPredicate, TeardownCallback, UnitHooks,
        MAX_CALLBACKS,
    },
    rng::{derive_stream_seeds, RngMode},
    stats::Stats,
};

/// A cloneable handle that asks a running execution to stop.
///
/// Units check it before every trial and at every generation boundary. A trial
/// interrupted this way is discarded; finished trials stay in the statistics.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The configuration and result of one run of trials over genes of type `G`.
pub struct Config<G> {
    options: ExecutionOptions,
    operators: OperatorSet<G>,
    hooks: UnitHooks<G>,
    teardown: Vec<TeardownCallback>,

    running: bool,
    used: bool,
    cancel: CancelHandle,
    cancelled: bool,
    stats: Option<Stats>,
}

impl<G> Default for Config<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> fmt::Debug for Config<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("options", &self.options)
            .field("unit_start_callbacks", &self.hooks.start.len())
            .field("unit_end_callbacks", &self.hooks.end.len())
            .field("teardown_callbacks", &self.teardown.len())
            .field("running", &self.running)
            .field("used", &self.used)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<G> Config<G> {
    /// Creates an empty configuration. Every required attribute and operator
    /// still has to be set.
    pub fn new() -> Self {
        Self::with_options(ExecutionOptions::default())
    }

    /// Creates a configuration from prepared attributes.
    pub fn with_options(options: ExecutionOptions) -> Self {
        Self {
            options,
            operators: OperatorSet::default(),
            hooks: UnitHooks::default(),
            teardown: Vec::new(),
            running: false,
            used: false,
            cancel: CancelHandle::default(),
            cancelled: false,
            stats: None,
        }
    }

    fn accepts_changes(&self, setting: &'static str) -> bool {
        if self.running || self.used {
            warn!(setting, "configuration has already been used; change ignored");
            false
        } else {
            true
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Replaces all attributes at once.
    pub fn set_options(&mut self, options: ExecutionOptions) -> &mut Self {
        if self.accepts_changes("options") {
            self.options = options;
        }
        self
    }

    /// Sets the number of units running in parallel.
    pub fn set_unit_count(&mut self, unit_count: usize) -> &mut Self {
        if self.accepts_changes("unit count") {
            self.options.set_unit_count(unit_count);
        }
        self
    }

    /// Sets the total number of trials. Must be divisible by the unit count.
    pub fn set_trials(&mut self, trials: usize) -> &mut Self {
        if self.accepts_changes("trials") {
            self.options.set_trials(trials);
        }
        self
    }

    /// Sets the number of generations after which a trial counts as a failure.
    pub fn set_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        if self.accepts_changes("max iterations") {
            self.options.set_max_iterations(max_iterations);
        }
        self
    }

    pub fn set_population_size(&mut self, population_size: usize) -> &mut Self {
        if self.accepts_changes("population size") {
            self.options.set_population_size(population_size);
        }
        self
    }

    /// Sets the seed of the first random stream. Every other stream is offset from it.
    pub fn set_random_seed(&mut self, random_seed: u64) -> &mut Self {
        if self.accepts_changes("random seed") {
            self.options.set_random_seed(random_seed);
        }
        self
    }

    /// Overrides the default of one random stream per unit.
    ///
    /// Keeping the stream count fixed makes runs with different unit counts
    /// draw from the same set of streams.
    pub fn set_random_stream_count(&mut self, random_stream_count: usize) -> &mut Self {
        if self.accepts_changes("random stream count") {
            self.options.set_random_stream_count(random_stream_count);
        }
        self
    }

    /// Selects how units obtain random numbers. Defaults to [`RngMode::Independent`].
    pub fn set_rng_mode(&mut self, rng_mode: RngMode) -> &mut Self {
        if self.accepts_changes("rng mode") {
            self.options.set_rng_mode(rng_mode);
        }
        self
    }

    pub fn set_population_initializer<I>(&mut self, initializer: I) -> &mut Self
    where
        I: PopulationInitializer<G> + 'static,
    {
        if self.accepts_changes("population initializer") {
            self.operators.initializer = Some(Box::new(initializer));
        }
        self
    }

    pub fn set_population_finalizer<F>(&mut self, finalizer: F) -> &mut Self
    where
        F: PopulationFinalizer<G> + 'static,
    {
        if self.accepts_changes("population finalizer") {
            self.operators.finalizer = Some(Box::new(finalizer));
        }
        self
    }

    pub fn set_fitness_operator<F>(&mut self, fitness: F) -> &mut Self
    where
        F: FitnessOperator<G> + 'static,
    {
        if self.accepts_changes("fitness operator") {
            self.operators.fitness = Some(Box::new(fitness));
        }
        self
    }

    pub fn set_selection_operator<S>(&mut self, selection: S) -> &mut Self
    where
        S: SelectionOperator<G> + 'static,
    {
        if self.accepts_changes("selection operator") {
            self.operators.selection = Some(Box::new(selection));
        }
        self
    }

    pub fn set_crossover_operator<C>(&mut self, crossover: C) -> &mut Self
    where
        C: CrossoverOperator<G> + 'static,
    {
        if self.accepts_changes("crossover operator") {
            self.operators.crossover = Some(Box::new(crossover));
        }
        self
    }

    pub fn set_mutation_operator<M>(&mut self, mutation: M) -> &mut Self
    where
        M: MutationOperator<G> + 'static,
    {
        if self.accepts_changes("mutation operator") {
            self.operators.mutation = Some(Box::new(mutation));
        }
        self
    }

    pub fn set_success_predicate<P>(&mut self, predicate: P) -> &mut Self
    where
        P: SuccessPredicate<G> + 'static,
    {
        if self.accepts_changes("success predicate") {
            self.operators.success = Some(Box::new(predicate));
        }
        self
    }

    /// Registers a callback run on every unit's context before its first trial.
    ///
    /// At most [`MAX_CALLBACKS`] are kept; further ones are ignored.
    pub fn add_unit_start_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut UnitContext<G>) + Send + Sync + 'static,
    {
        if self.accepts_changes("unit start callback")
            && has_room(self.hooks.start.len(), "unit start")
        {
            self.hooks.start.push(Box::new(callback));
        }
        self
    }

    /// Registers a callback run on every unit's context after its last trial,
    /// before the population finalizer.
    pub fn add_unit_end_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut UnitContext<G>) + Send + Sync + 'static,
    {
        if self.accepts_changes("unit end callback") && has_room(self.hooks.end.len(), "unit end")
        {
            self.hooks.end.push(Box::new(callback));
        }
        self
    }

    /// Registers a callback run once when the configuration is dropped.
    pub fn add_teardown_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce() + Send + 'static,
    {
        if self.accepts_changes("teardown callback") && has_room(self.teardown.len(), "teardown")
        {
            self.teardown.push(Box::new(callback));
        }
        self
    }

    /// Returns a handle that can stop the execution from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether this configuration has ever started executing.
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the last execution was stopped through a [`CancelHandle`].
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The aggregated statistics of a finished execution.
    ///
    /// `None` while running, before execution, or after an execution that failed.
    pub fn stats(&self) -> Option<&Stats> {
        if self.running {
            None
        } else {
            self.stats.as_ref()
        }
    }

    /// Checks every attribute and operator without running anything.
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        self.operators.validated().map(|_| ())
    }

    /// Runs every trial across the configured units and blocks until all of
    /// them have finished.
    ///
    /// # Errors
    ///
    /// - [`EvoError::AlreadyUsed`] if the configuration was executed before.
    /// - [`EvoError::Validation`] if an attribute or operator is missing or
    ///   inconsistent. Nothing runs and [`is_used`](Self::is_used) stays false.
    /// - [`EvoError::Unit`], [`EvoError::WorkerPanicked`] or [`EvoError::Io`]
    ///   if a unit failed. Every other unit still runs to completion, the
    ///   configuration counts as used, and no statistics are published.
    pub fn execute(&mut self) -> Result<()> {
        if self.running || self.used {
            return Err(EvoError::AlreadyUsed);
        }
        if let Err(err) = self.validate() {
            warn!(error = %err, "configuration rejected; nothing was executed");
            return Err(err);
        }
        let operators = self.operators.validated()?;

        self.running = true;
        self.used = true;

        let options = &self.options;
        let units = options.get_unit_count();
        let streams = options.get_random_stream_count();
        info!(
            units,
            trials = options.get_trials(),
            max_iterations = options.get_max_iterations(),
            population_size = options.get_population_size(),
            seed = options.get_random_seed(),
            streams,
            rng_mode = ?options.get_rng_mode(),
            "starting execution"
        );

        let seeds = derive_stream_seeds(options.get_random_seed(), streams);
        let plans = plan_units(options.get_trials(), units, streams);
        let launch = Launch::new(options, operators, &self.hooks, &self.cancel, seeds);
        let outcome = launch.run(&plans);

        self.cancelled = self.cancel.is_cancelled();
        self.running = false;

        match outcome {
            Ok(unit_stats) => {
                let stats = Stats::aggregate(&unit_stats);
                info!(
                    trials = stats.trials,
                    failures = stats.failures,
                    best_fitness = stats.best_fitness,
                    cancelled = self.cancelled,
                    "execution finished"
                );
                self.stats = Some(stats);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "execution failed");
                Err(err)
            }
        }
    }
}

fn has_room(registered: usize, kind: &'static str) -> bool {
    if registered >= MAX_CALLBACKS {
        warn!(
            kind,
            limit = MAX_CALLBACKS,
            "callback limit reached; callback ignored"
        );
        false
    } else {
        true
    }
}

impl<G> Drop for Config<G> {
    fn drop(&mut self) {
        for callback in self.teardown.drain(..) {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_new_config_is_unused() {
        let config: Config<u8> = Config::new();
        assert!(!config.is_used());
        assert!(!config.is_running());
        assert!(config.stats().is_none());
    }

    #[test]
    fn test_execute_without_operators_is_rejected() {
        let mut config: Config<u8> = Config::with_options(ExecutionOptions::new(1, 1, 1, 4));
        match config.execute() {
            Err(EvoError::Validation(ValidationError::MissingOperator(_))) => {}
            other => panic!("Expected a missing operator error, got {:?}", other),
        }
        assert!(!config.is_used());
        assert!(config.stats().is_none());
    }

    #[test]
    fn test_setters_chain() {
        let mut config: Config<u8> = Config::new();
        config
            .set_unit_count(3)
            .set_trials(9)
            .set_max_iterations(10)
            .set_population_size(4)
            .set_random_seed(5)
            .set_random_stream_count(6)
            .set_rng_mode(RngMode::SharedLocked);

        let options = config.options();
        assert_eq!(options.get_unit_count(), 3);
        assert_eq!(options.get_trials(), 9);
        assert_eq!(options.get_random_stream_count(), 6);
        assert_eq!(options.get_rng_mode(), RngMode::SharedLocked);
    }

    #[test]
    fn test_callback_limit() {
        let mut config: Config<u8> = Config::new();
        for _ in 0..MAX_CALLBACKS + 3 {
            config.add_unit_start_callback(|_ctx| {});
            config.add_unit_end_callback(|_ctx| {});
        }
        assert_eq!(config.hooks.start.len(), MAX_CALLBACKS);
        assert_eq!(config.hooks.end.len(), MAX_CALLBACKS);
    }

    #[test]
    fn test_teardown_runs_once_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let mut config: Config<u8> = Config::new();
            for _ in 0..MAX_CALLBACKS + 2 {
                let calls = Arc::clone(&calls);
                config.add_teardown_callback(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                });
            }
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), MAX_CALLBACKS);
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let config: Config<u8> = Config::new();
        let handle = config.cancel_handle();
        assert!(!config.cancel.is_cancelled());
        handle.cancel();
        assert!(config.cancel.is_cancelled());
    }
}
