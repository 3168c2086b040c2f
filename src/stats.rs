//! # Stats
//!
//! Running outcome statistics for a unit, and the reduction that merges the
//! records of every unit into one. Only sums, minima and maxima are stored, so
//! merging is exact and does not depend on the order of the records.
//!
//! ## Example
//!
//! ```rust
//! use evorun::stats::{Stats, TrialOutcome};
//!
//! let mut a = Stats::default();
//! a.record_trial(TrialOutcome::Success, 3, 10.0);
//! let mut b = Stats::default();
//! b.record_trial(TrialOutcome::Exhausted, 100, 4.0);
//!
//! let total = Stats::aggregate([&a, &b]);
//! assert_eq!(total.trials, 2);
//! assert_eq!(total.failures, 1);
//! assert_eq!(total.min_iteration, 3);
//! assert_eq!(total.max_iteration, 100);
//! assert_eq!(total.best_fitness, 10.0);
//! ```

use std::fmt;

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The success predicate returned true.
    Success,
    /// The trial reached the iteration limit.
    Exhausted,
}

/// Outcome statistics over a set of trials.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Number of trials recorded.
    pub trials: u64,
    /// Number of failed trials. Every other trial succeeded.
    pub failures: u64,
    /// Number of trials that recorded an iteration count. Trials whose
    /// population could not be initialized are not included.
    pub iteration_trials: u64,
    /// Sum of the recorded iteration counts.
    pub sum_iterations: f64,
    /// Sum of the squared recorded iteration counts.
    pub sum_squared_iterations: f64,
    /// Sum of the iteration counts of successful trials.
    pub sum_success_iterations: f64,
    /// Sum of the squared iteration counts of successful trials.
    pub sum_squared_success_iterations: f64,
    /// Smallest iteration count of any trial that ran.
    pub min_iteration: u64,
    /// Largest iteration count of any trial.
    pub max_iteration: u64,
    /// Largest iteration count of any successful trial.
    pub max_success_iteration: u64,
    /// Best fitness seen in any population, negative infinity if no gene was scored.
    #[cfg_attr(feature = "serde", serde(with = "unscored_fitness"))]
    pub best_fitness: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            trials: 0,
            failures: 0,
            iteration_trials: 0,
            sum_iterations: 0.0,
            sum_squared_iterations: 0.0,
            sum_success_iterations: 0.0,
            sum_squared_success_iterations: 0.0,
            min_iteration: 0,
            max_iteration: 0,
            max_success_iteration: 0,
            best_fitness: f64::NEG_INFINITY,
        }
    }
}

impl Stats {
    /// Folds one finished trial into the record.
    pub fn record_trial(&mut self, outcome: TrialOutcome, iteration: u64, best_fitness: f64) {
        let it = iteration as f64;
        match outcome {
            TrialOutcome::Success => {
                self.max_success_iteration = self.max_success_iteration.max(iteration);
                self.sum_success_iterations += it;
                self.sum_squared_success_iterations += it * it;
            }
            TrialOutcome::Exhausted => self.failures += 1,
        }

        if self.iteration_trials == 0 || iteration < self.min_iteration {
            self.min_iteration = iteration;
        }
        self.iteration_trials += 1;
        self.max_iteration = self.max_iteration.max(iteration);
        if best_fitness > self.best_fitness {
            self.best_fitness = best_fitness;
        }
        self.sum_iterations += it;
        self.sum_squared_iterations += it * it;
        self.trials += 1;
    }

    /// Records a trial whose population could not be initialized.
    ///
    /// It counts as a failed trial but has no iteration count.
    pub fn record_aborted_trial(&mut self) {
        self.trials += 1;
        self.failures += 1;
    }

    /// Merges another record into this one.
    pub fn merge(&mut self, other: &Stats) {
        self.trials += other.trials;
        self.failures += other.failures;
        self.sum_iterations += other.sum_iterations;
        self.sum_squared_iterations += other.sum_squared_iterations;
        self.sum_success_iterations += other.sum_success_iterations;
        self.sum_squared_success_iterations += other.sum_squared_success_iterations;

        if other.iteration_trials > 0
            && (self.iteration_trials == 0 || other.min_iteration < self.min_iteration)
        {
            self.min_iteration = other.min_iteration;
        }
        self.iteration_trials += other.iteration_trials;
        self.max_iteration = self.max_iteration.max(other.max_iteration);
        self.max_success_iteration = self.max_success_iteration.max(other.max_success_iteration);
        if other.best_fitness > self.best_fitness {
            self.best_fitness = other.best_fitness;
        }
    }

    /// Reduces any number of records into one.
    pub fn aggregate<'a, I>(records: I) -> Stats
    where
        I: IntoIterator<Item = &'a Stats>,
    {
        records.into_iter().fold(Stats::default(), |mut total, stats| {
            total.merge(stats);
            total
        })
    }

    /// Number of successful trials.
    pub fn successes(&self) -> u64 {
        self.trials - self.failures
    }

    /// Fraction of trials that succeeded.
    pub fn success_rate(&self) -> Option<f64> {
        (self.trials > 0).then(|| self.successes() as f64 / self.trials as f64)
    }

    /// Mean iteration count over the trials that recorded one.
    pub fn mean_iterations(&self) -> Option<f64> {
        mean(self.sum_iterations, self.iteration_trials)
    }

    /// Population variance of the iteration count over the trials that recorded one.
    pub fn iteration_variance(&self) -> Option<f64> {
        variance(
            self.sum_iterations,
            self.sum_squared_iterations,
            self.iteration_trials,
        )
    }

    /// Mean iteration count over successful trials.
    pub fn mean_success_iterations(&self) -> Option<f64> {
        mean(self.sum_success_iterations, self.successes())
    }

    /// Population variance of the iteration count over successful trials.
    pub fn success_iteration_variance(&self) -> Option<f64> {
        variance(
            self.sum_success_iterations,
            self.sum_squared_success_iterations,
            self.successes(),
        )
    }
}

fn mean(sum: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

fn variance(sum: f64, sum_squared: f64, count: u64) -> Option<f64> {
    let n = count as f64;
    mean(sum, count).map(|m| (sum_squared / n - m * m).max(0.0))
}

/// JSON has no infinity, so an unscored best fitness is written as `null`.
#[cfg(feature = "serde")]
mod unscored_fitness {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let scored = (*value != f64::NEG_INFINITY).then_some(*value);
        scored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Failures {}/{}", self.failures, self.trials)?;
        writeln!(f, "Best fitness {}", self.best_fitness)?;
        write!(
            f,
            "Iterations min {} / max {} / max success {}",
            self.min_iteration, self.max_iteration, self.max_success_iteration
        )?;
        if let Some(mean) = self.mean_iterations() {
            write!(f, " / mean {:.3}", mean)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_record(trials: &[(TrialOutcome, u64, f64)]) -> Stats {
        let mut stats = Stats::default();
        for &(outcome, iteration, fitness) in trials {
            stats.record_trial(outcome, iteration, fitness);
        }
        stats
    }

    #[test]
    fn test_record_trial_updates_all_fields() {
        let stats = unit_record(&[
            (TrialOutcome::Success, 4, 1.0),
            (TrialOutcome::Exhausted, 10, 3.0),
            (TrialOutcome::Success, 2, 2.0),
        ]);

        assert_eq!(stats.trials, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.successes(), 2);
        assert_eq!(stats.sum_iterations, 16.0);
        assert_eq!(stats.sum_squared_iterations, 120.0);
        assert_eq!(stats.sum_success_iterations, 6.0);
        assert_eq!(stats.sum_squared_success_iterations, 20.0);
        assert_eq!(stats.min_iteration, 2);
        assert_eq!(stats.max_iteration, 10);
        assert_eq!(stats.max_success_iteration, 4);
        assert_eq!(stats.best_fitness, 3.0);
    }

    #[test]
    fn test_first_trial_seeds_minimum() {
        let stats = unit_record(&[(TrialOutcome::Exhausted, 50, 0.0)]);
        assert_eq!(stats.min_iteration, 50);
    }

    #[test]
    fn test_aborted_trial_counts_as_failure_only() {
        let mut stats = Stats::default();
        stats.record_aborted_trial();
        stats.record_trial(TrialOutcome::Success, 7, 1.0);

        assert_eq!(stats.trials, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.iteration_trials, 1);
        assert_eq!(stats.min_iteration, 7);
        assert_eq!(stats.sum_iterations, 7.0);
    }

    #[test]
    fn test_aborted_trials_do_not_drag_the_mean() {
        let mut stats = Stats::default();
        stats.record_aborted_trial();
        stats.record_trial(TrialOutcome::Exhausted, 10, 0.0);
        stats.record_aborted_trial();
        stats.record_trial(TrialOutcome::Exhausted, 10, 0.0);

        assert_eq!(stats.trials, 4);
        assert_eq!(stats.failures, 4);
        assert_eq!(stats.mean_iterations(), Some(10.0));
        assert_eq!(stats.iteration_variance(), Some(0.0));

        let mut only_aborted = Stats::default();
        only_aborted.record_aborted_trial();
        assert_eq!(only_aborted.mean_iterations(), None);

        let merged = Stats::aggregate([&only_aborted, &stats]);
        assert_eq!(merged.iteration_trials, 2);
        assert_eq!(merged.min_iteration, 10);
        assert_eq!(merged.mean_iterations(), Some(10.0));
    }

    #[test]
    fn test_empty_records_do_not_pull_minimum_to_zero() {
        let busy = unit_record(&[(TrialOutcome::Exhausted, 20, 1.0)]);
        let idle = Stats::default();

        let forward = Stats::aggregate([&idle, &busy]);
        let backward = Stats::aggregate([&busy, &idle]);
        assert_eq!(forward.min_iteration, 20);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let records = vec![
            unit_record(&[(TrialOutcome::Success, 3, 2.5), (TrialOutcome::Exhausted, 9, 1.0)]),
            unit_record(&[(TrialOutcome::Success, 1, 0.5)]),
            unit_record(&[(TrialOutcome::Exhausted, 9, 7.0), (TrialOutcome::Success, 6, 3.0)]),
            Stats::default(),
        ];

        let expected = Stats::aggregate(&records);
        let permutations: [[usize; 4]; 4] = [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1], [0, 2, 1, 3]];
        for order in permutations {
            let shuffled: Vec<&Stats> = order.iter().map(|&i| &records[i]).collect();
            assert_eq!(Stats::aggregate(shuffled), expected);
        }

        assert_eq!(expected.trials, 5);
        assert_eq!(expected.failures, 2);
        assert_eq!(expected.min_iteration, 1);
        assert_eq!(expected.max_iteration, 9);
        assert_eq!(expected.max_success_iteration, 6);
        assert_eq!(expected.best_fitness, 7.0);
    }

    #[test]
    fn test_derived_statistics() {
        let stats = unit_record(&[
            (TrialOutcome::Success, 2, 0.0),
            (TrialOutcome::Success, 4, 0.0),
            (TrialOutcome::Exhausted, 6, 0.0),
        ]);

        assert_eq!(stats.mean_iterations(), Some(4.0));
        assert_eq!(stats.mean_success_iterations(), Some(3.0));
        assert_eq!(stats.success_iteration_variance(), Some(1.0));
        let variance = stats.iteration_variance().unwrap();
        assert!((variance - 8.0 / 3.0).abs() < 1e-12);
        let rate = stats.success_rate().unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);

        let empty = Stats::default();
        assert_eq!(empty.mean_iterations(), None);
        assert_eq!(empty.success_rate(), None);
    }

    #[test]
    fn test_display() {
        let stats = unit_record(&[(TrialOutcome::Exhausted, 10, 2.0)]);
        let text = stats.to_string();
        assert!(text.contains("Failures 1/1"));
        assert!(text.contains("Best fitness 2"));
    }
}
