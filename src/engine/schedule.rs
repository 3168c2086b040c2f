//! # Schedule
//!
//! Static assignment of random streams and trials to units, computed from the
//! configuration before any worker starts.
//!
//! Streams are split into contiguous ranges, `stream_count / unit_count` per
//! unit, with the remainder going to the last unit. Each unit runs
//! `trials / unit_count` trials, spread over its streams in order; when they do
//! not divide evenly the first streams run one extra trial.
//!
//! ```rust
//! use evorun::engine::schedule::plan_units;
//!
//! let plans = plan_units(8, 2, 5);
//! assert_eq!(plans[0].streams, 0..2);
//! assert_eq!(plans[1].streams, 2..5);
//!
//! let per_stream: Vec<(usize, usize)> = plans[1].stream_trials().collect();
//! assert_eq!(per_stream, vec![(2, 2), (3, 1), (4, 1)]);
//! ```

use std::ops::Range;

/// The streams and trials assigned to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
    pub unit: usize,
    pub streams: Range<usize>,
    pub trials: usize,
}

impl UnitPlan {
    /// Returns whether the unit owns no streams and therefore runs no trials.
    pub fn is_idle(&self) -> bool {
        self.streams.is_empty()
    }

    /// The number of trials run on `stream`, zero if the unit does not own it.
    pub fn trials_for_stream(&self, stream: usize) -> usize {
        if !self.streams.contains(&stream) {
            return 0;
        }
        let owned = self.streams.len();
        let position = stream - self.streams.start;
        self.trials / owned + usize::from(position < self.trials % owned)
    }

    /// Iterates over `(stream, trials)` pairs in the order the unit consumes them.
    pub fn stream_trials(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.streams
            .clone()
            .map(move |stream| (stream, self.trials_for_stream(stream)))
    }

    /// Total trials the unit will run.
    pub fn scheduled_trials(&self) -> usize {
        if self.is_idle() {
            0
        } else {
            self.trials
        }
    }
}

/// Splits `0..stream_count` into `unit_count` contiguous ranges.
pub fn partition_streams(stream_count: usize, unit_count: usize) -> Vec<Range<usize>> {
    if unit_count == 0 {
        return Vec::new();
    }
    let per_unit = stream_count / unit_count;
    (0..unit_count)
        .map(|unit| {
            let start = unit * per_unit;
            let end = if unit + 1 == unit_count {
                stream_count
            } else {
                start + per_unit
            };
            start..end
        })
        .collect()
}

/// Builds the plan of every unit.
pub fn plan_units(trials: usize, unit_count: usize, stream_count: usize) -> Vec<UnitPlan> {
    let trials_per_unit = trials.checked_div(unit_count).unwrap_or(0);
    partition_streams(stream_count, unit_count)
        .into_iter()
        .enumerate()
        .map(|(unit, streams)| UnitPlan {
            unit,
            streams,
            trials: trials_per_unit,
        })
        .collect()
}
