//! # RandomStream
//!
//! Every unit draws its random numbers from a [`RandomStream`]. A stream is
//! seeded from the configuration alone: stream `i` always starts from
//! [`stream_seed`]`(base, i)`, so the numbers a unit sees do not depend on how
//! the operating system schedules the worker threads.
//!
//! ## Example
//!
//! ```rust
//! use evorun::rng::{stream_seed, RandomStream};
//!
//! let mut stream = RandomStream::from_seed(stream_seed(42, 3));
//! let p = stream.next_uniform();
//! assert!((0.0..1.0).contains(&p));
//!
//! let roll = stream.next_int(1, 7);
//! assert!((1..7).contains(&roll));
//! ```
//!
//! ## Legacy shared generator
//!
//! [`RngMode::SharedLocked`] puts a single generator behind a mutex and hands
//! the same handle to every unit. All draws are serialized and results depend
//! on thread interleaving, so it is only used when explicitly selected.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

/// How units obtain their random numbers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RngMode {
    /// One generator per unit, reseeded at the start of each stream.
    #[default]
    Independent,
    /// One generator shared by every unit behind a lock.
    SharedLocked,
}

/// SplitMix64 finalizer. A bijection on `u64`.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Returns the offset added to the base seed for stream `index`.
///
/// `stream_offset(0)` is zero so the first stream uses the base seed itself,
/// and distinct indices always give distinct offsets.
pub fn stream_offset(index: usize) -> u64 {
    mix(index as u64) ^ mix(0)
}

/// Returns the seed of stream `index` for the given base seed.
pub fn stream_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add(stream_offset(index))
}

/// Derives the seeds of streams `0..count`.
pub fn derive_stream_seeds(base_seed: u64, count: usize) -> Vec<u64> {
    (0..count).map(|index| stream_seed(base_seed, index)).collect()
}

#[derive(Debug, Clone)]
enum Source {
    Owned(StdRng),
    Shared(Arc<Mutex<StdRng>>),
}

/// A deterministic source of uniform doubles and bounded integers.
#[derive(Debug, Clone)]
pub struct RandomStream {
    source: Source,
}

impl RandomStream {
    /// Creates an independent stream with a specific seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: Source::Owned(StdRng::seed_from_u64(seed)),
        }
    }

    /// Creates a handle onto a generator shared by several units.
    pub fn shared(generator: Arc<Mutex<StdRng>>) -> Self {
        Self {
            source: Source::Shared(generator),
        }
    }

    /// Creates the shared generator used by [`RngMode::SharedLocked`].
    pub fn new_shared_generator(seed: u64) -> Arc<Mutex<StdRng>> {
        Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    /// Returns whether this stream draws from a shared, locked generator.
    pub fn is_shared(&self) -> bool {
        matches!(self.source, Source::Shared(_))
    }

    /// Restarts the stream from `seed`.
    ///
    /// Shared generators are never reseeded; other units are drawing from them.
    pub fn reseed(&mut self, seed: u64) {
        if let Source::Owned(rng) = &mut self.source {
            *rng = StdRng::seed_from_u64(seed);
        }
    }

    fn with_rng<T>(&mut self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        match &mut self.source {
            Source::Owned(rng) => f(rng),
            Source::Shared(shared) => {
                let mut rng = shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut rng)
            }
        }
    }

    /// Generates a double in `[0, 1)`.
    pub fn next_uniform(&mut self) -> f64 {
        self.with_rng(|rng| rng.gen::<f64>())
    }

    /// Generates an integer in `[low, high)`. Returns `low` if the range is empty.
    pub fn next_int(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.with_rng(|rng| rng.gen_range(low..high))
    }

    /// Generates an index in `[0, bound)`. Returns 0 if `bound` is 0.
    pub fn next_index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.with_rng(|rng| rng.gen_range(0..bound))
    }
}
