//! # UnitContext
//!
//! The mutable state of one unit: its population, the fitness of every gene,
//! the breeding events declared for the current generation, its random stream
//! and its running statistics. A context is created and dropped inside its
//! unit's worker thread and is never shared with another unit.
//!
//! Operators receive the context to read the population and to draw random
//! numbers. Selection operators use it to declare breeding events:
//!
//! ```rust
//! use evorun::{error::Result, UnitContext};
//!
//! // Pair up neighbours: genes 0 and 1 breed into 2 and 3, and so on.
//! fn neighbours(ctx: &mut UnitContext<u32>, population_size: usize) -> Result<()> {
//!     for start in (0..population_size.saturating_sub(3)).step_by(4) {
//!         ctx.add_breed_event(start, start + 1, start + 2, start + 3)?;
//!     }
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::ops::Range;

use crate::{
    error::{EvoError, Result},
    operators::Operators,
    rng::RandomStream,
    stats::{Stats, TrialOutcome},
};

/// One crossover and mutation application: two parents overwrite two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreedEvent {
    pub parent_a: usize,
    pub parent_b: usize,
    pub child_a: usize,
    pub child_b: usize,
}

impl BreedEvent {
    fn indices(&self) -> [usize; 4] {
        [self.parent_a, self.parent_b, self.child_a, self.child_b]
    }
}

/// Per-unit state handed to every operator.
pub struct UnitContext<G> {
    unit: usize,
    population_size: usize,
    trial: usize,
    iteration: usize,
    best_fitness: f64,

    population: Vec<G>,
    fitnesses: Vec<f64>,

    breed_events: Vec<BreedEvent>,
    claimed: Vec<bool>,
    user_data: Option<Box<dyn Any>>,

    rng: RandomStream,
    streams: Range<usize>,
    stream_index: usize,
    stream_seed: u64,

    stats: Stats,
}

impl<G> UnitContext<G> {
    pub(crate) fn new(
        unit: usize,
        population_size: usize,
        rng: RandomStream,
        streams: Range<usize>,
    ) -> Self {
        Self {
            unit,
            population_size,
            trial: 0,
            iteration: 0,
            best_fitness: f64::NEG_INFINITY,
            population: Vec::new(),
            fitnesses: vec![0.0; population_size],
            breed_events: Vec::with_capacity(population_size / 4),
            claimed: vec![false; population_size],
            user_data: None,
            rng,
            stream_index: streams.start,
            stream_seed: 0,
            streams,
            stats: Stats::default(),
        }
    }

    /// The index of the unit that owns this context.
    pub fn unit_id(&self) -> usize {
        self.unit
    }

    /// The configured population size.
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// How many trials this unit has finished so far.
    pub fn trial(&self) -> usize {
        self.trial
    }

    /// The current generation of the running trial, starting at 0.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The best fitness seen in the running trial.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// The genes of the running trial.
    pub fn population(&self) -> &[G] {
        &self.population
    }

    /// Mutable access to the population, for initializers and finalizers.
    pub fn population_mut(&mut self) -> &mut Vec<G> {
        &mut self.population
    }

    /// Borrows the population and the random stream at the same time, so an
    /// initializer can re-randomize genes in place.
    pub fn population_and_rng_mut(&mut self) -> (&mut Vec<G>, &mut RandomStream) {
        (&mut self.population, &mut self.rng)
    }

    /// The fitness of every gene, aligned with [`population`](Self::population).
    pub fn fitnesses(&self) -> &[f64] {
        &self.fitnesses
    }

    /// The breeding events declared so far in this generation.
    pub fn breed_events(&self) -> &[BreedEvent] {
        &self.breed_events
    }

    /// Whether `index` already takes part in a breeding event this generation.
    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed.get(index).copied().unwrap_or(false)
    }

    /// Declares that `parent_a` and `parent_b` breed into `child_a` and `child_b`.
    ///
    /// Returns `Ok(false)` without changing anything if one of the genes is
    /// already part of an event this generation, or if the same index appears
    /// twice. Otherwise the event is queued, all four genes are claimed and
    /// `Ok(true)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::BreedIndexOutOfRange`] if an index is not inside the
    /// population.
    pub fn add_breed_event(
        &mut self,
        parent_a: usize,
        parent_b: usize,
        child_a: usize,
        child_b: usize,
    ) -> Result<bool> {
        let event = BreedEvent {
            parent_a,
            parent_b,
            child_a,
            child_b,
        };
        let indices = event.indices();

        if let Some(&index) = indices.iter().find(|&&i| i >= self.population_size) {
            return Err(EvoError::BreedIndexOutOfRange {
                index,
                population_size: self.population_size,
            });
        }

        let distinct = indices
            .iter()
            .enumerate()
            .all(|(n, a)| indices[n + 1..].iter().all(|b| a != b));
        if !distinct || indices.iter().any(|&i| self.claimed[i]) {
            return Ok(false);
        }

        for i in indices {
            self.claimed[i] = true;
        }
        self.breed_events.push(event);
        Ok(true)
    }

    /// Generates a double in `[0, 1)` from this unit's stream.
    pub fn next_uniform(&mut self) -> f64 {
        self.rng.next_uniform()
    }

    /// Generates an integer in `[low, high)` from this unit's stream.
    pub fn next_int(&mut self, low: i64, high: i64) -> i64 {
        self.rng.next_int(low, high)
    }

    /// Generates an index in `[0, bound)` from this unit's stream.
    pub fn next_index(&mut self, bound: usize) -> usize {
        self.rng.next_index(bound)
    }

    /// The unit's random stream, for operators that take it directly.
    pub fn rng_mut(&mut self) -> &mut RandomStream {
        &mut self.rng
    }

    /// The range of stream indices assigned to this unit.
    pub fn streams(&self) -> Range<usize> {
        self.streams.clone()
    }

    /// The stream currently being consumed.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// The seed the current stream started from.
    pub fn stream_seed(&self) -> u64 {
        self.stream_seed
    }

    /// The statistics of the trials this unit has finished.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Whether the user-data slot holds a value of any type.
    pub fn has_user_data(&self) -> bool {
        self.user_data.is_some()
    }

    /// Stores a value for the selection strategy, replacing any previous one.
    pub fn set_user_data<T: Any>(&mut self, data: T) {
        self.user_data = Some(Box::new(data));
    }

    /// Borrows the stored value if it has type `T`.
    pub fn user_data<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut()?.downcast_mut::<T>()
    }

    /// Removes and returns the stored value if it has type `T`.
    ///
    /// A value of a different type is left in place.
    pub fn take_user_data<T: Any>(&mut self) -> Option<T> {
        match self.user_data.take()?.downcast::<T>() {
            Ok(data) => Some(*data),
            Err(other) => {
                self.user_data = Some(other);
                None
            }
        }
    }

    /// Clears the user-data slot.
    pub fn clear_user_data(&mut self) {
        self.user_data = None;
    }

    pub(crate) fn into_stats(self) -> Stats {
        self.stats
    }

    pub(crate) fn begin_stream(&mut self, index: usize, seed: u64) {
        self.stream_index = index;
        self.stream_seed = seed;
        self.rng.reseed(seed);
    }

    /// Checks that the population still has its configured size.
    pub(crate) fn check_population(&self) -> Result<()> {
        if self.population.len() == self.population_size {
            Ok(())
        } else {
            Err(EvoError::Operator(format!(
                "population holds {} genes, expected {}",
                self.population.len(),
                self.population_size
            )))
        }
    }

    pub(crate) fn begin_trial(&mut self) {
        self.iteration = 0;
        self.best_fitness = f64::NEG_INFINITY;
    }

    pub(crate) fn evaluate_population(&mut self, ops: &Operators<'_, G>) {
        for index in 0..self.population_size {
            self.refresh_fitness(ops, index);
        }
    }

    pub(crate) fn reset_generation(&mut self) {
        self.breed_events.clear();
        self.claimed.fill(false);
    }

    pub(crate) fn advance_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Applies every queued breeding event and re-scores the children.
    pub(crate) fn reproduce(&mut self, ops: &Operators<'_, G>) -> Result<()> {
        for n in 0..self.breed_events.len() {
            let event = self.breed_events[n];
            let (parent_a, parent_b, child_a, child_b) =
                breeding_slots(&mut self.population, event).ok_or_else(|| {
                    EvoError::Operator(format!("breeding event {:?} is not applicable", event))
                })?;

            ops.crossover
                .crossover(&mut self.rng, parent_a, parent_b, child_a, child_b);
            ops.mutation.mutate(&mut self.rng, child_a);
            ops.mutation.mutate(&mut self.rng, child_b);

            self.refresh_fitness(ops, event.child_a);
            self.refresh_fitness(ops, event.child_b);
        }
        Ok(())
    }

    pub(crate) fn finish_trial(&mut self, outcome: TrialOutcome) {
        self.stats
            .record_trial(outcome, self.iteration as u64, self.best_fitness);
        self.trial += 1;
    }

    pub(crate) fn abort_trial(&mut self) {
        self.stats.record_aborted_trial();
        self.trial += 1;
    }

    #[cfg(test)]
    pub(crate) fn set_fitnesses_for_test(&mut self, fitnesses: &[f64]) {
        self.fitnesses = fitnesses.to_vec();
    }

    fn refresh_fitness(&mut self, ops: &Operators<'_, G>, index: usize) {
        let score = ops.fitness.fitness(self, &self.population[index]);
        self.fitnesses[index] = score;
        if score > self.best_fitness {
            self.best_fitness = score;
        }
    }
}

/// Splits the population into the four genes of a breeding event.
///
/// Returns `None` if the indices are not distinct or not inside the population.
fn breeding_slots<G>(
    population: &mut [G],
    event: BreedEvent,
) -> Option<(&G, &G, &mut G, &mut G)> {
    let [a, b, c, d] = event.indices();
    let mut order = [(a, 0), (b, 1), (c, 2), (d, 3)];
    order.sort_unstable();

    let mut slots: [Option<&mut G>; 4] = [None, None, None, None];
    let mut rest = population;
    let mut consumed = 0;
    for (index, role) in order {
        if index < consumed || index - consumed >= rest.len() {
            return None;
        }
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(index - consumed + 1);
        slots[role] = head.last_mut();
        rest = tail;
        consumed = index + 1;
    }

    let [parent_a, parent_b, child_a, child_b] = slots;
    let parent_a: &G = parent_a?;
    let parent_b: &G = parent_b?;
    Some((parent_a, parent_b, child_a?, child_b?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(population_size: usize) -> UnitContext<u32> {
        let mut ctx = UnitContext::new(0, population_size, RandomStream::from_seed(1), 0..1);
        ctx.population = (0..population_size as u32).collect();
        ctx
    }

    #[test]
    fn test_add_breed_event_claims_indices() {
        let mut ctx = context(8);
        assert!(ctx.add_breed_event(0, 1, 2, 3).unwrap());
        assert!(ctx.is_claimed(0));
        assert!(ctx.is_claimed(3));
        assert!(!ctx.is_claimed(4));
        assert_eq!(ctx.breed_events().len(), 1);

        // every overlap with a claimed index is refused
        assert!(!ctx.add_breed_event(4, 5, 6, 0).unwrap());
        assert!(!ctx.add_breed_event(3, 4, 5, 6).unwrap());
        assert!(!ctx.is_claimed(4));
        assert_eq!(ctx.breed_events().len(), 1);

        assert!(ctx.add_breed_event(7, 6, 5, 4).unwrap());
        assert_eq!(ctx.breed_events().len(), 2);
    }

    #[test]
    fn test_add_breed_event_rejects_repeated_index() {
        let mut ctx = context(8);
        assert!(!ctx.add_breed_event(1, 1, 2, 3).unwrap());
        assert!(!ctx.is_claimed(1));
        assert!(ctx.breed_events().is_empty());
    }

    #[test]
    fn test_add_breed_event_out_of_range() {
        let mut ctx = context(8);
        match ctx.add_breed_event(0, 1, 2, 8) {
            Err(EvoError::BreedIndexOutOfRange {
                index,
                population_size,
            }) => {
                assert_eq!(index, 8);
                assert_eq!(population_size, 8);
            }
            other => panic!("Expected an out of range error, got {:?}", other),
        }
        assert!(!ctx.is_claimed(0));
    }

    #[test]
    fn test_reset_generation_releases_claims() {
        let mut ctx = context(4);
        assert!(ctx.add_breed_event(0, 1, 2, 3).unwrap());
        ctx.reset_generation();
        assert!(ctx.breed_events().is_empty());
        assert!(ctx.add_breed_event(3, 2, 1, 0).unwrap());
    }

    #[test]
    fn test_breeding_slots_follow_roles() {
        let mut population = vec![10, 11, 12, 13, 14, 15];
        let event = BreedEvent {
            parent_a: 5,
            parent_b: 1,
            child_a: 0,
            child_b: 3,
        };
        let (pa, pb, ca, cb) = breeding_slots(&mut population, event).unwrap();
        assert_eq!((*pa, *pb), (15, 11));
        *ca = *pa;
        *cb = *pb;
        assert_eq!(population, vec![15, 11, 12, 11, 14, 15]);
    }

    #[test]
    fn test_breeding_slots_reject_bad_events() {
        let mut population = vec![0; 4];
        let repeated = BreedEvent {
            parent_a: 0,
            parent_b: 0,
            child_a: 1,
            child_b: 2,
        };
        assert!(breeding_slots(&mut population, repeated).is_none());

        let outside = BreedEvent {
            parent_a: 0,
            parent_b: 1,
            child_a: 2,
            child_b: 4,
        };
        assert!(breeding_slots(&mut population, outside).is_none());
    }

    #[test]
    fn test_user_data_slot() {
        let mut ctx = context(2);
        assert!(ctx.user_data::<Vec<usize>>().is_none());

        ctx.set_user_data(vec![1usize, 2, 3]);
        ctx.user_data::<Vec<usize>>().unwrap().push(4);
        assert!(ctx.user_data::<String>().is_none());

        assert!(ctx.take_user_data::<String>().is_none());
        assert_eq!(ctx.take_user_data::<Vec<usize>>(), Some(vec![1, 2, 3, 4]));
        assert!(ctx.take_user_data::<Vec<usize>>().is_none());
    }

    #[test]
    fn test_begin_stream_reseeds() {
        let mut ctx = context(2);
        ctx.begin_stream(0, 77);
        let first = ctx.next_uniform();
        ctx.begin_stream(0, 77);
        assert_eq!(ctx.next_uniform(), first);
        assert_eq!(ctx.stream_seed(), 77);
    }
}
