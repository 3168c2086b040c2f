//! # Operators
//!
//! The engine knows nothing about what a gene is. Everything that touches a
//! gene goes through one of the operator traits below, registered on a
//! [`Config`](crate::Config) before it runs:
//!
//! | Operator | Called |
//! |---|---|
//! | [`PopulationInitializer`] | at the start of every trial |
//! | [`FitnessOperator`] | once per gene, then for every new child |
//! | [`SelectionOperator`] | once per generation, declares breeding events |
//! | [`CrossoverOperator`] | once per breeding event |
//! | [`MutationOperator`] | once per child of a breeding event |
//! | [`SuccessPredicate`] | at the end of every generation |
//! | [`PopulationFinalizer`] | once, when the unit has run all its trials |
//!
//! Every trait is implemented for closures with the matching signature, so a
//! small problem can be written without declaring any types.
//!
//! ## Example
//!
//! ```rust
//! use evorun::{operators::FitnessOperator, UnitContext};
//!
//! struct CountOnes;
//!
//! impl FitnessOperator<Vec<bool>> for CountOnes {
//!     fn fitness(&self, _ctx: &UnitContext<Vec<bool>>, gene: &Vec<bool>) -> f64 {
//!         gene.iter().filter(|&&bit| bit).count() as f64
//!     }
//! }
//! ```

use crate::{
    context::UnitContext,
    error::{EvoError, OptionExt, Result, ValidationError},
    rng::RandomStream,
};

/// The maximum number of callbacks of each kind a configuration accepts.
pub const MAX_CALLBACKS: usize = 8;

/// Sets up the population at the start of every trial.
///
/// When the context's population is empty the initializer must create
/// `population_size` genes. On later trials the population already exists and
/// should be re-randomized in place. Returning an error fails the current
/// trial only.
pub trait PopulationInitializer<G>: Send + Sync {
    fn initialize(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()>;
}

/// Releases the population once a unit has finished all of its trials.
pub trait PopulationFinalizer<G>: Send + Sync {
    fn finalize(&self, ctx: &mut UnitContext<G>, population_size: usize);
}

/// Scores a gene. Higher is better.
///
/// The whole context is available, so a gene may be scored against the rest of
/// the population.
pub trait FitnessOperator<G>: Send + Sync {
    fn fitness(&self, ctx: &UnitContext<G>, gene: &G) -> f64;
}

/// Decides which genes breed and which genes are replaced.
///
/// Implementations call [`UnitContext::add_breed_event`] zero or more times.
/// Covering the whole population is up to the strategy.
pub trait SelectionOperator<G>: Send + Sync {
    fn select(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()>;
}

/// Overwrites both children with some combination of both parents.
pub trait CrossoverOperator<G>: Send + Sync {
    fn crossover(
        &self,
        rng: &mut RandomStream,
        parent_a: &G,
        parent_b: &G,
        child_a: &mut G,
        child_b: &mut G,
    );
}

/// Perturbs a freshly bred child.
pub trait MutationOperator<G>: Send + Sync {
    fn mutate(&self, rng: &mut RandomStream, gene: &mut G);
}

/// Reports whether the current trial has reached its goal.
pub trait SuccessPredicate<G>: Send + Sync {
    fn is_success(&self, ctx: &UnitContext<G>) -> bool;
}

impl<G, F> PopulationInitializer<G> for F
where
    F: Fn(&mut UnitContext<G>, usize) -> Result<()> + Send + Sync,
{
    fn initialize(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()> {
        self(ctx, population_size)
    }
}

impl<G, F> PopulationFinalizer<G> for F
where
    F: Fn(&mut UnitContext<G>, usize) + Send + Sync,
{
    fn finalize(&self, ctx: &mut UnitContext<G>, population_size: usize) {
        self(ctx, population_size)
    }
}

impl<G, F> FitnessOperator<G> for F
where
    F: Fn(&UnitContext<G>, &G) -> f64 + Send + Sync,
{
    fn fitness(&self, ctx: &UnitContext<G>, gene: &G) -> f64 {
        self(ctx, gene)
    }
}

impl<G, F> SelectionOperator<G> for F
where
    F: Fn(&mut UnitContext<G>, usize) -> Result<()> + Send + Sync,
{
    fn select(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()> {
        self(ctx, population_size)
    }
}

impl<G, F> CrossoverOperator<G> for F
where
    F: Fn(&mut RandomStream, &G, &G, &mut G, &mut G) + Send + Sync,
{
    fn crossover(
        &self,
        rng: &mut RandomStream,
        parent_a: &G,
        parent_b: &G,
        child_a: &mut G,
        child_b: &mut G,
    ) {
        self(rng, parent_a, parent_b, child_a, child_b)
    }
}

impl<G, F> MutationOperator<G> for F
where
    F: Fn(&mut RandomStream, &mut G) + Send + Sync,
{
    fn mutate(&self, rng: &mut RandomStream, gene: &mut G) {
        self(rng, gene)
    }
}

impl<G, F> SuccessPredicate<G> for F
where
    F: Fn(&UnitContext<G>) -> bool + Send + Sync,
{
    fn is_success(&self, ctx: &UnitContext<G>) -> bool {
        self(ctx)
    }
}

/// A callback run on a unit's context when the unit starts or ends.
pub type UnitCallback<G> = Box<dyn Fn(&mut UnitContext<G>) + Send + Sync>;

/// A callback run once when the configuration is dropped.
pub type TeardownCallback = Box<dyn FnOnce() + Send>;

/// The registered operators of a configuration. Any of them may still be missing.
pub struct OperatorSet<G> {
    pub(crate) initializer: Option<Box<dyn PopulationInitializer<G>>>,
    pub(crate) finalizer: Option<Box<dyn PopulationFinalizer<G>>>,
    pub(crate) fitness: Option<Box<dyn FitnessOperator<G>>>,
    pub(crate) selection: Option<Box<dyn SelectionOperator<G>>>,
    pub(crate) crossover: Option<Box<dyn CrossoverOperator<G>>>,
    pub(crate) mutation: Option<Box<dyn MutationOperator<G>>>,
    pub(crate) success: Option<Box<dyn SuccessPredicate<G>>>,
}

impl<G> Default for OperatorSet<G> {
    fn default() -> Self {
        Self {
            initializer: None,
            finalizer: None,
            fitness: None,
            selection: None,
            crossover: None,
            mutation: None,
            success: None,
        }
    }
}

fn missing(name: &'static str) -> impl FnOnce() -> EvoError {
    move || EvoError::Validation(ValidationError::MissingOperator(name))
}

impl<G> OperatorSet<G> {
    /// Borrows every operator, failing on the first one that is not registered.
    pub(crate) fn validated(&self) -> Result<Operators<'_, G>> {
        Ok(Operators {
            initializer: self
                .initializer
                .as_deref()
                .ok_or_else_evo(missing("population initializer"))?,
            finalizer: self
                .finalizer
                .as_deref()
                .ok_or_else_evo(missing("population finalizer"))?,
            fitness: self.fitness.as_deref().ok_or_else_evo(missing("fitness"))?,
            selection: self
                .selection
                .as_deref()
                .ok_or_else_evo(missing("selection"))?,
            crossover: self
                .crossover
                .as_deref()
                .ok_or_else_evo(missing("crossover"))?,
            mutation: self
                .mutation
                .as_deref()
                .ok_or_else_evo(missing("mutation"))?,
            success: self
                .success
                .as_deref()
                .ok_or_else_evo(missing("success predicate"))?,
        })
    }
}

/// A complete, borrowed operator set shared read-only by every unit.
pub(crate) struct Operators<'a, G> {
    pub(crate) initializer: &'a dyn PopulationInitializer<G>,
    pub(crate) finalizer: &'a dyn PopulationFinalizer<G>,
    pub(crate) fitness: &'a dyn FitnessOperator<G>,
    pub(crate) selection: &'a dyn SelectionOperator<G>,
    pub(crate) crossover: &'a dyn CrossoverOperator<G>,
    pub(crate) mutation: &'a dyn MutationOperator<G>,
    pub(crate) success: &'a dyn SuccessPredicate<G>,
}

/// Callbacks run by every unit around its trials.
pub struct UnitHooks<G> {
    pub(crate) start: Vec<UnitCallback<G>>,
    pub(crate) end: Vec<UnitCallback<G>>,
}

impl<G> Default for UnitHooks<G> {
    fn default() -> Self {
        Self {
            start: Vec::new(),
            end: Vec::new(),
        }
    }
}

impl<G> UnitHooks<G> {
    pub(crate) fn run_start(&self, ctx: &mut UnitContext<G>) {
        self.start.iter().for_each(|hook| hook(ctx));
    }

    pub(crate) fn run_end(&self, ctx: &mut UnitContext<G>) {
        self.end.iter().for_each(|hook| hook(ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_reports_first_missing_operator() {
        let set: OperatorSet<u8> = OperatorSet::default();
        match set.validated() {
            Err(EvoError::Validation(ValidationError::MissingOperator(name))) => {
                assert_eq!(name, "population initializer")
            }
            _ => panic!("Expected a missing operator error"),
        }
    }

    #[test]
    fn test_closures_implement_operators() {
        let mutate = |_rng: &mut RandomStream, gene: &mut u8| *gene += 1;
        let cross = |_rng: &mut RandomStream, a: &u8, b: &u8, ca: &mut u8, cb: &mut u8| {
            *ca = *a;
            *cb = *b;
        };

        let mut rng = RandomStream::from_seed(0);
        let mut gene = 1u8;
        MutationOperator::mutate(&mutate, &mut rng, &mut gene);
        assert_eq!(gene, 2);

        let (mut x, mut y) = (0u8, 0u8);
        CrossoverOperator::crossover(&cross, &mut rng, &4, &5, &mut x, &mut y);
        assert_eq!((x, y), (4, 5));
    }
}
