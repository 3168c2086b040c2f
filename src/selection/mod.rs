//! # Selection
//!
//! Ready-made [`SelectionOperator`](crate::operators::SelectionOperator)
//! implementations. They only use the public context interface, so they are
//! interchangeable with a selection closure written by hand.
//!
//! - [`TournamentSelection`]: shuffled tournaments, best two breed into worst two
//! - [`RouletteWheelSelection`]: fitness-proportionate parents, inverse-proportionate children

pub mod roulette;
pub mod tournament;

pub use roulette::RouletteWheelSelection;
pub use tournament::TournamentSelection;
