use std::cmp::Ordering;

use tracing::debug;

use crate::context::UnitContext;
use crate::error::{EvoError, Result};
use crate::operators::SelectionOperator;

/// The smallest tournament that can hold two parents and two children.
pub const MIN_TOURNAMENT_SIZE: usize = 4;

/// A selection strategy that breeds the winners of small tournaments into their losers.
///
/// Every generation the population is shuffled and cut into consecutive
/// tournaments of `tournament_size` genes. Inside each tournament the two
/// fittest genes become parents and the two weakest are overwritten by their
/// children. A trailing tournament smaller than [`MIN_TOURNAMENT_SIZE`] is
/// skipped.
///
/// Tournament selection balances exploration and exploitation:
/// - Smaller tournaments replace more genes per generation
/// - Larger tournaments keep more of the population unchanged
///
/// The shuffled order is kept in the unit's user-data slot between generations.
/// If the slot already holds a value of another type, that value is left in
/// place and the order is allocated afresh every generation.
///
/// # Examples
///
/// ```
/// use evorun::selection::TournamentSelection;
/// use evorun::Config;
///
/// let mut config: Config<Vec<u8>> = Config::new();
/// config.set_selection_operator(TournamentSelection::new(4).unwrap());
///
/// assert!(TournamentSelection::new(3).is_err());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentSelection {
    tournament_size: usize,
}

/// The shuffled gene order reused across generations of one unit.
#[derive(Debug, Default)]
struct TournamentRanks(Vec<usize>);

impl TournamentSelection {
    /// Creates a tournament selection with the given tournament size.
    ///
    /// # Errors
    ///
    /// Returns an error if `tournament_size` is below [`MIN_TOURNAMENT_SIZE`].
    pub fn new(tournament_size: usize) -> Result<Self> {
        if tournament_size < MIN_TOURNAMENT_SIZE {
            return Err(EvoError::Operator(format!(
                "Tournament size must be at least {}, got {}",
                MIN_TOURNAMENT_SIZE, tournament_size
            )));
        }
        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self {
            tournament_size: MIN_TOURNAMENT_SIZE,
        }
    }
}

impl<G> SelectionOperator<G> for TournamentSelection {
    fn select(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()> {
        let TournamentRanks(mut ranks) = ctx.take_user_data().unwrap_or_default();
        ranks.clear();
        ranks.extend(0..population_size);

        for i in (1..population_size).rev() {
            let j = ctx.next_index(i + 1);
            ranks.swap(i, j);
        }

        let fitnesses = ctx.fitnesses();
        for tournament in ranks.chunks_mut(self.tournament_size) {
            tournament.sort_by(|&a, &b| ascending(fitnesses[a], fitnesses[b]));
        }

        for tournament in ranks.chunks(self.tournament_size) {
            if tournament.len() < MIN_TOURNAMENT_SIZE {
                continue;
            }
            let last = tournament.len() - 1;
            ctx.add_breed_event(
                tournament[last],
                tournament[last - 1],
                tournament[0],
                tournament[1],
            )?;
        }

        if ctx.has_user_data() {
            if ctx.iteration() == 0 && ctx.trial() == 0 {
                debug!("user-data slot is taken; tournament order is not cached");
            }
        } else {
            ctx.set_user_data(TournamentRanks(ranks));
        }
        Ok(())
    }
}

/// Orders fitness values ascending with NaN below every number.
fn ascending(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()).reverse())
}
