use crate::context::UnitContext;
use crate::error::Result;
use crate::operators::SelectionOperator;

/// A selection strategy that draws parents and children by fitness-proportionate probability.
///
/// Each generation declares `population_size / 4` breeding events. Parents are
/// drawn with weight `fitness - min_fitness`, so fitter genes breed more often.
/// Children are drawn with weight `max_fitness - fitness`, so weaker genes are
/// replaced more often. A gene already claimed this generation, or already
/// drawn for the current event, is never drawn again. When every remaining
/// weight is zero or not finite the draw falls back to a uniform choice.
///
/// Negative fitness values are fine, since only differences are used.
///
/// # Examples
///
/// ```
/// use evorun::selection::RouletteWheelSelection;
/// use evorun::Config;
///
/// let mut config: Config<Vec<f64>> = Config::new();
/// config.set_selection_operator(RouletteWheelSelection::new());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouletteWheelSelection;

impl RouletteWheelSelection {
    pub fn new() -> Self {
        Self
    }
}

impl<G> SelectionOperator<G> for RouletteWheelSelection {
    fn select(&self, ctx: &mut UnitContext<G>, population_size: usize) -> Result<()> {
        let (min, max) = fitness_bounds(ctx.fitnesses());
        let parent_weights: Vec<f64> = ctx.fitnesses().iter().map(|&f| weight(f - min)).collect();
        let child_weights: Vec<f64> = ctx.fitnesses().iter().map(|&f| weight(max - f)).collect();

        let mut candidates = Vec::with_capacity(population_size);
        for _ in 0..population_size / 4 {
            let mut picked = [0usize; 4];
            for slot in 0..4 {
                let weights = if slot < 2 {
                    &parent_weights
                } else {
                    &child_weights
                };
                candidates.clear();
                candidates.extend(
                    (0..population_size)
                        .filter(|&i| !ctx.is_claimed(i) && !picked[..slot].contains(&i)),
                );
                match spin(ctx, &candidates, weights) {
                    Some(index) => picked[slot] = index,
                    None => return Ok(()),
                }
            }

            let [parent_a, parent_b, child_a, child_b] = picked;
            ctx.add_breed_event(parent_a, parent_b, child_a, child_b)?;
        }
        Ok(())
    }
}

/// The smallest and largest finite fitness, or zeros if there is none.
fn fitness_bounds(fitnesses: &[f64]) -> (f64, f64) {
    let finite = fitnesses.iter().copied().filter(|f| f.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| {
        (lo.min(f), hi.max(f))
    });
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

fn weight(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Draws one of `candidates` with probability proportional to its weight.
fn spin<G>(ctx: &mut UnitContext<G>, candidates: &[usize], weights: &[f64]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }

    let total: f64 = candidates.iter().map(|&i| weights[i]).sum();
    if !(total.is_finite() && total > 0.0) {
        return Some(candidates[ctx.next_index(candidates.len())]);
    }

    let mut remaining = ctx.next_uniform() * total;
    for &index in candidates {
        if remaining < weights[index] {
            return Some(index);
        }
        remaining -= weights[index];
    }
    candidates
        .iter()
        .rev()
        .find(|&&index| weights[index] > 0.0)
        .copied()
}
