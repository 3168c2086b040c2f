use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use tracing::{debug, debug_span, trace, warn};

use super::{config::CancelHandle, options::ExecutionOptions, schedule::UnitPlan};
use crate::{
    context::UnitContext,
    error::{EvoError, Result},
    operators::{Operators, UnitHooks},
    rng::{RandomStream, RngMode},
    stats::{Stats, TrialOutcome},
};

/// How a trial left the generation loop.
enum TrialEnd {
    Recorded,
    Cancelled,
}

/// Everything the workers of one execution share. Read-only while they run.
pub(crate) struct Launch<'a, G> {
    options: &'a ExecutionOptions,
    operators: Operators<'a, G>,
    hooks: &'a UnitHooks<G>,
    cancel: &'a CancelHandle,
    seeds: Vec<u64>,
    shared_rng: Option<Arc<Mutex<StdRng>>>,
}

impl<'a, G> Launch<'a, G> {
    pub(crate) fn new(
        options: &'a ExecutionOptions,
        operators: Operators<'a, G>,
        hooks: &'a UnitHooks<G>,
        cancel: &'a CancelHandle,
        seeds: Vec<u64>,
    ) -> Self {
        let shared_rng = match options.get_rng_mode() {
            RngMode::Independent => None,
            RngMode::SharedLocked => Some(RandomStream::new_shared_generator(
                options.get_random_seed(),
            )),
        };
        Self {
            options,
            operators,
            hooks,
            cancel,
            seeds,
            shared_rng,
        }
    }

    /// Runs every unit on its own thread and returns their statistics in unit order.
    ///
    /// All spawned workers are joined before this returns, even when one of
    /// them fails or a later one cannot be spawned.
    pub(crate) fn run(&self, plans: &[UnitPlan]) -> Result<Vec<Stats>> {
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(plans.len());
            let mut spawn_error = None;

            for plan in plans {
                let spawned = thread::Builder::new()
                    .name(format!("evo-unit-{}", plan.unit))
                    .spawn_scoped(scope, move || self.run_unit(plan));
                match spawned {
                    Ok(handle) => handles.push((plan.unit, handle)),
                    Err(err) => {
                        warn!(unit = plan.unit, error = %err, "failed to spawn unit");
                        spawn_error = Some(err);
                        break;
                    }
                }
            }

            let results: Vec<Result<Stats>> = handles
                .into_iter()
                .map(|(unit, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(EvoError::WorkerPanicked { unit }))
                })
                .collect();

            if let Some(err) = spawn_error {
                return Err(EvoError::Io(err));
            }
            results.into_iter().collect()
        })
    }

    fn run_unit(&self, plan: &UnitPlan) -> Result<Stats> {
        let span = debug_span!("unit", unit = plan.unit);
        let _enter = span.enter();

        let population_size = self.options.get_population_size();
        let rng = match &self.shared_rng {
            Some(shared) => RandomStream::shared(Arc::clone(shared)),
            None => RandomStream::from_seed(self.options.get_random_seed()),
        };
        let mut ctx = UnitContext::new(plan.unit, population_size, rng, plan.streams.clone());

        debug!(
            streams = ?plan.streams,
            trials = plan.scheduled_trials(),
            "unit starting"
        );
        if plan.is_idle() {
            debug!("unit owns no random streams and runs no trials");
        }

        self.hooks.run_start(&mut ctx);
        let outcome = self.run_trials(&mut ctx, plan);
        self.hooks.run_end(&mut ctx);
        self.operators.finalizer.finalize(&mut ctx, population_size);

        outcome.map_err(|source| EvoError::Unit {
            unit: plan.unit,
            source: Box::new(source),
        })?;

        let stats = ctx.into_stats();
        debug!(
            trials = stats.trials,
            failures = stats.failures,
            "unit finished"
        );
        Ok(stats)
    }

    fn run_trials(&self, ctx: &mut UnitContext<G>, plan: &UnitPlan) -> Result<()> {
        for (stream, trials) in plan.stream_trials() {
            if trials == 0 {
                continue;
            }
            let seed = self.seeds[stream];
            ctx.begin_stream(stream, seed);
            debug!(stream, seed, trials, "starting random stream");

            for _ in 0..trials {
                if self.cancel.is_cancelled() {
                    debug!(trial = ctx.trial(), "cancelled before trial");
                    return Ok(());
                }
                if let TrialEnd::Cancelled = self.run_trial(ctx)? {
                    debug!(trial = ctx.trial(), "cancelled during trial");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn run_trial(&self, ctx: &mut UnitContext<G>) -> Result<TrialEnd> {
        let ops = &self.operators;
        let population_size = self.options.get_population_size();
        let max_iterations = self.options.get_max_iterations();

        ctx.begin_trial();
        let initialized = ops
            .initializer
            .initialize(ctx, population_size)
            .and_then(|_| ctx.check_population());
        if let Err(err) = initialized {
            warn!(
                trial = ctx.trial(),
                error = %err,
                "population initialization failed; trial recorded as a failure"
            );
            ctx.abort_trial();
            return Ok(TrialEnd::Recorded);
        }

        ctx.evaluate_population(ops);

        let mut outcome = TrialOutcome::Exhausted;
        while ctx.iteration() < max_iterations {
            if self.cancel.is_cancelled() {
                return Ok(TrialEnd::Cancelled);
            }

            ctx.reset_generation();
            ops.selection.select(ctx, population_size)?;
            ctx.check_population()?;
            ctx.reproduce(ops)?;

            if ops.success.is_success(ctx) {
                outcome = TrialOutcome::Success;
                break;
            }
            ctx.advance_iteration();
        }

        let success = outcome == TrialOutcome::Success;
        trace!(
            trial = ctx.trial(),
            iteration = ctx.iteration(),
            best_fitness = ctx.best_fitness(),
            success,
            "trial finished"
        );
        ctx.finish_trial(outcome);
        Ok(TrialEnd::Recorded)
    }
}
