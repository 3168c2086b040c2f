use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use evorun::{
    error::Result, selection::TournamentSelection, Config, ExecutionOptions, RandomStream,
    RngMode, Stats, UnitContext,
};

const TARGET: f64 = 2.0;

/// Searches for an x coordinate close to `TARGET`.
fn x_coordinate(options: ExecutionOptions) -> Config<f64> {
    let mut config = Config::with_options(options);
    config
        .set_population_initializer(|ctx: &mut UnitContext<f64>, size: usize| -> Result<()> {
            let (population, rng) = ctx.population_and_rng_mut();
            population.resize(size, 0.0);
            for x in population.iter_mut() {
                *x = rng.next_uniform() * 20.0 - 10.0;
            }
            Ok(())
        })
        .set_population_finalizer(|ctx: &mut UnitContext<f64>, _size: usize| {
            ctx.population_mut().clear();
        })
        .set_fitness_operator(|_ctx: &UnitContext<f64>, x: &f64| -(x - TARGET).powi(2))
        .set_selection_operator(TournamentSelection::new(4).unwrap())
        .set_crossover_operator(
            |rng: &mut RandomStream, a: &f64, b: &f64, ca: &mut f64, cb: &mut f64| {
                let w = rng.next_uniform();
                *ca = w * a + (1.0 - w) * b;
                *cb = (1.0 - w) * a + w * b;
            },
        )
        .set_mutation_operator(|rng: &mut RandomStream, x: &mut f64| {
            *x += (rng.next_uniform() - 0.5) / 10.0;
        })
        .set_success_predicate(|ctx: &UnitContext<f64>| ctx.best_fitness() > -1e-6);
    config
}

fn run(options: &ExecutionOptions) -> Stats {
    let mut config = x_coordinate(options.clone());
    config.execute().unwrap();
    config.stats().cloned().unwrap()
}

fn bench_unit_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_count");

    for units in [1, 2, 4, 8].iter() {
        let options = ExecutionOptions::builder()
            .unit_count(*units)
            .trials(32)
            .max_iterations(200)
            .population_size(64)
            .random_seed(42)
            .random_stream_count(32)
            .build();

        group.bench_with_input(BenchmarkId::new("independent", units), &options, |b, options| {
            b.iter(|| run(black_box(options)))
        });
    }

    group.finish();
}

fn bench_rng_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rng_mode");

    for mode in [RngMode::Independent, RngMode::SharedLocked] {
        let options = ExecutionOptions::builder()
            .unit_count(4)
            .trials(16)
            .max_iterations(200)
            .population_size(64)
            .random_seed(42)
            .rng_mode(mode)
            .build();

        group.bench_with_input(
            BenchmarkId::new("four_units", format!("{:?}", mode)),
            &options,
            |b, options| b.iter(|| run(black_box(options))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_unit_counts, bench_rng_modes);
criterion_main!(benches);
