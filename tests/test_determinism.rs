use evorun::{
    error::Result, selection::TournamentSelection, Config, ExecutionOptions, RandomStream, Stats,
    UnitContext,
};

const GENE_BITS: usize = 24;

/// OneMax over bit vectors: fitness is the number of set bits.
fn one_max(options: ExecutionOptions) -> Config<Vec<bool>> {
    let mut config = Config::with_options(options);
    config
        .set_population_initializer(|ctx: &mut UnitContext<Vec<bool>>, size: usize| -> Result<()> {
            let (population, rng) = ctx.population_and_rng_mut();
            population.resize_with(size, || vec![false; GENE_BITS]);
            for gene in population.iter_mut() {
                for bit in gene.iter_mut() {
                    *bit = rng.next_uniform() < 0.3;
                }
            }
            Ok(())
        })
        .set_population_finalizer(|ctx: &mut UnitContext<Vec<bool>>, _size: usize| {
            ctx.population_mut().clear();
        })
        .set_fitness_operator(|_ctx: &UnitContext<Vec<bool>>, gene: &Vec<bool>| {
            gene.iter().filter(|&&bit| bit).count() as f64
        })
        .set_selection_operator(TournamentSelection::new(4).unwrap())
        .set_crossover_operator(
            |rng: &mut RandomStream,
             a: &Vec<bool>,
             b: &Vec<bool>,
             ca: &mut Vec<bool>,
             cb: &mut Vec<bool>| {
                let cut = rng.next_index(GENE_BITS + 1);
                for i in 0..GENE_BITS {
                    let (x, y) = if i < cut { (a[i], b[i]) } else { (b[i], a[i]) };
                    ca[i] = x;
                    cb[i] = y;
                }
            },
        )
        .set_mutation_operator(|rng: &mut RandomStream, gene: &mut Vec<bool>| {
            let i = rng.next_index(gene.len());
            gene[i] = !gene[i];
        })
        .set_success_predicate(|ctx: &UnitContext<Vec<bool>>| {
            ctx.best_fitness() >= GENE_BITS as f64
        });
    config
}

fn run(options: ExecutionOptions) -> Stats {
    let mut config = one_max(options);
    config.execute().unwrap();
    config.stats().cloned().unwrap()
}

#[test]
fn test_repeated_runs_are_identical() {
    let options = ExecutionOptions::builder()
        .unit_count(4)
        .trials(16)
        .max_iterations(200)
        .population_size(32)
        .random_seed(2024)
        .build();

    let first = run(options.clone());
    let second = run(options);
    assert_eq!(first, second);
    assert_eq!(first.trials, 16);
    assert!(first.failures <= first.trials);
}

#[test]
fn test_fixed_stream_count_makes_unit_count_irrelevant() {
    let options = |units: usize| {
        ExecutionOptions::builder()
            .unit_count(units)
            .trials(12)
            .max_iterations(150)
            .population_size(24)
            .random_seed(99)
            .random_stream_count(12)
            .build()
    };

    // one trial per stream, so every stream is consumed identically
    let single = run(options(1));
    let quad = run(options(4));
    assert_eq!(single.trials, quad.trials);
    assert_eq!(single.failures, quad.failures);
    assert_eq!(single.min_iteration, quad.min_iteration);
    assert_eq!(single.max_iteration, quad.max_iteration);
    assert_eq!(single.sum_iterations, quad.sum_iterations);
    assert_eq!(single.best_fitness, quad.best_fitness);
}

#[test]
fn test_different_seeds_change_the_outcome() {
    let options = |seed: u64| {
        ExecutionOptions::builder()
            .unit_count(2)
            .trials(8)
            .max_iterations(400)
            .population_size(16)
            .random_seed(seed)
            .build()
    };

    let runs: Vec<Stats> = (0..4).map(|seed| run(options(seed))).collect();
    assert!(runs.iter().all(|stats| stats.trials == 8));
    assert!(runs.windows(2).any(|pair| pair[0] != pair[1]));
}
