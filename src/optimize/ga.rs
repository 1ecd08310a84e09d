//! Genetic algorithm over mapping chromosomes: roulette-wheel selection
//! with elitism and discrimination, six crossover operators and per-gene
//! point mutation.

use crate::mapping::Mapping;
use crate::optimize::OptContext;
use crate::support::RandomSource;
use log::warn;

/// Crossover operator over two parent chromosomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverMethod {
    Uniform,
    SinglePoint,
    TwoPoint,
    /// Child gene is `(a + b) mod npes`
    Arithmetic,
    /// Agreeing genes pass through, the rest turn random
    Consensus,
    /// Agreeing genes pass through, the rest become `(a + b) mod npes`
    Consensus2,
}

impl CrossoverMethod {
    pub fn from_name(name: &str) -> Option<CrossoverMethod> {
        match name {
            "uniform" => Some(CrossoverMethod::Uniform),
            "single_point" => Some(CrossoverMethod::SinglePoint),
            "two_point" => Some(CrossoverMethod::TwoPoint),
            "arithmetic" => Some(CrossoverMethod::Arithmetic),
            "consensus" => Some(CrossoverMethod::Consensus),
            "consensus_2" => Some(CrossoverMethod::Consensus2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CrossoverMethod::Uniform => "uniform",
            CrossoverMethod::SinglePoint => "single_point",
            CrossoverMethod::TwoPoint => "two_point",
            CrossoverMethod::Arithmetic => "arithmetic",
            CrossoverMethod::Consensus => "consensus",
            CrossoverMethod::Consensus2 => "consensus_2",
        }
    }
}

/// Genetic algorithm parameters. Termination triggers on whichever bound is
/// reached first; bounds left at zero are disabled.
#[derive(Debug, Clone)]
pub struct GaParams {
    pub max_generations: u64,
    pub population_size: usize,
    /// Fittest individuals passed through unchanged
    pub elitism: usize,
    /// Least-fit individuals excluded from the roulette wheel
    pub discrimination: usize,
    pub crossover_probability: f64,
    pub crossover_method: CrossoverMethod,
    pub chromosome_mutation_probability: f64,
    pub gene_mutation_probability: f64,
    pub max_evaluations: u64,
    /// Stop after this many generations without improvement
    pub stop_generations: u64,
    /// Stop after this many evaluations without improvement
    pub stop_evaluations: u64,
    pub initial_cost: f64,
}

impl Default for GaParams {
    fn default() -> GaParams {
        GaParams {
            max_generations: 1000,
            population_size: 100,
            elitism: 1,
            discrimination: 1,
            crossover_probability: 1.0,
            crossover_method: CrossoverMethod::Uniform,
            chromosome_mutation_probability: 1.0,
            gene_mutation_probability: 0.01,
            max_evaluations: 0,
            stop_generations: 0,
            stop_evaluations: 0,
            initial_cost: 0.0,
        }
    }
}

struct Individual {
    map: Mapping,
    fitness: f64,
}

fn fitness(map: &mut Mapping, ctx: &mut OptContext) -> f64 {
    let obj = ctx.evaluate(map);
    if ctx.find_maximum { obj } else { 1.0 / obj }
}

fn fitness_to_cost(fitness: f64, maximize: bool) -> f64 {
    if maximize { fitness } else { 1.0 / fitness }
}

/// Moves one task to a random PE different from its current one.
fn point_mutation(map: &mut Mapping, taskid: usize, rng: &mut RandomSource) {
    let npes = map.arch.npes();
    if npes == 1 {
        return;
    }
    let mut newpe = rng.rand_int(0, npes - 1);
    if newpe >= map.mappings[taskid] {
        newpe += 1;
    }
    map.set_mapping(taskid, newpe);
}

/// Point-mutates every gene independently with the configured probability.
fn mutate_chromosome(map: &mut Mapping, p: &GaParams, rng: &mut RandomSource) {
    if map.arch.npes() == 1 {
        return;
    }
    for taskid in 0..map.ntasks() {
        if rng.rand_double(0.0, 1.0) < p.gene_mutation_probability {
            point_mutation(map, taskid, rng);
        }
    }
}

fn crossover_genes(
    method: CrossoverMethod,
    child: &mut Mapping,
    parent1: &Mapping,
    parent2: &Mapping,
    rng: &mut RandomSource,
) {
    let ntasks = child.ntasks();
    let npes = child.arch.npes();

    match method {
        CrossoverMethod::SinglePoint => {
            let cut = rng.rand_int(0, ntasks + 1);
            child.mappings[..cut].copy_from_slice(&parent1.mappings[..cut]);
            child.mappings[cut..].copy_from_slice(&parent2.mappings[cut..]);
        }
        CrossoverMethod::TwoPoint => {
            let mut a = rng.rand_int(0, ntasks + 1);
            let mut b = rng.rand_int(0, ntasks + 1);
            if b < a {
                std::mem::swap(&mut a, &mut b);
            }
            child.mappings[..a].copy_from_slice(&parent1.mappings[..a]);
            child.mappings[a..b].copy_from_slice(&parent2.mappings[a..b]);
            child.mappings[b..].copy_from_slice(&parent1.mappings[b..]);
        }
        CrossoverMethod::Uniform => {
            for i in 0..ntasks {
                child.mappings[i] = if rng.rand_int(0, 2) == 0 {
                    parent1.mappings[i]
                } else {
                    parent2.mappings[i]
                };
            }
        }
        CrossoverMethod::Arithmetic => {
            for i in 0..ntasks {
                let newpe = (parent1.mappings[i] + parent2.mappings[i]) % npes;
                child.set_mapping(i, newpe);
            }
        }
        CrossoverMethod::Consensus => {
            for i in 0..ntasks {
                if parent1.mappings[i] == parent2.mappings[i] {
                    child.mappings[i] = parent1.mappings[i];
                } else {
                    let newpe = rng.rand_int(0, npes);
                    child.set_mapping(i, newpe);
                }
            }
        }
        CrossoverMethod::Consensus2 => {
            for i in 0..ntasks {
                let x = parent1.mappings[i];
                let y = parent2.mappings[i];
                if x == y {
                    child.mappings[i] = x;
                } else {
                    child.set_mapping(i, (x + y) % npes);
                }
            }
        }
    }
}

/// Breeds a child from two parents: crossover with the configured
/// probability (with random parent order), then chromosome mutation.
fn breed(
    parent1: &Individual,
    parent2: &Individual,
    p: &GaParams,
    ctx: &mut OptContext,
) -> Individual {
    let mut child = Individual {
        map: parent1.map.fork(),
        fitness: parent1.fitness,
    };
    let mut recompute = false;

    if ctx.rng.rand_double(0.0, 1.0) < p.crossover_probability {
        let (first, second) = if ctx.rng.rand_double(0.0, 1.0) < 0.5 {
            (parent2, parent1)
        } else {
            (parent1, parent2)
        };
        crossover_genes(
            p.crossover_method,
            &mut child.map,
            &first.map,
            &second.map,
            &mut ctx.rng,
        );
        recompute = true;
    }

    if ctx.rng.rand_double(0.0, 1.0) < p.chromosome_mutation_probability {
        mutate_chromosome(&mut child.map, p, &mut ctx.rng);
        recompute = true;
    }

    if recompute {
        child.fitness = fitness(&mut child.map, ctx);
    }

    child
}

/// Initial population: the starting mapping plus clones that each carry one
/// point mutation, saving a few generations of warm-up.
fn create_population(map: &Mapping, p: &GaParams, ctx: &mut OptContext) -> Vec<Individual> {
    let mut starter = Individual {
        map: map.fork(),
        fitness: 0.0,
    };
    starter.fitness = fitness(&mut starter.map, ctx);

    let mut population = Vec::with_capacity(p.population_size);
    population.push(Individual {
        map: starter.map.fork(),
        fitness: starter.fitness,
    });

    let ntasks = map.ntasks();
    let mut taskid = 0;
    for _ in 1..p.population_size {
        let mut individual = Individual {
            map: starter.map.fork(),
            fitness: starter.fitness,
        };
        point_mutation(&mut individual.map, taskid, &mut ctx.rng);
        individual.fitness = fitness(&mut individual.map, ctx);
        population.push(individual);

        taskid = (taskid + 1) % ntasks;
    }

    population
}

/// Gini coefficient of the selection probabilities, reported per generation
/// as a diversity diagnostic.
fn gini_coefficient(selection_probability: &[f64]) -> f64 {
    let n = selection_probability.len() as f64;
    let mut sum = 0.0;
    let mut psum = 0.0;

    for (i, &y) in selection_probability.iter().rev().enumerate() {
        psum += y;
        sum += (n - i as f64) * y;
    }

    (n + 1.0 - 2.0 * (sum / psum)) / n
}

/// Roulette-wheel draw over the selection probabilities.
fn random_individual(selection_probability: &[f64], rng: &mut RandomSource) -> usize {
    let x = rng.rand_double(0.0, 1.0);
    let mut sum = 0.0;
    for (i, &p) in selection_probability[..selection_probability.len() - 1]
        .iter()
        .enumerate()
    {
        sum += p;
        if x < sum {
            return i;
        }
    }
    selection_probability.len() - 1
}

pub fn genetic_algorithm(s0: &Mapping, p: &GaParams, ctx: &mut OptContext) -> Mapping {
    if p.max_generations == 0
        && p.max_evaluations == 0
        && p.stop_generations == 0
        && p.stop_evaluations == 0
    {
        warn!("no GA termination condition set; the algorithm will not stop");
    }

    let maximize = ctx.find_maximum;

    let mut s_best = s0.fork();
    let mut s_best_cost = ctx.evaluate(&mut s_best);

    let mut population = create_population(s0, p, ctx);
    let mut selection_probability = vec![0.0; p.population_size];

    let mut generation: u64 = 0;
    let mut last_improvement_generation: u64 = 0;
    let mut evals_at_improvement = ctx.evals;

    loop {
        if p.max_generations > 0 && generation >= p.max_generations {
            break;
        }
        if p.max_evaluations > 0 && ctx.evals >= p.max_evaluations {
            break;
        }
        if p.stop_generations > 0 && generation - last_improvement_generation >= p.stop_generations
        {
            break;
        }
        if p.stop_evaluations > 0 && ctx.evals - evals_at_improvement >= p.stop_evaluations {
            break;
        }

        population.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());
        if fitness_to_cost(population[0].fitness, maximize) < s_best_cost {
            s_best.copy_from(&population[0].map);
            s_best_cost = fitness_to_cost(population[0].fitness, maximize);
            last_improvement_generation = generation;
            evals_at_improvement = ctx.evals;
        }

        let wheel_size = p.population_size - p.discrimination;
        let mut fitness_sum = 0.0;
        let mut best_fitness: f64 = 0.0;
        for (i, individual) in population.iter().enumerate() {
            best_fitness = best_fitness.max(individual.fitness);
            if i < wheel_size {
                fitness_sum += individual.fitness;
            }
        }

        for (i, slot) in selection_probability.iter_mut().enumerate() {
            *slot = if i < wheel_size {
                population[i].fitness / fitness_sum
            } else {
                0.0
            };
        }

        let gini = gini_coefficient(&selection_probability);

        println!(
            "best_ga_cost_so_far: {:.9} {:.3} {} {} {:.3}",
            fitness_to_cost(best_fitness, maximize),
            p.initial_cost / fitness_to_cost(best_fitness, maximize),
            generation,
            ctx.evals,
            gini
        );

        // Elitism: the population is already sorted fittest-first
        let mut newpopulation = Vec::with_capacity(p.population_size);
        for individual in population.iter().take(p.elitism) {
            newpopulation.push(Individual {
                map: individual.map.fork(),
                fitness: individual.fitness,
            });
        }

        while newpopulation.len() < p.population_size {
            let ind1 = random_individual(&selection_probability, &mut ctx.rng);
            let ind2 = random_individual(&selection_probability, &mut ctx.rng);
            newpopulation.push(breed(&population[ind1], &population[ind2], p, ctx));
        }

        population = newpopulation;
        generation += 1;
    }

    population.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());
    if fitness_to_cost(population[0].fitness, maximize) < s_best_cost {
        s_best.copy_from(&population[0].map);
    }

    s_best
}
