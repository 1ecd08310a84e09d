//! # Optimization Module - Objective, Methods and Orchestration
//!
//! [`OptContext`] carries everything shared by one optimization run: the
//! objective function, the minimize/maximize direction, the evaluation
//! counter, the optional per-evaluation trace and the random source. The
//! mapping under optimization is passed around explicitly; context and
//! mapping together replace the shared pointers of older tooling in this
//! problem space.
//!
//! The search methods live in the submodules; [`run_method`] is the single
//! dispatch point from a parsed [`MethodKind`], and [`optimize`] is the
//! orchestrator the binary calls: initial objective, optional fast
//! pre-mapping, the method itself, and the final objective.

pub mod brute;
pub mod ga;
pub mod gm;
pub mod moves;
pub mod neighborhood;
pub mod osm;
pub mod premap;
pub mod random;
pub mod sa;
// Unit tests
pub mod tests;

use crate::config::Config;
use crate::mapping::Mapping;
use crate::schedule;
use crate::support::RandomSource;
use serde::Serialize;
use std::time::{Duration, Instant, SystemTime};

/// The scalar to be minimized (or maximized).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// Simulated schedule length
    ExecutionTime,
    /// `T*A*fmax + T*k*dynP`: static plus dynamic energy at weight `k`
    ExecutionTimePower { k: f64 },
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self {
            Objective::ExecutionTime => "execution_time",
            Objective::ExecutionTimePower { .. } => "execution_time_power",
        }
    }

    pub fn power_k(&self) -> f64 {
        match self {
            Objective::ExecutionTime => 0.0,
            Objective::ExecutionTimePower { k } => *k,
        }
    }
}

/// One trace entry per evaluation, written to the binary trace file.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TraceFrame {
    pub objective: f32,
    pub time: f32,
}

/// Shared state of one optimization run.
pub struct OptContext {
    pub objective: Objective,
    pub find_maximum: bool,
    /// Total objective evaluations so far
    pub evals: u64,
    /// Per-evaluation (objective, time) trace, when enabled
    pub trace: Option<Vec<TraceFrame>>,
    pub rng: RandomSource,
}

impl OptContext {
    pub fn new(objective: Objective, find_maximum: bool, trace: bool, rng: RandomSource) -> Self {
        OptContext {
            objective,
            find_maximum,
            evals: 0,
            trace: trace.then(Vec::new),
            rng,
        }
    }

    /// Runs the evaluator on `map` and returns the objective value.
    pub fn evaluate(&mut self, map: &mut Mapping) -> f64 {
        schedule::evaluate(map, &mut self.rng);
        let time = map.schedule.schedule_length;

        let objective = match self.objective {
            Objective::ExecutionTime => time,
            Objective::ExecutionTimePower { k } => {
                let (_, static_e, dynamic_e) = map.schedule.energy(&map.arch, k);
                static_e + dynamic_e
            }
        };

        self.evals += 1;
        if let Some(trace) = &mut self.trace {
            trace.push(TraceFrame {
                objective: objective as f32,
                time: time as f32,
            });
        }

        objective
    }

    /// Signed improvement of `new` over `old`; negative always means
    /// better, regardless of the search direction.
    pub fn cost_diff(&self, old: f64, new: f64) -> f64 {
        let diff = new - old;
        if self.find_maximum { -diff } else { diff }
    }
}

/// A parsed optimization method with its parameters.
#[derive(Debug, Clone)]
pub enum MethodKind {
    OptimalSubsetMapping(osm::OsmParams),
    RandomMapping(random::RandomParams),
    GroupMigration { randomize: bool },
    GroupMigration2,
    SimulatedAnnealing(sa::SaParams),
    FastHybridGmSa(sa::SaParams),
    SlowHybridGmSa(sa::SaParams),
    IteratedSimulatedAnnealing(sa::SaParams),
    GeneticAlgorithm(ga::GaParams),
    BruteForce { flags: u32 },
    BruteForceMapSchedule,
    OsmSa { osm: osm::OsmParams, sa: sa::SaParams },
    SimulatedAnnealingLevels(sa::SaParams),
    NeighborhoodTest(neighborhood::NtmParams),
}

/// The full optimization request parsed from the input.
#[derive(Debug, Clone)]
pub struct OptimizationSpec {
    pub objective: Objective,
    pub method_name: String,
    pub method: MethodKind,
}

impl OptimizationSpec {
    /// Simulated-annealing parameters of the method, when it has any.
    pub fn sa_params_mut(&mut self) -> Option<&mut sa::SaParams> {
        match &mut self.method {
            MethodKind::SimulatedAnnealing(p)
            | MethodKind::FastHybridGmSa(p)
            | MethodKind::SlowHybridGmSa(p)
            | MethodKind::IteratedSimulatedAnnealing(p)
            | MethodKind::SimulatedAnnealingLevels(p)
            | MethodKind::OsmSa { sa: p, .. } => Some(p),
            _ => None,
        }
    }

    pub fn sa_params(&self) -> Option<&sa::SaParams> {
        match &self.method {
            MethodKind::SimulatedAnnealing(p)
            | MethodKind::FastHybridGmSa(p)
            | MethodKind::SlowHybridGmSa(p)
            | MethodKind::IteratedSimulatedAnnealing(p)
            | MethodKind::SimulatedAnnealingLevels(p)
            | MethodKind::OsmSa { sa: p, .. } => Some(p),
            _ => None,
        }
    }
}

/// Result record of one optimization run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub initial: f64,
    pub initial_time: f64,
    pub best: f64,
    pub best_time: f64,
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub elapsed: Duration,
}

/// Repeated full annealings with halved starting temperature, optionally
/// interleaved with group migration.
fn iterated_sa(
    map: &Mapping,
    initial: f64,
    params: &mut sa::SaParams,
    use_gm: bool,
    ctx: &mut OptContext,
) -> Mapping {
    let mut current = map.fork();
    let mut t = 1.0;

    while t >= params.tf {
        params.t0 = t;
        let annealed = sa::simulated_annealing(&current, initial, params, ctx);
        current.copy_from(&annealed);

        if use_gm {
            let migrated = gm::group_migration(&current, false, ctx);
            current.copy_from(&migrated);
        }

        t /= 2.0;
    }

    current
}

/// Runs the configured method on `map` and returns the best mapping found.
pub fn run_method(
    map: &Mapping,
    initial: f64,
    spec: &mut OptimizationSpec,
    config: &Config,
    ctx: &mut OptContext,
) -> Mapping {
    match &mut spec.method {
        MethodKind::OptimalSubsetMapping(params) => {
            params.init(map.ntasks(), map.arch.npes());
            osm::optimal_subset_mapping(map, params, ctx)
        }
        MethodKind::RandomMapping(params) => random::random_mapping(map, initial, params, ctx),
        MethodKind::GroupMigration { randomize } => {
            gm::group_migration(map, *randomize, ctx)
        }
        MethodKind::GroupMigration2 => gm::group_migration_2(map, ctx),
        MethodKind::SimulatedAnnealing(params) => {
            sa::simulated_annealing(map, initial, params, ctx)
        }
        MethodKind::FastHybridGmSa(params) => {
            let annealed = sa::simulated_annealing(map, initial, params, ctx);
            gm::group_migration(&annealed, false, ctx)
        }
        MethodKind::SlowHybridGmSa(params) => iterated_sa(map, initial, params, true, ctx),
        MethodKind::IteratedSimulatedAnnealing(params) => {
            iterated_sa(map, initial, params, false, ctx)
        }
        MethodKind::GeneticAlgorithm(params) => {
            params.initial_cost = initial;
            ga::genetic_algorithm(map, params, ctx)
        }
        MethodKind::BruteForce { flags } => brute::brute_force(map, initial, *flags, ctx),
        MethodKind::BruteForceMapSchedule => {
            let mapped = brute::brute_force(map, initial, brute::OPT_MAPPING, ctx);
            brute::brute_force(&mapped, initial, brute::OPT_SCHEDULING, ctx)
        }
        MethodKind::OsmSa { osm: osm_params, sa: sa_params } => {
            osm_params.init(map.ntasks(), map.arch.npes());
            let subset_best = osm::optimal_subset_mapping(map, osm_params, ctx);
            sa::simulated_annealing(&subset_best, initial, sa_params, ctx)
        }
        MethodKind::SimulatedAnnealingLevels(params) => {
            sa::sa_with_levels(map, initial, params, ctx)
        }
        MethodKind::NeighborhoodTest(params) => {
            neighborhood::neighborhood_test_mapping(map, initial, params, config, ctx)
        }
    }
}

/// The orchestrator: computes the initial objective, optionally applies
/// fast pre-mapping, runs the method and re-evaluates the final mapping.
pub fn optimize(
    map: &mut Mapping,
    spec: &mut OptimizationSpec,
    config: &Config,
    ctx: &mut OptContext,
) -> (Mapping, RunResult) {
    let started_at = SystemTime::now();
    let timer = Instant::now();

    let initial = ctx.evaluate(map);
    let initial_time = map.schedule.schedule_length;

    let premapped;
    let start: &Mapping = if config.fast_premapping {
        premapped = premap::fast_premapping(map, initial, ctx);
        &premapped
    } else {
        map
    };

    let mut best = run_method(start, initial, spec, config, ctx);
    let best_objective = ctx.evaluate(&mut best);

    let result = RunResult {
        initial,
        initial_time,
        best: best_objective,
        best_time: best.schedule.schedule_length,
        started_at,
        ended_at: SystemTime::now(),
        elapsed: timer.elapsed(),
    };

    (best, result)
}
