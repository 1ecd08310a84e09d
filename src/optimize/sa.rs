//! Simulated annealing with a geometric temperature schedule, three
//! acceptance functions, automatic temperature-range derivation and an
//! optional two-pass level mode.

use crate::app::Application;
use crate::mapping::Mapping;
use crate::optimize::OptContext;
use crate::optimize::moves::{MoveHeuristic, OptState, apply_move};
use log::warn;

const DIVISOR_LOWER_LIMIT: f64 = 1e-14;
/// One-in-a-million transition probability cutoff
const EXPONENT_UPPER_LIMIT: f64 = 14.0;

/// Acceptance probability family for worsening moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptor {
    Exponential,
    InverseExponential,
    Special1,
}

impl Acceptor {
    pub fn from_name(name: &str) -> Option<Acceptor> {
        match name {
            "exponential" => Some(Acceptor::Exponential),
            "inverse_exponential" => Some(Acceptor::InverseExponential),
            "special_1" => Some(Acceptor::Special1),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Acceptor::Exponential => "exponential",
            Acceptor::InverseExponential => "inverse_exponential",
            Acceptor::Special1 => "special_1",
        }
    }

    /// Probability of accepting a move that worsens the objective by `de`
    /// at temperature `t`.
    pub fn probability(&self, de: f64, t: f64, params: &SaParams) -> f64 {
        match self {
            Acceptor::Exponential => {
                let divisor = params.acceptor_param1 * t;
                if divisor < DIVISOR_LOWER_LIMIT {
                    warn!("sa acceptor divisor too small");
                    return 0.0;
                }
                let exponent = -de / divisor;
                if exponent >= 0.0 {
                    return 1.0;
                }
                exponent.exp()
            }
            Acceptor::InverseExponential => {
                let divisor = params.acceptor_param1 * t;
                if divisor < DIVISOR_LOWER_LIMIT {
                    warn!("sa acceptor divisor too small");
                    return 0.0;
                }
                let exponent = de / divisor;
                if exponent > EXPONENT_UPPER_LIMIT {
                    return 0.0;
                }
                2.0 * params.zero_transition_prob / (1.0 + exponent.exp())
            }
            Acceptor::Special1 => {
                let c0 = 2.0 * params.acceptor_param1;
                let divisor = 2.0 * c0 * t;
                if divisor < DIVISOR_LOWER_LIMIT {
                    warn!("sa acceptor divisor too small");
                    return 0.0;
                }
                (1.0 - de / divisor).max(0.0)
            }
        }
    }
}

/// Simulated annealing parameters.
///
/// `max_rejects` and `schedule_max` may be configured as -1, which resolves
/// to `ntasks * (npes - 1)` when the annealing starts. `maxpes` restricts
/// move generation to the first PEs without touching the architecture;
/// zero leaves the whole PE set available.
#[derive(Debug, Clone)]
pub struct SaParams {
    pub max_rejects: i64,
    pub ref_e: f64,
    pub schedule_max: i64,
    /// Geometric cooling factor
    pub schedule_param1: f64,
    pub acceptor_param1: f64,
    pub zero_transition_prob: f64,
    pub t0: f64,
    pub tf: f64,
    pub acceptor: Acceptor,
    pub heuristic: MoveHeuristic,
    /// Restore the best state at every temperature change
    pub greedy: bool,
    /// 0 off, 1 plain, 2 and 3 re-anneal from the first result
    pub autotemp: u8,
    pub maxpes: usize,
    pub level_optimization: bool,
}

impl Default for SaParams {
    fn default() -> SaParams {
        SaParams {
            max_rejects: -1,
            ref_e: 0.0,
            schedule_max: -1,
            schedule_param1: 0.95,
            acceptor_param1: 0.0,
            zero_transition_prob: 0.5,
            t0: 1.0,
            tf: 1e-4,
            acceptor: Acceptor::Exponential,
            heuristic: MoveHeuristic::Rm,
            greedy: false,
            autotemp: 0,
            maxpes: 0,
            level_optimization: false,
        }
    }
}

impl SaParams {
    fn next_temperature(&self, t: f64) -> f64 {
        t * self.schedule_param1
    }
}

/// A recorded (temperature, best objective) sample from a level-mode first
/// pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaLevel {
    pub objective: f64,
    pub t: f64,
}

/// What the annealing loop does at temperature-level boundaries.
pub enum LevelPass<'a> {
    Off,
    /// Record a (T, E_best) sample per level, up to the given capacity
    Record {
        levels: &'a mut Vec<SaLevel>,
        max: usize,
    },
    /// Visit exactly the recorded temperatures instead of cooling freely
    Visit { levels: &'a [SaLevel] },
}

/// The annealing loop.
///
/// Keeps a current state, its objective and the best state seen; accepts
/// improving moves always and worsening moves with the acceptor's
/// probability. The temperature drops geometrically every `schedule_max`
/// iterations; the run ends after `max_rejects` consecutive rejections at
/// or below the final temperature, or when a level visit pass runs out of
/// levels.
pub fn anneal(
    mut level_pass: LevelPass,
    s0: &Mapping,
    t0: f64,
    params: &SaParams,
    ctx: &mut OptContext,
) -> Mapping {
    assert!(t0 > 0.0);
    assert!(params.tf > 0.0);
    assert!(params.schedule_max > 0);

    let npes = s0.arch.npes();
    let npes_limit = if params.maxpes > 0 {
        params.maxpes.min(npes)
    } else {
        npes
    };

    let mut os = OptState::new(20);
    let mut t = t0;
    let mut k: i64 = 0;
    let mut rejects: i64 = 0;
    let mut level = 0usize;
    let mut level_recorded = false;

    let mut s = s0.fork();
    let mut e = ctx.evaluate(&mut s);
    let mut s_best = s.fork();
    let mut e_best = e;
    let mut s_new = s.fork();

    loop {
        match &mut level_pass {
            LevelPass::Off => {}
            LevelPass::Record { levels, max } => {
                if !level_recorded {
                    assert!(level < *max, "level capacity exhausted");
                    levels.push(SaLevel {
                        objective: e_best,
                        t,
                    });
                    level += 1;
                    level_recorded = true;
                }
            }
            LevelPass::Visit { levels } => {
                if !level_recorded {
                    t = levels[level].t;
                    level += 1;
                    level_recorded = true;
                }
            }
        }

        apply_move(
            params.heuristic,
            &mut s_new,
            &s,
            t,
            &os,
            npes_limit,
            &mut ctx.rng,
        );

        let e_new = ctx.evaluate(&mut s_new);
        os.append(e, e_new);

        let diff = ctx.cost_diff(e, e_new);
        if diff < 0.0
            || ctx.rng.rand_double(0.0, 1.0) < params.acceptor.probability(diff, t, params)
        {
            s.copy_from(&s_new);
            e = e_new;

            if ctx.cost_diff(e_best, e_new) < 0.0 {
                s_best.copy_from(&s_new);
                e_best = e_new;
                println!(
                    "best_sa_cost_so_far: {:e} {} {:.9} {:.3} {:.2} {:.9}",
                    t,
                    ctx.evals,
                    e_best,
                    params.ref_e / e_best,
                    s_new.schedule.arb_avg_in_queue,
                    s_new.schedule.arb_avg_time
                );
            }
            rejects = 0;
        } else if t <= params.tf {
            if rejects >= params.max_rejects {
                break;
            }
            rejects += 1;
        }

        k += 1;

        if k % params.schedule_max == 0 {
            if let LevelPass::Visit { levels } = &level_pass {
                if level == levels.len() {
                    break;
                }
            }

            println!(
                "best_sa_cost_so_far: {:e} {} {:.9} {:.3}",
                t,
                ctx.evals,
                e_best,
                params.ref_e / e_best
            );

            t = params.next_temperature(t);

            println!(
                "Transition_prob: T {:.6} 0.001 {:.6} 0.010 {:.6} 0.100 {:.6}",
                t,
                params.acceptor.probability(0.001 * params.ref_e, t, params),
                params.acceptor.probability(0.010 * params.ref_e, t, params),
                params.acceptor.probability(0.100 * params.ref_e, t, params),
            );

            if params.greedy {
                s.copy_from(&s_best);
                e = e_best;
            }

            level_recorded = false;
        }
    }

    s_best
}

/// Derives the annealing temperature range from the application and the
/// fastest and slowest PE of the architecture.
pub fn autotemp(params: &mut SaParams, map: &Mapping) {
    let k = 2.0;
    let mut minperf = f64::MAX;
    let mut maxperf: f64 = 0.0;

    for pe in &map.arch.pes {
        // Operations per second
        let perf = 1.0 / pe.computation_time(1.0);
        minperf = minperf.min(perf);
        maxperf = maxperf.max(perf);
    }

    match &*map.app {
        Application::Stg(graph) => {
            let mut mintime = f64::MAX;
            let mut maxtime: f64 = 0.0;
            let mut minsum = 0.0;
            let mut maxsum = 0.0;

            for task in &graph.tasks {
                let time = task.weight / maxperf;
                mintime = mintime.min(time);
                minsum += time;

                let time = task.weight / minperf;
                maxtime = maxtime.max(time);
                maxsum += time;
            }

            params.t0 = (k * maxtime / minsum).min(1.0);
            params.tf = (mintime / (k * maxsum)).min(1.0);
        }
        Application::Kpn(net) => {
            let pivot_percentage = 5;
            let ntasks = net.nprocesses();

            let mut cycles: Vec<f64> = (0..ntasks).map(|i| net.process_cycles(i)).collect();
            cycles.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let mut mintime = f64::MAX;
            let mut maxtime: f64 = 0.0;
            let mut minsum = 0.0;
            let mut maxsum = 0.0;

            for &c in &cycles {
                let time = c / maxperf;
                mintime = mintime.min(time);
                minsum += time;

                let time = c / minperf;
                maxtime = maxtime.max(time);
                maxsum += time;
            }

            // A 5th-percentile pivot keeps degenerate tiny processes from
            // collapsing the final temperature
            let pivot = cycles[(ntasks * pivot_percentage) / 100] / maxperf;
            mintime = mintime.max(pivot).max(1.0 / maxperf);
            assert!(maxtime > 0.0);

            params.t0 = (k * maxtime / minsum).min(1.0);
            params.tf = (mintime / (k * maxsum)).min(1.0);
        }
    }

    println!(
        "SA_autotemp: k: {:e} T0: {:.9} Tf: {:.9}",
        k, params.t0, params.tf
    );

    assert!(params.t0 > 0.0);
    assert!(params.tf > 0.0);
    assert!(params.t0 >= params.tf);
}

/// Resolves the -1 defaults of `max_rejects` and `schedule_max`.
fn resolve_iteration_bounds(params: &mut SaParams, ntasks: usize, npes: usize) {
    let default = (ntasks * npes.saturating_sub(1)).max(1) as i64;
    if params.max_rejects == -1 {
        params.max_rejects = default;
    }
    if params.schedule_max == -1 {
        params.schedule_max = default;
    }
}

/// Runs simulated annealing with the configured autotemp variant.
///
/// Variants 2 and 3 run a second annealing from the first result, starting
/// at `sqrt(T0 * Tf)` and `T0` respectively.
pub fn simulated_annealing(
    map: &Mapping,
    initial: f64,
    params: &mut SaParams,
    ctx: &mut OptContext,
) -> Mapping {
    params.ref_e = initial;
    params.acceptor_param1 = initial / 2.0;

    if params.autotemp > 0 {
        autotemp(params, map);
    }

    resolve_iteration_bounds(params, map.ntasks(), map.arch.npes());

    let t = params.t0;
    let newmap = anneal(LevelPass::Off, map, t, params, ctx);

    let t = match params.autotemp {
        0 | 1 => return newmap,
        2 => (params.t0 * params.tf).sqrt(),
        3 => params.t0,
        other => panic!("unknown SA autotemp version: {}", other),
    };

    anneal(LevelPass::Off, &newmap, t, params, ctx)
}

/// Two-pass level-mode annealing.
///
/// Pass 1 anneals with moves restricted to two PEs and records a
/// (temperature, best objective) sample per level. The half of the levels
/// with the largest improvements, ordered by descending temperature, is
/// then revisited by a second pass over the full PE set with doubled
/// iteration bounds, starting again from the original mapping.
pub fn sa_with_levels(
    map: &Mapping,
    initial: f64,
    params: &mut SaParams,
    ctx: &mut OptContext,
) -> Mapping {
    let max_levels = 10000;

    params.ref_e = initial;
    params.acceptor_param1 = initial / 2.0;

    autotemp(params, map);
    let t = params.t0;

    let mut levels: Vec<SaLevel> = Vec::new();

    params.maxpes = 2;
    params.level_optimization = false;
    params.max_rejects = (map.ntasks() * (params.maxpes - 1)) as i64;
    params.schedule_max = (map.ntasks() * (params.maxpes - 1)) as i64;

    let _first_pass = anneal(
        LevelPass::Record {
            levels: &mut levels,
            max: max_levels,
        },
        map,
        t,
        params,
        ctx,
    );

    // Convert the recorded best objectives into per-level improvements;
    // the last level has nothing after it to improve on
    let nlevels = levels.len();
    for l in 0..nlevels.saturating_sub(1) {
        levels[l].objective -= levels[l + 1].objective;
    }
    if let Some(last) = levels.last_mut() {
        last.objective = 0.0;
    }

    // Greatest improvements first
    levels[..nlevels].sort_by(|a, b| b.objective.partial_cmp(&a.objective).unwrap());
    let opt_levels = ((nlevels * 50) / 100).max(1);

    println!("Switching to level mode: {} -> {}", nlevels, opt_levels);
    println!("Fix moves/templevel value with respect to level improvements");

    // Highest temperature first
    levels[..opt_levels].sort_by(|a, b| b.t.partial_cmp(&a.t).unwrap());

    params.maxpes = 0;
    params.level_optimization = true;
    params.max_rejects = (2 * map.ntasks() * (map.arch.npes() - 1)) as i64;
    params.schedule_max = (2 * map.ntasks() * (map.arch.npes() - 1)).max(1) as i64;

    // Starting the second pass from the first pass result leads to worse
    // final mappings than restarting from the original
    anneal(
        LevelPass::Visit {
            levels: &levels[..opt_levels],
        },
        map,
        t,
        params,
        ctx,
    )
}
