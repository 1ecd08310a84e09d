//! Random mapping: repeated fully random assignments, keeping the best.

use crate::mapping::Mapping;
use crate::optimize::OptContext;
use log::info;

/// Iteration bound for random mapping.
///
/// A non-negative `max_iterations` is used directly; otherwise the bound is
/// `constant * ntasks^task_exp * npes^pe_exp`.
#[derive(Debug, Clone)]
pub struct RandomParams {
    pub max_iterations: i64,
    pub constant: f64,
    pub task_exp: f64,
    pub pe_exp: f64,
}

pub fn random_mapping(map: &Mapping, initial: f64, p: &RandomParams, ctx: &mut OptContext) -> Mapping {
    let ntasks = map.ntasks() as f64;
    let npes = map.arch.npes() as f64;

    let maxiteration = if p.max_iterations >= 0 {
        p.max_iterations
    } else {
        info!("random mapping constant: {}", p.constant);
        info!("random mapping task_exp: {}", p.task_exp);
        info!("random mapping pe_exp: {}", p.pe_exp);
        (p.constant * ntasks.powf(p.task_exp) * npes.powf(p.pe_exp)) as i64
    };
    info!("random mapping max_iteration: {}", maxiteration);

    let mut newmap = map.fork();
    let mut bestmap = map.fork();
    let mut bestcost = initial;

    for _ in 0..maxiteration {
        newmap.randomize_mapping(&mut ctx.rng);
        let newcost = ctx.evaluate(&mut newmap);

        let improved = ctx.cost_diff(bestcost, newcost) < 0.0;
        if improved {
            bestcost = newcost;
            bestmap.copy_from(&newmap);
        }

        if improved || ctx.evals % 1000 == 0 {
            println!("best_random_cost_so_far: {} {:.9}", ctx.evals, bestcost);
        }
    }

    bestmap
}
