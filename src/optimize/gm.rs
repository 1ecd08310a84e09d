//! Group migration: greedy rounds of best single-task (and, for GM2,
//! task-pair) reassignments until no move improves the objective.

use crate::mapping::Mapping;
use crate::optimize::OptContext;
use log::info;

/// One round: repeatedly apply the single best (task, PE) reassignment over
/// all unmoved non-static tasks, marking each moved task, until no single
/// move improves.
fn gm_round(s0: &Mapping, round: u32, ctx: &mut OptContext) -> Mapping {
    let mut s = s0.fork();
    let mut bestcost = ctx.evaluate(&mut s);

    let ntasks = s.ntasks();
    let npes = s.arch.npes();
    let mut moved = vec![false; ntasks];

    for _ in 0..ntasks {
        let mut besttask = None;
        let mut bestpe = 0;

        for taskid in 0..ntasks {
            if s.is_static[taskid] || moved[taskid] {
                continue;
            }
            let oldpe = s.mappings[taskid];
            for pe in 0..npes {
                if pe == oldpe {
                    continue;
                }
                s.mappings[taskid] = pe;
                let newcost = ctx.evaluate(&mut s);
                if ctx.cost_diff(bestcost, newcost) < 0.0 {
                    bestcost = newcost;
                    besttask = Some(taskid);
                    bestpe = pe;
                    println!("best_gm_cost_so_far: {} {} {:.9}", round, ctx.evals, bestcost);
                }
            }
            s.mappings[taskid] = oldpe;
        }

        let Some(task) = besttask else {
            break;
        };
        moved[task] = true;
        s.mappings[task] = bestpe;
        info!("subround cost: {:.9}", bestcost);
    }

    println!("best_gm_cost_so_far: {} {} {:.9}", round, ctx.evals, bestcost);
    s
}

/// Group migration: runs rounds until a round fails to improve.
pub fn group_migration(s0: &Mapping, randomize: bool, ctx: &mut OptContext) -> Mapping {
    let mut s = s0.fork();
    let mut s_best = s0.fork();
    let mut bestcost = ctx.evaluate(&mut s_best);

    if randomize {
        s.randomize_mapping(&mut ctx.rng);
    }

    let mut round = 0;
    loop {
        info!("gm round {}", round);
        info!("best cost: {:.9}", bestcost);
        round += 1;

        let mut s_new = gm_round(&s, round, ctx);
        let newcost = ctx.evaluate(&mut s_new);
        if ctx.cost_diff(bestcost, newcost) >= 0.0 {
            break;
        }
        bestcost = newcost;
        s_best.copy_from(&s_new);
        s.copy_from(&s_new);
    }

    s_best
}

/// One pair round: evaluates simultaneous reassignment of every pair of
/// distinct non-static tasks and applies the best pair found.
fn gm2_round(s: &mut Mapping, ctx: &mut OptContext) {
    let ntasks = s.ntasks();
    let npes = s.arch.npes();

    let mut bestcost = ctx.evaluate(s);
    let mut best: Option<(usize, usize, usize, usize)> = None;

    for t1 in 0..ntasks {
        if s.is_static[t1] {
            continue;
        }
        let oldp1 = s.mappings[t1];

        for p1 in 0..npes {
            if p1 == oldp1 {
                continue;
            }
            s.mappings[t1] = p1;

            for t2 in 0..ntasks {
                if s.is_static[t2] || t1 == t2 {
                    continue;
                }
                let oldp2 = s.mappings[t2];

                for p2 in 0..npes {
                    if p2 == oldp2 {
                        continue;
                    }
                    s.mappings[t2] = p2;

                    let newcost = ctx.evaluate(s);
                    if ctx.cost_diff(bestcost, newcost) < 0.0 {
                        bestcost = newcost;
                        best = Some((t1, p1, t2, p2));
                        println!("best_gm_cost_so_far: {} {:.9}", ctx.evals, bestcost);
                    }
                }

                s.mappings[t2] = oldp2;
            }
        }

        s.mappings[t1] = oldp1;
    }

    if let Some((t1, p1, t2, p2)) = best {
        s.mappings[t1] = p1;
        s.mappings[t2] = p2;
    }
}

/// GM2: alternates full group-migration convergence with pair rounds until
/// a pair round fails to improve.
pub fn group_migration_2(s0: &Mapping, ctx: &mut OptContext) -> Mapping {
    let mut s = s0.fork();

    loop {
        s = group_migration(&s, false, ctx);

        let initialcost = ctx.evaluate(&mut s);
        gm2_round(&mut s, ctx);
        let newcost = ctx.evaluate(&mut s);

        info!("gm2 extra round gain: {}", initialcost / newcost);

        if newcost >= initialcost {
            break;
        }
    }

    s
}
