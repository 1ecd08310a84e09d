//! Neighborhood-test mapping: probes the whole single-move neighborhood
//! before every step to decide how many tasks to mutate.

use crate::config::Config;
use crate::mapping::Mapping;
use crate::optimize::OptContext;
use crate::optimize::moves::{OptState, adaptive_task_count};

#[derive(Debug, Clone, Default)]
pub struct NtmParams {
    /// Upper bound on tasks changed per step; zero means the default of 2
    pub changemax: u32,
    /// Iteration bound; zero means the default of 1000
    pub itermax: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct OutcomeCounter {
    nworse: u64,
    nsame: u64,
    nbetter: u64,
}

impl OutcomeCounter {
    fn record(&mut self, old: f64, new: f64) {
        if new < old {
            self.nbetter += 1;
        } else if new == old {
            self.nsame += 1;
        } else {
            self.nworse += 1;
        }
    }

    fn add(&mut self, other: &OutcomeCounter) {
        self.nworse += other.nworse;
        self.nsame += other.nsame;
        self.nbetter += other.nbetter;
    }

    fn print(&self, title: &str) {
        let n = self.nworse + self.nsame + self.nbetter;
        let (pworse, psame, pbetter) = if n > 0 {
            (
                self.nworse as f64 / n as f64,
                self.nsame as f64 / n as f64,
                self.nbetter as f64 / n as f64,
            )
        } else {
            (0.0, 0.0, 0.0)
        };
        println!(
            "total probabilities {}: n {} worse {:.3} same {:.3} better {:.3}",
            title, n, pworse, psame, pbetter
        );
    }
}

/// Evaluates every (task, alternate PE) move from `startmap` into a fresh
/// move ring and derives the recommended mutation width from the outcome
/// shares.
fn local_search(startmap: &Mapping, startcost: f64, ctx: &mut OptContext) -> usize {
    let mut map = startmap.fork();
    let ntasks = map.ntasks();
    let npes = map.arch.npes();

    let mut os = OptState::new(ntasks * (npes - 1));

    for taskid in 0..ntasks {
        if map.is_static[taskid] {
            continue;
        }
        let oldpe = map.mappings[taskid];
        for peid in 0..npes {
            if peid == oldpe {
                continue;
            }
            map.set_mapping(taskid, peid);
            let cost = ctx.evaluate(&mut map);
            os.append(startcost, cost);
        }
        map.set_mapping(taskid, oldpe);
    }

    let ps = os
        .probabilities()
        .expect("neighborhood too small for move statistics");
    adaptive_task_count(&ps)
}

pub fn neighborhood_test_mapping(
    map: &Mapping,
    initial: f64,
    p: &NtmParams,
    config: &Config,
    ctx: &mut OptContext,
) -> Mapping {
    assert!(
        !ctx.find_maximum,
        "neighborhood test does not support maximization"
    );

    let changemax = match config.parameter_i64("changemax") {
        Some(value) => {
            assert!(value == 1 || value == 2);
            value as u32
        }
        None => {
            if p.changemax != 0 {
                p.changemax
            } else {
                2
            }
        }
    };
    println!("neighborhood_test_mapping: changemax: {}", changemax);

    let maxiteration = match config.parameter_u64("itermax") {
        Some(value) => {
            assert!(value > 0);
            value
        }
        None => {
            if p.itermax != 0 {
                p.itermax
            } else {
                1000
            }
        }
    };
    println!("neighborhood_test_mapping: itermax: {}", maxiteration);

    let npes = map.arch.npes();

    let mut newmap = map.fork();
    newmap.randomize_mapping(&mut ctx.rng);
    let mut newcost = ctx.evaluate(&mut newmap);

    let mut bestmap = if newcost < initial {
        newmap.fork()
    } else {
        map.fork()
    };
    let mut bestcost = newcost.min(initial);

    let mut counter1 = OutcomeCounter::default();
    let mut counter2 = OutcomeCounter::default();

    for _ in 0..maxiteration {
        let oldcost = newcost;

        let tochange = local_search(&newmap, newcost, ctx).min(changemax as usize);

        newmap.randomize_n_task_mappings(tochange, npes, &mut ctx.rng);
        newcost = ctx.evaluate(&mut newmap);

        let counter = if tochange == 2 {
            &mut counter2
        } else {
            &mut counter1
        };
        counter.record(oldcost, newcost);

        let improved = newcost < bestcost;
        if improved {
            bestcost = newcost;
            bestmap.copy_from(&newmap);
        }

        if improved || ctx.evals % 100 == 0 {
            println!(
                "best_neighborhood_test_cost_so_far: {} {:.9} {:.3} {:.9}",
                ctx.evals,
                bestcost,
                initial / bestcost,
                newcost
            );
        }
    }

    let mut counterall = counter1;
    counterall.add(&counter2);

    counter1.print("1");
    counter2.print("2");
    counterall.print("all");

    bestmap
}
