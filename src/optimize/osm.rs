//! Optimal-subset mapping: brute-force optimization of a random task
//! subset per round, with an adaptively sized subset.

use crate::mapping::Mapping;
use crate::optimize::OptContext;
use log::info;

/// Optimal-subset mapping parameters.
///
/// When `subsetsize` is zero the size is derived at startup from
/// `log_M(c * N^cn * M^cp)`, with `N` tasks and `M` PEs.
#[derive(Debug, Clone)]
pub struct OsmParams {
    pub c: f64,
    pub cn: f64,
    pub cp: f64,
    pub subsetsize: usize,
    pub subsettries: f64,
}

impl OsmParams {
    /// Resolves the automatic subset size and reports the per-round cost.
    pub fn init(&mut self, ntasks: usize, npes: usize) {
        assert!(ntasks > 0 && npes > 0);

        if self.subsetsize == 0 {
            let m = npes as f64;
            let size =
                self.c.ln() / m.ln() + self.cn * (ntasks as f64).ln() / m.ln() + self.cp;
            self.subsetsize = (size as usize).max(2);
        }
        self.subsetsize = self.subsetsize.min(ntasks);

        info!("osm subset size: {}", self.subsetsize);
        self.subsettries = (npes as f64).powi(self.subsetsize as i32);
        info!("osm tries per round: {}", self.subsettries);
    }
}

/// Each round draws a random subset of non-static tasks and walks all
/// `npes^subsetsize` assignments of that subset, keeping improvements. The
/// subset shrinks after an improving round and grows on a stagnant one;
/// the search ends on stagnation at the maximum size.
pub fn optimal_subset_mapping(map: &Mapping, p: &OsmParams, ctx: &mut OptContext) -> Mapping {
    let ntasks = map.ntasks();
    let npes = map.arch.npes();

    assert!(p.subsetsize > 0 && p.subsetsize <= ntasks);

    let dynamic: Vec<usize> = (0..ntasks).filter(|&t| !map.is_static[t]).collect();
    let electable = dynamic.len();
    assert!(electable > 0, "no tasks to optimize");

    let maxsubsetsize = p.subsetsize.min(electable);

    let mut bestmap = map.fork();
    let mut bestcost = ctx.evaluate(&mut bestmap);
    let initialcost = bestcost;

    let mut newmap = map.fork();

    let mut iteration: u64 = 0;
    let mut round: u64 = 0;
    let mut subsetsize = 2usize;

    loop {
        let oldbestcost = bestcost;

        println!(
            "best_osm_cost_so_far {} {} {} {:.9} {:.3}",
            round,
            subsetsize,
            iteration,
            bestcost,
            initialcost / bestcost
        );

        // Draw the subset from the electable tasks and reset it to PE 0 so
        // the odometer walk below covers every assignment
        let elected: Vec<usize> = ctx
            .rng
            .random_cards(subsetsize, electable)
            .into_iter()
            .map(|i| dynamic[i])
            .collect();
        for &taskid in &elected {
            newmap.mappings[taskid] = 0;
        }

        loop {
            let cost = ctx.evaluate(&mut newmap);
            iteration += 1;

            if cost < bestcost {
                bestcost = cost;
                bestmap.copy_from(&newmap);
                println!(
                    "best_osm_cost_so_far {} {} {} {:.9} {:.3}",
                    round,
                    subsetsize,
                    iteration,
                    bestcost,
                    initialcost / bestcost
                );
            }

            // Odometer step over the elected subset in base npes
            let mut wrapped = true;
            for &taskid in &elected {
                let peid = (newmap.mappings[taskid] + 1) % npes;
                newmap.mappings[taskid] = peid;
                if peid != 0 {
                    wrapped = false;
                    break;
                }
            }
            if wrapped {
                break;
            }
        }

        newmap.copy_from(&bestmap);
        round += 1;

        if oldbestcost == bestcost {
            if subsetsize == maxsubsetsize {
                break;
            }
            subsetsize = (subsetsize + 1).min(maxsubsetsize);
        } else if subsetsize >= 3 {
            subsetsize -= 1;
        }
    }

    bestmap
}
