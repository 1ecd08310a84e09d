//! Fast pre-mapping: a cheap warm start that assigns whole dependency
//! chains to single PEs before the actual optimization method runs.

use crate::app::Application;
use crate::mapping::Mapping;
use crate::optimize::OptContext;
use log::info;

/// Resets every task to PE 0, then walks backwards from every exit task.
/// At each step the parents are visited in random order; the first parent
/// inherits its child's PE and the remaining parents get random PEs, so
/// one chain per exit stays co-located.
pub fn fast_premapping(original: &Mapping, initial: f64, ctx: &mut OptContext) -> Mapping {
    let mut map = original.fork();

    let app = map.app.clone();
    let Application::Stg(graph) = &*app else {
        panic!("fast premapping requires a task graph");
    };

    let ntasks = map.ntasks();
    let npes = map.arch.npes();

    let mut visited = vec![false; ntasks];
    let mut lifo: Vec<usize> = Vec::with_capacity(ntasks);

    for taskid in 0..ntasks {
        map.set_mapping(taskid, 0);
    }

    for task in &graph.tasks {
        if !task.out_peers.is_empty() || visited[task.id] {
            continue;
        }

        visited[task.id] = true;
        lifo.push(task.id);

        while let Some(taskid) = lifo.pop() {
            let parents = &graph.tasks[taskid].parents;
            if parents.is_empty() {
                continue;
            }

            let order = ctx.rng.random_cards(parents.len(), parents.len());
            for (i, &slot) in order.iter().enumerate() {
                let parent = parents[slot];
                if visited[parent] {
                    continue;
                }

                let peid = if i == 0 {
                    map.mappings[taskid]
                } else {
                    ctx.rng.rand_int(0, npes)
                };
                map.set_mapping(parent, peid);

                visited[parent] = true;
                lifo.push(parent);
            }
        }
    }

    let objective = ctx.evaluate(&mut map);
    info!(
        "objective after fast premapping: {:.9} (gain {:.3})",
        objective,
        initial / objective
    );

    map
}
