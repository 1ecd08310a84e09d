//! Brute force over the mapping space, the task-priority permutation
//! space, or both.

use crate::mapping::Mapping;
use crate::optimize::OptContext;
use crate::support::Permutation;

pub const OPT_MAPPING: u32 = 1;
pub const OPT_SCHEDULING: u32 = 2;
pub const OPT_SCHEDULING_FIRST: u32 = 4;

/// Earlier tasks in the permutation get higher priorities.
fn copy_permutation(map: &mut Mapping, p: &Permutation) {
    let ntasks = map.ntasks();
    for (i, &taskid) in p.current().iter().enumerate() {
        map.set_task_priority(taskid, (ntasks - i) as f64);
    }
}

/// Advances the mapping odometer over non-static tasks. Returns true when
/// the whole space has wrapped around.
fn mapping_step(map: &mut Mapping) -> bool {
    let ntasks = map.ntasks();
    let npes = map.arch.npes();

    for i in 0..ntasks {
        if map.is_static[i] {
            continue;
        }
        let newpe = (map.mappings[i] + 1) % npes;
        if map.set_mapping(i, newpe) != 0 {
            return false;
        }
    }
    true
}

/// Advances to the next priority permutation. Returns true when the
/// permutation space has wrapped around.
fn scheduling_step(map: &mut Mapping, p: &mut Permutation) -> bool {
    let wrapped = !p.next();
    if wrapped {
        p.reset();
    }
    copy_permutation(map, p);
    wrapped
}

/// One combined step over the selected spaces. Returns true when all
/// selected spaces are exhausted.
fn increment(map: &mut Mapping, permutation: &mut Option<Permutation>, flags: u32) -> bool {
    if flags & OPT_SCHEDULING != 0 && flags & OPT_SCHEDULING_FIRST != 0 {
        let wrapped = scheduling_step(map, permutation.as_mut().unwrap());
        if !wrapped {
            return false;
        }
    }

    if flags & OPT_MAPPING != 0 {
        let wrapped = mapping_step(map);
        if !wrapped {
            return false;
        }
    }

    if flags & OPT_SCHEDULING != 0 && flags & OPT_SCHEDULING_FIRST == 0 {
        return scheduling_step(map, permutation.as_mut().unwrap());
    }

    true
}

/// Exhaustively walks the selected search spaces and returns the best
/// mapping found. Only meaningful in minimize mode.
pub fn brute_force(oldmap: &Mapping, initial: f64, flags: u32, ctx: &mut OptContext) -> Mapping {
    assert!(!ctx.find_maximum, "brute force does not support maximization");

    let mut map = oldmap.fork();
    let mut permutation = None;
    let mut maxi = 1.0;

    if flags & OPT_MAPPING != 0 {
        map.zero_mapping();
        maxi *= map.total_mappings();
        println!("brute_force_mappings: {:e}", map.total_mappings());
    }

    if flags & OPT_SCHEDULING != 0 {
        map.initialize_task_priorities();
        let p = Permutation::new(map.ntasks());
        copy_permutation(&mut map, &p);
        permutation = Some(p);
        maxi *= map.total_schedules();
        println!("brute_force_schedules: {:e}", map.total_schedules());
    }

    println!("brute_force_iterations: {:e}", maxi);

    let mut bestmap = map.fork();
    let mut bestcost = ctx.evaluate(&mut bestmap);

    let mut noptimums: u64 = 1;
    let mut optimum_iteration: u64 = 0;
    let mut i: u64 = 0;
    let mut old_percent = 0;

    loop {
        let cost = ctx.evaluate(&mut map);

        if cost == bestcost {
            noptimums += 1;
        }
        if cost < bestcost {
            bestcost = cost;
            optimum_iteration = i;
            bestmap.copy_from(&map);
            noptimums = 1;
        }

        let percent = (i as f64 / maxi * 100.0) as u32;
        if percent != old_percent {
            old_percent = percent;
            println!(
                "p: {}% i: {} best_cost: {:.9} best_gain: {:.3}",
                percent,
                i,
                bestcost,
                initial / bestcost
            );
        }
        i += 1;

        if increment(&mut map, &mut permutation, flags) {
            break;
        }
    }

    println!("noptimums: {}", noptimums);
    println!(
        "optimumiteration: {} ({}%)",
        optimum_iteration,
        (100.0 * optimum_iteration as f64 / maxi) as u32
    );

    bestmap
}
