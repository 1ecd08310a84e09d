//! Move history ring and the mapping-mutation heuristics.

use crate::app::Application;
use crate::mapping::Mapping;
use crate::support::RandomSource;

/// One recorded move: the objective that was accepted at the time and the
/// objective the move produced.
#[derive(Debug, Clone, Copy)]
struct OptMove {
    accepted: f64,
    new: f64,
}

/// Circular history of the most recent moves.
///
/// Adaptive heuristics read the empirical worse/same/better shares of the
/// filled window to decide how aggressively to mutate.
pub struct OptState {
    size: usize,
    pos: usize,
    moves: Vec<OptMove>,
}

/// Empirical move-outcome shares over the history window.
#[derive(Debug, Clone, Copy)]
pub struct MoveProbabilities {
    pub pworse: f64,
    pub psame: f64,
    pub pbetter: f64,
}

impl OptState {
    pub fn new(size: usize) -> OptState {
        assert!(size > 0);
        OptState {
            size,
            pos: 0,
            moves: Vec::with_capacity(size),
        }
    }

    pub fn append(&mut self, accepted: f64, new: f64) {
        let entry = OptMove { accepted, new };
        if self.moves.len() < self.size {
            self.moves.push(entry);
            self.pos = self.moves.len() - 1;
        } else {
            self.pos = (self.pos + 1) % self.size;
            self.moves[self.pos] = entry;
        }
    }

    /// Move-outcome shares, available once at least 10 moves are recorded.
    pub fn probabilities(&self) -> Option<MoveProbabilities> {
        let n = self.moves.len();
        if n < 10 {
            return None;
        }

        let mut worse = 0usize;
        let mut same = 0usize;
        let mut better = 0usize;
        for entry in &self.moves {
            if entry.new < entry.accepted {
                better += 1;
            } else if entry.new == entry.accepted {
                same += 1;
            } else {
                worse += 1;
            }
        }

        Some(MoveProbabilities {
            pworse: worse as f64 / n as f64,
            psame: same as f64 / n as f64,
            pbetter: better as f64 / n as f64,
        })
    }
}

/// Decides between moving one or two tasks from the move-history shares.
///
/// The escalation to two tasks fires when the history is neither clearly
/// productive nor clearly hopeless.
pub fn adaptive_task_count(ps: &MoveProbabilities) -> usize {
    let c1 = ps.psame == 0.0 && ps.pbetter < 0.5;
    let c2 = ps.pworse >= 0.75;
    let c3 = ps.psame >= 0.25;
    let c4 = ps.pworse <= 0.25;
    if !c1 && !c2 && (c3 || c4) { 2 } else { 1 }
}

/// The mapping-mutation heuristics selectable for simulated annealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveHeuristic {
    /// Chain setting through every parent
    ChainMultiple,
    /// Chain setting through a single random parent per step
    ChainSingle,
    /// Reassign one random task
    Rm,
    /// Reassign `max(1, floor(T * ntasks))` random tasks
    Rmdt,
    /// Reassign one task, or two when the move history suggests it
    RmAdaptive,
}

pub const HEURISTIC_NAMES: &[(&str, MoveHeuristic)] = &[
    ("csm", MoveHeuristic::ChainMultiple),
    ("css", MoveHeuristic::ChainSingle),
    ("rm", MoveHeuristic::Rm),
    ("rmdt", MoveHeuristic::Rmdt),
    ("rm-adaptive", MoveHeuristic::RmAdaptive),
];

impl MoveHeuristic {
    pub fn from_name(name: &str) -> Option<MoveHeuristic> {
        HEURISTIC_NAMES
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, heuristic)| *heuristic)
    }

    pub fn name(&self) -> &'static str {
        HEURISTIC_NAMES
            .iter()
            .find(|(_, heuristic)| heuristic == self)
            .map(|(name, _)| *name)
            .unwrap()
    }
}

/// Produces the next candidate into `dst` by mutating a copy of `src`.
///
/// `npes` bounds the PEs that moves may target; it is the architecture's PE
/// count unless the caller restricts move generation to a PE subset.
pub fn apply_move(
    heuristic: MoveHeuristic,
    dst: &mut Mapping,
    src: &Mapping,
    temperature: f64,
    os: &OptState,
    npes: usize,
    rng: &mut RandomSource,
) {
    match heuristic {
        MoveHeuristic::Rm => {
            dst.copy_from(src);
            dst.randomize_n_task_mappings(1, npes, rng);
        }
        MoveHeuristic::Rmdt => {
            dst.copy_from(src);
            let n = ((temperature * dst.ntasks() as f64).floor() as usize).max(1);
            dst.randomize_n_task_mappings(n, npes, rng);
        }
        MoveHeuristic::RmAdaptive => {
            let n = os.probabilities().map_or(1, |ps| adaptive_task_count(&ps));
            dst.copy_from(src);
            dst.randomize_n_task_mappings(n, npes, rng);
        }
        MoveHeuristic::ChainSingle => chain_setting(dst, src, npes, true, rng),
        MoveHeuristic::ChainMultiple => chain_setting(dst, src, npes, false, rng),
    }
}

/// Chain setting: picks a random anchor task and a random target PE, then
/// walks backwards through parents up to a random depth bound
/// `-floor(log2(u))`, assigning the target PE to every visited task.
fn chain_setting(
    dst: &mut Mapping,
    src: &Mapping,
    npes: usize,
    single_parent: bool,
    rng: &mut RandomSource,
) {
    dst.copy_from(src);
    if npes == 1 {
        return;
    }

    let mut u = rng.rand_double(0.0, 1.0);
    if u == 0.0 {
        u = 0.5;
    }
    let max_depth = -(u.ln() / 2.0f64.ln()).floor() as i64;

    let peid = rng.rand_int(0, npes);
    let ntasks = dst.ntasks();
    let app = dst.app.clone();

    let mut assigned = vec![false; ntasks];
    let mut lifo = vec![(rng.rand_int(0, ntasks), 1i64)];

    while let Some((taskid, depth)) = lifo.pop() {
        dst.set_mapping(taskid, peid);
        if depth >= max_depth {
            continue;
        }

        let parents: &[usize] = match &*app {
            Application::Stg(graph) => &graph.tasks[taskid].parents,
            Application::Kpn(_) => &[],
        };
        if single_parent {
            if !parents.is_empty() {
                let parent = parents[rng.rand_int(0, parents.len())];
                if !assigned[parent] {
                    assigned[parent] = true;
                    lifo.push((parent, depth + 1));
                }
            }
        } else {
            for &parent in parents {
                if !assigned[parent] {
                    assigned[parent] = true;
                    lifo.push((parent, depth + 1));
                }
            }
        }
    }
}
