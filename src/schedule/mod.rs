//! # Schedule Module - Discrete-Event Evaluators
//!
//! The evaluators replay the application on a candidate mapping and fill the
//! mapping's [`Schedule`] record with the schedule length, per-PE and per-IC
//! utilisations and interconnect arbitration statistics.
//!
//! Two evaluators exist: [`stg::schedule_stg`] replays a data-flow DAG with
//! b-level priorities and send partitioning, [`kpn::schedule_kpn`] replays
//! blocking read/write/compute instruction streams over FIFO channels. Both
//! are single-threaded event loops over a shared min-ordered event heap;
//! everything "waiting" is expressed as a future event.

pub mod kpn;
pub mod stg;

use crate::app::Application;
use crate::arch::Architecture;
use crate::mapping::Mapping;
use crate::schedule::kpn::InstRef;
use crate::support::{MaxHeap, RandomSource};
use std::cmp::Ordering;

/// Runs the evaluator matching the application model of `map`.
///
/// After the call `map.schedule` holds the results of the run. The random
/// source is only consulted by RANDOM interconnect arbitration.
pub fn evaluate(map: &mut Mapping, rng: &mut RandomSource) {
    let app = map.app.clone();
    match &*app {
        Application::Stg(_) => stg::schedule_stg(map),
        Application::Kpn(_) => kpn::schedule_kpn(map, rng),
    }
}

/// One partition of a task result: the destination tasks of the result that
/// share a single destination PE, so the partition needs at most one
/// interconnect transfer.
#[derive(Debug, Clone, Copy)]
pub struct SendPartition {
    /// How many partitions the owning result was split into
    pub n_partitions: u32,
    pub bytes: u32,
    pub dst_pe: usize,
    dst_start: u32,
    dst_len: u32,
}

/// Typed arena of send partitions, rebuilt from the current mapping before
/// every STG evaluation. Allocations are reused across evaluations.
#[derive(Debug, Clone)]
pub struct SendTable {
    partitions: Vec<SendPartition>,
    dst_tasks: Vec<u32>,
    /// result id -> (first partition, partition count)
    per_result: Vec<(u32, u32)>,
    // Scratch tables for the O(edges + PEs) rebuild. `pe_iter` marks which
    // entries are valid for the current result instead of clearing the
    // tables between results.
    pe_iter: Vec<u64>,
    pe_count: Vec<u32>,
    pe_cursor: Vec<u32>,
    used_pes: Vec<usize>,
    iteration: u64,
}

impl SendTable {
    pub fn new(nresults: usize, npes: usize) -> SendTable {
        SendTable {
            partitions: Vec::new(),
            dst_tasks: Vec::new(),
            per_result: vec![(0, 0); nresults],
            pe_iter: vec![0; npes],
            pe_count: vec![0; npes],
            pe_cursor: vec![0; npes],
            used_pes: Vec::with_capacity(npes),
            iteration: 0,
        }
    }

    /// Partitions of one result.
    pub fn partitions_of(&self, result_id: usize) -> (u32, u32) {
        self.per_result[result_id]
    }

    pub fn partition(&self, index: u32) -> SendPartition {
        self.partitions[index as usize]
    }

    /// Destination tasks of a partition; all are mapped to `dst_pe`.
    pub fn dsts(&self, part: &SendPartition) -> &[u32] {
        let start = part.dst_start as usize;
        &self.dst_tasks[start..start + part.dst_len as usize]
    }

    /// Re-partitions every result by the destination PEs of the given
    /// mapping.
    pub fn rebuild(&mut self, graph: &crate::app::stg::TaskGraph, mappings: &[usize]) {
        self.partitions.clear();
        self.dst_tasks.clear();

        for task in &graph.tasks {
            for (resind, result) in task.results.iter().enumerate() {
                let result_id = graph.result_id(task.id, resind);

                self.iteration += 1;
                self.used_pes.clear();
                for &dst in &result.dsts {
                    let peid = mappings[dst];
                    if self.pe_iter[peid] == self.iteration {
                        self.pe_count[peid] += 1;
                    } else {
                        self.pe_iter[peid] = self.iteration;
                        self.pe_count[peid] = 1;
                        self.used_pes.push(peid);
                    }
                }

                let part_start = self.partitions.len() as u32;
                let n_used = self.used_pes.len() as u32;
                let mut dst_off = self.dst_tasks.len() as u32;

                for &peid in &self.used_pes {
                    self.partitions.push(SendPartition {
                        n_partitions: n_used,
                        bytes: result.bytes,
                        dst_pe: peid,
                        dst_start: dst_off,
                        dst_len: self.pe_count[peid],
                    });
                    self.pe_cursor[peid] = dst_off;
                    dst_off += self.pe_count[peid];
                }

                self.dst_tasks.resize(dst_off as usize, 0);
                for &dst in &result.dsts {
                    let peid = mappings[dst];
                    self.dst_tasks[self.pe_cursor[peid] as usize] = dst as u32;
                    self.pe_cursor[peid] += 1;
                }

                self.per_result[result_id] = (part_start, n_used);
            }
        }
    }
}

/// Derived tables and evaluation results carried inside a Mapping.
///
/// `tsort` is computed once at construction (the topology does not depend on
/// the mapping); `pri`, `latencies` and the send table are refreshed by every
/// STG evaluation. The remaining fields are outputs of the latest run.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Children-first topological order of the task graph
    pub tsort: Vec<usize>,
    /// B-level priority per task
    pub pri: Vec<f64>,
    /// Result-dispatch latency per task, in seconds
    pub latencies: Vec<f64>,
    pub send_table: SendTable,
    /// Unsent-partition count per result, for output-memory accounting
    pub result_refs: Vec<u32>,

    pub schedule_length: f64,
    pub pe_utilisations: Vec<f64>,
    pub ic_utilisations: Vec<f64>,

    /// Number of interconnect arbitration decisions
    pub arbs: i64,
    /// Average transfer-queue length at decision time
    pub arb_avg_in_queue: f64,
    /// Average wait between transfer issue and grant
    pub arb_avg_time: f64,
}

impl Schedule {
    pub fn new(arch: &Architecture, app: &Application) -> Schedule {
        let (tsort, nresults, ntasks) = match app {
            Application::Stg(graph) => (topological_sort(graph), graph.nresults(), graph.ntasks()),
            Application::Kpn(net) => (Vec::new(), 0, net.nprocesses()),
        };

        Schedule {
            tsort,
            pri: vec![0.0; ntasks],
            latencies: vec![0.0; ntasks],
            send_table: SendTable::new(nresults, arch.npes()),
            result_refs: vec![0; nresults],
            schedule_length: 0.0,
            pe_utilisations: vec![0.0; arch.npes()],
            ic_utilisations: vec![0.0; arch.nics()],
            arbs: 0,
            arb_avg_in_queue: 0.0,
            arb_avg_time: 0.0,
        }
    }

    pub(crate) fn init_utilisations(&mut self) {
        self.pe_utilisations.iter_mut().for_each(|u| *u = 0.0);
        self.ic_utilisations.iter_mut().for_each(|u| *u = 0.0);
        self.arbs = 0;
        self.arb_avg_time = 0.0;
        self.arb_avg_in_queue = 0.0;
    }

    /// Converts accumulated busy times into utilisations in [0, 1] and the
    /// arbitration sums into averages.
    pub(crate) fn finalize_utilisations(&mut self) {
        assert!(self.schedule_length > 0.0);
        let len = self.schedule_length;
        self.pe_utilisations.iter_mut().for_each(|u| *u /= len);
        self.ic_utilisations.iter_mut().for_each(|u| *u /= len);
        if self.arbs > 0 {
            self.arb_avg_time /= self.arbs as f64;
            self.arb_avg_in_queue /= self.arbs as f64;
        }
    }

    /// Area, static energy and dynamic energy of the last run.
    ///
    /// Static energy is `T * area * fmax`; dynamic energy is `T * k` times
    /// the utilisation-weighted sum of `area * freq` over all PEs and ICs.
    pub fn energy(&self, arch: &Architecture, power_k: f64) -> (f64, f64, f64) {
        let t = self.schedule_length;
        assert!(t > 0.0);
        assert!(power_k >= 0.0);

        let mut area = 0.0;
        let mut fmax: f64 = 0.0;
        let mut dyn_power = 0.0;

        for (pe, util) in arch.pes.iter().zip(&self.pe_utilisations) {
            area += pe.area;
            fmax = fmax.max(pe.freq as f64);
            dyn_power += pe.area * pe.freq as f64 * util;
        }
        for (ic, util) in arch.ics.iter().zip(&self.ic_utilisations) {
            area += ic.area;
            fmax = fmax.max(ic.freq as f64);
            dyn_power += ic.area * ic.freq as f64 * util;
        }

        (area, t * area * fmax, t * power_k * dyn_power)
    }
}

/// Children-first topological sort.
///
/// Exit tasks come first; a parent is appended once all of its children are
/// already in the order. For every edge (parent, child) the parent therefore
/// appears after the child, which lets b-level priorities be computed in one
/// forward pass.
pub fn topological_sort(graph: &crate::app::stg::TaskGraph) -> Vec<usize> {
    let ntasks = graph.ntasks();
    let mut order = Vec::with_capacity(ntasks);
    let mut placed_children = vec![0usize; ntasks];

    for task in &graph.tasks {
        if task.out_peers.is_empty() {
            order.push(task.id);
        }
    }

    let mut next = 0;
    while next < order.len() {
        let task = &graph.tasks[order[next]];
        for &parent in &task.parents {
            placed_children[parent] += 1;
            if placed_children[parent] == graph.tasks[parent].out_peers.len() {
                order.push(parent);
            }
        }
        next += 1;
    }

    assert_eq!(order.len(), ntasks, "task graph contains a cycle");
    order
}

/// Simulation events, ordered by ascending time through an inverted
/// max-heap comparison.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Event {
    pub time: f64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum EventKind {
    /// A transfer on interconnect `ic` completed
    CommFin { ic: usize, index: usize },
    /// The task running on PE `pe` completed
    CompFin { pe: usize, inst: Option<InstRef> },
    /// Interconnect `ic` (or, for `None`, the earliest free one) may start a
    /// queued transfer
    IcReady { ic: Option<usize> },
    /// PE `pe` may start its highest-priority ready task
    PeReady { pe: usize },
}

pub(crate) fn compare_event(a: &Event, b: &Event) -> Ordering {
    // Inverted so extract_max returns the earliest event
    b.time.partial_cmp(&a.time).unwrap()
}

pub(crate) fn new_event_heap() -> MaxHeap<Event> {
    MaxHeap::new(compare_event)
}

/// A ready task and the priority it competes with on its PE.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TaskPri {
    pub pri: f64,
    pub task_id: usize,
}

pub(crate) fn compare_task_pri(a: &TaskPri, b: &TaskPri) -> Ordering {
    a.pri.partial_cmp(&b.pri).unwrap()
}

/// Per-PE simulation state: the busy flag, the end of the latest queued
/// work, the running task and the ready queue.
pub(crate) struct PeState {
    pub busy: bool,
    pub last_end_time: f64,
    pub task_id: usize,
    pub ready: MaxHeap<TaskPri>,
}

impl PeState {
    pub fn new() -> PeState {
        PeState {
            busy: false,
            last_end_time: 0.0,
            task_id: usize::MAX,
            ready: MaxHeap::new(compare_task_pri),
        }
    }

    pub fn earliest_free_slot(&self, curtime: f64) -> f64 {
        debug_assert!(curtime >= 0.0);
        curtime.max(self.last_end_time)
    }

    pub fn queue_work(&mut self, curtime: f64, duration: f64, task_id: usize) {
        debug_assert!(curtime >= 0.0);
        debug_assert!(duration > 0.0);
        let start = curtime.max(self.last_end_time);
        self.last_end_time = start + duration;
        assert!(!self.busy);
        self.busy = true;
        self.task_id = task_id;
    }
}

pub(crate) fn init_pe_states(npes: usize) -> Vec<PeState> {
    (0..npes).map(|_| PeState::new()).collect()
}

/// Queues `task_id` on its PE's ready heap, honoring the task-priority
/// override table when present.
pub(crate) fn task_ready(
    pss: &mut [PeState],
    peid: usize,
    pri: f64,
    task_id: usize,
    overrides: Option<&[f64]>,
) {
    let pri = overrides.map_or(pri, |table| table[task_id]);
    pss[peid].ready.insert(TaskPri { pri, task_id });
}
