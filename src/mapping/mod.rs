//! # Mapping Module - The Task-to-PE Assignment Carrier
//!
//! A [`Mapping`] binds every task (or process) of the application to a
//! processing element and carries everything an evaluation produces: the
//! optional task-priority override table, the per-PE interconnect
//! arbitration priorities and the [`Schedule`](crate::schedule::Schedule)
//! child record that each simulator run fills in.
//!
//! Mappings are the only mutable value exchanged between the optimization
//! methods and the evaluators. `fork` produces an independently owned deep
//! copy; the architecture and the application model are shared through `Rc`
//! and are never mutated.

// Unit tests
pub mod tests;

use crate::app::Application;
use crate::arch::Architecture;
use crate::schedule::Schedule;
use crate::support::RandomSource;
use std::fmt::Write as _;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Mapping {
    pub arch: Rc<Architecture>,
    pub app: Rc<Application>,
    /// Current PE id per task
    pub mappings: Vec<usize>,
    /// Pinned tasks that `set_mapping` must not move
    pub is_static: Vec<bool>,
    /// Optional override of the schedule-derived task priorities
    pub task_priorities: Option<Vec<f64>>,
    /// Per-PE priority used by PRIORITY interconnect arbitration
    pub ic_priorities: Vec<i32>,
    /// Derived tables and results of the latest evaluation
    pub schedule: Schedule,
}

impl Mapping {
    /// Creates a mapping with every task on `default_pe`.
    pub fn new(arch: Rc<Architecture>, app: Rc<Application>, default_pe: usize) -> Mapping {
        assert!(default_pe < arch.npes());
        let ntasks = app.ntasks();
        let ic_priorities = arch.pes.iter().map(|pe| pe.ic_initial_priority).collect();
        let schedule = Schedule::new(&arch, &app);

        Mapping {
            arch,
            app,
            mappings: vec![default_pe; ntasks],
            is_static: vec![false; ntasks],
            task_priorities: None,
            ic_priorities,
            schedule,
        }
    }

    pub fn ntasks(&self) -> usize {
        self.mappings.len()
    }

    /// Deep copy sharing only the immutable architecture and application.
    pub fn fork(&self) -> Mapping {
        self.clone()
    }

    /// Overwrites this mapping's search state with `other`'s.
    pub fn copy_from(&mut self, other: &Mapping) {
        self.mappings.copy_from_slice(&other.mappings);
        self.ic_priorities.copy_from_slice(&other.ic_priorities);
        self.task_priorities = other.task_priorities.clone();
    }

    /// Assigns task `tid` to `peid` unless the task is pinned. Returns the
    /// PE the task is actually on afterwards.
    pub fn set_mapping(&mut self, tid: usize, peid: usize) -> usize {
        debug_assert!(peid < self.arch.npes());
        if !self.is_static[tid] {
            self.mappings[tid] = peid;
        }
        self.mappings[tid]
    }

    pub fn zero_mapping(&mut self) {
        for tid in 0..self.ntasks() {
            self.set_mapping(tid, 0);
        }
    }

    /// Assigns every non-static task a uniformly random PE.
    pub fn randomize_mapping(&mut self, rng: &mut RandomSource) {
        let npes = self.arch.npes();
        for tid in 0..self.ntasks() {
            let peid = rng.rand_int(0, npes);
            self.set_mapping(tid, peid);
        }
    }

    /// Moves `n` random tasks to a different PE drawn from `[0, npes)`.
    ///
    /// `npes` may be lower than the architecture's PE count when a method
    /// restricts move generation to a PE subset.
    pub fn randomize_n_task_mappings(&mut self, n: usize, npes: usize, rng: &mut RandomSource) {
        assert!(n > 0);
        if npes == 1 {
            return;
        }
        for _ in 0..n {
            let tid = rng.rand_int(0, self.ntasks());
            let mut peid = rng.rand_int(0, npes - 1);
            if peid >= self.mappings[tid] {
                peid += 1;
            }
            self.set_mapping(tid, peid);
        }
    }

    pub fn set_task_priority(&mut self, tid: usize, pri: f64) {
        let priorities = self
            .task_priorities
            .get_or_insert_with(|| vec![0.0; self.mappings.len()]);
        priorities[tid] = pri;
    }

    pub fn initialize_task_priorities(&mut self) {
        for tid in 0..self.ntasks() {
            self.set_task_priority(tid, 0.0);
        }
    }

    /// Assigns a random permutation of `0..ntasks` as task priorities.
    pub fn randomize_task_priorities(&mut self, rng: &mut RandomSource) {
        let ntasks = self.ntasks();
        let order = rng.random_cards(ntasks, ntasks);
        for (tid, &pri) in order.iter().enumerate() {
            self.set_task_priority(tid, pri as f64);
        }
    }

    /// Time to execute task `tid` on its currently mapped PE.
    pub fn task_computation_time(&self, tid: usize) -> f64 {
        let graph = self
            .app
            .as_stg()
            .expect("task computation time requires a task graph");
        let pe = &self.arch.pes[self.mappings[tid]];
        pe.computation_time(graph.tasks[tid].weight)
    }

    /// Communication time from `src` to `dst` over interconnect `icid`;
    /// zero when both are mapped to the same PE.
    pub fn specific_communication_time(&self, icid: usize, src: usize, dst: usize) -> f64 {
        if self.mappings[src] == self.mappings[dst] {
            return 0.0;
        }
        let graph = self.app.as_stg().expect("communication time requires a task graph");
        self.arch
            .communication_time(icid, graph.send_amount(src, dst) as u32)
    }

    /// Size of the mapping search space: `npes ^ (ntasks - nstatic)`.
    pub fn total_mappings(&self) -> f64 {
        let nstatic = self.is_static.iter().filter(|&&s| s).count();
        (self.arch.npes() as f64).powi((self.ntasks() - nstatic) as i32)
    }

    /// Size of the priority search space: `ntasks!`.
    pub fn total_schedules(&self) -> f64 {
        (2..=self.ntasks()).fold(1.0, |acc, i| acc * i as f64)
    }

    /// Task share per PE, e.g. "balance: 0.500 0.500".
    pub fn balance_line(&self) -> String {
        let npes = self.arch.npes();
        let mut counts = vec![0usize; npes];
        for &peid in &self.mappings {
            counts[peid] += 1;
        }
        let mut line = String::from("balance:");
        for count in counts {
            let _ = write!(line, " {:.3}", count as f64 / self.ntasks() as f64);
        }
        line
    }
}
