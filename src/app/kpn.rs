//! Kahn process network model.

/// One instruction of a sequential process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpnInst {
    /// Execute `amount` operations on the mapped PE
    Compute { amount: u32 },
    /// Blocking read of one token from process `src`
    Read { src: usize },
    /// Write `amount` bytes to process `dst`
    Write { dst: usize, amount: u32 },
}

/// A sequential process: an ordered instruction stream.
#[derive(Debug, Clone)]
pub struct KpnProcess {
    pub id: usize,
    pub insts: Vec<KpnInst>,
}

/// An immutable process network.
#[derive(Debug)]
pub struct ProcessNetwork {
    pub processes: Vec<KpnProcess>,
}

impl ProcessNetwork {
    pub fn nprocesses(&self) -> usize {
        self.processes.len()
    }

    pub fn ninsts(&self) -> u64 {
        self.processes.iter().map(|p| p.insts.len() as u64).sum()
    }

    /// Total computation cycles over all COMPUTE instructions.
    pub fn total_cycles(&self) -> u64 {
        self.processes
            .iter()
            .flat_map(|p| p.insts.iter())
            .map(|inst| match inst {
                KpnInst::Compute { amount } => *amount as u64,
                _ => 0,
            })
            .sum()
    }

    /// Total bytes over all WRITE instructions.
    pub fn total_bytes(&self) -> u64 {
        self.processes
            .iter()
            .flat_map(|p| p.insts.iter())
            .map(|inst| match inst {
                KpnInst::Write { amount, .. } => *amount as u64,
                _ => 0,
            })
            .sum()
    }

    /// Sum of COMPUTE amounts for one process, used by the annealing
    /// temperature heuristic.
    pub fn process_cycles(&self, id: usize) -> f64 {
        self.processes[id]
            .insts
            .iter()
            .map(|inst| match inst {
                KpnInst::Compute { amount } => *amount as f64,
                _ => 0.0,
            })
            .sum()
    }
}
