//! # Architecture Module - Processing Elements and Interconnects
//!
//! The hardware platform model: processing elements (PEs) that execute tasks
//! and interconnects (ICs) that carry messages between them. The model is
//! deliberately coarse: a PE is characterized by its clock frequency, a
//! performance factor and fixed-plus-per-byte send/copy costs; an IC by its
//! frequency, width, latency and arbitration policy.
//!
//! An [`Architecture`] is immutable after construction and is shared by all
//! mapping forks during optimization.

// Unit tests
pub mod tests;

use serde::Serialize;

/// A processing element.
#[derive(Debug, Clone, Serialize)]
pub struct Pe {
    pub id: usize,
    /// Clock frequency in Hz
    pub freq: i64,
    /// Fixed cost in cycles of launching a send to another PE
    pub send_latency: u32,
    /// Additional send cost in cycles per byte
    pub per_byte_send_cost: f64,
    /// Fixed cost in cycles of a local copy between tasks on this PE
    pub copy_latency: u32,
    /// Additional copy cost in cycles per byte
    pub per_byte_copy_cost: f64,
    /// Relative speed multiplier applied to the clock frequency
    pub performance_factor: f64,
    pub area: f64,
    /// Starting priority for PRIORITY interconnect arbitration
    pub ic_initial_priority: i32,
}

impl Pe {
    /// Time in seconds to execute `operations` operations on this PE.
    pub fn computation_time(&self, operations: f64) -> f64 {
        operations / (self.performance_factor * self.freq as f64)
    }

    /// Cycles to copy `amount` bytes to a task on the same PE.
    pub fn copy_cost(&self, amount: u32) -> u32 {
        self.copy_latency + (self.per_byte_copy_cost * amount as f64).ceil() as u32
    }

    /// Cycles to push `amount` bytes toward an interconnect.
    pub fn send_cost(&self, amount: u32) -> u32 {
        self.send_latency + (self.per_byte_send_cost * amount as f64).ceil() as u32
    }
}

/// Interconnect arbitration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arbitration {
    Fifo,
    Lifo,
    Random,
    Priority,
}

impl Arbitration {
    pub fn from_name(name: &str) -> Option<Arbitration> {
        match name {
            "fifo" => Some(Arbitration::Fifo),
            "lifo" => Some(Arbitration::Lifo),
            "random" => Some(Arbitration::Random),
            "priority" => Some(Arbitration::Priority),
            _ => None,
        }
    }
}

/// An interconnect (bus).
#[derive(Debug, Clone, Serialize)]
pub struct Interconnect {
    pub id: usize,
    /// Clock frequency in Hz
    pub freq: i64,
    pub area: f64,
    /// Width in bits
    pub width: u32,
    /// Fixed transfer latency in cycles
    pub latency: u32,
    pub policy: Arbitration,
}

/// An immutable collection of PEs and ICs.
///
/// All ICs must share frequency, width and latency: the evaluators estimate
/// communication priorities with IC 0 and the invariant keeps that estimate
/// valid for whichever IC a transfer actually lands on.
#[derive(Debug, Clone, Serialize)]
pub struct Architecture {
    pub pes: Vec<Pe>,
    pub ics: Vec<Interconnect>,
}

impl Architecture {
    pub fn npes(&self) -> usize {
        self.pes.len()
    }

    pub fn nics(&self) -> usize {
        self.ics.len()
    }

    /// Time in seconds to move `amount` bytes over interconnect `icid`.
    pub fn communication_time(&self, icid: usize, amount: u32) -> f64 {
        let ic = &self.ics[icid];
        let cycles = ic.latency + (amount * 8).div_ceil(ic.width);
        cycles as f64 / ic.freq as f64
    }

    /// Checks the symmetric-bus invariant. Returns the offending IC id on
    /// failure.
    pub fn check_symmetric_ics(&self) -> Result<(), usize> {
        let Some(first) = self.ics.first() else {
            return Ok(());
        };
        for ic in &self.ics[1..] {
            if ic.freq != first.freq || ic.width != first.width || ic.latency != first.latency {
                return Err(ic.id);
            }
        }
        Ok(())
    }
}
