//! # Application Module - Task Graphs and Process Networks
//!
//! The two application models the tool can schedule:
//!
//! - a static task graph ([`stg::TaskGraph`]): a data-flow DAG of weighted
//!   tasks whose results are sent to fixed destination tasks, and
//! - a Kahn process network ([`kpn::ProcessNetwork`]): sequential processes
//!   that compute, write to other processes and block on reads from
//!   unbounded FIFOs.
//!
//! [`Application`] is the sum type over both; the evaluator and the result
//! report dispatch over it. A parsed application is immutable and shared by
//! every mapping fork.

pub mod kpn;
pub mod stg;
// Unit tests
pub mod tests;

use crate::app::kpn::ProcessNetwork;
use crate::app::stg::TaskGraph;

/// The application under optimization: exactly one of the two models.
#[derive(Debug)]
pub enum Application {
    Stg(TaskGraph),
    Kpn(ProcessNetwork),
}

impl Application {
    pub fn name(&self) -> &'static str {
        match self {
            Application::Stg(_) => "stg",
            Application::Kpn(_) => "kpn",
        }
    }

    /// Number of schedulable units (tasks or processes).
    pub fn ntasks(&self) -> usize {
        match self {
            Application::Stg(graph) => graph.tasks.len(),
            Application::Kpn(net) => net.processes.len(),
        }
    }

    pub fn as_stg(&self) -> Option<&TaskGraph> {
        match self {
            Application::Stg(graph) => Some(graph),
            Application::Kpn(_) => None,
        }
    }

    pub fn as_kpn(&self) -> Option<&ProcessNetwork> {
        match self {
            Application::Kpn(net) => Some(net),
            Application::Stg(_) => None,
        }
    }
}
