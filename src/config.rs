//! Run-wide configuration assembled from the command line.
//!
//! Threaded explicitly through the input reader, the orchestrator and the
//! method parameter readers; there is no global state.

use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct Config {
    /// Maximize the objective instead of minimizing it
    pub find_maximum: bool,
    /// Apply fast pre-mapping before the optimization method
    pub fast_premapping: bool,
    /// Override the arbitration policy of every interconnect
    pub arbitration_policy: Option<String>,
    /// Per-PE interconnect priorities as a digit string
    pub ic_priorities: Option<String>,
    /// `name=value` overrides consumed by the method parameter readers
    pub parameters: Vec<(String, String)>,
    /// The last raw `-p` string, for methods taking positional parameters
    pub raw_parameter: Option<String>,
    /// Mapping-heuristic override for simulated annealing
    pub sa_heuristic: Option<String>,
    /// Binary per-evaluation trace output
    pub output_file: Option<PathBuf>,
    /// JSON result summary output
    pub report_file: Option<PathBuf>,
    /// Explicit random seed for reproducible runs
    pub seed: Option<u64>,
}

impl Config {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn parameter_i64(&self, name: &str) -> Option<i64> {
        self.parameter(name)?.parse().ok()
    }

    pub fn parameter_u64(&self, name: &str) -> Option<u64> {
        self.parameter(name)?.parse().ok()
    }
}
