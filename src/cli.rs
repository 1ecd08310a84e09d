//! # CLI Module - Command Line Interface
//!
//! The tool reads the architecture, the application and the optimization
//! request from a model file (or stdin) and optimizes the task mapping:
//!
//! ```bash
//! taskmap model.txt
//! taskmap -f -o trace.bin model.txt
//! taskmap -a priority -i 021 --seed 42 < model.txt
//! ```
//!
//! Flags override parts of the model input: the interconnect arbitration
//! policy, the per-PE interconnect priorities, the simulated-annealing
//! mapping heuristic and free-form `name=value` method parameters.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model input file; stdin when omitted
    pub input: Option<PathBuf>,

    /// Override the interconnect arbitration policy
    /// (fifo, lifo, random, priority)
    #[arg(short = 'a', long = "arb-policy")]
    pub arb_policy: Option<String>,

    /// Apply fast pre-mapping before optimization
    #[arg(short = 'f', long = "fast-premapping")]
    pub fast_premapping: bool,

    /// Find the maximum objective value instead of the minimum
    #[arg(long = "find-maximum")]
    pub find_maximum: bool,

    /// Per-PE interconnect priorities as a digit string, e.g. 010
    #[arg(short = 'i', long = "ic-priorities")]
    pub ic_priorities: Option<String>,

    /// List the supported mapping heuristics and exit
    #[arg(short = 'l', long = "list-mapping-heuristics")]
    pub list_mapping_heuristics: bool,

    /// Mapping heuristic override for simulated annealing
    #[arg(short = 'm', long = "mapping-heuristics")]
    pub mapping_heuristics: Option<String>,

    /// Write a binary (objective, time) pair per evaluation to a file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Method parameter override as name=value; repeatable
    #[arg(short = 'p', long = "parameter")]
    pub parameter: Vec<String>,

    /// Write a JSON result summary to a file
    #[arg(long = "report")]
    pub report: Option<PathBuf>,

    /// Random seed for reproducible runs
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}
