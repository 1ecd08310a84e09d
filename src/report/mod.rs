//! # Report Module - Result Output
//!
//! Three output surfaces for a finished optimization run:
//!
//! - the human-readable `key: value` result block on stdout,
//! - the packed binary per-evaluation trace (one `(objective, time)` pair
//!   of 32-bit floats per evaluation), and
//! - an optional JSON summary of the run.

// Unit tests
pub mod tests;

use crate::app::Application;
use crate::config::Config;
use crate::mapping::Mapping;
use crate::optimize::{OptContext, OptimizationSpec, RunResult, TraceFrame};
use crate::schedule::stg::stg_graph_stats;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn epoch_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// Prints the full result block of a finished run.
pub fn print_result(
    best: &mut Mapping,
    original: &Mapping,
    spec: &OptimizationSpec,
    config: &Config,
    ctx: &OptContext,
    result: &RunResult,
) {
    assert!(result.initial > 0.0);
    assert!(result.best > 0.0);
    let gain = result.initial / result.best;

    println!("objective_function: {}", spec.objective.name());
    println!("power_k: {:e}", spec.objective.power_k());
    println!("optimization_method: {}", spec.method_name);

    match spec.sa_params() {
        Some(sa) => {
            println!("sa_heuristics: {}", sa.heuristic.name());
            println!("sa_schedule_max: {}", sa.schedule_max);
            println!("sa_max_rejects: {}", sa.max_rejects);
            println!("sa_zero_transition_prob: {:e}", sa.zero_transition_prob);
        }
        None => {
            println!("sa_heuristics: None");
            println!("sa_schedule_max: -1");
            println!("sa_max_rejects: -1");
            println!("sa_zero_transition_prob: -1");
        }
    }

    println!("ntasks: {}", best.ntasks());

    if matches!(&*best.app, Application::Stg(_)) {
        stg_graph_stats(best);
    }

    println!("pes: {}", best.arch.npes());
    print!("pe_utilisations: ");
    let mut total = 0.0;
    for utilisation in &best.schedule.pe_utilisations {
        print!("{:.3} ", utilisation);
        total += utilisation;
    }
    println!();
    println!(
        "total_pe_utilisation: {:.3}",
        total / best.arch.npes() as f64
    );

    print!("ic_utilisations: ");
    let mut total = 0.0;
    for utilisation in &best.schedule.ic_utilisations {
        print!("{:.3} ", utilisation);
        total += utilisation;
    }
    println!();
    println!(
        "total_ic_utilisation: {:.3}",
        if best.arch.nics() > 0 {
            total / best.arch.nics() as f64
        } else {
            0.0
        }
    );

    print!("mapping_list {} ", best.ntasks());
    let mut nchanged = 0;
    for (taskid, &peid) in best.mappings.iter().enumerate() {
        print!("map {} {} ", taskid, peid);
        if peid != original.mappings[taskid] {
            nchanged += 1;
        }
    }
    println!();
    println!("changed_mappings: {}", nchanged);

    if let Some(priorities) = &best.task_priorities {
        print!("task_priorities: ");
        for priority in priorities {
            print!("{} ", priority);
        }
        println!();
    }

    println!("{}", best.balance_line());
    println!(
        "data_file: {}",
        config
            .output_file
            .as_ref()
            .map_or(String::new(), |p| p.display().to_string())
    );
    println!("initial_objective: {:.9}", result.initial);
    println!("initial_time: {:.9}", result.initial_time);
    println!("best_objective: {:.9}", result.best);
    println!("best_time: {:.9}", result.best_time);
    println!("gain: {:.3}", gain);
    println!("time_gain: {:.3}", result.initial_time / result.best_time);

    let (area, static_e, dynamic_e) = best
        .schedule
        .energy(&best.arch, spec.objective.power_k());
    println!("static_energy: {:e}", static_e);
    println!("dynamic_energy: {:e}", dynamic_e);
    println!(
        "static_energy_proportion: {:.3}",
        static_e / (static_e + dynamic_e)
    );
    println!("total_energy: {:e}", static_e + dynamic_e);
    println!("area: {:e}", area);

    println!("evaluations: {}", ctx.evals);
    println!("optimization_time: {:.6}", result.elapsed.as_secs_f64());
    println!("optimization_started: {}", epoch_seconds(result.started_at));
    println!("optimization_ended: {}", epoch_seconds(result.ended_at));
}

/// Writes the per-evaluation trace as packed little-endian
/// `(objective: f32, time: f32)` pairs.
pub fn write_trace(path: &Path, frames: &[TraceFrame]) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for frame in frames {
        bincode::serialize_into(&mut writer, frame)?;
    }

    Ok(())
}

/// JSON export of the result record.
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub objective_function: &'a str,
    pub optimization_method: &'a str,
    pub ntasks: usize,
    pub npes: usize,
    pub initial_objective: f64,
    pub initial_time: f64,
    pub best_objective: f64,
    pub best_time: f64,
    pub gain: f64,
    pub evaluations: u64,
    pub pe_utilisations: &'a [f64],
    pub ic_utilisations: &'a [f64],
    pub mappings: &'a [usize],
}

impl<'a> ReportSummary<'a> {
    pub fn new(
        best: &'a Mapping,
        spec: &'a OptimizationSpec,
        ctx: &OptContext,
        result: &RunResult,
    ) -> ReportSummary<'a> {
        ReportSummary {
            objective_function: spec.objective.name(),
            optimization_method: &spec.method_name,
            ntasks: best.ntasks(),
            npes: best.arch.npes(),
            initial_objective: result.initial,
            initial_time: result.initial_time,
            best_objective: result.best,
            best_time: result.best_time,
            gain: result.initial / result.best,
            evaluations: ctx.evals,
            pe_utilisations: &best.schedule.pe_utilisations,
            ic_utilisations: &best.schedule.ic_utilisations,
            mappings: &best.mappings,
        }
    }
}

/// Writes the JSON result summary.
pub fn write_report(path: &Path, summary: &ReportSummary) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}
