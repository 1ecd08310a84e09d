//! Criterion benchmark for the STG evaluator: the hot path of every
//! optimization method.

use criterion::{Criterion, criterion_group, criterion_main};
use mapping_lib::app::Application;
use mapping_lib::app::stg::{TaskGraph, TaskResult};
use mapping_lib::arch::{Arbitration, Architecture, Interconnect, Pe};
use mapping_lib::mapping::Mapping;
use mapping_lib::schedule::evaluate;
use mapping_lib::support::RandomSource;
use std::hint::black_box;
use std::rc::Rc;

fn bench_arch(npes: usize) -> Rc<Architecture> {
    let pes = (0..npes)
        .map(|id| Pe {
            id,
            freq: 50_000_000,
            send_latency: 8,
            per_byte_send_cost: 0.5,
            copy_latency: 2,
            per_byte_copy_cost: 0.125,
            performance_factor: 1.0,
            area: 1e-6,
            ic_initial_priority: 0,
        })
        .collect();
    Rc::new(Architecture {
        pes,
        ics: vec![Interconnect {
            id: 0,
            freq: 50_000_000,
            area: 1e-6,
            width: 32,
            latency: 4,
            policy: Arbitration::Fifo,
        }],
    })
}

/// Layered random DAG: `layers` layers of `width` tasks, each task feeding
/// two tasks of the next layer.
fn layered_graph(layers: usize, width: usize) -> TaskGraph {
    let mut raw = Vec::new();
    for layer in 0..layers {
        for slot in 0..width {
            let results = if layer + 1 < layers {
                let base = (layer + 1) * width;
                vec![TaskResult {
                    bytes: 64,
                    dsts: vec![base + slot, base + (slot + 1) % width],
                }]
            } else {
                vec![]
            };
            raw.push((1000.0 + (slot as f64) * 10.0, results));
        }
    }
    TaskGraph::new(raw)
}

fn schedule_stg_benchmark(c: &mut Criterion) {
    let arch = bench_arch(4);
    let graph = layered_graph(8, 8);
    let mut map = Mapping::new(arch, Rc::new(Application::Stg(graph)), 0);

    // Spread tasks round-robin so the interconnect stays busy
    for taskid in 0..map.ntasks() {
        map.set_mapping(taskid, taskid % 4);
    }

    let mut rng = RandomSource::seeded(42);

    c.bench_function("schedule_stg 64 tasks 4 pes", |b| {
        b.iter(|| {
            evaluate(black_box(&mut map), &mut rng);
            black_box(map.schedule.schedule_length)
        })
    });
}

criterion_group!(benches, schedule_stg_benchmark);
criterion_main!(benches);
