//! Event-driven evaluator for static task graphs.

use crate::app::stg::TaskGraph;
use crate::arch::Architecture;
use crate::mapping::Mapping;
use crate::schedule::{Event, EventKind, Schedule, init_pe_states, new_event_heap, task_ready};
use crate::support::MaxHeap;
use std::cmp::Ordering;

/// A queued remote send competing for an interconnect.
#[derive(Debug, Clone, Copy)]
struct SendPri {
    pri: f64,
    partition: u32,
    result_id: usize,
}

fn compare_send_pri(a: &SendPri, b: &SendPri) -> Ordering {
    a.pri.partial_cmp(&b.pri).unwrap()
}

/// Per-IC transfer slot for the STG evaluator. The send queue itself is
/// global; a slot only tracks the transfer in flight.
struct IcSlot {
    busy: bool,
    last_end_time: f64,
    current: Option<u32>,
}

impl IcSlot {
    fn earliest_free_slot(&self, curtime: f64) -> f64 {
        curtime.max(self.last_end_time)
    }
}

/// Picks the free interconnect with the earliest free slot, if any.
fn pick_free_ic(slots: &[IcSlot], curtime: f64) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| !slot.busy)
        .min_by(|(_, a), (_, b)| {
            a.earliest_free_slot(curtime)
                .partial_cmp(&b.earliest_free_slot(curtime))
                .unwrap()
        })
        .map(|(icid, _)| icid)
}

/// Computes the per-task result-dispatch latency table.
///
/// A finishing task is charged one send cost per distinct remote
/// destination PE and one copy cost per local destination peer, both with
/// the byte amount of the first output peer, converted to seconds at the
/// producing PE's frequency.
pub(crate) fn latency_costs(
    s: &mut Schedule,
    graph: &TaskGraph,
    arch: &Architecture,
    mappings: &[usize],
) {
    let mut target_pes = vec![usize::MAX; arch.npes()];

    for task in &graph.tasks {
        let parent_pe = mappings[task.id];
        let mut remote_targets = 0u32;
        let mut local_targets = 0u32;

        for &child in &task.out_peers {
            let child_pe = mappings[child];
            if child_pe != parent_pe {
                if target_pes[child_pe] != task.id {
                    target_pes[child_pe] = task.id;
                    remote_targets += 1;
                }
            } else {
                local_targets += 1;
            }
        }

        let pe = &arch.pes[parent_pe];
        let send_bytes = if task.out_peers.is_empty() {
            0
        } else {
            task.out_bytes[0] as u32
        };

        let cycles =
            remote_targets * pe.send_cost(send_bytes) + local_targets * pe.copy_cost(send_bytes);
        s.latencies[task.id] = cycles as f64 / pe.freq as f64;
    }
}

fn edge_communication_time(
    graph: &TaskGraph,
    arch: &Architecture,
    mappings: &[usize],
    src: usize,
    dst: usize,
) -> f64 {
    if mappings[src] == mappings[dst] {
        return 0.0;
    }
    arch.communication_time(0, graph.send_amount(src, dst) as u32)
}

/// Computes HLFET b-level priorities over the reverse dependency order.
///
/// `pri[t] = comp(t) + max over children c of (pri[c] + comm(t, c))`, where
/// the communication term is dropped in maximum-parallelism mode.
/// Communication times use IC 0; the symmetric-bus invariant makes that
/// representative for every IC.
pub(crate) fn b_level_priorities(
    s: &mut Schedule,
    graph: &TaskGraph,
    arch: &Architecture,
    mappings: &[usize],
    maximum_parallelism: bool,
) {
    s.pri.iter_mut().for_each(|p| *p = 0.0);

    for i in 0..s.tsort.len() {
        let taskid = s.tsort[i];
        let task = &graph.tasks[taskid];
        let pe = &arch.pes[mappings[taskid]];
        let compcost = pe.computation_time(task.weight);

        let mut maximum = compcost;
        for &child in &task.out_peers {
            let mut pri = s.pri[child];
            if !maximum_parallelism {
                pri += edge_communication_time(graph, arch, mappings, taskid, child);
            }
            pri += compcost;
            if maximum < pri {
                maximum = pri;
            }
        }

        s.pri[taskid] = maximum;
    }
}

/// Evaluates the task graph on the current mapping, recomputing the full
/// schedule from scratch.
pub fn schedule_stg(map: &mut Mapping) {
    let app = map.app.clone();
    let graph = app.as_stg().expect("STG evaluator requires a task graph");
    let arch = map.arch.clone();
    let ntasks = graph.ntasks();

    latency_costs(&mut map.schedule, graph, &arch, &map.mappings);
    b_level_priorities(&mut map.schedule, graph, &arch, &map.mappings, false);
    map.schedule.send_table.rebuild(graph, &map.mappings);

    let overrides = map.task_priorities.as_deref();
    let mappings = &map.mappings;
    let s = &mut map.schedule;

    let mut pss = init_pe_states(arch.npes());
    let mut ic_slots: Vec<IcSlot> = (0..arch.nics())
        .map(|_| IcSlot {
            busy: false,
            last_end_time: 0.0,
            current: None,
        })
        .collect();
    let mut send_queue: MaxHeap<SendPri> = MaxHeap::new(compare_send_pri);
    let mut events = new_event_heap();

    let pe_ready = |events: &mut MaxHeap<Event>, time: f64, pe: usize| {
        events.insert(Event {
            time,
            kind: EventKind::PeReady { pe },
        });
    };
    let ic_ready = |events: &mut MaxHeap<Event>, time: f64, ic: Option<usize>| {
        events.insert(Event {
            time,
            kind: EventKind::IcReady { ic },
        });
    };

    // Entry tasks are ready at time zero
    for task in &graph.tasks {
        if task.parents.is_empty() {
            let peid = mappings[task.id];
            task_ready(&mut pss, peid, s.pri[task.id], task.id, overrides);
            pe_ready(&mut events, 0.0, peid);
        }
    }
    assert!(!events.is_empty(), "task graph has no entry tasks");

    let mut rescount = vec![0u32; ntasks];
    let mut finishflag = vec![false; ntasks];
    let mut finished = 0usize;

    s.result_refs.iter_mut().for_each(|r| *r = 0);
    s.init_utilisations();

    let mut curtime = 0.0;

    'simulation: loop {
        let event = events.extract_max();
        curtime = event.time;

        match event.kind {
            EventKind::CommFin { ic, .. } => {
                let slot = &mut ic_slots[ic];
                assert!(slot.busy);
                slot.busy = false;

                let part = s.send_table.partition(slot.current.take().unwrap());
                let peid = part.dst_pe;

                let mut task_became_ready = false;
                for &child in s.send_table.dsts(&part) {
                    let child = child as usize;
                    debug_assert_eq!(mappings[child], peid);
                    rescount[child] += 1;
                    if rescount[child] == graph.tasks[child].n_result_inputs {
                        task_ready(&mut pss, peid, s.pri[child], child, overrides);
                        task_became_ready = true;
                    }
                }

                if task_became_ready {
                    pe_ready(&mut events, curtime, peid);
                }
                if !send_queue.is_empty() {
                    ic_ready(&mut events, curtime, Some(ic));
                }
            }

            EventKind::CompFin { pe, .. } => {
                assert!(pss[pe].busy);
                pss[pe].busy = false;
                let taskid = pss[pe].task_id;
                let task = &graph.tasks[taskid];

                let mut used_interconnect = false;

                for resind in 0..task.results.len() {
                    let result_id = graph.result_id(taskid, resind);
                    let (first, count) = s.send_table.partitions_of(result_id);

                    for part_idx in first..first + count {
                        let part = s.send_table.partition(part_idx);

                        if part.dst_pe == pe {
                            // Local destinations learn about the result
                            // immediately
                            for &child in s.send_table.dsts(&part) {
                                let child = child as usize;
                                rescount[child] += 1;
                                if rescount[child] == graph.tasks[child].n_result_inputs {
                                    task_ready(&mut pss, pe, s.pri[child], child, overrides);
                                }
                            }
                        } else {
                            // Remote destinations compete for an
                            // interconnect; urgency is the best destination
                            // b-level plus the transfer time
                            let mut pri = 0.0f64;
                            for &child in s.send_table.dsts(&part) {
                                pri = pri.max(s.pri[child as usize]);
                            }
                            pri += arch.communication_time(0, part.bytes);

                            send_queue.insert(SendPri {
                                pri,
                                partition: part_idx,
                                result_id,
                            });
                            used_interconnect = true;
                        }
                    }
                }

                if used_interconnect {
                    ic_ready(&mut events, curtime, None);
                }
                if !pss[pe].ready.is_empty() {
                    pe_ready(&mut events, curtime, pe);
                }

                if !finishflag[taskid] {
                    finishflag[taskid] = true;
                    finished += 1;
                    if finished == ntasks {
                        break 'simulation;
                    }
                }
            }

            EventKind::IcReady { ic } => {
                let Some(icid) = ic.or_else(|| pick_free_ic(&ic_slots, curtime)) else {
                    continue;
                };
                if ic_slots[icid].busy || send_queue.is_empty() {
                    continue;
                }

                let send = send_queue.extract_max();
                let part = s.send_table.partition(send.partition);
                debug_assert_eq!(part.bytes, graph.result(send.result_id).bytes);

                let duration = arch.communication_time(icid, part.bytes);
                s.ic_utilisations[icid] += duration;

                let slot = &mut ic_slots[icid];
                let start = slot.earliest_free_slot(curtime);
                slot.last_end_time = start + duration;
                slot.busy = true;
                slot.current = Some(send.partition);

                events.insert(Event {
                    time: slot.last_end_time,
                    kind: EventKind::CommFin { ic: icid, index: 0 },
                });
            }

            EventKind::PeReady { pe } => {
                if pss[pe].busy || pss[pe].ready.is_empty() {
                    continue;
                }

                let ready = pss[pe].ready.extract_max();
                let taskid = ready.task_id;
                debug_assert_eq!(pe, mappings[taskid]);

                let duration =
                    s.latencies[taskid] + arch.pes[pe].computation_time(graph.tasks[taskid].weight);
                s.pe_utilisations[pe] += duration;

                pss[pe].queue_work(curtime, duration, taskid);
                events.insert(Event {
                    time: pss[pe].last_end_time,
                    kind: EventKind::CompFin { pe, inst: None },
                });

                // The started task owns one output buffer per partition of
                // each of its results until the partitions have been
                // delivered
                let task = &graph.tasks[taskid];
                for resind in 0..task.results.len() {
                    let result_id = graph.result_id(taskid, resind);
                    let (first, count) = s.send_table.partitions_of(result_id);
                    s.result_refs[result_id] = if count > 0 {
                        s.send_table.partition(first).n_partitions
                    } else {
                        0
                    };
                }
            }
        }
    }

    s.schedule_length = curtime;
    s.finalize_utilisations();
}

/// Prints task-graph statistics for the result report: communication to
/// computation ratios, edge counts and degrees, byte statistics, the
/// critical path and the maximum attainable parallelism.
pub fn stg_graph_stats(map: &mut Mapping) {
    let app = map.app.clone();
    let graph = app.as_stg().expect("graph statistics require a task graph");
    let arch = map.arch.clone();
    let ntasks = graph.ntasks();

    // Communication-to-computation ratio over all edges
    let mut nedges = 0usize;
    let mut commucost = 0.0;
    let mut compucost = 0.0;
    let (mut mincommu, mut maxcommu) = (f64::MAX, 0.0f64);
    let (mut mincompu, mut maxcompu) = (f64::MAX, 0.0f64);
    let (mut mintaskccr, mut avgtaskccr, mut maxtaskccr) = (f64::MAX, 0.0, 0.0f64);

    for task in &graph.tasks {
        let taskcomp = map.task_computation_time(task.id);
        compucost += taskcomp;
        if taskcomp > 0.0 && taskcomp < mincompu {
            mincompu = taskcomp;
        }
        maxcompu = maxcompu.max(taskcomp);

        let mut taskcommu = 0.0;
        for &child in &task.out_peers {
            nedges += 1;
            let edge =
                arch.communication_time(0, graph.send_amount(task.id, child) as u32);
            commucost += edge;
            taskcommu += edge;
            if edge > 0.0 && edge < mincommu {
                mincommu = edge;
            }
            maxcommu = maxcommu.max(edge);
        }

        let taskccr = taskcommu / taskcomp;
        if taskccr > 0.0 && taskccr < mintaskccr {
            mintaskccr = taskccr;
        }
        maxtaskccr = maxtaskccr.max(taskccr);
        avgtaskccr += taskccr;
    }

    assert!(nedges > 0);
    let avgcommu = commucost / nedges as f64;
    let avgcompu = compucost / ntasks as f64;
    avgtaskccr /= ntasks as f64;

    println!("ccr: {:.6}", avgcommu / avgcompu);
    println!(
        "min_avg_max_task_ccr: {:.6} {:.6} {:.6}",
        mintaskccr, avgtaskccr, maxtaskccr
    );
    println!(
        "min_avg_max_edge_communication_time: {:.9} {:.9} {:.9}",
        mincommu, avgcommu, maxcommu
    );
    println!(
        "min_avg_max_task_computation_time: {:.9} {:.9} {:.9}",
        mincompu, avgcompu, maxcompu
    );

    println!("edges: {}", graph.edges());

    // Degree statistics
    let (mut minout, mut maxout, mut avgout) = (ntasks, 0usize, 0usize);
    let (mut minin, mut maxin, mut avgin) = (ntasks, 0usize, 0usize);
    for task in &graph.tasks {
        let nout = task.out_peers.len();
        let nin = task.parents.len();
        maxout = maxout.max(nout);
        if nout > 0 && nout < minout {
            minout = nout;
        }
        avgout += nout;
        maxin = maxin.max(nin);
        if nin > 0 && nin < minin {
            minin = nin;
        }
        avgin += nin;
    }
    println!(
        "min_avg_max_out_edges: {} {} {}",
        minout,
        avgout as f64 / ntasks as f64,
        maxout
    );
    println!(
        "min_avg_max_in_edges: {} {} {}",
        minin,
        avgin as f64 / ntasks as f64,
        maxin
    );

    // Byte and byte-rate statistics per task
    let (mut nmin, mut navg, mut nmax) = (f64::MAX, 0.0, 0.0f64);
    let (mut amin, mut aavg, mut amax) = (f64::MAX, 0.0, 0.0f64);
    for task in &graph.tasks {
        let nbytes: f64 = task.out_bytes.iter().map(|&b| b as f64).sum();
        if nbytes > 0.0 && nbytes < nmin {
            nmin = nbytes;
        }
        nmax = nmax.max(nbytes);
        navg += nbytes;

        let rate = nbytes / map.task_computation_time(task.id);
        if rate > 0.0 && rate < amin {
            amin = rate;
        }
        amax = amax.max(rate);
        aavg += rate;
    }
    println!(
        "min_avg_max_bytes: {} {} {}",
        nmin,
        navg / ntasks as f64,
        nmax
    );
    println!(
        "min_avg_max_bytes/s: {} {} {}",
        amin,
        aavg / ntasks as f64,
        amax
    );

    // Critical path ignores communication
    b_level_priorities(&mut map.schedule, graph, &arch, &map.mappings, true);
    let critical_path = map
        .schedule
        .pri
        .iter()
        .fold(0.0f64, |acc, &pri| acc.max(pri));

    println!("total_computation: {:.9}", compucost);
    println!("critical_path: {:.9}", critical_path);
    println!("maximum_parallelism: {:.9}", compucost / critical_path);
}
