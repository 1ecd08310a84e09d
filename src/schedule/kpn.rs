//! Event-driven evaluator for Kahn process networks.

use crate::app::kpn::{KpnInst, ProcessNetwork};
use crate::arch::{Arbitration, Architecture};
use crate::mapping::Mapping;
use crate::schedule::{Event, EventKind, init_pe_states, new_event_heap, task_ready};
use crate::support::{MaxHeap, RandomSource};
use std::collections::VecDeque;

/// Reference to one instruction of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstRef {
    pub process: usize,
    pub index: usize,
}

impl InstRef {
    fn resolve(self, net: &ProcessNetwork) -> KpnInst {
        net.processes[self.process].insts[self.index]
    }
}

/// A successfully issued instruction: how long the PE is occupied and which
/// instruction the completion event must dispatch.
struct KpnStep {
    duration: f64,
    inst: InstRef,
}

/// Execution state of one process: program counter, the source awaited by a
/// blocked read, and one FIFO of pending write amounts per source peer.
struct ProcessState {
    pc: usize,
    blocked: Option<usize>,
    sources: Vec<usize>,
    fifos: Vec<VecDeque<u32>>,
}

impl ProcessState {
    fn fifo(&mut self, src: usize) -> &mut VecDeque<u32> {
        let i = self
            .sources
            .iter()
            .position(|&s| s == src)
            .unwrap_or_else(|| panic!("KPN source {} not found", src));
        &mut self.fifos[i]
    }
}

struct KpnState {
    /// Total instructions left over all processes; zero terminates the run
    ninsts_left: u64,
    pstates: Vec<ProcessState>,
}

impl KpnState {
    fn new(net: &ProcessNetwork) -> KpnState {
        let mut pstates: Vec<ProcessState> = net
            .processes
            .iter()
            .map(|_| ProcessState {
                pc: 0,
                blocked: None,
                sources: Vec::new(),
                fifos: Vec::new(),
            })
            .collect();

        let mut ninsts_left = 0;
        for process in &net.processes {
            ninsts_left += process.insts.len() as u64;
            for inst in &process.insts {
                if let KpnInst::Read { src } = inst {
                    let sources = &mut pstates[process.id].sources;
                    if !sources.contains(src) {
                        sources.push(*src);
                    }
                }
            }
        }

        for pstate in &mut pstates {
            pstate.fifos = pstate.sources.iter().map(|_| VecDeque::new()).collect();
        }

        KpnState {
            ninsts_left,
            pstates,
        }
    }

    /// Tries to issue the next instruction of process `taskid`.
    ///
    /// Returns `None` when the process has terminated, is blocked, or blocks
    /// now on an empty read FIFO. The charged cycle count is never below one
    /// cycle.
    fn execute(
        &mut self,
        taskid: usize,
        net: &ProcessNetwork,
        arch: &Architecture,
        mappings: &[usize],
    ) -> Option<KpnStep> {
        let pstate = &mut self.pstates[taskid];
        let insts = &net.processes[taskid].insts;

        if pstate.pc >= insts.len() || pstate.blocked.is_some() {
            return None;
        }

        let pe = &arch.pes[mappings[taskid]];

        let cycles = match insts[pstate.pc] {
            KpnInst::Compute { amount } => amount,
            KpnInst::Read { src } => match pstate.fifo(src).pop_front() {
                Some(amount) => pe.copy_cost(amount),
                None => {
                    pstate.blocked = Some(src);
                    return None;
                }
            },
            KpnInst::Write { dst, amount } => {
                if mappings[taskid] == mappings[dst] {
                    pe.copy_cost(amount)
                } else {
                    pe.send_cost(amount)
                }
            }
        };

        let inst = InstRef {
            process: taskid,
            index: pstate.pc,
        };
        pstate.pc += 1;

        Some(KpnStep {
            duration: pe.computation_time(cycles.max(1) as f64),
            inst,
        })
    }

    /// Delivers a completed write to its destination FIFO. Returns true when
    /// the destination was blocked on exactly this source and is runnable
    /// again.
    fn unblock(&mut self, inst: InstRef, net: &ProcessNetwork) -> bool {
        let KpnInst::Write { dst, amount } = inst.resolve(net) else {
            panic!("unblock on a non-write instruction");
        };
        let src = inst.process;

        let pstate = &mut self.pstates[dst];
        pstate.fifo(src).push_back(amount);

        if pstate.blocked != Some(src) {
            return false;
        }
        pstate.blocked = None;
        true
    }
}

/// One transfer waiting for (or riding on) an interconnect.
struct Transfer {
    issue_time: f64,
    inst: InstRef,
}

struct KpnIcSlot {
    last_end_time: f64,
    queue: Vec<Transfer>,
}

impl KpnIcSlot {
    fn earliest_free_slot(&self, curtime: f64) -> f64 {
        curtime.max(self.last_end_time)
    }
}

/// Applies the interconnect's arbitration policy to its transfer queue and
/// returns the index of the granted transfer. Accumulates the arbitration
/// counters on the schedule record.
fn arbitrate(
    slot: &KpnIcSlot,
    policy: Arbitration,
    curtime: f64,
    map: &Mapping,
    s_arbs: &mut (i64, f64, f64),
    rng: &mut RandomSource,
) -> usize {
    let len = slot.queue.len();
    assert!(len > 0);

    let index = match policy {
        Arbitration::Fifo => 0,
        Arbitration::Lifo => len - 1,
        Arbitration::Random => rng.rand_int(0, len),
        Arbitration::Priority => {
            let mut max_priority = i32::MIN;
            let mut max_index = 0;
            for (i, transfer) in slot.queue.iter().enumerate() {
                let peid = map.mappings[transfer.inst.process];
                let priority = map.ic_priorities[peid];
                if priority > max_priority {
                    max_priority = priority;
                    max_index = i;
                }
            }
            max_index
        }
    };

    let (arbs, avg_in_queue, avg_time) = s_arbs;
    *arbs += 1;
    *avg_in_queue += len as f64;
    *avg_time += curtime - slot.queue[index].issue_time;

    index
}

/// Queues a remote write on the interconnect with the earliest free slot.
fn start_ic_arbitration(
    slots: &mut [KpnIcSlot],
    events: &mut MaxHeap<Event>,
    curtime: f64,
    inst: InstRef,
) {
    assert!(!slots.is_empty(), "remote write without an interconnect");

    let icid = (0..slots.len())
        .min_by(|&a, &b| {
            slots[a]
                .earliest_free_slot(curtime)
                .partial_cmp(&slots[b].earliest_free_slot(curtime))
                .unwrap()
        })
        .unwrap();

    let generate_ready = slots[icid].queue.is_empty();

    slots[icid].queue.push(Transfer {
        issue_time: curtime,
        inst,
    });

    if generate_ready {
        events.insert(Event {
            time: slots[icid].earliest_free_slot(curtime),
            kind: EventKind::IcReady { ic: Some(icid) },
        });
    }
}

/// Evaluates the process network on the current mapping.
///
/// Every process starts ready; the run ends when the total number of
/// executed instructions reaches the instruction count of the network. A
/// deadlocked network exhausts the event queue, which is a fatal contract
/// violation.
pub fn schedule_kpn(map: &mut Mapping, rng: &mut RandomSource) {
    let app = map.app.clone();
    let net = app.as_kpn().expect("KPN evaluator requires a process network");
    let arch = map.arch.clone();

    let mut pss = init_pe_states(arch.npes());
    let mut slots: Vec<KpnIcSlot> = (0..arch.nics())
        .map(|_| KpnIcSlot {
            last_end_time: 0.0,
            queue: Vec::new(),
        })
        .collect();
    let mut events = new_event_heap();
    let mut state = KpnState::new(net);

    map.schedule.init_utilisations();
    let overrides = map.task_priorities.clone();
    let overrides = overrides.as_deref();

    // Every process is ready at time zero
    for taskid in 0..net.nprocesses() {
        task_ready(&mut pss, map.mappings[taskid], 0.0, taskid, overrides);
    }
    for pe in 0..arch.npes() {
        events.insert(Event {
            time: 0.0,
            kind: EventKind::PeReady { pe },
        });
    }

    let mut arb_counters = (0i64, 0.0f64, 0.0f64);

    loop {
        let event = events.extract_max();
        let curtime = event.time;

        match event.kind {
            EventKind::CommFin { ic, index } => {
                let transfer = slots[ic].queue.remove(index);
                let inst = transfer.inst;

                if !slots[ic].queue.is_empty() {
                    events.insert(Event {
                        time: curtime,
                        kind: EventKind::IcReady { ic: Some(ic) },
                    });
                }

                if state.unblock(inst, net) {
                    let KpnInst::Write { dst, .. } = inst.resolve(net) else {
                        unreachable!();
                    };
                    let peid = map.mappings[dst];
                    task_ready(&mut pss, peid, curtime, dst, overrides);
                    events.insert(Event {
                        time: curtime,
                        kind: EventKind::PeReady { pe: peid },
                    });
                }
            }

            EventKind::IcReady { ic } => {
                let icid = ic.expect("KPN interconnects are always addressed directly");
                let index = arbitrate(
                    &slots[icid],
                    arch.ics[icid].policy,
                    curtime,
                    map,
                    &mut arb_counters,
                    rng,
                );

                let inst = slots[icid].queue[index].inst;
                let KpnInst::Write { amount, .. } = inst.resolve(net) else {
                    unreachable!();
                };

                let duration = arch.communication_time(icid, amount);
                map.schedule.ic_utilisations[icid] += duration;

                let start = slots[icid].earliest_free_slot(curtime);
                debug_assert_eq!(start, curtime);
                slots[icid].last_end_time = start + duration;

                events.insert(Event {
                    time: start + duration,
                    kind: EventKind::CommFin { ic: icid, index },
                });
            }

            EventKind::CompFin { pe, inst } => {
                state.ninsts_left -= 1;
                if state.ninsts_left == 0 {
                    map.schedule.schedule_length = curtime;
                    break;
                }

                pss[pe].busy = false;
                let taskid = pss[pe].task_id;
                let inst = inst.expect("KPN completion without an instruction");

                if let KpnInst::Write { dst, .. } = inst.resolve(net) {
                    if map.mappings[inst.process] == map.mappings[dst] {
                        if state.unblock(inst, net) {
                            task_ready(&mut pss, map.mappings[dst], curtime, dst, overrides);
                        }
                    } else {
                        start_ic_arbitration(&mut slots, &mut events, curtime, inst);
                    }
                }

                // The producer continues; its PE frees at the last queued
                // end time
                task_ready(&mut pss, pe, curtime, taskid, overrides);
                events.insert(Event {
                    time: pss[pe].last_end_time,
                    kind: EventKind::PeReady { pe },
                });
            }

            EventKind::PeReady { pe } => {
                if pss[pe].busy {
                    continue;
                }

                // Pop ready processes until one can actually issue a step;
                // blocked processes leave the queue and return on unblock
                let mut step = None;
                while !pss[pe].ready.is_empty() {
                    let ready = pss[pe].ready.extract_max();
                    if let Some(found) =
                        state.execute(ready.task_id, net, &arch, &map.mappings)
                    {
                        step = Some((ready.task_id, found));
                        break;
                    }
                }
                let Some((taskid, step)) = step else {
                    continue;
                };
                debug_assert_eq!(pe, map.mappings[taskid]);

                map.schedule.pe_utilisations[pe] += step.duration;
                pss[pe].queue_work(curtime, step.duration, taskid);
                events.insert(Event {
                    time: pss[pe].last_end_time,
                    kind: EventKind::CompFin {
                        pe,
                        inst: Some(step.inst),
                    },
                });
            }
        }
    }

    let s = &mut map.schedule;
    (s.arbs, s.arb_avg_in_queue, s.arb_avg_time) = arb_counters;
    s.finalize_utilisations();
}
