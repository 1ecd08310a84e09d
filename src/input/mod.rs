//! # Input Module - Model and Configuration Reader
//!
//! Reads the whitespace-delimited text format describing the architecture,
//! the application and the optimization request. The three top-level
//! sections `architecture`, `tasks` and `optimization` may appear in any
//! order and must each appear exactly once; trailing `mapping_list`
//! sections are additive.
//!
//! All format and configuration errors are fatal and carry a labeled
//! message; there is no recovery path.

// Unit tests
pub mod tests;

use crate::app::Application;
use crate::app::kpn::{KpnInst, KpnProcess, ProcessNetwork};
use crate::app::stg::{TaskGraph, TaskResult};
use crate::arch::{Arbitration, Architecture, Interconnect, Pe};
use crate::config::Config;
use crate::mapping::Mapping;
use crate::optimize::brute::{OPT_MAPPING, OPT_SCHEDULING};
use crate::optimize::ga::{CrossoverMethod, GaParams};
use crate::optimize::moves::MoveHeuristic;
use crate::optimize::neighborhood::NtmParams;
use crate::optimize::osm::OsmParams;
use crate::optimize::random::RandomParams;
use crate::optimize::sa::{Acceptor, SaParams};
use crate::optimize::{MethodKind, Objective, OptimizationSpec};
use log::warn;
use std::io::Read;
use std::rc::Rc;

pub type ParseError = Box<dyn std::error::Error>;
pub type ParseResult<T> = Result<T, ParseError>;

fn err<T>(message: String) -> ParseResult<T> {
    Err(message.into())
}

/// Whitespace tokenizer over the whole input.
pub struct TokenReader {
    tokens: Vec<String>,
    pos: usize,
}

impl TokenReader {
    pub fn new(input: &mut dyn Read) -> ParseResult<TokenReader> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(TokenReader::from_text(&text))
    }

    pub fn from_text(text: &str) -> TokenReader {
        TokenReader {
            tokens: text.split_whitespace().map(str::to_owned).collect(),
            pos: 0,
        }
    }

    /// Next token, or None at end of input.
    pub fn try_word(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token.as_str())
    }

    pub fn get_word(&mut self) -> ParseResult<String> {
        match self.try_word() {
            Some(word) => Ok(word.to_owned()),
            None => err("unexpected end of input".to_owned()),
        }
    }

    pub fn get_i64(&mut self) -> ParseResult<i64> {
        let word = self.get_word()?;
        word.parse()
            .map_err(|_| format!("invalid integer: {}", word).into())
    }

    pub fn get_usize(&mut self) -> ParseResult<usize> {
        let word = self.get_word()?;
        word.parse()
            .map_err(|_| format!("invalid unsigned integer: {}", word).into())
    }

    pub fn get_u32(&mut self) -> ParseResult<u32> {
        let word = self.get_word()?;
        word.parse()
            .map_err(|_| format!("invalid unsigned integer: {}", word).into())
    }

    pub fn get_f64(&mut self) -> ParseResult<f64> {
        let word = self.get_word()?;
        word.parse()
            .map_err(|_| format!("invalid number: {}", word).into())
    }

    pub fn match_word(&mut self, expected: &str) -> ParseResult<()> {
        let word = self.get_word()?;
        if word != expected {
            return err(format!("{} not matched (got {})", expected, word));
        }
        Ok(())
    }

    /// Matches one of the given alternatives and returns its index.
    pub fn match_alternatives(&mut self, alternatives: &[&str]) -> ParseResult<usize> {
        let word = self.get_word()?;
        match alternatives.iter().position(|&alt| alt == word) {
            Some(index) => Ok(index),
            None => err(format!("no match on alternatives (got {})", word)),
        }
    }
}

fn parse_pe(reader: &mut TokenReader, id: usize) -> ParseResult<Pe> {
    let mut pe = Pe {
        id,
        freq: 50_000_000,
        send_latency: 0,
        per_byte_send_cost: 0.0,
        copy_latency: 0,
        per_byte_copy_cost: 0.0,
        performance_factor: 1.0,
        area: 1e-6,
        ic_initial_priority: 0,
    };

    loop {
        let key = reader.get_word()?;
        match key.as_str() {
            "freq" => {
                pe.freq = reader.get_i64()?;
                if pe.freq <= 0 {
                    return err(format!("PE {} frequency must be positive", id));
                }
            }
            "send_cost" => {
                pe.send_latency = reader.get_u32()?;
                pe.per_byte_send_cost = reader.get_f64()?;
                if pe.per_byte_send_cost < 0.0 {
                    return err(format!("PE {} send cost must not be negative", id));
                }
            }
            "copy_cost" => {
                pe.copy_latency = reader.get_u32()?;
                pe.per_byte_copy_cost = reader.get_f64()?;
                if pe.per_byte_copy_cost < 0.0 {
                    return err(format!("PE {} copy cost must not be negative", id));
                }
            }
            "performance_factor" => {
                pe.performance_factor = reader.get_f64()?;
                if pe.performance_factor <= 0.0 {
                    return err(format!("PE {} performance factor must be positive", id));
                }
            }
            "area" => {
                pe.area = reader.get_f64()?;
                if pe.area <= 0.0 {
                    return err(format!("PE {} area must be positive", id));
                }
            }
            "end_processing_element" => break,
            other => return err(format!("unknown variable in PE context: {}", other)),
        }
    }

    Ok(pe)
}

fn parse_interconnect(
    reader: &mut TokenReader,
    id: usize,
    config: &Config,
) -> ParseResult<Interconnect> {
    let freq = reader.get_i64()?;
    let area = reader.get_f64()?;
    let width = reader.get_u32()?;
    let latency = reader.get_u32()?;

    if freq <= 0 {
        return err(format!("interconnect {} frequency must be positive", id));
    }
    if width == 0 || width > 1024 {
        return err(format!("interconnect {} width out of range", id));
    }
    if area <= 0.0 {
        return err(format!("interconnect {} area must be positive", id));
    }

    let mut policy = Arbitration::Fifo;

    loop {
        let key = reader.get_word()?;
        match key.as_str() {
            "end_interconnect" => break,
            "arbitration" => {
                let name = reader.get_word()?;
                policy = Arbitration::from_name(&name)
                    .ok_or_else(|| format!("unknown arbitration policy: {}", name))?;
            }
            other => return err(format!("unknown interconnect parameter: {}", other)),
        }
    }

    if let Some(name) = &config.arbitration_policy {
        policy = Arbitration::from_name(name)
            .ok_or_else(|| format!("unknown arbitration policy: {}", name))?;
    }

    Ok(Interconnect {
        id,
        freq,
        area,
        width,
        latency,
        policy,
    })
}

fn parse_architecture(reader: &mut TokenReader, config: &Config) -> ParseResult<Architecture> {
    let mut pes: Option<Vec<Pe>> = None;
    let mut ics: Option<Vec<Interconnect>> = None;

    while pes.is_none() || ics.is_none() {
        match reader.match_alternatives(&["processing_element_list", "interconnect_list"])? {
            0 => {
                if pes.is_some() {
                    return err("duplicate processing_element_list".to_owned());
                }
                let n = reader.get_usize()?;
                if n == 0 {
                    return err("architecture needs at least one PE".to_owned());
                }

                let priorities = config.ic_priorities.as_deref().unwrap_or("");
                let mut list = Vec::with_capacity(n);
                for id in 0..n {
                    reader.match_word("processing_element")?;
                    let mut pe = parse_pe(reader, id)?;

                    if let Some(digit) = priorities.chars().nth(id) {
                        pe.ic_initial_priority = digit
                            .to_digit(10)
                            .ok_or_else(|| format!("invalid IC priority digit: {}", digit))?
                            as i32;
                    }

                    println!(
                        "pe: id {} freq {} perf {:e} area {:e}",
                        pe.id, pe.freq, pe.performance_factor, pe.area
                    );
                    list.push(pe);
                }
                pes = Some(list);
            }
            _ => {
                if ics.is_some() {
                    return err("duplicate interconnect_list".to_owned());
                }
                let n = reader.get_usize()?;
                let mut list = Vec::with_capacity(n);
                for id in 0..n {
                    reader.match_word("interconnect")?;
                    let ic = parse_interconnect(reader, id, config)?;
                    println!(
                        "interconnect: id {} freq {} area {:e} width {} latency {} policy {:?}",
                        ic.id, ic.freq, ic.area, ic.width, ic.latency, ic.policy
                    );
                    list.push(ic);
                }
                ics = Some(list);
            }
        }
    }

    let arch = Architecture {
        pes: pes.unwrap(),
        ics: ics.unwrap(),
    };
    if let Err(icid) = arch.check_symmetric_ics() {
        return err(format!("IC {} is not same as IC 0", icid));
    }
    Ok(arch)
}

fn parse_stg(reader: &mut TokenReader) -> ParseResult<TaskGraph> {
    let ntasks = reader.get_usize()?;
    if ntasks == 0 {
        return err("task graph needs at least one task".to_owned());
    }

    let mut raw = Vec::with_capacity(ntasks);

    for expected_id in 0..ntasks {
        reader.match_word("task")?;
        let id = reader.get_usize()?;
        if id != expected_id {
            return err(format!(
                "task numbers must be sequential: task {} should be {}",
                id, expected_id
            ));
        }

        reader.match_word("out")?;
        let nresults = reader.get_usize()?;
        let mut results = Vec::with_capacity(nresults);
        for _ in 0..nresults {
            let bytes = reader.get_u32()?;
            if bytes == 0 {
                return err(format!("task {} result must carry bytes", id));
            }
            let ndst = reader.get_usize()?;
            if ndst == 0 {
                return err(format!("task {} result needs a destination", id));
            }
            let mut dsts = Vec::with_capacity(ndst);
            for _ in 0..ndst {
                dsts.push(reader.get_usize()?);
            }
            results.push(TaskResult { bytes, dsts });
        }

        reader.match_word("weight")?;
        let weight = reader.get_f64()?;
        if weight <= 0.0 {
            return err(format!("task {} weight must be positive", id));
        }

        raw.push((weight, results));
    }

    // Destination references must stay inside the graph
    for (id, (_, results)) in raw.iter().enumerate() {
        for result in results {
            for &dst in &result.dsts {
                if dst >= ntasks {
                    return err(format!("task {} sends to unknown task {}", id, dst));
                }
            }
        }
    }

    Ok(TaskGraph::new(raw))
}

fn parse_kpn(reader: &mut TokenReader) -> ParseResult<ProcessNetwork> {
    let mut processes: Vec<KpnProcess> = Vec::new();

    loop {
        let word = reader.get_word()?;
        if word == "end_kpn" {
            break;
        }
        if word != "process" {
            return err(format!("expected process or end_kpn, got {}", word));
        }

        let id = reader.get_usize()?;
        if id != processes.len() {
            return err(format!(
                "process numbers must be sequential: process {} should be {}",
                id,
                processes.len()
            ));
        }

        let ninsts = reader.get_usize()?;
        let mut insts = Vec::with_capacity(ninsts);
        for _ in 0..ninsts {
            let cmd = reader.get_word()?;
            let inst = match cmd.as_str() {
                "c" => {
                    let amount = reader.get_u32()?;
                    if amount == 0 {
                        return err(format!("process {} computes zero operations", id));
                    }
                    KpnInst::Compute { amount }
                }
                "r" => KpnInst::Read {
                    src: reader.get_usize()?,
                },
                "w" => {
                    let dst = reader.get_usize()?;
                    let amount = reader.get_u32()?;
                    if amount == 0 {
                        return err(format!("process {} writes zero bytes", id));
                    }
                    KpnInst::Write { dst, amount }
                }
                other => return err(format!("unknown KPN command: {}", other)),
            };
            insts.push(inst);
        }

        processes.push(KpnProcess { id, insts });
    }

    let nprocesses = processes.len();
    if nprocesses == 0 {
        return err("process network needs at least one process".to_owned());
    }
    for process in &processes {
        for inst in &process.insts {
            let peer = match inst {
                KpnInst::Read { src } => Some(*src),
                KpnInst::Write { dst, .. } => Some(*dst),
                KpnInst::Compute { .. } => None,
            };
            if let Some(peer) = peer {
                if peer >= nprocesses {
                    return err(format!(
                        "KPN process {} has an invalid source or destination",
                        process.id
                    ));
                }
            }
        }
    }

    let net = ProcessNetwork { processes };
    println!("kpn_insts: {}", net.ninsts());
    println!("kpn_cycles: {}", net.total_cycles());
    println!("kpn_bytes: {}", net.total_bytes());

    Ok(net)
}

struct TasksSection {
    app: Application,
    default_mapping: usize,
    explicit: Vec<(usize, usize)>,
    statics: Vec<usize>,
}

fn parse_mapping_list(reader: &mut TokenReader, ntasks: usize) -> ParseResult<Vec<(usize, usize)>> {
    let n = reader.get_usize()?;
    if n > ntasks {
        return err("mapping_list longer than the task list".to_owned());
    }
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        reader.match_word("map")?;
        let taskid = reader.get_usize()?;
        if taskid >= ntasks {
            return err(format!("mapping for unknown task {}", taskid));
        }
        let peid = reader.get_usize()?;
        pairs.push((taskid, peid));
    }
    Ok(pairs)
}

fn parse_tasks(reader: &mut TokenReader) -> ParseResult<TasksSection> {
    let apptype = reader.get_word()?;
    let app = match apptype.as_str() {
        "task_list" => Application::Stg(parse_stg(reader)?),
        "kpn" => Application::Kpn(parse_kpn(reader)?),
        other => return err(format!("unknown application type: {}", other)),
    };
    println!("appmodel: {}", app.name());

    let ntasks = app.ntasks();

    reader.match_word("default_mapping")?;
    let default_mapping = reader.get_usize()?;

    reader.match_word("mapping_list")?;
    let explicit = parse_mapping_list(reader, ntasks)?;

    reader.match_word("static_list")?;
    let nstatics = reader.get_usize()?;
    if nstatics > ntasks {
        return err("static_list longer than the task list".to_owned());
    }
    let mut statics = Vec::with_capacity(nstatics);
    for _ in 0..nstatics {
        let taskid = reader.get_usize()?;
        if taskid >= ntasks {
            return err(format!("static marker for unknown task {}", taskid));
        }
        statics.push(taskid);
    }

    Ok(TasksSection {
        app,
        default_mapping,
        explicit,
        statics,
    })
}

fn parse_sa_parameters(reader: &mut TokenReader) -> ParseResult<SaParams> {
    let mut params = SaParams::default();
    let mut obligatory = 0u32;

    loop {
        let key = reader.get_word()?;
        match key.as_str() {
            "end_simulated_annealing" => break,
            "max_rejects" => {
                obligatory |= 1;
                params.max_rejects = reader.get_i64()?;
            }
            "schedule_max" => {
                obligatory |= 2;
                params.schedule_max = reader.get_i64()?;
            }
            "T0" => {
                obligatory |= 4;
                params.t0 = reader.get_f64()?;
            }
            "Tf" => {
                obligatory |= 8;
                params.tf = reader.get_f64()?;
            }
            "acceptor" => {
                obligatory |= 16;
                let name = reader.get_word()?;
                params.acceptor = Acceptor::from_name(&name)
                    .ok_or_else(|| format!("unknown sa acceptor: {}", name))?;
                println!("sa_acceptor: {}", params.acceptor.name());
            }
            "schedule" => {
                obligatory |= 32;
                reader.match_word("geometric")?;
                params.schedule_param1 = reader.get_f64()?;
            }
            "heuristics" => {
                obligatory |= 64;
                let name = reader.get_word()?;
                params.heuristic = MoveHeuristic::from_name(&name)
                    .ok_or_else(|| format!("unknown sa heuristics: {}", name))?;
            }
            "zero_transition_prob" => {
                let ztp = reader.get_f64()?;
                if !(0.0..=1.0).contains(&ztp) {
                    return err(format!("zero_transition_prob out of range: {}", ztp));
                }
                params.zero_transition_prob = ztp;
            }
            other => return err(format!("unknown sa parameter: {}", other)),
        }
    }

    if obligatory != 127 {
        return err("simulated annealing parameters are incomplete".to_owned());
    }

    Ok(params)
}

fn parse_ga_parameters(reader: &mut TokenReader, config: &Config) -> ParseResult<GaParams> {
    let mut params = GaParams::default();

    let mut values = [
        ("max_generations", 1000.0, false),
        ("population_size", 100.0, false),
        ("elitism", 1.0, false),
        ("discrimination", 1.0, false),
        ("crossover_probability", 1.0, false),
        ("chromosome_mutation_probability", 1.0, false),
        ("gene_mutation_probability", 0.01, false),
        ("max_evaluations", 0.0, false),
        ("stop_generations", 0.0, false),
        ("stop_evaluations", 0.0, false),
    ];

    loop {
        let key = reader.get_word()?;
        if key == "end_method" {
            break;
        }
        if key == "crossover_method" {
            let name = reader.get_word()?;
            params.crossover_method = CrossoverMethod::from_name(&name)
                .ok_or_else(|| format!("unknown crossover method: {}", name))?;
            continue;
        }

        let entry = values.iter_mut().find(|(name, _, _)| *name == key);
        match entry {
            Some((_, value, initialized)) => {
                *value = reader.get_f64()?;
                *initialized = true;
            }
            None => return err(format!("unknown ga parameter: {}", key)),
        }
    }

    for (name, _, initialized) in &values {
        if !initialized {
            warn!("{} not initialized", name);
        }
    }

    // Positional override: max_generations, population_size, elitism,
    // discrimination, crossover_probability, chromosome_mutation_probability,
    // gene_mutation_probability
    if let Some(raw) = &config.raw_parameter {
        let fields: Vec<&str> = raw.split(',').collect();
        if fields.len() != 7 {
            return err(format!("ga parameter string needs 7 fields: {}", raw));
        }
        for (slot, field) in values.iter_mut().zip(&fields) {
            slot.1 = field
                .parse()
                .map_err(|_| format!("invalid ga parameter value: {}", field))?;
        }
    }

    params.max_generations = values[0].1 as u64;
    params.population_size = values[1].1 as usize;
    params.elitism = values[2].1 as usize;
    params.discrimination = values[3].1 as usize;
    params.crossover_probability = values[4].1;
    params.chromosome_mutation_probability = values[5].1;
    params.gene_mutation_probability = values[6].1;
    params.max_evaluations = values[7].1 as u64;
    params.stop_generations = values[8].1 as u64;
    params.stop_evaluations = values[9].1 as u64;

    if params.population_size == 0 {
        return err("ga population must not be empty".to_owned());
    }
    if params.elitism > params.population_size {
        return err("ga elitism exceeds the population".to_owned());
    }
    if params.discrimination >= params.population_size {
        return err("ga discrimination exceeds the population".to_owned());
    }
    for (name, p) in [
        ("crossover_probability", params.crossover_probability),
        (
            "chromosome_mutation_probability",
            params.chromosome_mutation_probability,
        ),
        ("gene_mutation_probability", params.gene_mutation_probability),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return err(format!("{} out of range: {}", name, p));
        }
    }

    println!("GA parameters:");
    println!("max_generations: {}", params.max_generations);
    println!("population_size: {}", params.population_size);
    println!("elitism: {}", params.elitism);
    println!("discrimination: {}", params.discrimination);
    println!("crossover_probability: {:.6}", params.crossover_probability);
    println!("crossover_method: {}", params.crossover_method.name());
    println!(
        "chromosome_mutation_probability: {:.6}",
        params.chromosome_mutation_probability
    );
    println!(
        "gene_mutation_probability: {:.6}",
        params.gene_mutation_probability
    );

    Ok(params)
}

fn parse_osm_parameters(reader: &mut TokenReader) -> ParseResult<OsmParams> {
    reader.match_word("multiplier")?;
    let c = reader.get_f64()?;
    if c <= 0.0 {
        return err("osm multiplier must be positive".to_owned());
    }
    println!("osm_multiplier: {}", c);

    reader.match_word("task_exponent")?;
    let cn = reader.get_f64()?;
    if cn <= 0.0 {
        return err("osm task exponent must be positive".to_owned());
    }
    println!("osm_task_exponent: {}", cn);

    reader.match_word("pe_exponent")?;
    let cp = reader.get_f64()?;
    if cp <= 0.0 {
        return err("osm pe exponent must be positive".to_owned());
    }
    println!("osm_pe_exponent: {}", cp);

    reader.match_word("subset_size")?;
    let subsetsize = reader.get_usize()?;

    Ok(OsmParams {
        c,
        cn,
        cp,
        subsetsize,
        subsettries: 0.0,
    })
}

fn parse_random_parameters(reader: &mut TokenReader) -> ParseResult<RandomParams> {
    reader.match_word("max_iterations")?;
    let max_iterations = reader.get_i64()?;
    reader.match_word("multiplier")?;
    let constant = reader.get_f64()?;
    reader.match_word("task_exponent")?;
    let task_exp = reader.get_f64()?;
    reader.match_word("pe_exponent")?;
    let pe_exp = reader.get_f64()?;

    Ok(RandomParams {
        max_iterations,
        constant,
        task_exp,
        pe_exp,
    })
}

fn parse_ntm_parameters(reader: &mut TokenReader) -> ParseResult<NtmParams> {
    let mut params = NtmParams::default();

    loop {
        let key = reader.get_word()?;
        match key.as_str() {
            "end_optimization" => break,
            "changemax" => params.changemax = reader.get_u32()?,
            "itermax" => params.itermax = reader.get_i64()?.max(0) as u64,
            other => return err(format!("invalid ntm parameter: {}", other)),
        }
    }

    Ok(params)
}

fn parse_optimization(reader: &mut TokenReader, config: &Config) -> ParseResult<OptimizationSpec> {
    reader.match_word("objective_function")?;
    let objective = match reader.match_alternatives(&["execution_time", "execution_time_power"])? {
        0 => Objective::ExecutionTime,
        _ => {
            reader.match_word("k")?;
            Objective::ExecutionTimePower {
                k: reader.get_f64()?,
            }
        }
    };

    reader.match_word("method")?;
    let method_name = reader.get_word()?;

    let with_autotemp = |mut params: SaParams, autotemp: u8| {
        params.autotemp = autotemp;
        params
    };

    let method = match method_name.as_str() {
        "optimal_subset_mapping" => MethodKind::OptimalSubsetMapping(parse_osm_parameters(reader)?),
        "random_mapping" => MethodKind::RandomMapping(parse_random_parameters(reader)?),
        "group_migration" => MethodKind::GroupMigration { randomize: false },
        "group_migration_random" => MethodKind::GroupMigration { randomize: true },
        "group_migration_2" => MethodKind::GroupMigration2,
        "simulated_annealing" => MethodKind::SimulatedAnnealing(parse_sa_parameters(reader)?),
        "simulated_annealing_autotemp" => {
            MethodKind::SimulatedAnnealing(with_autotemp(parse_sa_parameters(reader)?, 1))
        }
        "simulated_annealing_autotemp2" => {
            MethodKind::SimulatedAnnealing(with_autotemp(parse_sa_parameters(reader)?, 2))
        }
        "simulated_annealing_autotemp3" => {
            MethodKind::SimulatedAnnealing(with_autotemp(parse_sa_parameters(reader)?, 3))
        }
        "fast_hybrid_gm_sa" => MethodKind::FastHybridGmSa(parse_sa_parameters(reader)?),
        "fast_hybrid_gm_sa_autotemp" => {
            MethodKind::FastHybridGmSa(with_autotemp(parse_sa_parameters(reader)?, 1))
        }
        "slow_hybrid_gm_sa" => MethodKind::SlowHybridGmSa(parse_sa_parameters(reader)?),
        "slow_hybrid_gm_sa_autotemp" => {
            MethodKind::SlowHybridGmSa(with_autotemp(parse_sa_parameters(reader)?, 1))
        }
        "iterated_simulated_annealing" => {
            MethodKind::IteratedSimulatedAnnealing(parse_sa_parameters(reader)?)
        }
        "iterated_simulated_annealing_autotemp" => {
            MethodKind::IteratedSimulatedAnnealing(with_autotemp(parse_sa_parameters(reader)?, 1))
        }
        "simulated_annealing_levels" => {
            MethodKind::SimulatedAnnealingLevels(with_autotemp(parse_sa_parameters(reader)?, 1))
        }
        "genetic_algorithm" => MethodKind::GeneticAlgorithm(parse_ga_parameters(reader, config)?),
        "brute_force" => MethodKind::BruteForce { flags: OPT_MAPPING },
        "brute_force_with_schedule" => MethodKind::BruteForce {
            flags: OPT_MAPPING | OPT_SCHEDULING,
        },
        "brute_force_map_schedule" => MethodKind::BruteForceMapSchedule,
        "osm_sa" => {
            let osm = parse_osm_parameters(reader)?;
            let sa = with_autotemp(parse_sa_parameters(reader)?, 1);
            MethodKind::OsmSa { osm, sa }
        }
        "neighborhood_test" => MethodKind::NeighborhoodTest(parse_ntm_parameters(reader)?),
        other => return err(format!("invalid optimization method: {}", other)),
    };

    Ok(OptimizationSpec {
        objective,
        method_name,
        method,
    })
}

/// Reads the whole input and assembles the initial mapping and the
/// optimization request.
pub fn parse_input(
    reader: &mut TokenReader,
    config: &Config,
) -> ParseResult<(Mapping, OptimizationSpec)> {
    let mut arch: Option<Architecture> = None;
    let mut tasks: Option<TasksSection> = None;
    let mut spec: Option<OptimizationSpec> = None;

    while arch.is_none() || tasks.is_none() || spec.is_none() {
        match reader.match_alternatives(&["architecture", "tasks", "optimization"])? {
            0 => {
                if arch.is_some() {
                    return err("duplicate architecture section".to_owned());
                }
                arch = Some(parse_architecture(reader, config)?);
            }
            1 => {
                if tasks.is_some() {
                    return err("duplicate tasks section".to_owned());
                }
                tasks = Some(parse_tasks(reader)?);
            }
            _ => {
                if spec.is_some() {
                    return err("duplicate optimization section".to_owned());
                }
                spec = Some(parse_optimization(reader, config)?);
            }
        }
    }

    let arch = Rc::new(arch.unwrap());
    let tasks = tasks.unwrap();
    let spec = spec.unwrap();

    let npes = arch.npes();
    if tasks.default_mapping >= npes {
        return err(format!(
            "default mapping PE {} outside the architecture",
            tasks.default_mapping
        ));
    }

    let mut map = Mapping::new(arch, Rc::new(tasks.app), tasks.default_mapping);

    for &(taskid, peid) in &tasks.explicit {
        if peid >= npes {
            return err(format!("task {} mapped to unknown PE {}", taskid, peid));
        }
        map.mappings[taskid] = peid;
    }
    for &taskid in &tasks.statics {
        map.is_static[taskid] = true;
    }

    // Additive trailing mapping lists
    loop {
        let word = match reader.try_word() {
            Some(word) => word.to_owned(),
            None => break,
        };
        if word != "mapping_list" {
            return err(format!("unexpected trailing section: {}", word));
        }
        for (taskid, peid) in parse_mapping_list(reader, map.ntasks())? {
            if peid >= npes {
                return err(format!("task {} mapped to unknown PE {}", taskid, peid));
            }
            map.mappings[taskid] = peid;
        }
    }

    Ok((map, spec))
}
