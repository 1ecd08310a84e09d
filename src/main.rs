use clap::Parser;
use log::warn;
use mapping_lib::cli::Cli;
use mapping_lib::config::Config;
use mapping_lib::input::{TokenReader, parse_input};
use mapping_lib::optimize::moves::{HEURISTIC_NAMES, MoveHeuristic};
use mapping_lib::optimize::{OptContext, optimize};
use mapping_lib::report::{ReportSummary, print_result, write_report, write_trace};
use mapping_lib::support::RandomSource;
use std::fs::File;
use std::io::Read;
use std::process::ExitCode;

fn run(config: &Config, input: Option<&std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = match input {
        Some(path) => {
            let mut file =
                File::open(path).map_err(|e| format!("can not open {}: {}", path.display(), e))?;
            TokenReader::new(&mut file)?
        }
        None => {
            let mut stdin = std::io::stdin().lock();
            TokenReader::new(&mut stdin as &mut dyn Read)?
        }
    };

    let (mut map, mut spec) = parse_input(&mut reader, config)?;

    // The -m flag only makes sense for annealing-based methods
    if let Some(name) = &config.sa_heuristic {
        let heuristic = MoveHeuristic::from_name(name)
            .ok_or_else(|| format!("unknown mapping heuristic: {}", name))?;
        match spec.sa_params_mut() {
            Some(params) => {
                params.heuristic = heuristic;
                warn!("sa_heuristics: {} (override)", name);
            }
            None => {
                warn!("simulated annealing is not used, but a heuristics name was given");
            }
        }
    }

    let rng = match config.seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    };
    let mut ctx = OptContext::new(
        spec.objective,
        config.find_maximum,
        config.output_file.is_some(),
        rng,
    );

    let original = map.fork();
    let (mut best, result) = optimize(&mut map, &mut spec, config, &mut ctx);

    print_result(&mut best, &original, &spec, config, &ctx, &result);

    if let Some(path) = &config.output_file {
        let frames = ctx.trace.as_deref().unwrap_or(&[]);
        write_trace(path, frames)?;
    }
    if let Some(path) = &config.report_file {
        let summary = ReportSummary::new(&best, &spec, &ctx, &result);
        write_report(path, &summary)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_mapping_heuristics {
        for (name, _) in HEURISTIC_NAMES {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let mut config = Config {
        find_maximum: cli.find_maximum,
        fast_premapping: cli.fast_premapping,
        arbitration_policy: cli.arb_policy,
        ic_priorities: cli.ic_priorities,
        sa_heuristic: cli.mapping_heuristics,
        output_file: cli.output,
        report_file: cli.report,
        seed: cli.seed,
        ..Config::default()
    };

    for parameter in &cli.parameter {
        let (name, value) = match parameter.split_once('=') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None => (parameter.clone(), String::new()),
        };
        warn!("append parameter: {} = {}", name, value);
        config.parameters.push((name, value));
        config.raw_parameter = Some(parameter.clone());
    }

    match run(&config, cli.input.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("taskmap: {}", error);
            ExitCode::FAILURE
        }
    }
}
