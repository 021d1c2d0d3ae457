extern crate clap;
use clap::{Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::ProgressBar;
use log::{error, info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod error;
use error::{EmError, Result};

mod config;
use config::EmConfig;

mod estimator;
use estimator::{EmStatus, Estimator, NoProgress, Progress};
use estimator::posterior::normalize;
use estimator::readers::read_alignments;

mod assignment;
use assignment::resolve_assignments;
use assignment::writers::{create_output_dir, write_assignments, write_posterior};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) status: EmStatus,
    pub(crate) targets: usize,
    pub(crate) assigned_reads: usize,
    pub(crate) dropped_reads: usize,
    pub(crate) seed: u64,
}

/*
load the alignments, run the EM and write both output tables into output_dir.
nothing is written when loading or estimation fails
*/
pub(crate) fn run<P: Progress>(input: &Path, output_dir: &Path, config: &EmConfig, progress: &mut P) -> Result<RunSummary> {
    config.validate()?;
    if config.processors > 1 {
        info!("processors = {} is accepted but the EM runs on a single thread", config.processors);
    }

    let start = Instant::now();
    let (table, stats) = read_alignments(input)?;
    stats.print_stats();
    info!("Time took to load data: {:?}", start.elapsed());

    let start = Instant::now();
    let estimator = Estimator::new(&table, config.max_iter, config.convergence);
    let outcome = estimator.run_em(progress)?;
    match outcome.status {
        EmStatus::Converged { iterations } => info!("EM converged after {} iterations", iterations),
        EmStatus::Exhausted { iterations } => warn!(
            "EM did not converge within max_iter = {} iterations (threshold {}), using the last posterior",
            iterations, config.convergence
        ),
    }
    info!("Time took to perform EM: {:?}", start.elapsed());
    let posterior = normalize(outcome.posterior)?;

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("tie-break seed = {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let resolution = resolve_assignments(&table, &posterior, &mut rng);

    create_output_dir(output_dir)?;
    write_posterior(output_dir, &posterior)?;
    write_assignments(output_dir, &resolution.assignments)?;

    Ok(RunSummary {
        status: outcome.status,
        targets: posterior.len(),
        assigned_reads: resolution.assignments.len(),
        dropped_reads: resolution.dropped_reads,
        seed,
    })
}

fn cli() -> Command<'static> {
    Command::new("mmr-em").version("0.1.0")
        .about("Expectation Maximization with a single-mapper prior for distributing multi-mapping reads to targets")
        .arg(Arg::new("input_file")
            .short('i')
            .long("input_file")
            .help("tab separated file without header: read_full_name, read_id, target_id")
            .required(true)
            .takes_value(true)
            .display_order(1))
        .arg(Arg::new("output_dir")
            .short('o')
            .long("output_dir")
            .help("folder for posterior_target_probabilities.txt and Final.bedpe, created if missing")
            .required(true)
            .takes_value(true)
            .display_order(2))
        .arg(Arg::new("max_iter")
            .short('m')
            .long("max_iter")
            .help("max iterations of the EM algorithm (default 1000)")
            .takes_value(true)
            .display_order(3))
        .arg(Arg::new("convergence")
            .short('c')
            .long("convergence")
            .help("convergence value of the EM (default 1e-6)")
            .takes_value(true)
            .display_order(3))
        .arg(Arg::new("seed")
            .short('s')
            .long("seed")
            .help("seed for breaking ties between equally probable targets")
            .takes_value(true)
            .display_order(3))
        .arg(Arg::new("processors")
            .short('p')
            .long("processors")
            .help("number of processors (default 4, currently unused)")
            .takes_value(true)
            .display_order(4))
        .arg(Arg::new("config")
            .long("config")
            .help("toml file with max_iter, convergence, seed and processors")
            .takes_value(true)
            .display_order(4))
        .arg(Arg::new("quiet")
            .short('q')
            .long("quiet")
            .help("do not show the iteration progress bar")
            .display_order(5))
        .arg(Arg::new("verbose")
            .short('v')
            .multiple_occurrences(true)
            .help("more logging, repeat for debug output")
            .display_order(5))
}

fn parse_value<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(value) => value.parse()
            .map(Some)
            .map_err(|_| EmError::config(format!("invalid value for --{}: {}", name, value))),
        None => Ok(None),
    }
}

// built-in defaults, then the config file, then the flags given on the command line
fn build_config(matches: &ArgMatches) -> Result<EmConfig> {
    let mut config = match matches.value_of("config") {
        Some(path) => EmConfig::from_file(Path::new(path))?,
        None => EmConfig::default(),
    };
    if let Some(max_iter) = parse_value(matches, "max_iter")? {
        config.max_iter = max_iter;
    }
    if let Some(convergence) = parse_value(matches, "convergence")? {
        config.convergence = convergence;
    }
    if let Some(seed) = parse_value(matches, "seed")? {
        config.seed = Some(seed);
    }
    if let Some(processors) = parse_value(matches, "processors")? {
        config.processors = processors;
    }
    Ok(config)
}

fn run_cli(matches: &ArgMatches) -> Result<RunSummary> {
    let config = build_config(matches)?;
    let input = PathBuf::from(matches.value_of("input_file").unwrap_or_default());
    let output_dir = PathBuf::from(matches.value_of("output_dir").unwrap_or_default());
    info!("Input file: {}", input.display());

    if matches.is_present("quiet") {
        run(&input, &output_dir, &config, &mut NoProgress)
    } else {
        let mut bar = ProgressBar::new(config.max_iter as u64);
        run(&input, &output_dir, &config, &mut bar)
    }
}

fn main() {
    let matches = cli().get_matches();

    let filter_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .parse_default_env()
        .init();

    match run_cli(&matches) {
        Ok(summary) => info!("{} reads assigned to {} targets ({} unsupported multi-mapped reads dropped) after {} EM iterations{} (seed {})",
            summary.assigned_reads, summary.targets, summary.dropped_reads, summary.status.iterations(),
            if summary.status.is_converged() { "" } else { ", not converged" }, summary.seed),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
