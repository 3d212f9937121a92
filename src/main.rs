//! `dcore` command-line solver.
//!
//! Reads a METIS graph, optionally kernelizes it or loads an initial solution,
//! runs the core search and prints `name n m weight time`.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use dcore::kernel::default_rules;
use dcore::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Merge {
    Diversify,
    NotWorse,
    Always,
}

impl From<Merge> for MergePolicy {
    fn from(m: Merge) -> Self {
        match m {
            Merge::Diversify => MergePolicy::Diversify,
            Merge::NotWorse => MergePolicy::NotWorse,
            Merge::Always => MergePolicy::Always,
        }
    }
}

/// Parallel local search for maximum weight independent sets.
#[derive(Parser, Debug)]
#[command(name = "dcore", version)]
#[command(about = "Parallel local search for maximum weight independent sets")]
struct Args {
    /// Input graph in METIS format.
    #[arg(short, long)]
    graph: PathBuf,

    /// Initial solution (1-indexed vertex ids).
    #[arg(short, long)]
    initial: Option<PathBuf>,

    /// Where to write the best solution.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of replicas.
    #[arg(short = 'p', long, default_value = "8")]
    replicas: usize,

    /// Worker threads (defaults to the replica count).
    #[arg(short = 'c', long)]
    threads: Option<usize>,

    /// Total time limit in seconds.
    #[arg(short, long, default_value = "3600")]
    timeout: f64,

    /// Length of one explore phase in seconds.
    #[arg(short, long, default_value = "10")]
    step: f64,

    /// Maximum number of rounds.
    #[arg(long)]
    rounds: Option<u64>,

    /// Base random seed.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Kernelize for at most this many seconds before searching (ignored with --initial).
    #[arg(short, long)]
    reduce: Option<f64>,

    /// Merge rule for core results.
    #[arg(long, value_enum, default_value = "diversify")]
    merge: Merge,

    /// Start core engines from the empty set instead of the replica's assignment.
    #[arg(long)]
    empty_core: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid --{flag} value {value}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let timeout = seconds(args.timeout, "timeout")?;
    let step = seconds(args.step, "step")?;

    let graph = read_metis(&args.graph).with_context(|| format!("failed to load {}", args.graph.display()))?;
    info!(
        vertices = graph.len(),
        edges = graph.edge_count(),
        total_weight = graph.total_weight(),
        "graph loaded"
    );

    let initial = match &args.initial {
        Some(path) => {
            let mask = load_solution(path, graph.len())
                .with_context(|| format!("failed to load initial solution {}", path.display()))?;
            let weight = validate_solution(&graph, &mask)
                .with_context(|| format!("initial solution {} is not independent", path.display()))?;
            info!(weight, "initial solution loaded");
            Some(mask)
        }
        None => None,
    };

    let reduced = match (args.reduce, &initial) {
        (Some(secs), None) => {
            let limit = seconds(secs, "reduce")?;
            let reduction = kernelize(&graph, &mut default_rules(), limit);
            Some(ReducedGraph::new(&graph, reduction).context("kernelization produced an inconsistent reduction")?)
        }
        (Some(_), Some(_)) => {
            warn!("--reduce is ignored when an initial solution is given");
            None
        }
        _ => None,
    };
    let work = reduced.as_ref().map_or(&graph, ReducedGraph::graph);

    let config = SearchConfig {
        replicas: args.replicas,
        threads: args.threads,
        seed: args.seed,
        step_time: step,
        merge_policy: args.merge.into(),
        core_seeding: if args.empty_core {
            CoreSeeding::Empty
        } else {
            CoreSeeding::FromReplica
        },
        ..SearchConfig::default()
    };
    let mut search = CoreSearch::new(work, config)?;
    if let Some(mask) = &initial {
        search.set_solution_all(work, mask)?;
    }

    let remaining = timeout.saturating_sub(start.elapsed());
    let outcome = search.run(work, remaining, args.rounds.unwrap_or(u64::MAX));

    let solution = match &reduced {
        Some(r) => r.lift(&outcome.independent_set),
        None => outcome.independent_set.clone(),
    };
    let weight = validate_solution(&graph, &solution).context("search produced an invalid solution")?;
    let expected = reduced.as_ref().map_or(outcome.cost, |r| r.lift_weight(outcome.cost));
    if weight != expected {
        bail!("solution weight {weight} does not match the reported weight {expected}");
    }

    let name = args
        .graph
        .file_name()
        .map_or_else(|| args.graph.display().to_string(), |f| f.to_string_lossy().into_owned());
    println!(
        "{} {} {} {} {:.3}",
        name,
        graph.len(),
        graph.edge_count(),
        weight,
        outcome.time.as_secs_f64()
    );

    if let Some(path) = &args.output {
        save_solution(path, &solution).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "solution written");
    }
    Ok(())
}
