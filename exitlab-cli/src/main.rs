//! ExitLab CLI: simulate a selling policy or sweep its parameters.
//!
//! Commands:
//! - `simulate`: run one policy from a TOML experiment file
//! - `sweep`: grid-search the policy parameters declared under `[sweep]`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use exitlab_runner::{
    save_run_artifacts, save_sweep_artifacts, ExperimentConfig, GridReport, GridSearch,
    GridSearchResult, RunReport, RunResult,
};

#[derive(Parser)]
#[command(
    name = "exitlab",
    about = "ExitLab CLI: Monte-Carlo evaluation of asset-selling policies"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the configured policy and write its trace.
    Simulate {
        /// Path to a TOML experiment file.
        #[arg(long)]
        config: PathBuf,

        /// Override the number of episodes.
        #[arg(long)]
        episodes: Option<usize>,

        /// Override the master seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for trace.csv and run.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Grid-search the parameters listed in the `[sweep]` section.
    Sweep {
        /// Path to a TOML experiment file.
        #[arg(long)]
        config: PathBuf,

        /// Override the number of episodes per combination.
        #[arg(long)]
        episodes: Option<usize>,

        /// Output directory for grid.csv, grid.json and pivot.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate {
            config,
            episodes,
            seed,
            output_dir,
        } => run_simulate(config, episodes, seed, output_dir),
        Commands::Sweep {
            config,
            episodes,
            output_dir,
        } => run_sweep(config, episodes, output_dir),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(
    path: &Path,
    episodes: Option<usize>,
    seed: Option<u64>,
) -> Result<ExperimentConfig> {
    let mut config = ExperimentConfig::load(path)
        .with_context(|| format!("failed to load experiment {}", path.display()))?;
    if let Some(n) = episodes {
        config.simulation.episodes = n;
    }
    if let Some(s) = seed {
        config.simulation.seed = s;
    }
    config.validate()?;
    Ok(config)
}

fn run_simulate(
    config_path: PathBuf,
    episodes: Option<usize>,
    seed: Option<u64>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = load_config(&config_path, episodes, seed)?;
    let run_id = config.run_id()?;
    info!(%run_id, policy = %config.policy.kind, "starting simulation");

    let model = config.build_model()?;
    let policy = config.policy.build()?;
    let simulator = config.build_simulator();
    let result = simulator.run_policy(&model, policy.as_ref(), config.simulation.episodes)?;

    print_run_summary(&result, &run_id);

    let report = RunReport::new(&result, simulator.seed(), Some(run_id));
    for path in save_run_artifacts(&result, &report, &output_dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_sweep(config_path: PathBuf, episodes: Option<usize>, output_dir: PathBuf) -> Result<()> {
    let config = load_config(&config_path, episodes, None)?;
    let Some(grid) = config.grid()? else {
        bail!(
            "{} has no [sweep] section; nothing to search",
            config_path.display()
        );
    };
    let run_id = config.run_id()?;
    info!(%run_id, policy = %config.policy.kind, combinations = grid.size(), "starting sweep");

    let model = config.build_model()?;
    let options = config.sweep_options();
    let search = GridSearch::new(config.build_simulator()).with_options(options);
    let result = search.grid_search_with_progress(
        &grid,
        &config.policy,
        &model,
        config.simulation.episodes,
        |done, total, run| {
            match run {
                Some(run) => debug!(
                    done,
                    total,
                    params = %run.parameters,
                    performance = run.performance,
                    "scored"
                ),
                None => debug!(done, total, "skipped"),
            }
        },
    )?;

    print_sweep_summary(&result);

    let report = GridReport::new(result, config.policy.kind, options, Some(run_id));
    for path in save_sweep_artifacts(&report, &output_dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_run_summary(result: &RunResult, run_id: &str) {
    let s = &result.stats;
    println!();
    println!("=== Simulation Result ===");
    println!("Run ID:         {}", &run_id[..run_id.len().min(16)]);
    println!("Policy:         {} {}", result.policy, result.parameters);
    println!("Episodes:       {}", result.n_episodes);
    println!("Objective:      {:.4} ({:?})", result.objective, result.objective_kind);
    println!();
    println!("--- Distribution ---");
    println!("Std Dev:        {:.4}", s.std_dev);
    println!("Min / Max:      {:.4} / {:.4}", s.min, s.max);
    println!("Median:         {:.4}", s.median);
    println!(
        "Forced Sales:   {} ({:.1}%)",
        s.forced_sales,
        s.forced_sales as f64 / result.n_episodes as f64 * 100.0
    );
    println!();
}

fn print_sweep_summary(result: &GridSearchResult) {
    let invalid = result.all_runs.len() - result.valid_runs().count();
    println!();
    println!("=== Grid Search Result ===");
    println!("Combinations:   {}", result.all_runs.len());
    if invalid > 0 {
        println!("Invalid:        {invalid}");
    }
    println!("Episodes/comb:  {}", result.n_episodes);
    println!("Best:           {}", result.best_parameters);
    println!("Performance:    {:.4}", result.best_performance);
    println!();
    println!("--- Top 5 ---");
    for (rank, run) in result.top_n(5).iter().enumerate() {
        println!("{:>2}. {:.4}  {}", rank + 1, run.performance, run.parameters);
    }
    println!();
}
