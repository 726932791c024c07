//! RateLab CLI: evaluate rating policies and inspect backtests.
//!
//! Commands:
//! - `evaluate`: score flat policy/plan genomes against a CSV dataset
//! - `run`: run an experiment described by a TOML config file
//! - `seasons`: list seasons, match counts and divisions of a dataset
//! - `table`: print the final rating table of an experiment
//! - `project`: Monte Carlo projection of one season of an experiment

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use ratelab_core::domain::{LeagueCatalog, LeagueSelection};
use ratelab_core::engine::BacktestEngine;
use ratelab_core::projection::project_season;
use ratelab_core::season::SeasonOutcome;
use ratelab_core::standings::LeagueTable;
use ratelab_core::MatchStore;
use ratelab_runner::report::{self, TableOrder};
use ratelab_runner::{
    init_logging, load_csv, load_selector, ExperimentConfig, FitnessAdapter, FitnessReduction,
    JsonlResultCache, ResultSink,
};

#[derive(Parser)]
#[command(
    name = "ratelab",
    about = "RateLab CLI: Elo rating backtesting and calibration"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one policy genome under one plan genome.
    Evaluate {
        /// Match CSV file.
        #[arg(long)]
        data: PathBuf,

        /// Policy genome: k,gamma,home_adv,hfa_weight,mv_weight,tie,w_div1[,w_div2..]
        #[arg(long, allow_hyphen_values = true)]
        policy: String,

        /// Plan genome: elo,year,years,variations,goals,home,market,divisions,leagues
        #[arg(long)]
        plan: String,

        /// Seed for randomized trials.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// JSONL result cache.
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Scalar reduction: mean, sum, last or max.
        #[arg(long, default_value = "mean")]
        fitness: String,
    },
    /// Run an experiment from a TOML config file.
    Run {
        #[arg(long)]
        config: PathBuf,
    },
    /// List the seasons and divisions of a dataset.
    Seasons {
        /// Match CSV file (defaults to the config's dataset).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Experiment config supplying the league catalog.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the rating table at the end of an experiment's window.
    Table {
        #[arg(long)]
        config: PathBuf,

        /// Sort alphabetically instead of by rating.
        #[arg(long, default_value_t = false)]
        by_name: bool,
    },
    /// Project one season from the ratings entering it.
    Project {
        #[arg(long)]
        config: PathBuf,

        /// Season to project (must lie in the backtest window).
        #[arg(long)]
        season: u16,

        #[arg(long, default_value_t = 1000)]
        samples: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match cli.command {
        Commands::Evaluate {
            data,
            policy,
            plan,
            seed,
            cache,
            fitness,
        } => {
            init_logging(level(verbose, "info"))?;
            run_evaluate(&data, &policy, &plan, seed, cache.as_deref(), &fitness)
        }
        Commands::Run { config } => {
            let config = load_config(&config, verbose)?;
            run_experiment(&config)
        }
        Commands::Seasons { data, config } => {
            let config = match config {
                Some(path) => Some(load_config(&path, verbose)?),
                None => {
                    init_logging(level(verbose, "warn"))?;
                    None
                }
            };
            let store = load_summary_store(data.as_deref(), config.as_ref())?;
            print!("{}", report::dataset_summary(&store)?);
            Ok(())
        }
        Commands::Table { config, by_name } => {
            let config = load_config(&config, verbose)?;
            run_table(&config, by_name)
        }
        Commands::Project {
            config,
            season,
            samples,
        } => {
            let config = load_config(&config, verbose)?;
            run_project(&config, season, samples)
        }
    }
}

fn level(verbose: bool, default: &str) -> &str {
    if verbose {
        "debug"
    } else {
        default
    }
}

fn load_config(path: &Path, verbose: bool) -> Result<ExperimentConfig> {
    let config = ExperimentConfig::from_file(path)?;
    init_logging(level(verbose, &config.logging.level))?;
    info!(config = %path.display(), seed = config.seed, "experiment loaded");
    Ok(config)
}

/// Load the experiment's dataset. A selector also narrows the plan to its league.
fn load_dataset(config: &ExperimentConfig) -> Result<(MatchStore, Option<LeagueSelection>)> {
    let catalog = config.catalog()?;
    match (&config.dataset.path, &config.dataset.selector) {
        (Some(path), _) => Ok((load_csv(path, &catalog)?, None)),
        (None, Some(selector)) => {
            let (store, selection) = load_selector(&config.dataset.data_root, selector, &catalog)?;
            Ok((store, Some(selection)))
        }
        (None, None) => bail!("[dataset] needs either `path` or `selector`"),
    }
}

/// Store for `seasons`: an explicit CSV wins, read with the config's catalog
/// when one is given; otherwise the config's own dataset.
fn load_summary_store(
    data: Option<&Path>,
    config: Option<&ExperimentConfig>,
) -> Result<MatchStore> {
    match (data, config) {
        (Some(path), Some(config)) => Ok(load_csv(path, &config.catalog()?)?),
        (Some(path), None) => Ok(load_csv(path, &LeagueCatalog::default())?),
        (None, Some(config)) => Ok(load_dataset(config)?.0),
        (None, None) => bail!("seasons needs --data or --config"),
    }
}

fn parse_genome(text: &str, what: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{what} genome: '{field}' is not a number"))
        })
        .collect()
}

fn parse_reduction(text: &str) -> Result<FitnessReduction> {
    Ok(match text.to_ascii_lowercase().as_str() {
        "mean" => FitnessReduction::Mean,
        "sum" => FitnessReduction::Sum,
        "last" => FitnessReduction::Last,
        "max" => FitnessReduction::Max,
        other => bail!("unknown fitness reduction '{other}' (mean, sum, last, max)"),
    })
}

fn run_evaluate(
    data: &Path,
    policy: &str,
    plan: &str,
    seed: u64,
    cache: Option<&Path>,
    fitness: &str,
) -> Result<()> {
    let policy_genome = parse_genome(policy, "policy")?;
    let plan_genome = parse_genome(plan, "plan")?;
    let reduction = parse_reduction(fitness)?;
    let store = load_csv(data, &LeagueCatalog::default())?;

    let cache = cache.map(JsonlResultCache::open).transpose()?;
    let mut adapter = FitnessAdapter::new(&store, seed).with_reduction(reduction);
    if let Some(cache) = &cache {
        adapter = adapter.with_sink(cache as &dyn ResultSink);
    }

    let evaluation = adapter.evaluate_genome(&policy_genome, &plan_genome)?;
    let errors: Vec<String> = evaluation.errors.iter().map(|e| format!("{e:.6}")).collect();
    println!("errors:  [{}]", errors.join(", "));
    println!("fitness: {:.6}", evaluation.fitness);
    println!(
        "key:     {}{}",
        evaluation.key,
        if evaluation.cached { " (cached)" } else { "" }
    );
    Ok(())
}

fn run_experiment(config: &ExperimentConfig) -> Result<()> {
    let (store, selection) = load_dataset(config)?;
    let mut plan = config.plan.clone();
    if let Some(selection) = selection {
        plan.leagues_to_use = selection;
    }

    let cache = config
        .cache
        .as_ref()
        .map(|c| JsonlResultCache::open(&c.path))
        .transpose()?;
    let mut adapter = FitnessAdapter::new(&store, config.seed).with_reduction(config.fitness);
    if let Some(cache) = &cache {
        adapter = adapter.with_sink(cache as &dyn ResultSink);
    }

    let evaluation = adapter.evaluate(&config.policy, &plan)?;
    let outcomes: Vec<SeasonOutcome> = plan
        .window()
        .zip(&evaluation.errors)
        .map(|(season, error)| SeasonOutcome {
            season,
            error: *error,
            matches: store.season_matches(season, plan.leagues_to_use).len(),
        })
        .collect();

    print!("{}", report::errors_by_season(&outcomes, config.fitness)?);
    println!(
        "key: {}{}",
        evaluation.key,
        if evaluation.cached { " (cached)" } else { "" }
    );
    Ok(())
}

fn run_table(config: &ExperimentConfig, by_name: bool) -> Result<()> {
    let (store, selection) = load_dataset(config)?;
    let mut plan = config.plan.clone();
    if let Some(selection) = selection {
        plan.leagues_to_use = selection;
    }

    let engine = BacktestEngine::new(&store, &config.policy, &plan, config.seed)?;
    let order = if by_name {
        TableOrder::ByName
    } else {
        TableOrder::ByRating
    };
    print!(
        "{}",
        report::rating_table(&store, &engine.final_table(), order)?
    );
    Ok(())
}

fn run_project(config: &ExperimentConfig, season: u16, samples: u32) -> Result<()> {
    let (store, selection) = load_dataset(config)?;
    let mut plan = config.plan.clone();
    if let Some(selection) = selection {
        plan.leagues_to_use = selection;
    }

    let engine = BacktestEngine::new(&store, &config.policy, &plan, config.seed)?;
    let projection = project_season(&engine, season, samples, config.seed)?;
    print!("{}", report::projection(&projection)?);

    let real = LeagueTable::compute(
        store.season_matches(season, plan.leagues_to_use),
        store.teams(),
    );
    println!();
    print!("{}", report::standings(&real)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Season,Date,League,Division,HomeTeam,AwayTeam,FTHG,FTAG
2019,2019-08-10,premier,1,Arsenal,Leeds,2,0
2019,2019-08-11,premier,1,Leeds,Arsenal,1,1
2020,2020-08-10,premier,1,Arsenal,Leeds,0,1
";

    fn premier_config(csv: &Path) -> ExperimentConfig {
        ExperimentConfig::from_toml(&format!(
            r#"
[dataset]
path = "{}"

[plan]
leagues_to_use = 1

[[leagues]]
name = "premier"
bit = 0
"#,
            csv.display().to_string().replace('\\', "/")
        ))
        .unwrap()
    }

    #[test]
    fn seasons_uses_the_config_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("premier.csv");
        std::fs::write(&csv, CSV).unwrap();
        let config = premier_config(&csv);

        assert!(load_summary_store(Some(&csv), None).is_err());

        let store = load_summary_store(Some(&csv), Some(&config)).unwrap();
        assert_eq!(store.len(), 3);
        let from_config = load_summary_store(None, Some(&config)).unwrap();
        assert_eq!(from_config.dataset_hash(), store.dataset_hash());

        let text = report::dataset_summary(&store).unwrap();
        assert!(text.contains("[0] premier division 1"));
    }

    #[test]
    fn seasons_without_inputs_fails() {
        assert!(load_summary_store(None, None).is_err());
    }

    #[test]
    fn genomes_parse_as_comma_lists() {
        assert_eq!(
            parse_genome("20, 1,-50", "policy").unwrap(),
            vec![20.0, 1.0, -50.0]
        );
        assert!(parse_genome("20,x", "policy").is_err());
        assert_eq!(parse_reduction("MAX").unwrap(), FitnessReduction::Max);
        assert!(parse_reduction("median").is_err());
    }
}
