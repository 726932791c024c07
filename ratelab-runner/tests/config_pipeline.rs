//! Integration test: TOML experiment file → dataset → evaluation → reports.

use std::path::PathBuf;

use ratelab_core::engine::BacktestEngine;
use ratelab_core::projection::project_season;
use ratelab_core::standings::LeagueTable;
use ratelab_runner::report::{self, TableOrder};
use ratelab_runner::{load_csv, ExperimentConfig, FitnessAdapter};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/league_sample.csv")
}

fn write_config(dir: &std::path::Path) -> PathBuf {
    let toml = format!(
        r#"
seed = 21
fitness = "mean"

[dataset]
path = "{}"

[plan]
starting_elo = 1000.0
starting_year = 2015
backtest_years = 2
random_variations = 4
use_goals_diff = true
use_home_advantage = true

[policy]
k_factor = 30.0
home_advantage = 70.0
tie_frequency = 0.28
w_division = [25.0, -25.0]

[cache]
path = "{}"
"#,
        fixture_path().display().to_string().replace('\\', "/"),
        dir.join("cache/history.jsonl").display().to_string().replace('\\', "/"),
    );
    let path = dir.join("experiment.toml");
    std::fs::write(&path, toml).unwrap();
    path
}

#[test]
fn experiment_file_drives_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig::from_file(&write_config(dir.path())).unwrap();
    let catalog = config.catalog().unwrap();
    let store = load_csv(config.dataset.path.as_ref().unwrap(), &catalog).unwrap();

    let adapter = FitnessAdapter::new(&store, config.seed).with_reduction(config.fitness);
    let evaluation = adapter.evaluate(&config.policy, &config.plan).unwrap();
    assert_eq!(evaluation.errors.len(), 2);
    let mean = evaluation.errors.iter().sum::<f64>() / 2.0;
    assert!((evaluation.fitness - mean).abs() < 1e-12);

    let engine = BacktestEngine::new(&store, &config.policy, &config.plan, config.seed).unwrap();
    let text = report::errors_by_season(&engine.season_outcomes(), config.fitness).unwrap();
    assert!(text.contains("2015") && text.contains("2016"));
    assert!(!text.contains("2017"));

    let table = engine.final_table();
    let ratings = report::rating_table(&store, &table, TableOrder::ByRating).unwrap();
    assert!(ratings.contains("Flamengo"));
    assert_eq!(ratings.lines().count(), 10 + 2);

    let standings = LeagueTable::compute(store.season(2017), store.teams());
    assert_eq!(report::standings(&standings).unwrap().lines().count(), 1 + 10);

    let projection = project_season(&engine, 2016, 200, config.seed).unwrap();
    assert_eq!(projection.teams.len(), 10);
    assert!(report::projection(&projection).unwrap().contains("points RMSE"));
}

#[test]
fn dataset_summary_lists_every_season() {
    let store = load_csv(&fixture_path(), &Default::default()).unwrap();
    let text = report::dataset_summary(&store).unwrap();
    for season in ["2015", "2016", "2017"] {
        assert!(text.contains(season));
    }
    assert!(text.contains("[1] brasileirao division 2"));
}

#[test]
fn bundled_sample_config_runs_on_fixture() {
    let mut config =
        ExperimentConfig::from_toml(include_str!("../../configs/brasileirao_sample.toml")).unwrap();
    config.dataset.path = Some(fixture_path());

    let store = load_csv(&fixture_path(), &config.catalog().unwrap()).unwrap();
    let evaluation = FitnessAdapter::new(&store, config.seed)
        .with_reduction(config.fitness)
        .evaluate(&config.policy, &config.plan)
        .unwrap();
    assert_eq!(evaluation.errors.len(), 2);
    assert!(evaluation.fitness.is_finite());
}
