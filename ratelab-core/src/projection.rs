//! Monte Carlo season projection.
//!
//! Freezes the ratings entering a season, samples every match outcome from
//! the predicted triple, and compares expected points with the real table.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Outcome, Season, TeamId};
use crate::engine::BacktestEngine;
use crate::error::EngineError;
use crate::metrics::{rmse, NeumaierSum};
use crate::rng::RngHierarchy;
use crate::standings::{LeagueTable, DRAW_POINTS, WIN_POINTS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProjection {
    pub team: TeamId,
    pub name: String,
    pub rating: f64,
    pub expected_points: f64,
    pub real_points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonProjection {
    pub season: Season,
    pub samples: u32,
    /// Sorted by expected points, descending.
    pub teams: Vec<TeamProjection>,
    /// RMSE between expected and real points across teams.
    pub points_rmse: f64,
}

/// Project `season` with `samples` simulated replays.
///
/// Sample `i` draws from the RNG derived for trial `i` of `seed`, so a
/// projection is reproducible for a given seed.
pub fn project_season(
    engine: &BacktestEngine<'_>,
    season: Season,
    samples: u32,
    seed: u64,
) -> Result<SeasonProjection, EngineError> {
    if samples == 0 {
        return Err(EngineError::malformed("projection needs at least one sample"));
    }
    let (table, matches) = engine.ratings_entering(season)?;
    let rule = engine.rule();
    let predictions: Vec<_> = matches
        .iter()
        .map(|game| (game.home, game.away, rule.probabilities(&table, game)))
        .collect();

    let hierarchy = RngHierarchy::new(seed);
    let dataset = engine.store().dataset_hash();
    let mut totals: HashMap<TeamId, NeumaierSum> = HashMap::new();

    for sample in 0..samples {
        let mut rng = hierarchy.rng_for(dataset, sample, season);
        let mut points: HashMap<TeamId, u32> = HashMap::new();
        for (home, away, triple) in &predictions {
            let draw: f64 = rng.gen();
            let outcome = if draw < triple.home {
                Outcome::HomeWin
            } else if draw < triple.home + triple.draw {
                Outcome::Draw
            } else {
                Outcome::AwayWin
            };
            let (home_points, away_points) = match outcome {
                Outcome::HomeWin => (WIN_POINTS, 0),
                Outcome::Draw => (DRAW_POINTS, DRAW_POINTS),
                Outcome::AwayWin => (0, WIN_POINTS),
            };
            *points.entry(*home).or_default() += home_points;
            *points.entry(*away).or_default() += away_points;
        }
        // Every team gets one term per sample so the means line up.
        for (team, pts) in points {
            totals.entry(team).or_default().add(pts as f64);
        }
    }

    let real = LeagueTable::compute(matches.iter().copied(), engine.store().teams());
    let mut teams: Vec<TeamProjection> = real
        .rows
        .iter()
        .map(|row| TeamProjection {
            team: row.team,
            name: row.name.clone(),
            rating: table.rating(row.team),
            expected_points: totals
                .get(&row.team)
                .and_then(NeumaierSum::mean)
                .unwrap_or(0.0),
            real_points: row.points,
        })
        .collect();
    teams.sort_by(|a, b| {
        b.expected_points
            .total_cmp(&a.expected_points)
            .then(a.name.cmp(&b.name))
    });

    let points_rmse = rmse(
        teams
            .iter()
            .map(|t| (t.expected_points, t.real_points as f64)),
    )
    .unwrap_or(0.0);

    Ok(SeasonProjection {
        season,
        samples,
        teams,
        points_rmse,
    })
}
