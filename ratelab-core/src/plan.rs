//! Backtest Plan: which seasons are replayed and how randomized repetition
//! is applied, plus its flat genome codec.
//!
//! Genome field order:
//! `[starting_elo, starting_year, backtest_years, random_variations,
//!   use_goals_diff, use_home_advantage, use_market_value, use_division_weights,
//!   leagues_to_use]`.
//! Flags decode by a nonzero test and encode as 0/1.

use serde::{Deserialize, Serialize};

use crate::domain::{LeagueSelection, Season};
use crate::error::EngineError;

pub const PLAN_GENOME_LEN: usize = 9;

/// Missing fields take their `Default` values when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestPlan {
    /// Rating assigned to a team the first time it appears.
    pub starting_elo: f64,
    /// First season replayed.
    pub starting_year: Season,
    /// Number of consecutive seasons replayed (>= 1).
    pub backtest_years: u16,
    /// Independent randomized repetitions; 0 is a single deterministic pass.
    pub random_variations: u32,
    pub use_goals_diff: bool,
    pub use_home_advantage: bool,
    pub use_market_value: bool,
    pub use_division_weights: bool,
    pub leagues_to_use: LeagueSelection,
}

impl Default for BacktestPlan {
    fn default() -> Self {
        Self {
            starting_elo: 1000.0,
            starting_year: 2003,
            backtest_years: 8,
            random_variations: 0,
            use_goals_diff: false,
            use_home_advantage: false,
            use_market_value: false,
            use_division_weights: true,
            leagues_to_use: LeagueSelection(1),
        }
    }
}

impl BacktestPlan {
    pub fn decode(genome: &[f64]) -> Result<Self, EngineError> {
        if genome.len() != PLAN_GENOME_LEN {
            return Err(EngineError::malformed(format!(
                "plan genome has {} entries, expected {PLAN_GENOME_LEN}",
                genome.len()
            )));
        }
        if !genome[0].is_finite() {
            return Err(EngineError::malformed("starting_elo is not finite"));
        }

        let plan = Self {
            starting_elo: genome[0],
            starting_year: integral(genome[1], "starting_year", u16::MAX as u64)? as u16,
            backtest_years: integral(genome[2], "backtest_years", u16::MAX as u64)? as u16,
            random_variations: integral(genome[3], "random_variations", u32::MAX as u64)?
                as u32,
            use_goals_diff: flag(genome[4], "use_goals_diff")?,
            use_home_advantage: flag(genome[5], "use_home_advantage")?,
            use_market_value: flag(genome[6], "use_market_value")?,
            use_division_weights: flag(genome[7], "use_division_weights")?,
            leagues_to_use: LeagueSelection(
                integral(genome[8], "leagues_to_use", u16::MAX as u64)? as u16,
            ),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn encode(&self) -> Vec<f64> {
        let bit = |b: bool| if b { 1.0 } else { 0.0 };
        vec![
            self.starting_elo,
            self.starting_year as f64,
            self.backtest_years as f64,
            self.random_variations as f64,
            bit(self.use_goals_diff),
            bit(self.use_home_advantage),
            bit(self.use_market_value),
            bit(self.use_division_weights),
            self.leagues_to_use.0 as f64,
        ]
    }

    /// Domain checks that do not need the dataset.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.starting_elo.is_finite() {
            return Err(EngineError::malformed("starting_elo is not finite"));
        }
        if self.backtest_years == 0 {
            return Err(EngineError::malformed("backtest_years must be at least 1"));
        }
        Ok(())
    }

    /// Seasons replayed, in order.
    pub fn window(&self) -> impl Iterator<Item = Season> {
        let first = self.starting_year as u32;
        let end = first + self.backtest_years as u32;
        (first..end).map(|s| s as Season)
    }

    /// Last season of the window, widened so it cannot overflow.
    pub fn last_season(&self) -> u32 {
        self.starting_year as u32 + self.backtest_years.max(1) as u32 - 1
    }

    /// `starting_year + backtest_years`: the season after the window. The
    /// store must reach at least this season.
    pub fn end_season(&self) -> u32 {
        self.starting_year as u32 + self.backtest_years as u32
    }
}

fn integral(value: f64, field: &str, max: u64) -> Result<u64, EngineError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > max as f64 {
        return Err(EngineError::malformed(format!(
            "{field} must be an integer in 0..={max}, got {value}"
        )));
    }
    Ok(value as u64)
}

fn flag(value: f64, field: &str) -> Result<bool, EngineError> {
    if value.is_nan() {
        return Err(EngineError::malformed(format!("{field} is NaN")));
    }
    Ok(value != 0.0)
}
