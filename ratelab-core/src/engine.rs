//! Backtest Engine: drives the Season Simulator across the plan's window,
//! optionally over randomized trials, and produces the `ErrorSeries`.
//!
//! All validation happens in [`BacktestEngine::new`]; once an engine exists
//! every run completes and returns a full series.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::domain::{DivisionKey, Match, Season};
use crate::error::EngineError;
use crate::plan::BacktestPlan;
use crate::policy::RatingPolicy;
use crate::rating::{RatingTable, UpdateFlags, UpdateRule};
use crate::rng::RngHierarchy;
use crate::season::{jitter_ambiguous, replay_season, SeasonOutcome};
use crate::store::MatchStore;

/// Per-season error values, one per season of the window, in order.
pub type ErrorSeries = Vec<f64>;

/// A validated (store, policy, plan, seed) combination, ready to run.
///
/// Holds only shared references into the store, so one engine can run
/// trials from several threads at once. Each run owns its Rating Table.
#[derive(Debug)]
pub struct BacktestEngine<'a> {
    store: &'a MatchStore,
    policy: &'a RatingPolicy,
    plan: &'a BacktestPlan,
    divisions: Vec<DivisionKey>,
    window: Vec<(Season, Vec<&'a Match>)>,
    rng: RngHierarchy,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(
        store: &'a MatchStore,
        policy: &'a RatingPolicy,
        plan: &'a BacktestPlan,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let selection = plan.leagues_to_use;
        store.catalog().validate(selection)?;
        plan.validate()?;

        if store.count_selected(selection) == 0 {
            return Err(EngineError::EmptyDataset);
        }

        let divisions = store.divisions(selection);
        policy.validate(divisions.len())?;

        let present: BTreeSet<Season> = store
            .matches()
            .iter()
            .filter(|m| selection.contains(m.league))
            .map(|m| m.season)
            .collect();
        let out_of_range = |reason: String| EngineError::OutOfRangeWindow {
            first: plan.starting_year,
            last: plan.last_season(),
            reason,
        };
        // `present` is non-empty: count_selected > 0.
        let earliest = present.first().copied().unwrap_or(Season::MAX);
        let latest = present.last().copied().unwrap_or(Season::MIN);
        if plan.starting_year < earliest {
            return Err(out_of_range(format!(
                "starts before the earliest season {earliest}"
            )));
        }
        if plan.end_season() > latest as u32 {
            return Err(out_of_range(format!(
                "starting_year + backtest_years = {} exceeds the latest season {latest}",
                plan.end_season()
            )));
        }

        let mut window = Vec::with_capacity(plan.backtest_years as usize);
        for season in plan.window() {
            let matches = store.season_matches(season, selection);
            if matches.is_empty() {
                return Err(out_of_range(format!("season {season} has no matches")));
            }
            window.push((season, matches));
        }

        debug!(
            first = plan.starting_year,
            seasons = window.len(),
            divisions = divisions.len(),
            trials = plan.random_variations,
            "backtest engine ready"
        );

        Ok(Self {
            store,
            policy,
            plan,
            divisions,
            window,
            rng: RngHierarchy::new(seed),
        })
    }

    pub fn store(&self) -> &MatchStore {
        self.store
    }

    pub fn policy(&self) -> &RatingPolicy {
        self.policy
    }

    pub fn plan(&self) -> &BacktestPlan {
        self.plan
    }

    /// Division keys in `w_division` order.
    pub fn divisions(&self) -> &[DivisionKey] {
        &self.divisions
    }

    /// Seasons of the window, in replay order.
    pub fn seasons(&self) -> impl Iterator<Item = Season> + '_ {
        self.window.iter().map(|(season, _)| *season)
    }

    pub fn rule(&self) -> UpdateRule<'_> {
        UpdateRule::new(self.policy, UpdateFlags::from(self.plan), &self.divisions)
    }

    /// Number of randomized trials `run` performs (0 means one deterministic pass).
    pub fn trials(&self) -> u32 {
        self.plan.random_variations
    }

    /// Replay the whole window into `table`, calling `on_season` after each season.
    ///
    /// `trial = None` replays in store order; `Some(i)` jitters every
    /// ambiguity group with the RNG derived for trial `i`.
    pub fn replay<F>(&self, table: &mut RatingTable, trial: Option<u32>, mut on_season: F) -> ErrorSeries
    where
        F: FnMut(&SeasonOutcome, &RatingTable),
    {
        let rule = self.rule();
        let mut series = Vec::with_capacity(self.window.len());
        for (season, matches) in &self.window {
            let outcome = match trial {
                None => replay_season(table, &rule, *season, matches, |_, _| {}),
                Some(i) => {
                    let mut order = matches.clone();
                    let mut rng = self.rng.rng_for(self.store.dataset_hash(), i, *season);
                    jitter_ambiguous(&mut order, &mut rng);
                    replay_season(table, &rule, *season, &order, |_, _| {})
                }
            };
            trace!(season = outcome.season, error = outcome.error, "season replayed");
            on_season(&outcome, table);
            series.push(outcome.error);
        }
        series
    }

    /// One pass in store order from a fresh table.
    pub fn run_deterministic(&self) -> ErrorSeries {
        let mut table = RatingTable::new(self.plan.starting_elo);
        self.replay(&mut table, None, |_, _| {})
    }

    /// Randomized trial `trial` from a fresh table.
    pub fn run_trial(&self, trial: u32) -> ErrorSeries {
        let mut table = RatingTable::new(self.plan.starting_elo);
        self.replay(&mut table, Some(trial), |_, _| {})
    }

    /// Full evaluation: the deterministic pass, or the element-wise mean of
    /// `random_variations` trials run sequentially in trial order.
    pub fn run(&self) -> ErrorSeries {
        match self.trials() {
            0 => self.run_deterministic(),
            n => {
                let trials: Vec<ErrorSeries> = (0..n).map(|i| self.run_trial(i)).collect();
                average_series(&trials)
            }
        }
    }

    /// Per-season outcomes of the deterministic pass.
    pub fn season_outcomes(&self) -> Vec<SeasonOutcome> {
        let mut table = RatingTable::new(self.plan.starting_elo);
        let mut outcomes = Vec::with_capacity(self.window.len());
        self.replay(&mut table, None, |outcome, _| outcomes.push(*outcome));
        outcomes
    }

    /// Ratings after the deterministic pass over the whole window.
    pub fn final_table(&self) -> RatingTable {
        let mut table = RatingTable::new(self.plan.starting_elo);
        self.replay(&mut table, None, |_, _| {});
        table
    }

    /// Ratings entering `season` (deterministic pass over the earlier window
    /// seasons), together with that season's matches.
    pub fn ratings_entering(
        &self,
        season: Season,
    ) -> Result<(RatingTable, &[&'a Match]), EngineError> {
        let position = self
            .window
            .iter()
            .position(|(s, _)| *s == season)
            .ok_or_else(|| EngineError::OutOfRangeWindow {
                first: self.plan.starting_year,
                last: self.plan.last_season(),
                reason: format!("season {season} is outside the backtest window"),
            })?;

        let rule = self.rule();
        let mut table = RatingTable::new(self.plan.starting_elo);
        for (s, matches) in &self.window[..position] {
            replay_season(&mut table, &rule, *s, matches, |_, _| {});
        }
        Ok((table, &self.window[position].1))
    }
}

/// Element-wise running mean of equally long series, in slice order.
///
/// Identical series average to themselves bit for bit.
pub fn average_series(series: &[ErrorSeries]) -> ErrorSeries {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|i| {
            series
                .iter()
                .enumerate()
                .fold(0.0, |mean, (n, s)| mean + (s[i] - mean) / (n + 1) as f64)
        })
        .collect()
}

/// Validate and run in one call.
pub fn run_backtest(
    store: &MatchStore,
    policy: &RatingPolicy,
    plan: &BacktestPlan,
    seed: u64,
) -> Result<ErrorSeries, EngineError> {
    Ok(BacktestEngine::new(store, policy, plan, seed)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_identical_series_is_unchanged() {
        let s = vec![0.61, 0.58, 0.6, 0.42753451286971084, 0.8217617900506308];
        for n in 1..=8 {
            let avg = average_series(&vec![s.clone(); n]);
            assert_eq!(avg, s, "{n} copies");
        }
    }

    #[test]
    fn average_is_element_wise() {
        let avg = average_series(&[vec![1.0, 2.0], vec![3.0, 6.0]]);
        assert_eq!(avg, vec![2.0, 4.0]);
        assert!(average_series(&[]).is_empty());
    }
}
