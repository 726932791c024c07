//! Rating Update Rule.
//!
//! For one match:
//! 1. effective ratings = raw rating + home bonus + division offset, then
//!    blended towards the market-value gap;
//! 2. expected home score `p = 1 / (1 + 10^(-gamma * gap / 400))`;
//! 3. outcome triple with `tie_frequency` moving mass from both sides to the draw;
//! 4. `delta = k * margin_multiplier * (actual - p)`, `+delta` home, `-delta` away.
//!
//! Effective adjustments only shift the expectation. The raw deltas are
//! always an exact `(+d, -d)` pair.

use serde::{Deserialize, Serialize};

use super::table::RatingTable;
use crate::domain::{DivisionKey, Match, Outcome};
use crate::metrics;
use crate::plan::BacktestPlan;
use crate::policy::{clamp01, RatingPolicy};

/// Rating points per factor of ten in the odds.
pub const LOGISTIC_SCALE: f64 = 400.0;

/// Predicted (home win, draw, away win) probabilities. Sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbabilities {
    /// Expected score for the home side (draw counts half).
    pub fn expected_home_score(&self) -> f64 {
        self.home + self.draw / 2.0
    }

    pub fn brier(&self, outcome: Outcome) -> f64 {
        metrics::brier(self, outcome)
    }

    /// Probability assigned to `outcome`.
    pub fn of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::HomeWin => self.home,
            Outcome::Draw => self.draw,
            Outcome::AwayWin => self.away,
        }
    }
}

/// Logistic expected score for a rating gap (home minus away).
pub fn expected_score(gap: f64, gamma: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-gamma * gap / LOGISTIC_SCALE))
}

/// Split an expected home score into a triple.
///
/// The draw takes `tie_frequency` of the mass both sides could give up
/// (`2 * min(p, 1-p)`), half from each side, so the expected score stays `p`.
pub fn outcome_probabilities(p: f64, tie_frequency: f64) -> OutcomeProbabilities {
    let draw = clamp01(tie_frequency) * 2.0 * p.min(1.0 - p);
    OutcomeProbabilities {
        home: (p - draw / 2.0).max(0.0),
        draw,
        away: (1.0 - p - draw / 2.0).max(0.0),
    }
}

/// Margin-of-victory multiplier: 1 up to a one-goal margin, then `2 - 1/g`.
/// Non-decreasing and bounded by 2.
pub fn margin_multiplier(goal_margin: u16) -> f64 {
    if goal_margin <= 1 {
        1.0
    } else {
        2.0 - 1.0 / goal_margin as f64
    }
}

/// Plan switches that change the update rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFlags {
    pub goals_diff: bool,
    pub home_advantage: bool,
    pub market_value: bool,
    pub division_weights: bool,
}

impl From<&BacktestPlan> for UpdateFlags {
    fn from(plan: &BacktestPlan) -> Self {
        Self {
            goals_diff: plan.use_goals_diff,
            home_advantage: plan.use_home_advantage,
            market_value: plan.use_market_value,
            division_weights: plan.use_division_weights,
        }
    }
}

/// Result of applying the rule to one match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingUpdate {
    /// Pre-match prediction.
    pub probabilities: OutcomeProbabilities,
    pub home_delta: f64,
    pub away_delta: f64,
}

/// The update rule bound to a policy, a plan's switches and the active divisions.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRule<'a> {
    policy: &'a RatingPolicy,
    flags: UpdateFlags,
    divisions: &'a [DivisionKey],
}

impl<'a> UpdateRule<'a> {
    pub fn new(policy: &'a RatingPolicy, flags: UpdateFlags, divisions: &'a [DivisionKey]) -> Self {
        Self {
            policy,
            flags,
            divisions,
        }
    }

    pub fn policy(&self) -> &RatingPolicy {
        self.policy
    }

    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    /// Effective (home, away) ratings for `game` given the current table.
    pub fn effective_ratings(&self, table: &RatingTable, game: &Match) -> (f64, f64) {
        let policy = self.policy;
        let mut home = table.rating(game.home);
        let mut away = table.rating(game.away);

        if self.flags.home_advantage {
            home += policy.home_advantage * clamp01(policy.home_field_advantage_weight);
        }

        if self.flags.division_weights {
            let key = game.division_key();
            let home_tier = table.tier(game.home).unwrap_or(key);
            let away_tier = table.tier(game.away).unwrap_or(key);
            home += policy.division_offset(self.divisions, home_tier);
            away += policy.division_offset(self.divisions, away_tier);
        }

        let w = clamp01(policy.market_value_weight);
        if self.flags.market_value && w > 0.0 {
            if let Some((home_value, away_value)) = game.market_values() {
                let gap = LOGISTIC_SCALE * (home_value / away_value).log10();
                let mid = (home + away) / 2.0;
                home = (1.0 - w) * home + w * (mid + gap / 2.0);
                away = (1.0 - w) * away + w * (mid - gap / 2.0);
            }
        }

        (home, away)
    }

    /// Pre-match outcome triple. Does not touch the table.
    pub fn probabilities(&self, table: &RatingTable, game: &Match) -> OutcomeProbabilities {
        let (home, away) = self.effective_ratings(table, game);
        let p = expected_score(home - away, self.policy.gamma.max(0.0));
        outcome_probabilities(p, self.policy.tie_frequency)
    }

    /// Apply one match: mutates exactly the two teams involved.
    pub fn apply(&self, table: &mut RatingTable, game: &Match) -> RatingUpdate {
        let probabilities = self.probabilities(table, game);
        let expected = probabilities.expected_home_score();
        let actual = game.outcome().home_score();

        let scale = if self.flags.goals_diff {
            margin_multiplier(game.goal_margin())
        } else {
            1.0
        };
        let delta = self.policy.k_factor * scale * (actual - expected);

        let division = game.division_key();
        table.apply_delta(game.home, delta, division);
        table.apply_delta(game.away, -delta, division);

        RatingUpdate {
            probabilities,
            home_delta: delta,
            away_delta: -delta,
        }
    }
}
