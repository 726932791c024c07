//! Season Simulator: replays one season against a Rating Table.

use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Match, Season};
use crate::metrics::NeumaierSum;
use crate::rating::{RatingTable, RatingUpdate, UpdateRule};

/// Error for one replayed season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonOutcome {
    pub season: Season,
    /// Mean multi-class Brier score over the season's matches.
    pub error: f64,
    pub matches: usize,
}

/// Apply the rule to every match in order, calling `on_match` after each update.
///
/// `matches` must already be in replay order. The table keeps the updated
/// ratings for the next season.
pub fn replay_season<F>(
    table: &mut RatingTable,
    rule: &UpdateRule<'_>,
    season: Season,
    matches: &[&Match],
    mut on_match: F,
) -> SeasonOutcome
where
    F: FnMut(&Match, &RatingUpdate),
{
    let mut error = NeumaierSum::new();
    for game in matches {
        let update = rule.apply(table, game);
        error.add(update.probabilities.brier(game.outcome()));
        on_match(game, &update);
    }
    SeasonOutcome {
        season,
        error: error.mean().unwrap_or(0.0),
        matches: error.count(),
    }
}

pub fn simulate_season(
    table: &mut RatingTable,
    rule: &UpdateRule<'_>,
    season: Season,
    matches: &[&Match],
) -> SeasonOutcome {
    replay_season(table, rule, season, matches, |_, _| {})
}

/// Maximal runs of consecutive matches the data does not order
/// (same season, date and round). Singletons are omitted.
pub fn ambiguity_groups(matches: &[&Match]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=matches.len() {
        if i == matches.len() || !matches[i].same_slot(matches[start]) {
            if i - start > 1 {
                groups.push(start..i);
            }
            start = i;
        }
    }
    groups
}

/// Shuffle each ambiguity group in place. Strictly ordered matches stay put.
pub fn jitter_ambiguous<R: Rng + ?Sized>(matches: &mut [&Match], rng: &mut R) {
    for group in ambiguity_groups(matches) {
        matches[group].shuffle(rng);
    }
}
