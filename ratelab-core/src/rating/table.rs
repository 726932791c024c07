//! Rating Table: the only mutable state in a backtest run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{DivisionKey, TeamId};

/// Current state of one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub rating: f64,
    /// Division of the last match this team played.
    pub tier: Option<DivisionKey>,
    pub matches_played: u32,
}

/// Mapping from team to current rating, owned by exactly one run.
///
/// Teams are inserted lazily at `starting_elo` the first time they are touched.
#[derive(Debug, Clone)]
pub struct RatingTable {
    starting_elo: f64,
    entries: HashMap<TeamId, TeamRating>,
}

impl RatingTable {
    pub fn new(starting_elo: f64) -> Self {
        Self {
            starting_elo,
            entries: HashMap::new(),
        }
    }

    pub fn starting_elo(&self) -> f64 {
        self.starting_elo
    }

    pub fn get(&self, team: TeamId) -> Option<&TeamRating> {
        self.entries.get(&team)
    }

    /// Current rating, or `starting_elo` for a team not seen yet.
    pub fn rating(&self, team: TeamId) -> f64 {
        self.entries
            .get(&team)
            .map_or(self.starting_elo, |entry| entry.rating)
    }

    /// Tier the team is currently rated in, if it has played.
    pub fn tier(&self, team: TeamId) -> Option<DivisionKey> {
        self.entries.get(&team).and_then(|entry| entry.tier)
    }

    /// Entry for `team`, inserting it at `starting_elo` if absent.
    pub fn entry_mut(&mut self, team: TeamId) -> &mut TeamRating {
        let starting_elo = self.starting_elo;
        self.entries.entry(team).or_insert(TeamRating {
            rating: starting_elo,
            tier: None,
            matches_played: 0,
        })
    }

    /// Add `delta` to a team's rating and record that it played in `division`.
    pub fn apply_delta(&mut self, team: TeamId, delta: f64, division: DivisionKey) {
        let entry = self.entry_mut(team);
        entry.rating += delta;
        entry.tier = Some(division);
        entry.matches_played += 1;
    }

    pub fn contains(&self, team: TeamId) -> bool {
        self.entries.contains_key(&team)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TeamId, &TeamRating)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Ratings keyed by team id, in id order.
    pub fn snapshot(&self) -> BTreeMap<TeamId, f64> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.rating))
            .collect()
    }

    /// Teams by descending rating; ties broken by id.
    pub fn ranked(&self) -> Vec<(TeamId, f64)> {
        let mut rows: Vec<(TeamId, f64)> = self
            .entries
            .iter()
            .map(|(id, entry)| (*id, entry.rating))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        rows
    }

    /// Sum of all ratings. Zero-sum updates keep this at
    /// `starting_elo * len()` up to rounding.
    pub fn total(&self) -> f64 {
        self.entries.values().map(|entry| entry.rating).sum()
    }
}
