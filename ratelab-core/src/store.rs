//! Match Store: the immutable, chronologically ordered match collection.
//!
//! Built once by a loader, then shared read-only (`&MatchStore`) across any
//! number of concurrent evaluations.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::domain::{
    DatasetHash, DivisionKey, LeagueCatalog, LeagueId, LeagueSelection, Match, Season, TeamId,
    TeamRegistry,
};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct MatchStore {
    matches: Vec<Match>,
    teams: TeamRegistry,
    catalog: LeagueCatalog,
    seasons: BTreeMap<Season, Range<usize>>,
    dataset_hash: DatasetHash,
}

impl MatchStore {
    /// Sort `matches` chronologically and index them by season.
    ///
    /// Fails if a match references a league outside `catalog` or a team id
    /// not in `teams`.
    pub fn new(
        mut matches: Vec<Match>,
        teams: TeamRegistry,
        catalog: LeagueCatalog,
    ) -> Result<Self, EngineError> {
        for m in &matches {
            if !catalog.contains(m.league) {
                return Err(EngineError::UnknownLeagueSelector {
                    selector: format!("match {} uses {}", m.id, m.league),
                });
            }
            if teams.name(m.home).is_none() || teams.name(m.away).is_none() {
                return Err(EngineError::malformed(format!(
                    "match {} references an unregistered team",
                    m.id
                )));
            }
        }

        matches.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

        let mut seasons: BTreeMap<Season, Range<usize>> = BTreeMap::new();
        for (i, m) in matches.iter().enumerate() {
            seasons
                .entry(m.season)
                .and_modify(|r| r.end = i + 1)
                .or_insert(i..i + 1);
        }

        let dataset_hash = hash_matches(&matches, &teams);

        Ok(Self {
            matches,
            teams,
            catalog,
            seasons,
            dataset_hash,
        })
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn teams(&self) -> &TeamRegistry {
        &self.teams
    }

    pub fn team_name(&self, team: TeamId) -> &str {
        self.teams.name(team).unwrap_or("<unknown>")
    }

    pub fn catalog(&self) -> &LeagueCatalog {
        &self.catalog
    }

    pub fn dataset_hash(&self) -> &DatasetHash {
        &self.dataset_hash
    }

    /// Seasons present, ascending.
    pub fn seasons(&self) -> impl Iterator<Item = Season> + '_ {
        self.seasons.keys().copied()
    }

    pub fn earliest_season(&self) -> Option<Season> {
        self.seasons.keys().next().copied()
    }

    pub fn latest_season(&self) -> Option<Season> {
        self.seasons.keys().next_back().copied()
    }

    /// All matches of one season in chronological order (empty if absent).
    pub fn season(&self, season: Season) -> &[Match] {
        match self.seasons.get(&season) {
            Some(range) => &self.matches[range.clone()],
            None => &[],
        }
    }

    /// Matches of one season restricted to the selected leagues.
    pub fn season_matches(&self, season: Season, selection: LeagueSelection) -> Vec<&Match> {
        self.season(season)
            .iter()
            .filter(|m| selection.contains(m.league))
            .collect()
    }

    /// A new store holding only the selected leagues. Team ids are preserved.
    pub fn filter(&self, selection: LeagueSelection) -> MatchStore {
        let matches: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| selection.contains(m.league))
            .cloned()
            .collect();
        // Already sorted and validated; rebuild the index and hash only.
        let mut seasons: BTreeMap<Season, Range<usize>> = BTreeMap::new();
        for (i, m) in matches.iter().enumerate() {
            seasons
                .entry(m.season)
                .and_modify(|r| r.end = i + 1)
                .or_insert(i..i + 1);
        }
        let dataset_hash = hash_matches(&matches, &self.teams);
        MatchStore {
            matches,
            teams: self.teams.clone(),
            catalog: self.catalog.clone(),
            seasons,
            dataset_hash,
        }
    }

    /// Number of selected matches.
    pub fn count_selected(&self, selection: LeagueSelection) -> usize {
        self.matches
            .iter()
            .filter(|m| selection.contains(m.league))
            .count()
    }

    /// Sorted distinct division keys of the selected leagues.
    ///
    /// The i-th key is the division that `w_division[i]` applies to.
    pub fn divisions(&self, selection: LeagueSelection) -> Vec<DivisionKey> {
        self.matches
            .iter()
            .filter(|m| selection.contains(m.league))
            .map(Match::division_key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Leagues that actually have matches.
    pub fn leagues(&self) -> BTreeSet<LeagueId> {
        self.matches.iter().map(|m| m.league).collect()
    }
}

/// BLAKE3 over every field of every match, team names included, in store order.
fn hash_matches(matches: &[Match], teams: &TeamRegistry) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for m in matches {
        hasher.update(&m.id.to_le_bytes());
        hasher.update(&m.season.to_le_bytes());
        match m.date {
            Some(d) => hasher.update(d.to_string().as_bytes()),
            None => hasher.update(b"-"),
        };
        hasher.update(&m.round.unwrap_or(u16::MAX).to_le_bytes());
        hasher.update(&[m.league.0, m.division]);
        hasher.update(teams.name(m.home).unwrap_or_default().as_bytes());
        hasher.update(b"|");
        hasher.update(teams.name(m.away).unwrap_or_default().as_bytes());
        hasher.update(&m.home_goals.to_le_bytes());
        hasher.update(&m.away_goals.to_le_bytes());
        hasher.update(&m.home_value.unwrap_or(f64::NAN).to_bits().to_le_bytes());
        hasher.update(&m.away_value.unwrap_or(f64::NAN).to_bits().to_le_bytes());
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}
