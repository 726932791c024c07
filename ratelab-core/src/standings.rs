//! League standings: 3 points for a win, 1 for a draw.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Match, Outcome, TeamId, TeamRegistry};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team: TeamId,
    pub name: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl StandingsRow {
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    fn record(&mut self, scored: u16, conceded: u16, result: Outcome) {
        self.played += 1;
        self.goals_for += scored as u32;
        self.goals_against += conceded as u32;
        match result {
            Outcome::HomeWin => {
                self.won += 1;
                self.points += WIN_POINTS;
            }
            Outcome::Draw => {
                self.drawn += 1;
                self.points += DRAW_POINTS;
            }
            Outcome::AwayWin => self.lost += 1,
        }
    }
}

/// Final table of a set of matches, sorted by points, goal difference,
/// goals for, then name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub rows: Vec<StandingsRow>,
}

impl LeagueTable {
    pub fn compute<'m>(matches: impl IntoIterator<Item = &'m Match>, teams: &TeamRegistry) -> Self {
        let mut rows: HashMap<TeamId, StandingsRow> = HashMap::new();
        for game in matches {
            let outcome = game.outcome();
            row(&mut rows, teams, game.home).record(game.home_goals, game.away_goals, outcome);
            // Away side sees the mirrored result.
            let mirrored = match outcome {
                Outcome::HomeWin => Outcome::AwayWin,
                Outcome::Draw => Outcome::Draw,
                Outcome::AwayWin => Outcome::HomeWin,
            };
            row(&mut rows, teams, game.away).record(game.away_goals, game.home_goals, mirrored);
        }

        let mut rows: Vec<StandingsRow> = rows.into_values().collect();
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.goal_difference().cmp(&a.goal_difference()))
                .then(b.goals_for.cmp(&a.goals_for))
                .then(a.name.cmp(&b.name))
        });
        Self { rows }
    }

    pub fn points(&self, team: TeamId) -> Option<u32> {
        self.rows.iter().find(|r| r.team == team).map(|r| r.points)
    }

    /// 1-based table position.
    pub fn position(&self, team: TeamId) -> Option<usize> {
        self.rows.iter().position(|r| r.team == team).map(|i| i + 1)
    }

    pub fn leader(&self) -> Option<&StandingsRow> {
        self.rows.first()
    }
}

fn row<'r>(
    rows: &'r mut HashMap<TeamId, StandingsRow>,
    teams: &TeamRegistry,
    team: TeamId,
) -> &'r mut StandingsRow {
    rows.entry(team).or_insert_with(|| StandingsRow {
        team,
        name: teams.name(team).unwrap_or_default().to_string(),
        ..StandingsRow::default()
    })
}
