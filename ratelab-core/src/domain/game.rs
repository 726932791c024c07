//! A single historical match and its outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{LeagueId, TeamId};
use super::league::DivisionKey;

/// Final result from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub fn from_score(home_goals: u16, away_goals: u16) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::AwayWin,
        }
    }

    /// Actual score for the home side: 1 / 0.5 / 0.
    pub fn home_score(&self) -> f64 {
        match self {
            Outcome::HomeWin => 1.0,
            Outcome::Draw => 0.5,
            Outcome::AwayWin => 0.0,
        }
    }

    /// One-hot indicator in (home, draw, away) order.
    pub fn indicator(&self) -> [f64; 3] {
        match self {
            Outcome::HomeWin => [1.0, 0.0, 0.0],
            Outcome::Draw => [0.0, 1.0, 0.0],
            Outcome::AwayWin => [0.0, 0.0, 1.0],
        }
    }

    /// Parse the classic `FTR` code (`H`, `D`, `A`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "H" | "h" => Some(Outcome::HomeWin),
            "D" | "d" => Some(Outcome::Draw),
            "A" | "a" => Some(Outcome::AwayWin),
            _ => None,
        }
    }
}

/// One historical match. Read-only once inside a `MatchStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub season: u16,
    pub date: Option<NaiveDate>,
    pub round: Option<u16>,
    pub league: LeagueId,
    /// 1-based tier inside the league.
    pub division: u8,
    pub home: TeamId,
    pub away: TeamId,
    pub home_goals: u16,
    pub away_goals: u16,
    pub home_value: Option<f64>,
    pub away_value: Option<f64>,
}

impl Match {
    pub fn outcome(&self) -> Outcome {
        Outcome::from_score(self.home_goals, self.away_goals)
    }

    pub fn goal_margin(&self) -> u16 {
        self.home_goals.abs_diff(self.away_goals)
    }

    pub fn division_key(&self) -> DivisionKey {
        DivisionKey {
            league: self.league,
            division: self.division,
        }
    }

    /// Chronological sort key: season, date, round, then id as a stable tie-break.
    pub fn order_key(&self) -> (u16, Option<NaiveDate>, Option<u16>, u64) {
        (self.season, self.date, self.round, self.id)
    }

    /// True when the data gives no order between `self` and `other`.
    pub fn same_slot(&self, other: &Match) -> bool {
        self.season == other.season && self.date == other.date && self.round == other.round
    }

    /// Both market values, when present, finite and positive.
    pub fn market_values(&self) -> Option<(f64, f64)> {
        match (self.home_value, self.away_value) {
            (Some(h), Some(a)) if h.is_finite() && a.is_finite() && h > 0.0 && a > 0.0 => {
                Some((h, a))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(home_goals: u16, away_goals: u16) -> Match {
        Match {
            id: 1,
            season: 2010,
            date: NaiveDate::from_ymd_opt(2010, 5, 9),
            round: Some(1),
            league: LeagueId(0),
            division: 1,
            home: TeamId(0),
            away: TeamId(1),
            home_goals,
            away_goals,
            home_value: None,
            away_value: None,
        }
    }

    #[test]
    fn outcome_from_score() {
        assert_eq!(sample(2, 0).outcome(), Outcome::HomeWin);
        assert_eq!(sample(1, 1).outcome(), Outcome::Draw);
        assert_eq!(sample(0, 3).outcome(), Outcome::AwayWin);
    }

    #[test]
    fn goal_margin_is_absolute() {
        assert_eq!(sample(0, 3).goal_margin(), 3);
        assert_eq!(sample(4, 1).goal_margin(), 3);
    }

    #[test]
    fn indicator_matches_score() {
        assert_eq!(Outcome::Draw.indicator(), [0.0, 1.0, 0.0]);
        assert_eq!(Outcome::AwayWin.home_score(), 0.0);
    }

    #[test]
    fn ftr_codes() {
        assert_eq!(Outcome::from_code("H"), Some(Outcome::HomeWin));
        assert_eq!(Outcome::from_code(" D "), Some(Outcome::Draw));
        assert_eq!(Outcome::from_code("X"), None);
    }

    #[test]
    fn market_values_require_both_positive() {
        let mut m = sample(1, 0);
        assert_eq!(m.market_values(), None);
        m.home_value = Some(10.0);
        m.away_value = Some(0.0);
        assert_eq!(m.market_values(), None);
        m.away_value = Some(5.0);
        assert_eq!(m.market_values(), Some((10.0, 5.0)));
    }

    #[test]
    fn same_slot_ignores_id() {
        let a = sample(1, 0);
        let mut b = sample(0, 0);
        b.id = 2;
        assert!(a.same_slot(&b));
        b.round = Some(2);
        assert!(!a.same_slot(&b));
    }
}
