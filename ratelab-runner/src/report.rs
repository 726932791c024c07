//! Plain-text reports: per-season errors, rating tables, standings,
//! season projections and dataset summaries.

use std::fmt::{self, Write};

use ratelab_core::domain::LeagueSelection;
use ratelab_core::projection::SeasonProjection;
use ratelab_core::rating::RatingTable;
use ratelab_core::season::SeasonOutcome;
use ratelab_core::standings::LeagueTable;
use ratelab_core::MatchStore;

use crate::fitness::FitnessReduction;

/// Row order for [`rating_table`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableOrder {
    #[default]
    ByRating,
    ByName,
}

/// Per-season error table followed by the reduced fitness.
pub fn errors_by_season(
    outcomes: &[SeasonOutcome],
    reduction: FitnessReduction,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{:<8} {:>8} {:>10}", "Season", "Matches", "Error")?;
    writeln!(out, "{}", "-".repeat(28))?;
    for o in outcomes {
        writeln!(out, "{:<8} {:>8} {:>10.6}", o.season, o.matches, o.error)?;
    }
    let errors: Vec<f64> = outcomes.iter().map(|o| o.error).collect();
    writeln!(out, "{}", "-".repeat(28))?;
    writeln!(
        out,
        "{:<17} {:>10.6}",
        format!("{reduction:?}").to_lowercase(),
        reduction.reduce(&errors)
    )?;
    Ok(out)
}

/// Team ratings, framed and padded to the longest name.
pub fn rating_table(
    store: &MatchStore,
    table: &RatingTable,
    order: TableOrder,
) -> Result<String, fmt::Error> {
    let mut rows: Vec<(&str, f64)> = table
        .ranked()
        .into_iter()
        .map(|(team, rating)| (store.team_name(team), rating))
        .collect();
    if order == TableOrder::ByName {
        rows.sort_by(|a, b| a.0.cmp(b.0));
    }

    let name_width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let rating_width = rows
        .iter()
        .map(|(_, rating)| format!("{rating:.2}").len())
        .max()
        .unwrap_or(0);
    let divider = "-".repeat(name_width + rating_width + 7);

    let mut out = String::new();
    writeln!(out, "{divider}")?;
    for (name, rating) in rows {
        writeln!(
            out,
            "| {name:<name_width$} : {:>rating_width$} |",
            format!("{rating:.2}")
        )?;
    }
    writeln!(out, "{divider}")?;
    Ok(out)
}

pub fn standings(table: &LeagueTable) -> Result<String, fmt::Error> {
    let name_width = table
        .rows
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let mut out = String::new();
    writeln!(
        out,
        "{:>3}  {:<name_width$} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    )?;
    for (i, r) in table.rows.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {:<name_width$} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+4} {:>4}",
            i + 1,
            r.name,
            r.played,
            r.won,
            r.drawn,
            r.lost,
            r.goals_for,
            r.goals_against,
            r.goal_difference(),
            r.points
        )?;
    }
    Ok(out)
}

pub fn projection(p: &SeasonProjection) -> Result<String, fmt::Error> {
    let name_width = p.teams.iter().map(|t| t.name.len()).max().unwrap_or(4).max(4);
    let mut out = String::new();
    writeln!(
        out,
        "Season {} projection ({} samples)",
        p.season, p.samples
    )?;
    writeln!(
        out,
        "{:<name_width$} {:>9} {:>9} {:>6}",
        "Team", "Rating", "Expected", "Real"
    )?;
    for t in &p.teams {
        writeln!(
            out,
            "{:<name_width$} {:>9.2} {:>9.2} {:>6}",
            t.name, t.rating, t.expected_points, t.real_points
        )?;
    }
    writeln!(out, "points RMSE: {:.3}", p.points_rmse)?;
    Ok(out)
}

/// Seasons with their match counts and the division keys present.
pub fn dataset_summary(store: &MatchStore) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "{} matches, {} teams, dataset {}",
        store.len(),
        store.teams().len(),
        store.dataset_hash()
    )?;
    writeln!(out, "{:<8} {:>8}", "Season", "Matches")?;
    for season in store.seasons() {
        writeln!(out, "{:<8} {:>8}", season, store.season(season).len())?;
    }
    let all = store.catalog().all();
    let divisions = store.divisions(all);
    writeln!(out, "divisions (w_division order):")?;
    for (i, key) in divisions.iter().enumerate() {
        let league = store
            .catalog()
            .name(key.league)
            .unwrap_or("<unknown>");
        let mask = LeagueSelection::single(key.league).0;
        writeln!(
            out,
            "  [{i}] {league} division {} (mask {mask})",
            key.division
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratelab_core::domain::{LeagueCatalog, LeagueId, Match, TeamRegistry};

    fn store() -> MatchStore {
        let mut teams = TeamRegistry::new();
        let m = Match {
            id: 1,
            season: 2010,
            date: None,
            round: Some(1),
            league: LeagueId(0),
            division: 1,
            home: teams.intern("Internacional"),
            away: teams.intern("Avai"),
            home_goals: 2,
            away_goals: 0,
            home_value: None,
            away_value: None,
        };
        MatchStore::new(vec![m], teams, LeagueCatalog::default()).unwrap()
    }

    #[test]
    fn rating_table_orders_rows() {
        let store = store();
        let mut table = RatingTable::new(1000.0);
        let key = store.matches()[0].division_key();
        table.apply_delta(store.matches()[0].home, 10.0, key);
        table.apply_delta(store.matches()[0].away, -10.0, key);

        let by_rating = rating_table(&store, &table, TableOrder::ByRating).unwrap();
        let lines: Vec<&str> = by_rating.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("Internacional") && lines[1].contains("1010.00"));

        let by_name = rating_table(&store, &table, TableOrder::ByName).unwrap();
        assert!(by_name.lines().nth(1).unwrap().contains("Avai"));
    }

    #[test]
    fn errors_report_includes_reduction() {
        let outcomes = [
            SeasonOutcome { season: 2010, error: 0.5, matches: 10 },
            SeasonOutcome { season: 2011, error: 0.7, matches: 10 },
        ];
        let text = errors_by_season(&outcomes, FitnessReduction::Mean).unwrap();
        assert!(text.contains("2011"));
        assert!(text.contains("mean"));
        assert!(text.contains("0.600000"));
    }

    #[test]
    fn summary_lists_divisions() {
        let text = dataset_summary(&store()).unwrap();
        assert!(text.contains("1 matches, 2 teams"));
        assert!(text.contains("[0] brasileirao division 1"));
    }

    #[test]
    fn standings_render_points() {
        let store = store();
        let table = LeagueTable::compute(store.matches(), store.teams());
        let text = standings(&table).unwrap();
        assert!(text.lines().nth(1).unwrap().contains("Internacional"));
        assert!(text.contains("+2"));
    }
}
