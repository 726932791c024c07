//! Match loading from CSV and dataset selector resolution.
//!
//! Expected columns (header names as in the classic football-data export):
//! - required: `HomeTeam`, `AwayTeam`, `FTHG`, `FTAG`, `Season`
//! - optional: `id`, `Date` (`YYYY-MM-DD` or `DD/MM/YYYY`), `Round`, `League`,
//!   `Division`, `HomeValue`, `AwayValue`, `FTR`
//!
//! Rows without a `League` belong to the catalog's first league; rows without
//! a `Division` are tier 1. When `FTR` is present it must agree with the score.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use ratelab_core::domain::{LeagueCatalog, LeagueId, LeagueSelection, Match, Outcome, TeamRegistry};
use ratelab_core::{EngineError, MatchStore};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open dataset '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("row {row}: unknown league '{name}'")]
    UnknownLeague { row: usize, name: String },

    #[error("unknown dataset selector '{0}'")]
    UnknownSelector(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Deserialize)]
struct MatchRecord {
    #[serde(default)]
    id: Option<u64>,
    #[serde(rename = "HomeTeam")]
    home_team: String,
    #[serde(rename = "AwayTeam")]
    away_team: String,
    #[serde(rename = "FTHG")]
    home_goals: u16,
    #[serde(rename = "FTAG")]
    away_goals: u16,
    #[serde(rename = "FTR", default)]
    result: Option<String>,
    #[serde(rename = "Season")]
    season: u16,
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Round", default)]
    round: Option<u16>,
    #[serde(rename = "League", default)]
    league: Option<String>,
    #[serde(rename = "Division", default)]
    division: Option<u8>,
    #[serde(rename = "HomeValue", default)]
    home_value: Option<f64>,
    #[serde(rename = "AwayValue", default)]
    away_value: Option<f64>,
}

/// Load a CSV file into a `MatchStore`.
pub fn load_csv(path: &Path, catalog: &LeagueCatalog) -> Result<MatchStore, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let store = load_reader(file, catalog)?;
    info!(
        path = %path.display(),
        matches = store.len(),
        teams = store.teams().len(),
        dataset_hash = %store.dataset_hash(),
        "dataset loaded"
    );
    Ok(store)
}

/// Load CSV content from any reader.
pub fn load_reader<R: Read>(reader: R, catalog: &LeagueCatalog) -> Result<MatchStore, LoadError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut teams = TeamRegistry::new();
    let mut matches = Vec::new();

    for (i, record) in csv.deserialize::<MatchRecord>().enumerate() {
        // Header is line 1.
        let row = i + 2;
        let record = record?;
        matches.push(to_match(record, row, catalog, &mut teams)?);
    }
    debug!(rows = matches.len(), "csv parsed");

    Ok(MatchStore::new(matches, teams, catalog.clone())?)
}

fn to_match(
    record: MatchRecord,
    row: usize,
    catalog: &LeagueCatalog,
    teams: &mut TeamRegistry,
) -> Result<Match, LoadError> {
    let invalid = |reason: String| LoadError::InvalidRow { row, reason };

    if record.home_team.is_empty() || record.away_team.is_empty() {
        return Err(invalid("empty team name".into()));
    }
    if record.home_team == record.away_team {
        return Err(invalid(format!("{} plays itself", record.home_team)));
    }

    let outcome = Outcome::from_score(record.home_goals, record.away_goals);
    if let Some(code) = record.result.as_deref().filter(|c| !c.is_empty()) {
        match Outcome::from_code(code) {
            Some(stated) if stated == outcome => {}
            Some(_) => {
                return Err(invalid(format!(
                    "FTR '{code}' disagrees with score {}-{}",
                    record.home_goals, record.away_goals
                )))
            }
            None => return Err(invalid(format!("unrecognised FTR '{code}'"))),
        }
    }

    let date = match record.date.as_deref().filter(|d| !d.is_empty()) {
        Some(text) => Some(parse_date(text).ok_or_else(|| invalid(format!("bad date '{text}'")))?),
        None => None,
    };

    let league = match record.league.as_deref().filter(|l| !l.is_empty()) {
        Some(name) => catalog.by_name(name).ok_or_else(|| LoadError::UnknownLeague {
            row,
            name: name.to_string(),
        })?,
        None => catalog
            .leagues()
            .first()
            .map(|spec| LeagueId(spec.bit))
            .ok_or_else(|| LoadError::UnknownLeague {
                row,
                name: "<empty catalog>".into(),
            })?,
    };

    let division = record.division.unwrap_or(1);
    if division == 0 {
        return Err(invalid("division tiers are 1-based".into()));
    }

    Ok(Match {
        id: record.id.unwrap_or(row as u64),
        season: record.season,
        date,
        round: record.round,
        league,
        division,
        home: teams.intern(&record.home_team),
        away: teams.intern(&record.away_team),
        home_goals: record.home_goals,
        away_goals: record.away_goals,
        home_value: record.home_value,
        away_value: record.away_value,
    })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .ok()
}

/// CSV file backing a dataset selector: `<data_root>/<league name>.csv`.
pub fn dataset_path(
    data_root: &Path,
    selector: &str,
    catalog: &LeagueCatalog,
) -> Result<PathBuf, LoadError> {
    let league = catalog
        .by_name(selector)
        .ok_or_else(|| LoadError::UnknownSelector(selector.to_string()))?;
    let name = catalog
        .name(league)
        .ok_or_else(|| LoadError::UnknownSelector(selector.to_string()))?;
    Ok(data_root.join(format!("{name}.csv")))
}

/// Resolve a selector, load its file, and return the store with the
/// one-league selection the selector names.
pub fn load_selector(
    data_root: &Path,
    selector: &str,
    catalog: &LeagueCatalog,
) -> Result<(MatchStore, LeagueSelection), LoadError> {
    let path = dataset_path(data_root, selector, catalog)?;
    let selection = catalog.selector(selector)?;
    Ok((load_csv(&path, catalog)?, selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratelab_core::domain::LeagueSpec;

    const CSV: &str = "\
Season,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR
2010,2010-05-08,Santos,Gremio,2,1,H
2010,2010-05-09,Vasco,Flamengo,0,0,D
2011,15/05/2011,Gremio,Santos,1,3,A
";

    #[test]
    fn parses_required_and_optional_columns() {
        let store = load_reader(CSV.as_bytes(), &LeagueCatalog::default()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.teams().len(), 4);
        assert_eq!(store.seasons().collect::<Vec<_>>(), vec![2010, 2011]);

        let last = &store.matches()[2];
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2011, 5, 15));
        assert_eq!(last.outcome(), Outcome::AwayWin);
        assert_eq!(last.league, LeagueId(0));
        assert_eq!(last.division, 1);
        assert_eq!(last.id, 4);
    }

    #[test]
    fn ftr_must_agree_with_score() {
        let csv = "Season,HomeTeam,AwayTeam,FTHG,FTAG,FTR\n2010,A,B,1,0,A\n";
        let err = load_reader(csv.as_bytes(), &LeagueCatalog::default()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRow { row: 2, .. }), "{err}");
    }

    #[test]
    fn unknown_league_name_is_rejected() {
        let csv = "Season,HomeTeam,AwayTeam,FTHG,FTAG,League\n2010,A,B,1,0,laliga\n";
        let err = load_reader(csv.as_bytes(), &LeagueCatalog::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownLeague { .. }));
    }

    #[test]
    fn league_and_division_columns_map_through_catalog() {
        let catalog = LeagueCatalog::new(vec![
            LeagueSpec { name: "brasileirao".into(), bit: 0 },
            LeagueSpec { name: "serie-b".into(), bit: 1 },
        ])
        .unwrap();
        let csv = "\
Season,Round,HomeTeam,AwayTeam,FTHG,FTAG,League,Division,HomeValue,AwayValue
2010,1,A,B,1,0,brasileirao,1,50.5,20
2010,1,C,D,0,2,serie-b,2,,
";
        let store = load_reader(csv.as_bytes(), &catalog).unwrap();
        let b = store.matches().iter().find(|m| m.league == LeagueId(1)).unwrap();
        assert_eq!(b.division, 2);
        assert_eq!(b.home_value, None);
        assert_eq!(store.matches()[0].market_values(), Some((50.5, 20.0)));
        assert_eq!(store.divisions(catalog.all()).len(), 2);
    }

    #[test]
    fn selector_maps_to_league_file() {
        let catalog = LeagueCatalog::default();
        let path = dataset_path(Path::new("data"), "brasileirao", &catalog).unwrap();
        assert_eq!(path, Path::new("data").join("brasileirao.csv"));
        assert!(matches!(
            dataset_path(Path::new("data"), "bundesliga", &catalog),
            Err(LoadError::UnknownSelector(_))
        ));
    }
}
