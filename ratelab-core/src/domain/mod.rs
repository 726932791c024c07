//! Domain types for RateLab: matches, teams, leagues and identifiers.

pub mod game;
pub mod ids;
pub mod league;
pub mod team;

pub use game::{Match, Outcome};
pub use ids::{DatasetHash, LeagueId, TeamId};
pub use league::{DivisionKey, LeagueCatalog, LeagueSelection, LeagueSpec};
pub use team::TeamRegistry;

/// Season tag (competition year).
pub type Season = u16;
