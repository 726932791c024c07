//! League catalog, league selection masks and division keys.

use serde::{Deserialize, Serialize};

use super::ids::LeagueId;
use crate::error::EngineError;

/// Maximum number of leagues a `LeagueSelection` mask can address.
pub const MAX_LEAGUES: u8 = 16;

/// A known league: its name and bit position in selection masks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSpec {
    pub name: String,
    pub bit: u8,
}

/// Ordered set of recognised leagues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueCatalog {
    leagues: Vec<LeagueSpec>,
}

impl Default for LeagueCatalog {
    fn default() -> Self {
        Self {
            leagues: vec![LeagueSpec {
                name: "brasileirao".into(),
                bit: 0,
            }],
        }
    }
}

impl LeagueCatalog {
    /// Build a catalog, rejecting duplicate names/bits and bits beyond the mask width.
    pub fn new(leagues: Vec<LeagueSpec>) -> Result<Self, EngineError> {
        for (i, spec) in leagues.iter().enumerate() {
            if spec.bit >= MAX_LEAGUES {
                return Err(EngineError::UnknownLeagueSelector {
                    selector: format!("{} (bit {} >= {MAX_LEAGUES})", spec.name, spec.bit),
                });
            }
            let duplicate = leagues[..i]
                .iter()
                .any(|other| other.bit == spec.bit || other.name.eq_ignore_ascii_case(&spec.name));
            if duplicate {
                return Err(EngineError::UnknownLeagueSelector {
                    selector: format!("{} (duplicate catalog entry)", spec.name),
                });
            }
        }
        Ok(Self { leagues })
    }

    pub fn leagues(&self) -> &[LeagueSpec] {
        &self.leagues
    }

    /// Look up a league by (case-insensitive) name.
    pub fn by_name(&self, name: &str) -> Option<LeagueId> {
        self.leagues
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
            .map(|spec| LeagueId(spec.bit))
    }

    pub fn name(&self, league: LeagueId) -> Option<&str> {
        self.leagues
            .iter()
            .find(|spec| spec.bit == league.0)
            .map(|spec| spec.name.as_str())
    }

    pub fn contains(&self, league: LeagueId) -> bool {
        self.leagues.iter().any(|spec| spec.bit == league.0)
    }

    /// Resolve a dataset selector name to a one-league selection.
    pub fn selector(&self, name: &str) -> Result<LeagueSelection, EngineError> {
        self.by_name(name)
            .map(LeagueSelection::single)
            .ok_or_else(|| EngineError::UnknownLeagueSelector {
                selector: name.to_string(),
            })
    }

    /// Mask with every catalog league selected.
    pub fn all(&self) -> LeagueSelection {
        LeagueSelection(
            self.leagues
                .iter()
                .fold(0u16, |mask, spec| mask | (1 << spec.bit)),
        )
    }

    /// Fail unless `selection` is non-empty and only names catalog leagues.
    pub fn validate(&self, selection: LeagueSelection) -> Result<(), EngineError> {
        if selection.is_empty() {
            return Err(EngineError::UnknownLeagueSelector {
                selector: "empty league mask".into(),
            });
        }
        let unknown = selection.0 & !self.all().0;
        if unknown != 0 {
            return Err(EngineError::UnknownLeagueSelector {
                selector: format!("league mask {:#06b} has unknown bits {:#06b}", selection.0, unknown),
            });
        }
        Ok(())
    }
}

/// Bitset over the catalog's leagues (`leagues_to_use`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeagueSelection(pub u16);

impl LeagueSelection {
    pub fn single(league: LeagueId) -> Self {
        Self(1 << league.0)
    }

    pub fn contains(&self, league: LeagueId) -> bool {
        league.0 < MAX_LEAGUES && self.0 & (1 << league.0) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Selected league ids in ascending order.
    pub fn leagues(&self) -> impl Iterator<Item = LeagueId> + '_ {
        (0..MAX_LEAGUES)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(LeagueId)
    }
}

/// A division tier inside one league. Orders by league, then tier.
///
/// The sorted list of keys present in the selected leagues fixes the meaning
/// of each `w_division` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DivisionKey {
    pub league: LeagueId,
    pub division: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_league_catalog() -> LeagueCatalog {
        LeagueCatalog::new(vec![
            LeagueSpec {
                name: "brasileirao".into(),
                bit: 0,
            },
            LeagueSpec {
                name: "premier".into(),
                bit: 2,
            },
        ])
        .unwrap()
    }

    #[test]
    fn default_catalog_knows_brasileirao() {
        let catalog = LeagueCatalog::default();
        assert_eq!(catalog.by_name("Brasileirao"), Some(LeagueId(0)));
        assert_eq!(catalog.selector("brasileirao").unwrap(), LeagueSelection(1));
    }

    #[test]
    fn unknown_selector_rejected() {
        let catalog = LeagueCatalog::default();
        let err = catalog.selector("laliga").unwrap_err();
        assert!(matches!(err, EngineError::UnknownLeagueSelector { .. }));
    }

    #[test]
    fn validate_rejects_empty_and_unknown_bits() {
        let catalog = two_league_catalog();
        assert!(catalog.validate(LeagueSelection(0b101)).is_ok());
        assert!(catalog.validate(LeagueSelection(0)).is_err());
        assert!(catalog.validate(LeagueSelection(0b010)).is_err());
    }

    #[test]
    fn duplicate_entries_rejected() {
        let result = LeagueCatalog::new(vec![
            LeagueSpec {
                name: "a".into(),
                bit: 0,
            },
            LeagueSpec {
                name: "b".into(),
                bit: 0,
            },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn selection_iterates_in_bit_order() {
        let sel = LeagueSelection(0b1010);
        let ids: Vec<_> = sel.leagues().collect();
        assert_eq!(ids, vec![LeagueId(1), LeagueId(3)]);
        assert!(sel.contains(LeagueId(3)));
        assert!(!sel.contains(LeagueId(0)));
    }

    #[test]
    fn division_keys_sort_by_league_then_tier() {
        let mut keys = vec![
            DivisionKey { league: LeagueId(1), division: 1 },
            DivisionKey { league: LeagueId(0), division: 2 },
            DivisionKey { league: LeagueId(0), division: 1 },
        ];
        keys.sort();
        assert_eq!(keys[0], DivisionKey { league: LeagueId(0), division: 1 });
        assert_eq!(keys[2], DivisionKey { league: LeagueId(1), division: 1 });
    }
}
