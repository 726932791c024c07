//! Team name interning.

use std::collections::HashMap;

use super::ids::TeamId;

/// Maps team names to dense `TeamId`s and back.
///
/// Ids are assigned in first-seen order, so the same input order always
/// produces the same ids.
#[derive(Debug, Clone, Default)]
pub struct TeamRegistry {
    names: Vec<String>,
    index: HashMap<String, TeamId>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, registering it if unseen.
    pub fn intern(&mut self, name: &str) -> TeamId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = TeamId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<TeamId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: TeamId) -> Option<&str> {
        self.names.get(id.0 as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut reg = TeamRegistry::new();
        let a = reg.intern("Flamengo");
        let b = reg.intern("Palmeiras");
        assert_eq!(reg.intern("Flamengo"), a);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn lookup_both_directions() {
        let mut reg = TeamRegistry::new();
        let id = reg.intern("Santos");
        assert_eq!(reg.name(id), Some("Santos"));
        assert_eq!(reg.get("Santos"), Some(id));
        assert_eq!(reg.get("Gremio"), None);
        assert_eq!(reg.name(TeamId(99)), None);
    }
}
