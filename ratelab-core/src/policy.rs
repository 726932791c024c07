//! Rating Policy: the immutable parameter bundle that controls how a single
//! match moves two ratings, and its flat genome codec.
//!
//! Genome field order (fixed, consumed by external optimizers):
//!
//! | index | field                         |
//! |-------|-------------------------------|
//! | 0     | `k_factor`                    |
//! | 1     | `gamma`                       |
//! | 2     | `home_advantage`              |
//! | 3     | `home_field_advantage_weight` |
//! | 4     | `market_value_weight`         |
//! | 5     | `tie_frequency`               |
//! | 6..   | `w_division[0..]`             |

use serde::{Deserialize, Serialize};

use crate::domain::DivisionKey;
use crate::error::EngineError;

/// Number of scalar fields that precede `w_division` in the genome.
pub const POLICY_SCALARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingPolicy {
    /// Base update magnitude (> 0).
    pub k_factor: f64,
    /// Steepness of the logistic expectation curve (1.0 is classic Elo).
    pub gamma: f64,
    /// Rating points added to the home side before the weight is applied.
    pub home_advantage: f64,
    /// Share of `home_advantage` actually applied, [0,1].
    pub home_field_advantage_weight: f64,
    /// Blend weight towards the market-value-implied rating gap, [0,1].
    pub market_value_weight: f64,
    /// Share of the uncertain probability mass reserved for a draw, [0,1].
    pub tie_frequency: f64,
    /// Rating offset per division, indexed like `MatchStore::divisions`.
    pub w_division: Vec<f64>,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            k_factor: 20.0,
            gamma: 1.0,
            home_advantage: 100.0,
            home_field_advantage_weight: 1.0,
            market_value_weight: 0.0,
            tie_frequency: 0.25,
            w_division: vec![0.0],
        }
    }
}

impl RatingPolicy {
    /// Expected genome length for the given number of divisions.
    pub fn genome_len(divisions: usize) -> usize {
        POLICY_SCALARS + divisions
    }

    /// Decode a flat genome. `divisions` is the number of division keys in
    /// the active league selection; the genome must carry exactly one
    /// `w_division` entry per key.
    ///
    /// The three [0,1] weights are clamped; everything else is validated.
    pub fn decode(genome: &[f64], divisions: usize) -> Result<Self, EngineError> {
        let expected = Self::genome_len(divisions);
        if genome.len() != expected {
            return Err(EngineError::malformed(format!(
                "policy genome has {} entries, expected {expected} (6 scalars + {divisions} divisions)",
                genome.len()
            )));
        }
        if let Some(i) = genome.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::malformed(format!(
                "policy genome entry {i} is not finite"
            )));
        }

        let policy = Self {
            k_factor: genome[0],
            gamma: genome[1],
            home_advantage: genome[2],
            home_field_advantage_weight: clamp01(genome[3]),
            market_value_weight: clamp01(genome[4]),
            tie_frequency: clamp01(genome[5]),
            w_division: genome[POLICY_SCALARS..].to_vec(),
        };
        policy.validate(divisions)?;
        Ok(policy)
    }

    /// Inverse of [`decode`](Self::decode).
    pub fn encode(&self) -> Vec<f64> {
        let mut genome = Vec::with_capacity(Self::genome_len(self.w_division.len()));
        genome.extend_from_slice(&[
            self.k_factor,
            self.gamma,
            self.home_advantage,
            self.home_field_advantage_weight,
            self.market_value_weight,
            self.tie_frequency,
        ]);
        genome.extend_from_slice(&self.w_division);
        genome
    }

    /// Check a policy built by hand or deserialized from config.
    pub fn validate(&self, divisions: usize) -> Result<(), EngineError> {
        if !(self.k_factor.is_finite() && self.k_factor > 0.0) {
            return Err(EngineError::malformed(format!(
                "k_factor must be positive, got {}",
                self.k_factor
            )));
        }
        if !(self.gamma.is_finite() && self.gamma >= 0.0) {
            return Err(EngineError::malformed(format!(
                "gamma must be non-negative, got {}",
                self.gamma
            )));
        }
        if !self.home_advantage.is_finite() {
            return Err(EngineError::malformed("home_advantage is not finite"));
        }
        for (name, w) in [
            ("home_field_advantage_weight", self.home_field_advantage_weight),
            ("market_value_weight", self.market_value_weight),
            ("tie_frequency", self.tie_frequency),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(EngineError::malformed(format!(
                    "{name} must lie in [0,1], got {w}"
                )));
            }
        }
        if self.w_division.len() != divisions {
            return Err(EngineError::malformed(format!(
                "w_division has {} entries but {divisions} divisions are active",
                self.w_division.len()
            )));
        }
        if self.w_division.iter().any(|w| !w.is_finite()) {
            return Err(EngineError::malformed("w_division entry is not finite"));
        }
        Ok(())
    }

    /// Offset for `key`, given the active division list. Zero for keys not listed.
    pub fn division_offset(&self, divisions: &[DivisionKey], key: DivisionKey) -> f64 {
        divisions
            .binary_search(&key)
            .ok()
            .and_then(|i| self.w_division.get(i).copied())
            .unwrap_or(0.0)
    }
}

pub(crate) fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
