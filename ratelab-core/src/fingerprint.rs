//! Evaluation fingerprinting: a content-derived key for one
//! (dataset, policy, plan, seed) evaluation.
//!
//! The key is BLAKE3 over the canonical JSON of the inputs. Struct fields
//! serialize in declaration order, so equal inputs always hash equal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::DatasetHash;
use crate::plan::BacktestPlan;
use crate::policy::RatingPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationKey(pub String);

#[derive(Serialize)]
struct KeyInputs<'a> {
    dataset_hash: &'a DatasetHash,
    policy: &'a RatingPolicy,
    plan: &'a BacktestPlan,
    seed: u64,
}

impl EvaluationKey {
    pub fn compute(
        dataset_hash: &DatasetHash,
        policy: &RatingPolicy,
        plan: &BacktestPlan,
        seed: u64,
    ) -> Self {
        let inputs = KeyInputs {
            dataset_hash,
            policy,
            plan,
            seed,
        };
        // Plain structs of numbers, bools and strings always serialize.
        let json = serde_json::to_vec(&inputs).unwrap_or_default();
        Self(blake3::hash(&json).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvaluationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let dataset = DatasetHash::from_hash("abc");
        let policy = RatingPolicy::default();
        let plan = BacktestPlan::default();
        let a = EvaluationKey::compute(&dataset, &policy, &plan, 1);
        let b = EvaluationKey::compute(&dataset, &policy, &plan, 1);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn any_input_changes_key() {
        let dataset = DatasetHash::from_hash("abc");
        let policy = RatingPolicy::default();
        let plan = BacktestPlan::default();
        let base = EvaluationKey::compute(&dataset, &policy, &plan, 1);

        assert_ne!(base, EvaluationKey::compute(&dataset, &policy, &plan, 2));
        assert_ne!(
            base,
            EvaluationKey::compute(&DatasetHash::from_hash("abd"), &policy, &plan, 1)
        );
        let hotter = RatingPolicy {
            k_factor: 21.0,
            ..policy.clone()
        };
        assert_ne!(base, EvaluationKey::compute(&dataset, &hotter, &plan, 1));
        let longer = BacktestPlan {
            backtest_years: 9,
            ..plan.clone()
        };
        assert_ne!(base, EvaluationKey::compute(&dataset, &policy, &longer, 1));
    }
}
