//! Fitness adapter: the entry point external optimizers call.
//!
//! Every call owns its own Rating Tables and only reads the shared
//! `MatchStore`, so any number of evaluations may run in parallel. Randomized
//! trials inside one evaluation run on the rayon pool and are reduced in
//! trial order, so the result does not depend on the thread count.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ratelab_core::domain::LeagueCatalog;
use ratelab_core::engine::{average_series, BacktestEngine, ErrorSeries};
use ratelab_core::fingerprint::EvaluationKey;
use ratelab_core::{BacktestPlan, EngineError, MatchStore, RatingPolicy};

use crate::cache::{CacheRecord, NoopSink, ResultSink};
use crate::data_loader::{load_selector, LoadError};

#[derive(Debug, Error)]
pub enum FitnessError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// How an `ErrorSeries` collapses into the scalar an optimizer minimises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessReduction {
    #[default]
    Mean,
    Sum,
    /// Error of the final season only.
    Last,
    /// Worst season.
    Max,
}

impl FitnessReduction {
    /// Reduce a series. An empty series scores `f64::INFINITY`.
    pub fn reduce(&self, errors: &[f64]) -> f64 {
        if errors.is_empty() {
            return f64::INFINITY;
        }
        match self {
            Self::Mean => errors.iter().sum::<f64>() / errors.len() as f64,
            Self::Sum => errors.iter().sum(),
            Self::Last => errors[errors.len() - 1],
            Self::Max => errors.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Run a validated engine, spreading randomized trials over the rayon pool.
pub fn run_parallel(engine: &BacktestEngine<'_>) -> ErrorSeries {
    match engine.trials() {
        0 => engine.run_deterministic(),
        n => {
            let trials: Vec<ErrorSeries> =
                (0..n).into_par_iter().map(|i| engine.run_trial(i)).collect();
            average_series(&trials)
        }
    }
}

/// Evaluate decoded parameters against a store.
pub fn evaluate_policy(
    store: &MatchStore,
    policy: &RatingPolicy,
    plan: &BacktestPlan,
    seed: u64,
) -> Result<ErrorSeries, EngineError> {
    let engine = BacktestEngine::new(store, policy, plan, seed)?;
    Ok(run_parallel(&engine))
}

/// Decode both genomes. The policy length is checked against the divisions
/// of the leagues the plan selects.
pub fn decode_genomes(
    store: &MatchStore,
    policy_genome: &[f64],
    plan_genome: &[f64],
) -> Result<(RatingPolicy, BacktestPlan), EngineError> {
    let plan = BacktestPlan::decode(plan_genome)?;
    store.catalog().validate(plan.leagues_to_use)?;
    let divisions = store.divisions(plan.leagues_to_use).len();
    let policy = RatingPolicy::decode(policy_genome, divisions)?;
    Ok((policy, plan))
}

/// `evaluate(dataset, policy_genome, plan_genome) -> per-season error`.
pub fn evaluate(
    store: &MatchStore,
    policy_genome: &[f64],
    plan_genome: &[f64],
    seed: u64,
) -> Result<ErrorSeries, FitnessError> {
    let (policy, plan) = decode_genomes(store, policy_genome, plan_genome)?;
    Ok(evaluate_policy(store, &policy, &plan, seed)?)
}

/// Evaluate against a dataset named by selector. The selector's league
/// replaces the plan's `leagues_to_use`.
pub fn evaluate_selector(
    data_root: &Path,
    selector: &str,
    catalog: &LeagueCatalog,
    policy_genome: &[f64],
    plan_genome: &[f64],
    seed: u64,
) -> Result<ErrorSeries, FitnessError> {
    let (store, selection) = load_selector(data_root, selector, catalog)?;
    let mut plan = BacktestPlan::decode(plan_genome)?;
    plan.leagues_to_use = selection;
    let divisions = store.divisions(selection).len();
    let policy = RatingPolicy::decode(policy_genome, divisions)?;
    Ok(evaluate_policy(&store, &policy, &plan, seed)?)
}

/// One finished evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub key: EvaluationKey,
    pub errors: ErrorSeries,
    pub fitness: f64,
    /// Served from the result sink rather than computed.
    pub cached: bool,
}

static NOOP: NoopSink = NoopSink;

/// A store, a seed, a reduction and an optional result sink: everything an
/// optimizer needs to score candidates.
#[derive(Clone, Copy)]
pub struct FitnessAdapter<'a> {
    store: &'a MatchStore,
    seed: u64,
    reduction: FitnessReduction,
    sink: &'a dyn ResultSink,
}

impl<'a> FitnessAdapter<'a> {
    pub fn new(store: &'a MatchStore, seed: u64) -> Self {
        Self {
            store,
            seed,
            reduction: FitnessReduction::default(),
            sink: &NOOP,
        }
    }

    pub fn with_reduction(mut self, reduction: FitnessReduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn ResultSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &MatchStore {
        self.store
    }

    /// Evaluate decoded parameters, consulting the sink first.
    ///
    /// Sink failures are logged and otherwise ignored.
    pub fn evaluate(
        &self,
        policy: &RatingPolicy,
        plan: &BacktestPlan,
    ) -> Result<Evaluation, EngineError> {
        let key = EvaluationKey::compute(self.store.dataset_hash(), policy, plan, self.seed);

        match self.sink.lookup(&key) {
            Ok(Some(record)) => {
                debug!(key = %key, "cache hit");
                return Ok(Evaluation {
                    key,
                    fitness: self.reduction.reduce(&record.errors),
                    errors: record.errors,
                    cached: true,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "result cache lookup failed"),
        }

        let errors = evaluate_policy(self.store, policy, plan, self.seed)?;
        let fitness = self.reduction.reduce(&errors);

        let record = CacheRecord {
            key: key.clone(),
            dataset_hash: self.store.dataset_hash().clone(),
            seed: self.seed,
            policy: policy.clone(),
            plan: plan.clone(),
            errors: errors.clone(),
            fitness,
            recorded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.sink.insert(&record) {
            warn!(error = %e, "result cache insert failed");
        }

        Ok(Evaluation {
            key,
            errors,
            fitness,
            cached: false,
        })
    }

    /// Decode and evaluate flat genomes.
    pub fn evaluate_genome(
        &self,
        policy_genome: &[f64],
        plan_genome: &[f64],
    ) -> Result<Evaluation, FitnessError> {
        let (policy, plan) = decode_genomes(self.store, policy_genome, plan_genome)?;
        Ok(self.evaluate(&policy, &plan)?)
    }

    /// Score a whole population of policy genomes under one plan, in parallel.
    /// Results come back in input order; a malformed genome fails only its own slot.
    pub fn evaluate_population(
        &self,
        policy_genomes: &[Vec<f64>],
        plan: &BacktestPlan,
    ) -> Vec<Result<Evaluation, EngineError>> {
        let divisions = self.store.divisions(plan.leagues_to_use).len();
        debug!(
            population = policy_genomes.len(),
            divisions, "evaluating population"
        );
        policy_genomes
            .par_iter()
            .map(|genome| {
                let policy = RatingPolicy::decode(genome, divisions)?;
                self.evaluate(&policy, plan)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reductions() {
        let errors = [0.5, 0.7, 0.6];
        assert!((FitnessReduction::Mean.reduce(&errors) - 0.6).abs() < 1e-12);
        assert!((FitnessReduction::Sum.reduce(&errors) - 1.8).abs() < 1e-12);
        assert_eq!(FitnessReduction::Last.reduce(&errors), 0.6);
        assert_eq!(FitnessReduction::Max.reduce(&errors), 0.7);
        assert_eq!(FitnessReduction::Mean.reduce(&[]), f64::INFINITY);
    }

    #[test]
    fn reduction_names_in_config() {
        let r: FitnessReduction = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(r, FitnessReduction::Max);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn mean_and_last_lie_within_series_bounds(
                errors in proptest::collection::vec(0.0f64..2.0, 1..20)
            ) {
                let lo = errors.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = FitnessReduction::Max.reduce(&errors);
                for r in [FitnessReduction::Mean, FitnessReduction::Last] {
                    let v = r.reduce(&errors);
                    prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
                }
                prop_assert!(FitnessReduction::Sum.reduce(&errors) >= hi - 1e-12);
            }
        }
    }
}
