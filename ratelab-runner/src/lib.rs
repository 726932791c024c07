//! RateLab Runner: fitness adapter, experiment config, match loading, result cache.
//!
//! This crate builds on `ratelab-core` to provide:
//! - CSV match loading and dataset selectors
//! - TOML experiment configuration
//! - The Fitness Adapter external optimizers call, with parallel trials and
//!   parallel population evaluation
//! - The optional JSONL result cache
//! - Plain-text reports and logging setup

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod fitness;
pub mod logging;
pub mod report;

pub use cache::{CacheError, CacheRecord, JsonlResultCache, NoopSink, ResultSink};
pub use config::{ConfigError, ExperimentConfig};
pub use data_loader::{dataset_path, load_csv, load_reader, load_selector, LoadError};
pub use fitness::{
    decode_genomes, evaluate, evaluate_policy, evaluate_selector, run_parallel, Evaluation,
    FitnessAdapter, FitnessError, FitnessReduction,
};
pub use logging::init_logging;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn sinks_are_send_sync() {
        assert_send::<JsonlResultCache>();
        assert_sync::<JsonlResultCache>();
        assert_send::<NoopSink>();
        assert_sync::<NoopSink>();
    }

    #[test]
    fn adapter_is_sync() {
        assert_sync::<FitnessAdapter<'static>>();
        assert_send::<FitnessAdapter<'static>>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<FitnessError>();
        assert_sync::<FitnessError>();
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
    }
}
