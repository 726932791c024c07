//! RateLab Core: Elo rating backtest engine, domain types, genome codecs.
//!
//! This crate contains the heart of the calibration engine:
//! - Domain types (matches, teams, leagues, division keys)
//! - Immutable, chronologically ordered Match Store
//! - Rating Policy / Backtest Plan and their flat genome codecs
//! - Rating Table and the zero-sum Rating Update Rule
//! - Season Simulator and Backtest Engine with seeded randomized trials
//! - Standings and Monte Carlo season projection
//!
//! Nothing here performs I/O. Loading, caching and reporting live in
//! `ratelab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod plan;
pub mod policy;
pub mod projection;
pub mod rating;
pub mod rng;
pub mod season;
pub mod standings;
pub mod store;

pub use engine::{average_series, run_backtest, BacktestEngine, ErrorSeries};
pub use error::EngineError;
pub use plan::BacktestPlan;
pub use policy::RatingPolicy;
pub use store::MatchStore;
