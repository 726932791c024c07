//! Per-team rating state and the rating update rule.

pub mod table;
pub mod update;

pub use table::{RatingTable, TeamRating};
pub use update::{
    expected_score, margin_multiplier, outcome_probabilities, OutcomeProbabilities, RatingUpdate,
    UpdateFlags, UpdateRule, LOGISTIC_SCALE,
};
