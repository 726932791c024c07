//! Engine error taxonomy.

use thiserror::Error;

/// Errors surfaced by the engine. Every variant is raised before any
/// simulation work starts, so no partial `ErrorSeries` ever accompanies one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Wrong-length or out-of-domain parameter vector.
    #[error("malformed genome: {reason}")]
    MalformedGenome { reason: String },

    /// The requested backtest window is not covered by the data.
    #[error("backtest window {first}..={last} out of range: {reason}")]
    OutOfRangeWindow { first: u16, last: u32, reason: String },

    /// A league filter or selector that the catalog does not recognise.
    #[error("unknown league selector: {selector}")]
    UnknownLeagueSelector { selector: String },

    /// No match survives the league filter.
    #[error("no matches for the selected leagues")]
    EmptyDataset,
}

impl EngineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedGenome {
            reason: reason.into(),
        }
    }
}
