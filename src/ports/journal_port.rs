//! Signal journal port trait.

use crate::domain::error::SweepscanError;
use crate::domain::levels::TradeLevels;
use crate::domain::lifecycle::Outcome;
use crate::domain::signal::{CandidateSignal, Direction};
use chrono::{DateTime, Utc};

pub use crate::domain::feedback::ResolvedOutcome;

/// A logged signal still waiting for an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSignal {
    pub id: i64,
    pub instrument: String,
    pub strategy_id: String,
    pub direction: Direction,
    pub levels: TradeLevels,
    pub pip_size: f64,
    /// Decision time; forward bars are read from here.
    pub created_at: DateTime<Utc>,
}

pub trait SignalJournalPort: Send + Sync {
    fn log_signal(&self, signal: &CandidateSignal) -> Result<i64, SweepscanError>;

    fn list_pending(&self) -> Result<Vec<StoredSignal>, SweepscanError>;

    fn update_result(
        &self,
        id: i64,
        outcome: Outcome,
        realized_pips: f64,
        r_multiple: f64,
    ) -> Result<(), SweepscanError>;

    /// Up to `limit` most recent resolved outcomes, oldest first.
    fn resolved_outcomes(&self, limit: usize) -> Result<Vec<ResolvedOutcome>, SweepscanError>;
}
