//! In-memory signal journal, for runs without a database and for tests.

use crate::domain::error::SweepscanError;
use crate::domain::lifecycle::Outcome;
use crate::domain::signal::CandidateSignal;
use crate::ports::journal_port::{ResolvedOutcome, SignalJournalPort, StoredSignal};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Entry {
    signal: StoredSignal,
    result: Option<(Outcome, f64, f64)>,
}

#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Entry>>, SweepscanError> {
        self.entries.lock().map_err(|e| SweepscanError::Database {
            reason: format!("journal lock poisoned: {}", e),
        })
    }

    /// Realized pips and R of a resolved signal.
    pub fn result_of(&self, id: i64) -> Option<(Outcome, f64, f64)> {
        self.lock()
            .ok()?
            .iter()
            .find(|e| e.signal.id == id)
            .and_then(|e| e.result)
    }
}

impl SignalJournalPort for MemoryJournal {
    fn log_signal(&self, signal: &CandidateSignal) -> Result<i64, SweepscanError> {
        let mut entries = self.lock()?;
        let id = entries.len() as i64 + 1;
        entries.push(Entry {
            signal: StoredSignal {
                id,
                instrument: signal.instrument.clone(),
                strategy_id: signal.strategy_id.clone(),
                direction: signal.direction,
                levels: signal.levels,
                pip_size: signal.pip_size,
                created_at: signal.created_at,
            },
            result: None,
        });
        Ok(id)
    }

    fn list_pending(&self) -> Result<Vec<StoredSignal>, SweepscanError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| e.result.is_none())
            .map(|e| e.signal.clone())
            .collect())
    }

    fn update_result(
        &self,
        id: i64,
        outcome: Outcome,
        realized_pips: f64,
        r_multiple: f64,
    ) -> Result<(), SweepscanError> {
        let mut entries = self.lock()?;
        let entry = entries
            .iter_mut()
            .find(|e| e.signal.id == id && e.result.is_none())
            .ok_or_else(|| SweepscanError::DatabaseQuery {
                reason: format!("no pending signal with id {}", id),
            })?;
        entry.result = Some((outcome, realized_pips, r_multiple));
        Ok(())
    }

    fn resolved_outcomes(&self, limit: usize) -> Result<Vec<ResolvedOutcome>, SweepscanError> {
        let entries = self.lock()?;
        let mut recent: Vec<ResolvedOutcome> = entries
            .iter()
            .rev()
            .filter_map(|e| {
                e.result.map(|(outcome, _, r_multiple)| ResolvedOutcome {
                    instrument: e.signal.instrument.clone(),
                    strategy_id: e.signal.strategy_id.clone(),
                    outcome,
                    r_multiple,
                })
            })
            .take(limit)
            .collect();
        recent.reverse();
        Ok(recent)
    }
}
