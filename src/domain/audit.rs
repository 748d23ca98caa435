//! Live audit of journaled signals.
//!
//! Pending signals are tracked as [`OpenPosition`]s across audit runs.
//! Each run fetches the new entry-timeframe bars for every open position
//! in parallel and advances it; resolutions are written back to the
//! journal sequentially. A position whose journal update fails stays
//! tracked and is written again next run.

use crate::domain::error::SweepscanError;
use crate::domain::lifecycle::{LifecycleConfig, OpenPosition, Resolution};
use crate::domain::timeframe::Timeframe;
use crate::ports::journal_port::{SignalJournalPort, StoredSignal};
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct TrackedPosition {
    instrument: String,
    strategy_id: String,
    position: OpenPosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditedResolution {
    pub id: i64,
    pub instrument: String,
    pub strategy_id: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub checked: usize,
    pub resolved: Vec<AuditedResolution>,
    pub still_open: usize,
    /// Positions whose bars could not be fetched this run.
    pub fetch_failures: usize,
}

#[derive(Debug, Default)]
pub struct LiveAuditor {
    positions: HashMap<i64, TrackedPosition>,
    lifecycle: LifecycleConfig,
}

impl LiveAuditor {
    pub fn new(lifecycle: LifecycleConfig) -> Self {
        Self {
            positions: HashMap::new(),
            lifecycle,
        }
    }

    pub fn tracked(&self) -> usize {
        self.positions.len()
    }

    fn sync_pending(&mut self, pending: &[StoredSignal]) {
        let live: HashSet<i64> = pending.iter().map(|s| s.id).collect();
        self.positions.retain(|id, _| live.contains(id));
        for s in pending {
            self.positions.entry(s.id).or_insert_with(|| TrackedPosition {
                instrument: s.instrument.clone(),
                strategy_id: s.strategy_id.clone(),
                position: OpenPosition::new(s.direction, s.levels, s.pip_size, s.created_at),
            });
        }
    }

    pub fn audit(
        &mut self,
        journal: &dyn SignalJournalPort,
        market_data: &dyn MarketDataPort,
        now: DateTime<Utc>,
    ) -> Result<AuditReport, SweepscanError> {
        let pending = journal.list_pending()?;
        self.sync_pending(&pending);

        let lifecycle = self.lifecycle;
        let mut outcomes: Vec<(i64, Result<Option<Resolution>, SweepscanError>)> = self
            .positions
            .par_iter_mut()
            .map(|(id, tracked)| {
                let pos = &mut tracked.position;
                let from = pos.last_seen.unwrap_or(pos.opened_at);
                let result = market_data
                    .fetch(&tracked.instrument, Timeframe::M5, from, now)
                    .map(|series| {
                        series.and_then(|s| pos.advance(s.closed_by(now), &lifecycle))
                    });
                (*id, result)
            })
            .collect();
        outcomes.sort_by_key(|(id, _)| *id);

        let mut report = AuditReport {
            checked: outcomes.len(),
            ..AuditReport::default()
        };
        for (id, result) in outcomes {
            match result {
                Ok(Some(resolution)) => {
                    let Some(tracked) = self.positions.get(&id) else {
                        continue;
                    };
                    match journal.update_result(
                        id,
                        resolution.outcome,
                        resolution.realized_pips,
                        resolution.r_multiple,
                    ) {
                        Ok(()) => {
                            info!(
                                "signal {} {} [{}] closed {} ({:+.2}R, {:+.1} pips)",
                                id,
                                tracked.instrument,
                                tracked.strategy_id,
                                resolution.outcome,
                                resolution.r_multiple,
                                resolution.realized_pips
                            );
                            report.resolved.push(AuditedResolution {
                                id,
                                instrument: tracked.instrument.clone(),
                                strategy_id: tracked.strategy_id.clone(),
                                resolution,
                            });
                            self.positions.remove(&id);
                        }
                        Err(e) => {
                            warn!("signal {}: result not recorded, will retry: {}", id, e);
                            report.still_open += 1;
                        }
                    }
                }
                Ok(None) => report.still_open += 1,
                Err(e) => {
                    warn!("signal {}: bar fetch failed: {}", id, e);
                    report.fetch_failures += 1;
                    report.still_open += 1;
                }
            }
        }
        Ok(report)
    }
}
