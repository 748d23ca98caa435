//! SQLite signal journal adapter.

use crate::domain::error::SweepscanError;
use crate::domain::levels::TradeLevels;
use crate::domain::lifecycle::Outcome;
use crate::domain::signal::{CandidateSignal, Direction};
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_port::{ResolvedOutcome, SignalJournalPort, StoredSignal};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteJournal {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> SweepscanError {
    SweepscanError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> SweepscanError {
    SweepscanError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteJournal {
    /// Opens `[journal] path`, creating the schema if needed.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SweepscanError> {
        let db_path =
            config
                .get_string("journal", "path")
                .ok_or_else(|| SweepscanError::ConfigMissing {
                    section: "journal".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("journal", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        let journal = Self { pool };
        journal.initialize_schema()?;
        Ok(journal)
    }

    pub fn in_memory() -> Result<Self, SweepscanError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        let journal = Self { pool };
        journal.initialize_schema()?;
        Ok(journal)
    }

    pub fn initialize_schema(&self) -> Result<(), SweepscanError> {
        let conn = self.pool.get().map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instrument TEXT NOT NULL,
                strategy_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                confidence REAL NOT NULL,
                win_probability REAL NOT NULL,
                entry REAL NOT NULL,
                stop REAL NOT NULL,
                partial_tp REAL NOT NULL,
                tp1 REAL NOT NULL,
                tp2 REAL NOT NULL,
                breakeven_trigger REAL NOT NULL,
                lots REAL NOT NULL,
                pip_size REAL NOT NULL,
                created_at TEXT NOT NULL,
                outcome TEXT,
                realized_pips REAL,
                r_multiple REAL
            );
            CREATE INDEX IF NOT EXISTS idx_signals_outcome ON signals(outcome);",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

type PendingRow = (i64, String, String, String, [f64; 6], f64, String);

fn to_stored(row: PendingRow) -> Result<StoredSignal, SweepscanError> {
    let (id, instrument, strategy_id, direction, lv, pip_size, created_at) = row;
    let direction = Direction::parse(&direction).ok_or_else(|| SweepscanError::DatabaseQuery {
        reason: format!("signal {}: unknown direction '{}'", id, direction),
    })?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SweepscanError::DatabaseQuery {
            reason: format!("signal {}: invalid created_at: {}", id, e),
        })?;
    Ok(StoredSignal {
        id,
        instrument,
        strategy_id,
        direction,
        levels: TradeLevels {
            entry: lv[0],
            stop: lv[1],
            partial_tp: lv[2],
            tp1: lv[3],
            tp2: lv[4],
            breakeven_trigger: lv[5],
        },
        pip_size,
        created_at,
    })
}

impl SignalJournalPort for SqliteJournal {
    fn log_signal(&self, signal: &CandidateSignal) -> Result<i64, SweepscanError> {
        let conn = self.pool.get().map_err(db_err)?;
        let lv = &signal.levels;
        conn.execute(
            "INSERT INTO signals (instrument, strategy_id, direction, confidence, win_probability,
                                  entry, stop, partial_tp, tp1, tp2, breakeven_trigger,
                                  lots, pip_size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                signal.instrument,
                signal.strategy_id,
                signal.direction.as_str(),
                signal.confidence,
                signal.win_probability,
                lv.entry,
                lv.stop,
                lv.partial_tp,
                lv.tp1,
                lv.tp2,
                lv.breakeven_trigger,
                signal.size.lots,
                signal.pip_size,
                signal.created_at.to_rfc3339(),
            ],
        )
        .map_err(query_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn list_pending(&self) -> Result<Vec<StoredSignal>, SweepscanError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, instrument, strategy_id, direction,
                        entry, stop, partial_tp, tp1, tp2, breakeven_trigger,
                        pip_size, created_at
                 FROM signals
                 WHERE outcome IS NULL
                 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| -> rusqlite::Result<PendingRow> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    [
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ],
                    row.get(10)?,
                    row.get(11)?,
                ))
            })
            .map_err(query_err)?;

        rows.map(|row| row.map_err(query_err).and_then(to_stored))
            .collect()
    }

    fn update_result(
        &self,
        id: i64,
        outcome: Outcome,
        realized_pips: f64,
        r_multiple: f64,
    ) -> Result<(), SweepscanError> {
        let conn = self.pool.get().map_err(db_err)?;
        let changed = conn
            .execute(
                "UPDATE signals SET outcome = ?1, realized_pips = ?2, r_multiple = ?3
                 WHERE id = ?4 AND outcome IS NULL",
                params![outcome.as_str(), realized_pips, r_multiple, id],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(SweepscanError::DatabaseQuery {
                reason: format!("no pending signal with id {}", id),
            });
        }
        Ok(())
    }

    fn resolved_outcomes(&self, limit: usize) -> Result<Vec<ResolvedOutcome>, SweepscanError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT instrument, strategy_id, outcome, r_multiple
                 FROM signals
                 WHERE outcome IS NOT NULL
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })
            .map_err(query_err)?;

        let mut outcomes = Vec::new();
        for row in rows {
            let (instrument, strategy_id, outcome, r_multiple) = row.map_err(query_err)?;
            let outcome = Outcome::parse(&outcome).ok_or_else(|| SweepscanError::DatabaseQuery {
                reason: format!("unknown outcome '{}'", outcome),
            })?;
            outcomes.push(ResolvedOutcome {
                instrument,
                strategy_id,
                outcome,
                r_multiple: r_multiple.unwrap_or(0.0),
            });
        }
        outcomes.reverse();
        Ok(outcomes)
    }
}
