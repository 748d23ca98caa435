//! Backtest report adapter: a CSV trade ledger plus a plain-text summary
//! written next to it (`<ledger stem>_summary.txt`).

use crate::domain::backtest::{BacktestResult, TradeRecord};
use crate::domain::error::SweepscanError;
use crate::domain::lifecycle::Outcome;
use crate::domain::metrics::BacktestMetrics;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    opened_at: String,
    closed_at: String,
    instrument: &'a str,
    strategy: &'a str,
    direction: &'static str,
    session: &'static str,
    phase: &'static str,
    confidence: f64,
    win_probability: f64,
    entry: f64,
    stop: f64,
    tp2: f64,
    lots: f64,
    outcome: &'static str,
    r_multiple: f64,
    realized_pips: f64,
    bars_held: usize,
}

impl<'a> From<&'a TradeRecord> for LedgerRow<'a> {
    fn from(t: &'a TradeRecord) -> Self {
        Self {
            opened_at: t.opened_at.to_rfc3339(),
            closed_at: t.resolution.closed_at.to_rfc3339(),
            instrument: &t.instrument,
            strategy: &t.strategy_id,
            direction: t.direction.as_str(),
            session: t.session.as_str(),
            phase: t.phase.as_str(),
            confidence: t.confidence,
            win_probability: t.win_probability,
            entry: t.levels.entry,
            stop: t.levels.stop,
            tp2: t.levels.tp2,
            lots: t.lots,
            outcome: t.resolution.outcome.as_str(),
            r_multiple: t.resolution.r_multiple,
            realized_pips: t.resolution.realized_pips,
            bars_held: t.resolution.bars_held,
        }
    }
}

pub struct LedgerReport;

impl LedgerReport {
    pub fn summary_path(ledger: &Path) -> PathBuf {
        let stem = ledger
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backtest".to_string());
        ledger.with_file_name(format!("{}_summary.txt", stem))
    }
}

fn csv_err(e: csv::Error) -> SweepscanError {
    SweepscanError::Io(std::io::Error::other(e))
}

/// Human-readable backtest summary.
pub fn format_summary(result: &BacktestResult, metrics: &BacktestMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Backtest {} .. {}", result.start, result.end);
    let _ = writeln!(
        out,
        "steps {} | candidates {} | trades {} | unresolved {} | tuning passes {}",
        result.steps,
        result.candidates,
        metrics.total_trades,
        result.unresolved,
        result.passes
    );
    let counts: Vec<String> = Outcome::ALL
        .iter()
        .map(|o| format!("{} {}", o, metrics.count(*o)))
        .collect();
    let _ = writeln!(out, "outcomes: {}", counts.join(", "));
    let _ = writeln!(
        out,
        "win rate {:.1}% (decisive {:.1}%) | total {:+.1}R | expectancy {:+.2}R | PF {:.2}",
        metrics.win_rate * 100.0,
        metrics.decisive_win_rate * 100.0,
        metrics.total_r,
        metrics.expectancy_r,
        metrics.profit_factor
    );
    let _ = writeln!(
        out,
        "max drawdown {:.1}R over {} trades | {:+.1} pips | avg {:.0} bars held",
        metrics.max_drawdown_r,
        metrics.max_drawdown_trades,
        metrics.total_pips,
        metrics.avg_bars_held
    );
    for (label, groups) in [("instrument", &metrics.by_instrument), ("strategy", &metrics.by_strategy)] {
        for (key, g) in groups {
            let _ = writeln!(
                out,
                "  {} {:<24} {:>4} trades  win {:>5.1}%  {:+.1}R",
                label,
                key,
                g.trades,
                g.win_rate() * 100.0,
                g.total_r
            );
        }
    }
    out
}

impl ReportPort for LedgerReport {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &BacktestMetrics,
        output_path: &str,
    ) -> Result<(), SweepscanError> {
        let path = Path::new(output_path);
        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        for trade in &result.trades {
            writer.serialize(LedgerRow::from(trade)).map_err(csv_err)?;
        }
        writer.flush()?;

        fs::write(Self::summary_path(path), format_summary(result, metrics))?;
        Ok(())
    }
}
