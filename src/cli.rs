//! CLI definition and dispatch.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ledger_report_adapter::{LedgerReport, format_summary};
use crate::adapters::log_alert_adapter::LogAlert;
use crate::adapters::memory_journal_adapter::MemoryJournal;
use crate::adapters::neutral_adapter::{ConstantClassifier, NeutralGrader};
use crate::adapters::retrying_market_data::RetryingMarketData;
use crate::domain::audit::LiveAuditor;
use crate::domain::backtest::{BacktestConfig, load_markets, run_backtest_with_feedback};
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::{
    parse_date_time, validate_backtest_config, validate_engine_config,
};
use crate::domain::error::SweepscanError;
use crate::domain::feedback::TuningParameters;
use crate::domain::metrics::BacktestMetrics;
use crate::domain::pipeline::{Collaborators, load_tuning, run_cycle};
use crate::domain::signal::format_alert;
use crate::domain::strategy::build_strategies;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_port::SignalJournalPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sweepscan", about = "Liquidity-sweep signal engine and trade simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one evaluation cycle and journal the accepted signals
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluation time (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Re-check journaled signals against newly arrived bars
    Audit {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        at: Option<String>,
    },
    /// Replay history and resolve every accepted signal
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Trade ledger CSV; a summary is written next to it
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Seed tuning from the journal's resolved outcomes
        #[arg(long)]
        use_journal: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan { config, at } => run_scan(&config, at.as_deref()),
        Command::Audit { config, at } => run_audit(&config, at.as_deref()),
        Command::Backtest {
            config,
            output,
            use_journal,
        } => run_backtest(&config, output.as_ref(), use_journal),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SweepscanError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: SweepscanError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

fn resolve_time(at: Option<&str>) -> Result<DateTime<Utc>, ExitCode> {
    match at {
        None => Ok(Utc::now()),
        Some(raw) => parse_date_time(raw).ok_or_else(|| {
            eprintln!("error: invalid --at '{raw}', expected YYYY-MM-DD or RFC 3339");
            ExitCode::from(2)
        }),
    }
}

/// SQLite journal when `[journal] path` is set, otherwise an in-memory one.
pub fn open_journal(config: &dyn ConfigPort) -> Result<Box<dyn SignalJournalPort>, SweepscanError> {
    if config.get_string("journal", "path").is_some() {
        #[cfg(feature = "sqlite")]
        {
            use crate::adapters::sqlite_adapter::SqliteJournal;
            return Ok(Box::new(SqliteJournal::from_config(config)?));
        }
        #[cfg(not(feature = "sqlite"))]
        {
            log::warn!("built without the sqlite feature, journal is kept in memory");
        }
    }
    Ok(Box::new(MemoryJournal::new()))
}

fn run_scan(config_path: &PathBuf, at: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let now = match resolve_time(at) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let engine = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let market_data = match CsvMarketData::from_config(&adapter) {
        Ok(m) => RetryingMarketData::from_config(m, &adapter),
        Err(e) => return fail(e),
    };
    let journal = match open_journal(&adapter) {
        Ok(j) => j,
        Err(e) => return fail(e),
    };

    let tuning = load_tuning(journal.as_ref(), &engine.feedback);
    let strategies = build_strategies(&engine.strategies);
    let collab = Collaborators {
        market_data: &market_data,
        journal: journal.as_ref(),
        alerts: &LogAlert,
        grader: &NeutralGrader,
        classifier: &ConstantClassifier::default(),
    };

    eprintln!(
        "Scanning {} instruments with {} strategies at {}",
        engine.instruments.len(),
        strategies.len(),
        now
    );
    let report = match run_cycle(&engine, &tuning, &strategies, collab, now) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    for signal in &report.accepted {
        println!("{}\n", format_alert(signal));
    }
    if !report.dropped.is_empty() {
        eprintln!("Dropped (no data): {}", report.dropped.join(", "));
    }
    if let Some(theme) = &report.theme {
        eprintln!("Dominant theme: {theme}");
    }
    eprintln!(
        "{} candidates, {} accepted, {} journaled",
        report.candidates,
        report.accepted.len(),
        report.journal_ids.len()
    );
    ExitCode::SUCCESS
}

fn run_audit(config_path: &PathBuf, at: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let now = match resolve_time(at) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let engine = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let market_data = match CsvMarketData::from_config(&adapter) {
        Ok(m) => RetryingMarketData::from_config(m, &adapter),
        Err(e) => return fail(e),
    };
    let journal = match open_journal(&adapter) {
        Ok(j) => j,
        Err(e) => return fail(e),
    };

    let mut auditor = LiveAuditor::new(engine.lifecycle);
    let report = match auditor.audit(journal.as_ref(), &market_data, now) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    for r in &report.resolved {
        println!(
            "#{} {} [{}] {} {:+.2}R {:+.1} pips",
            r.id,
            r.instrument,
            r.strategy_id,
            r.resolution.outcome,
            r.resolution.r_multiple,
            r.resolution.realized_pips
        );
    }
    eprintln!(
        "Audited {} signals: {} resolved, {} still open, {} fetch failures",
        report.checked,
        report.resolved.len(),
        report.still_open,
        report.fetch_failures
    );
    ExitCode::SUCCESS
}

fn run_backtest(config_path: &PathBuf, output_path: Option<&PathBuf>, use_journal: bool) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let engine = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let bt_config = match BacktestConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 2: Seed tuning
    let seed = if use_journal {
        match open_journal(&adapter) {
            Ok(j) => load_tuning(j.as_ref(), &engine.feedback),
            Err(e) => return fail(e),
        }
    } else {
        TuningParameters::default()
    };

    // Stage 3: Load market data
    let market_data = match CsvMarketData::from_config(&adapter) {
        Ok(m) => RetryingMarketData::from_config(m, &adapter),
        Err(e) => return fail(e),
    };
    let forward = Duration::minutes(5 * engine.lifecycle.max_forward_bars as i64);
    let markets = match load_markets(
        &engine.instruments,
        &market_data,
        &engine.history,
        &bt_config,
        forward,
    ) {
        Ok(m) => m,
        Err(e) => return fail(e),
    };

    // Stage 4: Replay
    let strategies = build_strategies(&engine.strategies);
    eprintln!(
        "Running backtest: {} instruments, {} strategies, {} to {} ({} value area)",
        markets.len(),
        strategies.len(),
        bt_config.start,
        bt_config.end,
        bt_config.value_area
    );
    let (result, _tuning) = run_backtest_with_feedback(
        &engine,
        &bt_config,
        seed,
        &strategies,
        &markets,
        &NeutralGrader,
        &ConstantClassifier::default(),
    );

    // Stage 5: Metrics and report
    let metrics = BacktestMetrics::compute(&result.trades);
    eprintln!("\n{}", format_summary(&result, &metrics));

    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("backtest_trades.csv"));
    match LedgerReport.write(&result, &metrics, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("Ledger written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_engine_config(&adapter) {
        return fail(e);
    }
    let has_backtest = adapter.get_string("backtest", "start").is_some()
        || adapter.get_string("backtest", "end").is_some();
    if has_backtest {
        if let Err(e) = validate_backtest_config(&adapter) {
            return fail(e);
        }
    }

    let engine = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    println!("Config OK: {}", config_path.display());
    println!("  Instruments: {}", engine.instruments.symbols().join(", "));
    println!("  Strategies:  {}", engine.strategies.join(", "));
    println!(
        "  Tie-break:   {:?}, forward limit {} bars",
        engine.lifecycle.tie_break, engine.lifecycle.max_forward_bars
    );
    if has_backtest {
        println!("  Backtest:    configured");
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_time_parses_dates() {
        let t = resolve_time(Some("2024-06-03T14:00:00Z")).unwrap();
        assert_eq!(t.to_rfc3339(), "2024-06-03T14:00:00+00:00");
        assert!(resolve_time(Some("yesterday")).is_err());
    }

    #[test]
    fn journal_defaults_to_memory() {
        let cfg = FileConfigAdapter::from_string("[engine]\n").unwrap();
        let journal = open_journal(&cfg).unwrap();
        assert!(journal.list_pending().unwrap().is_empty());
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::parse_from([
            "sweepscan",
            "backtest",
            "-c",
            "sweepscan.ini",
            "-o",
            "out.csv",
            "--use-journal",
        ]);
        match cli.command {
            Command::Backtest {
                config,
                output,
                use_journal,
            } => {
                assert_eq!(config, PathBuf::from("sweepscan.ini"));
                assert_eq!(output, Some(PathBuf::from("out.csv")));
                assert!(use_journal);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
