//! Configuration validation.
//!
//! Validates config fields before the engine or a backtest runs. Absent
//! keys are fine (defaults apply); present keys must be in range.

use crate::domain::config::parse_hours;
use crate::domain::error::SweepscanError;
use crate::domain::features::session::SessionWindows;
use crate::domain::features::value_area::ValueAreaMethod;
use crate::domain::lifecycle::TieBreakPolicy;
use crate::domain::strategy::STRATEGY_IDS;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, NaiveDate, Utc};

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    validate_sizing(config)?;
    validate_levels(config)?;
    validate_features(config)?;
    validate_lifecycle(config)?;
    validate_feedback(config)?;
    validate_grading(config)?;
    validate_strategies(config)?;
    validate_instruments(config)?;
    Ok(())
}

/// One year.
pub const MAX_COOLDOWN_HOURS: f64 = 24.0 * 365.0;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    let start = parse_required_time(config, "start")?;
    let end = parse_required_time(config, "end")?;
    if start >= end {
        return Err(invalid("backtest", "start", "start must be before end"));
    }
    let cooldown_hours = config.get_double("backtest", "cooldown_hours", 8.0);
    if !(0.0..=MAX_COOLDOWN_HOURS).contains(&cooldown_hours) {
        return Err(invalid(
            "backtest",
            "cooldown_hours",
            &format!("cooldown_hours must be between 0 and {MAX_COOLDOWN_HOURS}"),
        ));
    }
    if config.get_int("backtest", "tuning_passes", 0) < 0 {
        return Err(invalid("backtest", "tuning_passes", "tuning_passes must be non-negative"));
    }
    if config
        .get_string("backtest", "value_area_method")
        .is_some_and(|raw| ValueAreaMethod::parse(&raw).is_none())
    {
        return Err(invalid(
            "backtest",
            "value_area_method",
            "expected volume_profile or rolling_approx",
        ));
    }
    check_positive_int(config, "backtest", "warmup_bars")?;
    check_positive_int(config, "backtest", "max_history_bars")?;
    Ok(())
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub(crate) fn parse_required_time(config: &dyn ConfigPort, key: &str) -> Result<DateTime<Utc>, SweepscanError> {
    match config.get_string("backtest", key) {
        None => Err(SweepscanError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
        Some(s) => parse_date_time(&s).ok_or_else(|| {
            invalid(
                "backtest",
                key,
                &format!("invalid {} format, expected YYYY-MM-DD or RFC 3339", key),
            )
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> SweepscanError {
    SweepscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Present values of `key` must satisfy `ok`.
fn check_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    ok: impl Fn(f64) -> bool,
    reason: &str,
) -> Result<(), SweepscanError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && ok(v) => Ok(()),
            _ => Err(invalid(section, key, reason)),
        },
    }
}

fn check_positive_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SweepscanError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(v) if v >= 1 => Ok(()),
            _ => Err(invalid(section, key, &format!("{} must be a positive integer", key))),
        },
    }
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    check_double(config, "sizing", "equity", |v| v > 0.0, "equity must be positive")?;
    check_double(
        config,
        "sizing",
        "risk_pct",
        |v| v > 0.0 && v < 1.0,
        "risk_pct must be between 0 and 1",
    )?;
    check_double(
        config,
        "sizing",
        "max_risk_pct",
        |v| v > 0.0 && v <= 1.0,
        "max_risk_pct must be between 0 and 1",
    )
}

fn validate_levels(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    for key in [
        "stop_atr",
        "partial_atr",
        "tp1_atr",
        "breakeven_atr",
        "tp2_overlap",
        "tp2_active",
        "tp2_quiet",
    ] {
        check_double(config, "levels", key, |v| v > 0.0, &format!("{} must be positive", key))?;
    }

    let partial = config.get_double("levels", "partial_atr", 0.5);
    let breakeven = config.get_double("levels", "breakeven_atr", 0.75);
    let tp1 = config.get_double("levels", "tp1_atr", 1.0);
    if partial > breakeven || breakeven > tp1 {
        return Err(invalid(
            "levels",
            "breakeven_atr",
            "expected partial_atr <= breakeven_atr <= tp1_atr",
        ));
    }
    Ok(())
}

fn validate_features(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    let s = "features";
    check_double(config, s, "min_wick_ratio", |v| v > 0.0 && v < 1.0, "min_wick_ratio must be between 0 and 1")?;
    check_double(config, s, "displacement_ratio", |v| v > 0.0 && v <= 1.0, "displacement_ratio must be between 0 and 1")?;
    check_double(config, s, "adr_threshold", |v| v > 0.0 && v <= 1.0, "adr_threshold must be between 0 and 1")?;
    check_double(config, s, "gap_tolerance", |v| (0.0..0.1).contains(&v), "gap_tolerance must be a small non-negative fraction")?;
    for key in [
        "lookback_primary",
        "lookback_secondary",
        "lookback_off_hours",
        "recent_window",
        "gap_window",
        "phase_range_bars",
        "phase_recent_bars",
        "value_area_lookback",
        "value_area_bins",
        "adr_days",
        "trend_ema",
        "macro_ema",
        "slow_ema",
        "atr_period",
        "rsi_period",
        "fast_ema",
    ] {
        check_positive_int(config, s, key)?;
    }

    if config.get_string(s, "value_area_method")
        .is_some_and(|raw| ValueAreaMethod::parse(&raw).is_none())
    {
        return Err(invalid(s, "value_area_method", "expected volume_profile or rolling_approx"));
    }
    if config.get_string("session", "windows")
        .is_some_and(|raw| SessionWindows::parse(&raw).is_none())
    {
        return Err(invalid("session", "windows", "expected hour ranges like 8-10,13-18"));
    }
    if config.get_string("session", "asian")
        .is_some_and(|raw| parse_hours(&raw).is_none())
    {
        return Err(invalid("session", "asian", "expected an hour range like 0-8"));
    }
    Ok(())
}

fn validate_lifecycle(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    check_positive_int(config, "lifecycle", "max_forward_bars")?;
    check_double(
        config,
        "lifecycle",
        "partial_fraction",
        |v| (0.0..=1.0).contains(&v),
        "partial_fraction must be between 0 and 1",
    )?;
    match config.get_string("lifecycle", "tie_break") {
        Some(raw) if TieBreakPolicy::parse(&raw).is_none() => Err(invalid(
            "lifecycle",
            "tie_break",
            "expected stop_first or target_first",
        )),
        _ => Ok(()),
    }
}

fn validate_feedback(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    check_positive_int(config, "feedback", "window")?;
    for key in ["tighten_above", "widen_below", "strong_win_rate", "weak_win_rate"] {
        check_double(
            config,
            "feedback",
            key,
            |v| (0.0..=1.0).contains(&v),
            &format!("{} must be between 0 and 1", key),
        )?;
    }
    Ok(())
}

fn validate_grading(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    check_double(
        config,
        "grading",
        "blend_weight",
        |v| (0.0..=1.0).contains(&v),
        "blend_weight must be between 0 and 1",
    )?;
    check_double(
        config,
        "grading",
        "min_win_probability",
        |v| (0.0..=1.0).contains(&v),
        "min_win_probability must be between 0 and 1",
    )
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    let Some(ids) = config.get_list("engine", "strategies") else {
        return Ok(());
    };
    if ids.is_empty() {
        return Err(invalid("engine", "strategies", "at least one strategy is required"));
    }
    match ids.iter().find(|id| !STRATEGY_IDS.contains(&id.as_str())) {
        Some(unknown) => Err(invalid(
            "engine",
            "strategies",
            &format!("unknown strategy '{}'", unknown),
        )),
        None => Ok(()),
    }
}

fn validate_instruments(config: &dyn ConfigPort) -> Result<(), SweepscanError> {
    let Some(symbols) = config.get_list("instruments", "symbols") else {
        return Ok(());
    };
    if symbols.is_empty() {
        return Err(SweepscanError::ConfigMissing {
            section: "instruments".to_string(),
            key: "symbols".to_string(),
        });
    }
    for symbol in &symbols {
        let section = format!("instrument.{}", symbol.to_ascii_uppercase());
        for key in ["pip_size", "pip_value", "min_lot"] {
            check_double(config, &section, key, |v| v > 0.0, &format!("{} must be positive", key))?;
        }
        check_positive_int(config, &section, "sweep_lookback")?;
        if config.get_string(&section, "session_hours")
            .is_some_and(|raw| parse_hours(&raw).is_none())
        {
            return Err(invalid(&section, "session_hours", "expected an hour range like 8-22"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(result: Result<(), SweepscanError>) -> Option<String> {
        match result {
            Err(SweepscanError::ConfigInvalid { key, .. }) => Some(key),
            _ => None,
        }
    }

    #[test]
    fn empty_engine_config_passes() {
        assert!(validate_engine_config(&make_config("")).is_ok());
    }

    #[test]
    fn full_engine_config_passes() {
        let config = make_config(
            r#"
[engine]
strategies = smc_institutional, breakout_master

[instruments]
symbols = EURUSD, XAUUSD

[instrument.XAUUSD]
pip_size = 1.0
session_hours = 8-22

[sizing]
equity = 50.0
risk_pct = 0.02

[levels]
partial_atr = 0.5
breakeven_atr = 0.75

[lifecycle]
tie_break = stop_first

[session]
windows = 8-10,13-18
"#,
        );
        assert!(validate_engine_config(&config).is_ok());
    }

    #[test]
    fn risk_pct_out_of_range_fails() {
        let config = make_config("[sizing]\nrisk_pct = 0\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("risk_pct".into()));
    }

    #[test]
    fn non_numeric_value_fails() {
        let config = make_config("[sizing]\nequity = lots\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("equity".into()));
    }

    #[test]
    fn level_ordering_enforced() {
        let config = make_config("[levels]\npartial_atr = 0.9\nbreakeven_atr = 0.6\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("breakeven_atr".into()));
    }

    #[test]
    fn unknown_tie_break_fails() {
        let config = make_config("[lifecycle]\ntie_break = coin_flip\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("tie_break".into()));
    }

    #[test]
    fn zero_forward_bars_fails() {
        let config = make_config("[lifecycle]\nmax_forward_bars = 0\n");
        assert_eq!(
            invalid_key(validate_engine_config(&config)),
            Some("max_forward_bars".into())
        );
    }

    #[test]
    fn unknown_strategy_fails() {
        let config = make_config("[engine]\nstrategies = smc_institutional, martingale\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("strategies".into()));
    }

    #[test]
    fn bad_session_windows_fail() {
        let config = make_config("[session]\nwindows = 10-8\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("windows".into()));
    }

    #[test]
    fn instrument_pip_size_must_be_positive() {
        let config = make_config("[instruments]\nsymbols = EURUSD\n\n[instrument.EURUSD]\npip_size = 0\n");
        assert_eq!(invalid_key(validate_engine_config(&config)), Some("pip_size".into()));
    }

    #[test]
    fn backtest_dates_validated() {
        let ok = make_config("[backtest]\nstart = 2024-01-01\nend = 2024-02-01T00:00:00Z\n");
        assert!(validate_backtest_config(&ok).is_ok());

        let inverted = make_config("[backtest]\nstart = 2024-03-01\nend = 2024-02-01\n");
        assert_eq!(invalid_key(validate_backtest_config(&inverted)), Some("start".into()));

        let missing = make_config("[backtest]\nstart = 2024-03-01\n");
        assert!(matches!(
            validate_backtest_config(&missing),
            Err(SweepscanError::ConfigMissing { .. })
        ));

        let garbled = make_config("[backtest]\nstart = yesterday\nend = 2024-02-01\n");
        assert_eq!(invalid_key(validate_backtest_config(&garbled)), Some("start".into()));
    }

    #[test]
    fn backtest_cooldown_bounded() {
        let window = "[backtest]\nstart = 2024-01-01\nend = 2024-02-01\n";
        let day = make_config(&format!("{window}cooldown_hours = 24\n"));
        assert!(validate_backtest_config(&day).is_ok());

        for bad in ["-1", "1e300", "inf", "9000"] {
            let config = make_config(&format!("{window}cooldown_hours = {bad}\n"));
            assert_eq!(
                invalid_key(validate_backtest_config(&config)),
                Some("cooldown_hours".into()),
                "cooldown_hours = {bad}"
            );
        }
    }

    #[test]
    fn parse_date_time_formats() {
        let a = parse_date_time("2024-05-01").unwrap();
        let b = parse_date_time("2024-05-01T00:00:00+00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_date_time("05/01/2024").is_none());
    }
}
