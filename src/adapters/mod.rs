//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod ledger_report_adapter;
pub mod log_alert_adapter;
pub mod memory_journal_adapter;
pub mod neutral_adapter;
pub mod retrying_market_data;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
