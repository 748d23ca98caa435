//! Backtest report port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SweepscanError;
use crate::domain::metrics::BacktestMetrics;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &BacktestMetrics,
        output_path: &str,
    ) -> Result<(), SweepscanError>;
}
