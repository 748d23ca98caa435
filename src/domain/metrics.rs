//! Backtest statistics in R multiples.

use super::backtest::TradeRecord;
use super::lifecycle::Outcome;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_r: f64,
}

impl GroupSummary {
    fn add(&mut self, trade: &TradeRecord) {
        self.trades += 1;
        match trade.resolution.outcome {
            Outcome::Tp2 => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            _ => {}
        }
        self.total_r += trade.resolution.r_multiple;
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades > 0 {
            self.wins as f64 / self.trades as f64
        } else {
            0.0
        }
    }

    pub fn expectancy_r(&self) -> f64 {
        if self.trades > 0 {
            self.total_r / self.trades as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub outcome_counts: HashMap<Outcome, usize>,
    /// Full TP2 wins over all trades.
    pub win_rate: f64,
    /// Wins over wins plus full losses, ignoring everything in between.
    pub decisive_win_rate: f64,
    pub total_r: f64,
    pub expectancy_r: f64,
    pub profit_factor: f64,
    pub avg_win_r: f64,
    pub avg_loss_r: f64,
    pub largest_win_r: f64,
    pub largest_loss_r: f64,
    /// Deepest peak-to-trough fall of cumulative R.
    pub max_drawdown_r: f64,
    /// Longest run of trades spent below the cumulative R peak.
    pub max_drawdown_trades: usize,
    pub total_pips: f64,
    pub avg_bars_held: f64,
    pub by_instrument: BTreeMap<String, GroupSummary>,
    pub by_strategy: BTreeMap<String, GroupSummary>,
}

impl BacktestMetrics {
    /// `trades` in the order they were opened.
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let mut outcome_counts: HashMap<Outcome, usize> = HashMap::new();
        let mut by_instrument: BTreeMap<String, GroupSummary> = BTreeMap::new();
        let mut by_strategy: BTreeMap<String, GroupSummary> = BTreeMap::new();

        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut largest_win_r = 0.0_f64;
        let mut largest_loss_r = 0.0_f64;
        let mut total_pips = 0.0_f64;
        let mut total_bars = 0usize;

        for trade in trades {
            let r = trade.resolution.r_multiple;
            *outcome_counts.entry(trade.resolution.outcome).or_insert(0) += 1;
            by_instrument
                .entry(trade.instrument.clone())
                .or_default()
                .add(trade);
            by_strategy
                .entry(trade.strategy_id.clone())
                .or_default()
                .add(trade);

            if r > 0.0 {
                positive += 1;
                gross_win += r;
                largest_win_r = largest_win_r.max(r);
            } else if r < 0.0 {
                negative += 1;
                gross_loss += r.abs();
                largest_loss_r = largest_loss_r.max(r.abs());
            }
            total_pips += trade.resolution.realized_pips;
            total_bars += trade.resolution.bars_held;
        }

        let total_trades = trades.len();
        let count = |o: Outcome| outcome_counts.get(&o).copied().unwrap_or(0);
        let wins = count(Outcome::Tp2);
        let losses = count(Outcome::Loss);

        let per_trade = |v: f64| {
            if total_trades > 0 {
                v / total_trades as f64
            } else {
                0.0
            }
        };
        let total_r = gross_win - gross_loss;

        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let r_series: Vec<f64> = trades.iter().map(|t| t.resolution.r_multiple).collect();
        let (max_drawdown_r, max_drawdown_trades) = compute_drawdown(&r_series);

        BacktestMetrics {
            total_trades,
            win_rate: per_trade(wins as f64),
            decisive_win_rate: if wins + losses > 0 {
                wins as f64 / (wins + losses) as f64
            } else {
                0.0
            },
            total_r,
            expectancy_r: per_trade(total_r),
            profit_factor,
            avg_win_r: if positive > 0 { gross_win / positive as f64 } else { 0.0 },
            avg_loss_r: if negative > 0 { gross_loss / negative as f64 } else { 0.0 },
            largest_win_r,
            largest_loss_r,
            max_drawdown_r,
            max_drawdown_trades,
            total_pips,
            avg_bars_held: per_trade(total_bars as f64),
            outcome_counts,
            by_instrument,
            by_strategy,
        }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcome_counts.get(&outcome).copied().unwrap_or(0)
    }
}

/// Deepest fall of the running R sum from its peak, and the longest run of
/// trades below the peak. The curve starts at 0 R.
fn compute_drawdown(r_multiples: &[f64]) -> (f64, usize) {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for r in r_multiples {
        equity += r;
        if equity >= peak {
            peak = equity;
            current_duration = 0;
        } else {
            max_dd = max_dd.max(peak - equity);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}
