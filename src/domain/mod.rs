//! Core domain types and logic.

pub mod ohlcv;
pub mod timeframe;
pub mod market;
pub mod indicator;
pub mod instrument;
pub mod features;
pub mod facts;
pub mod scoring;
pub mod levels;
pub mod sizing;
pub mod signal;
pub mod lifecycle;
pub mod correlation;
pub mod feedback;
pub mod strategy;
pub mod pipeline;
pub mod audit;
pub mod backtest;
pub mod metrics;
pub mod config;
pub mod config_validation;
pub mod error;
