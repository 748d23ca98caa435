//! Port traits: the boundaries between the domain and the outside world.

pub mod alert_port;
pub mod classifier_port;
pub mod config_port;
pub mod grader_port;
pub mod journal_port;
pub mod market_data_port;
pub mod report_port;
