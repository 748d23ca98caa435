//! Alert delivery port trait.

use crate::domain::error::SweepscanError;
use crate::domain::signal::CandidateSignal;

pub trait AlertPort: Send + Sync {
    fn deliver(&self, signal: &CandidateSignal, message: &str) -> Result<(), SweepscanError>;
}
