//! Qualitative setup grading port trait.

use crate::domain::error::SweepscanError;
use crate::domain::signal::Direction;

/// What a grader gets to see of a setup.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupSummary {
    pub instrument: String,
    pub strategy_id: String,
    pub direction: Direction,
    pub rule_score: f64,
    /// One line per structural fact that contributed.
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    /// `false` rejects the setup outright.
    pub valid: bool,
    pub narrative: String,
    /// Optional score on the rule-score scale, blended into confidence.
    pub score: Option<f64>,
}

impl Grade {
    /// Used when no grader is configured or the grader fails.
    pub fn neutral() -> Self {
        Self {
            valid: true,
            narrative: "no qualitative review".to_string(),
            score: None,
        }
    }
}

pub trait SetupGraderPort: Send + Sync {
    fn grade(&self, summary: &SetupSummary) -> Result<Grade, SweepscanError>;
}
