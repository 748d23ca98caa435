//! Local stand-ins for the external grader and classifier.
//!
//! The grader approves every setup without a score, so confidence is the
//! rule score alone. The classifier returns a fixed probability, which
//! leaves the correlation filter's order to arrival order.

use crate::domain::error::SweepscanError;
use crate::ports::classifier_port::{ClassifierFeatures, NEUTRAL_PROBABILITY, WinProbabilityPort};
use crate::ports::grader_port::{Grade, SetupGraderPort, SetupSummary};

#[derive(Debug, Default)]
pub struct NeutralGrader;

impl SetupGraderPort for NeutralGrader {
    fn grade(&self, _summary: &SetupSummary) -> Result<Grade, SweepscanError> {
        Ok(Grade::neutral())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantClassifier(pub f64);

impl Default for ConstantClassifier {
    fn default() -> Self {
        Self(NEUTRAL_PROBABILITY)
    }
}

impl WinProbabilityPort for ConstantClassifier {
    fn predict(&self, _features: &ClassifierFeatures) -> Result<f64, SweepscanError> {
        Ok(self.0.clamp(0.0, 1.0))
    }
}
