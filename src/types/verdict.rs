//! Investment verdict data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Investment potential classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentPotential {
    Low,
    Moderate,
    High,
}

impl InvestmentPotential {
    /// Determine potential from a classifier probability and thresholds.
    ///
    /// Boundaries belong to the higher level.
    pub fn from_probability(probability: f64, thresholds: &VerdictThresholds) -> Self {
        if probability >= thresholds.high {
            InvestmentPotential::High
        } else if probability >= thresholds.moderate {
            InvestmentPotential::Moderate
        } else {
            InvestmentPotential::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvestmentPotential::Low => "Low",
            InvestmentPotential::Moderate => "Moderate",
            InvestmentPotential::High => "High",
        }
    }
}

/// Configurable verdict thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.50,
            high: 0.75,
        }
    }
}

/// Outcome of evaluating one property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentVerdict {
    /// Unique evaluation identifier
    pub request_id: String,

    /// Classifier probability of a favourable investment (0.0 - 1.0)
    pub probability: f64,

    pub potential: InvestmentPotential,

    /// Human readable summary
    pub message: String,

    pub evaluated_at: DateTime<Utc>,
}

impl InvestmentVerdict {
    /// Create a verdict from a classifier probability
    pub fn new(probability: f64, thresholds: &VerdictThresholds) -> Self {
        let potential = InvestmentPotential::from_probability(probability, thresholds);

        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            probability,
            potential,
            message: format!(
                "{} Investment Potential (Confidence: {:.2})",
                potential.label(),
                probability
            ),
            evaluated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_potential_from_probability() {
        let thresholds = VerdictThresholds::default();

        assert_eq!(
            InvestmentPotential::from_probability(0.80, &thresholds),
            InvestmentPotential::High
        );
        assert_eq!(
            InvestmentPotential::from_probability(0.60, &thresholds),
            InvestmentPotential::Moderate
        );
        assert_eq!(
            InvestmentPotential::from_probability(0.30, &thresholds),
            InvestmentPotential::Low
        );
    }

    #[test]
    fn test_boundaries_round_up() {
        let thresholds = VerdictThresholds::default();

        assert_eq!(
            InvestmentPotential::from_probability(0.75, &thresholds),
            InvestmentPotential::High
        );
        assert_eq!(
            InvestmentPotential::from_probability(0.50, &thresholds),
            InvestmentPotential::Moderate
        );
        assert_eq!(
            InvestmentPotential::from_probability(0.4999, &thresholds),
            InvestmentPotential::Low
        );
    }

    #[test]
    fn test_verdict_message() {
        let verdict = InvestmentVerdict::new(0.8, &VerdictThresholds::default());

        assert_eq!(verdict.potential, InvestmentPotential::High);
        assert_eq!(verdict.message, "High Investment Potential (Confidence: 0.80)");
        assert!(uuid::Uuid::parse_str(&verdict.request_id).is_ok());
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = InvestmentVerdict::new(0.6, &VerdictThresholds::default());

        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"potential\":\"moderate\""));

        let deserialized: InvestmentVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(verdict.request_id, deserialized.request_id);
        assert_eq!(verdict.potential, deserialized.potential);
    }
}
