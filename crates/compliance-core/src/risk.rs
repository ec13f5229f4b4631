//! Deterministic risk aggregation over validated reasoning nodes.
//!
//! The weighted score is the sum of per-regulation severity weights, one per
//! node. Two named cutoffs split it into Low / Medium / High. Confidence starts
//! from `base_confidence` and loses `uncertainty_penalty` in proportion to the
//! share of nodes that are `Other` or were dropped by validation.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::node::{ReasoningNode, Regulation, RiskLevel};

/// Severity weight per regulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulationWeights {
    pub gdpr: f64,
    pub ccpa: f64,
    pub fda: f64,
    pub irs: f64,
    pub other: f64,
}

impl Default for RegulationWeights {
    fn default() -> Self {
        Self {
            gdpr: 2.0,
            ccpa: 1.5,
            fda: 3.0,
            irs: 3.0,
            other: 1.0,
        }
    }
}

impl RegulationWeights {
    pub fn weight(&self, regulation: Regulation) -> f64 {
        match regulation {
            Regulation::Gdpr => self.gdpr,
            Regulation::Ccpa => self.ccpa,
            Regulation::Fda => self.fda,
            Regulation::Irs => self.irs,
            Regulation::Other => self.other,
        }
    }
}

/// Tunable scoring policy. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub weights: RegulationWeights,
    /// Weighted score at or above which risk is Medium.
    pub medium_at: f64,
    /// Weighted score at or above which risk is High.
    pub high_at: f64,
    /// Confidence when every node resolved against the catalog.
    pub base_confidence: f64,
    /// Confidence lost when every node is uncertain.
    pub uncertainty_penalty: f64,
    /// Confidence reported when nothing was extracted.
    pub empty_confidence: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            weights: RegulationWeights::default(),
            medium_at: 2.0,
            high_at: 6.0,
            base_confidence: 0.92,
            uncertainty_penalty: 0.6,
            empty_confidence: 0.3,
        }
    }
}

/// Output of [`RiskPolicy::score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// Within `[0.0, 1.0]`.
    pub confidence: f64,
    pub weighted_score: f64,
    /// Share of `Other` plus dropped nodes among everything extracted.
    pub uncertain_fraction: f64,
}

impl RiskPolicy {
    /// Reject configurations that would break the scoring invariants.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for regulation in Regulation::NAMED.iter().chain([Regulation::Other].iter()) {
            let value = self.weights.weight(*regulation);
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::Weight {
                    regulation: regulation.to_string(),
                    value,
                });
            }
        }
        if !(self.medium_at.is_finite() && self.high_at.is_finite())
            || self.medium_at > self.high_at
        {
            return Err(PolicyError::Cutoffs {
                medium_at: self.medium_at,
                high_at: self.high_at,
            });
        }
        for (name, value) in [
            ("base_confidence", self.base_confidence),
            ("uncertainty_penalty", self.uncertainty_penalty),
            ("empty_confidence", self.empty_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::Probability { name, value });
            }
        }
        if self.empty_confidence >= 0.5 {
            return Err(PolicyError::EmptyConfidence(self.empty_confidence));
        }
        Ok(())
    }

    pub fn level_for(&self, weighted_score: f64) -> RiskLevel {
        if weighted_score >= self.high_at {
            RiskLevel::High
        } else if weighted_score >= self.medium_at {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Score nodes that all survived validation.
    pub fn score(&self, nodes: &[ReasoningNode]) -> RiskAssessment {
        self.score_with_dropped(nodes, 0)
    }

    /// Score validated nodes, counting `dropped` removed nodes as uncertain.
    pub fn score_with_dropped(&self, nodes: &[ReasoningNode], dropped: usize) -> RiskAssessment {
        if nodes.is_empty() {
            return RiskAssessment {
                risk_level: RiskLevel::Low,
                confidence: clamp_unit(self.empty_confidence),
                weighted_score: 0.0,
                uncertain_fraction: if dropped > 0 { 1.0 } else { 0.0 },
            };
        }

        let weighted_score: f64 = nodes
            .iter()
            .map(|n| self.weights.weight(n.regulation()))
            .sum();

        let other = nodes.iter().filter(|n| n.regulation().is_other()).count();
        let uncertain_fraction = (other + dropped) as f64 / (nodes.len() + dropped) as f64;
        let confidence =
            clamp_unit(self.base_confidence - self.uncertainty_penalty * uncertain_fraction);

        RiskAssessment {
            risk_level: self.level_for(weighted_score),
            confidence,
            weighted_score,
            uncertain_fraction,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
