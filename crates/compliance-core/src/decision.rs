//! Final policy decision from a (risk level, confidence) pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::node::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    AutoApproved,
    ReviewRequired,
    Blocked,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApproved => "AUTO_APPROVED",
            Self::ReviewRequired => "REVIEW_REQUIRED",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold configuration for [`DecisionPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Minimum confidence for a Low-risk analysis to be auto-approved.
    pub auto_approve_at: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            auto_approve_at: 0.80,
        }
    }
}

impl DecisionPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !(0.0..=1.0).contains(&self.auto_approve_at) {
            return Err(PolicyError::Probability {
                name: "auto_approve_at",
                value: self.auto_approve_at,
            });
        }
        Ok(())
    }

    /// Map a risk level and confidence to a decision.
    ///
    /// | risk   | confidence ≥ threshold | otherwise       |
    /// |--------|------------------------|-----------------|
    /// | High   | BLOCKED                | BLOCKED         |
    /// | Medium | REVIEW_REQUIRED        | REVIEW_REQUIRED |
    /// | Low    | AUTO_APPROVED          | REVIEW_REQUIRED |
    ///
    /// A NaN confidence never clears the threshold.
    pub fn decide(&self, risk_level: RiskLevel, confidence: f64) -> Decision {
        match risk_level {
            RiskLevel::High => Decision::Blocked,
            RiskLevel::Medium => Decision::ReviewRequired,
            RiskLevel::Low if confidence >= self.auto_approve_at => Decision::AutoApproved,
            RiskLevel::Low => Decision::ReviewRequired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn low_risk_high_confidence_auto_approves() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(RiskLevel::Low, 0.95), Decision::AutoApproved);
        assert_eq!(policy.decide(RiskLevel::Low, 0.80), Decision::AutoApproved);
    }

    #[test]
    fn low_risk_low_confidence_needs_review() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(RiskLevel::Low, 0.10), Decision::ReviewRequired);
        assert_eq!(policy.decide(RiskLevel::Low, 0.7999), Decision::ReviewRequired);
    }

    #[test]
    fn medium_risk_is_never_auto_approved() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(RiskLevel::Medium, 1.0), Decision::ReviewRequired);
        assert_eq!(policy.decide(RiskLevel::Medium, 0.0), Decision::ReviewRequired);
    }

    #[test]
    fn nan_confidence_needs_review() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(RiskLevel::Low, f64::NAN), Decision::ReviewRequired);
        assert_eq!(policy.decide(RiskLevel::High, f64::NAN), Decision::Blocked);
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = DecisionPolicy {
            auto_approve_at: 0.99,
        };
        assert_eq!(strict.decide(RiskLevel::Low, 0.95), Decision::ReviewRequired);
        let loose = DecisionPolicy {
            auto_approve_at: 0.5,
        };
        assert_eq!(loose.decide(RiskLevel::Low, 0.6), Decision::AutoApproved);
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        assert!(DecisionPolicy::default().validate().is_ok());
        assert!(DecisionPolicy { auto_approve_at: 1.5 }.validate().is_err());
        assert!(DecisionPolicy { auto_approve_at: f64::NAN }.validate().is_err());
    }

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_string(&Decision::ReviewRequired).unwrap(),
            "\"REVIEW_REQUIRED\""
        );
        let d: Decision = serde_json::from_str("\"AUTO_APPROVED\"").unwrap();
        assert_eq!(d, Decision::AutoApproved);
        assert_eq!(Decision::Blocked.to_string(), "BLOCKED");
    }

    proptest! {
        #[test]
        fn high_risk_always_blocked(confidence in 0.0f64..=1.0) {
            prop_assert_eq!(DecisionPolicy::default().decide(RiskLevel::High, confidence), Decision::Blocked);
        }

        #[test]
        fn low_risk_follows_threshold(confidence in 0.0f64..=1.0, threshold in 0.0f64..=1.0) {
            let policy = DecisionPolicy { auto_approve_at: threshold };
            let expected = if confidence >= threshold {
                Decision::AutoApproved
            } else {
                Decision::ReviewRequired
            };
            prop_assert_eq!(policy.decide(RiskLevel::Low, confidence), expected);
        }
    }
}
