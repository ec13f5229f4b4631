//! Reasoning-node model shared by the extractor, the validator and the API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::Decision;
use crate::error::NodeError;

/// Regulatory regime a fact is mapped onto.
///
/// Closed set with an explicit fallback: any label outside the named four
/// becomes [`Regulation::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regulation {
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "CCPA")]
    Ccpa,
    #[serde(rename = "FDA")]
    Fda,
    #[serde(rename = "IRS")]
    Irs,
    Other,
}

impl Regulation {
    /// Regulations that can be checked against the catalog.
    pub const NAMED: [Regulation; 4] = [Self::Gdpr, Self::Ccpa, Self::Fda, Self::Irs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gdpr => "GDPR",
            Self::Ccpa => "CCPA",
            Self::Fda => "FDA",
            Self::Irs => "IRS",
            Self::Other => "Other",
        }
    }

    /// Parse a free-form label, falling back to `Other` for anything unrecognised.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "GDPR" => Self::Gdpr,
            "CCPA" | "CPRA" => Self::Ccpa,
            "FDA" => Self::Fda,
            "IRS" => Self::Irs,
            _ => Self::Other,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Self::Other)
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate risk level. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic mapping of an input fact to a legal interpretation.
///
/// Text fields are fixed at construction. The validator may drop a node or
/// relabel its regulation to `Other`, but never rewrites `fact` or
/// `justification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord")]
pub struct ReasoningNode {
    fact: String,
    legal_meaning: String,
    regulation: Regulation,
    article: String,
    justification: String,
    regulation_version: Option<String>,
    /// Loosely typed: extractors emit dates in heterogeneous formats.
    effective_date: Option<Value>,
}

impl ReasoningNode {
    /// Build a node, rejecting blank required fields.
    pub fn new(
        fact: impl Into<String>,
        legal_meaning: impl Into<String>,
        regulation: Regulation,
        article: impl Into<String>,
        justification: impl Into<String>,
    ) -> Result<Self, NodeError> {
        let node = Self {
            fact: fact.into(),
            legal_meaning: legal_meaning.into(),
            regulation,
            article: article.into(),
            justification: justification.into(),
            regulation_version: None,
            effective_date: None,
        };
        node.check()?;
        Ok(node)
    }

    pub fn with_regulation_version(mut self, version: impl Into<String>) -> Self {
        self.regulation_version = Some(version.into());
        self
    }

    pub fn with_effective_date(mut self, date: impl Into<Value>) -> Self {
        self.effective_date = Some(date.into());
        self
    }

    fn check(&self) -> Result<(), NodeError> {
        for (name, value) in [
            ("fact", &self.fact),
            ("legal_meaning", &self.legal_meaning),
            ("article", &self.article),
            ("justification", &self.justification),
        ] {
            if value.trim().is_empty() {
                return Err(NodeError::EmptyField(name));
            }
        }
        Ok(())
    }

    pub fn fact(&self) -> &str {
        &self.fact
    }

    pub fn legal_meaning(&self) -> &str {
        &self.legal_meaning
    }

    pub fn regulation(&self) -> Regulation {
        self.regulation
    }

    pub fn article(&self) -> &str {
        &self.article
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }

    pub fn regulation_version(&self) -> Option<&str> {
        self.regulation_version.as_deref()
    }

    pub fn effective_date(&self) -> Option<&Value> {
        self.effective_date.as_ref()
    }

    /// Downgrade to `Other`, keeping every text field intact.
    pub(crate) fn relabel_other(mut self) -> Self {
        self.regulation = Regulation::Other;
        self
    }
}

/// Wire shape of a node as produced by extractors.
///
/// `regulation` is a free string so that unrecognised labels fall back to
/// `Other` instead of failing the whole payload.
#[derive(Deserialize)]
struct NodeRecord {
    fact: String,
    legal_meaning: String,
    regulation: String,
    article: String,
    justification: String,
    #[serde(default)]
    regulation_version: Option<String>,
    #[serde(default)]
    effective_date: Option<Value>,
}

impl TryFrom<NodeRecord> for ReasoningNode {
    type Error = NodeError;

    fn try_from(r: NodeRecord) -> Result<Self, Self::Error> {
        let mut node = ReasoningNode::new(
            r.fact,
            r.legal_meaning,
            Regulation::from_label(&r.regulation),
            r.article,
            r.justification,
        )?;
        node.regulation_version = r.regulation_version;
        node.effective_date = r.effective_date.filter(|v| !v.is_null());
        Ok(node)
    }
}

/// Aggregate result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Extraction order, minus nodes dropped or collapsed by validation.
    pub reasoning_map: Vec<ReasoningNode>,
    pub risk_level: RiskLevel,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
    pub summary: String,
}

/// What `/analyze` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResponse {
    pub analysis: AnalysisOutput,
    pub decision: Decision,
}
