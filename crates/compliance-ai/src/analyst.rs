//! End-to-end analysis: extract → validate → score → decide.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use compliance_core::{
    AnalysisOutput, CatalogHandle, ComplianceResponse, Decision, DecisionPolicy, PolicyError,
    ReasoningNode, RegulationCatalog, RiskAssessment, RiskPolicy, ValidationPolicy, Validator,
};
use tracing::{info, warn};

use crate::error::{AnalysisError, ExtractionError};
use crate::extractor::FactExtractor;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Policies for the deterministic stages plus the extraction deadline.
#[derive(Debug, Clone)]
pub struct AnalystSettings {
    pub validation: ValidationPolicy,
    pub risk: RiskPolicy,
    pub decision: DecisionPolicy,
    pub extraction_timeout: Duration,
}

impl Default for AnalystSettings {
    fn default() -> Self {
        Self {
            validation: ValidationPolicy::default(),
            risk: RiskPolicy::default(),
            decision: DecisionPolicy::default(),
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }
}

impl AnalystSettings {
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.risk.validate()?;
        self.decision.validate()
    }
}

/// Runs one query through the whole pipeline.
///
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct Analyst {
    extractor: Arc<dyn FactExtractor>,
    catalog: CatalogHandle,
    settings: AnalystSettings,
}

impl Analyst {
    /// Fails when the scoring policies are inconsistent; a NaN weight or
    /// inverted cutoffs would otherwise score every query Low.
    pub fn new(
        extractor: Arc<dyn FactExtractor>,
        catalog: CatalogHandle,
        settings: AnalystSettings,
    ) -> Result<Self, PolicyError> {
        settings.validate()?;
        Ok(Self {
            extractor,
            catalog,
            settings,
        })
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn settings(&self) -> &AnalystSettings {
        &self.settings
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Analyse a query against the catalog as it stands when the call starts.
    pub async fn analyze(&self, query: &str) -> Result<ComplianceResponse, AnalysisError> {
        let catalog = self.catalog.snapshot()?;
        let nodes = if query.trim().is_empty() {
            Vec::new()
        } else {
            self.extract(query).await?
        };
        Ok(self.assess(&catalog, nodes))
    }

    /// Like [`analyze`](Self::analyze), but gives up with
    /// [`AnalysisError::Cancelled`] as soon as `cancel` resolves.
    pub async fn analyze_until<F>(
        &self,
        query: &str,
        cancel: F,
    ) -> Result<ComplianceResponse, AnalysisError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => {
                info!(extractor = self.extractor.name(), "analysis cancelled");
                Err(AnalysisError::Cancelled)
            }
            result = self.analyze(query) => result,
        }
    }

    async fn extract(&self, query: &str) -> Result<Vec<ReasoningNode>, ExtractionError> {
        let limit = self.settings.extraction_timeout;
        match tokio::time::timeout(limit, self.extractor.extract(query)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(limit)),
        }
    }

    /// The deterministic tail of the pipeline over already-extracted nodes.
    pub fn assess(&self, catalog: &RegulationCatalog, nodes: Vec<ReasoningNode>) -> ComplianceResponse {
        let extracted = nodes.len();
        let validated = Validator::new(catalog, self.settings.validation).validate(nodes);
        for warning in &validated.warnings {
            warn!(?warning, "reasoning graph adjusted");
        }

        let assessment = self
            .settings
            .risk
            .score_with_dropped(&validated.nodes, validated.dropped());
        let decision = self
            .settings
            .decision
            .decide(assessment.risk_level, assessment.confidence);
        let summary = summarize(&validated.nodes, &assessment, decision);

        info!(
            extractor = self.extractor.name(),
            extracted,
            kept = validated.nodes.len(),
            risk = %assessment.risk_level,
            confidence = assessment.confidence,
            decision = %decision,
            "analysis complete"
        );

        ComplianceResponse {
            analysis: AnalysisOutput {
                reasoning_map: validated.nodes,
                risk_level: assessment.risk_level,
                confidence: assessment.confidence,
                summary,
            },
            decision,
        }
    }
}

fn summarize(nodes: &[ReasoningNode], assessment: &RiskAssessment, decision: Decision) -> String {
    if nodes.is_empty() {
        return format!(
            "No compliance-relevant facts were identified; confidence {:.2}. Decision: {decision}.",
            assessment.confidence
        );
    }

    let regulations: BTreeSet<_> = nodes.iter().map(|n| n.regulation()).collect();
    let names: Vec<&str> = regulations.iter().map(|r| r.as_str()).collect();
    let findings = if nodes.len() == 1 { "finding" } else { "findings" };
    let mut summary = format!(
        "{} {findings} under {}. Risk {} (weighted score {:.1}), confidence {:.2}. Decision: {decision}.",
        nodes.len(),
        names.join(", "),
        assessment.risk_level,
        assessment.weighted_score,
        assessment.confidence,
    );

    let other = nodes.iter().filter(|n| n.regulation().is_other()).count();
    if other > 0 {
        summary.push_str(&format!(
            " {other} {} outside the regulation catalog.",
            if other == 1 { "finding falls" } else { "findings fall" }
        ));
    }
    summary
}
