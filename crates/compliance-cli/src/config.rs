//! Pipeline configuration shared by `serve` and `analyze`.
//!
//! Every option has a flag and an environment fallback; nothing is read from
//! global state after start-up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use compliance_ai::{
    Analyst, AnalystSettings, FactExtractor, LlmConfig, LlmExtractor, RuleExtractor,
};
use compliance_core::{
    CatalogHandle, DecisionPolicy, RegulationCatalog, RiskPolicy, ValidationPolicy,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractorKind {
    /// Offline keyword lexicon.
    Rules,
    /// Hosted language model (needs an API key).
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValidationMode {
    /// Drop nodes whose article is not in the catalog.
    Strict,
    /// Relabel such nodes as Other.
    Lenient,
}

impl From<ValidationMode> for ValidationPolicy {
    fn from(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Strict => ValidationPolicy::Strict,
            ValidationMode::Lenient => ValidationPolicy::Lenient,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Regulation catalog JSON file. The built-in catalog is used when absent.
    #[arg(long, env = "COMPLIANCE_CATALOG")]
    pub catalog: Option<PathBuf>,
}

impl CatalogArgs {
    pub fn load(&self) -> anyhow::Result<RegulationCatalog> {
        match &self.catalog {
            Some(path) => RegulationCatalog::load(path)
                .with_context(|| format!("loading catalog {}", path.display())),
            None => Ok(RegulationCatalog::builtin()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Fact extraction backend.
    #[arg(long, value_enum, env = "COMPLIANCE_EXTRACTOR", default_value = "rules")]
    pub extractor: ExtractorKind,

    /// API key for the llm extractor.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Messages API.
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = compliance_ai::llm::DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Model used by the llm extractor.
    #[arg(long, env = "COMPLIANCE_MODEL", default_value = compliance_ai::llm::DEFAULT_MODEL)]
    pub model: String,

    /// What to do with nodes citing articles missing from the catalog.
    #[arg(long, value_enum, env = "COMPLIANCE_VALIDATION", default_value = "lenient")]
    pub validation: ValidationMode,

    /// JSON file with a risk policy (weights, cutoffs, confidence terms).
    #[arg(long, env = "COMPLIANCE_RISK_POLICY")]
    pub risk_policy: Option<PathBuf>,

    /// Override the weighted score at which risk becomes Medium.
    #[arg(long, env = "COMPLIANCE_MEDIUM_AT")]
    pub medium_at: Option<f64>,

    /// Override the weighted score at which risk becomes High.
    #[arg(long, env = "COMPLIANCE_HIGH_AT")]
    pub high_at: Option<f64>,

    /// Minimum confidence for a Low-risk query to be auto-approved.
    #[arg(long, env = "COMPLIANCE_AUTO_APPROVE_AT", default_value_t = 0.80)]
    pub auto_approve_at: f64,

    /// Seconds allowed for fact extraction.
    #[arg(long, env = "COMPLIANCE_EXTRACTION_TIMEOUT_SECS", default_value_t = 30)]
    pub extraction_timeout_secs: u64,
}

impl PipelineArgs {
    pub fn settings(&self) -> anyhow::Result<AnalystSettings> {
        let mut risk = match &self.risk_policy {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading risk policy {}", path.display()))?;
                serde_json::from_str::<RiskPolicy>(&raw)
                    .with_context(|| format!("parsing risk policy {}", path.display()))?
            }
            None => RiskPolicy::default(),
        };
        if let Some(v) = self.medium_at {
            risk.medium_at = v;
        }
        if let Some(v) = self.high_at {
            risk.high_at = v;
        }

        let settings = AnalystSettings {
            validation: self.validation.into(),
            risk,
            decision: DecisionPolicy {
                auto_approve_at: self.auto_approve_at,
            },
            extraction_timeout: Duration::from_secs(self.extraction_timeout_secs),
        };
        settings.validate().context("invalid scoring policy")?;
        Ok(settings)
    }

    pub fn extractor(&self) -> anyhow::Result<Arc<dyn FactExtractor>> {
        match self.extractor {
            ExtractorKind::Rules => Ok(Arc::new(RuleExtractor::new())),
            ExtractorKind::Llm => {
                let Some(api_key) = self.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                    bail!("the llm extractor needs an API key (--api-key or ANTHROPIC_API_KEY)");
                };
                let mut config = LlmConfig::new(api_key);
                config.base_url = self.api_base_url.clone();
                config.model = self.model.clone();
                Ok(Arc::new(LlmExtractor::new(config)))
            }
        }
    }

    /// Load the catalog and assemble the pipeline.
    pub fn build(&self) -> anyhow::Result<(Analyst, CatalogHandle)> {
        let catalog = CatalogHandle::new(self.catalog.load()?);
        let settings = self.settings()?;
        let extractor = self.extractor()?;
        info!(
            extractor = extractor.name(),
            validation = ?settings.validation,
            timeout_secs = settings.extraction_timeout.as_secs(),
            "pipeline configured"
        );
        let analyst = Analyst::new(extractor, catalog.clone(), settings)
            .context("invalid scoring policy")?;
        Ok((analyst, catalog))
    }
}
