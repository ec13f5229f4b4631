//! Core of the compliance agent: the reasoning-node model, the regulation
//! catalog, and the three deterministic pipeline stages that follow
//! extraction (validate → score → decide).

pub mod article;
pub mod catalog;
pub mod decision;
mod error;
pub mod node;
pub mod risk;
pub mod validate;

pub use article::{article_sort_key, normalize_article, parent_reference};
pub use catalog::{ArticleEntry, CatalogHandle, RegulationCatalog, RegulationEntry};
pub use decision::{Decision, DecisionPolicy};
pub use error::{CatalogError, NodeError, PolicyError};
pub use node::{AnalysisOutput, ComplianceResponse, ReasoningNode, Regulation, RiskLevel};
pub use risk::{RegulationWeights, RiskAssessment, RiskPolicy};
pub use validate::{Validated, ValidationAction, ValidationPolicy, ValidationWarning, Validator};
