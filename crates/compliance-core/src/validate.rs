//! Reasoning graph validation against the regulation catalog.
//!
//! Invalid nodes are never fatal: a catalog-unknown article is either dropped
//! or downgraded to `Other` depending on [`ValidationPolicy`], and repeated
//! `(fact, regulation, article)` triples collapse onto their first occurrence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::article::normalize_article;
use crate::catalog::RegulationCatalog;
use crate::node::{ReasoningNode, Regulation};

/// What to do with a node whose named regulation does not know its article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Drop the node.
    Strict,
    /// Relabel the node's regulation to `Other`, keeping its text.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAction {
    Dropped,
    Relabeled,
}

/// Non-fatal finding recorded while validating. Indices refer to the input sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    UnknownArticle {
        index: usize,
        regulation: Regulation,
        article: String,
        action: ValidationAction,
    },
    Duplicate {
        index: usize,
        first_index: usize,
    },
}

/// Validator output: surviving nodes in input order plus what happened to the rest.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    pub nodes: Vec<ReasoningNode>,
    pub warnings: Vec<ValidationWarning>,
}

impl Validated {
    /// Nodes removed because their article is unknown (strict mode).
    pub fn dropped(&self) -> usize {
        self.count_unknown(ValidationAction::Dropped)
    }

    /// Nodes downgraded to `Other` (lenient mode).
    pub fn relabeled(&self) -> usize {
        self.count_unknown(ValidationAction::Relabeled)
    }

    pub fn duplicates(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, ValidationWarning::Duplicate { .. }))
            .count()
    }

    fn count_unknown(&self, wanted: ValidationAction) -> usize {
        self.warnings
            .iter()
            .filter(|w| {
                matches!(w, ValidationWarning::UnknownArticle { action, .. } if *action == wanted)
            })
            .count()
    }
}

/// Checks nodes against one catalog snapshot under an explicit policy.
pub struct Validator<'a> {
    catalog: &'a RegulationCatalog,
    policy: ValidationPolicy,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a RegulationCatalog, policy: ValidationPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validate and deduplicate, preserving input order.
    ///
    /// The dedup key is taken after relabelling, so running the validator
    /// on its own output is a no-op.
    pub fn validate(&self, nodes: Vec<ReasoningNode>) -> Validated {
        let mut out = Validated {
            nodes: Vec::with_capacity(nodes.len()),
            warnings: Vec::new(),
        };
        let mut seen: HashMap<(String, Regulation, String), usize> = HashMap::new();

        for (index, node) in nodes.into_iter().enumerate() {
            let regulation = node.regulation();
            let node = if regulation.is_other() || self.catalog.contains(regulation, node.article()) {
                node
            } else {
                let action = match self.policy {
                    ValidationPolicy::Strict => ValidationAction::Dropped,
                    ValidationPolicy::Lenient => ValidationAction::Relabeled,
                };
                debug!(
                    index,
                    regulation = %regulation,
                    article = node.article(),
                    ?action,
                    "article not in catalog"
                );
                out.warnings.push(ValidationWarning::UnknownArticle {
                    index,
                    regulation,
                    article: node.article().to_string(),
                    action,
                });
                match action {
                    ValidationAction::Dropped => continue,
                    ValidationAction::Relabeled => node.relabel_other(),
                }
            };

            let key = (
                node.fact().trim().to_string(),
                node.regulation(),
                normalize_article(node.article()),
            );
            if let Some(&first_index) = seen.get(&key) {
                debug!(index, first_index, "duplicate reasoning node collapsed");
                out.warnings
                    .push(ValidationWarning::Duplicate { index, first_index });
                continue;
            }
            seen.insert(key, index);
            out.nodes.push(node);
        }

        out
    }
}
