//! Terminal rendering for analysis results and the regulation catalog.

use std::fmt::Write;

use compliance_core::{ComplianceResponse, Regulation, RegulationCatalog};

const LABEL_WIDTH: usize = 16;

/// Render an analysis as a vertical card: verdict first, then one block per node.
pub fn render_analysis(response: &ComplianceResponse) -> String {
    let analysis = &response.analysis;
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", response.decision);
    let _ = writeln!(out, "{}", analysis.summary);
    let _ = writeln!(out);
    field(&mut out, "Risk", analysis.risk_level.as_str());
    field(&mut out, "Confidence", &format!("{:.2}", analysis.confidence));
    field(&mut out, "Findings", &analysis.reasoning_map.len().to_string());

    for (i, node) in analysis.reasoning_map.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{}] {} {}", i + 1, node.regulation(), node.article());
        field(&mut out, "Fact", node.fact());
        field(&mut out, "Legal meaning", node.legal_meaning());
        field(&mut out, "Justification", node.justification());
        if let Some(version) = node.regulation_version() {
            field(&mut out, "Version", version);
        }
        if let Some(date) = node.effective_date() {
            let shown = date.as_str().map_or_else(|| date.to_string(), str::to_string);
            field(&mut out, "Effective", &shown);
        }
    }
    out
}

/// Render the catalog, optionally restricted to one regulation.
pub fn render_catalog(catalog: &RegulationCatalog, only: Option<Regulation>) -> String {
    let mut out = String::new();
    for entry in catalog.regulations() {
        if only.is_some_and(|r| r != entry.regulation) {
            continue;
        }
        let _ = writeln!(out, "=== {} ===", entry.regulation);
        field(&mut out, "Version", &entry.version);
        if let Some(date) = entry.effective_date {
            field(&mut out, "Effective", &date.to_string());
        }
        field(&mut out, "Articles", &entry.article_count().to_string());
        for article in entry.articles() {
            let _ = writeln!(out, "  {:<20} {}", article.reference, article.title);
        }
        let _ = writeln!(out);
    }
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {value}");
}
