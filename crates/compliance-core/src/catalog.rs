//! Regulation catalog: the reference table of valid (regulation, article) pairs.
//!
//! A catalog is immutable once built. [`CatalogHandle`] shares the current
//! catalog between requests and replaces it with an atomic swap, so every
//! request works against one consistent snapshot even while a reload runs.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::article::{article_sort_key, normalize_article, parent_reference};
use crate::error::CatalogError;
use crate::node::Regulation;

/// A single citable provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleEntry {
    /// Display form, e.g. `"Art. 33"` or `"21 CFR 11.10"`.
    pub reference: String,
    pub title: String,
}

/// One regulation with its versioning metadata and known articles.
#[derive(Debug, Clone)]
pub struct RegulationEntry {
    pub regulation: Regulation,
    pub version: String,
    pub effective_date: Option<NaiveDate>,
    /// canonical reference → entry
    articles: BTreeMap<String, ArticleEntry>,
}

impl RegulationEntry {
    /// Articles in document order (numeric-aware).
    pub fn articles(&self) -> Vec<&ArticleEntry> {
        let mut entries: Vec<(&String, &ArticleEntry)> = self.articles.iter().collect();
        entries.sort_by_cached_key(|(key, _)| article_sort_key(key));
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    /// Resolve a reference, walking up to the parent article for
    /// sub-paragraph citations such as `Art. 6(1)(a)`.
    pub fn resolve(&self, reference: &str) -> Option<&ArticleEntry> {
        let canonical = normalize_article(reference);
        let mut key = canonical.as_str();
        loop {
            if let Some(entry) = self.articles.get(key) {
                return Some(entry);
            }
            key = parent_reference(key)?;
        }
    }
}

/// Static reference data for every named regulation.
#[derive(Debug, Clone, Default)]
pub struct RegulationCatalog {
    regulations: BTreeMap<Regulation, RegulationEntry>,
}

impl RegulationCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (regulation, version, effective, articles) in BUILTIN {
            let entry = RegulationEntry {
                regulation: *regulation,
                version: version.to_string(),
                effective_date: NaiveDate::parse_from_str(effective, "%Y-%m-%d").ok(),
                articles: articles
                    .iter()
                    .map(|(reference, title)| {
                        (
                            normalize_article(reference),
                            ArticleEntry {
                                reference: reference.to_string(),
                                title: title.to_string(),
                            },
                        )
                    })
                    .collect(),
            };
            catalog.regulations.insert(*regulation, entry);
        }
        catalog
    }

    /// Parse a catalog from its JSON representation.
    ///
    /// ```json
    /// {"regulations": [{"regulation": "GDPR", "version": "2016/679",
    ///   "effective_date": "2018-05-25",
    ///   "articles": [{"reference": "Art. 33", "title": "Breach notification"}]}]}
    /// ```
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::default();

        for reg in file.regulations {
            let regulation = Regulation::from_label(&reg.regulation);
            if regulation.is_other() {
                return Err(CatalogError::InvalidEntry(format!(
                    "regulation {:?} is not a named regulation",
                    reg.regulation
                )));
            }
            if catalog.regulations.contains_key(&regulation) {
                return Err(CatalogError::InvalidEntry(format!(
                    "regulation {regulation} listed twice"
                )));
            }

            let effective_date = match reg.effective_date.as_deref() {
                None => None,
                Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                    CatalogError::InvalidEntry(format!("{regulation} effective_date {s:?}: {e}"))
                })?),
            };

            let mut articles = BTreeMap::new();
            for article in reg.articles {
                let key = normalize_article(&article.reference);
                if key.is_empty() {
                    return Err(CatalogError::InvalidEntry(format!(
                        "{regulation} article reference {:?} is empty",
                        article.reference
                    )));
                }
                articles.insert(key, article);
            }

            catalog.regulations.insert(
                regulation,
                RegulationEntry {
                    regulation,
                    version: reg.version,
                    effective_date,
                    articles,
                },
            );
        }

        Ok(catalog)
    }

    /// Load a catalog JSON file from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            regulations = catalog.regulations.len(),
            articles = catalog.article_count(),
            "loaded regulation catalog"
        );
        Ok(catalog)
    }

    pub fn regulation(&self, regulation: Regulation) -> Option<&RegulationEntry> {
        self.regulations.get(&regulation)
    }

    pub fn regulations(&self) -> impl Iterator<Item = &RegulationEntry> {
        self.regulations.values()
    }

    /// Look up an article for a named regulation. Always `None` for `Other`.
    pub fn resolve(&self, regulation: Regulation, article: &str) -> Option<&ArticleEntry> {
        self.regulations.get(&regulation)?.resolve(article)
    }

    pub fn contains(&self, regulation: Regulation, article: &str) -> bool {
        self.resolve(regulation, article).is_some()
    }

    pub fn article_count(&self) -> usize {
        self.regulations.values().map(|r| r.article_count()).sum()
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    regulations: Vec<RegulationFile>,
}

#[derive(Deserialize)]
struct RegulationFile {
    regulation: String,
    version: String,
    #[serde(default)]
    effective_date: Option<String>,
    articles: Vec<ArticleEntry>,
}

/// Shared, hot-swappable access to the current catalog.
///
/// Readers clone an `Arc` under a short read lock and keep working against
/// that snapshot; writers replace the whole catalog in one step.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Option<Arc<RegulationCatalog>>>>,
}

impl CatalogHandle {
    pub fn new(catalog: RegulationCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(Arc::new(catalog)))),
        }
    }

    /// A handle with no catalog yet; readers get [`CatalogError::Unavailable`].
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The catalog as of now. Later swaps do not affect the returned snapshot.
    pub fn snapshot(&self) -> Result<Arc<RegulationCatalog>, CatalogError> {
        self.current.read().clone().ok_or(CatalogError::Unavailable)
    }

    /// Install a new catalog, returning the one it replaced.
    pub fn swap(&self, catalog: RegulationCatalog) -> Option<Arc<RegulationCatalog>> {
        self.current.write().replace(Arc::new(catalog))
    }

    /// Reload from a JSON file. On failure the current snapshot stays in place.
    pub fn reload_from(&self, path: &Path) -> Result<(), CatalogError> {
        match RegulationCatalog::load(path) {
            Ok(catalog) => {
                self.swap(catalog);
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "catalog reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

// ── Built-in reference data ──

type BuiltinRegulation = (Regulation, &'static str, &'static str, &'static [(&'static str, &'static str)]);

const BUILTIN: &[BuiltinRegulation] = &[
    (
        Regulation::Gdpr,
        "Regulation (EU) 2016/679",
        "2018-05-25",
        &[
            ("Art. 5", "Principles relating to processing of personal data"),
            ("Art. 6", "Lawfulness of processing"),
            ("Art. 7", "Conditions for consent"),
            ("Art. 8", "Conditions applicable to child's consent"),
            ("Art. 9", "Processing of special categories of personal data"),
            ("Art. 12", "Transparent information and communication"),
            ("Art. 13", "Information to be provided where personal data are collected"),
            ("Art. 15", "Right of access by the data subject"),
            ("Art. 16", "Right to rectification"),
            ("Art. 17", "Right to erasure ('right to be forgotten')"),
            ("Art. 20", "Right to data portability"),
            ("Art. 21", "Right to object"),
            ("Art. 22", "Automated individual decision-making, including profiling"),
            ("Art. 25", "Data protection by design and by default"),
            ("Art. 28", "Processor"),
            ("Art. 30", "Records of processing activities"),
            ("Art. 32", "Security of processing"),
            ("Art. 33", "Notification of a personal data breach to the supervisory authority"),
            ("Art. 34", "Communication of a personal data breach to the data subject"),
            ("Art. 35", "Data protection impact assessment"),
            ("Art. 37", "Designation of the data protection officer"),
            ("Art. 44", "General principle for transfers"),
            ("Art. 46", "Transfers subject to appropriate safeguards"),
            ("Art. 83", "General conditions for imposing administrative fines"),
        ],
    ),
    (
        Regulation::Ccpa,
        "Cal. Civ. Code §1798.100 et seq. (as amended by CPRA)",
        "2023-01-01",
        &[
            ("§ 1798.100", "General duties of businesses that collect personal information"),
            ("§ 1798.105", "Consumers' right to delete personal information"),
            ("§ 1798.106", "Consumers' right to correct inaccurate personal information"),
            ("§ 1798.110", "Consumers' right to know what personal information is being collected"),
            ("§ 1798.115", "Consumers' right to know what personal information is sold or shared"),
            ("§ 1798.120", "Consumers' right to opt out of sale or sharing of personal information"),
            ("§ 1798.121", "Consumers' right to limit use of sensitive personal information"),
            ("§ 1798.125", "Consumers' right of no retaliation"),
            ("§ 1798.130", "Notice, disclosure, correction, and deletion requirements"),
            ("§ 1798.135", "Methods of limiting sale, sharing, and use of personal information"),
            ("§ 1798.140", "Definitions"),
            ("§ 1798.150", "Personal information security breaches"),
            ("§ 1798.155", "Administrative enforcement"),
            ("§ 1798.185", "Regulations"),
            ("§ 1798.199.10", "California Privacy Protection Agency"),
        ],
    ),
    (
        Regulation::Fda,
        "21 CFR (revised as of April 1, 2024)",
        "2024-04-01",
        &[
            ("21 CFR 11.10", "Controls for closed systems"),
            ("21 CFR 11.30", "Controls for open systems"),
            ("21 CFR 11.50", "Signature manifestations"),
            ("21 CFR 11.70", "Signature/record linking"),
            ("21 CFR 11.100", "General requirements for electronic signatures"),
            ("21 CFR 11.300", "Controls for identification codes/passwords"),
            ("21 CFR 50.20", "General requirements for informed consent"),
            ("21 CFR 50.25", "Elements of informed consent"),
            ("21 CFR 56.103", "Circumstances in which IRB review is required"),
            ("21 CFR 101.9", "Nutrition labeling of food"),
            ("21 CFR 312.32", "IND safety reporting"),
            ("21 CFR 314.80", "Postmarketing reporting of adverse drug experiences"),
            ("21 CFR 803.50", "Individual adverse event reports; manufacturers"),
            ("21 CFR 806.10", "Reports of corrections and removals"),
            ("21 CFR 820.30", "Design controls"),
            ("21 CFR 820.100", "Corrective and preventive action"),
            ("21 CFR 820.198", "Complaint files"),
        ],
    ),
    (
        Regulation::Irs,
        "Internal Revenue Code of 1986, as amended (Title 26)",
        "1986-10-22",
        &[
            ("IRC § 61", "Gross income defined"),
            ("IRC § 162", "Trade or business expenses"),
            ("IRC § 274", "Disallowance of certain entertainment, etc., expenses"),
            ("IRC § 409A", "Inclusion in gross income of deferred compensation"),
            ("IRC § 1441", "Withholding of tax on nonresident aliens"),
            ("IRC § 3402", "Income tax collected at source"),
            ("IRC § 6001", "Notice or regulations requiring records, statements, and special returns"),
            ("IRC § 6038D", "Information with respect to foreign financial assets"),
            ("IRC § 6050W", "Returns relating to payments made in settlement of payment card transactions"),
            ("IRC § 6662", "Imposition of accuracy-related penalty on underpayments"),
            ("IRC § 6721", "Failure to file correct information returns"),
            ("IRC § 7201", "Attempt to evade or defeat tax"),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMALL: &str = r#"{
        "regulations": [
            {
                "regulation": "GDPR",
                "version": "2016/679",
                "effective_date": "2018-05-25",
                "articles": [
                    {"reference": "Art. 33", "title": "Breach notification"},
                    {"reference": "Art. 6", "title": "Lawfulness"}
                ]
            }
        ]
    }"#;

    #[test]
    fn builtin_covers_every_named_regulation() {
        let catalog = RegulationCatalog::builtin();
        for regulation in Regulation::NAMED {
            let entry = catalog.regulation(regulation).expect("missing regulation");
            assert!(entry.article_count() > 5, "{regulation} is too sparse");
            assert!(entry.effective_date.is_some(), "{regulation} has no date");
        }
        assert!(catalog.regulation(Regulation::Other).is_none());
    }

    #[test]
    fn resolve_accepts_citation_variants() {
        let catalog = RegulationCatalog::builtin();
        assert!(catalog.contains(Regulation::Gdpr, "Article 33"));
        assert!(catalog.contains(Regulation::Gdpr, "art. 6(1)(a)"));
        assert!(catalog.contains(Regulation::Ccpa, "Cal. Civ. Code 1798.150"));
        assert!(catalog.contains(Regulation::Fda, "21 C.F.R. § 11.10(e)"));
        assert!(catalog.contains(Regulation::Irs, "26 U.S.C. 162"));
        assert!(catalog.contains(Regulation::Irs, "Section 409A"));
    }

    #[test]
    fn resolve_accepts_regulation_named_citations() {
        let catalog = RegulationCatalog::builtin();
        assert!(catalog.contains(Regulation::Gdpr, "GDPR Article 33"));
        assert!(catalog.contains(Regulation::Gdpr, "GDPR Art. 33"));
        assert!(catalog.contains(Regulation::Gdpr, "Article 33 of the GDPR"));
        assert!(catalog.contains(Regulation::Ccpa, "CCPA § 1798.150"));
        assert!(catalog.contains(Regulation::Fda, "FDA 21 CFR 803.50"));
        assert!(catalog.contains(Regulation::Irs, "IRS § 6001"));
        // The name does not override the regulation being checked.
        assert!(!catalog.contains(Regulation::Ccpa, "GDPR Art. 33"));
    }

    #[test]
    fn resolve_rejects_unknown_and_cross_regulation() {
        let catalog = RegulationCatalog::builtin();
        assert!(!catalog.contains(Regulation::Ccpa, "Unknown-99"));
        assert!(!catalog.contains(Regulation::Gdpr, "Art. 999"));
        // Article 33 is GDPR, not CCPA.
        assert!(!catalog.contains(Regulation::Ccpa, "Art. 33"));
        assert!(!catalog.contains(Regulation::Other, "Art. 33"));
    }

    #[test]
    fn articles_listed_in_document_order() {
        let catalog = RegulationCatalog::builtin();
        let gdpr = catalog.regulation(Regulation::Gdpr).unwrap();
        let refs: Vec<&str> = gdpr.articles().iter().map(|a| a.reference.as_str()).collect();
        assert_eq!(refs[0], "Art. 5");
        assert_eq!(refs[1], "Art. 6");
        assert_eq!(refs.last().copied(), Some("Art. 83"));

        let fda = catalog.regulation(Regulation::Fda).unwrap();
        let refs: Vec<&str> = fda.articles().iter().map(|a| a.reference.as_str()).collect();
        let pos_10 = refs.iter().position(|r| *r == "21 CFR 11.10").unwrap();
        let pos_100 = refs.iter().position(|r| *r == "21 CFR 11.100").unwrap();
        assert!(pos_10 < pos_100);
    }

    #[test]
    fn from_json_parses_metadata() {
        let catalog = RegulationCatalog::from_json(SMALL).unwrap();
        let gdpr = catalog.regulation(Regulation::Gdpr).unwrap();
        assert_eq!(gdpr.version, "2016/679");
        assert_eq!(gdpr.effective_date, NaiveDate::from_ymd_opt(2018, 5, 25));
        assert_eq!(catalog.article_count(), 2);
        assert!(catalog.contains(Regulation::Gdpr, "Article 33"));
        assert!(!catalog.contains(Regulation::Gdpr, "Art. 17"));
    }

    #[test]
    fn from_json_rejects_other_and_duplicates() {
        let other = r#"{"regulations": [{"regulation": "HIPAA", "version": "x", "articles": []}]}"#;
        assert!(matches!(
            RegulationCatalog::from_json(other),
            Err(CatalogError::InvalidEntry(_))
        ));

        let dup = r#"{"regulations": [
            {"regulation": "IRS", "version": "a", "articles": []},
            {"regulation": "irs", "version": "b", "articles": []}
        ]}"#;
        assert!(matches!(
            RegulationCatalog::from_json(dup),
            Err(CatalogError::InvalidEntry(_))
        ));
    }

    #[test]
    fn from_json_rejects_bad_dates_and_empty_references() {
        let bad_date = r#"{"regulations": [{"regulation": "FDA", "version": "x",
            "effective_date": "April 2024", "articles": []}]}"#;
        assert!(RegulationCatalog::from_json(bad_date).is_err());

        let empty_ref = r#"{"regulations": [{"regulation": "FDA", "version": "x",
            "articles": [{"reference": "21 CFR", "title": "nothing"}]}]}"#;
        assert!(RegulationCatalog::from_json(empty_ref).is_err());
    }

    #[test]
    fn from_json_malformed_is_json_error() {
        assert!(matches!(
            RegulationCatalog::from_json("{not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = RegulationCatalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn unloaded_handle_is_unavailable() {
        let handle = CatalogHandle::unloaded();
        assert!(!handle.is_loaded());
        assert!(matches!(handle.snapshot(), Err(CatalogError::Unavailable)));
    }

    #[test]
    fn swap_does_not_disturb_existing_snapshots() {
        let handle = CatalogHandle::new(RegulationCatalog::builtin());
        let before = handle.snapshot().unwrap();

        let previous = handle.swap(RegulationCatalog::from_json(SMALL).unwrap());
        assert!(previous.is_some());

        let after = handle.snapshot().unwrap();
        assert!(before.contains(Regulation::Irs, "IRC 162"));
        assert!(!after.contains(Regulation::Irs, "IRC 162"));
    }

    #[test]
    fn reload_failure_keeps_previous_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ broken").unwrap();

        let handle = CatalogHandle::new(RegulationCatalog::builtin());
        assert!(handle.reload_from(file.path()).is_err());
        assert!(handle.snapshot().unwrap().contains(Regulation::Fda, "21 CFR 11.10"));
    }

    #[test]
    fn reload_success_swaps_in_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();

        let handle = CatalogHandle::unloaded();
        handle.reload_from(file.path()).unwrap();
        let snapshot = handle.snapshot().unwrap();
        assert_eq!(snapshot.article_count(), 2);
    }
}
