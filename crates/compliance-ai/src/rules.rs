//! Offline fact extractor driven by a keyword lexicon.
//!
//! The query is split into statements. A statement produces one node per
//! rule it triggers, provided the query as a whole also mentions one of the
//! rule's context terms (so "sold" only engages the CCPA when California is
//! in play). Terms match at a word start; terms of four characters or fewer
//! must match a whole word.

use async_trait::async_trait;
use compliance_core::{ReasoningNode, Regulation};
use tracing::debug;

use crate::error::ExtractionError;
use crate::extractor::{FactExtractor, split_sentences};

/// One lexicon entry: triggers in a statement map it onto a provision.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub regulation: Regulation,
    pub article: &'static str,
    /// Lower-case terms, at least one of which must occur in the statement.
    pub triggers: &'static [&'static str],
    /// Lower-case terms, at least one of which must occur somewhere in the
    /// query. Empty means no requirement.
    pub context: &'static [&'static str],
    pub legal_meaning: &'static str,
    pub basis: &'static str,
}

const DATA_CONTEXT: &[&str] = &[
    "data",
    "record",
    "email",
    "laptop",
    "database",
    "file",
    "server",
    "personal information",
    "backup",
    "account",
];
const CALIFORNIA: &[&str] = &["california", "ccpa", "cpra"];
const DEVICE: &[&str] = &[
    "device",
    "implant",
    "pacemaker",
    "pump",
    "monitor",
    "catheter",
    "stent",
];
const DRUG: &[&str] = &["drug", "medication", "pill", "dose", "dosage", "pharma"];
const TRIAL: &[&str] = &["trial", "study", "investigational", "participant"];
const TAX: &[&str] = &["deduct", "expense", "tax", "write off", "write-off", "return"];

/// Built-in lexicon. Every GDPR, CCPA, FDA and IRS article here is in the
/// built-in catalog.
pub const LEXICON: &[Rule] = &[
    // ── GDPR ──
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 33",
        triggers: &[
            "data breach",
            "breach",
            "lost",
            "leaked",
            "leak",
            "exposed",
            "stolen",
            "hacked",
            "unauthorized access",
            "unauthorised access",
            "ransomware",
            "supervisory authority",
        ],
        context: DATA_CONTEXT,
        legal_meaning: "Personal data breach",
        basis: "a breach must be reported to the supervisory authority within 72 hours",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 34",
        triggers: &[
            "did not notify",
            "didn't notify",
            "failed to notify",
            "without notifying",
            "never notified",
            "not informed",
            "notify affected",
            "notify customers",
            "notify users",
        ],
        context: DATA_CONTEXT,
        legal_meaning: "Communication of a breach to data subjects",
        basis: "high-risk breaches must be communicated to the affected individuals",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 9",
        triggers: &[
            "health data",
            "patient",
            "medical record",
            "medical history",
            "diagnos",
            "biometric",
            "fingerprint",
            "genetic",
            "ethnic origin",
            "religious",
            "sexual orientation",
            "trade union",
        ],
        context: &[],
        legal_meaning: "Special category personal data",
        basis: "health, biometric and similar data may only be processed under an Article 9(2) exception",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 7",
        triggers: &[
            "consent",
            "opted in",
            "opt-in",
            "pre-ticked",
            "pre-checked",
            "without permission",
            "without asking",
        ],
        context: &["data", "email", "marketing", "tracking", "cookie", "personal", "newsletter"],
        legal_meaning: "Conditions for valid consent",
        basis: "consent must be freely given, specific, informed and demonstrable",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 6",
        triggers: &[
            "no legal basis",
            "without a legal basis",
            "lawful basis",
            "legitimate interest",
            "tracking",
            "tracked",
            "cookies",
            "repurpose",
        ],
        context: &[],
        legal_meaning: "Lawfulness of processing",
        basis: "processing personal data needs one of the six lawful bases",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 8",
        triggers: &["children", "child", "minors", "under 16", "under 13", "kids", "teenagers"],
        context: &["data", "app", "account", "sign up", "signup", "online", "personal", "profile"],
        legal_meaning: "Processing of a child's personal data",
        basis: "online services offered to children need parental consent below the age threshold",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 15",
        triggers: &[
            "access request",
            "subject access",
            "dsar",
            "copy of their data",
            "copy of my data",
            "copy of his data",
            "copy of her data",
        ],
        context: &[],
        legal_meaning: "Data subject right of access",
        basis: "data subjects may obtain a copy of their personal data within one month",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 17",
        triggers: &[
            "erase",
            "erasure",
            "right to be forgotten",
            "delete their data",
            "delete my data",
            "deletion request",
            "refused to delete",
        ],
        context: &[],
        legal_meaning: "Right to erasure",
        basis: "personal data must be erased without undue delay when a ground in Article 17(1) applies",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 44",
        triggers: &[
            "transfer",
            "outside the eu",
            "third country",
            "servers in",
            "hosted in",
            "overseas",
            "offshore",
        ],
        context: &["personal data", "customer data", "user data", "eu", "europe", "european"],
        legal_meaning: "International transfer of personal data",
        basis: "transfers outside the EEA need an adequacy decision or appropriate safeguards",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 32",
        triggers: &[
            "unencrypted",
            "not encrypted",
            "without encryption",
            "plaintext password",
            "plain text password",
            "plain-text password",
            "weak password",
            "no access control",
            "unpatched",
            "misconfigured",
            "publicly accessible",
        ],
        context: &[],
        legal_meaning: "Security of processing",
        basis: "controllers must apply appropriate technical and organisational security measures",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 28",
        triggers: &[
            "processor",
            "vendor",
            "third-party",
            "third party",
            "subcontractor",
            "outsourc",
            "contractor",
        ],
        context: &["personal data", "customer data", "user data", "personal information"],
        legal_meaning: "Use of a data processor",
        basis: "processors must be bound by a written contract with the Article 28(3) terms",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 35",
        triggers: &[
            "profiling",
            "large-scale monitoring",
            "systematic monitoring",
            "dpia",
            "impact assessment",
            "facial recognition",
        ],
        context: &[],
        legal_meaning: "High-risk processing",
        basis: "likely high-risk processing requires a data protection impact assessment",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 22",
        triggers: &[
            "automated decision",
            "automatically reject",
            "automatically denied",
            "algorithm decides",
            "credit scoring",
        ],
        context: &[],
        legal_meaning: "Solely automated decision-making",
        basis: "individuals may not be subject to solely automated decisions with legal effects",
    },
    Rule {
        regulation: Regulation::Gdpr,
        article: "Art. 37",
        triggers: &["data protection officer", "dpo"],
        context: &[],
        legal_meaning: "Designation of a data protection officer",
        basis: "core activities involving large-scale monitoring or special data require a DPO",
    },
    // ── CCPA ──
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.120",
        triggers: &[
            "sell",
            "sold",
            "sale of",
            "share with advertisers",
            "shared with advertisers",
            "data broker",
        ],
        context: CALIFORNIA,
        legal_meaning: "Sale or sharing of personal information",
        basis: "consumers have the right to opt out of the sale or sharing of their personal information",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.135",
        triggers: &["do not sell", "opt-out", "opt out"],
        context: CALIFORNIA,
        legal_meaning: "Opt-out mechanism",
        basis: "businesses that sell or share data must offer a conspicuous opt-out link",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.105",
        triggers: &["delete", "deletion", "erase"],
        context: CALIFORNIA,
        legal_meaning: "Consumer right to delete",
        basis: "verified deletion requests must be honoured and passed on to service providers",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.150",
        triggers: &[
            "breach",
            "leaked",
            "stolen",
            "hacked",
            "exposed",
            "unauthorized access",
        ],
        context: CALIFORNIA,
        legal_meaning: "Data breach private right of action",
        basis: "consumers may sue when unencrypted personal information is exposed through a security failure",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.100",
        triggers: &["collect", "privacy notice", "privacy policy", "notice at collection"],
        context: CALIFORNIA,
        legal_meaning: "Notice at collection",
        basis: "consumers must be told what categories of personal information are collected and why",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.110",
        triggers: &["right to know", "what data we have", "what we collected"],
        context: CALIFORNIA,
        legal_meaning: "Consumer right to know",
        basis: "consumers may request the specific pieces of personal information collected about them",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.121",
        triggers: &[
            "sensitive personal information",
            "precise geolocation",
            "social security number",
            "ssn",
        ],
        context: CALIFORNIA,
        legal_meaning: "Sensitive personal information",
        basis: "consumers may limit the use of their sensitive personal information",
    },
    Rule {
        regulation: Regulation::Ccpa,
        article: "§ 1798.125",
        triggers: &["charge more", "higher price", "discriminat", "deny service", "retaliat"],
        context: CALIFORNIA,
        legal_meaning: "Non-discrimination",
        basis: "businesses may not penalise consumers for exercising their privacy rights",
    },
    // ── FDA ──
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 803.50",
        triggers: &[
            "adverse event",
            "serious injury",
            "death",
            "died",
            "malfunction",
            "device failure",
        ],
        context: DEVICE,
        legal_meaning: "Medical device adverse event",
        basis: "manufacturers must file an MDR within 30 days of learning of a reportable event",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 314.80",
        triggers: &["adverse drug", "side effect", "adverse reaction", "adverse experience"],
        context: DRUG,
        legal_meaning: "Postmarketing adverse drug experience",
        basis: "serious and unexpected adverse drug experiences need a 15-day alert report",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 312.32",
        triggers: &["serious adverse", "unexpected adverse", "suspected adverse", "safety report"],
        context: TRIAL,
        legal_meaning: "IND safety reporting",
        basis: "sponsors must report serious unexpected suspected adverse reactions within 15 days",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 50.25",
        triggers: &["informed consent", "consent form"],
        context: TRIAL,
        legal_meaning: "Informed consent of research subjects",
        basis: "consent documents must contain the basic elements listed in 50.25(a)",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 11.10",
        triggers: &[
            "electronic record",
            "audit trail",
            "e-record",
            "backdat",
            "overwrote the record",
            "edited the record",
            "validated system",
        ],
        context: &[],
        legal_meaning: "Controls for closed electronic record systems",
        basis: "electronic records need validation, secure audit trails and access controls",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 11.100",
        triggers: &[
            "electronic signature",
            "e-signature",
            "shared login",
            "shared password",
            "signed on behalf",
        ],
        context: &[],
        legal_meaning: "Electronic signatures",
        basis: "each electronic signature must be unique to one individual",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 820.198",
        triggers: &["complaint"],
        context: DEVICE,
        legal_meaning: "Device complaint handling",
        basis: "complaints must be received, reviewed and evaluated under documented procedures",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 806.10",
        triggers: &["recall", "field correction", "removal"],
        context: &["device", "product", "batch", "lot", "implant", "pump"],
        legal_meaning: "Report of corrections and removals",
        basis: "corrections or removals to reduce a health risk must be reported within 10 working days",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 101.9",
        triggers: &["nutrition label", "nutrition facts", "calorie", "mislabel", "serving size"],
        context: &["food", "snack", "beverage", "drink", "label", "product"],
        legal_meaning: "Nutrition labelling of food",
        basis: "nutrition facts must be declared accurately in the prescribed format",
    },
    Rule {
        regulation: Regulation::Fda,
        article: "21 CFR 820.30",
        triggers: &["design change", "design control", "design validation", "design verification"],
        context: DEVICE,
        legal_meaning: "Design controls",
        basis: "device design changes must be verified, validated and documented before release",
    },
    // ── IRS ──
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 6001",
        triggers: &[
            "receipts",
            "bookkeeping",
            "books and records",
            "shredded",
            "destroyed records",
            "missing invoices",
            "no records",
        ],
        context: &[],
        legal_meaning: "Tax record keeping",
        basis: "taxpayers must keep records sufficient to establish income and deductions",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 162",
        triggers: &["business expense", "deduct", "write off", "write-off", "wrote off"],
        context: &[],
        legal_meaning: "Trade or business expense deduction",
        basis: "only ordinary and necessary business expenses are deductible",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 274",
        triggers: &["entertainment", "meals", "gifts", "client dinner", "golf", "travel"],
        context: TAX,
        legal_meaning: "Entertainment, meal and gift expenses",
        basis: "entertainment is not deductible and meals are limited with substantiation rules",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 6662",
        triggers: &[
            "underreport",
            "under-report",
            "understat",
            "omitted income",
            "unreported income",
            "did not report",
            "cash sales",
        ],
        context: &[],
        legal_meaning: "Substantial understatement of income tax",
        basis: "a 20% accuracy-related penalty applies to substantial understatements",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 7201",
        triggers: &[
            "evade",
            "evasion",
            "hide income",
            "hid income",
            "hidden income",
            "off the books",
            "under the table",
        ],
        context: &[],
        legal_meaning: "Attempt to evade tax",
        basis: "wilful attempts to evade tax are a felony",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 1441",
        triggers: &[
            "foreign contractor",
            "nonresident",
            "non-resident",
            "foreign vendor",
            "foreign payee",
        ],
        context: &["pay", "withh", "invoice", "royalt", "fee"],
        legal_meaning: "Withholding on payments to nonresident aliens",
        basis: "US-source payments to foreign persons are subject to 30% withholding unless reduced",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 6038D",
        triggers: &[
            "foreign account",
            "offshore account",
            "foreign bank",
            "overseas account",
            "swiss account",
            "foreign financial asset",
        ],
        context: &[],
        legal_meaning: "Foreign financial asset reporting",
        basis: "specified foreign financial assets above the threshold must be reported on Form 8938",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 3402",
        triggers: &["payroll", "wages", "salary", "salaries"],
        context: &["withh", "tax", "cash", "off the books", "under the table"],
        legal_meaning: "Income tax withholding on wages",
        basis: "employers must withhold income tax from wages paid",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 409A",
        triggers: &["deferred compensation", "deferred bonus", "nonqualified deferred"],
        context: &[],
        legal_meaning: "Nonqualified deferred compensation",
        basis: "deferral elections and payout timing must follow Section 409A or face immediate tax",
    },
    Rule {
        regulation: Regulation::Irs,
        article: "IRC § 6721",
        triggers: &["1099", "information return", "w-2", "failed to file"],
        context: &[],
        legal_meaning: "Failure to file correct information returns",
        basis: "late or incorrect information returns carry per-return penalties",
    },
    // ── Outside the catalog ──
    Rule {
        regulation: Regulation::Other,
        article: "HIPAA 45 CFR 164.502",
        triggers: &["hipaa", "protected health information", "phi", "ephi"],
        context: &[],
        legal_meaning: "Use or disclosure of protected health information",
        basis: "covered entities may only use or disclose PHI as the Privacy Rule permits",
    },
    Rule {
        regulation: Regulation::Other,
        article: "SOX § 404",
        triggers: &[
            "sox",
            "sarbanes",
            "internal control over financial reporting",
            "icfr",
        ],
        context: &[],
        legal_meaning: "Internal control over financial reporting",
        basis: "public companies must assess and report on internal controls",
    },
    Rule {
        regulation: Regulation::Other,
        article: "PCI DSS Req. 3",
        triggers: &[
            "pci",
            "cardholder data",
            "credit card numbers",
            "card numbers",
            "cvv",
        ],
        context: &[],
        legal_meaning: "Protection of stored cardholder data",
        basis: "stored account data must be minimised and rendered unreadable",
    },
    Rule {
        regulation: Regulation::Other,
        article: "BSA 31 U.S.C. 5324",
        triggers: &["money laundering", "structuring", "bank secrecy", "just under $10,000"],
        context: &[],
        legal_meaning: "Anti-money-laundering reporting",
        basis: "structuring transactions to avoid currency reports is prohibited",
    },
];

fn version_for(regulation: Regulation) -> Option<&'static str> {
    match regulation {
        Regulation::Gdpr => Some("Regulation (EU) 2016/679"),
        Regulation::Ccpa => Some("CCPA as amended by CPRA"),
        Regulation::Fda => Some("21 CFR"),
        Regulation::Irs => Some("Internal Revenue Code of 1986"),
        Regulation::Other => None,
    }
}

/// Does `haystack` contain `term` starting at a word boundary?
fn mentions(haystack: &str, term: &str) -> bool {
    let whole_word = term.chars().count() <= 4;
    haystack.match_indices(term).any(|(i, _)| {
        let starts_word = haystack[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let ends_word = !whole_word
            || haystack[i + term.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric());
        starts_word && ends_word
    })
}

/// Deterministic keyword extractor. Needs no network and never fails.
pub struct RuleExtractor {
    rules: Vec<Rule>,
}

impl Default for RuleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleExtractor {
    pub fn new() -> Self {
        Self::with_rules(LEXICON.to_vec())
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Synchronous core of [`FactExtractor::extract`].
    pub fn extract_nodes(&self, query: &str) -> Vec<ReasoningNode> {
        let lowered_query = query.to_lowercase();
        let active: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.context.is_empty() || r.context.iter().any(|t| mentions(&lowered_query, t)))
            .collect();

        let mut nodes = Vec::new();
        for sentence in split_sentences(query) {
            let lowered = sentence.to_lowercase();
            for rule in &active {
                let Some(trigger) = rule.triggers.iter().find(|t| mentions(&lowered, t)) else {
                    continue;
                };
                let justification = format!(
                    "The statement mentions \"{trigger}\", which engages {} {}: {}.",
                    rule.regulation, rule.article, rule.basis
                );
                // Every field is non-blank, so construction cannot fail.
                let Ok(node) = ReasoningNode::new(
                    sentence,
                    rule.legal_meaning,
                    rule.regulation,
                    rule.article,
                    justification,
                ) else {
                    continue;
                };
                let node = match version_for(rule.regulation) {
                    Some(v) => node.with_regulation_version(v),
                    None => node,
                };
                nodes.push(node);
            }
        }
        debug!(nodes = nodes.len(), "rule extraction complete");
        nodes
    }
}

#[async_trait]
impl FactExtractor for RuleExtractor {
    fn name(&self) -> &str {
        "rules"
    }

    async fn extract(&self, query: &str) -> Result<Vec<ReasoningNode>, ExtractionError> {
        Ok(self.extract_nodes(query))
    }
}
