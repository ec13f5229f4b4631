//! Article reference normalisation.
//!
//! Extractors cite the same provision in many spellings: "Art. 33",
//! "Article 33 GDPR", "21 C.F.R. § 11.10", "Cal. Civ. Code §1798.150",
//! "26 U.S.C. 162". The catalog compares references in a canonical form:
//!
//! - leading regulation names and citation prefixes (`GDPR`, `Art.`,
//!   `Section`, `§`, `21 CFR`, `IRC`, ...) stripped
//! - trailing regulation names (`GDPR`, `of the CCPA`) stripped
//! - whitespace removed, letters upper-cased
//!
//! So `"Art. 6 (1)(a)"` becomes `"6(1)(A)"` and `"21 CFR Part 11"` becomes `"11"`.

/// Citation prefixes, longest first so `ARTICLE` wins over `ART`.
const PREFIXES: &[&str] = &[
    "GDPR",
    "CCPA",
    "CPRA",
    "FDA",
    "IRS",
    "CAL. CIV. CODE",
    "CAL CIV CODE",
    "CIVIL CODE",
    "26 U.S.C.",
    "26 USC",
    "21 C.F.R.",
    "21 CFR",
    "C.F.R.",
    "CFR",
    "U.S.C.",
    "USC",
    "I.R.C.",
    "IRC",
    "ARTICLES",
    "ARTICLE",
    "ART.",
    "ART",
    "SECTIONS",
    "SECTION",
    "SEC.",
    "SEC",
    "PART",
    "§§",
    "§",
];

const SUFFIXES: &[&str] = &["GDPR", "CCPA", "CPRA", "FDA", "IRS", "IRC"];

/// Connectives left behind by "Article 33 of the GDPR", innermost last.
const CONNECTIVES: &[&str] = &["THE", "OF"];

/// Normalise an article reference into its canonical catalog key.
pub fn normalize_article(s: &str) -> String {
    let upper = s.trim().to_uppercase();
    let mut rest = upper.as_str();

    'strip: loop {
        for prefix in PREFIXES {
            if let Some(r) = rest.strip_prefix(prefix) {
                // "ART" must not eat the front of an unrelated word.
                let ends_in_letter = prefix.ends_with(|c: char| c.is_ascii_alphabetic());
                if !ends_in_letter || !r.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    rest = r.trim_start();
                    continue 'strip;
                }
            }
        }
        break;
    }

    let mut rest = rest.trim_end();
    let mut named = false;
    for suffix in SUFFIXES {
        if let Some(r) = strip_word_suffix(rest, suffix) {
            rest = r;
            named = true;
        }
    }
    if named {
        for connective in CONNECTIVES {
            if let Some(r) = strip_word_suffix(rest, connective) {
                rest = r;
            }
        }
    }

    let mut out: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    while out.ends_with(['.', ',', ';']) {
        out.pop();
    }
    out
}

fn strip_word_suffix<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    let r = s.strip_suffix(word)?;
    r.ends_with(char::is_whitespace).then(|| r.trim_end())
}

/// Strip the last parenthesised sub-reference: `"6(1)(A)"` → `"6(1)"`.
///
/// Returns `None` when there is nothing left to strip.
pub fn parent_reference(canonical: &str) -> Option<&str> {
    if !canonical.ends_with(')') {
        return None;
    }
    let open = canonical.rfind('(')?;
    if open == 0 {
        return None;
    }
    Some(&canonical[..open])
}

/// Numeric-aware sort key for a canonical reference.
///
/// Digit runs are zero-padded to six places so that `"5" < "12"` and
/// `"1798.100" < "1798.105" < "1798.199.10"`; separators become `.`.
pub fn article_sort_key(canonical: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    let flush = |current: &mut String, in_digits: bool, segments: &mut Vec<String>| {
        if current.is_empty() {
            return;
        }
        if in_digits {
            let n: u64 = current.parse().unwrap_or(0);
            segments.push(format!("{n:06}"));
        } else {
            segments.push(current.clone());
        }
        current.clear();
    };

    for c in canonical.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                flush(&mut current, in_digits, &mut segments);
                in_digits = true;
            }
            current.push(c);
        } else if c.is_alphanumeric() {
            if in_digits {
                flush(&mut current, in_digits, &mut segments);
                in_digits = false;
            }
            current.push(c);
        } else {
            flush(&mut current, in_digits, &mut segments);
        }
    }
    flush(&mut current, in_digits, &mut segments);

    segments.join(".")
}
