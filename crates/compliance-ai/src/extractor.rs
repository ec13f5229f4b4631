use async_trait::async_trait;
use compliance_core::ReasoningNode;

use crate::error::ExtractionError;

/// Turns a free-text query into candidate reasoning nodes.
///
/// Implementations either return every node they produced or an error; the
/// pipeline never consumes partial output.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Short backend name for logs (`"rules"`, `"llm"`).
    fn name(&self) -> &str;

    async fn extract(&self, query: &str) -> Result<Vec<ReasoningNode>, ExtractionError>;
}

/// Split a query into trimmed, non-empty statements.
///
/// Breaks on newlines and semicolons, and on `.` `!` `?` only when followed by
/// whitespace or the end of input, so "21 CFR 11.10" stays whole. An
/// abbreviation whose final dot precedes a space ("e.g. this") still splits.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' | ';' => true,
            '.' | '!' | '?' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let end = i + c.len_utf8();
            push_trimmed(&mut out, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut out, &text[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim().trim_end_matches([';', '\n']).trim();
    if piece.chars().any(|c| c.is_alphanumeric()) {
        out.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators() {
        assert_eq!(
            split_sentences("We lost a laptop. It held emails! Did we notify anyone?"),
            vec!["We lost a laptop.", "It held emails!", "Did we notify anyone?"]
        );
    }

    #[test]
    fn keeps_dotted_citations_together() {
        assert_eq!(
            split_sentences("Records under 21 CFR 11.10 were edited. Nobody noticed"),
            vec!["Records under 21 CFR 11.10 were edited.", "Nobody noticed"]
        );
    }

    #[test]
    fn abbreviation_dot_before_space_splits() {
        assert_eq!(
            split_sentences("Report it, e.g. within a day"),
            vec!["Report it, e.g.", "within a day"]
        );
    }

    #[test]
    fn newlines_and_semicolons_split() {
        assert_eq!(
            split_sentences("first point; second point\nthird"),
            vec!["first point", "second point", "third"]
        );
    }

    #[test]
    fn blank_and_punctuation_only_pieces_dropped() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("  \n ... ;; ").is_empty());
    }
}
