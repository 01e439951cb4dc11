//! Identifier detection and redaction.
//!
//! Pure functions over text: nothing here performs I/O, holds state, or
//! fails on arbitrary input.
//!
//! # Example
//!
//! ```
//! use promptmonitor::detector::{dedupe, detect, redact, REDACTION_TOKEN};
//!
//! let text = "Contact Jane.Doe@Example.com or jane.doe@example.com";
//!
//! let found = detect(text);
//! assert_eq!(found.len(), 2);
//!
//! let unique = dedupe(&found);
//! assert_eq!(unique, vec!["Jane.Doe@Example.com".to_string()]);
//!
//! let redacted = redact(text, &found);
//! assert_eq!(redacted, format!("Contact {REDACTION_TOKEN} or {REDACTION_TOKEN}"));
//! ```

mod patterns;

use std::collections::HashSet;

pub use patterns::{email_pattern, IdentifierPattern};

use crate::model::normalize;

/// Placeholder substituted for every redacted identifier.
pub const REDACTION_TOKEN: &str = "[EMAIL_ADDRESS]";

/// Find every identifier in `text`, in order of first occurrence.
///
/// Duplicates are kept.
#[must_use]
pub fn detect(text: &str) -> Vec<String> {
    email_pattern()
        .find_all(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Drop case-insensitive duplicates.
///
/// The first-seen spelling and first-seen order are kept.
#[must_use]
pub fn dedupe<S: AsRef<str>>(matches: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .map(AsRef::as_ref)
        .filter(|m| seen.insert(normalize(m)))
        .map(str::to_string)
        .collect()
}

/// Replace every literal occurrence of each target with [`REDACTION_TOKEN`].
///
/// Longer targets are replaced first so a target that is a substring of
/// another never leaves a fragment of the longer one behind.
#[must_use]
pub fn redact<S: AsRef<str>>(text: &str, targets: &[S]) -> String {
    let mut ordered: Vec<&str> = targets
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.is_empty())
        .collect();
    ordered.sort_by_key(|t| std::cmp::Reverse(t.len()));
    ordered.dedup();

    ordered
        .into_iter()
        .fold(text.to_string(), |acc, target| {
            if acc.contains(target) {
                acc.replace(target, REDACTION_TOKEN)
            } else {
                acc
            }
        })
}

/// Keep only identifiers not covered by the suppression set.
///
/// `suppressed` holds normalized identifiers.
#[must_use]
pub fn filter_suppressed<S: AsRef<str>>(
    identifiers: &[S],
    suppressed: &HashSet<String>,
) -> Vec<String> {
    identifiers
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !suppressed.contains(&normalize(id)))
        .map(str::to_string)
        .collect()
}

/// Every literal spelling in `text` of the given identifiers.
///
/// Identifiers are compared case-insensitively, so redacting the result
/// removes `jane@x.com` as well as `JANE@X.COM` when either one was selected.
#[must_use]
pub fn redaction_targets<S: AsRef<str>>(text: &str, identifiers: &[S]) -> Vec<String> {
    let wanted: HashSet<String> = identifiers.iter().map(|i| normalize(i.as_ref())).collect();
    let mut seen = HashSet::new();
    detect(text)
        .into_iter()
        .filter(|m| wanted.contains(&normalize(m)))
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

/// Result of scanning one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    /// Raw matches, duplicates included.
    pub found: Vec<String>,
    /// Case-insensitively unique matches.
    pub unique: Vec<String>,
    /// The text with every match replaced.
    pub redacted: String,
}

impl ScanResult {
    /// Check whether anything was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

/// Detect, dedupe and redact in one call.
#[must_use]
pub fn scan(text: &str) -> ScanResult {
    let found = detect(text);
    let unique = dedupe(&found);
    let redacted = redact(text, &found);
    ScanResult {
        found,
        unique,
        redacted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_keeps_duplicates_in_order() {
        let found = detect("Contact Jane.Doe@Example.com or jane.doe@example.com");
        assert_eq!(
            found,
            vec!["Jane.Doe@Example.com", "jane.doe@example.com"]
        );
    }

    #[test]
    fn test_detect_no_matches() {
        assert!(detect("nothing to see here").is_empty());
        assert!(detect("").is_empty());
        assert!(detect("@@@ .. @.com a@").is_empty());
    }

    #[test]
    fn test_detect_handles_arbitrary_text() {
        let text = "\u{0}\u{ffff} 🦀 ünïcødé a@b.com \n\t";
        assert_eq!(detect(text), vec!["a@b.com"]);
    }

    #[test]
    fn test_dedupe_preserves_first_casing() {
        let unique = dedupe(&["Jane.Doe@Example.com", "jane.doe@example.com", "x@y.io"]);
        assert_eq!(unique, vec!["Jane.Doe@Example.com", "x@y.io"]);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let once = dedupe(&["B@c.com", "a@b.com", "b@C.com", "A@B.COM"]);
        let twice = dedupe(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec!["B@c.com", "a@b.com"]);
    }

    #[test]
    fn test_redact_removes_every_target() {
        let text = "mail a@b.com and a@b.com, then c@d.org";
        let redacted = redact(text, &["a@b.com", "c@d.org"]);

        assert!(!redacted.contains("a@b.com"));
        assert!(!redacted.contains("c@d.org"));
        assert_eq!(redacted.matches(REDACTION_TOKEN).count(), 3);
    }

    #[test]
    fn test_redact_overlapping_targets() {
        let text = "xa@b.com and a@b.com";
        let redacted = redact(text, &["a@b.com", "xa@b.com"]);
        assert_eq!(redacted, format!("{REDACTION_TOKEN} and {REDACTION_TOKEN}"));
    }

    #[test]
    fn test_redact_is_idempotent() {
        let text = "ping a@b.com";
        let once = redact(text, &["a@b.com"]);
        let twice = redact(&once, &["a@b.com"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_redact_token_is_not_an_identifier() {
        assert!(detect(REDACTION_TOKEN).is_empty());
    }

    #[test]
    fn test_redact_without_targets() {
        assert_eq!(redact("a@b.com", &[] as &[&str]), "a@b.com");
    }

    #[test]
    fn test_filter_suppressed_case_insensitive() {
        let suppressed: HashSet<String> = ["a@b.com".to_string()].into_iter().collect();
        let remaining = filter_suppressed(&["A@B.com", "c@d.org"], &suppressed);
        assert_eq!(remaining, vec!["c@d.org"]);
    }

    #[test]
    fn test_redaction_targets_cover_all_spellings() {
        let text = "Jane@X.com wrote to jane@x.com and bob@x.com";
        let targets = redaction_targets(text, &["Jane@X.com"]);
        assert_eq!(targets, vec!["Jane@X.com", "jane@x.com"]);

        let redacted = redact(text, &targets);
        assert_eq!(
            redacted,
            format!("{REDACTION_TOKEN} wrote to {REDACTION_TOKEN} and bob@x.com")
        );
    }

    #[test]
    fn test_scan() {
        let result = scan("a@b.com A@B.com");
        assert_eq!(result.found.len(), 2);
        assert_eq!(result.unique, vec!["a@b.com"]);
        assert_eq!(result.redacted, format!("{REDACTION_TOKEN} {REDACTION_TOKEN}"));
        assert!(!result.is_empty());
        assert!(scan("clean").is_empty());
    }
}
