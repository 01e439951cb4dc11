//! Identifier patterns.
//!
//! Only one identifier kind is recognised: email addresses. The pattern is
//! compiled once and shared.

use once_cell::sync::Lazy;
use regex::Regex;

/// Local part, `@`, dot-separated domain labels, alphabetic TLD of 2+ chars.
const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

static EMAIL: Lazy<IdentifierPattern> = Lazy::new(|| {
    IdentifierPattern::new(
        "email",
        "Email addresses (local@domain.tld)",
        EMAIL_PATTERN,
    )
});

/// A compiled identifier pattern.
#[derive(Debug)]
pub struct IdentifierPattern {
    /// Name of the pattern for identification.
    pub name: &'static str,

    /// Description of what this pattern matches.
    pub description: &'static str,

    regex: Regex,
}

impl IdentifierPattern {
    /// Create a new identifier pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the content contains a match.
    #[must_use]
    pub fn matches(&self, content: &str) -> bool {
        self.regex.is_match(content)
    }

    /// Find all non-overlapping matches, left to right.
    pub fn find_all<'a>(&self, content: &'a str) -> regex::Matches<'_, 'a> {
        self.regex.find_iter(content)
    }
}

/// The shared email pattern.
#[must_use]
pub fn email_pattern() -> &'static IdentifierPattern {
    &EMAIL
}
