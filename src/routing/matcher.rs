//! URL selector matching.
//!
//! # Responsibilities
//! - Compile selector patterns (case-insensitive, Unicode classes)
//! - Match the raw outbound URL text with "contains a match" semantics
//! - Combine selectors with OR semantics
//!
//! # Design Decisions
//! - No selectors = always matches (wildcard)
//! - Patterns compiled once, at configuration time

use regex::{Regex, RegexBuilder};

/// Trait for matching outbound URLs against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the URL matches this condition.
    fn matches(&self, url: &str) -> bool;
}

/// Compile a selector pattern.
pub fn compile_selector(expr: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .unicode(true)
        .build()
}

/// Matches when any one of its patterns is found in the URL.
#[derive(Debug, Clone, Default)]
pub struct SelectorMatcher {
    patterns: Vec<Regex>,
}

impl SelectorMatcher {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Compile every expression; fails on the first invalid one.
    pub fn compile<I, S>(exprs: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = exprs
            .into_iter()
            .map(|e| compile_selector(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_wildcard(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Matcher for SelectorMatcher {
    fn matches(&self, url: &str) -> bool {
        self.is_wildcard() || self.patterns.iter().any(|p| p.is_match(url))
    }
}
