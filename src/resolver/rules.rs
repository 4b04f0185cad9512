//! Host-name rewrite rules.
//!
//! # Design Decisions
//! - The rule kind is fixed when the configuration is compiled; evaluation is a
//!   plain match, no probing of the rule's shape at request time
//! - Trigger patterns use "contains a match" semantics
//! - `None` means "not mine", the chain moves on to the next rule

use std::sync::Arc;

use regex::Regex;

use crate::resolver::probe::HostProbe;

/// One host-name rewrite rule.
#[derive(Debug, Clone)]
pub enum ResolverRule {
    /// Append each suffix in turn; the first that resolves wins.
    Suffix {
        trigger: Regex,
        suffixes: Vec<String>,
        probe: Arc<dyn HostProbe>,
    },
    /// Replace a matching name with a fixed host name.
    Exact { trigger: Regex, value: String },
    /// Substitute matches using a template with `$1`-style back-references.
    /// The template is stored in `regex` expansion syntax.
    Expression { trigger: Regex, replacement: String },
}

impl ResolverRule {
    /// Build a suffix rule; suffixes are normalized to start with `.`.
    pub fn suffix<I, S>(trigger: Regex, suffixes: I, probe: Arc<dyn HostProbe>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                if s.starts_with('.') {
                    s.to_string()
                } else {
                    format!(".{}", s)
                }
            })
            .collect();
        ResolverRule::Suffix {
            trigger,
            suffixes,
            probe,
        }
    }

    pub fn exact(trigger: Regex, value: impl Into<String>) -> Self {
        ResolverRule::Exact {
            trigger,
            value: value.into(),
        }
    }

    /// Build an expression rule.
    ///
    /// `$N` takes as many digits as still name a group of `trigger`, so `$1dev`
    /// is group 1 followed by `dev`. `\$` is a literal dollar sign.
    pub fn expression(trigger: Regex, replacement: impl AsRef<str>) -> Self {
        let replacement = expansion_template(replacement.as_ref(), trigger.captures_len());
        ResolverRule::Expression {
            trigger,
            replacement,
        }
    }

    pub fn trigger(&self) -> &Regex {
        match self {
            ResolverRule::Suffix { trigger, .. }
            | ResolverRule::Exact { trigger, .. }
            | ResolverRule::Expression { trigger, .. } => trigger,
        }
    }

    /// Try to rewrite `name`. Suffix rules perform blocking lookups.
    pub fn try_resolve(&self, name: &str) -> Option<String> {
        if !self.trigger().is_match(name) {
            return None;
        }
        match self {
            ResolverRule::Suffix {
                suffixes, probe, ..
            } => suffixes.iter().find_map(|suffix| {
                let candidate = format!("{}{}", name, suffix);
                tracing::info!(host = %candidate, "Trying to resolve");
                if probe.is_resolvable(&candidate) {
                    tracing::info!(host = %candidate, "Resolved");
                    Some(candidate)
                } else {
                    None
                }
            }),
            ResolverRule::Exact { value, .. } => Some(value.clone()),
            ResolverRule::Expression {
                trigger,
                replacement,
            } => Some(trigger.replace_all(name, replacement.as_str()).into_owned()),
        }
    }
}

/// Rewrite a `$N` replacement template into `regex` expansion syntax.
fn expansion_template(template: &str, groups: usize) -> String {
    let mut out = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '$' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    chars.next();
                    let mut group = d as usize - '0' as usize;
                    while let Some(next) = chars.peek().and_then(|n| n.to_digit(10)) {
                        let wider = group * 10 + next as usize;
                        if wider >= groups {
                            break;
                        }
                        group = wider;
                        chars.next();
                    }
                    out.push_str(&format!("${{{}}}", group));
                }
                Some('{') => {
                    out.push('$');
                    for n in chars.by_ref() {
                        out.push(n);
                        if n == '}' {
                            break;
                        }
                    }
                }
                _ => out.push_str("$$"),
            },
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct FixedProbe(HashSet<&'static str>);

    impl HostProbe for FixedProbe {
        fn is_resolvable(&self, host: &str) -> bool {
            self.0.contains(host)
        }
    }

    fn re(s: &str) -> Regex {
        Regex::new(s).unwrap()
    }

    #[test]
    fn test_suffix_normalization() {
        let rule = ResolverRule::suffix(re("x"), ["local", ".internal"], Arc::new(FixedProbe(HashSet::new())));
        match rule {
            ResolverRule::Suffix { suffixes, .. } => assert_eq!(suffixes, vec![".local", ".internal"]),
            _ => panic!("expected suffix rule"),
        }
    }

    #[test]
    fn test_suffix_first_resolvable_wins() {
        let probe = Arc::new(FixedProbe(["foo.internal", "foo.corp"].into_iter().collect()));
        let rule = ResolverRule::suffix(re(r"^[^.]+$"), [".local", ".internal", ".corp"], probe);
        assert_eq!(rule.try_resolve("foo"), Some("foo.internal".to_string()));
        assert_eq!(rule.try_resolve("foo.example.com"), None);
        assert_eq!(rule.try_resolve("bar"), None);
    }

    #[test]
    fn test_exact() {
        let rule = ResolverRule::exact(re("^es$"), "elastic.dev.local");
        assert_eq!(rule.try_resolve("es"), Some("elastic.dev.local".to_string()));
        assert_eq!(rule.try_resolve("est"), None);
    }

    #[test]
    fn test_expression_back_references() {
        let rule = ResolverRule::expression(re(r"^node(\d+)$"), "server-$1.cluster.local");
        assert_eq!(rule.try_resolve("node7"), Some("server-7.cluster.local".to_string()));
        assert_eq!(rule.try_resolve("nodeX"), None);
    }

    #[test]
    fn test_expression_group_followed_by_text() {
        let rule = ResolverRule::expression(re(r"^(\w+)-dev$"), "$1dev.local");
        assert_eq!(rule.try_resolve("api-dev"), Some("apidev.local".to_string()));

        // only as many digits as there are groups
        let rule = ResolverRule::expression(re(r"^(a)(b)$"), "$12-$2");
        assert_eq!(rule.try_resolve("ab"), Some("a2-b".to_string()));
    }

    #[test]
    fn test_expansion_template() {
        assert_eq!(expansion_template("$1dev", 2), "${1}dev");
        assert_eq!(expansion_template("$12", 13), "${12}");
        assert_eq!(expansion_template("$12", 3), "${1}2");
        assert_eq!(expansion_template("${name}.local", 2), "${name}.local");
        assert_eq!(expansion_template("cost\\$5", 1), "cost$$5");
        assert_eq!(expansion_template("a$", 1), "a$$");
    }
}
