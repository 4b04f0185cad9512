//! Ordered resolver rules with a memoizing, case-insensitive cache.

use dashmap::DashMap;

use crate::observability::metrics;
use crate::resolver::rules::ResolverRule;

/// Host-name rewrite chain. Never fails: an unmatched name resolves to itself.
#[derive(Debug, Default)]
pub struct ResolverChain {
    rules: Vec<ResolverRule>,
    cache: DashMap<String, String>,
}

impl ResolverChain {
    pub fn new(rules: Vec<ResolverRule>) -> Self {
        Self {
            rules,
            cache: DashMap::new(),
        }
    }

    /// A chain without rules; every name resolves to its lowercased self.
    pub fn rules(&self) -> &[ResolverRule] {
        &self.rules
    }

    /// Number of cached names.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a host name.
    ///
    /// Rules run outside any lock. The first result stored for a name is kept;
    /// a concurrent resolution of the same name computes the same answer anyway.
    pub fn resolve(&self, name: &str) -> String {
        let key = name.to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            metrics::record_resolver_cache(true);
            return hit.value().clone();
        }
        metrics::record_resolver_cache(false);

        let resolved = self.rules.iter().find_map(|rule| rule.try_resolve(&key));
        let resolved = match resolved {
            Some(host) => {
                tracing::info!(host = %name, resolved = %host, "Host [{}] => [{}]", name, host);
                host
            }
            None => {
                tracing::info!(host = %name, "Host [{}] unresolved, using it as is", name);
                key.clone()
            }
        };

        self.cache.entry(key).or_insert(resolved).value().clone()
    }

    /// Rewrite the host portion of `url`.
    ///
    /// The host is the text between `://` (or the start) and the first `:`, `/`
    /// or `?` after it.
    pub fn resolve_url(&self, url: &str) -> String {
        let (start, end) = host_span(url);
        if start >= end {
            return url.to_string();
        }
        let host = self.resolve(&url[start..end]);
        let mut rewritten = String::with_capacity(url.len() + host.len());
        rewritten.push_str(&url[..start]);
        rewritten.push_str(&host);
        rewritten.push_str(&url[end..]);
        rewritten
    }
}

/// Byte range of the host name inside `url`.
pub fn host_span(url: &str) -> (usize, usize) {
    let start = url.find("://").map(|ix| ix + 3).unwrap_or(0);
    let end = url[start..]
        .find([':', '/', '?'])
        .map(|ix| start + ix)
        .unwrap_or(url.len());
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::probe::HostProbe;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct CountingProbe {
        calls: AtomicUsize,
    }

    impl HostProbe for CountingProbe {
        fn is_resolvable(&self, host: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            host.ends_with(".internal")
        }
    }

    fn suffix_chain(probe: Arc<CountingProbe>) -> ResolverChain {
        ResolverChain::new(vec![ResolverRule::suffix(
            Regex::new(r"^[^.]+$").unwrap(),
            [".local", ".internal"],
            probe,
        )])
    }

    #[test]
    fn test_suffix_probe_falls_through_to_second_suffix() {
        let chain = suffix_chain(Arc::new(CountingProbe::default()));
        assert_eq!(chain.resolve("foo"), "foo.internal");
    }

    #[test]
    fn test_second_call_is_a_cache_hit() {
        let probe = Arc::new(CountingProbe::default());
        let chain = suffix_chain(probe.clone());

        let first = chain.resolve("foo");
        let calls = probe.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 2);

        let second = chain.resolve("foo");
        assert_eq!(first, second);
        assert_eq!(probe.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_case_insensitive_cache() {
        let probe = Arc::new(CountingProbe::default());
        let chain = suffix_chain(probe.clone());

        assert_eq!(chain.resolve("Foo"), "foo.internal");
        assert_eq!(chain.resolve("foo"), "foo.internal");
        assert_eq!(chain.resolve("FOO"), "foo.internal");
        assert_eq!(chain.cached(), 1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unresolved_falls_back_and_is_cached() {
        let probe = Arc::new(CountingProbe::default());
        let chain = suffix_chain(probe.clone());

        assert_eq!(chain.resolve("Example.COM"), "example.com");
        assert_eq!(chain.resolve("example.com"), "example.com");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let chain = ResolverChain::new(vec![
            ResolverRule::exact(Regex::new("^db$").unwrap(), "db.first"),
            ResolverRule::exact(Regex::new("^d").unwrap(), "db.second"),
        ]);
        assert_eq!(chain.resolve("db"), "db.first");
        assert_eq!(chain.resolve("dx"), "db.second");
    }

    #[test]
    fn test_resolve_url_splices_host() {
        let chain = ResolverChain::new(vec![ResolverRule::exact(
            Regex::new("^es$").unwrap(),
            "es.dev.local",
        )]);
        assert_eq!(chain.resolve_url("http://es:9200/_search?q=1"), "http://es.dev.local:9200/_search?q=1");
        assert_eq!(chain.resolve_url("https://ES/path"), "https://es.dev.local/path");
        assert_eq!(chain.resolve_url("http://es?x=1"), "http://es.dev.local?x=1");
        assert_eq!(chain.resolve_url("es/path"), "es.dev.local/path");
        assert_eq!(chain.resolve_url("http://other:80/"), "http://other:80/");
    }

    #[test]
    fn test_host_span() {
        assert_eq!(host_span("http://h/api"), (7, 8));
        assert_eq!(host_span("http://h:1/api"), (7, 8));
        assert_eq!(host_span("h"), (0, 1));
    }
}
