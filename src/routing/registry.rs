//! Endpoint lookup.
//!
//! # Responsibilities
//! - Store endpoints in configuration order
//! - Pick the first endpoint whose selectors match a URL
//! - Fall back to the default endpoint when none match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan; endpoint lists are short and hand-written
//! - Selection cannot fail, a default always exists

use std::sync::Arc;

use crate::routing::endpoint::Endpoint;

/// Ordered endpoints plus the catch-all default.
#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<Endpoint>>,
    fallback: Arc<Endpoint>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<Endpoint>, fallback: Endpoint) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
            fallback: Arc::new(fallback),
        }
    }

    /// First matching endpoint, or the default.
    pub fn select_for(&self, url: &str) -> Arc<Endpoint> {
        self.endpoints
            .iter()
            .find(|ep| ep.is_for_url(url))
            .unwrap_or(&self.fallback)
            .clone()
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn fallback(&self) -> &Arc<Endpoint> {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TimeoutProfile;
    use crate::routing::endpoint::EndpointDefinition;
    use crate::routing::matcher::SelectorMatcher;
    use serde_json::Value;

    fn endpoint(name: &str, selectors: &[&str]) -> Endpoint {
        let mut def = EndpointDefinition::new(name);
        def.selectors = SelectorMatcher::compile(selectors).unwrap();
        Endpoint::build(def).unwrap()
    }

    fn registry() -> EndpointRegistry {
        EndpointRegistry::new(
            vec![endpoint("A", &[".*api.*"]), endpoint("B", &[])],
            Endpoint::fallback(TimeoutProfile::DEFAULT, Value::Null).unwrap(),
        )
    }

    #[test]
    fn test_selection_precedence() {
        let registry = registry();
        assert_eq!(registry.select_for("http://host/api/v1").name(), "A");
        assert_eq!(registry.select_for("http://host/other").name(), "B");
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let registry = EndpointRegistry::new(
            vec![endpoint("solr", &["solr"])],
            Endpoint::fallback(TimeoutProfile::DEFAULT, Value::Null).unwrap(),
        );
        assert_eq!(registry.select_for("http://es:9200/").name(), "default");
        assert_eq!(registry.select_for("http://x/SOLR/").name(), "solr");
    }
}
