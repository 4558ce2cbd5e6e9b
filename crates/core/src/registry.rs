// Subscriber registry
//
// Push recipients keyed by installation identity. Identity is the primary key;
// the same token may in principle appear under several identities.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Map from installation identity to push delivery token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberRegistry {
    tokens: BTreeMap<String, String>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the token for an installation.
    pub fn register(&mut self, identity: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(identity.into(), token.into());
    }

    /// Remove every installation whose token equals `token`.
    ///
    /// Returns the identities that were removed (empty if none matched).
    pub fn unregister_by_token(&mut self, token: &str) -> Vec<String> {
        let removed: Vec<String> = self
            .tokens
            .iter()
            .filter(|(_, t)| t.as_str() == token)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            self.tokens.remove(id);
        }
        removed
    }

    /// Point-in-time copy of all distinct tokens.
    pub fn list_tokens(&self) -> Vec<String> {
        self.tokens
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn token_for(&self, identity: &str) -> Option<&str> {
        self.tokens.get(identity).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_prior_token() {
        let mut registry = SubscriberRegistry::new();
        registry.register("A", "tok1");
        registry.register("A", "tok2");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.token_for("A"), Some("tok2"));
        assert_eq!(registry.list_tokens(), vec!["tok2".to_string()]);
    }

    #[test]
    fn test_unregister_by_token_then_reregister() {
        let mut registry = SubscriberRegistry::new();
        registry.register("A", "tok1");
        registry.register("B", "tok2");

        let removed = registry.unregister_by_token("tok1");

        assert_eq!(removed, vec!["A".to_string()]);
        assert!(!registry.list_tokens().contains(&"tok1".to_string()));
        assert_eq!(registry.token_for("B"), Some("tok2"));

        registry.register("A", "tok3");
        assert_eq!(registry.token_for("A"), Some("tok3"));
    }

    #[test]
    fn test_unregister_unknown_token_is_noop() {
        let mut registry = SubscriberRegistry::new();
        registry.register("A", "tok1");

        assert!(registry.unregister_by_token("nope").is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_shared_token_listed_once_and_removed_everywhere() {
        let mut registry = SubscriberRegistry::new();
        registry.register("A", "shared");
        registry.register("B", "shared");

        assert_eq!(registry.list_tokens(), vec!["shared".to_string()]);

        let removed = registry.unregister_by_token("shared");
        assert_eq!(removed.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut registry = SubscriberRegistry::new();
        registry.register("foo", "bar");

        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json, serde_json::json!({"foo": "bar"}));
    }
}
