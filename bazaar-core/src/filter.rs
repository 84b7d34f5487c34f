//! Filter expressions for list queries.
//!
//! Filters travel to the remote store untouched; on this side they only
//! need a canonical serialization so that equal filters map to equal
//! cache keys regardless of how the caller assembled them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A conjunction of field clauses for a list query.
///
/// Clauses are held in a `BTreeMap`, so iteration and serialization are
/// ordered by field name. Two filters built from the same clauses in any
/// insertion order serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    clauses: BTreeMap<String, serde_json::Value>,
}

impl Filter {
    /// An empty filter, matching everything in the collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause. Re-adding a field overwrites its value.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.insert(field.into(), value.into());
        self
    }

    /// Whether the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses in field-name order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deterministic JSON form used for cache-key digests.
    pub fn canonical(&self) -> String {
        // BTreeMap serializes in key order; Value round-trips losslessly.
        serde_json::to_string(&self.clauses).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_ignores_insertion_order() {
        let a = Filter::new().eq("city", "porto").eq("active", true);
        let b = Filter::new().eq("active", true).eq("city", "porto");
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_distinguishes_values() {
        let a = Filter::new().eq("active", true);
        let b = Filter::new().eq("active", false);
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_overwrite_last_wins() {
        let f = Filter::new().eq("city", "porto").eq("city", "braga");
        assert_eq!(f.canonical(), Filter::new().eq("city", "braga").canonical());
    }

    #[test]
    fn test_empty_filter() {
        let f = Filter::new();
        assert!(f.is_empty());
        assert_eq!(f.canonical(), "{}");
        assert_eq!(f.clauses().count(), 0);
    }

    #[test]
    fn test_mixed_value_types() {
        let f = Filter::new()
            .eq("category", "plumbing")
            .eq("rating", 4)
            .eq("tags", json!(["verified", "local"]));
        assert_eq!(f.clauses().count(), 3);
        let canonical = f.canonical();
        assert!(canonical.contains("\"category\""));
        assert!(canonical.contains("\"rating\":4"));
    }
}
