//! Collection discriminator for the application's remote collections.

use serde::{Deserialize, Serialize};

/// The remote collections the sync layer operates on.
///
/// `as_str()` values are stable: they appear inside cache keys and must
/// not change between releases, or previously cached entries become
/// unreachable (harmless, but wasteful).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Businesses,
    Jobs,
    Events,
    Posts,
    Messages,
    Favorites,
}

impl Collection {
    /// Stable lowercase name used in cache keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Businesses => "businesses",
            Collection::Jobs => "jobs",
            Collection::Events => "events",
            Collection::Posts => "posts",
            Collection::Messages => "messages",
            Collection::Favorites => "favorites",
        }
    }

    /// All collections, in declaration order.
    pub fn all() -> &'static [Collection] {
        &[
            Collection::Businesses,
            Collection::Jobs,
            Collection::Events,
            Collection::Posts,
            Collection::Messages,
            Collection::Favorites,
        ]
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_lowercase() {
        let names: Vec<&str> = Collection::all().iter().map(|c| c.as_str()).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
        for name in names {
            assert_eq!(name, name.to_lowercase());
            assert!(!name.contains(':'), "collection names must not contain the key separator");
        }
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Collection::Jobs.to_string(), "jobs");
        assert_eq!(Collection::Favorites.to_string(), "favorites");
    }
}
