//! Cache key policy.
//!
//! Every cache key in the system is derived here; callers never
//! assemble key strings by hand. The private inner string means a
//! `CacheKey` can only come out of one of the constructors below, so
//! the derivation rules hold everywhere by construction.
//!
//! # Format
//!
//! - Direct lookup: `"{collection}:id:{record_id}"`
//! - Filtered query: `"{collection}:q:{digest}"` where the digest is
//!   the first 16 hex characters of the SHA-256 of the filter's
//!   canonical JSON form
//!
//! The `:` separator never appears in collection names, and the `id` /
//! `q` segment tags keep the two families disjoint even if a record id
//! happens to look like a digest.

use bazaar_core::{Collection, Filter};
use sha2::{Digest, Sha256};

/// Hex characters of the filter digest kept in the key.
const FILTER_DIGEST_LEN: usize = 16;

/// A derived cache key. Constructed only via [`CacheKey::for_id`] and
/// [`CacheKey::for_filter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: String,
}

impl CacheKey {
    /// Key for a single record fetched by id.
    pub fn for_id(collection: Collection, id: &str) -> Self {
        Self {
            inner: format!("{}:id:{}", collection.as_str(), id),
        }
    }

    /// Key for a filtered list query.
    ///
    /// Equal filters produce equal keys regardless of how the caller
    /// assembled them, because the digest is taken over the filter's
    /// canonical serialization.
    pub fn for_filter(collection: Collection, filter: &Filter) -> Self {
        let digest = Sha256::digest(filter.canonical().as_bytes());
        let hex = hex::encode(digest);
        Self {
            inner: format!("{}:q:{}", collection.as_str(), &hex[..FILTER_DIGEST_LEN]),
        }
    }

    /// Prefix covering every filtered-query key of a collection.
    ///
    /// Feeds `remove_by_prefix`; does not match direct-id keys.
    pub fn list_prefix(collection: Collection) -> String {
        format!("{}:q:", collection.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn collection_strategy() -> impl Strategy<Value = Collection> {
        prop_oneof![
            Just(Collection::Businesses),
            Just(Collection::Jobs),
            Just(Collection::Events),
            Just(Collection::Posts),
            Just(Collection::Messages),
            Just(Collection::Favorites),
        ]
    }

    fn filter_strategy() -> impl Strategy<Value = Filter> {
        proptest::collection::vec(("[a-z_]{1,12}", "[a-zA-Z0-9 ]{0,20}"), 0..5).prop_map(
            |clauses| {
                clauses
                    .into_iter()
                    .fold(Filter::new(), |f, (field, value)| f.eq(field, value))
            },
        )
    }

    proptest! {
        /// Deriving a key twice from the same inputs gives the same key.
        #[test]
        fn prop_id_key_deterministic(
            collection in collection_strategy(),
            id in "[a-zA-Z0-9_-]{1,24}",
        ) {
            prop_assert_eq!(
                CacheKey::for_id(collection, &id),
                CacheKey::for_id(collection, &id)
            );
        }

        /// Different (collection, id) pairs give different keys.
        #[test]
        fn prop_id_key_injective(
            c1 in collection_strategy(),
            c2 in collection_strategy(),
            id1 in "[a-zA-Z0-9_-]{1,24}",
            id2 in "[a-zA-Z0-9_-]{1,24}",
        ) {
            let k1 = CacheKey::for_id(c1, &id1);
            let k2 = CacheKey::for_id(c2, &id2);
            if c1 == c2 && id1 == id2 {
                prop_assert_eq!(k1, k2);
            } else {
                prop_assert_ne!(k1, k2);
            }
        }

        /// Filter keys depend only on filter content, never insertion order,
        /// and distinct filters get distinct digests.
        #[test]
        fn prop_filter_key_tracks_content(
            collection in collection_strategy(),
            f1 in filter_strategy(),
            f2 in filter_strategy(),
        ) {
            let k1 = CacheKey::for_filter(collection, &f1);
            let k2 = CacheKey::for_filter(collection, &f2);
            if f1 == f2 {
                prop_assert_eq!(k1, k2);
            } else {
                prop_assert_ne!(k1, k2);
            }
        }

        /// Every filter key falls under its collection's list prefix.
        #[test]
        fn prop_filter_key_under_list_prefix(
            collection in collection_strategy(),
            filter in filter_strategy(),
        ) {
            let key = CacheKey::for_filter(collection, &filter);
            prop_assert!(key.as_str().starts_with(&CacheKey::list_prefix(collection)));
        }
    }
}
