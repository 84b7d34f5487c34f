//! Identity types for Bazaar records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Record identifier as assigned by the remote store. Opaque to this layer.
pub type RecordId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Prefix marking locally-synthesized ids that have not been confirmed
/// by the remote store yet.
const TEMP_ID_PREFIX: &str = "tmp_";

/// Synthesize a temporary record id for an optimistic create.
///
/// Uses UUIDv7 so temp ids are unique and timestamp-sortable. A temp id
/// is never reused: the coordinator discards it once the remote store
/// returns an authoritative id.
pub fn new_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::now_v7().simple())
}

/// Check whether an id is a locally-synthesized temporary id.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_temp_ids_are_recognized() {
        let id = new_temp_id();
        assert!(is_temp_id(&id));
        assert!(!is_temp_id("5f2b9c0e"));
        assert!(!is_temp_id(""));
    }

    #[test]
    fn test_temp_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_temp_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
