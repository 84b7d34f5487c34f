//! Ordered local view of one remote collection.

use bazaar_core::Record;

/// The rows currently shown to the application, newest first.
///
/// Purely local and synchronous; all locking is done by the owners
/// (coordinator and reconciler) around it.
#[derive(Debug, Clone)]
pub struct CollectionView<T: Record> {
    records: Vec<T>,
}

impl<T: Record> Default for CollectionView<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record> CollectionView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<T>) -> Self {
        Self { records }
    }

    /// Replace the entire view, e.g. after a fresh list fetch.
    pub fn replace_all(&mut self, records: Vec<T>) {
        self.records = records;
    }

    /// Prepend a record, the position for optimistic creates and for
    /// pushed inserts.
    pub fn push_front(&mut self, record: T) {
        self.records.insert(0, record);
    }

    /// Replace the record with the same id, keeping its position.
    /// Returns false when the id is not in the view.
    pub fn replace(&mut self, record: T) -> bool {
        match self.position(record.record_id()) {
            Some(idx) => {
                self.records[idx] = record;
                true
            }
            None => false,
        }
    }

    /// Replace the record at `target_id` with `record`, which may carry
    /// a different id. Used when a temp row is swapped for the server's
    /// version of it.
    pub fn substitute(&mut self, target_id: &str, record: T) -> bool {
        match self.position(target_id) {
            Some(idx) => {
                self.records[idx] = record;
                true
            }
            None => false,
        }
    }

    /// Remove by id, returning the original position and the record so
    /// a failed delete can restore both. `None` when absent.
    pub fn remove(&mut self, id: &str) -> Option<(usize, T)> {
        let idx = self.position(id)?;
        Some((idx, self.records.remove(idx)))
    }

    /// Insert at `index`, clamped to the current length. Concurrent
    /// pushed inserts may have shifted positions since the index was
    /// recorded.
    pub fn insert_at(&mut self, index: usize, record: T) {
        let index = index.min(self.records.len());
        self.records.insert(index, record);
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.record_id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.record_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    /// Owned copy of the rows in view order.
    pub fn snapshot(&self) -> Vec<T> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Collection;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Record for Note {
        fn collection() -> Collection {
            Collection::Posts
        }
        fn record_id(&self) -> &str {
            &self.id
        }
        fn set_record_id(&mut self, id: String) {
            self.id = id;
        }
    }

    fn note(id: &str) -> Note {
        Note {
            id: id.into(),
            body: format!("body of {id}"),
        }
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut view = CollectionView::new();
        view.push_front(note("a"));
        view.push_front(note("b"));

        let ids: Vec<&str> = view.iter().map(|n| n.record_id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut view = CollectionView::from_records(vec![note("a"), note("b"), note("c")]);

        let mut updated = note("b");
        updated.body = "changed".into();
        assert!(view.replace(updated));

        assert_eq!(view.position("b"), Some(1));
        assert_eq!(view.get("b").unwrap().body, "changed");
        assert!(!view.replace(note("zzz")));
    }

    #[test]
    fn test_substitute_swaps_id_in_place() {
        let mut view = CollectionView::from_records(vec![note("a"), note("tmp_x"), note("c")]);

        assert!(view.substitute("tmp_x", note("real_1")));
        assert_eq!(view.position("real_1"), Some(1));
        assert!(!view.contains("tmp_x"));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_remove_returns_index_and_record() {
        let mut view = CollectionView::from_records(vec![note("a"), note("b"), note("c")]);

        let (idx, record) = view.remove("b").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(record.record_id(), "b");
        assert_eq!(view.len(), 2);
        assert!(view.remove("b").is_none());
    }

    #[test]
    fn test_insert_at_clamps_out_of_range() {
        let mut view = CollectionView::from_records(vec![note("a")]);
        view.insert_at(10, note("z"));

        let ids: Vec<&str> = view.iter().map(|n| n.record_id()).collect();
        assert_eq!(ids, vec!["a", "z"]);
    }
}
