//! Cache store: one entry per query key, plus the tag index derived from it
//!
//! The store is plain synchronous state. The client wraps it in a mutex and
//! never holds that lock across an await point.

use crate::cache::entry::{CacheEntry, QuerySnapshot, Transition};
use crate::cache::key::QueryKey;
use crate::cache::tags::{Tag, TagIndex};
use crate::endpoint::BoundQuery;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Owner of all cache entries
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<QueryKey, CacheEntry>,

    /// Reverse index: tag -> keys providing it
    tags: TagIndex,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing entry for `key`, or a new uninitialized one.
    /// The flag is true when the entry was created by this call.
    pub fn get_or_create(
        &mut self,
        key: &QueryKey,
        origin: &Arc<BoundQuery>,
    ) -> (&mut CacheEntry, bool) {
        let mut created = false;
        let entry = self.entries.entry(key.clone()).or_insert_with(|| {
            debug!("Creating cache entry: {}", key);
            created = true;
            CacheEntry::new(key.clone(), origin.clone())
        });
        (entry, created)
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &QueryKey) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Apply a transition. Returns false (and does nothing) when the entry
    /// has already been removed.
    pub fn update(&mut self, key: &QueryKey, transition: Transition) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.apply(transition);
                true
            }
            None => {
                debug!("Ignoring update for removed entry: {}", key);
                false
            }
        }
    }

    /// Replace the tags provided by `key`, keeping the index in sync
    pub fn set_provided_tags(&mut self, key: &QueryKey, tags: Vec<Tag>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.provided_tags = tags.iter().cloned().collect();
        self.tags.set_provided_tags(key, tags);
        true
    }

    /// Keys of all entries providing any of `tags`
    pub fn keys_for_tags(&self, tags: &[Tag]) -> HashSet<QueryKey> {
        self.tags.keys_for_tags(tags)
    }

    /// Delete an entry and all of its tag associations
    pub fn remove(&mut self, key: &QueryKey) -> Option<CacheEntry> {
        self.tags.remove_key(key);
        let removed = self.entries.remove(key);
        if removed.is_some() {
            debug!("Removed cache entry: {}", key);
        }
        removed
    }

    /// Drop every entry. Observers see their channels close.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.tags.clear();
        count
    }

    /// Rebuild the tag index from the entries' provided tags
    pub fn rebuild_tag_index(&mut self) {
        self.tags = TagIndex::rebuild(
            self.entries
                .iter()
                .map(|(key, entry)| (key, &entry.provided_tags)),
        );
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.entries.get(key).map(CacheEntry::snapshot)
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::QueryStatus;
    use crate::endpoint::{EndpointDescriptor, Method};
    use serde_json::{json, Value};

    fn bound(id: i64) -> (QueryKey, Arc<BoundQuery>) {
        let descriptor = EndpointDescriptor::new("getTrip", Method::Get, "/api/trips/{id}");
        let origin = BoundQuery::new(&descriptor, json!(id), Default::default()).unwrap();
        (
            QueryKey::from_value("getTrip", &json!(id)),
            Arc::new(origin),
        )
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = CacheStore::new();
        let (key, origin) = bound(1);

        let (entry, created) = store.get_or_create(&key, &origin);
        assert!(created);
        assert_eq!(entry.status, QueryStatus::Uninitialized);
        entry.subscriber_count = 2;

        let (entry, created) = store.get_or_create(&key, &origin);
        assert!(!created);
        assert_eq!(entry.subscriber_count, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_after_remove_is_noop() {
        let mut store = CacheStore::new();
        let (key, origin) = bound(1);
        store.get_or_create(&key, &origin);

        assert!(store.update(&key, Transition::Pending));
        assert!(store.remove(&key).is_some());
        assert!(!store.update(&key, Transition::Fulfilled(Value::Null)));
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_remove_drops_tag_associations() {
        let mut store = CacheStore::new();
        let (key, origin) = bound(7);
        store.get_or_create(&key, &origin);

        let tags = vec![Tag::item("Trip", 7)];
        assert!(store.set_provided_tags(&key, tags.clone()));
        assert!(store.keys_for_tags(&tags).contains(&key));

        store.remove(&key);
        assert!(store.keys_for_tags(&tags).is_empty());
    }

    #[test]
    fn test_set_tags_on_missing_entry() {
        let mut store = CacheStore::new();
        let (key, _) = bound(1);
        assert!(!store.set_provided_tags(&key, vec![Tag::list("TripList")]));
        assert!(store.tag_index().is_empty());
    }

    #[test]
    fn test_rebuild_tag_index() {
        let mut store = CacheStore::new();
        let (one, origin_one) = bound(1);
        let (two, origin_two) = bound(2);
        store.get_or_create(&one, &origin_one);
        store.get_or_create(&two, &origin_two);
        store.set_provided_tags(&one, vec![Tag::item("Trip", 1)]);
        store.set_provided_tags(&two, vec![Tag::item("Trip", 2)]);

        store.rebuild_tag_index();
        let keys = store.keys_for_tags(&[Tag::list("Trip")]);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_clear_closes_observers() {
        let mut store = CacheStore::new();
        let (key, origin) = bound(1);
        let (entry, _) = store.get_or_create(&key, &origin);
        let rx = entry.watch();

        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert!(rx.has_changed().is_err());
    }
}
