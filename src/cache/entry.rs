//! Cache entry state and the observable snapshot published to views

use crate::cache::key::QueryKey;
use crate::cache::tags::Tag;
use crate::endpoint::BoundQuery;
use crate::error::QueryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

impl QueryStatus {
    /// Fulfilled or rejected
    pub fn is_settled(&self) -> bool {
        matches!(self, QueryStatus::Fulfilled | QueryStatus::Rejected)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStatus::Uninitialized => write!(f, "uninitialized"),
            QueryStatus::Pending => write!(f, "pending"),
            QueryStatus::Fulfilled => write!(f, "fulfilled"),
            QueryStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// State transition applied by the dispatcher
#[derive(Debug, Clone)]
pub enum Transition {
    Pending,
    Fulfilled(Value),
    Rejected(QueryError),
    /// Marked stale by invalidation; keeps the last data until refetched
    Invalidated,
}

/// Point-in-time view of an entry, published to every observer
#[derive(Debug, Clone, Serialize)]
pub struct QuerySnapshot {
    pub key: QueryKey,
    pub status: QueryStatus,
    /// Last successful data; kept while a refetch is pending
    pub data: Option<Value>,
    /// Error of the last failed fetch; cleared by the next success
    pub error: Option<QueryError>,
    pub subscriber_count: usize,
    pub fulfilled_at: Option<DateTime<Utc>>,
    /// Set by tag invalidation, cleared when fresh data lands
    pub invalidated: bool,
}

impl QuerySnapshot {
    fn new(key: QueryKey) -> Self {
        Self {
            key,
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            subscriber_count: 0,
            fulfilled_at: None,
            invalidated: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            QueryStatus::Uninitialized | QueryStatus::Pending
        ) && self.data.is_none()
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Pending
    }
}

/// A cached query result, owned by the cache store
#[derive(Debug)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<QueryError>,
    pub provided_tags: HashSet<Tag>,
    pub subscriber_count: usize,
    pub last_unsubscribed_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub invalidated: bool,

    /// GC delay elapsed while a fetch was in flight; evict when it lands
    pub(crate) gc_due: bool,

    /// Endpoint and arguments needed to refetch without the caller
    pub(crate) origin: Arc<BoundQuery>,

    sender: watch::Sender<QuerySnapshot>,
}

impl CacheEntry {
    pub(crate) fn new(key: QueryKey, origin: Arc<BoundQuery>) -> Self {
        let (sender, _) = watch::channel(QuerySnapshot::new(key.clone()));
        Self {
            key,
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            provided_tags: HashSet::new(),
            subscriber_count: 0,
            last_unsubscribed_at: None,
            fulfilled_at: None,
            invalidated: false,
            gc_due: false,
            origin,
            sender,
        }
    }

    /// Apply a state transition and notify observers
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Pending => {
                self.status = QueryStatus::Pending;
            }
            Transition::Fulfilled(data) => {
                self.status = QueryStatus::Fulfilled;
                self.data = Some(data);
                self.error = None;
                self.fulfilled_at = Some(Utc::now());
                self.invalidated = false;
            }
            Transition::Rejected(error) => {
                self.status = QueryStatus::Rejected;
                self.error = Some(error);
            }
            Transition::Invalidated => {
                self.status = QueryStatus::Pending;
                self.invalidated = true;
            }
        }
        self.publish();
    }

    /// Current snapshot of this entry
    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            key: self.key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            subscriber_count: self.subscriber_count,
            fulfilled_at: self.fulfilled_at,
            invalidated: self.invalidated,
        }
    }

    /// New observer of this entry
    pub fn watch(&self) -> watch::Receiver<QuerySnapshot> {
        self.sender.subscribe()
    }

    /// Push the current state to observers
    pub(crate) fn publish(&self) {
        self.sender.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointDescriptor, Method};
    use serde_json::json;

    fn entry() -> CacheEntry {
        let descriptor = EndpointDescriptor::new("getTrip", Method::Get, "/api/trips/{id}");
        let origin = BoundQuery::new(&descriptor, json!(7), Default::default()).unwrap();
        CacheEntry::new(QueryKey::from_value("getTrip", &json!(7)), Arc::new(origin))
    }

    #[test]
    fn test_new_entry_is_uninitialized() {
        let entry = entry();
        assert_eq!(entry.status, QueryStatus::Uninitialized);
        assert_eq!(entry.subscriber_count, 0);
        assert!(entry.snapshot().is_loading());
    }

    #[test]
    fn test_transitions_publish_to_observers() {
        let mut entry = entry();
        let rx = entry.watch();

        entry.apply(Transition::Pending);
        assert_eq!(rx.borrow().status, QueryStatus::Pending);

        entry.apply(Transition::Fulfilled(json!({"id": 7})));
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.status, QueryStatus::Fulfilled);
        assert_eq!(snapshot.data, Some(json!({"id": 7})));
        assert!(snapshot.fulfilled_at.is_some());
    }

    #[test]
    fn test_rejection_keeps_previous_data() {
        let mut entry = entry();
        entry.apply(Transition::Fulfilled(json!(1)));
        entry.apply(Transition::Rejected(QueryError::NetworkError("down".to_string())));

        assert_eq!(entry.status, QueryStatus::Rejected);
        assert_eq!(entry.data, Some(json!(1)));
        assert!(entry.error.is_some());

        entry.apply(Transition::Fulfilled(json!(2)));
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_invalidation_marks_stale_until_fresh_data() {
        let mut entry = entry();
        entry.apply(Transition::Fulfilled(json!(1)));
        entry.apply(Transition::Invalidated);

        let snapshot = entry.snapshot();
        assert_eq!(snapshot.status, QueryStatus::Pending);
        assert!(snapshot.invalidated);
        assert!(!snapshot.is_loading());
        assert_eq!(snapshot.data, Some(json!(1)));

        entry.apply(Transition::Fulfilled(json!(2)));
        assert!(!entry.invalidated);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(QueryStatus::Fulfilled.to_string(), "fulfilled");
        assert!(QueryStatus::Rejected.is_settled());
        assert!(!QueryStatus::Pending.is_settled());
    }
}
