//! Invalidation events
//!
//! Every tag invalidation produces an [`InvalidationEvent`] describing which
//! entries were marked stale and which of them were refetched right away.

use crate::cache::key::QueryKey;
use crate::cache::tags::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// A mutation completed and declared these tags invalid
    Mutation { endpoint: String, mutation_id: Uuid },

    /// Invalidated explicitly through the client
    Manual,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Mutation {
                endpoint,
                mutation_id,
            } => write!(f, "mutation {} ({})", endpoint, mutation_id),
            InvalidationReason::Manual => write!(f, "manual invalidation"),
        }
    }
}

/// Outcome of one invalidation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub reason: InvalidationReason,

    /// Tags that were invalidated
    pub tags: Vec<Tag>,

    /// Entries marked stale
    pub keys: Vec<QueryKey>,

    /// Subset of `keys` refetched immediately (or flagged while in flight)
    pub refetched: Vec<QueryKey>,

    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, tags: Vec<Tag>) -> Self {
        Self {
            reason,
            tags,
            keys: Vec::new(),
            refetched: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Whether any entry was affected
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(InvalidationReason::Manual.to_string(), "manual invalidation");

        let id = Uuid::new_v4();
        let reason = InvalidationReason::Mutation {
            endpoint: "createTrip".to_string(),
            mutation_id: id,
        };
        assert_eq!(reason.to_string(), format!("mutation createTrip ({})", id));
    }

    #[test]
    fn test_new_event_is_empty() {
        let event = InvalidationEvent::new(InvalidationReason::Manual, vec![Tag::list("TripList")]);
        assert!(event.is_empty());
        assert_eq!(event.tags.len(), 1);
    }
}
