//! Subscription reference counting and garbage-collection timers
//!
//! Per key: `NoSubscribers -> HasSubscribers -> NoSubscribers (GC pending)
//! -> Evicted | HasSubscribers`. All counting happens under the client's
//! state lock, the same lock the GC timer takes before evicting, so an entry
//! that just gained a subscriber can never be collected.

use crate::cache::key::QueryKey;
use crate::cache::store::CacheStore;
use chrono::Utc;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one subscription handle
pub type SubscriptionId = Uuid;

#[derive(Debug)]
struct GcTimer {
    token: u64,
    handle: JoinHandle<()>,
}

/// Tracks live subscriptions and pending evictions
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    handles: HashMap<SubscriptionId, QueryKey>,
    timers: HashMap<QueryKey, GcTimer>,
    next_token: u64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for an existing entry and cancel any pending GC.
    /// Returns `None` when the entry does not exist.
    pub fn subscribe(&mut self, store: &mut CacheStore, key: &QueryKey) -> Option<SubscriptionId> {
        let entry = store.get_mut(key)?;
        entry.subscriber_count += 1;
        entry.gc_due = false;
        entry.publish();
        let count = entry.subscriber_count;

        if self.cancel_gc(key) {
            debug!("Cancelled pending GC for {}", key);
        }

        let id = Uuid::new_v4();
        self.handles.insert(id, key.clone());
        debug!("Subscribed {} to {} ({} subscribers)", id, key, count);
        Some(id)
    }

    /// Release a subscriber. Returns the key and its remaining subscriber
    /// count, or `None` for an unknown handle or a key no longer cached.
    /// Releasing the same handle twice is a no-op.
    pub fn unsubscribe(
        &mut self,
        store: &mut CacheStore,
        id: SubscriptionId,
    ) -> Option<(QueryKey, usize)> {
        let key = self.handles.remove(&id)?;
        let entry = store.get_mut(&key)?;

        entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
        if entry.subscriber_count == 0 {
            entry.last_unsubscribed_at = Some(Utc::now());
        }
        entry.publish();

        debug!(
            "Unsubscribed {} from {} ({} subscribers)",
            id, key, entry.subscriber_count
        );
        let remaining = entry.subscriber_count;
        Some((key, remaining))
    }

    /// Start a GC timer for `key`, replacing any previous one.
    /// `spawn` receives the timer token and returns the timer task.
    pub fn schedule_gc<F>(&mut self, key: &QueryKey, spawn: F)
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        self.cancel_gc(key);
        self.next_token += 1;
        let token = self.next_token;
        let handle = spawn(token);
        self.timers.insert(key.clone(), GcTimer { token, handle });
    }

    /// Abort the pending GC timer for `key`, if any
    pub fn cancel_gc(&mut self, key: &QueryKey) -> bool {
        match self.timers.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim a fired timer. False when it was cancelled or replaced since.
    pub fn take_fired_timer(&mut self, key: &QueryKey, token: u64) -> bool {
        match self.timers.get(key) {
            Some(timer) if timer.token == token => {
                self.timers.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn has_pending_gc(&self, key: &QueryKey) -> bool {
        self.timers.contains_key(key)
    }

    /// Number of live subscription handles
    pub fn active(&self) -> usize {
        self.handles.len()
    }

    /// Abort every GC timer
    pub fn abort_timers(&mut self) -> usize {
        let count = self.timers.len();
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
        count
    }

    /// Abort every timer and forget every handle. Handles released
    /// afterwards are unknown and ignored, so they cannot touch entries
    /// created after the reset.
    pub fn clear(&mut self) -> usize {
        self.handles.clear();
        self.abort_timers()
    }
}
