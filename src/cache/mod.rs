//! # Tag-Indexed Query Cache
//!
//! Client-side cache for remote query results, keyed by endpoint and
//! serialized arguments, with tag-driven invalidation.
//!
//! ## Features
//!
//! - **Request deduplication**: concurrent dispatches of the same key share one fetch
//! - **Subscription lifecycle**: entries live while subscribed and are garbage
//!   collected a configurable delay after the last subscriber leaves
//! - **Tag invalidation**: mutations declare the tags they invalidate; matching
//!   entries are marked stale and subscribed ones are refetched
//! - **Shared failures**: a rejected fetch is observed identically by every subscriber
//! - **Retry with backoff**: transient query failures are retried with jitter
//!
//! ## Architecture
//!
//! - [`store`]: entries by key plus the reverse tag index
//! - [`subscription`]: reference counting and GC timers
//! - [`dispatcher`]: the [`QueryClient`] tying the two to a [`Fetcher`](crate::fetcher::Fetcher)
//!
//! ## Example
//!
//! ```rust
//! use tripcache::cache::{CacheConfig, QueryClient};
//! use tripcache::endpoint::{QueryEndpoint, Request};
//! use tripcache::error::QueryError;
//! use tripcache::Tag;
//! use serde_json::{json, Value};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .gc_delay(Duration::from_secs(30))
//!     .max_retries(2)
//!     .build();
//!
//! let client = QueryClient::with_config(
//!     |_request: Request| async { Ok::<Value, QueryError>(json!([{"id": 1}])) },
//!     config,
//! )?;
//!
//! let trips: QueryEndpoint<(), Vec<Value>> =
//!     QueryEndpoint::new("listTrips", "/api/trips").provides(vec![Tag::list("TripList")]);
//!
//! let subscription = client.subscribe(&trips, &())?;
//! println!("Status: {}", subscription.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod store;
pub mod subscription;
pub mod tags;
pub mod types;

pub use config::{ApiConfig, CacheConfig, CacheConfigBuilder};
pub use dispatcher::{MutationOutcome, QueryClient, QuerySubscription, QueryView};
pub use entry::{CacheEntry, QuerySnapshot, QueryStatus, Transition};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use key::QueryKey;
pub use store::CacheStore;
pub use subscription::{SubscriptionId, SubscriptionManager};
pub use tags::{Tag, TagContext, TagFn, TagId, TagIndex, TagRule};
pub use types::CacheStats;
