//! # tripcache
//!
//! A tag-indexed query cache for the travel planner API, with request
//! deduplication, subscription-scoped lifetimes and mutation-driven
//! invalidation.
//!
//! ## Features
//!
//! - Async-first design using tokio
//! - One in-flight fetch per query key, shared by every caller
//! - Entries garbage collected after their last subscriber leaves
//! - Mutations invalidate cached queries by tag
//! - Typed endpoint definitions for accounts, trips, activities and flights
//!
//! ## Subscribing to a query
//!
//! ```no_run
//! use tripcache::api::trips;
//! use tripcache::endpoint::Request;
//! use tripcache::error::QueryError;
//! use tripcache::QueryClient;
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QueryClient::new(|_request: Request| async {
//!         Ok::<Value, QueryError>(json!([]))
//!     })?;
//!
//!     let mut trips = client.subscribe(&trips::list_trips(), &())?;
//!     let list = trips.settled().await?;
//!     println!("{} trips", list.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Mutations
//!
//! A successful mutation invalidates the tags its endpoint declares. Every
//! subscribed query providing one of those tags is refetched.
//!
//! ```no_run
//! use tripcache::api::trips::{self, TripIn};
//! use tripcache::endpoint::Request;
//! use tripcache::error::QueryError;
//! use tripcache::QueryClient;
//! use chrono::NaiveDate;
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QueryClient::new(|_request: Request| async {
//!         Ok::<Value, QueryError>(json!({}))
//!     })?;
//!
//!     let trip = TripIn {
//!         trip_name: "Lisbon".to_string(),
//!         destination: "Portugal".to_string(),
//!         start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
//!         end_date: NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
//!         num_people: 2,
//!     };
//!     let outcome = client.mutate(&trips::create_trip(), &trip).await?;
//!     println!("Refetched {} queries", outcome.invalidation.refetched.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod fetcher;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheStats, InvalidationEvent, InvalidationReason,
    MutationOutcome, QueryClient, QueryKey, QuerySnapshot, QueryStatus, QuerySubscription,
    QueryView, Tag, TagId, TagRule,
};
pub use endpoint::{BodyRule, Method, MutationEndpoint, QueryEndpoint, Request};
pub use error::{CacheError, QueryError, Result};
pub use fetcher::Fetcher;
