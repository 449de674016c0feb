//! Trip Planner Demo Application
//!
//! Drives the query cache against an in-memory travel API and logs what the
//! cache does: deduplicated fetches, tag invalidation after mutations and
//! garbage collection of unused entries.
//!
//! Usage:
//!   cargo run --example trip_planner
//!
//! Environment variables:
//!   RUST_LOG                  - log filter (default: info,tripcache=debug)
//!   TRAVEL_API_URL            - base URL shown in request logs (default: http://localhost:8000)
//!   TRIPCACHE_GC_DELAY_MS     - delay before unused entries are evicted (default here: 1000)
//!   TRIPCACHE_MAX_RETRIES     - retries for transient query failures

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tripcache::api::activities::{self, ActivityIn, NewActivity, TripScope};
use tripcache::api::trips::{self, TripIn, TripUpdate};
use tripcache::cache::{ApiConfig, CacheConfig};
use tripcache::endpoint::{Method, Request};
use tripcache::error::QueryError;
use tripcache::QueryClient;

/// Minimal stand-in for the travel API
#[derive(Default)]
struct TravelApi {
    trips: BTreeMap<i64, Value>,
    activities: BTreeMap<i64, Vec<Value>>,
    next_id: i64,
}

impl TravelApi {
    fn handle(&mut self, request: &Request) -> Result<Value, QueryError> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        let body = request.body.clone().unwrap_or_else(|| json!({}));

        match (request.method, segments.as_slice()) {
            (Method::Get, ["api", "trips"]) => Ok(Value::Array(self.trips.values().cloned().collect())),
            (Method::Post, ["api", "trips"]) => {
                let id = self.allocate_id();
                let trip = with_id(body, id);
                self.trips.insert(id, trip.clone());
                Ok(trip)
            }
            (Method::Get, ["api", "trips", id]) => {
                let id = parse_id(id)?;
                self.trips.get(&id).cloned().ok_or_else(|| not_found("trip"))
            }
            (Method::Put, ["api", "trips", id]) => {
                let id = parse_id(id)?;
                if !self.trips.contains_key(&id) {
                    return Err(not_found("trip"));
                }
                let trip = with_id(body, id);
                self.trips.insert(id, trip.clone());
                Ok(trip)
            }
            (Method::Get, ["api", "trips", trip_id, "activities"]) => {
                let trip_id = parse_id(trip_id)?;
                Ok(Value::Array(
                    self.activities.get(&trip_id).cloned().unwrap_or_default(),
                ))
            }
            (Method::Post, ["api", "trips", trip_id, "activities"]) => {
                let trip_id = parse_id(trip_id)?;
                let id = self.allocate_id();
                let activity = with_id(body, id);
                self.activities
                    .entry(trip_id)
                    .or_default()
                    .push(activity.clone());
                Ok(activity)
            }
            _ => Err(QueryError::ResponseError {
                status: 404,
                message: format!("no route for {} {}", request.method, request.path),
            }),
        }
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn with_id(mut value: Value, id: i64) -> Value {
    value["id"] = json!(id);
    value
}

fn parse_id(segment: &str) -> Result<i64, QueryError> {
    segment.parse().map_err(|_| QueryError::ResponseError {
        status: 422,
        message: format!("invalid id: {}", segment),
    })
}

fn not_found(what: &str) -> QueryError {
    QueryError::ResponseError {
        status: 404,
        message: format!("could not get that {}", what),
    }
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow::anyhow!("invalid date {}-{}-{}", year, month, day))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tripcache=debug")),
        )
        .init();

    info!("=== Trip Planner Cache Demo ===");

    let api_config = ApiConfig::from_env();
    let mut cache_config = CacheConfig::from_env()?;
    if std::env::var("TRIPCACHE_GC_DELAY_MS").is_err() {
        // Keep the demo short
        cache_config.gc_delay = Duration::from_secs(1);
    }
    info!("API base URL: {}", api_config.base_url);

    let backend = Arc::new(Mutex::new(TravelApi::default()));
    let base_url = api_config.base_url.clone();
    let fetcher = {
        let backend = backend.clone();
        move |request: Request| {
            let backend = backend.clone();
            let url = request.url(&base_url);
            async move {
                info!("→ {} {}", request.method, url);
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut api = backend
                    .lock()
                    .map_err(|_| QueryError::NetworkError("backend unavailable".to_string()))?;
                api.handle(&request)
            }
        }
    };

    let client = QueryClient::with_config(fetcher, cache_config)?;

    info!("\n--- Deduplicated subscriptions ---");
    let mut list = client.subscribe(&trips::list_trips(), &())?;
    let mut sidebar = client.subscribe(&trips::list_trips(), &())?;
    info!("Trips: {}", list.settled().await?.len());
    info!("Sidebar sees {} trips", sidebar.settled().await?.len());

    info!("\n--- Create trip ---");
    let created = client
        .mutate(
            &trips::create_trip(),
            &TripIn {
                trip_name: "Spring in Kyoto".to_string(),
                destination: "Japan".to_string(),
                start_date: date(2024, 4, 1)?,
                end_date: date(2024, 4, 10)?,
                num_people: 2,
            },
        )
        .await?;
    info!(
        "Created trip {} ({} queries refetched)",
        created.data.id,
        created.invalidation.refetched.len()
    );
    info!("Trips after create: {}", list.settled().await?.len());

    info!("\n--- Update trip ---");
    let mut detail = client.subscribe(&trips::get_trip(), &created.data.id)?;
    info!("Detail: {}", detail.settled().await?.trip_name);

    let update = TripUpdate {
        id: created.data.id,
        trip: TripIn {
            trip_name: "Kyoto with friends".to_string(),
            destination: "Japan".to_string(),
            start_date: date(2024, 4, 1)?,
            end_date: date(2024, 4, 12)?,
            num_people: 4,
        },
    };
    let updated = client.mutate(&trips::update_trip(), &update).await?;
    info!("Invalidated: {:?}", updated.invalidation.keys);
    info!("Detail after update: {}", detail.settled().await?.trip_name);

    info!("\n--- Activities ---");
    let scope = TripScope {
        trip_id: created.data.id,
    };
    let mut plan = client.subscribe(&activities::list_activities(), &scope)?;
    info!("Activities: {}", plan.settled().await?.len());
    client
        .mutate(
            &activities::create_activity(),
            &NewActivity {
                trip_id: created.data.id,
                activity: ActivityIn {
                    activity_name: "Fushimi Inari".to_string(),
                    activity_address: "68 Fukakusa Yabunouchicho".to_string(),
                    longitude: 135.7727,
                    latitude: 34.9671,
                    rating: 4.8,
                    picture_url: "https://example.com/inari.jpg".to_string(),
                    hotel_distance: 3.2,
                },
            },
        )
        .await?;
    info!("Activities after create: {}", plan.settled().await?.len());

    info!("\n--- Garbage collection ---");
    drop(sidebar);
    drop(list);
    drop(detail);
    drop(plan);
    let gc_delay = client.config().gc_delay;
    info!("All subscriptions released, waiting {:?}", gc_delay);
    tokio::time::sleep(gc_delay + Duration::from_millis(100)).await;

    let stats = client.stats();
    info!("{}", stats);
    info!("Dedup rate: {:.1}%", stats.dedup_rate());

    client.shutdown();
    info!("=== Demo Complete ===");
    Ok(())
}
