//! In-memory travel API used by the integration tests
//!
//! Responses reflect server state at the moment a request arrives and are
//! delivered after a fixed latency, so tests running on paused time can
//! mutate the backend while a fetch is in flight.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tripcache::endpoint::{Method, Request};
use tripcache::error::QueryError;
use tripcache::Fetcher;

#[derive(Default)]
struct Backend {
    trips: BTreeMap<i64, Value>,
    next_id: i64,
    calls: HashMap<String, usize>,
    /// endpoint -> (error, remaining failures)
    failures: HashMap<String, (QueryError, usize)>,
}

#[derive(Clone)]
pub struct MockApi {
    backend: Arc<Mutex<Backend>>,
    latency: Duration,
}

impl MockApi {
    pub fn new(latency: Duration) -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend {
                next_id: 1,
                ..Default::default()
            })),
            latency,
        }
    }

    /// Backend seeded with trips 7 and 8
    pub fn seeded(latency: Duration) -> Self {
        let api = Self::new(latency);
        api.insert_trip(7, "Kyoto");
        api.insert_trip(8, "Lisbon");
        api
    }

    pub fn insert_trip(&self, id: i64, name: &str) {
        let mut backend = self.backend.lock().unwrap();
        backend.trips.insert(id, trip_json(id, name));
        backend.next_id = backend.next_id.max(id + 1);
    }

    /// Change a trip behind the cache's back
    pub fn rename_trip(&self, id: i64, name: &str) {
        let mut backend = self.backend.lock().unwrap();
        if let Some(trip) = backend.trips.get_mut(&id) {
            trip["trip_name"] = json!(name);
        }
    }

    pub fn fail(&self, endpoint: &str, error: QueryError, times: usize) {
        self.backend
            .lock()
            .unwrap()
            .failures
            .insert(endpoint.to_string(), (error, times));
    }

    pub fn fail_always(&self, endpoint: &str, error: QueryError) {
        self.fail(endpoint, error, usize::MAX);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.backend
            .lock()
            .unwrap()
            .calls
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn fetcher(&self) -> impl Fetcher {
        let api = self.clone();
        move |request: Request| {
            let api = api.clone();
            async move { api.handle(request).await }
        }
    }

    async fn handle(&self, request: Request) -> Result<Value, QueryError> {
        let response = self.respond(&request);
        tokio::time::sleep(self.latency).await;
        response
    }

    fn respond(&self, request: &Request) -> Result<Value, QueryError> {
        let mut backend = self.backend.lock().unwrap();
        *backend.calls.entry(request.endpoint.clone()).or_insert(0) += 1;

        if let Some((error, remaining)) = backend.failures.get_mut(&request.endpoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }

        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["api", "trips"]) => Ok(Value::Array(backend.trips.values().cloned().collect())),
            (Method::Post, ["api", "trips"]) => {
                let id = backend.next_id;
                backend.next_id += 1;
                let mut trip = request.body.clone().unwrap_or_else(|| json!({}));
                trip["id"] = json!(id);
                backend.trips.insert(id, trip.clone());
                Ok(trip)
            }
            (Method::Get, ["api", "trips", id]) => {
                let id = parse_id(id)?;
                backend.trips.get(&id).cloned().ok_or_else(not_found)
            }
            (Method::Put, ["api", "trips", id]) => {
                let id = parse_id(id)?;
                if !backend.trips.contains_key(&id) {
                    return Err(not_found());
                }
                let mut trip = request.body.clone().unwrap_or_else(|| json!({}));
                trip["id"] = json!(id);
                backend.trips.insert(id, trip.clone());
                Ok(trip)
            }
            (Method::Delete, ["api", "trips", id]) => {
                let id = parse_id(id)?;
                Ok(json!(backend.trips.remove(&id).is_some()))
            }
            _ => Err(QueryError::ResponseError {
                status: 405,
                message: format!("{} {} not supported", request.method, request.path),
            }),
        }
    }
}

pub fn trip_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "trip_name": name,
        "destination": "Japan",
        "start_date": "2024-04-01",
        "end_date": "2024-04-10",
        "num_people": 2
    })
}

fn parse_id(segment: &str) -> Result<i64, QueryError> {
    segment.parse().map_err(|_| QueryError::ResponseError {
        status: 422,
        message: format!("invalid id: {}", segment),
    })
}

fn not_found() -> QueryError {
    QueryError::ResponseError {
        status: 404,
        message: "could not get that trip".to_string(),
    }
}
