//! Trips: the top-level resource every activity and flight hangs off

use crate::api::arg_id;
use crate::cache::tags::{Tag, TagContext, TagRule};
use crate::endpoint::{BodyRule, Method, MutationEndpoint, QueryEndpoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tag kind for a single trip
pub const TRIP: &str = "Trip";
/// Tag kind for trip listings
pub const TRIP_LIST: &str = "TripList";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripIn {
    pub trip_name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_people: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripOut {
    pub id: i64,
    pub trip_name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_people: i32,
}

/// Arguments for [`update_trip`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripUpdate {
    pub id: i64,
    pub trip: TripIn,
}

pub fn list_trips() -> QueryEndpoint<(), Vec<TripOut>> {
    QueryEndpoint::new("listTrips", "/api/trips").provides(TagRule::Derived(list_tags))
}

pub fn get_trip() -> QueryEndpoint<i64, TripOut> {
    QueryEndpoint::new("getTrip", "/api/trips/{id}").provides(TagRule::Derived(trip_tag))
}

pub fn create_trip() -> MutationEndpoint<TripIn, TripOut> {
    MutationEndpoint::new("createTrip", Method::Post, "/api/trips")
        .body(BodyRule::Args)
        .invalidates(vec![Tag::list(TRIP_LIST)])
}

pub fn update_trip() -> MutationEndpoint<TripUpdate, TripOut> {
    MutationEndpoint::new("updateTrip", Method::Put, "/api/trips/{id}")
        .body(BodyRule::Field("trip"))
        .invalidates(TagRule::Derived(trip_tag))
}

pub fn delete_trip() -> MutationEndpoint<i64, bool> {
    MutationEndpoint::new("deleteTrip", Method::Delete, "/api/trips/{id}")
        .invalidates(TagRule::Derived(delete_tags))
}

fn list_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = vec![Tag::list(TRIP_LIST)];
    if let Some(trips) = ctx.result {
        tags.extend(Tag::items_from(TRIP, trips, "id"));
    }
    tags
}

fn trip_tag(ctx: &TagContext<'_>) -> Vec<Tag> {
    arg_id(ctx.args, "id")
        .map(|id| vec![Tag::item(TRIP, id)])
        .unwrap_or_default()
}

fn delete_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = vec![Tag::list(TRIP_LIST)];
    tags.extend(trip_tag(ctx));
    tags
}
