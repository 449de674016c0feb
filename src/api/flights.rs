//! Flights booked for a trip

use crate::api::arg_id;
use crate::api::trips::TripOut;
use crate::cache::tags::{Tag, TagContext, TagRule};
use crate::endpoint::{BodyRule, Method, MutationEndpoint, QueryEndpoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const FLIGHT: &str = "Flight";
pub const FLIGHT_LIST: &str = "FlightList";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightIn {
    pub number: String,
    pub departure_location: String,
    pub arrival_location: String,
    pub departure_time: NaiveDate,
    pub arrival_time: NaiveDate,
    pub trip_id: i64,
}

/// A flight as returned by the API, with its trip embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOut {
    pub id: i64,
    pub departure_location: String,
    pub arrival_location: String,
    pub departure_time: NaiveDate,
    pub arrival_time: NaiveDate,
    pub trip: TripOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightUpdate {
    pub id: i64,
    pub flight: FlightIn,
}

pub fn list_flights() -> QueryEndpoint<(), Vec<FlightOut>> {
    QueryEndpoint::new("listFlights", "/api/flights").provides(TagRule::Derived(list_tags))
}

pub fn get_flight() -> QueryEndpoint<i64, FlightOut> {
    QueryEndpoint::new("getFlight", "/api/flights/{id}").provides(TagRule::Derived(flight_tag))
}

pub fn create_flight() -> MutationEndpoint<FlightIn, FlightOut> {
    MutationEndpoint::new("createFlight", Method::Post, "/api/flights")
        .body(BodyRule::Args)
        .invalidates(vec![Tag::list(FLIGHT_LIST)])
}

pub fn update_flight() -> MutationEndpoint<FlightUpdate, FlightOut> {
    MutationEndpoint::new("updateFlight", Method::Put, "/api/flights/{id}")
        .body(BodyRule::Field("flight"))
        .invalidates(TagRule::Derived(flight_tag))
}

pub fn delete_flight() -> MutationEndpoint<i64, bool> {
    MutationEndpoint::new("deleteFlight", Method::Delete, "/api/flights/{id}")
        .invalidates(TagRule::Derived(delete_tags))
}

fn list_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = vec![Tag::list(FLIGHT_LIST)];
    if let Some(flights) = ctx.result {
        tags.extend(Tag::items_from(FLIGHT, flights, "id"));
    }
    tags
}

fn flight_tag(ctx: &TagContext<'_>) -> Vec<Tag> {
    arg_id(ctx.args, "id")
        .map(|id| vec![Tag::item(FLIGHT, id)])
        .unwrap_or_default()
}

fn delete_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = vec![Tag::list(FLIGHT_LIST)];
    tags.extend(flight_tag(ctx));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_flight_path_and_tag() {
        let endpoint = get_flight();
        let args = json!(12);
        let tags = endpoint.provides.resolve(&TagContext {
            result: None,
            error: None,
            args: &args,
        });

        assert_eq!(tags, vec![Tag::item(FLIGHT, 12)]);
        assert_eq!(endpoint.descriptor.request(&args).unwrap().path, "/api/flights/12");
    }

    #[test]
    fn test_create_invalidates_listing() {
        let tags = create_flight().invalidates.resolve(&TagContext {
            result: Some(&json!({"id": 1})),
            error: None,
            args: &json!({}),
        });
        assert_eq!(tags, vec![Tag::list(FLIGHT_LIST)]);
    }
}
