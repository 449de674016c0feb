//! Activities planned within a trip
//!
//! Activity listings are scoped per trip: `list_activities` provides
//! `ActivityList:<trip_id>`, so creating an activity in one trip leaves the
//! other trips' listings alone. Invalidating the bare `ActivityList` tag
//! still reaches every listing.

use crate::api::arg_id;
use crate::cache::tags::{Tag, TagContext, TagRule};
use crate::endpoint::{BodyRule, Method, MutationEndpoint, QueryEndpoint};
use serde::{Deserialize, Serialize};

pub const ACTIVITY: &str = "Activity";
pub const ACTIVITY_LIST: &str = "ActivityList";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityIn {
    pub activity_name: String,
    pub activity_address: String,
    pub longitude: f64,
    pub latitude: f64,
    pub rating: f64,
    pub picture_url: String,
    pub hotel_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOut {
    pub id: i64,
    pub activity_name: String,
    pub activity_address: String,
    pub longitude: f64,
    pub latitude: f64,
    pub rating: f64,
    pub picture_url: String,
    pub hotel_distance: f64,
}

/// Trip whose activities are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TripScope {
    pub trip_id: i64,
}

/// One activity of one trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityRef {
    pub trip_id: i64,
    pub activity_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewActivity {
    pub trip_id: i64,
    pub activity: ActivityIn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityUpdate {
    pub trip_id: i64,
    pub activity_id: i64,
    pub activity: ActivityIn,
}

pub fn list_activities() -> QueryEndpoint<TripScope, Vec<ActivityOut>> {
    QueryEndpoint::new("listActivities", "/api/trips/{trip_id}/activities")
        .provides(TagRule::Derived(list_tags))
}

pub fn get_activity() -> QueryEndpoint<ActivityRef, ActivityOut> {
    QueryEndpoint::new(
        "getActivity",
        "/api/trips/{trip_id}/activities/{activity_id}",
    )
    .provides(TagRule::Derived(activity_tag))
}

pub fn create_activity() -> MutationEndpoint<NewActivity, ActivityOut> {
    MutationEndpoint::new(
        "createActivity",
        Method::Post,
        "/api/trips/{trip_id}/activities",
    )
    .body(BodyRule::Field("activity"))
    .invalidates(TagRule::Derived(trip_list_tag))
}

pub fn update_activity() -> MutationEndpoint<ActivityUpdate, ActivityOut> {
    MutationEndpoint::new(
        "updateActivity",
        Method::Put,
        "/api/trips/{trip_id}/activities/{activity_id}",
    )
    .body(BodyRule::Field("activity"))
    .invalidates(TagRule::Derived(activity_tag))
}

pub fn delete_activity() -> MutationEndpoint<ActivityRef, bool> {
    MutationEndpoint::new(
        "deleteActivity",
        Method::Delete,
        "/api/trips/{trip_id}/activities/{activity_id}",
    )
    .invalidates(TagRule::Derived(delete_tags))
}

fn trip_list_tag(ctx: &TagContext<'_>) -> Vec<Tag> {
    arg_id(ctx.args, "trip_id")
        .map(|trip_id| vec![Tag::item(ACTIVITY_LIST, trip_id)])
        .unwrap_or_default()
}

fn list_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = trip_list_tag(ctx);
    if let Some(activities) = ctx.result {
        tags.extend(Tag::items_from(ACTIVITY, activities, "id"));
    }
    tags
}

fn activity_tag(ctx: &TagContext<'_>) -> Vec<Tag> {
    arg_id(ctx.args, "activity_id")
        .map(|id| vec![Tag::item(ACTIVITY, id)])
        .unwrap_or_default()
}

fn delete_tags(ctx: &TagContext<'_>) -> Vec<Tag> {
    let mut tags = trip_list_tag(ctx);
    tags.extend(activity_tag(ctx));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn resolve(rule: &TagRule, result: Option<&Value>, args: Value) -> Vec<Tag> {
        rule.resolve(&TagContext {
            result,
            error: None,
            args: &args,
        })
    }

    #[test]
    fn test_list_is_scoped_to_trip() {
        let endpoint = list_activities();
        let args = serde_json::to_value(TripScope { trip_id: 4 }).unwrap();
        let data = json!([{"id": 11}]);

        assert_eq!(
            resolve(&endpoint.provides, Some(&data), args.clone()),
            vec![Tag::item(ACTIVITY_LIST, 4), Tag::item(ACTIVITY, 11)]
        );
        assert_eq!(
            endpoint.descriptor.request(&args).unwrap().path,
            "/api/trips/4/activities"
        );
    }

    #[test]
    fn test_create_sends_activity_body() {
        let endpoint = create_activity();
        let args = json!({"trip_id": 4, "activity": {"activity_name": "Museum"}});
        let request = endpoint.descriptor.request(&args).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(json!({"activity_name": "Museum"})));
        assert_eq!(
            resolve(&endpoint.invalidates, None, args),
            vec![Tag::item(ACTIVITY_LIST, 4)]
        );
    }

    #[test]
    fn test_delete_invalidates_listing_and_item() {
        let args = json!({"trip_id": 4, "activity_id": 11});
        assert_eq!(
            resolve(&delete_activity().invalidates, Some(&json!(true)), args),
            vec![Tag::item(ACTIVITY_LIST, 4), Tag::item(ACTIVITY, 11)]
        );
    }
}
