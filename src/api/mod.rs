//! Travel planner API slices
//!
//! Each slice defines the endpoints of one resource and the tags they
//! provide or invalidate. Endpoint constructors are cheap; build them where
//! they are used.

pub mod accounts;
pub mod activities;
pub mod flights;
pub mod trips;

use crate::cache::tags::TagId;
use serde_json::Value;

/// Identifier at `field` of an object argument, or the argument itself
/// when it is a scalar
pub(crate) fn arg_id(args: &Value, field: &str) -> Option<TagId> {
    match args {
        Value::Object(fields) => fields.get(field).and_then(TagId::from_value),
        scalar => TagId::from_value(scalar),
    }
}
