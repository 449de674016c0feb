//! Query key normalization
//!
//! A [`QueryKey`] identifies one `(endpoint, arguments)` pair. Arguments are
//! serialized to JSON with object keys sorted at every depth, so two argument
//! values that differ only in field order map to the same key.

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stable identifier for an `(endpoint, arguments)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    endpoint: String,
    args: String,
}

impl QueryKey {
    /// Build a key from an endpoint name and any serializable argument
    pub fn new<A: Serialize + ?Sized>(endpoint: &str, args: &A) -> Result<Self> {
        let value = serde_json::to_value(args).map_err(|e| {
            CacheError::SerializationError(format!(
                "cannot key arguments for {}: {}",
                endpoint, e
            ))
        })?;
        Ok(Self::from_value(endpoint, &value))
    }

    /// Build a key from already-serialized arguments
    pub fn from_value(endpoint: &str, args: &Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            args: canonical_json(args),
        }
    }

    /// Endpoint name this key belongs to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Canonical JSON form of the arguments
    pub fn args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Serialize a JSON value with object keys sorted recursively
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a plain string cannot fail
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_key_display() {
        let key = QueryKey::new("getTrip", &7).unwrap();
        assert_eq!(key.to_string(), "getTrip(7)");
        assert_eq!(key.endpoint(), "getTrip");
        assert_eq!(key.args(), "7");

        let key = QueryKey::new("listTrips", &()).unwrap();
        assert_eq!(key.to_string(), "listTrips(null)");
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = QueryKey::from_value("search", &json!({"city": "Lisbon", "days": 3}));
        let b = QueryKey::from_value("search", &json!({"days": 3, "city": "Lisbon"}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let value = json!({"b": [{"z": 1, "a": 2}], "a": {"y": null, "x": "s"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"x":"s","y":null},"b":[{"a":2,"z":1}]}"#
        );
    }

    #[test]
    fn test_different_endpoints_differ() {
        let a = QueryKey::new("getTrip", &7).unwrap();
        let b = QueryKey::new("getFlight", &7).unwrap();
        assert_ne!(a, b);

        let c = QueryKey::new("getTrip", &"7").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_unserializable_args_are_rejected() {
        let mut args = HashMap::new();
        args.insert((1, 2), "tuple keys are not valid JSON object keys");

        let result = QueryKey::new("broken", &args);
        assert!(matches!(result, Err(CacheError::SerializationError(_))));
    }
}
