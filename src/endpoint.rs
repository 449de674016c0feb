//! Endpoint definitions
//!
//! An endpoint is pure configuration: a descriptor telling the fetcher what
//! request to make, plus a tag rule telling the cache what the response
//! provides (queries) or invalidates (mutations). Endpoint authors never
//! touch the cache directly.

use crate::cache::tags::TagRule;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// HTTP-style method carried to the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Patch => write!(f, "PATCH"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// How the request body is built from the arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyRule {
    #[default]
    None,
    /// The whole argument value
    Args,
    /// One field of an object argument
    Field(&'static str),
}

/// Static description of one remote endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub method: Method,
    /// Path template with `{placeholder}` segments
    pub path: &'static str,
    pub body: BodyRule,
}

impl EndpointDescriptor {
    pub const fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            body: BodyRule::None,
        }
    }

    pub const fn with_body(mut self, body: BodyRule) -> Self {
        self.body = body;
        self
    }

    /// Build the concrete request for one set of arguments
    pub fn request(&self, args: &Value) -> Result<Request> {
        let path = resolve_path(self.name, self.path, args)?;
        let body = match self.body {
            BodyRule::None => None,
            BodyRule::Args => Some(args.clone()),
            BodyRule::Field(field) => Some(args.get(field).cloned().ok_or_else(|| {
                CacheError::SerializationError(format!(
                    "{}: body field '{}' missing from arguments",
                    self.name, field
                ))
            })?),
        };

        Ok(Request {
            endpoint: self.name.to_string(),
            method: self.method,
            path,
            body,
        })
    }
}

/// A fully resolved request handed to the fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub endpoint: String,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Request {
    /// Absolute URL against a base such as `http://localhost:8000`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }
}

fn resolve_path(endpoint: &str, template: &str, args: &Value) -> Result<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let end = rest[start..].find('}').map(|i| start + i).ok_or_else(|| {
            CacheError::SerializationError(format!(
                "{}: unterminated placeholder in '{}'",
                endpoint, template
            ))
        })?;
        let name = &rest[start + 1..end];

        let value = match args {
            Value::Object(fields) => fields.get(name),
            scalar => Some(scalar),
        };
        let segment = match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => {
                return Err(CacheError::SerializationError(format!(
                    "{}: no value for path placeholder '{}'",
                    endpoint, name
                )))
            }
        };

        path.push_str(&rest[..start]);
        path.push_str(&segment);
        rest = &rest[end + 1..];
    }
    path.push_str(rest);

    Ok(path)
}

/// A query endpoint bound to concrete arguments.
///
/// Kept on the cache entry so invalidation can refetch without the caller.
#[derive(Debug, Clone)]
pub struct BoundQuery {
    pub request: Request,
    pub args: Value,
    pub provides: TagRule,
}

impl BoundQuery {
    pub fn new(descriptor: &EndpointDescriptor, args: Value, provides: TagRule) -> Result<Self> {
        let request = descriptor.request(&args)?;
        Ok(Self {
            request,
            args,
            provides,
        })
    }
}

/// Read endpoint: arguments `A`, response `T`
pub struct QueryEndpoint<A, T> {
    pub descriptor: EndpointDescriptor,
    pub provides: TagRule,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T> QueryEndpoint<A, T> {
    /// GET endpoint at `path`
    pub fn new(name: &'static str, path: &'static str) -> Self {
        Self {
            descriptor: EndpointDescriptor::new(name, Method::Get, path),
            provides: TagRule::None,
            _marker: PhantomData,
        }
    }

    pub fn provides(mut self, rule: impl Into<TagRule>) -> Self {
        self.provides = rule.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }
}

impl<A, T> Clone for QueryEndpoint<A, T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            provides: self.provides.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, T> fmt::Debug for QueryEndpoint<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEndpoint")
            .field("descriptor", &self.descriptor)
            .field("provides", &self.provides)
            .finish()
    }
}

/// Write endpoint: arguments `A`, response `T`
pub struct MutationEndpoint<A, T> {
    pub descriptor: EndpointDescriptor,
    pub invalidates: TagRule,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T> MutationEndpoint<A, T> {
    pub fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            descriptor: EndpointDescriptor::new(name, method, path),
            invalidates: TagRule::None,
            _marker: PhantomData,
        }
    }

    pub fn body(mut self, body: BodyRule) -> Self {
        self.descriptor.body = body;
        self
    }

    pub fn invalidates(mut self, rule: impl Into<TagRule>) -> Self {
        self.invalidates = rule.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }
}

impl<A, T> Clone for MutationEndpoint<A, T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            invalidates: self.invalidates.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, T> fmt::Debug for MutationEndpoint<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationEndpoint")
            .field("descriptor", &self.descriptor)
            .field("invalidates", &self.invalidates)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_placeholder() {
        let descriptor = EndpointDescriptor::new("getTrip", Method::Get, "/api/trips/{id}");
        let request = descriptor.request(&json!(7)).unwrap();
        assert_eq!(request.path, "/api/trips/7");
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_object_placeholders_and_field_body() {
        let descriptor = EndpointDescriptor::new(
            "updateActivity",
            Method::Put,
            "/api/trips/{trip_id}/activities/{id}",
        )
        .with_body(BodyRule::Field("activity"));

        let args = json!({"trip_id": 3, "id": "a1", "activity": {"activity_name": "Museum"}});
        let request = descriptor.request(&args).unwrap();
        assert_eq!(request.path, "/api/trips/3/activities/a1");
        assert_eq!(request.body, Some(json!({"activity_name": "Museum"})));
        assert_eq!(request.url("http://localhost:8000/"), "http://localhost:8000/api/trips/3/activities/a1");
    }

    #[test]
    fn test_missing_placeholder_is_serialization_error() {
        let descriptor = EndpointDescriptor::new("getTrip", Method::Get, "/api/trips/{id}");
        let result = descriptor.request(&json!({"trip": 1}));
        assert!(matches!(result, Err(CacheError::SerializationError(_))));

        let result = descriptor.request(&Value::Null);
        assert!(matches!(result, Err(CacheError::SerializationError(_))));
    }

    #[test]
    fn test_missing_body_field_is_serialization_error() {
        let descriptor = EndpointDescriptor::new("createTrip", Method::Post, "/api/trips")
            .with_body(BodyRule::Field("trip"));
        assert!(descriptor.request(&json!({})).is_err());
    }

    #[test]
    fn test_args_body() {
        let endpoint: MutationEndpoint<Value, Value> =
            MutationEndpoint::new("createTrip", Method::Post, "/api/trips").body(BodyRule::Args);
        let request = endpoint.descriptor.request(&json!({"trip_name": "Rome"})).unwrap();
        assert_eq!(request.path, "/api/trips");
        assert_eq!(request.body, Some(json!({"trip_name": "Rome"})));
        assert_eq!(request.method.to_string(), "POST");
    }
}
