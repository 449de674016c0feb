//! Tags and the reverse tag index
//!
//! Query endpoints declare which tags their data *provides*; mutation
//! endpoints declare which tags they *invalidate*. The [`TagIndex`] links the
//! two without either side knowing about the other.
//!
//! Matching rules:
//! - an item tag (`Trip:7`) invalidates only queries that provided `Trip:7`
//! - a bare tag (`Trip`) invalidates every query that provided any `Trip` tag

use crate::cache::key::QueryKey;
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// 2^63, the first float outside the `i64` range
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Identifier part of an item tag, compared structurally
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagId {
    Int(i64),
    Str(String),
}

impl TagId {
    /// Extract an identifier from a JSON scalar.
    ///
    /// Integral floats such as `7.0` map to the same id as `7`. Unsigned ids
    /// beyond `i64::MAX` keep their decimal text. Fractional numbers are not
    /// identifiers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(id) = n.as_i64() {
                    Some(TagId::Int(id))
                } else if let Some(id) = n.as_u64() {
                    Some(TagId::Str(id.to_string()))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f))
                        .map(|f| TagId::Int(f as i64))
                }
            }
            Value::String(s) => Some(TagId::Str(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for TagId {
    fn from(id: i64) -> Self {
        TagId::Int(id)
    }
}

impl From<i32> for TagId {
    fn from(id: i32) -> Self {
        TagId::Int(id as i64)
    }
}

impl From<&str> for TagId {
    fn from(id: &str) -> Self {
        TagId::Str(id.to_string())
    }
}

impl From<String> for TagId {
    fn from(id: String) -> Self {
        TagId::Str(id)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagId::Int(id) => write!(f, "{}", id),
            TagId::Str(id) => write!(f, "{:?}", id),
        }
    }
}

/// A `(kind, optional id)` label linking providers and invalidators
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub id: Option<TagId>,
}

impl Tag {
    /// Bare tag, e.g. `TripList`
    pub fn list(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Item tag, e.g. `Trip:7`
    pub fn item(kind: impl Into<String>, id: impl Into<TagId>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    /// One item tag per element of a JSON array, keyed by `field`.
    /// Elements without a usable id are skipped.
    pub fn items_from(kind: &str, data: &Value, field: &str) -> Vec<Tag> {
        data.as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get(field).and_then(TagId::from_value))
                    .map(|id| Tag::item(kind, id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Inputs available to a derived tag rule
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    /// Response data, when the request succeeded
    pub result: Option<&'a Value>,
    /// Failure, when the request was rejected
    pub error: Option<&'a QueryError>,
    /// Serialized request arguments
    pub args: &'a Value,
}

/// Pure mapping from request outcome to tags
pub type TagFn = fn(&TagContext<'_>) -> Vec<Tag>;

/// How an endpoint computes the tags it provides or invalidates
#[derive(Debug, Clone, Default)]
pub enum TagRule {
    #[default]
    None,
    Static(Vec<Tag>),
    Derived(TagFn),
}

impl TagRule {
    /// Resolve the rule against one request outcome
    pub fn resolve(&self, ctx: &TagContext<'_>) -> Vec<Tag> {
        match self {
            TagRule::None => Vec::new(),
            TagRule::Static(tags) => tags.clone(),
            TagRule::Derived(rule) => rule(ctx),
        }
    }
}

impl From<Vec<Tag>> for TagRule {
    fn from(tags: Vec<Tag>) -> Self {
        TagRule::Static(tags)
    }
}

/// Reverse index from tags to the query keys that provided them.
///
/// Derived state: it can always be rebuilt from the provided tags recorded
/// on cache entries.
#[derive(Debug, Default)]
pub struct TagIndex {
    /// kind -> id (None for bare tags) -> keys
    by_tag: HashMap<String, HashMap<Option<TagId>, HashSet<QueryKey>>>,

    /// key -> tags it currently provides
    by_key: HashMap<QueryKey, HashSet<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from `(key, provided tags)` pairs
    pub fn rebuild<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a QueryKey, &'a HashSet<Tag>)>,
    {
        let mut index = Self::new();
        for (key, tags) in entries {
            index.set_provided_tags(key, tags.iter().cloned());
        }
        index
    }

    /// Replace the tag set associated with `key`
    pub fn set_provided_tags<I>(&mut self, key: &QueryKey, tags: I)
    where
        I: IntoIterator<Item = Tag>,
    {
        let new_tags: HashSet<Tag> = tags.into_iter().collect();
        let old_tags = self.by_key.remove(key).unwrap_or_default();

        for tag in old_tags.difference(&new_tags) {
            self.unlink(tag, key);
        }
        for tag in new_tags.difference(&old_tags) {
            self.by_tag
                .entry(tag.kind.clone())
                .or_default()
                .entry(tag.id.clone())
                .or_default()
                .insert(key.clone());
        }

        if !new_tags.is_empty() {
            self.by_key.insert(key.clone(), new_tags);
        }
    }

    /// Forget every tag association of `key`
    pub fn remove_key(&mut self, key: &QueryKey) {
        if let Some(tags) = self.by_key.remove(key) {
            for tag in &tags {
                self.unlink(tag, key);
            }
        }
    }

    /// Union of all keys registered under any of `tags`
    pub fn keys_for_tags<'a, I>(&self, tags: I) -> HashSet<QueryKey>
    where
        I: IntoIterator<Item = &'a Tag>,
    {
        let mut keys = HashSet::new();
        for tag in tags {
            let Some(by_id) = self.by_tag.get(&tag.kind) else {
                continue;
            };
            match &tag.id {
                None => {
                    for bucket in by_id.values() {
                        keys.extend(bucket.iter().cloned());
                    }
                }
                Some(_) => {
                    if let Some(bucket) = by_id.get(&tag.id) {
                        keys.extend(bucket.iter().cloned());
                    }
                }
            }
        }
        keys
    }

    /// Tags currently recorded for `key`
    pub fn tags_for_key(&self, key: &QueryKey) -> Option<&HashSet<Tag>> {
        self.by_key.get(key)
    }

    /// Number of keys providing at least one tag
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_tag.clear();
        self.by_key.clear();
    }

    fn unlink(&mut self, tag: &Tag, key: &QueryKey) {
        if let Some(by_id) = self.by_tag.get_mut(&tag.kind) {
            if let Some(bucket) = by_id.get_mut(&tag.id) {
                bucket.remove(key);
                if bucket.is_empty() {
                    by_id.remove(&tag.id);
                }
            }
            if by_id.is_empty() {
                self.by_tag.remove(&tag.kind);
            }
        }
    }
}
