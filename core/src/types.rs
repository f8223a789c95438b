//! Small value types shared across the client.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier addressing a single record.
///
/// Most Pipedrive entities use integer ids; leads use UUID strings. The API
/// treats both as an opaque path segment, so this type only needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Num(u64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Num(n) => write!(f, "{n}"),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        ResourceId::Num(value)
    }
}

impl From<u32> for ResourceId {
    fn from(value: u32) -> Self {
        ResourceId::Num(u64::from(value))
    }
}

impl From<i64> for ResourceId {
    /// Negative values cannot be API ids; they are kept verbatim as text so
    /// the server rejects them rather than the client wrapping around.
    fn from(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(n) => ResourceId::Num(n),
            Err(_) => ResourceId::Text(value.to_string()),
        }
    }
}

impl From<i32> for ResourceId {
    fn from(value: i32) -> Self {
        ResourceId::from(i64::from(value))
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        ResourceId::Text(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        ResourceId::Text(value)
    }
}

impl From<Uuid> for ResourceId {
    fn from(value: Uuid) -> Self {
        ResourceId::Text(value.to_string())
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(value: &ResourceId) -> Self {
        value.clone()
    }
}

/// Pagination metadata found at `additional_data.pagination`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub more_items_in_collection: bool,
    #[serde(default)]
    pub next_start: u64,
}
