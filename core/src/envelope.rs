//! Response normalization into success/failure envelopes.
//!
//! # Design
//! Every response, whatever its status, becomes an `Envelope`: the JSON body
//! as an object plus an explicit `success` flag. Failures additionally carry
//! `not_authorized`, `failed` and the response headers. Normalization is
//! total; a body that is empty or not a JSON object degrades to `{}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::HttpResponse;
use crate::types::Pagination;

const SUCCESS: &str = "success";
const NOT_AUTHORIZED: &str = "not_authorized";
const FAILED: &str = "failed";

/// Normalized API response.
///
/// Immutable once built: accessors only hand out shared references or
/// consume the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.flag(SUCCESS)
    }

    /// The API rejected the token (HTTP 401).
    pub fn is_not_authorized(&self) -> bool {
        self.flag(NOT_AUTHORIZED)
    }

    /// The API signalled a rate/enhance-your-calm failure (HTTP 420).
    pub fn is_failed(&self) -> bool {
        self.flag(FAILED)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `data` payload, treating JSON `null` as absent.
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data").filter(|v| !v.is_null())
    }

    /// Deserialize `data` into a caller-provided type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.0.get("data").unwrap_or(&Value::Null))
    }

    /// `additional_data.pagination`, if the page carries one.
    pub fn pagination(&self) -> Option<Pagination> {
        let raw = self.0.get("additional_data")?.get("pagination")?;
        Pagination::deserialize(raw).ok()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        Value::Object(envelope.0)
    }
}

/// Convert a raw response into an [`Envelope`]. Never fails.
pub fn normalize(response: &HttpResponse) -> Envelope {
    let mut body = parse_body(&response.body);

    if response.is_success() {
        body.insert(SUCCESS.to_string(), Value::Bool(true));
        return Envelope(body);
    }

    for (name, value) in &response.headers {
        body.insert(name.clone(), Value::String(value.clone()));
    }
    body.insert(SUCCESS.to_string(), Value::Bool(false));
    body.insert(NOT_AUTHORIZED.to_string(), Value::Bool(response.status == 401));
    body.insert(FAILED.to_string(), Value::Bool(response.status == 420));
    Envelope(body)
}

fn parse_body(body: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
