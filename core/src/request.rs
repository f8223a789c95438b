//! Request building: URL layout, parameter encoding and the `ApiCall` builder.
//!
//! # Design
//! Pipedrive addresses everything as `/v1/{plural}[/{id}[/{action}]]`, with an
//! optional `:(field,...)` selector and the token in the query string. The
//! pure helpers here (`build_url`, `pluralize`, `build_request`) are free of
//! I/O; `ApiCall` collects the pieces and hands them to the client.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::Client;
use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::ResourceId;

pub const API_VERSION_PREFIX: &str = "/v1";

/// Build the relative URL for a call.
///
/// ```
/// use pipedrive_core::request::build_url;
///
/// let fields = vec!["a".to_string(), "b".to_string()];
/// assert_eq!(build_url("persons", Some("12"), &fields, "T"), "/v1/persons/12:(a,b)?api_token=T");
/// ```
pub fn build_url(segment: &str, id: Option<&str>, fields: &[String], token: &str) -> String {
    let mut url = format!("{API_VERSION_PREFIX}/{segment}");
    if let Some(id) = id {
        url.push('/');
        url.push_str(id);
    }
    if !fields.is_empty() {
        url.push_str(":(");
        url.push_str(&fields.join(","));
        url.push(')');
    }
    url.push_str("?api_token=");
    url.push_str(token);
    url
}

/// Plural API segment for an entity name.
///
/// `person` maps to `persons`, not `people`.
pub fn pluralize(name: &str) -> String {
    let name = name.to_lowercase();
    if name == "person" {
        return "persons".to_string();
    }
    if let Some(stem) = name.strip_suffix('y') {
        let after_consonant = stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if after_consonant {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| name.ends_with(suffix)) {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Turn serializable attributes into a JSON object of parameters.
pub(crate) fn to_params<S: Serialize + ?Sized>(attrs: &S) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(attrs)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::InvalidParams(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Encode GET parameters as `k=v&...`. Nested values are sent as their JSON text.
fn encode_query(params: &Map<String, Value>) -> Result<String, Error> {
    let pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Bool(b) => u8::from(*b).to_string(),
                other => other.to_string(),
            };
            (k.as_str(), v)
        })
        .collect();
    Ok(serde_urlencoded::to_string(pairs)?)
}

/// Everything needed to issue one API call, minus the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedCall {
    pub segment: String,
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub fields: Vec<String>,
    pub params: Map<String, Value>,
}

/// Validate a call and turn it into a wire request.
///
/// Fails with [`Error::MissingMethod`] before anything else is inspected.
pub fn build_request(config: &Config, call: &PreparedCall) -> Result<HttpRequest, Error> {
    let method = call.method.ok_or(Error::MissingMethod)?;

    let mut url = build_url(
        &call.segment,
        call.path.as_deref(),
        &call.fields,
        config.api_token(),
    );

    let body = if method == HttpMethod::Get {
        let query = encode_query(&call.params)?;
        if !query.is_empty() {
            url.push('&');
            url.push_str(&query);
        }
        None
    } else {
        Some(serde_json::to_string(&call.params)?)
    };

    Ok(HttpRequest {
        method,
        path: format!("{}{url}", config.base_url()),
        headers: vec![
            ("accept".to_string(), "application/json".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            ("user-agent".to_string(), config.user_agent().to_string()),
        ],
        body,
    })
}

/// Builder for a single call against one entity segment.
///
/// Obtained from [`Client::call`] or [`Resource::call`](crate::Resource::call).
pub struct ApiCall<'c, T: Transport> {
    client: &'c Client<T>,
    id: Option<ResourceId>,
    action: Option<Cow<'static, str>>,
    prepared: PreparedCall,
}

impl<'c, T: Transport> ApiCall<'c, T> {
    pub(crate) fn new(client: &'c Client<T>, segment: impl Into<String>) -> Self {
        Self {
            client,
            id: None,
            action: None,
            prepared: PreparedCall {
                segment: segment.into(),
                ..PreparedCall::default()
            },
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.prepared.method = Some(method);
        self
    }

    pub fn id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sub-path after the id (or after the segment when there is no id),
    /// e.g. `find` or `deals`.
    pub fn action(mut self, action: impl Into<Cow<'static, str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prepared.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.prepared.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.prepared.params.extend(params);
        self
    }

    /// Merge serializable attributes into the parameters.
    pub fn attributes<S: Serialize + ?Sized>(self, attrs: &S) -> Result<Self, Error> {
        let params = to_params(attrs)?;
        Ok(self.params(params))
    }

    pub fn into_prepared(self) -> PreparedCall {
        let mut prepared = self.prepared;
        prepared.path = match (self.id, self.action) {
            (Some(id), Some(action)) => Some(format!("{id}/{action}")),
            (Some(id), None) => Some(id.to_string()),
            (None, Some(action)) => Some(action.into_owned()),
            (None, None) => None,
        };
        prepared
    }

    pub fn send(self) -> Result<Envelope, Error> {
        let client = self.client;
        client.execute(&self.into_prepared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config::builder()
            .api_token("T")
            .base_url("https://api.example.test")
            .user_agent("ua/1")
            .build()
            .unwrap()
    }

    fn prepared(method: Option<HttpMethod>) -> PreparedCall {
        PreparedCall {
            segment: "bases".to_string(),
            method,
            ..PreparedCall::default()
        }
    }

    #[test]
    fn url_with_id_and_fields() {
        let fields = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_url("persons", Some("12"), &fields, "T"),
            "/v1/persons/12:(a,b)?api_token=T"
        );
    }

    #[test]
    fn url_without_id_or_fields() {
        assert_eq!(build_url("bases", None, &[], "token"), "/v1/bases?api_token=token");
        assert_eq!(
            build_url("bases", None, &["a".into(), "b".into(), "c".into()], "token"),
            "/v1/bases:(a,b,c)?api_token=token"
        );
    }

    #[test]
    fn pluralize_rules() {
        assert_eq!(pluralize("person"), "persons");
        assert_eq!(pluralize("Person"), "persons");
        assert_eq!(pluralize("organization"), "organizations");
        assert_eq!(pluralize("activity"), "activities");
        assert_eq!(pluralize("activitytype"), "activitytypes");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("base"), "bases");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("personfield"), "personfields");
    }

    #[test]
    fn missing_method_is_rejected() {
        let err = build_request(&config(), &prepared(None)).unwrap_err();
        assert!(matches!(err, Error::MissingMethod));
    }

    #[test]
    fn get_sends_params_in_query_and_no_body() {
        let mut call = prepared(Some(HttpMethod::Get));
        call.path = Some("find".to_string());
        call.params.insert("term".into(), json!("Ann Lee"));
        call.params.insert("start".into(), json!(10));
        call.params.insert("search_by_email".into(), json!(false));

        let req = build_request(&config(), &call).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "https://api.example.test/v1/bases/find?api_token=T&search_by_email=0&start=10&term=Ann+Lee"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn write_methods_send_json_body() {
        for method in [HttpMethod::Post, HttpMethod::Put] {
            let mut call = prepared(Some(method));
            call.path = Some("13".into());
            call.params.insert("test".into(), json!("bar"));
            let req = build_request(&config(), &call).unwrap();
            assert_eq!(req.path, "https://api.example.test/v1/bases/13?api_token=T");
            assert_eq!(req.body.as_deref(), Some(r#"{"test":"bar"}"#));
        }

        let req = build_request(&config(), &prepared(Some(HttpMethod::Delete))).unwrap();
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn default_headers_are_attached() {
        let req = build_request(&config(), &prepared(Some(HttpMethod::Get))).unwrap();
        assert_eq!(
            req.headers,
            vec![
                ("accept".to_string(), "application/json".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
                ("user-agent".to_string(), "ua/1".to_string()),
            ]
        );
    }

    #[test]
    fn non_object_attributes_are_rejected() {
        assert!(matches!(to_params(&[1, 2]), Err(Error::InvalidParams(_))));
        assert!(to_params(&json!({"name": "x"})).is_ok());
        assert!(to_params(&()).unwrap().is_empty());
    }
}
