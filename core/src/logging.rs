//! Per-call logging hooks.
//!
//! Every call produces a [`CallLog`] record. The client always emits a short
//! `debug` event; with `Config::debug` it also emits the bodies on the
//! `pipedrive::wire` target, and a configured [`CallLogger`] receives the
//! full record.

use serde::Serialize;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

const REDACTED: &str = "[REDACTED]";

/// Structured description of one request/response exchange.
#[derive(Debug, Clone, Serialize)]
pub struct CallLog<'a> {
    /// Entity segment the call was made for, e.g. `persons`.
    pub caller: &'a str,
    pub request: RequestLog<'a>,
    pub response: ResponseLog<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestLog<'a> {
    pub http_method: HttpMethod,
    /// Request URL with the token redacted.
    pub path: String,
    pub body: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseLog<'a> {
    pub code: u16,
    pub headers: &'a [(String, String)],
    pub data: &'a str,
}

impl<'a> CallLog<'a> {
    pub fn new(caller: &'a str, request: &'a HttpRequest, response: &'a HttpResponse) -> Self {
        Self {
            caller,
            request: RequestLog {
                http_method: request.method,
                path: redact_token(&request.path),
                body: request.body.as_deref(),
            },
            response: ResponseLog {
                code: response.status,
                headers: &response.headers,
                data: &response.body,
            },
        }
    }
}

/// Sink receiving a record for every call.
pub trait CallLogger: Send + Sync {
    fn log_call(&self, entry: &CallLog<'_>);
}

/// Forwards call records to `tracing` as JSON on the `pipedrive::calls` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCallLogger;

impl CallLogger for TracingCallLogger {
    fn log_call(&self, entry: &CallLog<'_>) {
        match serde_json::to_string(entry) {
            Ok(json) => tracing::info!(target: "pipedrive::calls", caller = entry.caller, "{json}"),
            Err(e) => tracing::warn!(target: "pipedrive::calls", error = %e, "failed to encode call log"),
        }
    }
}

/// Replace the value of the `api_token` query parameter.
pub fn redact_token(path: &str) -> String {
    let Some(start) = path.find("api_token=").map(|i| i + "api_token=".len()) else {
        return path.to_string();
    };
    let end = path[start..].find('&').map_or(path.len(), |i| start + i);
    format!("{}{REDACTED}{}", &path[..start], &path[end..])
}
