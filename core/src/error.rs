//! Error types for the Pipedrive client.
//!
//! # Design
//! Only failures that happen on our side of the wire are errors: bad
//! configuration, an incomplete call, a payload we cannot encode, or a
//! transport that gave up after the retry policy. Any HTTP status the API
//! returns, including 401 and 5xx, is surfaced as a failure `Envelope`
//! instead, so callers branch on `Envelope::is_success`.

use thiserror::Error;

/// Errors returned by client, resource and pagination operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The API token is empty or whitespace.
    #[error("api_token should be set")]
    MissingApiToken,

    /// An `ApiCall` was sent without an HTTP method.
    #[error("method param missing")]
    MissingMethod,

    /// A name search was started with a blank term.
    #[error("term is missing")]
    MissingSearchTerm,

    /// Request attributes did not serialize to a JSON object.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("query encoding failed: {0}")]
    QueryEncoding(#[from] serde_urlencoded::ser::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures reported by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connecting or waiting for the response timed out.
    #[error("request timed out")]
    Timeout,

    /// The response arrived but its body could not be decoded.
    #[error("response could not be parsed: {0}")]
    Parse(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Other(String),
}
