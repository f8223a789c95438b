//! Synchronous client for the Pipedrive CRM REST API.
//!
//! # Overview
//! Each Pipedrive entity (persons, organizations, deals, leads, ...) is a
//! [`Resource`] offering create/read/update/delete calls. Every response is
//! normalized into an [`Envelope`] carrying an explicit `success` flag, and
//! list endpoints are walked lazily through [`Paginated`].
//!
//! # Design
//! - `Client` owns a validated `Config` and one `Transport`; resources borrow
//!   the client.
//! - Requests are plain data (`HttpRequest`) built by `request::build_request`,
//!   so URL layout and encoding are testable without a network.
//! - Non-2xx statuses are failure envelopes, never `Err`. `Err` is reserved
//!   for configuration problems and transport failures that outlived the
//!   retry policy.
//!
//! ```no_run
//! use pipedrive_core::{Client, Config};
//!
//! let client = Client::new(Config::builder().api_token("token").build()?);
//! let person = client.persons().find(42u64)?;
//! if person.is_success() {
//!     println!("{:?}", person.data());
//! }
//! for entry in &client.deals().each() {
//!     println!("{:?}", entry?);
//! }
//! # Ok::<(), pipedrive_core::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod pagination;
pub mod request;
pub mod resource;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{Config, ConfigBuilder, Setup};
pub use entities::*;
pub use envelope::{normalize, Envelope};
pub use error::{Error, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use logging::{CallLog, CallLogger, TracingCallLogger};
pub use pagination::{Entry, Paginated};
pub use request::ApiCall;
pub use resource::{Create, Delete, Entity, Read, Resource, Update};
pub use transport::{Transport, UreqTransport};
pub use types::{Pagination, ResourceId};
