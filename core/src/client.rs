//! Pipedrive API client: request execution, retries and logging.
//!
//! # Design
//! `Client` owns a validated `Config` and a single transport reused by every
//! resource. Executing a call is a fixed pipeline: `request::build_request`
//! produces an `HttpRequest`, the transport sends it under the retry policy,
//! the exchange is logged, and `envelope::normalize` turns the response into
//! an `Envelope`. HTTP statuses never become `Err`; only configuration
//! problems and exhausted transport retries do.

use std::thread;

use crate::config::Config;
use crate::entities::{
    Activity, ActivityType, Deal, DealField, File, Filter, Goal, Lead, LeadLabel, Note,
    Organization, OrganizationField, Person, PersonField, Pipeline, Product, ProductField, Role,
    Stage, User,
};
use crate::envelope::{normalize, Envelope};
use crate::error::{Error, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{redact_token, CallLog};
use crate::request::{build_request, ApiCall, PreparedCall};
use crate::resource::{Entity, Resource};
use crate::transport::{Transport, UreqTransport};

/// Synchronous client for the Pipedrive REST API.
#[derive(Debug)]
pub struct Client<T: Transport = UreqTransport> {
    config: Config,
    transport: T,
}

impl Client<UreqTransport> {
    /// Build a client using the blocking `ureq` transport.
    pub fn new(config: Config) -> Self {
        let transport = UreqTransport::from_config(&config);
        Self { config, transport }
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Raw call against any entity segment.
    pub fn call(&self, segment: impl Into<String>) -> ApiCall<'_, T> {
        ApiCall::new(self, segment)
    }

    pub fn resource<E: Entity>(&self) -> Resource<'_, E, T> {
        Resource::new(self)
    }

    pub(crate) fn execute(&self, call: &PreparedCall) -> Result<Envelope, Error> {
        let request = build_request(&self.config, call)?;
        let response = self.send_with_retry(&request)?;
        self.log(&call.segment, &request, &response);
        Ok(normalize(&response))
    }

    /// Send once, retrying timeouts (unbounded unless capped in `Config`)
    /// and a single parse failure after `Config::parse_retry_delay`.
    fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let mut timeouts: u32 = 0;
        let mut parse_retried = false;
        loop {
            match self.transport.send(request) {
                Ok(response) => return Ok(response),
                Err(TransportError::Timeout) => {
                    if self.config.timeout_retries().is_some_and(|max| timeouts >= max) {
                        return Err(TransportError::Timeout.into());
                    }
                    timeouts = timeouts.saturating_add(1);
                    tracing::warn!(
                        method = %request.method,
                        path = %redact_token(&request.path),
                        attempt = timeouts,
                        "request timed out, retrying"
                    );
                }
                Err(TransportError::Parse(reason)) if !parse_retried => {
                    parse_retried = true;
                    tracing::warn!(
                        method = %request.method,
                        path = %redact_token(&request.path),
                        %reason,
                        delay_ms = self.config.parse_retry_delay().as_millis() as u64,
                        "response could not be parsed, retrying once"
                    );
                    thread::sleep(self.config.parse_retry_delay());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn log(&self, segment: &str, request: &HttpRequest, response: &HttpResponse) {
        tracing::debug!(
            method = %request.method,
            path = %redact_token(&request.path),
            status = response.status,
            "pipedrive api call"
        );

        if self.config.debug() {
            tracing::info!(
                target: "pipedrive::wire",
                caller = segment,
                method = %request.method,
                path = %redact_token(&request.path),
                request_body = request.body.as_deref().unwrap_or(""),
                status = response.status,
                response_body = %response.body,
            );
        }

        if let Some(logger) = self.config.logger() {
            logger.log_call(&CallLog::new(segment, request, response));
        }
    }
}

macro_rules! accessors {
    ($($method:ident => $entity:ty),* $(,)?) => {
        impl<T: Transport> Client<T> {
            $(
                pub fn $method(&self) -> Resource<'_, $entity, T> {
                    self.resource::<$entity>()
                }
            )*
        }
    };
}

accessors! {
    activities => Activity,
    activity_types => ActivityType,
    deals => Deal,
    deal_fields => DealField,
    files => File,
    filters => Filter,
    goals => Goal,
    leads => Lead,
    lead_labels => LeadLabel,
    notes => Note,
    organizations => Organization,
    organization_fields => OrganizationField,
    persons => Person,
    person_fields => PersonField,
    pipelines => Pipeline,
    products => Product,
    product_fields => ProductField,
    roles => Role,
    stages => Stage,
    users => User,
}
