//! Generic entity resources and their per-operation capabilities.
//!
//! # Design
//! An entity is a zero-sized marker type implementing [`Entity`]. What a
//! resource can do is decided by which capability traits the marker
//! implements: `Resource<E>` only has `create` when `E: Create`, `find` and
//! `each` when `E: Read`, and so on. Adding an entity is a marker type plus
//! the capability impls it supports.

use std::marker::PhantomData;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::Client;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::http::HttpMethod;
use crate::pagination::{Entry, Paginated};
use crate::request::{pluralize, to_params, ApiCall};
use crate::transport::{Transport, UreqTransport};
use crate::types::ResourceId;

/// A Pipedrive domain noun.
pub trait Entity: 'static {
    /// Singular, lowercase name, e.g. `person`.
    const NAME: &'static str;

    /// Path segment under `/v1`.
    fn segment() -> String {
        pluralize(Self::NAME)
    }
}

pub trait Create: Entity {}
pub trait Read: Entity {}
pub trait Update: Entity {}
pub trait Delete: Entity {}

/// Operations on one entity type, bound to a client.
pub struct Resource<'c, E, T: Transport = UreqTransport> {
    pub(crate) client: &'c Client<T>,
    entity: PhantomData<E>,
}

impl<E, T: Transport> Clone for Resource<'_, E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T: Transport> Copy for Resource<'_, E, T> {}

impl<'c, E: Entity, T: Transport> Resource<'c, E, T> {
    pub(crate) fn new(client: &'c Client<T>) -> Self {
        Self {
            client,
            entity: PhantomData,
        }
    }

    pub fn segment(&self) -> String {
        E::segment()
    }

    /// Start a raw call against this entity's segment.
    pub fn call(&self) -> ApiCall<'c, T> {
        self.client.call(E::segment())
    }
}

impl<'c, E: Create, T: Transport> Resource<'c, E, T> {
    pub fn create<A: Serialize + ?Sized>(&self, attrs: &A) -> Result<Envelope, Error> {
        self.call().method(HttpMethod::Post).attributes(attrs)?.send()
    }
}

impl<'c, E: Read, T: Transport> Resource<'c, E, T> {
    pub fn find(&self, id: impl Into<ResourceId>) -> Result<Envelope, Error> {
        self.call().method(HttpMethod::Get).id(id).send()
    }

    /// Fetch one record, asking the API for only the listed fields.
    pub fn find_with_fields<I, S>(&self, id: impl Into<ResourceId>, fields: I) -> Result<Envelope, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call().method(HttpMethod::Get).id(id).fields(fields).send()
    }

    /// One page of the collection starting at `start`.
    pub fn chunk(&self, start: u64) -> Result<Envelope, Error> {
        self.page(start, Map::new())
    }

    /// One page with extra list parameters such as `filter_id` or `sort`.
    /// `start` wins over a `start` key in `params`.
    pub fn chunk_with<A: Serialize + ?Sized>(&self, start: u64, params: &A) -> Result<Envelope, Error> {
        self.page(start, to_params(params)?)
    }

    /// Every record of the collection, fetched page by page on demand.
    pub fn each(&self) -> Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c> {
        self.pages(Map::new())
    }

    /// Like [`Resource::each`], sending `params` with every page request.
    pub fn each_with<A: Serialize + ?Sized>(
        &self,
        params: &A,
    ) -> Result<Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c>, Error> {
        Ok(self.pages(to_params(params)?))
    }

    /// Materialize [`Resource::each`].
    pub fn all(&self) -> Result<Vec<Entry>, Error> {
        self.each().all()
    }

    pub fn all_with<A: Serialize + ?Sized>(&self, params: &A) -> Result<Vec<Entry>, Error> {
        self.each_with(params)?.all()
    }

    fn page(&self, start: u64, params: Map<String, Value>) -> Result<Envelope, Error> {
        self.call()
            .method(HttpMethod::Get)
            .params(params)
            .param("start", start)
            .send()
    }

    fn pages(&self, params: Map<String, Value>) -> Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c> {
        let resource = *self;
        Paginated::new(move |start| resource.page(start, params.clone()))
    }
}

impl<'c, E: Update, T: Transport> Resource<'c, E, T> {
    pub fn update<A: Serialize + ?Sized>(
        &self,
        id: impl Into<ResourceId>,
        attrs: &A,
    ) -> Result<Envelope, Error> {
        self.call().method(HttpMethod::Put).id(id).attributes(attrs)?.send()
    }
}

impl<'c, E: Delete, T: Transport> Resource<'c, E, T> {
    pub fn delete(&self, id: impl Into<ResourceId>) -> Result<Envelope, Error> {
        self.call().method(HttpMethod::Delete).id(id).send()
    }
}
