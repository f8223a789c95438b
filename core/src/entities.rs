//! Pipedrive entity markers and entity-specific operations.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::Error;
use crate::http::HttpMethod;
use crate::pagination::Paginated;
use crate::request::to_params;
use crate::resource::{Create, Delete, Entity, Read, Resource, Update};
use crate::transport::Transport;
use crate::types::ResourceId;

macro_rules! entity {
    ($(#[$meta:meta])* $ty:ident, $name:literal, [$($cap:ident),*]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $ty;

        impl Entity for $ty {
            const NAME: &'static str = $name;
        }

        $(impl $cap for $ty {})*
    };
}

entity!(Activity, "activity", [Create, Read, Update, Delete]);
entity!(ActivityType, "activitytype", [Create, Read, Update, Delete]);
entity!(Deal, "deal", [Create, Read, Update, Delete]);
entity!(DealField, "dealfield", [Create, Read, Update, Delete]);
entity!(File, "file", [Create, Read, Update, Delete]);
entity!(Filter, "filter", [Create, Read, Update, Delete]);
entity!(Goal, "goal", [Create, Read, Update, Delete]);
entity!(
    /// Leads are addressed by UUID.
    Lead, "lead", [Create, Read, Update, Delete]
);
entity!(LeadLabel, "leadlabel", [Create, Read, Update, Delete]);
entity!(Note, "note", [Create, Read, Update, Delete]);
entity!(Organization, "organization", [Create, Read, Update, Delete]);
entity!(OrganizationField, "organizationfield", [Create, Read, Update, Delete]);
entity!(
    /// Served under `/v1/persons`.
    Person, "person", [Create, Read, Update, Delete]
);
entity!(PersonField, "personfield", [Create, Read, Update, Delete]);
entity!(Pipeline, "pipeline", [Create, Read, Update, Delete]);
entity!(Product, "product", [Create, Read, Update, Delete]);
entity!(ProductField, "productfield", [Create, Read, Update, Delete]);
entity!(Role, "role", [Create, Read, Update, Delete]);
entity!(Stage, "stage", [Create, Read, Update, Delete]);
entity!(
    /// Users cannot be deleted through the API.
    User, "user", [Create, Read, Update]
);

/// Reject blank terms; the term itself is sent as given.
fn require_term(term: &str) -> Result<String, Error> {
    if term.trim().is_empty() {
        return Err(Error::MissingSearchTerm);
    }
    Ok(term.to_string())
}

/// `GET /{segment}/{id}/deals` with `params`, starting at `start` when given.
fn related_deals<E: Entity, T: Transport>(
    resource: &Resource<'_, E, T>,
    id: &ResourceId,
    params: Map<String, Value>,
    start: Option<u64>,
) -> Result<Envelope, Error> {
    let mut call = resource
        .call()
        .method(HttpMethod::Get)
        .id(id)
        .action("deals")
        .params(params);
    if let Some(start) = start {
        call = call.param("start", start);
    }
    call.send()
}

fn each_related_deals<'c, E: Entity, T: Transport>(
    resource: Resource<'c, E, T>,
    id: ResourceId,
    params: Map<String, Value>,
) -> Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c> {
    Paginated::new(move |start| related_deals(&resource, &id, params.clone(), Some(start)))
}

impl<'c, T: Transport> Resource<'c, Person, T> {
    /// Search persons by name, or by email when `search_by_email` is set.
    ///
    /// Fails with [`Error::MissingSearchTerm`] before any request when `term`
    /// is blank.
    pub fn find_by_name(
        &self,
        term: &str,
        search_by_email: bool,
    ) -> Result<Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c>, Error> {
        let term = require_term(term)?;
        let resource = *self;
        Ok(Paginated::new(move |start| {
            resource
                .call()
                .method(HttpMethod::Get)
                .action("find")
                .param("term", term.as_str())
                .param("search_by_email", Value::from(u8::from(search_by_email)))
                .param("start", start)
                .send()
        }))
    }

    /// First page of deals linked to a person.
    pub fn deals(&self, id: impl Into<ResourceId>) -> Result<Envelope, Error> {
        related_deals(self, &id.into(), Map::new(), None)
    }

    /// Deals linked to a person, filtered by `params` (e.g. `status`).
    pub fn deals_with<A: Serialize + ?Sized>(
        &self,
        id: impl Into<ResourceId>,
        params: &A,
    ) -> Result<Envelope, Error> {
        related_deals(self, &id.into(), to_params(params)?, None)
    }

    /// Every deal linked to a person.
    pub fn each_deals(&self, id: impl Into<ResourceId>) -> Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c> {
        each_related_deals(*self, id.into(), Map::new())
    }

    pub fn each_deals_with<A: Serialize + ?Sized>(
        &self,
        id: impl Into<ResourceId>,
        params: &A,
    ) -> Result<Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c>, Error> {
        Ok(each_related_deals(*self, id.into(), to_params(params)?))
    }
}

impl<'c, T: Transport> Resource<'c, Organization, T> {
    /// Search organizations by name.
    pub fn find_by_name(
        &self,
        term: &str,
    ) -> Result<Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c>, Error> {
        let term = require_term(term)?;
        let resource = *self;
        Ok(Paginated::new(move |start| {
            resource
                .call()
                .method(HttpMethod::Get)
                .action("find")
                .param("term", term.as_str())
                .param("start", start)
                .send()
        }))
    }

    pub fn deals(&self, id: impl Into<ResourceId>) -> Result<Envelope, Error> {
        related_deals(self, &id.into(), Map::new(), None)
    }

    pub fn deals_with<A: Serialize + ?Sized>(
        &self,
        id: impl Into<ResourceId>,
        params: &A,
    ) -> Result<Envelope, Error> {
        related_deals(self, &id.into(), to_params(params)?, None)
    }

    pub fn each_deals(&self, id: impl Into<ResourceId>) -> Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c> {
        each_related_deals(*self, id.into(), Map::new())
    }

    pub fn each_deals_with<A: Serialize + ?Sized>(
        &self,
        id: impl Into<ResourceId>,
        params: &A,
    ) -> Result<Paginated<impl Fn(u64) -> Result<Envelope, Error> + 'c>, Error> {
        Ok(each_related_deals(*self, id.into(), to_params(params)?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::tests::{config, ok, ScriptedTransport};
    use crate::client::Client;
    use crate::http::HttpResponse;
    use crate::pagination::Entry;

    fn client(replies: Vec<HttpResponse>) -> Client<ScriptedTransport> {
        Client::with_transport(config(), ScriptedTransport::new(replies.into_iter().map(Ok).collect()))
    }

    fn relative(paths: Vec<String>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| p.trim_start_matches("https://api.pipedrive.test").to_string())
            .collect()
    }

    #[test]
    fn segments_match_the_api() {
        assert_eq!(Person::segment(), "persons");
        assert_eq!(Organization::segment(), "organizations");
        assert_eq!(Activity::segment(), "activities");
        assert_eq!(ActivityType::segment(), "activitytypes");
        assert_eq!(Lead::segment(), "leads");
        assert_eq!(DealField::segment(), "dealfields");
    }

    #[test]
    fn blank_term_fails_without_request() {
        let client = client(Vec::new());
        assert!(matches!(
            client.persons().find_by_name("  ", false),
            Err(Error::MissingSearchTerm)
        ));
        assert!(matches!(
            client.organizations().find_by_name(""),
            Err(Error::MissingSearchTerm)
        ));
        assert!(client.transport().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn search_term_is_sent_verbatim() {
        let client = client(vec![ok(json!({"data": []}))]);
        client.organizations().find_by_name(" Acme ").unwrap().all().unwrap();
        assert_eq!(
            relative(client.transport().paths()),
            vec!["/v1/organizations/find?api_token=token&start=0&term=+Acme+"]
        );
    }

    #[test]
    fn person_search_follows_pages() {
        let client = client(vec![
            ok(json!({
                "data": [{"id": 1, "name": "Ann"}],
                "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 1}}
            })),
            ok(json!({"data": [{"id": 2, "name": "Anna"}]})),
        ]);
        let found = client.persons().find_by_name("ann", true).unwrap().all().unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(
            relative(client.transport().paths()),
            vec![
                "/v1/persons/find?api_token=token&search_by_email=1&start=0&term=ann",
                "/v1/persons/find?api_token=token&search_by_email=1&start=1&term=ann",
            ]
        );
    }

    #[test]
    fn organization_search_has_no_email_flag() {
        let client = client(vec![ok(json!({"data": []}))]);
        let found = client.organizations().find_by_name("Acme Inc").unwrap().all().unwrap();
        assert!(found.is_empty());
        assert_eq!(
            relative(client.transport().paths()),
            vec!["/v1/organizations/find?api_token=token&start=0&term=Acme+Inc"]
        );
    }

    #[test]
    fn deals_by_person_and_organization() {
        let client = client(vec![
            ok(json!({"data": [{"id": 7}]})),
            ok(json!({"data": [{"id": 8}]})),
        ]);
        assert!(client.persons().deals(5u64).unwrap().is_success());
        let deals = client.organizations().each_deals(9u64).all().unwrap();
        assert_eq!(deals, vec![Entry::Item(json!({"id": 8}))]);
        assert_eq!(
            relative(client.transport().paths()),
            vec![
                "/v1/persons/5/deals?api_token=token",
                "/v1/organizations/9/deals?api_token=token&start=0",
            ]
        );
    }

    #[test]
    fn deal_filters_reach_every_page() {
        let client = client(vec![
            ok(json!({
                "data": [{"id": 1}],
                "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 1}}
            })),
            ok(json!({"data": [{"id": 2}]})),
            ok(json!({"data": [{"id": 3}]})),
        ]);
        let deals = client
            .persons()
            .each_deals_with(5u64, &json!({"filter_id": 42, "status": "open"}))
            .unwrap()
            .all()
            .unwrap();
        assert_eq!(deals.len(), 2);
        client.organizations().deals_with(9u64, &json!({"status": "won"})).unwrap();
        assert_eq!(
            relative(client.transport().paths()),
            vec![
                "/v1/persons/5/deals?api_token=token&filter_id=42&start=0&status=open",
                "/v1/persons/5/deals?api_token=token&filter_id=42&start=1&status=open",
                "/v1/organizations/9/deals?api_token=token&status=won",
            ]
        );
    }

    #[test]
    fn failed_deals_page_is_surfaced_as_data() {
        let client = client(vec![HttpResponse {
            status: 420,
            headers: Vec::new(),
            body: String::new(),
        }]);
        let entries = client.persons().each_deals(1u64).all().unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            Entry::Failure(env) => assert!(env.is_failed()),
            Entry::Item(v) => panic!("unexpected item {v}"),
        }
    }

    #[test]
    fn leads_accept_uuid_ids() {
        let client = client(Vec::new());
        client.leads().find(uuid::Uuid::nil()).unwrap();
        assert_eq!(
            relative(client.transport().paths()),
            vec!["/v1/leads/00000000-0000-0000-0000-000000000000?api_token=token"]
        );
    }
}
