//! Request orchestration: the LDP protocol state machine
//!
//! `LdpService` sequences fetch, classification, validation, persistence and
//! synthesis for each HTTP method. It is transport independent: requests
//! and responses are plain values built on the `http` types, and every
//! failure becomes a response rather than an error.

use super::allocator::{self, DEFAULT_MAX_ATTEMPTS};
use super::concurrency::{check_if_match, not_modified};
use super::containment::{strip_containment, Containment};
use super::document::{InteractionModel, ResourceDocument};
use super::error::{LdpError, LdpResult};
use super::headers::{self, Preferences, ACCEPT_POST, PREFERENCE_APPLIED, SLUG};
use super::membership::{inject_member_of, membership_triples, strip_membership, update_registration};
use super::representation::Synthesized;
use super::resolver::resolve;
use crate::rdf::namespace::{ldp, rdf};
use crate::rdf::{NamedNode, RdfFormat, RdfParser, RdfSerializer, Triple};
use crate::store::{DocumentStore, StoreError};
use axum::http::header::{ALLOW, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH, LINK, LOCATION, VARY};
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info};

const ALLOW_RESOURCE: &str = "GET, HEAD, OPTIONS, PUT, DELETE";
const ALLOW_CONTAINER: &str = "GET, HEAD, OPTIONS, PUT, DELETE, POST";

/// Engine settings
#[derive(Debug, Clone)]
pub struct LdpOptions {
    /// Target of `Link: rel="describedby"`
    pub constraints_uri: Option<String>,
    /// Generated names tried per POST after the slug
    pub max_allocation_attempts: usize,
}

impl Default for LdpOptions {
    fn default() -> Self {
        Self {
            constraints_uri: None,
            max_allocation_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Incoming request addressed to one resource
#[derive(Debug, Clone)]
pub struct LdpRequest {
    /// Absolute resource URI, without query
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl LdpRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// Outgoing response
#[derive(Debug, Clone)]
pub struct LdpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl LdpResponse {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Header value as text, mostly for tests
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The LDP request orchestrator
#[derive(Clone)]
pub struct LdpService {
    store: Arc<dyn DocumentStore>,
    options: Arc<LdpOptions>,
}

impl LdpService {
    pub fn new(store: Arc<dyn DocumentStore>, options: LdpOptions) -> Self {
        Self {
            store,
            options: Arc::new(options),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Create `uri` as an empty Basic Container unless something is there
    pub async fn ensure_root_container(&self, uri: &str) -> LdpResult<()> {
        let name = NamedNode::new(uri).map_err(|e| LdpError::NotFound(e.to_string()))?;
        let existing = self.store.get(&name).await?;
        match existing {
            Some(doc) if doc.is_live() || doc.deleted => Ok(()),
            existing => {
                let triples = vec![Triple::link(
                    &name,
                    &NamedNode::new_unchecked(rdf::TYPE),
                    &NamedNode::new_unchecked(ldp::BASIC_CONTAINER),
                )];
                let mut doc = ResourceDocument::new(name, triples, InteractionModel::BasicContainer);
                if let Some(stub) = existing {
                    doc.membership_resource_for = stub.membership_resource_for;
                }
                self.store.put(&doc).await?;
                info!("Created root container {}", uri);
                Ok(())
            }
        }
    }

    /// Dispatch one request by method
    pub async fn handle(&self, method: &Method, request: LdpRequest) -> LdpResponse {
        debug!("{} {}", method, request.uri);
        let result = match *method {
            Method::GET => self.get(&request, true).await,
            Method::HEAD => self.get(&request, false).await,
            Method::PUT => self.put(&request).await,
            Method::POST => self.post(&request).await,
            Method::DELETE => self.delete(&request).await,
            Method::OPTIONS => self.options(&request).await,
            _ => {
                let allow = self.allow_for(&request.uri).await;
                let mut response =
                    self.error_response(method, &request.uri, LdpError::MethodNotAllowed(method.to_string()));
                headers::insert(&mut response.headers, ALLOW, allow);
                return response;
            }
        };
        match result {
            Ok(response) => response,
            Err(e) => self.error_response(method, &request.uri, e),
        }
    }

    /// Methods the target supports: POST only on live containers
    async fn allow_for(&self, uri: &str) -> &'static str {
        let Ok(name) = NamedNode::new(uri) else {
            return ALLOW_RESOURCE;
        };
        match self.store.get(&name).await {
            Ok(Some(doc)) if doc.is_live() && doc.is_container() => ALLOW_CONTAINER,
            Ok(_) => ALLOW_RESOURCE,
            Err(e) => {
                debug!("Could not load {} for Allow: {}", uri, e);
                ALLOW_RESOURCE
            }
        }
    }

    fn error_response(&self, method: &Method, uri: &str, e: LdpError) -> LdpResponse {
        if e.is_server_error() {
            error!("{} {} failed: {}", method, uri, e);
        } else {
            debug!("{} {} -> {}: {}", method, uri, e.status(), e);
        }

        let mut response = LdpResponse::new(e.status());
        headers::insert(
            &mut response.headers,
            LINK,
            &headers::link_value(&[ldp::RESOURCE], self.options.constraints_uri.as_deref()),
        );
        headers::insert(&mut response.headers, CONTENT_TYPE, "text/plain; charset=utf-8");
        response.body = Some(Bytes::from(e.to_string()));
        response
    }

    fn parse_uri(uri: &str) -> LdpResult<NamedNode> {
        NamedNode::new(uri).map_err(|_| LdpError::NotFound(uri.to_string()))
    }

    /// Fetch a materialized document: 404 when absent or only reserved, 410
    /// when tombstoned
    async fn live_document(&self, uri: &NamedNode) -> LdpResult<ResourceDocument> {
        match self.store.get(uri).await? {
            Some(doc) if doc.deleted => Err(LdpError::Gone(uri.as_str().to_string())),
            Some(doc) if doc.is_live() => Ok(doc),
            _ => Err(LdpError::NotFound(uri.as_str().to_string())),
        }
    }

    /// Headers every successful response about `doc` carries
    fn resource_headers(&self, doc: &ResourceDocument) -> HeaderMap {
        let mut map = HeaderMap::new();
        let model = doc.interaction_model.unwrap_or(InteractionModel::RdfSource);
        headers::insert(
            &mut map,
            LINK,
            &headers::link_value(&model.link_types(), self.options.constraints_uri.as_deref()),
        );
        if model.is_container() {
            headers::insert(&mut map, ALLOW, ALLOW_CONTAINER);
            headers::insert(&mut map, ACCEPT_POST, &RdfFormat::accept_post());
        } else {
            headers::insert(&mut map, ALLOW, ALLOW_RESOURCE);
        }
        map
    }

    async fn get(&self, request: &LdpRequest, with_body: bool) -> LdpResult<LdpResponse> {
        let uri = Self::parse_uri(&request.uri)?;
        let doc = self.live_document(&uri).await?;
        let format = headers::negotiate(&request.headers)?;
        let prefs = Preferences::parse(&request.headers);

        let synthesized = Synthesized::load(self.store.as_ref(), &doc).await?;
        let representation = synthesized.representation(&doc, &prefs);

        let mut response = LdpResponse::new(StatusCode::OK);
        response.headers = self.resource_headers(&doc);
        headers::insert(&mut response.headers, ETAG, representation.etag.as_str());
        headers::insert(&mut response.headers, VARY, "Accept, Prefer");
        if representation.preference_applied {
            headers::insert(&mut response.headers, PREFERENCE_APPLIED, "return=representation");
        }

        if not_modified(headers::header_str(&request.headers, IF_NONE_MATCH), &representation.etag) {
            response.status = StatusCode::NOT_MODIFIED;
            return Ok(response);
        }

        let body = RdfSerializer::serialize(&representation.triples, format)?;
        headers::insert(&mut response.headers, CONTENT_TYPE, format.media_type());
        if with_body {
            response.body = Some(Bytes::from(body));
        }
        Ok(response)
    }

    async fn put(&self, request: &LdpRequest) -> LdpResult<LdpResponse> {
        let uri = Self::parse_uri(&request.uri)?;
        let existing = self.store.get(&uri).await?;
        if existing.as_ref().map_or(false, |doc| doc.deleted) {
            return Err(LdpError::Gone(uri.as_str().to_string()));
        }

        let format = headers::request_format(&request.headers)?;
        let triples = RdfParser::parse(&request.body, format, uri.as_str())?;
        match existing {
            Some(doc) if doc.is_live() => self.update(request, doc, triples).await,
            existing => self.create_by_put(request, uri, existing, triples).await,
        }
    }

    async fn create_by_put(
        &self,
        request: &LdpRequest,
        uri: NamedNode,
        existing: Option<ResourceDocument>,
        mut triples: Vec<Triple>,
    ) -> LdpResult<LdpResponse> {
        let classification = resolve(&triples, &uri, headers::resource_type_override(&request.headers))?;
        Containment::empty(uri.clone()).check_submitted(&triples)?;

        let mut doc = ResourceDocument::new(uri.clone(), Vec::new(), classification.interaction_model);
        doc.membership = classification.membership;

        // a membership stub is claimed like an absent name; its back-references survive
        if let Some(stub) = existing {
            doc.membership_resource_for = stub.membership_resource_for;
        }
        let reservation = match self.store.reserve_uri(&uri).await {
            Ok(()) => allocator::Reservation::adopt(Arc::clone(&self.store), uri.clone()),
            Err(StoreError::DuplicateName(name)) => return Err(LdpError::ConcurrentCreation(name)),
            Err(e) => return Err(e.into()),
        };

        let synthesized = match membership_triples(self.store.as_ref(), &doc, &Containment::empty(uri.clone())).await {
            Ok(s) => s,
            Err(e) => {
                reservation.release().await;
                return Err(e);
            }
        };
        strip_containment(&mut triples, &uri);
        strip_membership(&mut triples, &synthesized, &[]);
        doc.triples = triples;

        if let Err(e) = self.persist_new(&doc, None).await {
            reservation.release().await;
            return Err(e);
        }
        reservation.commit();

        info!("Created {} ({}) via PUT", uri.as_str(), classification.interaction_model);
        let mut response = LdpResponse::new(StatusCode::CREATED);
        response.headers = self.resource_headers(&doc);
        headers::insert(&mut response.headers, LOCATION, uri.as_str());
        Ok(response)
    }

    async fn update(
        &self,
        request: &LdpRequest,
        current: ResourceDocument,
        mut triples: Vec<Triple>,
    ) -> LdpResult<LdpResponse> {
        let synthesized = Synthesized::load(self.store.as_ref(), &current).await?;
        check_if_match(
            headers::header_str(&request.headers, IF_MATCH),
            &synthesized.default_etag(&current),
        )?;
        synthesized.containment.check_submitted(&triples)?;

        let classification = resolve(&triples, &current.name, headers::resource_type_override(&request.headers))?;
        if current.is_container() && !classification.interaction_model.is_container() {
            return Err(LdpError::InteractionModelDemotion(current.name.as_str().to_string()));
        }

        strip_containment(&mut triples, &current.name);
        strip_membership(&mut triples, &synthesized.membership, &current.triples);
        if let Some(parent) = &current.contained_by {
            if let Some(parent) = self.store.find_container(parent).await? {
                inject_member_of(&mut triples, &current.name, &parent);
            }
        }

        let mut doc = current.clone();
        doc.triples = triples;
        doc.interaction_model = Some(classification.interaction_model);
        doc.membership = classification.membership;

        self.store.put(&doc).await?;
        update_registration(self.store.as_ref(), Some(&current), &doc).await?;

        debug!("Updated {}", doc.name.as_str());
        let mut response = LdpResponse::new(StatusCode::NO_CONTENT);
        response.headers = self.resource_headers(&doc);
        Ok(response)
    }

    async fn post(&self, request: &LdpRequest) -> LdpResult<LdpResponse> {
        let uri = Self::parse_uri(&request.uri)?;
        let parent = self.live_document(&uri).await?;
        if !parent.is_container() {
            return Err(LdpError::NotAContainer(uri.as_str().to_string()));
        }
        let format = headers::request_format(&request.headers)?;

        let reservation = allocator::allocate(
            &self.store,
            &parent.name,
            headers::header_str(&request.headers, SLUG),
            self.options.max_allocation_attempts,
        )
        .await?;

        match self.create_child(request, &parent, reservation.name(), format).await {
            Ok(response) => {
                let name = reservation.commit();
                info!("Created {} in {}", name.as_str(), parent.name.as_str());
                Ok(response)
            }
            Err(e) => {
                reservation.release().await;
                Err(e)
            }
        }
    }

    async fn create_child(
        &self,
        request: &LdpRequest,
        parent: &ResourceDocument,
        name: &NamedNode,
        format: RdfFormat,
    ) -> LdpResult<LdpResponse> {
        let mut triples = RdfParser::parse(&request.body, format, name.as_str())?;
        let classification = resolve(&triples, name, headers::resource_type_override(&request.headers))?;
        Containment::empty(name.clone()).check_submitted(&triples)?;

        strip_containment(&mut triples, name);
        inject_member_of(&mut triples, name, parent);

        let mut doc = ResourceDocument::new(name.clone(), triples, classification.interaction_model);
        doc.membership = classification.membership;
        doc.contained_by = Some(parent.name.clone());
        self.persist_new(&doc, None).await?;

        let mut response = LdpResponse::new(StatusCode::CREATED);
        response.headers = self.resource_headers(&doc);
        headers::insert(&mut response.headers, LOCATION, name.as_str());
        Ok(response)
    }

    async fn persist_new(&self, doc: &ResourceDocument, previous: Option<&ResourceDocument>) -> LdpResult<()> {
        self.store.put(doc).await?;
        update_registration(self.store.as_ref(), previous, doc).await
    }

    async fn delete(&self, request: &LdpRequest) -> LdpResult<LdpResponse> {
        let uri = Self::parse_uri(&request.uri)?;
        let doc = self.live_document(&uri).await?;

        if let Some(resource) = doc.membership_resource() {
            self.store.unregister_membership(&doc.name, resource).await?;
        }
        self.store.tombstone(&uri).await?;

        info!("Deleted {}", uri.as_str());
        let mut response = LdpResponse::new(StatusCode::NO_CONTENT);
        headers::insert(
            &mut response.headers,
            LINK,
            &headers::link_value(&[ldp::RESOURCE], self.options.constraints_uri.as_deref()),
        );
        Ok(response)
    }

    async fn options(&self, request: &LdpRequest) -> LdpResult<LdpResponse> {
        let uri = Self::parse_uri(&request.uri)?;
        let doc = self.live_document(&uri).await?;
        let mut response = LdpResponse::new(StatusCode::NO_CONTENT);
        response.headers = self.resource_headers(&doc);
        Ok(response)
    }
}
