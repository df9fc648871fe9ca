//! HTTP handlers

use crate::ldp::{LdpRequest, LdpResponse, LdpService};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;

/// Constraints document linked from every response with `rel="describedby"`
pub const CONSTRAINTS: &str = "\
This server implements the Linked Data Platform 1.0 (RDF Sources, Basic Containers and Direct Containers).

- Request bodies must be text/turtle, application/ld+json or application/n-triples. A missing Content-Type is read as Turtle.
- ldp:contains triples are managed by the server. PUT may repeat them unchanged but cannot add or remove them.
- Membership triples are generated from ldp:membershipResource together with ldp:hasMemberRelation or ldp:isMemberOfRelation. A container may not declare both relations.
- Updating an existing resource with PUT requires an If-Match header carrying the current ETag.
- A container cannot be changed into a non-container.
- Deleted resource URIs are never reused.
- PATCH is not supported.
";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: LdpService,
    /// Scheme, host and port prefixed to request paths
    pub app_base: Arc<str>,
    /// Path of the root container
    pub context: Arc<str>,
}

/// Handler for `GET /constraints`
pub async fn constraints_handler() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], CONSTRAINTS)
}

/// Fallback handler for every resource request
pub async fn resource_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // "/r" addresses the root container "/r/"
    let path = match uri.path() {
        p if format!("{}/", p) == *state.context => &*state.context,
        p => p,
    };
    if !path.starts_with(&*state.context) {
        debug!("{} {} is outside {}", method, path, state.context);
        return StatusCode::NOT_FOUND.into_response();
    }

    let request = LdpRequest {
        uri: format!("{}{}", state.app_base, path),
        headers,
        body,
    };
    into_response(state.service.handle(&method, request).await)
}

fn into_response(ldp: LdpResponse) -> Response {
    let mut response = Response::new(ldp.body.map(Body::from).unwrap_or_else(Body::empty));
    *response.status_mut() = ldp.status;
    *response.headers_mut() = ldp.headers;
    response
}
