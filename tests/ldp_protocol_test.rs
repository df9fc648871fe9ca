//! End-to-end protocol tests driving `LdpService` over an in-memory store
//!
//! Covers:
//! - containment synthesis and round-tripping of stored triples
//! - conditional requests (If-Match, If-None-Match)
//! - Slug handling and URI allocation
//! - Direct Container membership in both directions
//! - tombstones and Prefer handling

use axum::http::{HeaderValue, Method, StatusCode};
use ldp_engine::ldp::{strip_containment, LdpOptions, LdpRequest, LdpResponse, LdpService};
use ldp_engine::rdf::namespace::ldp;
use ldp_engine::rdf::{sort_canonical, NamedNode, RdfFormat, RdfParser, Triple};
use ldp_engine::store::{DocumentStore, MemoryStore};
use std::collections::HashSet;
use std::sync::Arc;

const ROOT: &str = "http://example.org/r/";

const BASIC: &str = "<> a <http://www.w3.org/ns/ldp#BasicContainer> .";

async fn service() -> LdpService {
    let service = LdpService::new(Arc::new(MemoryStore::new()), LdpOptions::default());
    service.ensure_root_container(ROOT).await.unwrap();
    service
}

fn request(uri: &str, body: &str) -> LdpRequest {
    let mut request = LdpRequest::new(uri);
    request.body = body.to_string().into();
    request
}

fn with_header(mut request: LdpRequest, name: &'static str, value: &str) -> LdpRequest {
    request.headers.insert(name, HeaderValue::from_str(value).unwrap());
    request
}

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn body_triples(response: &LdpResponse, base: &str) -> Vec<Triple> {
    let body = response.body.as_ref().expect("response has a body");
    RdfParser::parse(body, RdfFormat::Turtle, base).unwrap()
}

fn contained(triples: &[Triple], container: &str) -> HashSet<String> {
    triples
        .iter()
        .filter(|t| t.subject.to_string() == format!("<{}>", container) && t.predicate.as_str() == ldp::CONTAINS)
        .map(|t| t.object.to_string())
        .collect()
}

async fn post(service: &LdpService, container: &str, slug: Option<&str>, body: &str) -> LdpResponse {
    let mut req = request(container, body);
    if let Some(slug) = slug {
        req = with_header(req, "slug", slug);
    }
    service.handle(&Method::POST, req).await
}

async fn create(service: &LdpService, container: &str, slug: &str, body: &str) -> String {
    let response = post(service, container, Some(slug), body).await;
    assert_eq!(response.status, StatusCode::CREATED, "POST {} failed", slug);
    response.header("location").unwrap().to_string()
}

async fn get(service: &LdpService, uri: &str) -> LdpResponse {
    service.handle(&Method::GET, LdpRequest::new(uri)).await
}

#[tokio::test]
async fn test_basic_container_lists_children_as_a_set() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    let a = create(&service, &container, "a", "<> <http://example.org/ns#n> 1 .").await;
    let b = create(&service, &container, "b", "<> <http://example.org/ns#n> 2 .").await;
    assert_eq!(a, "http://example.org/r/c/a");
    assert_eq!(b, "http://example.org/r/c/b");

    let response = get(&service, &container).await;
    assert_eq!(response.status, StatusCode::OK);
    let link = response.header("link").unwrap();
    assert!(link.contains(ldp::BASIC_CONTAINER));
    assert!(link.contains(ldp::CONTAINER));

    let expected: HashSet<String> = [format!("<{}>", a), format!("<{}>", b)].into_iter().collect();
    assert_eq!(contained(&body_triples(&response, &container), &container), expected);

    // the root lists the container itself, not its grandchildren
    let root = get(&service, ROOT).await;
    let expected: HashSet<String> = [format!("<{}>", container)].into_iter().collect();
    assert_eq!(contained(&body_triples(&root, ROOT), ROOT), expected);
}

#[tokio::test]
async fn test_stripping_synthesized_triples_round_trips() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    create(&service, &container, "a", "").await;

    let response = get(&service, &container).await;
    let mut triples = body_triples(&response, &container);
    strip_containment(&mut triples, &iri(&container));
    sort_canonical(&mut triples);

    let stored = service.store().get(&iri(&container)).await.unwrap().unwrap();
    let mut stored = stored.triples;
    sort_canonical(&mut stored);
    assert_eq!(triples, stored);
}

#[tokio::test]
async fn test_put_requires_matching_if_match() {
    let service = service().await;
    let doc = create(&service, ROOT, "doc", "<> <http://purl.org/dc/terms/title> \"v1\" .").await;

    let missing = service
        .handle(&Method::PUT, request(&doc, "<> <http://purl.org/dc/terms/title> \"v2\" ."))
        .await;
    assert_eq!(missing.status, StatusCode::PRECONDITION_REQUIRED);

    let stale = with_header(
        request(&doc, "<> <http://purl.org/dc/terms/title> \"v2\" ."),
        "if-match",
        "W/\"0000\"",
    );
    assert_eq!(service.handle(&Method::PUT, stale).await.status, StatusCode::PRECONDITION_FAILED);

    let etag = get(&service, &doc).await.header("etag").unwrap().to_string();
    let fresh = with_header(request(&doc, "<> <http://purl.org/dc/terms/title> \"v2\" ."), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, fresh).await.status, StatusCode::NO_CONTENT);

    let updated = get(&service, &doc).await;
    let body = String::from_utf8(updated.body.clone().unwrap().to_vec()).unwrap();
    assert!(body.contains("v2"));
    assert!(!body.contains("v1"));
    assert_ne!(updated.header("etag").unwrap(), etag);

    // the old validator is now stale
    let replay = with_header(request(&doc, "<> <http://purl.org/dc/terms/title> \"v3\" ."), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, replay).await.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_new_child_invalidates_container_etag() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    let etag = get(&service, &container).await.header("etag").unwrap().to_string();

    create(&service, &container, "late", "").await;

    let put = with_header(request(&container, BASIC), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_tombstoned_resource_is_gone_regardless_of_headers() {
    let service = service().await;
    let doc = create(&service, ROOT, "x", "").await;

    let deleted = service.handle(&Method::DELETE, LdpRequest::new(doc.clone())).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(get(&service, &doc).await.status, StatusCode::GONE);
    let picky = with_header(LdpRequest::new(doc.clone()), "accept", "image/png");
    assert_eq!(service.handle(&Method::GET, picky).await.status, StatusCode::GONE);

    let put = with_header(request(&doc, "not turtle at all"), "content-type", "text/html");
    let put = with_header(put, "if-match", "*");
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::GONE);

    let again = service.handle(&Method::DELETE, LdpRequest::new(doc.clone())).await;
    assert_eq!(again.status, StatusCode::GONE);

    // the name is never handed out again
    let reused = create(&service, ROOT, "x", "").await;
    assert_ne!(reused, doc);

    // and the tombstone is not listed
    let root = get(&service, ROOT).await;
    assert!(!contained(&body_triples(&root, ROOT), ROOT).contains(&format!("<{}>", doc)));
}

#[tokio::test]
async fn test_missing_resource_is_404() {
    let service = service().await;
    let missing = "http://example.org/r/nothing";
    assert_eq!(get(&service, missing).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        service.handle(&Method::DELETE, LdpRequest::new(missing)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(post(&service, missing, None, "").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slug_collision_generates_a_new_uri() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;

    let first = create(&service, &container, "x", "").await;
    assert_eq!(first, "http://example.org/r/c/x");

    let second = post(&service, &container, Some("x"), "").await;
    assert_eq!(second.status, StatusCode::CREATED);
    let second = second.header("location").unwrap().to_string();
    assert_ne!(second, first);
    assert!(second.starts_with("http://example.org/r/c/"));

    let without_slug = create(&service, &container, "", "").await;
    assert!(without_slug.starts_with("http://example.org/r/c/res"));
}

#[tokio::test]
async fn test_concurrent_posts_get_distinct_uris() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let container = container.clone();
        handles.push(tokio::spawn(async move {
            let response = post(&service, &container, Some("same"), "").await;
            assert_eq!(response.status, StatusCode::CREATED);
            response.header("location").unwrap().to_string()
        }));
    }

    let mut locations = HashSet::new();
    for handle in handles {
        locations.insert(handle.await.unwrap());
    }
    assert_eq!(locations.len(), 8);

    let listed = contained(&body_triples(&get(&service, &container).await, &container), &container);
    assert_eq!(listed.len(), 8);
}

#[tokio::test]
async fn test_post_to_non_container_conflicts() {
    let service = service().await;
    let doc = create(&service, ROOT, "plain", "").await;
    assert_eq!(post(&service, &doc, Some("child"), "").await.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_resource_type_override_forces_rdf_source() {
    let service = service().await;
    let req = with_header(
        request(ROOT, BASIC),
        "link",
        "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"",
    );
    let created = service.handle(&Method::POST, req).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let link = created.header("link").unwrap();
    assert!(link.contains(ldp::RDF_SOURCE));
    assert!(!link.contains(ldp::BASIC_CONTAINER));
}

#[tokio::test]
async fn test_direct_container_has_member_relation() {
    let service = service().await;
    let owner = create(&service, ROOT, "owner", "<> <http://purl.org/dc/terms/title> \"Owner\" .").await;
    let dc = create(
        &service,
        ROOT,
        "dc",
        &format!(
            "@prefix ldp: <http://www.w3.org/ns/ldp#> .\n\
             <> a ldp:DirectContainer ; ldp:membershipResource <{}> ; \
             ldp:hasMemberRelation <http://example.org/ns#member> .",
            owner
        ),
    )
    .await;
    let member = create(&service, &dc, "m", "").await;

    let expected = Triple::link(&iri(&owner), &iri("http://example.org/ns#member"), &iri(&member));

    let response = get(&service, &owner).await;
    assert!(body_triples(&response, &owner).contains(&expected));

    let include = with_header(
        LdpRequest::new(owner.clone()),
        "prefer",
        "return=representation; include=\"http://www.w3.org/ns/ldp#PreferMembership\"",
    );
    let response = service.handle(&Method::GET, include).await;
    assert!(body_triples(&response, &owner).contains(&expected));

    // owner is not a container, so omit is ignored there
    let omit = with_header(
        LdpRequest::new(owner.clone()),
        "prefer",
        "return=representation; omit=\"http://www.w3.org/ns/ldp#PreferMembership\"",
    );
    let response = service.handle(&Method::GET, omit).await;
    assert!(response.header("preference-applied").is_none());
    assert!(body_triples(&response, &owner).contains(&expected));

    // membership triples are never stored on the owner
    let stored = service.store().get(&iri(&owner)).await.unwrap().unwrap();
    assert!(!stored.triples.contains(&expected));

    // and deleting the member removes the triple
    service.handle(&Method::DELETE, LdpRequest::new(member.clone())).await;
    let response = get(&service, &owner).await;
    assert!(!body_triples(&response, &owner).contains(&expected));
}

#[tokio::test]
async fn test_direct_container_is_member_of_relation() {
    let service = service().await;
    let owner = create(&service, ROOT, "group", "").await;
    let dc = create(
        &service,
        ROOT,
        "dc",
        &format!(
            "@prefix ldp: <http://www.w3.org/ns/ldp#> .\n\
             <> a ldp:DirectContainer ; ldp:membershipResource <{}> ; \
             ldp:isMemberOfRelation <http://example.org/ns#memberOf> .",
            owner
        ),
    )
    .await;
    let member = create(&service, &dc, "m", "<> <http://purl.org/dc/terms/title> \"M\" .").await;

    let expected = Triple::link(&iri(&member), &iri("http://example.org/ns#memberOf"), &iri(&owner));
    let response = get(&service, &member).await;
    assert!(body_triples(&response, &member).contains(&expected));

    // the triple survives an update that leaves it out
    let etag = response.header("etag").unwrap().to_string();
    let put = with_header(request(&member, "<> <http://purl.org/dc/terms/title> \"M2\" ."), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::NO_CONTENT);
    let response = get(&service, &member).await;
    assert!(body_triples(&response, &member).contains(&expected));
}

#[tokio::test]
async fn test_invalid_membership_patterns_conflict() {
    let service = service().await;

    let both = post(
        &service,
        ROOT,
        Some("both"),
        "@prefix ldp: <http://www.w3.org/ns/ldp#> .\n\
         <> a ldp:DirectContainer ; ldp:membershipResource <http://example.org/r/o> ; \
         ldp:hasMemberRelation <http://example.org/ns#a> ; ldp:isMemberOfRelation <http://example.org/ns#b> .",
    )
    .await;
    assert_eq!(both.status, StatusCode::CONFLICT);
    // the reserved name was given back
    assert!(service.store().get(&iri("http://example.org/r/both")).await.unwrap().is_none());

    let no_resource = post(
        &service,
        ROOT,
        None,
        "@prefix ldp: <http://www.w3.org/ns/ldp#> .\n\
         <> a ldp:DirectContainer ; ldp:hasMemberRelation <http://example.org/ns#a> .",
    )
    .await;
    assert_eq!(no_resource.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_containment_is_server_managed() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    let child = create(&service, &container, "a", "").await;

    // asserting containment on creation
    let forged = post(
        &service,
        ROOT,
        Some("forged"),
        "<> a <http://www.w3.org/ns/ldp#BasicContainer> ; <http://www.w3.org/ns/ldp#contains> <http://example.org/elsewhere> .",
    )
    .await;
    assert_eq!(forged.status, StatusCode::CONFLICT);

    let etag = get(&service, &container).await.header("etag").unwrap().to_string();

    // adding a containment triple on update
    let tamper = with_header(
        request(
            &container,
            &format!("{} <> <{}> <{}>, <http://example.org/r/c/zz> .", BASIC, ldp::CONTAINS, child),
        ),
        "if-match",
        &etag,
    );
    assert_eq!(service.handle(&Method::PUT, tamper).await.status, StatusCode::CONFLICT);

    // repeating the current containment unchanged is fine
    let same = with_header(
        request(&container, &format!("{} <> <{}> <{}> .", BASIC, ldp::CONTAINS, child)),
        "if-match",
        &etag,
    );
    assert_eq!(service.handle(&Method::PUT, same).await.status, StatusCode::NO_CONTENT);

    let stored = service.store().get(&iri(&container)).await.unwrap().unwrap();
    assert!(stored.triples.iter().all(|t| t.predicate.as_str() != ldp::CONTAINS));
}

#[tokio::test]
async fn test_container_cannot_be_demoted() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    let etag = get(&service, &container).await.header("etag").unwrap().to_string();

    let demote = with_header(request(&container, "<> <http://purl.org/dc/terms/title> \"x\" ."), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, demote).await.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_put_creates_missing_resource() {
    let service = service().await;
    let uri = "http://example.org/r/by-put";
    let created = service
        .handle(&Method::PUT, request(uri, "<> <http://purl.org/dc/terms/title> \"P\" ."))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.header("location"), Some(uri));
    assert_eq!(get(&service, uri).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_prefer_minimal_container() {
    let service = service().await;
    let container = create(&service, ROOT, "c", BASIC).await;
    create(&service, &container, "a", "").await;

    let minimal = with_header(
        LdpRequest::new(container.clone()),
        "prefer",
        "return=representation; include=\"http://www.w3.org/ns/ldp#PreferMinimalContainer\"",
    );
    let response = service.handle(&Method::GET, minimal).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("preference-applied"), Some("return=representation"));
    assert!(contained(&body_triples(&response, &container), &container).is_empty());

    let full = get(&service, &container).await;
    assert_ne!(full.header("etag"), response.header("etag"));
    assert_eq!(full.header("vary"), Some("Accept, Prefer"));
}

#[tokio::test]
async fn test_if_none_match_returns_304() {
    let service = service().await;
    let etag = get(&service, ROOT).await.header("etag").unwrap().to_string();

    let conditional = with_header(LdpRequest::new(ROOT), "if-none-match", &etag);
    let response = service.handle(&Method::GET, conditional).await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_none());
    assert_eq!(response.header("etag"), Some(etag.as_str()));
}

#[tokio::test]
async fn test_content_negotiation() {
    let service = service().await;
    let doc = create(&service, ROOT, "doc", "<> <http://purl.org/dc/terms/title> \"T\" .").await;
    let turtle_etag = get(&service, &doc).await.header("etag").unwrap().to_string();

    let jsonld = with_header(LdpRequest::new(doc.clone()), "accept", "application/ld+json");
    let response = service.handle(&Method::GET, jsonld).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/ld+json"));
    let json: serde_json::Value = serde_json::from_slice(&response.body.clone().unwrap()).unwrap();
    assert!(json.get("@graph").is_some());
    // the validator does not depend on the format
    assert_eq!(response.header("etag"), Some(turtle_etag.as_str()));

    let unacceptable = with_header(LdpRequest::new(doc.clone()), "accept", "text/html");
    assert_eq!(service.handle(&Method::GET, unacceptable).await.status, StatusCode::NOT_ACCEPTABLE);

    let unsupported = with_header(request(ROOT, "<h1>hi</h1>"), "content-type", "text/html");
    assert_eq!(
        service.handle(&Method::POST, unsupported).await.status,
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    );

    let jsonld_body = with_header(
        request(ROOT, r#"{"@context": {"dc": "http://purl.org/dc/terms/"}, "@id": "", "dc:title": "J"}"#),
        "content-type",
        "application/ld+json",
    );
    let created = service.handle(&Method::POST, jsonld_body).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let location = created.header("location").unwrap().to_string();
    let body = String::from_utf8(get(&service, &location).await.body.unwrap().to_vec()).unwrap();
    assert!(body.contains("\"J\""));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let service = service().await;
    assert_eq!(
        post(&service, ROOT, Some("bad"), "<> <p> .").await.status,
        StatusCode::BAD_REQUEST
    );
    assert!(service.store().get(&iri("http://example.org/r/bad")).await.unwrap().is_none());
}

fn direct_container_body(resource: &str, relation: &str) -> String {
    format!(
        "@prefix ldp: <http://www.w3.org/ns/ldp#> .\n\
         <> a ldp:DirectContainer ; ldp:membershipResource <{}> ; {} .",
        resource, relation
    )
}

const HAS_MEMBER: &str = "ldp:hasMemberRelation <http://example.org/ns#member>";

#[tokio::test]
async fn test_round_trip_keeps_stored_triple_equal_to_membership_triple() {
    let service = service().await;
    let owner = create(
        &service,
        ROOT,
        "owner",
        "<> <http://example.org/ns#member> <http://example.org/r/dc/m> .",
    )
    .await;
    let dc = create(&service, ROOT, "dc", &direct_container_body(&owner, HAS_MEMBER)).await;
    let member = create(&service, &dc, "m", "").await;
    assert_eq!(member, "http://example.org/r/dc/m");

    let expected = Triple::link(&iri(&owner), &iri("http://example.org/ns#member"), &iri(&member));

    // write back exactly what was read
    let response = get(&service, &owner).await;
    let etag = response.header("etag").unwrap().to_string();
    let body = String::from_utf8(response.body.unwrap().to_vec()).unwrap();
    let put = with_header(request(&owner, &body), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::NO_CONTENT);

    let stored = service.store().get(&iri(&owner)).await.unwrap().unwrap();
    assert_eq!(stored.triples, vec![expected.clone()]);

    // the client's triple outlives the membership it coincided with
    service.handle(&Method::DELETE, LdpRequest::new(member)).await;
    let response = get(&service, &owner).await;
    assert!(body_triples(&response, &owner).contains(&expected));
}

#[tokio::test]
async fn test_put_with_both_membership_relations_conflicts() {
    let service = service().await;
    let both = direct_container_body(
        "http://example.org/r/o",
        "ldp:hasMemberRelation <http://example.org/ns#a> ; ldp:isMemberOfRelation <http://example.org/ns#b>",
    );

    // PUT-create leaves nothing behind
    let target = "http://example.org/r/put-both";
    let response = service.handle(&Method::PUT, request(target, &both)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(service.store().get(&iri(target)).await.unwrap().is_none());
    assert!(service.store().get(&iri("http://example.org/r/o")).await.unwrap().is_none());

    // PUT-update leaves the stored document as it was
    let existing = create(&service, ROOT, "plain", "<> <http://purl.org/dc/terms/title> \"Plain\" .").await;
    let before = service.store().get(&iri(&existing)).await.unwrap().unwrap();
    let etag = get(&service, &existing).await.header("etag").unwrap().to_string();
    let put = with_header(request(&existing, &both), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::CONFLICT);

    let after = service.store().get(&iri(&existing)).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert!(after.membership.is_none());
    assert!(service.store().get(&iri("http://example.org/r/o")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_direct_container_drops_membership() {
    let service = service().await;
    let owner = create(&service, ROOT, "owner", "<> <http://purl.org/dc/terms/title> \"Owner\" .").await;
    let dc = create(&service, ROOT, "dc", &direct_container_body(&owner, HAS_MEMBER)).await;
    let member = create(&service, &dc, "m", "").await;

    let stored = service.store().get(&iri(&owner)).await.unwrap().unwrap();
    assert_eq!(stored.membership_resource_for.len(), 1);

    assert_eq!(
        service.handle(&Method::DELETE, LdpRequest::new(dc.clone())).await.status,
        StatusCode::NO_CONTENT
    );

    let stored = service.store().get(&iri(&owner)).await.unwrap().unwrap();
    assert!(stored.membership_resource_for.is_empty());
    let triples = body_triples(&get(&service, &owner).await, &owner);
    assert!(!triples
        .iter()
        .any(|t| t.predicate.as_str() == "http://example.org/ns#member"));
    // the member itself is untouched
    assert_eq!(get(&service, &member).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_changing_membership_resource_moves_registration() {
    let service = service().await;
    let first = create(&service, ROOT, "first", "").await;
    let second = create(&service, ROOT, "second", "").await;
    let dc = create(&service, ROOT, "dc", &direct_container_body(&first, HAS_MEMBER)).await;
    let member = create(&service, &dc, "m", "").await;

    let relation = iri("http://example.org/ns#member");
    let on_first = Triple::link(&iri(&first), &relation, &iri(&member));
    let on_second = Triple::link(&iri(&second), &relation, &iri(&member));
    assert!(body_triples(&get(&service, &first).await, &first).contains(&on_first));

    let etag = get(&service, &dc).await.header("etag").unwrap().to_string();
    let put = with_header(request(&dc, &direct_container_body(&second, HAS_MEMBER)), "if-match", &etag);
    assert_eq!(service.handle(&Method::PUT, put).await.status, StatusCode::NO_CONTENT);

    assert!(!body_triples(&get(&service, &first).await, &first).contains(&on_first));
    assert!(body_triples(&get(&service, &second).await, &second).contains(&on_second));

    let first_doc = service.store().get(&iri(&first)).await.unwrap().unwrap();
    let second_doc = service.store().get(&iri(&second)).await.unwrap().unwrap();
    assert!(first_doc.membership_resource_for.is_empty());
    assert_eq!(second_doc.membership_resource_for.len(), 1);
    assert_eq!(second_doc.membership_resource_for[0].container, iri(&dc));
}

#[tokio::test]
async fn test_failed_post_frees_name_registered_as_membership_resource() {
    let service = service().await;
    let pending = iri("http://example.org/r/pending");

    // an in-flight creation holds the name while a container points at it
    service.store().reserve_uri(&pending).await.unwrap();
    create(&service, ROOT, "dc", &direct_container_body(pending.as_str(), HAS_MEMBER)).await;
    service.store().release_uri(&pending).await.unwrap();

    // the name can be created afterwards and keeps its membership
    let response = service
        .handle(
            &Method::PUT,
            request(pending.as_str(), "<> <http://purl.org/dc/terms/title> \"Later\" ."),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let stored = service.store().get(&pending).await.unwrap().unwrap();
    assert!(stored.is_live());
    assert_eq!(stored.membership_resource_for.len(), 1);
}
