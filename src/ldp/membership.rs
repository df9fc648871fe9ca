//! Membership synthesis and registration
//!
//! For `hasMemberRelation` containers the membership triples
//! `(membershipResource, rel, member)` are derived when the membership
//! resource is read. For `isMemberOfRelation` containers the triple
//! `(member, rel, membershipResource)` is written into the member itself.

use super::containment::Containment;
use super::document::ResourceDocument;
use super::error::LdpResult;
use crate::rdf::{NamedNode, Triple};
use crate::store::DocumentStore;
use tracing::debug;

/// Membership triples of `document`, sorted and deduplicated.
///
/// `own_containment` is reused when a back-reference points at the document
/// itself (a Direct Container that is its own membership resource).
pub async fn membership_triples(
    store: &dyn DocumentStore,
    document: &ResourceDocument,
    own_containment: &Containment,
) -> LdpResult<Vec<Triple>> {
    let mut triples = Vec::new();

    for back_ref in &document.membership_resource_for {
        let container = if back_ref.container == document.name {
            Some(document.clone())
        } else {
            store.find_container(&back_ref.container).await?
        };

        // stale back-references are skipped, not repaired
        let Some(container) = container.filter(|c| c.is_live()) else {
            debug!("Skipping stale membership back-reference {}", back_ref.container.as_str());
            continue;
        };
        if container.membership_resource() != Some(&document.name) {
            continue;
        }
        let Some(relation) = container.has_member_relation() else {
            continue;
        };

        let members = if container.name == document.name {
            own_containment.children().to_vec()
        } else {
            store.get_containment(&container.name).await?
        };
        triples.extend(
            members
                .iter()
                .map(|member| Triple::link(&document.name, relation, member)),
        );
    }

    crate::rdf::sort_canonical(&mut triples);
    triples.dedup();
    Ok(triples)
}

/// Remove synthesized membership triples from a submitted body.
///
/// Triples that are also in `stored` were written by a client and are kept,
/// so stripping a synthesized representation yields the stored set.
pub fn strip_membership(triples: &mut Vec<Triple>, synthesized: &[Triple], stored: &[Triple]) {
    if synthesized.is_empty() {
        return;
    }
    triples.retain(|t| !synthesized.contains(t) || stored.contains(t));
}

/// The `(member, isMemberOfRelation, membershipResource)` triple a child of
/// `container` must carry, if the container uses the inverse pattern
pub fn member_of_triple(member: &NamedNode, container: &ResourceDocument) -> Option<Triple> {
    if !container.is_live() {
        return None;
    }
    let relation = container.is_member_of_relation()?;
    let resource = container.membership_resource()?;
    Some(Triple::link(member, relation, resource))
}

/// Append the inverse membership triple unless the body already has it
pub fn inject_member_of(triples: &mut Vec<Triple>, member: &NamedNode, container: &ResourceDocument) {
    if let Some(triple) = member_of_triple(member, container) {
        if !triples.contains(&triple) {
            triples.push(triple);
        }
    }
}

/// Bring the membership back-references in line with a container write.
///
/// Drops the back-reference from the previous membership resource when it
/// changed (or the container no longer declares one), then registers the
/// current one.
pub async fn update_registration(
    store: &dyn DocumentStore,
    previous: Option<&ResourceDocument>,
    current: &ResourceDocument,
) -> LdpResult<()> {
    if let Some(old) = previous.and_then(ResourceDocument::membership_resource) {
        if current.membership_resource() != Some(old) {
            store.unregister_membership(&current.name, old).await?;
        }
    }
    if current.membership.is_some() {
        store.register_membership(current).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldp::{InteractionModel, MemberRelation, Membership};
    use crate::store::MemoryStore;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn direct_container(name: &str, resource: &str, relation: MemberRelation) -> ResourceDocument {
        let mut doc = ResourceDocument::new(iri(name), Vec::new(), InteractionModel::DirectContainer);
        doc.membership = Some(Membership {
            resource: iri(resource),
            relation,
        });
        doc
    }

    async fn add_child(store: &MemoryStore, name: &str, parent: &str) {
        let mut child = ResourceDocument::new(iri(name), Vec::new(), InteractionModel::RdfSource);
        child.contained_by = Some(iri(parent));
        store.put(&child).await.unwrap();
    }

    #[tokio::test]
    async fn test_has_member_triples_on_membership_resource() {
        let store = MemoryStore::new();
        let has = iri("http://example.org/ns#has");
        let container = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/owner",
            MemberRelation::HasMember(has.clone()),
        );
        store.put(&container).await.unwrap();
        update_registration(&store, None, &container).await.unwrap();
        add_child(&store, "http://example.org/r/dc/m2", "http://example.org/r/dc/").await;
        add_child(&store, "http://example.org/r/dc/m1", "http://example.org/r/dc/").await;

        let owner = store.get(&iri("http://example.org/r/owner")).await.unwrap().unwrap();
        let triples = membership_triples(&store, &owner, &Containment::empty(owner.name.clone()))
            .await
            .unwrap();
        assert_eq!(
            triples,
            vec![
                Triple::link(&owner.name, &has, &iri("http://example.org/r/dc/m1")),
                Triple::link(&owner.name, &has, &iri("http://example.org/r/dc/m2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_back_references_are_skipped() {
        let store = MemoryStore::new();
        let container = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/owner",
            MemberRelation::HasMember(iri("http://example.org/ns#has")),
        );
        store.put(&container).await.unwrap();
        update_registration(&store, None, &container).await.unwrap();
        add_child(&store, "http://example.org/r/dc/m", "http://example.org/r/dc/").await;

        // container now points elsewhere, but the old back-reference is still stored
        let moved = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/elsewhere",
            MemberRelation::HasMember(iri("http://example.org/ns#has")),
        );
        store.put(&moved).await.unwrap();

        let owner = store.get(&iri("http://example.org/r/owner")).await.unwrap().unwrap();
        let triples = membership_triples(&store, &owner, &Containment::empty(owner.name.clone()))
            .await
            .unwrap();
        assert!(triples.is_empty());
    }

    #[tokio::test]
    async fn test_self_membership_reuses_containment() {
        let store = MemoryStore::new();
        let has = iri("http://example.org/ns#has");
        let container = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/dc/",
            MemberRelation::HasMember(has.clone()),
        );
        store.put(&container).await.unwrap();
        update_registration(&store, None, &container).await.unwrap();

        let stored = store.get(&container.name).await.unwrap().unwrap();
        let containment = Containment::new(stored.name.clone(), vec![iri("http://example.org/r/dc/x")]);
        let triples = membership_triples(&store, &stored, &containment).await.unwrap();
        assert_eq!(
            triples,
            vec![Triple::link(&stored.name, &has, &iri("http://example.org/r/dc/x"))]
        );
    }

    #[tokio::test]
    async fn test_update_registration_moves_back_reference() {
        let store = MemoryStore::new();
        let rel = MemberRelation::HasMember(iri("http://example.org/ns#has"));
        let before = direct_container("http://example.org/r/dc/", "http://example.org/r/a", rel.clone());
        let after = direct_container("http://example.org/r/dc/", "http://example.org/r/b", rel);

        update_registration(&store, None, &before).await.unwrap();
        update_registration(&store, Some(&before), &after).await.unwrap();

        let a = store.get(&iri("http://example.org/r/a")).await.unwrap().unwrap();
        let b = store.get(&iri("http://example.org/r/b")).await.unwrap().unwrap();
        assert!(a.membership_resource_for.is_empty());
        assert_eq!(b.membership_resource_for.len(), 1);
    }

    #[test]
    fn test_inject_member_of_once() {
        let container = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/owner",
            MemberRelation::IsMemberOf(iri("http://example.org/ns#partOf")),
        );
        let member = iri("http://example.org/r/dc/m");
        let mut triples = Vec::new();
        inject_member_of(&mut triples, &member, &container);
        inject_member_of(&mut triples, &member, &container);
        assert_eq!(triples.len(), 1);
        assert_eq!(
            triples[0].to_string(),
            "<http://example.org/r/dc/m> <http://example.org/ns#partOf> <http://example.org/r/owner> ."
        );

        let has_member = direct_container(
            "http://example.org/r/dc/",
            "http://example.org/r/owner",
            MemberRelation::HasMember(iri("http://example.org/ns#has")),
        );
        assert!(member_of_triple(&member, &has_member).is_none());
    }

    #[test]
    fn test_strip_membership() {
        let owner = iri("http://example.org/r/owner");
        let has = iri("http://example.org/ns#has");
        let m = iri("http://example.org/r/dc/m");
        let other = iri("http://example.org/ns#other");
        let synthesized = vec![Triple::link(&owner, &has, &m)];
        let mut body = vec![Triple::link(&owner, &has, &m), Triple::link(&owner, &other, &m)];
        strip_membership(&mut body, &synthesized, &[]);
        assert_eq!(body, vec![Triple::link(&owner, &other, &m)]);

        // a stored triple that coincides with a synthesized one is client data
        let stored = vec![Triple::link(&owner, &has, &m)];
        let mut body = vec![Triple::link(&owner, &has, &m), Triple::link(&owner, &other, &m)];
        strip_membership(&mut body, &synthesized, &stored);
        assert_eq!(body.len(), 2);
    }
}
