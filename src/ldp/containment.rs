//! Containment synthesis
//!
//! `ldp:contains` triples are derived from the children's `containedBy`
//! back-pointers and never stored.

use super::document::ResourceDocument;
use super::error::{LdpError, LdpResult};
use crate::rdf::namespace::ldp;
use crate::rdf::{NamedNode, RdfObject, Triple};
use crate::store::DocumentStore;
use std::collections::BTreeSet;

/// Current children of a container, loaded once per request
#[derive(Debug, Clone, PartialEq)]
pub struct Containment {
    container: NamedNode,
    children: Vec<NamedNode>,
}

impl Containment {
    /// Containment of a resource that has no children (or is not a container)
    pub fn empty(container: NamedNode) -> Self {
        Self {
            container,
            children: Vec::new(),
        }
    }

    pub fn new(container: NamedNode, mut children: Vec<NamedNode>) -> Self {
        children.sort();
        children.dedup();
        Self { container, children }
    }

    /// Query the store for the live children of `document`
    pub async fn load(store: &dyn DocumentStore, document: &ResourceDocument) -> LdpResult<Self> {
        if !document.is_container() {
            return Ok(Self::empty(document.name.clone()));
        }
        let children = store.get_containment(&document.name).await?;
        Ok(Self::new(document.name.clone(), children))
    }

    pub fn children(&self) -> &[NamedNode] {
        &self.children
    }

    /// `(container, ldp:contains, child)` per child, ordered by child URI
    pub fn triples(&self) -> Vec<Triple> {
        let contains = contains_predicate();
        self.children
            .iter()
            .map(|child| Triple::link(&self.container, &contains, child))
            .collect()
    }

    /// Reject a submitted body whose `ldp:contains` assertions differ from
    /// the current containment.
    ///
    /// A body without any `ldp:contains` triple is the minimal
    /// representation and is accepted as is.
    pub fn check_submitted(&self, submitted: &[Triple]) -> LdpResult<()> {
        let asserted: Vec<&Triple> = submitted
            .iter()
            .filter(|t| is_containment_triple(t, &self.container))
            .collect();
        if asserted.is_empty() {
            return Ok(());
        }

        let mut claimed = BTreeSet::new();
        for triple in asserted {
            match &triple.object {
                RdfObject::NamedNode(child) => {
                    claimed.insert(child.clone());
                }
                _ => return Err(LdpError::ContainmentTampering),
            }
        }
        let current: BTreeSet<NamedNode> = self.children.iter().cloned().collect();
        if claimed == current {
            Ok(())
        } else {
            Err(LdpError::ContainmentTampering)
        }
    }
}

fn contains_predicate() -> NamedNode {
    NamedNode::new_unchecked(ldp::CONTAINS)
}

/// True for `(uri, ldp:contains, *)`
pub fn is_containment_triple(triple: &Triple, uri: &NamedNode) -> bool {
    triple.predicate.as_str() == ldp::CONTAINS && triple.subject.as_named_node() == Some(uri)
}

/// Remove every `(uri, ldp:contains, *)` triple
pub fn strip_containment(triples: &mut Vec<Triple>, uri: &NamedNode) {
    triples.retain(|t| !is_containment_triple(t, uri));
}
