//! Stored resource documents
//!
//! A `ResourceDocument` is the unit the store keeps per resource name. It
//! holds only what clients wrote; containment and membership triples are
//! derived at read time and never appear in `triples`.

use crate::rdf::namespace::ldp;
use crate::rdf::{NamedNode, Triple};
use std::fmt;

/// LDP interaction model of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionModel {
    RdfSource,
    BasicContainer,
    DirectContainer,
}

impl InteractionModel {
    pub fn is_container(&self) -> bool {
        !matches!(self, InteractionModel::RdfSource)
    }

    /// IRI of the most specific LDP type
    pub fn type_iri(&self) -> &'static str {
        match self {
            InteractionModel::RdfSource => ldp::RDF_SOURCE,
            InteractionModel::BasicContainer => ldp::BASIC_CONTAINER,
            InteractionModel::DirectContainer => ldp::DIRECT_CONTAINER,
        }
    }

    /// Every LDP type advertised in `Link: rel="type"` headers
    pub fn link_types(&self) -> Vec<&'static str> {
        let mut types = vec![ldp::RESOURCE, ldp::RDF_SOURCE];
        if self.is_container() {
            types.push(ldp::CONTAINER);
            types.push(self.type_iri());
        }
        types
    }
}

impl fmt::Display for InteractionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionModel::RdfSource => "RDFSource",
            InteractionModel::BasicContainer => "BasicContainer",
            InteractionModel::DirectContainer => "DirectContainer",
        };
        f.write_str(name)
    }
}

/// The single membership relation a Direct Container declares
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberRelation {
    /// `ldp:hasMemberRelation`: `(membershipResource, rel, member)`
    HasMember(NamedNode),
    /// `ldp:isMemberOfRelation`: `(member, rel, membershipResource)`
    IsMemberOf(NamedNode),
}

/// Membership metadata of a Direct Container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Membership {
    pub resource: NamedNode,
    pub relation: MemberRelation,
}

/// Back-reference kept on a membership resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipBackRef {
    pub container: NamedNode,
    pub has_member_relation: Option<NamedNode>,
}

/// Stored form of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
    pub name: NamedNode,
    pub triples: Vec<Triple>,
    pub contained_by: Option<NamedNode>,
    /// `None` for a reservation placeholder or a membership stub
    pub interaction_model: Option<InteractionModel>,
    pub membership: Option<Membership>,
    pub membership_resource_for: Vec<MembershipBackRef>,
    /// Held by an in-flight creation; independent of back-references
    pub reserved: bool,
    pub deleted: bool,
}

impl ResourceDocument {
    /// Membership stub: a name that only carries back-references
    pub fn stub(name: NamedNode) -> Self {
        Self {
            name,
            triples: Vec::new(),
            contained_by: None,
            interaction_model: None,
            membership: None,
            membership_resource_for: Vec::new(),
            reserved: false,
            deleted: false,
        }
    }

    /// Placeholder holding a reserved name
    pub fn placeholder(name: NamedNode) -> Self {
        Self {
            reserved: true,
            ..Self::stub(name)
        }
    }

    pub fn new(name: NamedNode, triples: Vec<Triple>, interaction_model: InteractionModel) -> Self {
        Self {
            triples,
            interaction_model: Some(interaction_model),
            ..Self::stub(name)
        }
    }

    /// Materialized and not tombstoned
    pub fn is_live(&self) -> bool {
        !self.deleted && self.interaction_model.is_some()
    }

    /// Reserved name that no creation has materialized yet, whether or not
    /// a container registered it as a membership resource meanwhile
    pub fn is_placeholder(&self) -> bool {
        self.reserved && !self.deleted && self.interaction_model.is_none()
    }

    /// Unmaterialized and unreserved; only back-references hold the name
    pub fn is_stub(&self) -> bool {
        !self.reserved && !self.deleted && self.interaction_model.is_none()
    }

    /// A stub without back-references: nothing holds the name any more
    pub fn is_vacant(&self) -> bool {
        self.is_stub() && self.membership_resource_for.is_empty()
    }

    pub fn is_container(&self) -> bool {
        self.interaction_model.map_or(false, |m| m.is_container())
    }

    pub fn membership_resource(&self) -> Option<&NamedNode> {
        self.membership.as_ref().map(|m| &m.resource)
    }

    pub fn has_member_relation(&self) -> Option<&NamedNode> {
        match self.membership.as_ref().map(|m| &m.relation) {
            Some(MemberRelation::HasMember(rel)) => Some(rel),
            _ => None,
        }
    }

    pub fn is_member_of_relation(&self) -> Option<&NamedNode> {
        match self.membership.as_ref().map(|m| &m.relation) {
            Some(MemberRelation::IsMemberOf(rel)) => Some(rel),
            _ => None,
        }
    }

    /// Record that `container` uses this document as its membership resource
    pub fn add_back_ref(&mut self, container: &ResourceDocument) {
        self.membership_resource_for.retain(|r| r.container != container.name);
        self.membership_resource_for.push(MembershipBackRef {
            container: container.name.clone(),
            has_member_relation: container.has_member_relation().cloned(),
        });
    }

    /// Returns true when a back-reference was removed
    pub fn remove_back_ref(&mut self, container: &NamedNode) -> bool {
        let before = self.membership_resource_for.len();
        self.membership_resource_for.retain(|r| &r.container != container);
        before != self.membership_resource_for.len()
    }

    /// Clear content for a tombstone; the name stays taken
    pub fn tombstone(&mut self) {
        self.deleted = true;
        self.reserved = false;
        self.triples.clear();
        self.contained_by = None;
        self.membership = None;
    }
}
