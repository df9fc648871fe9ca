//! Interaction model resolution
//!
//! Classifies a triple set as RDFSource, Basic or Direct container from the
//! `rdf:type` assertions about the resource itself and extracts Direct
//! Container membership metadata.

use super::document::{InteractionModel, MemberRelation, Membership};
use super::error::{LdpError, LdpResult};
use crate::rdf::namespace::{ldp, rdf};
use crate::rdf::{NamedNode, RdfObject, Triple, TriplePattern};

/// Outcome of resolving a triple set
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub interaction_model: InteractionModel,
    pub membership: Option<Membership>,
}

/// Classify `triples` for the resource `uri`.
///
/// `resource_override` is set when the client sent
/// `Link: <ldp:Resource>; rel="type"` and forces RDFSource whatever the body
/// asserts. Direct Containers must name exactly one membership resource and
/// exactly one of `hasMemberRelation` / `isMemberOfRelation`.
pub fn resolve(triples: &[Triple], uri: &NamedNode, resource_override: bool) -> LdpResult<Classification> {
    if resource_override {
        return Ok(Classification {
            interaction_model: InteractionModel::RdfSource,
            membership: None,
        });
    }

    let types = TriplePattern::subject_predicate(uri, rdf::TYPE);
    let mut model = InteractionModel::RdfSource;
    for ty in types.objects(triples).filter_map(RdfObject::as_named_node) {
        if ty == ldp::DIRECT_CONTAINER {
            model = InteractionModel::DirectContainer;
        } else if ty == ldp::BASIC_CONTAINER && model != InteractionModel::DirectContainer {
            model = InteractionModel::BasicContainer;
        }
    }

    let membership = if model == InteractionModel::DirectContainer {
        Some(membership_pattern(triples, uri)?)
    } else {
        None
    };

    Ok(Classification {
        interaction_model: model,
        membership,
    })
}

fn distinct_objects<'a>(triples: &'a [Triple], uri: &NamedNode, predicate: &str) -> Vec<&'a RdfObject> {
    let pattern = TriplePattern::subject_predicate(uri, predicate);
    let mut values: Vec<&RdfObject> = Vec::new();
    for object in triples.iter().filter(|t| pattern.matches(t)).map(|t| &t.object) {
        if !values.contains(&object) {
            values.push(object);
        }
    }
    values
}

fn single_iri(values: &[&RdfObject], property: &str) -> LdpResult<NamedNode> {
    match values {
        [RdfObject::NamedNode(n)] => Ok(n.clone()),
        [] => Err(LdpError::InvalidMembershipPattern(format!("missing {}", property))),
        [_] => Err(LdpError::InvalidMembershipPattern(format!("{} must be an IRI", property))),
        _ => Err(LdpError::InvalidMembershipPattern(format!("more than one {}", property))),
    }
}

fn membership_pattern(triples: &[Triple], uri: &NamedNode) -> LdpResult<Membership> {
    let resource = single_iri(
        &distinct_objects(triples, uri, ldp::MEMBERSHIP_RESOURCE),
        "ldp:membershipResource",
    )?;

    let has_member = distinct_objects(triples, uri, ldp::HAS_MEMBER_RELATION);
    let is_member_of = distinct_objects(triples, uri, ldp::IS_MEMBER_OF_RELATION);

    let relation = match (has_member.is_empty(), is_member_of.is_empty()) {
        (false, true) => MemberRelation::HasMember(single_iri(&has_member, "ldp:hasMemberRelation")?),
        (true, false) => MemberRelation::IsMemberOf(single_iri(&is_member_of, "ldp:isMemberOfRelation")?),
        (false, false) => {
            return Err(LdpError::InvalidMembershipPattern(
                "both ldp:hasMemberRelation and ldp:isMemberOfRelation".to_string(),
            ))
        }
        (true, true) => {
            return Err(LdpError::InvalidMembershipPattern(
                "missing ldp:hasMemberRelation or ldp:isMemberOfRelation".to_string(),
            ))
        }
    };

    Ok(Membership { resource, relation })
}
