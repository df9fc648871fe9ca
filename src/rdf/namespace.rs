//! Vocabulary constants and namespace prefix management
//!
//! The LDP and RDF terms the engine reasons about, plus the prefix table
//! used to compact IRIs in JSON-LD output.

use std::collections::HashMap;
use thiserror::Error;

/// `http://www.w3.org/ns/ldp#`
pub mod ldp {
    pub const NS: &str = "http://www.w3.org/ns/ldp#";

    pub const RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
    pub const RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
    pub const CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
    pub const BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
    pub const DIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#DirectContainer";

    pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
    pub const MEMBERSHIP_RESOURCE: &str = "http://www.w3.org/ns/ldp#membershipResource";
    pub const HAS_MEMBER_RELATION: &str = "http://www.w3.org/ns/ldp#hasMemberRelation";
    pub const IS_MEMBER_OF_RELATION: &str = "http://www.w3.org/ns/ldp#isMemberOfRelation";

    pub const PREFER_CONTAINMENT: &str = "http://www.w3.org/ns/ldp#PreferContainment";
    pub const PREFER_MEMBERSHIP: &str = "http://www.w3.org/ns/ldp#PreferMembership";
    pub const PREFER_MINIMAL_CONTAINER: &str = "http://www.w3.org/ns/ldp#PreferMinimalContainer";
    pub const PREFER_EMPTY_CONTAINER: &str = "http://www.w3.org/ns/ldp#PreferEmptyContainer";
}

/// `http://www.w3.org/1999/02/22-rdf-syntax-ns#`
pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// `http://www.w3.org/2001/XMLSchema#`
pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Namespace manager with common prefixes
pub struct NamespaceManager {
    /// Prefix → IRI mappings
    prefixes: HashMap<String, String>,
}

impl NamespaceManager {
    /// Create a new namespace manager with common prefixes
    pub fn new() -> Self {
        let mut mgr = Self {
            prefixes: HashMap::new(),
        };

        mgr.add_prefix("ldp", ldp::NS);
        mgr.add_prefix("rdf", rdf::NS);
        mgr.add_prefix("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        mgr.add_prefix("xsd", xsd::NS);
        mgr.add_prefix("foaf", "http://xmlns.com/foaf/0.1/");
        mgr.add_prefix("dcterms", "http://purl.org/dc/terms/");

        mgr
    }

    /// Add a prefix
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        match compact_iri.split_once(':') {
            Some((prefix, local)) => Ok(format!("{}{}", self.get_iri(prefix)?, local)),
            None => Err(PrefixError::InvalidIri(compact_iri.to_string())),
        }
    }

    /// Compact an IRI using known prefixes.
    ///
    /// Returns the prefix together with the compact form. Local parts that
    /// contain path or fragment delimiters are left alone so the result
    /// never reads back as a different IRI.
    pub fn compact<'a>(&'a self, iri: &str) -> Option<(&'a str, String)> {
        self.prefixes.iter().find_map(|(prefix, namespace_iri)| {
            let local = iri.strip_prefix(namespace_iri.as_str())?;
            if local.is_empty() || local.contains(['/', '#', '?', ':']) {
                return None;
            }
            Some((prefix.as_str(), format!("{}:{}", prefix, local)))
        })
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}
