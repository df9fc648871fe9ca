//! Synthesized representations
//!
//! Containment and membership for a document are loaded once per request
//! and shared by the ETag, the response body and update validation.

use super::concurrency::ETag;
use super::containment::Containment;
use super::document::ResourceDocument;
use super::error::LdpResult;
use super::headers::Preferences;
use super::membership::membership_triples;
use crate::rdf::Triple;
use crate::store::DocumentStore;

/// Derived triples of one document at one point in time
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub containment: Containment,
    pub membership: Vec<Triple>,
}

/// Triples to send, with their validator
#[derive(Debug, Clone)]
pub struct Representation {
    pub triples: Vec<Triple>,
    pub etag: ETag,
    /// A `Prefer` hint changed the triple set
    pub preference_applied: bool,
}

impl Synthesized {
    pub async fn load(store: &dyn DocumentStore, document: &ResourceDocument) -> LdpResult<Self> {
        let containment = Containment::load(store, document).await?;
        let membership = membership_triples(store, document, &containment).await?;
        Ok(Self {
            containment,
            membership,
        })
    }

    /// Stored triples plus the derived ones the preferences ask for.
    ///
    /// Preferences are only honored on containers, and only the LDP ones.
    pub fn representation(&self, document: &ResourceDocument, prefs: &Preferences) -> Representation {
        let applies = document.is_container() && prefs.is_recognized();
        let (containment, membership) = if applies {
            (prefs.include_containment(), prefs.include_membership())
        } else {
            (true, true)
        };

        let mut triples = document.triples.clone();
        if containment {
            triples.extend(self.containment.triples());
        }
        if membership {
            // a stored triple may coincide with a synthesized one
            let extra: Vec<Triple> = self
                .membership
                .iter()
                .filter(|t| !document.triples.contains(t))
                .cloned()
                .collect();
            triples.extend(extra);
        }
        let etag = ETag::compute(&triples);

        Representation {
            triples,
            etag,
            preference_applied: applies,
        }
    }

    /// Validator of the full representation, used for `If-Match`
    pub fn default_etag(&self, document: &ResourceDocument) -> ETag {
        self.representation(document, &Preferences::default()).etag
    }
}
