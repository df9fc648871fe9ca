//! Child URI allocation for POST
//!
//! Names are claimed through the store's uniqueness constraint, never an
//! in-process lock. A [`Reservation`] that is neither committed nor
//! released gives its name back when dropped.

use super::error::{LdpError, LdpResult};
use crate::rdf::NamedNode;
use crate::store::{DocumentStore, StoreError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything except RFC 3986 unreserved characters
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Generated names tried after the slug before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 8;

/// A reserved child name
pub struct Reservation {
    store: Arc<dyn DocumentStore>,
    name: NamedNode,
    armed: bool,
}

impl Reservation {
    /// Guard a name that was reserved directly through the store
    pub(crate) fn adopt(store: Arc<dyn DocumentStore>, name: NamedNode) -> Self {
        Self {
            store,
            name,
            armed: true,
        }
    }

    pub fn name(&self) -> &NamedNode {
        &self.name
    }

    /// Keep the name; the document has been persisted under it
    pub fn commit(mut self) -> NamedNode {
        self.armed = false;
        self.name.clone()
    }

    /// Give the name back. Failures are logged, not returned.
    pub async fn release(mut self) {
        self.armed = false;
        if let Err(e) = self.store.release_uri(&self.name).await {
            warn!("Failed to release reserved URI {}: {}", self.name.as_str(), e);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let store = Arc::clone(&self.store);
        let name = self.name.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.release_uri(&name).await {
                        warn!("Failed to release abandoned URI {}: {}", name.as_str(), e);
                    }
                });
            }
            Err(_) => warn!("No runtime to release abandoned URI {}", name.as_str()),
        }
    }
}

/// Container URI without query or fragment, ending in `/`
pub fn container_base(container: &NamedNode) -> String {
    let iri = container.as_str();
    let end = iri.find(['?', '#']).unwrap_or(iri.len());
    let mut base = iri[..end].to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Turn a client `Slug` into a single safe path segment.
///
/// The slug is percent-decoded, path separators and query/fragment
/// delimiters are dropped, and the remainder is percent-encoded outside the
/// unreserved set. Returns `None` when nothing usable is left.
pub fn slug_segment(slug: &str) -> Option<String> {
    let decoded = percent_decode_str(slug).decode_utf8_lossy();
    let cleaned: String = decoded
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '#') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(utf8_percent_encode(cleaned, SEGMENT).to_string())
}

fn generated_segment() -> String {
    format!("res{}", Uuid::new_v4().simple())
}

/// Reserve a fresh child name under `container`.
///
/// The slug candidate is tried first; on collision (or without a usable
/// slug) generated names are tried up to `max_attempts` times.
pub async fn allocate(
    store: &Arc<dyn DocumentStore>,
    container: &NamedNode,
    slug: Option<&str>,
    max_attempts: usize,
) -> LdpResult<Reservation> {
    let base = container_base(container);
    let slug_candidate = slug.and_then(slug_segment);
    let candidates = slug_candidate
        .into_iter()
        .chain(std::iter::repeat_with(generated_segment).take(max_attempts.max(1)));

    let mut last_name = base.clone();
    for segment in candidates {
        let iri = format!("{}{}", base, segment);
        let Ok(name) = NamedNode::new(iri.as_str()) else {
            debug!("Skipping invalid child IRI {}", iri);
            continue;
        };
        match store.reserve_uri(&name).await {
            Ok(()) => {
                debug!("Reserved {}", name.as_str());
                return Ok(Reservation::adopt(Arc::clone(store), name));
            }
            Err(StoreError::DuplicateName(_)) => {
                debug!("Name {} taken, trying another", name.as_str());
                last_name = iri;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(LdpError::Store(StoreError::DuplicateName(last_name)))
}
