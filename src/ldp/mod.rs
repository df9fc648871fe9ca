//! Linked Data Platform protocol engine
//!
//! Turns HTTP-level operations on RDF resources into store operations while
//! enforcing the LDP rules:
//! - interaction models (RDF Source, Basic Container, Direct Container)
//! - server-managed containment (`ldp:contains`) and membership triples
//! - URI allocation for POST with `Slug` hints
//! - optimistic concurrency through weak ETags
//! - `Prefer` driven representation shaping for containers
//!
//! Containment and membership are never persisted as triples; they are
//! derived from the store on every read and stripped from every write.

mod allocator;
mod concurrency;
mod containment;
mod document;
mod error;
pub mod headers;
mod membership;
mod representation;
mod resolver;
mod service;

pub use allocator::{allocate, slug_segment, Reservation, DEFAULT_MAX_ATTEMPTS};
pub use concurrency::{check_if_match, not_modified, ETag};
pub use containment::{is_containment_triple, strip_containment, Containment};
pub use document::{InteractionModel, MemberRelation, Membership, MembershipBackRef, ResourceDocument};
pub use error::{LdpError, LdpResult};
pub use headers::Preferences;
pub use membership::{membership_triples, strip_membership};
pub use representation::{Representation, Synthesized};
pub use resolver::{resolve, Classification};
pub use service::{LdpOptions, LdpRequest, LdpResponse, LdpService};
