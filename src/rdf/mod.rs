//! RDF support for the LDP engine
//!
//! This module provides the RDF vocabulary the engine works with:
//! - RDF terms and triples (subject-predicate-object)
//! - LDP / RDF / XSD vocabulary constants
//! - Serialization formats (Turtle, JSON-LD, N-Triples)
//!
//! # Example
//!
//! ```rust
//! use ldp_engine::rdf::{NamedNode, RdfFormat, RdfParser, RdfSerializer, RdfSubject};
//!
//! let body = b"<> <http://purl.org/dc/terms/title> \"Hello\" .";
//! let triples = RdfParser::parse(body, RdfFormat::Turtle, "http://example.org/r/a").unwrap();
//!
//! let subject = NamedNode::new("http://example.org/r/a").unwrap();
//! assert_eq!(triples[0].subject, RdfSubject::from(subject));
//!
//! let ntriples = RdfSerializer::serialize(&triples, RdfFormat::NTriples).unwrap();
//! assert!(ntriples.contains("\"Hello\""));
//! ```

mod types;
pub mod namespace;
pub mod serialization;

pub use types::{
    RdfError, RdfResult,
    RdfSubject, RdfPredicate, RdfObject,
    NamedNode, BlankNode, Literal, Triple,
    TriplePattern, sort_canonical,
};

pub use namespace::{
    NamespaceManager,
    PrefixError, PrefixResult,
};

pub use serialization::{
    RdfFormat, RdfParser, RdfSerializer,
    ParseError, ParseResult,
    SerializeError, SerializeResult,
};
