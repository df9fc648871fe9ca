//! RDF serialization formats
//!
//! Supports:
//! - Turtle (`text/turtle`)
//! - JSON-LD (`application/ld+json`, also accepted as `application/json`)
//! - N-Triples (`application/n-triples`)

mod jsonld;
mod turtle;

pub use jsonld::{JsonLdParserWrapper, JsonLdSerializerWrapper};
pub use turtle::{NTriplesParserWrapper, NTriplesSerializerWrapper, TurtleParserWrapper, TurtleSerializerWrapper};

use super::Triple;
use thiserror::Error;

pub const TURTLE: &str = "text/turtle";
pub const JSON_LD: &str = "application/ld+json";
pub const JSON: &str = "application/json";
pub const N_TRIPLES: &str = "application/n-triples";

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// JSON-LD format (.jsonld)
    JsonLd,
    /// N-Triples format (.nt)
    NTriples,
}

impl RdfFormat {
    /// Formats in server preference order
    pub const ALL: [RdfFormat; 3] = [RdfFormat::Turtle, RdfFormat::JsonLd, RdfFormat::NTriples];

    /// Media type written in `Content-Type`
    pub fn media_type(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => TURTLE,
            RdfFormat::JsonLd => JSON_LD,
            RdfFormat::NTriples => N_TRIPLES,
        }
    }

    /// Map a media type essence (no parameters) to a format
    pub fn from_media_type(essence: &str) -> Option<Self> {
        match essence.trim().to_ascii_lowercase().as_str() {
            TURTLE => Some(RdfFormat::Turtle),
            JSON_LD | JSON => Some(RdfFormat::JsonLd),
            N_TRIPLES => Some(RdfFormat::NTriples),
            _ => None,
        }
    }

    /// Comma separated list for `Accept-Post`
    pub fn accept_post() -> String {
        [TURTLE, JSON_LD, JSON, N_TRIPLES].join(", ")
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Syntax error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid base IRI
    #[error("Invalid base IRI {0}: {1}")]
    InvalidBase(String, String),

    /// Body is not UTF-8
    #[error("Body is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// Construct the parser understands but does not support
    #[error("Unsupported construct: {0}")]
    Unsupported(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse a request body, resolving relative IRIs against `base_iri`
    pub fn parse(input: &[u8], format: RdfFormat, base_iri: &str) -> ParseResult<Vec<Triple>> {
        let text = std::str::from_utf8(input)?;
        match format {
            RdfFormat::Turtle => TurtleParserWrapper::parse(text, Some(base_iri)),
            RdfFormat::JsonLd => JsonLdParserWrapper::parse(text, Some(base_iri)),
            RdfFormat::NTriples => NTriplesParserWrapper::parse(text),
        }
    }
}

/// RDF serializer
pub struct RdfSerializer;

impl RdfSerializer {
    /// Serialize triples to a string
    pub fn serialize(triples: &[Triple], format: RdfFormat) -> SerializeResult<String> {
        match format {
            RdfFormat::Turtle => TurtleSerializerWrapper::serialize(triples),
            RdfFormat::JsonLd => JsonLdSerializerWrapper::serialize(triples),
            RdfFormat::NTriples => NTriplesSerializerWrapper::serialize(triples),
        }
    }
}
