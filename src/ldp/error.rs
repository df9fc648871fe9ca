//! LDP protocol errors

use crate::rdf::{ParseError, SerializeError};
use crate::store::StoreError;
use axum::http::StatusCode;
use thiserror::Error;

/// Protocol-level failure, one variant per response class
#[derive(Error, Debug)]
pub enum LdpError {
    /// Malformed request body
    #[error("Malformed request body: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource was deleted
    #[error("Resource gone: {0}")]
    Gone(String),

    #[error("If-Match header is required to update an existing resource")]
    PreconditionRequired,

    #[error("If-Match does not match the current ETag")]
    PreconditionFailed,

    /// Body adds or removes `ldp:contains` triples
    #[error("Containment triples are server managed and cannot be modified")]
    ContainmentTampering,

    #[error("Invalid membership pattern: {0}")]
    InvalidMembershipPattern(String),

    #[error("Not a container: {0}")]
    NotAContainer(String),

    /// Name is reserved by a creation still in flight
    #[error("Resource is being created concurrently: {0}")]
    ConcurrentCreation(String),

    /// Container updated into a non-container
    #[error("Cannot change {0} from a container to a non-container")]
    InteractionModelDemotion(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("No acceptable representation")]
    NotAcceptable,

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization failure: {0}")]
    Serialize(#[from] SerializeError),
}

pub type LdpResult<T> = Result<T, LdpError>;

impl From<ParseError> for LdpError {
    fn from(e: ParseError) -> Self {
        LdpError::BadRequest(e.to_string())
    }
}

impl LdpError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            LdpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LdpError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            LdpError::NotFound(_) => StatusCode::NOT_FOUND,
            LdpError::Gone(_) => StatusCode::GONE,
            LdpError::PreconditionRequired => StatusCode::PRECONDITION_REQUIRED,
            LdpError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            LdpError::ContainmentTampering
            | LdpError::InvalidMembershipPattern(_)
            | LdpError::NotAContainer(_)
            | LdpError::ConcurrentCreation(_)
            | LdpError::InteractionModelDemotion(_) => StatusCode::CONFLICT,
            LdpError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            LdpError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            LdpError::Store(_) | LdpError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}
