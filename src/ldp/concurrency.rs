//! Entity tags and conditional requests

use super::error::{LdpError, LdpResult};
use crate::rdf::Triple;
use sha2::{Digest, Sha256};
use std::fmt;

/// Weak validator over a synthesized triple set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Hash of the sorted canonical N-Triples lines.
    ///
    /// Independent of triple order and of the serialization format the
    /// representation is eventually written in.
    pub fn compute(triples: &[Triple]) -> Self {
        let mut lines: Vec<String> = triples.iter().map(|t| t.to_string()).collect();
        lines.sort_unstable();
        lines.dedup();

        let mut hasher = Sha256::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        ETag(format!("W/\"{:x}\"", hasher.finalize()))
    }

    /// Header value, `W/"..."`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn opaque(&self) -> &str {
        opaque_tag(&self.0)
    }

    /// Weak comparison against an `If-Match` / `If-None-Match` value.
    ///
    /// The header may list several tags; `*` matches any current
    /// representation.
    pub fn matches_header(&self, header: &str) -> bool {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || (!candidate.is_empty() && opaque_tag(candidate) == self.opaque())
        })
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn opaque_tag(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.trim_matches('"')
}

/// `If-Match` handling for updates of an existing resource
pub fn check_if_match(if_match: Option<&str>, current: &ETag) -> LdpResult<()> {
    match if_match {
        None => Err(LdpError::PreconditionRequired),
        Some(header) if current.matches_header(header) => Ok(()),
        Some(_) => Err(LdpError::PreconditionFailed),
    }
}

/// True when a GET/HEAD can be answered with 304
pub fn not_modified(if_none_match: Option<&str>, current: &ETag) -> bool {
    if_none_match.map_or(false, |header| current.matches_header(header))
}
