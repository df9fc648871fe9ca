//! LDP Engine
//!
//! A Linked Data Platform 1.0 server: RDF resources, Basic Containers and
//! Direct Containers over HTTP, with server-managed containment and
//! membership, optimistic concurrency through ETags, and pluggable document
//! storage (in-memory or RocksDB).
//!
//! # Layout
//!
//! - [`rdf`]: RDF terms and the Turtle / N-Triples / JSON-LD codec
//! - [`store`]: the [`DocumentStore`](store::DocumentStore) trait and its backends
//! - [`ldp`]: the protocol engine ([`LdpService`](ldp::LdpService))
//! - [`http`]: the axum front end
//! - [`config`]: YAML and environment configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use ldp_engine::ldp::{LdpOptions, LdpRequest, LdpService};
//! use ldp_engine::store::MemoryStore;
//! use axum::http::{Method, StatusCode};
//! use std::sync::Arc;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let service = LdpService::new(Arc::new(MemoryStore::new()), LdpOptions::default());
//!     service.ensure_root_container("http://localhost:3000/r/").await.unwrap();
//!
//!     let mut post = LdpRequest::new("http://localhost:3000/r/");
//!     post.body = "<> <http://purl.org/dc/terms/title> \"Hello\" .".into();
//!     let created = service.handle(&Method::POST, post).await;
//!     assert_eq!(created.status, StatusCode::CREATED);
//! });
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod http;
pub mod ldp;
pub mod rdf;
pub mod store;

pub use config::{ConfigError, ConfigResult, ServerConfig};
pub use http::LdpServer;
pub use ldp::{LdpError, LdpOptions, LdpRequest, LdpResponse, LdpResult, LdpService};
pub use store::{DocumentStore, MemoryStore, RocksStore, StoreError, StoreResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
