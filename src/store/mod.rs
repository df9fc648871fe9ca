//! Document store adapter
//!
//! The orchestrator talks to persistence only through [`DocumentStore`].
//! Every operation is keyed on the unique resource name; the uniqueness
//! constraint behind [`DocumentStore::reserve_uri`] is the only point where
//! concurrent creations are serialized.

mod memory;
mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::ldp::ResourceDocument;
use crate::rdf::NamedNode;
use async_trait::async_trait;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Name already taken (reservation conflict)
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// No document with this name
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Stored document failed validation on decode
    #[error("Corrupt document {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Blocking store task panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract of the LDP engine.
///
/// `put` replaces the whole document except `membership_resource_for`,
/// which is owned by `register_membership` / `unregister_membership` and
/// survives every other write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, including placeholders and tombstones
    async fn get(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>>;

    /// Insert or replace a document
    async fn put(&self, document: &ResourceDocument) -> StoreResult<()>;

    /// Soft-delete: clear content and keep the name taken.
    ///
    /// Returns `NotFound` when nothing is stored under `name`.
    async fn tombstone(&self, name: &NamedNode) -> StoreResult<()>;

    /// Atomically claim `name` for a creation: insert a placeholder, or
    /// mark an unreserved membership stub as reserved. `DuplicateName` when
    /// the name is materialized, tombstoned or already reserved.
    async fn reserve_uri(&self, name: &NamedNode) -> StoreResult<()>;

    /// Undo `reserve_uri`.
    ///
    /// The reservation is cleared; the document is removed unless back-
    /// references registered meanwhile keep it as a stub. Materialized
    /// documents, tombstones and unreserved stubs are left untouched.
    async fn release_uri(&self, name: &NamedNode) -> StoreResult<()>;

    /// Names of live documents contained by `container`, sorted
    async fn get_containment(&self, container: &NamedNode) -> StoreResult<Vec<NamedNode>>;

    /// The document when it is a live Basic or Direct container
    async fn find_container(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>>;

    /// Record `container` on its membership resource, creating a stub for
    /// the membership resource when it does not exist yet
    async fn register_membership(&self, container: &ResourceDocument) -> StoreResult<()>;

    /// Drop the back-reference from `membership_resource` to `container`
    async fn unregister_membership(
        &self,
        container: &NamedNode,
        membership_resource: &NamedNode,
    ) -> StoreResult<()>;
}
