//! In-memory document store

use super::{DocumentStore, StoreError, StoreResult};
use crate::ldp::ResourceDocument;
use crate::rdf::NamedNode;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// HashMap-backed store for tests and ephemeral servers.
///
/// Reservation is an insert-if-absent under the write lock, which gives the
/// same uniqueness guarantee as a unique index.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, ResourceDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, placeholders and tombstones included
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>> {
        Ok(self.documents.read().await.get(name.as_str()).cloned())
    }

    async fn put(&self, document: &ResourceDocument) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let mut document = document.clone();
        if let Some(existing) = documents.get(document.name.as_str()) {
            document.membership_resource_for = existing.membership_resource_for.clone();
        }
        debug!("Stored document {}", document.name.as_str());
        documents.insert(document.name.as_str().to_string(), document);
        Ok(())
    }

    async fn tombstone(&self, name: &NamedNode) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let doc = documents
            .get_mut(name.as_str())
            .ok_or_else(|| StoreError::NotFound(name.as_str().to_string()))?;
        doc.tombstone();
        debug!("Tombstoned document {}", name.as_str());
        Ok(())
    }

    async fn reserve_uri(&self, name: &NamedNode) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(name.as_str()) {
            Some(stub) if stub.is_stub() => stub.reserved = true,
            Some(_) => return Err(StoreError::DuplicateName(name.as_str().to_string())),
            None => {
                documents.insert(
                    name.as_str().to_string(),
                    ResourceDocument::placeholder(name.clone()),
                );
            }
        }
        Ok(())
    }

    async fn release_uri(&self, name: &NamedNode) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let vacant = match documents.get_mut(name.as_str()) {
            Some(doc) if doc.is_placeholder() => {
                doc.reserved = false;
                doc.is_vacant()
            }
            _ => false,
        };
        if vacant {
            documents.remove(name.as_str());
        }
        Ok(())
    }

    async fn get_containment(&self, container: &NamedNode) -> StoreResult<Vec<NamedNode>> {
        let documents = self.documents.read().await;
        let mut children: Vec<NamedNode> = documents
            .values()
            .filter(|d| d.is_live() && d.contained_by.as_ref() == Some(container))
            .map(|d| d.name.clone())
            .collect();
        children.sort();
        Ok(children)
    }

    async fn find_container(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(name.as_str())
            .filter(|d| d.is_live() && d.is_container())
            .cloned())
    }

    async fn register_membership(&self, container: &ResourceDocument) -> StoreResult<()> {
        let Some(resource) = container.membership_resource() else {
            return Ok(());
        };
        let mut documents = self.documents.write().await;
        documents
            .entry(resource.as_str().to_string())
            .or_insert_with(|| ResourceDocument::stub(resource.clone()))
            .add_back_ref(container);
        debug!(
            "Registered {} as membership resource of {}",
            resource.as_str(),
            container.name.as_str()
        );
        Ok(())
    }

    async fn unregister_membership(
        &self,
        container: &NamedNode,
        membership_resource: &NamedNode,
    ) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents.get_mut(membership_resource.as_str()) else {
            return Ok(());
        };
        // a stub that lost its last back-reference is dropped
        if doc.remove_back_ref(container) && doc.is_vacant() {
            documents.remove(membership_resource.as_str());
        }
        Ok(())
    }
}
