//! RocksDB document store
//!
//! Column families:
//! - `documents`: resource name -> bincode-encoded `StoredDocument`
//! - `containment`: `container \0 child` -> empty, for live children only

use super::{DocumentStore, StoreError, StoreResult};
use crate::ldp::{InteractionModel, MemberRelation, Membership, MembershipBackRef, ResourceDocument};
use crate::rdf::{BlankNode, Literal, NamedNode, RdfObject, RdfPredicate, RdfSubject, Triple};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

const CF_DOCUMENTS: &str = "documents";
const CF_CONTAINMENT: &str = "containment";

#[derive(Debug, Clone, Serialize, Deserialize)]
enum StoredTerm {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        language: Option<String>,
        datatype: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTriple {
    subject: StoredTerm,
    predicate: String,
    object: StoredTerm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum StoredModel {
    RdfSource,
    BasicContainer,
    DirectContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum StoredRelation {
    HasMember(String),
    IsMemberOf(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBackRef {
    container: String,
    has_member_relation: Option<String>,
}

/// Serialized document for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    name: String,
    triples: Vec<StoredTriple>,
    contained_by: Option<String>,
    interaction_model: Option<StoredModel>,
    membership: Option<(String, StoredRelation)>,
    membership_resource_for: Vec<StoredBackRef>,
    reserved: bool,
    deleted: bool,
}

impl From<&ResourceDocument> for StoredDocument {
    fn from(doc: &ResourceDocument) -> Self {
        Self {
            name: doc.name.as_str().to_string(),
            triples: doc.triples.iter().map(encode_triple).collect(),
            contained_by: doc.contained_by.as_ref().map(|n| n.as_str().to_string()),
            interaction_model: doc.interaction_model.map(|m| match m {
                InteractionModel::RdfSource => StoredModel::RdfSource,
                InteractionModel::BasicContainer => StoredModel::BasicContainer,
                InteractionModel::DirectContainer => StoredModel::DirectContainer,
            }),
            membership: doc.membership.as_ref().map(|m| {
                let relation = match &m.relation {
                    MemberRelation::HasMember(rel) => StoredRelation::HasMember(rel.as_str().to_string()),
                    MemberRelation::IsMemberOf(rel) => StoredRelation::IsMemberOf(rel.as_str().to_string()),
                };
                (m.resource.as_str().to_string(), relation)
            }),
            membership_resource_for: doc
                .membership_resource_for
                .iter()
                .map(|r| StoredBackRef {
                    container: r.container.as_str().to_string(),
                    has_member_relation: r.has_member_relation.as_ref().map(|n| n.as_str().to_string()),
                })
                .collect(),
            reserved: doc.reserved,
            deleted: doc.deleted,
        }
    }
}

fn encode_term_subject(subject: &RdfSubject) -> StoredTerm {
    match subject {
        RdfSubject::NamedNode(n) => StoredTerm::Iri(n.as_str().to_string()),
        RdfSubject::BlankNode(b) => StoredTerm::Blank(b.as_str().to_string()),
    }
}

fn encode_triple(triple: &Triple) -> StoredTriple {
    let object = match &triple.object {
        RdfObject::NamedNode(n) => StoredTerm::Iri(n.as_str().to_string()),
        RdfObject::BlankNode(b) => StoredTerm::Blank(b.as_str().to_string()),
        RdfObject::Literal(l) => StoredTerm::Literal {
            value: l.value().to_string(),
            language: l.language().map(str::to_string),
            datatype: l.datatype().as_str().to_string(),
        },
    };
    StoredTriple {
        subject: encode_term_subject(&triple.subject),
        predicate: triple.predicate.as_str().to_string(),
        object,
    }
}

impl StoredDocument {
    /// Rebuild and validate the domain document
    fn decode(self) -> StoreResult<ResourceDocument> {
        let name = self.name.clone();
        let corrupt = |reason: String| StoreError::Corrupt { name: name.clone(), reason };
        let iri = |s: &str| NamedNode::new(s).map_err(|e| corrupt(e.to_string()));

        let mut triples = Vec::with_capacity(self.triples.len());
        for t in &self.triples {
            let subject: RdfSubject = match &t.subject {
                StoredTerm::Iri(s) => iri(s.as_str())?.into(),
                StoredTerm::Blank(id) => BlankNode::from_id(id).map_err(|e| corrupt(e.to_string()))?.into(),
                StoredTerm::Literal { .. } => return Err(corrupt("literal in subject position".to_string())),
            };
            let predicate: RdfPredicate = iri(t.predicate.as_str())?.into();
            let object: RdfObject = match &t.object {
                StoredTerm::Iri(s) => iri(s.as_str())?.into(),
                StoredTerm::Blank(id) => BlankNode::from_id(id).map_err(|e| corrupt(e.to_string()))?.into(),
                StoredTerm::Literal { value, language: Some(lang), .. } => {
                    Literal::new_language_tagged_literal(value.as_str(), lang.as_str())
                        .map_err(|e| corrupt(e.to_string()))?
                        .into()
                }
                StoredTerm::Literal { value, language: None, datatype } => {
                    Literal::new_typed_literal(value.as_str(), iri(datatype.as_str())?).into()
                }
            };
            triples.push(Triple::new(subject, predicate, object));
        }

        let membership = match &self.membership {
            Some((resource, relation)) => Some(Membership {
                resource: iri(resource.as_str())?,
                relation: match relation {
                    StoredRelation::HasMember(rel) => MemberRelation::HasMember(iri(rel.as_str())?),
                    StoredRelation::IsMemberOf(rel) => MemberRelation::IsMemberOf(iri(rel.as_str())?),
                },
            }),
            None => None,
        };

        let mut membership_resource_for = Vec::with_capacity(self.membership_resource_for.len());
        for r in &self.membership_resource_for {
            membership_resource_for.push(MembershipBackRef {
                container: iri(r.container.as_str())?,
                has_member_relation: r.has_member_relation.as_deref().map(iri).transpose()?,
            });
        }

        Ok(ResourceDocument {
            name: iri(self.name.as_str())?,
            triples,
            contained_by: self.contained_by.as_deref().map(iri).transpose()?,
            interaction_model: self.interaction_model.map(|m| match m {
                StoredModel::RdfSource => InteractionModel::RdfSource,
                StoredModel::BasicContainer => InteractionModel::BasicContainer,
                StoredModel::DirectContainer => InteractionModel::DirectContainer,
            }),
            membership,
            membership_resource_for,
            reserved: self.reserved,
            deleted: self.deleted,
        })
    }
}

/// RocksDB-based persistent document store.
///
/// RocksDB calls block, so every trait method runs on the blocking pool.
pub struct RocksStore {
    inner: Arc<RocksInner>,
}

struct RocksInner {
    db: DB,
    /// Serializes read-modify-write sequences (reservation, index upkeep)
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a store at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        info!("Opening document store at: {}", path.as_ref().display());

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(CF_DOCUMENTS, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_CONTAINMENT, Self::cf_options()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)?;

        info!("Document store opened successfully");

        Ok(Self {
            inner: Arc::new(RocksInner {
                db,
                write_lock: Mutex::new(()),
            }),
        })
    }

    fn cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    /// Flush all data to disk
    pub fn flush(&self) -> StoreResult<()> {
        self.inner.db.flush()?;
        debug!("Flushed document store to disk");
        Ok(())
    }

    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&RocksInner) -> StoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(inner.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl RocksInner {
    fn cf(&self, name: &str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::ColumnFamily(name.to_string()))
    }

    fn containment_key(container: &str, child: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(container.len() + child.len() + 1);
        key.extend_from_slice(container.as_bytes());
        key.push(0);
        key.extend_from_slice(child.as_bytes());
        key
    }

    fn read(&self, name: &str) -> StoreResult<Option<ResourceDocument>> {
        let cf = self.cf(CF_DOCUMENTS)?;
        match self.db.get_cf(cf, name.as_bytes())? {
            Some(value) => {
                let stored: StoredDocument = bincode::deserialize(&value)?;
                Ok(Some(stored.decode()?))
            }
            None => Ok(None),
        }
    }

    /// Write a document and keep the containment index in step with it
    fn write(&self, previous: Option<&ResourceDocument>, doc: &ResourceDocument) -> StoreResult<()> {
        let documents = self.cf(CF_DOCUMENTS)?;
        let containment = self.cf(CF_CONTAINMENT)?;
        let name = doc.name.as_str();

        let mut batch = WriteBatch::default();
        if let Some(parent) = previous.filter(|p| p.is_live()).and_then(|p| p.contained_by.as_ref()) {
            batch.delete_cf(containment, Self::containment_key(parent.as_str(), name));
        }
        if let Some(parent) = doc.contained_by.as_ref().filter(|_| doc.is_live()) {
            batch.put_cf(containment, Self::containment_key(parent.as_str(), name), b"");
        }
        batch.put_cf(documents, name.as_bytes(), bincode::serialize(&StoredDocument::from(doc))?);
        self.db.write(batch)?;
        Ok(())
    }

    fn remove(&self, name: &NamedNode) -> StoreResult<()> {
        let cf = self.cf(CF_DOCUMENTS)?;
        self.db.delete_cf(cf, name.as_str().as_bytes())?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, document: &ResourceDocument) -> StoreResult<()> {
        let _guard = self.lock();
        let previous = self.read(document.name.as_str())?;
        let mut document = document.clone();
        if let Some(prev) = &previous {
            document.membership_resource_for = prev.membership_resource_for.clone();
        }
        self.write(previous.as_ref(), &document)?;
        debug!("Stored document {}", document.name.as_str());
        Ok(())
    }

    fn tombstone(&self, name: &NamedNode) -> StoreResult<()> {
        let _guard = self.lock();
        let previous = self
            .read(name.as_str())?
            .ok_or_else(|| StoreError::NotFound(name.as_str().to_string()))?;
        let mut doc = previous.clone();
        doc.tombstone();
        self.write(Some(&previous), &doc)?;
        debug!("Tombstoned document {}", name.as_str());
        Ok(())
    }

    fn reserve(&self, name: &NamedNode) -> StoreResult<()> {
        let _guard = self.lock();
        match self.read(name.as_str())? {
            Some(stub) if stub.is_stub() => {
                let mut doc = stub.clone();
                doc.reserved = true;
                self.write(Some(&stub), &doc)
            }
            Some(_) => Err(StoreError::DuplicateName(name.as_str().to_string())),
            None => self.write(None, &ResourceDocument::placeholder(name.clone())),
        }
    }

    fn release(&self, name: &NamedNode) -> StoreResult<()> {
        let _guard = self.lock();
        let Some(previous) = self.read(name.as_str())?.filter(ResourceDocument::is_placeholder) else {
            return Ok(());
        };
        let mut doc = previous.clone();
        doc.reserved = false;
        if doc.is_vacant() {
            self.remove(name)
        } else {
            self.write(Some(&previous), &doc)
        }
    }

    fn containment(&self, container: &NamedNode) -> StoreResult<Vec<NamedNode>> {
        let cf = self.cf(CF_CONTAINMENT)?;
        let prefix = Self::containment_key(container.as_str(), "");
        let mut children = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward)) {
            let (key, _) = item?;
            let Some(child) = key.strip_prefix(prefix.as_slice()) else { break };
            let child = std::str::from_utf8(child).map_err(|e| StoreError::Corrupt {
                name: container.as_str().to_string(),
                reason: e.to_string(),
            })?;
            children.push(NamedNode::new(child).map_err(|e| StoreError::Corrupt {
                name: child.to_string(),
                reason: e.to_string(),
            })?);
        }

        // keys sort bytewise, which matches string order
        Ok(children)
    }

    fn register(&self, container: &ResourceDocument) -> StoreResult<()> {
        let Some(resource) = container.membership_resource() else {
            return Ok(());
        };
        let _guard = self.lock();
        let previous = self.read(resource.as_str())?;
        let mut doc = previous
            .clone()
            .unwrap_or_else(|| ResourceDocument::stub(resource.clone()));
        doc.add_back_ref(container);
        self.write(previous.as_ref(), &doc)?;
        debug!(
            "Registered {} as membership resource of {}",
            resource.as_str(),
            container.name.as_str()
        );
        Ok(())
    }

    fn unregister(&self, container: &NamedNode, membership_resource: &NamedNode) -> StoreResult<()> {
        let _guard = self.lock();
        if let Some(previous) = self.read(membership_resource.as_str())? {
            let mut doc = previous.clone();
            if !doc.remove_back_ref(container) {
                return Ok(());
            }
            if doc.is_vacant() {
                self.remove(membership_resource)?;
            } else {
                self.write(Some(&previous), &doc)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RocksStore {
    async fn get(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>> {
        let name = name.clone();
        self.blocking(move |db| db.read(name.as_str())).await
    }

    async fn put(&self, document: &ResourceDocument) -> StoreResult<()> {
        let document = document.clone();
        self.blocking(move |db| db.put(&document)).await
    }

    async fn tombstone(&self, name: &NamedNode) -> StoreResult<()> {
        let name = name.clone();
        self.blocking(move |db| db.tombstone(&name)).await
    }

    async fn reserve_uri(&self, name: &NamedNode) -> StoreResult<()> {
        let name = name.clone();
        self.blocking(move |db| db.reserve(&name)).await
    }

    async fn release_uri(&self, name: &NamedNode) -> StoreResult<()> {
        let name = name.clone();
        self.blocking(move |db| db.release(&name)).await
    }

    async fn get_containment(&self, container: &NamedNode) -> StoreResult<Vec<NamedNode>> {
        let container = container.clone();
        self.blocking(move |db| db.containment(&container)).await
    }

    async fn find_container(&self, name: &NamedNode) -> StoreResult<Option<ResourceDocument>> {
        let name = name.clone();
        self.blocking(move |db| {
            Ok(db
                .read(name.as_str())?
                .filter(|d| d.is_live() && d.is_container()))
        })
        .await
    }

    async fn register_membership(&self, container: &ResourceDocument) -> StoreResult<()> {
        let container = container.clone();
        self.blocking(move |db| db.register(&container)).await
    }

    async fn unregister_membership(
        &self,
        container: &NamedNode,
        membership_resource: &NamedNode,
    ) -> StoreResult<()> {
        let container = container.clone();
        let membership_resource = membership_resource.clone();
        self.blocking(move |db| db.unregister(&container, &membership_resource))
            .await
    }
}
