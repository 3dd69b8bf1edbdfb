//! Process-local document store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentFilter, DocumentStore, StoredDocument};
use crate::domain::ports::RepositoryError;

#[derive(Debug, Clone)]
struct Slot {
    sequence: u64,
    document: StoredDocument,
}

#[derive(Debug, Default)]
struct Collections {
    next_sequence: u64,
    by_name: HashMap<String, HashMap<Uuid, Slot>>,
}

/// [`DocumentStore`] held in memory behind an async lock.
///
/// Documents inserted within the same clock tick keep their insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matching<'a>(
    collections: &'a Collections,
    collection: &str,
    filter: &DocumentFilter,
) -> Vec<&'a Slot> {
    let mut slots: Vec<&Slot> = collections
        .by_name
        .get(collection)
        .map(|documents| {
            documents
                .values()
                .filter(|slot| filter.matches(&slot.document.body))
                .collect()
        })
        .unwrap_or_default();
    slots.sort_by_key(|slot| (slot.document.created_at, slot.sequence));
    slots
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard
            .by_name
            .get(collection)
            .and_then(|documents| documents.get(&id))
            .map(|slot| slot.document.clone()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, RepositoryError> {
        let guard = self.inner.read().await;
        let limit = filter.limit().unwrap_or(usize::MAX);
        Ok(matching(&guard, collection, filter)
            .into_iter()
            .skip(filter.offset())
            .take(limit)
            .map(|slot| slot.document.clone())
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<u64, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(matching(&guard, collection, filter).len() as u64)
    }

    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError> {
        let mut guard = self.inner.write().await;
        let sequence = guard.next_sequence;
        let documents = guard.by_name.entry(collection.to_owned()).or_default();
        if documents.contains_key(&id) {
            return Err(RepositoryError::duplicate(collection, id));
        }
        let now = Utc::now();
        let document = StoredDocument {
            id,
            revision: 1,
            body,
            created_at: now,
            updated_at: now,
        };
        documents.insert(
            id,
            Slot {
                sequence,
                document: document.clone(),
            },
        );
        guard.next_sequence += 1;
        Ok(document)
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_revision: i64,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError> {
        let mut guard = self.inner.write().await;
        let slot = guard
            .by_name
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(&id))
            .filter(|slot| slot.document.revision == expected_revision)
            .ok_or_else(|| RepositoryError::revision_mismatch(collection, id))?;
        slot.document.revision += 1;
        slot.document.body = body;
        slot.document.updated_at = Utc::now();
        Ok(slot.document.clone())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(guard
            .by_name
            .get_mut(collection)
            .is_some_and(|documents| documents.remove(&id).is_some()))
    }
}
