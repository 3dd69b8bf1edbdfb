//! Typed repositories over a [`DocumentStore`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentFilter, DocumentStore, StoredDocument};
use crate::domain::ports::{Entity, Query, Repositories, Repository, RepositoryError, Versioned};

/// [`Repository`] that serialises entities into the `T::COLLECTION`
/// collection of a shared store.
pub struct DocumentRepository<T> {
    store: Arc<dyn DocumentStore>,
    entity: PhantomData<fn() -> T>,
}

impl<T> DocumentRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            entity: PhantomData,
        }
    }
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.store))
    }
}

fn encode<T: Entity>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value).map_err(|err| {
        RepositoryError::serialization(format!("encoding {}: {err}", T::COLLECTION))
    })
}

fn decode<T: Entity>(document: StoredDocument) -> Result<Versioned<T>, RepositoryError> {
    let value = serde_json::from_value(document.body).map_err(|err| {
        RepositoryError::serialization(format!(
            "decoding {}/{}: {err}",
            T::COLLECTION,
            document.id
        ))
    })?;
    Ok(Versioned::new(value, document.revision))
}

#[async_trait]
impl<T: Entity> Repository<T> for DocumentRepository<T> {
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<T>>, RepositoryError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    async fn find(&self, query: &Query) -> Result<Vec<Versioned<T>>, RepositoryError> {
        self.store
            .find(T::COLLECTION, &DocumentFilter::from(query))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn count(&self, query: &Query) -> Result<u64, RepositoryError> {
        self.store
            .count(T::COLLECTION, &DocumentFilter::from(query))
            .await
    }

    async fn insert(&self, value: T) -> Result<Versioned<T>, RepositoryError> {
        let body = encode(&value)?;
        let stored = self.store.insert(T::COLLECTION, value.id(), body).await?;
        Ok(Versioned::new(value, stored.revision))
    }

    async fn replace(&self, current: Versioned<T>) -> Result<Versioned<T>, RepositoryError> {
        let body = encode(&current.value)?;
        let stored = self
            .store
            .replace(T::COLLECTION, current.value.id(), current.revision, body)
            .await?;
        Ok(Versioned::new(current.value, stored.revision))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.store.delete(T::COLLECTION, id).await
    }
}

fn typed<T: Entity>(store: &Arc<dyn DocumentStore>) -> Arc<dyn Repository<T>> {
    Arc::new(DocumentRepository::<T>::new(Arc::clone(store)))
}

/// Build every collection repository on top of one store.
pub fn document_repositories(store: Arc<dyn DocumentStore>) -> Repositories {
    Repositories {
        languages: typed(&store),
        chapters: typed(&store),
        units: typed(&store),
        lessons: typed(&store),
        exercises: typed(&store),
        users: typed(&store),
        progress: typed(&store),
        quests: typed(&store),
        user_quests: typed(&store),
        shop_categories: typed(&store),
        shop_items: typed(&store),
        purchases: typed(&store),
        transactions: typed(&store),
        payment_settings: typed(&store),
        promo_codes: typed(&store),
        plans: typed(&store),
        refunds: typed(&store),
    }
}
