//! PostgreSQL JSONB implementation of [`DocumentStore`].
//!
//! Field filters compile to a single `body @> '{...}'` containment test so
//! they can use the GIN index on `body`. Revision checks run inside the
//! `UPDATE ... WHERE revision = $n` statement.

use async_trait::async_trait;
use diesel::expression_methods::PgJsonbExpressionMethods;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::diesel_error_mapping::map_diesel_error;
use super::models::{DocumentRow, NewDocumentRow};
use super::pool::DbPool;
use super::schema::documents;
use crate::domain::ports::RepositoryError;
use crate::outbound::documents::{DocumentFilter, DocumentStore, StoredDocument};

/// Diesel-backed document store sharing one connection pool.
#[derive(Clone)]
pub struct DieselDocumentStore {
    pool: DbPool,
}

impl DieselDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl DocumentStore for DieselDocumentStore {
    async fn get(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = documents::table
            .filter(documents::collection.eq(collection))
            .filter(documents::id.eq(id))
            .select(DocumentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, collection, Some(id)))?;
        Ok(row.map(StoredDocument::from))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = documents::table
            .filter(documents::collection.eq(collection))
            .filter(PgJsonbExpressionMethods::contains(
                documents::body,
                filter.containment(),
            ))
            .order((documents::created_at.asc(), documents::id.asc()))
            .select(DocumentRow::as_select())
            .into_boxed();
        if filter.offset() > 0 {
            query = query.offset(to_sql_count(filter.offset()));
        }
        if let Some(limit) = filter.limit() {
            query = query.limit(to_sql_count(limit));
        }
        let rows: Vec<DocumentRow> = query
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection, None))?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let total: i64 = documents::table
            .filter(documents::collection.eq(collection))
            .filter(PgJsonbExpressionMethods::contains(
                documents::body,
                filter.containment(),
            ))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection, None))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = diesel::insert_into(documents::table)
            .values(&NewDocumentRow {
                collection,
                id,
                revision: 1,
                body: &body,
            })
            .returning(DocumentRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection, Some(id)))?;
        Ok(row.into())
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_revision: i64,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = diesel::update(
            documents::table
                .filter(documents::collection.eq(collection))
                .filter(documents::id.eq(id))
                .filter(documents::revision.eq(expected_revision)),
        )
        .set((
            documents::body.eq(&body),
            documents::revision.eq(expected_revision + 1),
            documents::updated_at.eq(diesel::dsl::now),
        ))
        .returning(DocumentRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(|err| map_diesel_error(err, collection, Some(id)))?;

        row.map(StoredDocument::from).ok_or_else(|| {
            debug!(%collection, %id, expected_revision, "conditional update matched no row");
            RepositoryError::revision_mismatch(collection, id)
        })
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(
            documents::table
                .filter(documents::collection.eq(collection))
                .filter(documents::id.eq(id)),
        )
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(err, collection, Some(id)))?;
        Ok(deleted > 0)
    }
}
