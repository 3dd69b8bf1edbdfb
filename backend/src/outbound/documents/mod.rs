//! Schemaless JSON document storage.
//!
//! Every domain collection is persisted as JSON documents keyed by
//! `(collection, id)` and stamped with a revision. [`DocumentStore`] is the
//! storage-facing seam; [`DocumentRepository`] lifts it into the typed
//! [`Repository`](crate::domain::ports::Repository) port for each entity.
//!
//! Two stores are provided: [`InMemoryDocumentStore`] for tests and local
//! runs, and the PostgreSQL JSONB store in
//! [`persistence`](crate::outbound::persistence).

mod memory;
mod repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::ports::{Query, RepositoryError};

pub use memory::InMemoryDocumentStore;
pub use repository::{DocumentRepository, document_repositories};

/// A stored JSON body with its bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub revision: i64,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality constraints on top-level body fields plus a result window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    fields: Map<String, Value>,
    offset: usize,
    limit: Option<usize>,
}

impl DocumentFilter {
    /// Filter that matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`. A later constraint on the same field
    /// replaces the earlier one.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Skip `offset` matches and return at most `limit`.
    #[must_use]
    pub fn window(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Object that a matching body must contain.
    pub fn containment(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Whether `body` satisfies every field constraint.
    pub fn matches(&self, body: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| body.get(field) == Some(expected))
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl From<&Query> for DocumentFilter {
    fn from(query: &Query) -> Self {
        query
            .filters()
            .iter()
            .fold(Self::all(), |filter, (field, value)| {
                filter.field(field.clone(), value.clone())
            })
            .window(query.offset(), query.limit())
    }
}

/// Revision-checked storage of JSON documents grouped by collection.
///
/// Results of [`find`](Self::find) are ordered by creation time, then id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, RepositoryError>;

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, RepositoryError>;

    /// Count matches, ignoring the filter's window.
    async fn count(&self, collection: &str, filter: &DocumentFilter)
    -> Result<u64, RepositoryError>;

    /// Store a new document at revision 1.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Duplicate`] when the id is taken.
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError>;

    /// Overwrite a document that is still at `expected_revision`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::RevisionMismatch`] when the document moved on or no
    /// longer exists.
    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_revision: i64,
        body: Value,
    ) -> Result<StoredDocument, RepositoryError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn filter_from_query_keeps_fields_and_window() {
        let query = Query::all()
            .eq("languageId", Uuid::nil())
            .eq("published", true)
            .window(5, Some(10));
        let filter = DocumentFilter::from(&query);
        assert_eq!(
            filter.containment(),
            json!({ "languageId": Uuid::nil().to_string(), "published": true })
        );
        assert_eq!(filter.offset(), 5);
        assert_eq!(filter.limit(), Some(10));
    }

    #[rstest]
    #[case(json!({ "status": "started", "userId": "a" }), true)]
    #[case(json!({ "status": "completed", "userId": "a" }), false)]
    #[case(json!({ "userId": "a" }), false)]
    fn filter_matches_top_level_equality(#[case] body: Value, #[case] expected: bool) {
        let filter = DocumentFilter::all()
            .field("status", json!("started"))
            .field("userId", json!("a"));
        assert_eq!(filter.matches(&body), expected);
    }

    #[rstest]
    fn empty_filter_matches_everything() {
        assert!(DocumentFilter::all().matches(&json!({ "anything": 1 })));
        assert_eq!(DocumentFilter::all().containment(), json!({}));
    }
}
