//! Diesel row structs. Internal to the persistence adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::documents;
use crate::outbound::documents::StoredDocument;

/// Row read from the documents table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DocumentRow {
    pub id: Uuid,
    pub revision: i64,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            revision: row.revision,
            body: row.body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insertable document. Timestamps come from column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub(crate) struct NewDocumentRow<'a> {
    pub collection: &'a str,
    pub id: Uuid,
    pub revision: i64,
    pub body: &'a Value,
}
