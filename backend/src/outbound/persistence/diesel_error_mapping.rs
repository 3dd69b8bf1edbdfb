//! Diesel error translation for the document store.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::RepositoryError;

/// Map a Diesel failure on `collection`/`id` into a repository error.
///
/// Unique violations become [`RepositoryError::Duplicate`]. Lost connections
/// become [`RepositoryError::Connection`]; everything else is a query error.
pub(crate) fn map_diesel_error(
    error: DieselError,
    collection: &str,
    id: Option<Uuid>,
) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %collection, "diesel operation failed");
        }
        _ => debug!(%error, %collection, "diesel operation failed"),
    }

    match (error, id) {
        (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _), Some(id)) => {
            RepositoryError::duplicate(collection, id)
        }
        (DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _), _)
        | (DieselError::BrokenTransactionManager, _) => {
            RepositoryError::connection("database connection error")
        }
        (DieselError::DeserializationError(err), _) => {
            RepositoryError::serialization(format!("invalid row in {collection}: {err}"))
        }
        (DieselError::NotFound, _) => RepositoryError::query("record not found"),
        (DieselError::QueryBuilderError(_), _) => RepositoryError::query("database query error"),
        _ => RepositoryError::query("database error"),
    }
}
