//! PostgreSQL persistence using Diesel with `diesel-async` and `bb8`.
//!
//! All collections share one `documents` table holding JSONB bodies; see
//! [`DieselDocumentStore`]. Row structs and the schema stay private to this
//! module.
//!
//! ```ignore
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! run_migrations(url).await?;
//! let repos = document_repositories(Arc::new(DieselDocumentStore::new(pool)));
//! ```

mod diesel_document_store;
mod diesel_error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_document_store::DieselDocumentStore;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
