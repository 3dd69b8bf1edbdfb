//! Port for collection-backed persistence of domain entities.
//!
//! Every entity lives in a named collection and carries a UUID. Adapters keep
//! a monotonically increasing revision per stored entity; [`Repository::replace`]
//! only succeeds when the caller still holds the latest revision, which is how
//! concurrent writers surface as conflicts.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::billing::{
    PaymentSettings, PaymentTransaction, PromoCode, Refund, SubscriptionPlan,
};
use crate::domain::curriculum::{Chapter, Exercise, Language, Lesson, Unit};
use crate::domain::quests::{Quest, UserQuest};
use crate::domain::shop::{ShopCategory, ShopItem, UserPurchase};
use crate::domain::user::{User, UserProgress};

use super::define_port_error;

define_port_error! {
    /// Errors raised by repository adapters.
    pub enum RepositoryError {
        /// Backing store could not be reached.
        Connection { message: String } =>
            "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "repository query failed: {message}",
        /// Stored document could not be converted to or from the entity.
        Serialization { message: String } =>
            "repository serialization failed: {message}",
        /// Optimistic concurrency check failed.
        RevisionMismatch { collection: String, id: Uuid } =>
            "{collection}/{id} was modified concurrently",
        /// An entity with the same id already exists.
        Duplicate { collection: String, id: Uuid } =>
            "{collection}/{id} already exists",
    }
}

/// Entity persisted in a named collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Collection name used by storage adapters.
    const COLLECTION: &'static str;

    /// Stable identifier of this entity.
    fn id(&self) -> Uuid;
}

/// An entity together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: i64,
}

impl<T> Versioned<T> {
    /// Pair a value with a revision.
    pub fn new(value: T, revision: i64) -> Self {
        Self { value, revision }
    }

    /// Drop the revision.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Equality filter over top-level entity fields plus an optional window.
///
/// Field names use the entity's serialised (camelCase) form. Results are
/// ordered by creation time, then id.
///
/// # Examples
/// ```
/// use lingo::domain::ports::Query;
/// use uuid::Uuid;
///
/// let unit_id = Uuid::new_v4();
/// let query = Query::all().eq("unitId", unit_id).window(0, Some(10));
/// assert_eq!(query.filters().len(), 1);
/// assert_eq!(query.limit(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    offset: usize,
    limit: Option<usize>,
}

impl Query {
    /// Match every entity in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.filters.push((field.to_owned(), value));
        self
    }

    /// Skip `offset` matches and return at most `limit`.
    #[must_use]
    pub fn window(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Field equality constraints.
    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    /// Number of matches to skip.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of matches to return.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Port for entity storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Fetch one entity by id.
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<T>>, RepositoryError>;

    /// Fetch every entity matching `query`.
    async fn find(&self, query: &Query) -> Result<Vec<Versioned<T>>, RepositoryError>;

    /// Count entities matching `query`, ignoring its window.
    async fn count(&self, query: &Query) -> Result<u64, RepositoryError>;

    /// Store a new entity at revision 1.
    async fn insert(&self, value: T) -> Result<Versioned<T>, RepositoryError>;

    /// Overwrite an entity if it is still at `current.revision`.
    async fn replace(&self, current: Versioned<T>) -> Result<Versioned<T>, RepositoryError>;

    /// Remove an entity; returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// Translate a repository failure into the domain error envelope.
pub fn map_repository_error(error: RepositoryError) -> Error {
    match error {
        RepositoryError::Connection { message } => {
            tracing::error!(%message, "repository unavailable");
            Error::service_unavailable("storage is temporarily unavailable")
        }
        RepositoryError::RevisionMismatch { collection, id } => {
            tracing::debug!(%collection, %id, "revision mismatch");
            Error::conflict_with_code(
                "concurrent_modification",
                "resource was modified concurrently, retry the request",
            )
        }
        RepositoryError::Duplicate { collection, id } => {
            Error::conflict(format!("{collection} entry {id} already exists"))
        }
        other @ (RepositoryError::Query { .. } | RepositoryError::Serialization { .. }) => {
            Error::internal(other.to_string())
        }
    }
}

/// Fixture repository that stores nothing.
///
/// Lookups return nothing and writes echo the value back at revision 1. Use
/// it where persistence is not under test.
pub struct FixtureRepository<T>(PhantomData<fn() -> T>);

impl<T> Default for FixtureRepository<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for FixtureRepository<T> {
    async fn get(&self, _id: Uuid) -> Result<Option<Versioned<T>>, RepositoryError> {
        Ok(None)
    }

    async fn find(&self, _query: &Query) -> Result<Vec<Versioned<T>>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn count(&self, _query: &Query) -> Result<u64, RepositoryError> {
        Ok(0)
    }

    async fn insert(&self, value: T) -> Result<Versioned<T>, RepositoryError> {
        Ok(Versioned::new(value, 1))
    }

    async fn replace(&self, current: Versioned<T>) -> Result<Versioned<T>, RepositoryError> {
        Ok(Versioned::new(current.value, current.revision + 1))
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

/// One repository per collection.
#[derive(Clone)]
pub struct Repositories {
    pub languages: Arc<dyn Repository<Language>>,
    pub chapters: Arc<dyn Repository<Chapter>>,
    pub units: Arc<dyn Repository<Unit>>,
    pub lessons: Arc<dyn Repository<Lesson>>,
    pub exercises: Arc<dyn Repository<Exercise>>,
    pub users: Arc<dyn Repository<User>>,
    pub progress: Arc<dyn Repository<UserProgress>>,
    pub quests: Arc<dyn Repository<Quest>>,
    pub user_quests: Arc<dyn Repository<UserQuest>>,
    pub shop_categories: Arc<dyn Repository<ShopCategory>>,
    pub shop_items: Arc<dyn Repository<ShopItem>>,
    pub purchases: Arc<dyn Repository<UserPurchase>>,
    pub transactions: Arc<dyn Repository<PaymentTransaction>>,
    pub payment_settings: Arc<dyn Repository<PaymentSettings>>,
    pub promo_codes: Arc<dyn Repository<PromoCode>>,
    pub plans: Arc<dyn Repository<SubscriptionPlan>>,
    pub refunds: Arc<dyn Repository<Refund>>,
}

impl Repositories {
    /// Bundle of [`FixtureRepository`] instances.
    pub fn fixtures() -> Self {
        Self {
            languages: Arc::new(FixtureRepository::default()),
            chapters: Arc::new(FixtureRepository::default()),
            units: Arc::new(FixtureRepository::default()),
            lessons: Arc::new(FixtureRepository::default()),
            exercises: Arc::new(FixtureRepository::default()),
            users: Arc::new(FixtureRepository::default()),
            progress: Arc::new(FixtureRepository::default()),
            quests: Arc::new(FixtureRepository::default()),
            user_quests: Arc::new(FixtureRepository::default()),
            shop_categories: Arc::new(FixtureRepository::default()),
            shop_items: Arc::new(FixtureRepository::default()),
            purchases: Arc::new(FixtureRepository::default()),
            transactions: Arc::new(FixtureRepository::default()),
            payment_settings: Arc::new(FixtureRepository::default()),
            promo_codes: Arc::new(FixtureRepository::default()),
            plans: Arc::new(FixtureRepository::default()),
            refunds: Arc::new(FixtureRepository::default()),
        }
    }
}
