//! Small repository helpers shared by the services.

use pagination::{Page, PageRequest};
use uuid::Uuid;

use super::Error;
use super::ports::{
    Entity, Query, Repository, RepositoryError, Versioned, map_repository_error,
};
use super::user::UserProgress;

/// Attempts made by read-modify-write helpers before giving up on races.
pub(crate) const WRITE_ATTEMPTS: usize = 3;

/// Fetch an entity or fail with `not_found`.
pub(crate) async fn require<T: Entity>(
    repo: &dyn Repository<T>,
    id: Uuid,
    what: &str,
) -> Result<Versioned<T>, Error> {
    repo.get(id)
        .await
        .map_err(map_repository_error)?
        .ok_or_else(|| Error::not_found(format!("{what} {id} not found")))
}

/// Fetch every entity matching `query`, dropping revisions.
pub(crate) async fn find_values<T: Entity>(
    repo: &dyn Repository<T>,
    query: &Query,
) -> Result<Vec<T>, Error> {
    Ok(repo
        .find(query)
        .await
        .map_err(map_repository_error)?
        .into_iter()
        .map(Versioned::into_inner)
        .collect())
}

/// Fetch one page of entities matching `query`.
pub(crate) async fn find_page<T: Entity>(
    repo: &dyn Repository<T>,
    query: Query,
    page: &PageRequest,
) -> Result<Page<T>, Error> {
    let query = query.window(page.offset(), Some(page.fetch_limit()));
    let items = find_values(repo, &query).await?;
    Ok(Page::from_overfetch(items, page))
}

/// Cut one page out of an already filtered result set.
pub(crate) fn page_of<T>(items: Vec<T>, page: &PageRequest) -> Page<T> {
    let window = items
        .into_iter()
        .skip(page.offset())
        .take(page.fetch_limit())
        .collect();
    Page::from_overfetch(window, page)
}

/// Count entities matching `query`.
pub(crate) async fn count<T: Entity>(repo: &dyn Repository<T>, query: &Query) -> Result<u64, Error> {
    repo.count(query).await.map_err(map_repository_error)
}

/// Insert an entity and return it without its revision.
pub(crate) async fn insert<T: Entity>(repo: &dyn Repository<T>, value: T) -> Result<T, Error> {
    repo.insert(value)
        .await
        .map(Versioned::into_inner)
        .map_err(map_repository_error)
}

/// Replace an entity read at `current`'s revision.
pub(crate) async fn replace<T: Entity>(
    repo: &dyn Repository<T>,
    current: Versioned<T>,
) -> Result<Versioned<T>, Error> {
    repo.replace(current).await.map_err(map_repository_error)
}

/// Delete an entity or fail with `not_found`.
pub(crate) async fn delete<T: Entity>(
    repo: &dyn Repository<T>,
    id: Uuid,
    what: &str,
) -> Result<(), Error> {
    if repo.delete(id).await.map_err(map_repository_error)? {
        Ok(())
    } else {
        Err(Error::not_found(format!("{what} {id} not found")))
    }
}

/// Fail with a `has_children` conflict when `query` matches anything.
pub(crate) async fn ensure_no_children<T: Entity>(
    repo: &dyn Repository<T>,
    query: &Query,
    what: &str,
) -> Result<(), Error> {
    let children = count(repo, query).await?;
    if children > 0 {
        return Err(Error::conflict_with_code(
            "has_children",
            format!("{what} still has {children} dependent {}", T::COLLECTION),
        ));
    }
    Ok(())
}

/// Load a learner's progress, creating it on first use.
pub(crate) async fn progress_of(
    repo: &dyn Repository<UserProgress>,
    user_id: Uuid,
) -> Result<Versioned<UserProgress>, Error> {
    if let Some(progress) = repo.get(user_id).await.map_err(map_repository_error)? {
        return Ok(progress);
    }
    match repo.insert(UserProgress::new(user_id)).await {
        Ok(progress) => Ok(progress),
        Err(RepositoryError::Duplicate { .. }) => require(repo, user_id, "progress").await,
        Err(error) => Err(map_repository_error(error)),
    }
}

/// Read-modify-write a learner's progress, retrying lost revision races.
///
/// `apply` runs against a fresh copy on every attempt; its error aborts the
/// update without writing.
pub(crate) async fn update_progress<F>(
    repo: &dyn Repository<UserProgress>,
    user_id: Uuid,
    mut apply: F,
) -> Result<UserProgress, Error>
where
    F: FnMut(&mut UserProgress) -> Result<(), Error> + Send,
{
    let mut attempt = 1;
    loop {
        let mut current = progress_of(repo, user_id).await?;
        apply(&mut current.value)?;
        match repo.replace(current).await {
            Ok(stored) => return Ok(stored.value),
            Err(RepositoryError::RevisionMismatch { .. }) if attempt < WRITE_ATTEMPTS => {
                tracing::debug!(%user_id, attempt, "progress write lost a race, retrying");
                attempt += 1;
            }
            Err(error) => return Err(map_repository_error(error)),
        }
    }
}

/// Read-modify-write an existing entity, retrying lost revision races.
pub(crate) async fn modify<T, F>(
    repo: &dyn Repository<T>,
    id: Uuid,
    what: &str,
    mut apply: F,
) -> Result<T, Error>
where
    T: Entity,
    F: FnMut(&mut T) -> Result<(), Error> + Send,
{
    let mut attempt = 1;
    loop {
        let mut current = require(repo, id, what).await?;
        apply(&mut current.value)?;
        match repo.replace(current).await {
            Ok(stored) => return Ok(stored.value),
            Err(RepositoryError::RevisionMismatch { .. }) if attempt < WRITE_ATTEMPTS => {
                tracing::debug!(collection = T::COLLECTION, %id, attempt, "write lost a race, retrying");
                attempt += 1;
            }
            Err(error) => return Err(map_repository_error(error)),
        }
    }
}
