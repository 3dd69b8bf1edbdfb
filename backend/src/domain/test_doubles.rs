//! In-process repository double for service tests that need real state
//! across several writes, with switchable write failures.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::ports::{Entity, Query, Repository, RepositoryError, Versioned};

/// Which `replace` calls fail with a connection error (1-based call numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReplace {
    Never,
    Call(usize),
    From(usize),
}

pub struct StoredRepository<T> {
    rows: Mutex<Vec<Versioned<T>>>,
    replaces: AtomicUsize,
    fail_replace: Mutex<FailReplace>,
}

impl<T: Entity> StoredRepository<T> {
    pub fn with(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            rows: Mutex::new(
                values
                    .into_iter()
                    .map(|value| Versioned::new(value, 1))
                    .collect(),
            ),
            replaces: AtomicUsize::new(0),
            fail_replace: Mutex::new(FailReplace::Never),
        }
    }

    pub fn empty() -> Self {
        Self::with(Vec::new())
    }

    pub fn fail_replace(&self, mode: FailReplace) {
        *self.fail_replace.lock().expect("failure switch") = mode;
    }

    /// Current values in insertion order.
    pub fn values(&self) -> Vec<T> {
        self.rows
            .lock()
            .expect("rows")
            .iter()
            .map(|row| row.value.clone())
            .collect()
    }

    pub fn value(&self, id: Uuid) -> Option<T> {
        self.values().into_iter().find(|value| value.id() == id)
    }

    fn replace_should_fail(&self) -> bool {
        let call = self.replaces.fetch_add(1, Ordering::SeqCst) + 1;
        match *self.fail_replace.lock().expect("failure switch") {
            FailReplace::Never => false,
            FailReplace::Call(n) => call == n,
            FailReplace::From(n) => call >= n,
        }
    }
}

fn matches<T: Entity>(value: &T, query: &Query) -> bool {
    let Ok(Value::Object(fields)) = serde_json::to_value(value) else {
        return false;
    };
    query
        .filters()
        .iter()
        .all(|(field, expected)| fields.get(field) == Some(expected))
}

#[async_trait]
impl<T: Entity> Repository<T> for StoredRepository<T> {
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<T>>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("rows")
            .iter()
            .find(|row| row.value.id() == id)
            .cloned())
    }

    async fn find(&self, query: &Query) -> Result<Vec<Versioned<T>>, RepositoryError> {
        let rows = self.rows.lock().expect("rows");
        let matching = rows
            .iter()
            .filter(|row| matches(&row.value, query))
            .skip(query.offset())
            .take(query.limit().unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn count(&self, query: &Query) -> Result<u64, RepositoryError> {
        let rows = self.rows.lock().expect("rows");
        let total = rows.iter().filter(|row| matches(&row.value, query)).count();
        Ok(u64::try_from(total).unwrap_or(u64::MAX))
    }

    async fn insert(&self, value: T) -> Result<Versioned<T>, RepositoryError> {
        let mut rows = self.rows.lock().expect("rows");
        if rows.iter().any(|row| row.value.id() == value.id()) {
            return Err(RepositoryError::duplicate(T::COLLECTION, value.id()));
        }
        let stored = Versioned::new(value, 1);
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn replace(&self, current: Versioned<T>) -> Result<Versioned<T>, RepositoryError> {
        if self.replace_should_fail() {
            return Err(RepositoryError::connection("injected failure"));
        }
        let mut rows = self.rows.lock().expect("rows");
        let id = current.value.id();
        let Some(row) = rows.iter_mut().find(|row| row.value.id() == id) else {
            return Err(RepositoryError::query(format!("{id} does not exist")));
        };
        if row.revision != current.revision {
            return Err(RepositoryError::revision_mismatch(T::COLLECTION, id));
        }
        *row = Versioned::new(current.value, current.revision + 1);
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().expect("rows");
        let before = rows.len();
        rows.retain(|row| row.value.id() != id);
        Ok(rows.len() != before)
    }
}
