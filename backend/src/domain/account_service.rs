//! Account resolution and user administration.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageRequest};
use tracing::info;
use uuid::Uuid;

use super::Error;
use super::auth::Identity;
use super::lookup::{delete, find_page, modify, progress_of, require, update_progress};
use super::ports::{
    AccountCommand, AccountQuery, AccountView, Entity, Query, Repositories, Repository,
    RepositoryError, Versioned, map_repository_error,
};
use super::user::{DisplayName, Role, User, UserProgress, WalletAdjustment};

/// Stable user id for an identity subject.
///
/// Deriving the id from the subject makes concurrent first requests for the
/// same identity collide on insert instead of creating two accounts.
pub fn user_id_for_subject(subject: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, subject.as_bytes())
}

/// Account service over the user, progress, quest and purchase repositories.
#[derive(Clone)]
pub struct AccountService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn create_user(&self, identity: &Identity, id: Uuid) -> Result<User, Error> {
        let display_name = identity
            .display_name
            .as_deref()
            .and_then(|name| DisplayName::new(name).ok())
            .unwrap_or_else(DisplayName::default_name);
        let user = User {
            id,
            external_id: identity.subject.clone(),
            email: identity.email.clone(),
            display_name,
            role: identity.role,
            subscription: None,
            created_at: self.clock.utc(),
        };
        match self.repos.users.insert(user).await {
            Ok(stored) => {
                info!(user_id = %id, role = identity.role.as_str(), "user provisioned");
                Ok(stored.value)
            }
            Err(RepositoryError::Duplicate { .. }) => require(self.repos.users.as_ref(), id, "user")
                .await
                .map(Versioned::into_inner),
            Err(error) => Err(map_repository_error(error)),
        }
    }

    async fn view(&self, user: User) -> Result<AccountView, Error> {
        let progress = progress_of(self.repos.progress.as_ref(), user.id)
            .await?
            .into_inner();
        Ok(AccountView { user, progress })
    }
}

async fn delete_all<T: Entity>(repo: &dyn Repository<T>, query: &Query) -> Result<usize, Error> {
    let matches = repo.find(query).await.map_err(map_repository_error)?;
    let mut removed = 0;
    for stored in matches {
        if repo
            .delete(stored.value.id())
            .await
            .map_err(map_repository_error)?
        {
            removed += 1;
        }
    }
    Ok(removed)
}

#[async_trait]
impl AccountCommand for AccountService {
    async fn resolve(&self, identity: &Identity) -> Result<User, Error> {
        if identity.subject.trim().is_empty() {
            return Err(Error::unauthorized("token has no subject"));
        }
        let id = user_id_for_subject(&identity.subject);
        let user = match self.repos.users.get(id).await.map_err(map_repository_error)? {
            Some(stored) => stored.value,
            None => self.create_user(identity, id).await?,
        };
        progress_of(self.repos.progress.as_ref(), id).await?;

        let email_changed = identity.email.is_some() && identity.email != user.email;
        if user.role == identity.role && !email_changed {
            return Ok(user);
        }
        let previous = user.role;
        let user = modify(self.repos.users.as_ref(), id, "user", |user| {
            user.role = identity.role;
            if identity.email.is_some() {
                user.email.clone_from(&identity.email);
            }
            Ok(())
        })
        .await?;
        if previous != user.role {
            info!(user_id = %id, from = previous.as_str(), to = user.role.as_str(), "role updated from token");
        }
        Ok(user)
    }

    async fn update_display_name(
        &self,
        user_id: Uuid,
        display_name: String,
    ) -> Result<User, Error> {
        let display_name = DisplayName::new(display_name)?;
        let user = modify(self.repos.users.as_ref(), user_id, "user", |user| {
            user.display_name = display_name.clone();
            Ok(())
        })
        .await?;
        info!(%user_id, "display name updated");
        Ok(user)
    }

    async fn adjust_wallet(
        &self,
        user_id: Uuid,
        adjustment: WalletAdjustment,
    ) -> Result<UserProgress, Error> {
        require(self.repos.users.as_ref(), user_id, "user").await?;
        let progress = update_progress(self.repos.progress.as_ref(), user_id, |progress| {
            progress.apply_adjustment(adjustment)?;
            Ok(())
        })
        .await?;
        info!(
            %user_id,
            xp = adjustment.xp,
            coins = adjustment.coins,
            hearts = adjustment.hearts,
            "wallet adjusted"
        );
        Ok(progress)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), Error> {
        require(self.repos.users.as_ref(), user_id, "user").await?;
        let by_user = Query::all().eq("userId", user_id);
        let quests = delete_all(self.repos.user_quests.as_ref(), &by_user).await?;
        let purchases = delete_all(self.repos.purchases.as_ref(), &by_user).await?;
        self.repos
            .progress
            .delete(user_id)
            .await
            .map_err(map_repository_error)?;
        delete(self.repos.users.as_ref(), user_id, "user").await?;
        info!(%user_id, quests, purchases, "user deleted");
        Ok(())
    }
}

#[async_trait]
impl AccountQuery for AccountService {
    async fn me(&self, user: &User) -> Result<AccountView, Error> {
        self.view(user.clone()).await
    }

    async fn list_users(&self, role: Option<Role>, page: PageRequest) -> Result<Page<User>, Error> {
        let query = match role {
            Some(role) => Query::all().eq("role", role),
            None => Query::all(),
        };
        find_page(self.repos.users.as_ref(), query, &page).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<AccountView, Error> {
        let user = require(self.repos.users.as_ref(), user_id, "user")
            .await?
            .into_inner();
        self.view(user).await
    }
}
