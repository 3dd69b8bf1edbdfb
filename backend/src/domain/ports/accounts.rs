//! Driving ports for accounts and their administration.

use async_trait::async_trait;
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::auth::Identity;
use crate::domain::user::{Role, User, UserProgress, WalletAdjustment};

/// A user together with their learning state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub user: User,
    pub progress: UserProgress,
}

/// Account mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Find or create the user behind a verified identity.
    async fn resolve(&self, identity: &Identity) -> Result<User, Error>;

    async fn update_display_name(&self, user_id: Uuid, display_name: String)
    -> Result<User, Error>;

    /// Apply signed deltas to a learner's wallet.
    async fn adjust_wallet(
        &self,
        user_id: Uuid,
        adjustment: WalletAdjustment,
    ) -> Result<UserProgress, Error>;

    /// Remove a user with their progress, quests and purchases.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), Error>;
}

/// Account reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountQuery: Send + Sync {
    /// The caller with their progress.
    async fn me(&self, user: &User) -> Result<AccountView, Error>;

    async fn list_users(&self, role: Option<Role>, page: PageRequest) -> Result<Page<User>, Error>;

    async fn get_user(&self, user_id: Uuid) -> Result<AccountView, Error>;
}
