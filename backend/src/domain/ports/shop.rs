//! Driving ports for the coin shop.

use async_trait::async_trait;
use pagination::{Page, PageRequest};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::shop::{
    PurchaseReceipt, ShopCategory, ShopCategoryDraft, ShopItem, ShopItemDraft, UserPurchase,
};
use crate::domain::user::User;

/// Shop mutations: catalogue management and purchases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopCommand: Send + Sync {
    async fn create_category(&self, draft: ShopCategoryDraft) -> Result<ShopCategory, Error>;

    async fn update_category(
        &self,
        id: Uuid,
        draft: ShopCategoryDraft,
    ) -> Result<ShopCategory, Error>;

    /// Fails with `has_children` while items remain in the category.
    async fn delete_category(&self, id: Uuid) -> Result<(), Error>;

    async fn create_item(&self, draft: ShopItemDraft) -> Result<ShopItem, Error>;

    async fn update_item(&self, id: Uuid, draft: ShopItemDraft) -> Result<ShopItem, Error>;

    async fn delete_item(&self, id: Uuid) -> Result<(), Error>;

    /// Spend coins on `quantity` units of an item.
    async fn purchase(
        &self,
        user: &User,
        item_id: Uuid,
        quantity: u64,
    ) -> Result<PurchaseReceipt, Error>;
}

/// Shop reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopQuery: Send + Sync {
    /// Categories ordered by `order`.
    async fn list_categories(&self) -> Result<Vec<ShopCategory>, Error>;

    /// Items, optionally limited to one category. Inactive items are only
    /// listed when `include_inactive` is set.
    async fn list_items(
        &self,
        category_id: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<ShopItem>, Error>;

    async fn get_item(&self, id: Uuid) -> Result<ShopItem, Error>;

    /// Purchases, newest last, optionally for a single learner.
    async fn list_purchases(
        &self,
        user_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<UserPurchase>, Error>;
}
