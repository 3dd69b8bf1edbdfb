//! Shop catalogue management and coin purchases.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageRequest};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Error;
use super::lookup::{
    delete, ensure_no_children, find_page, find_values, insert, progress_of, replace, require,
    update_progress,
};
use super::ports::{QuestEvents, Query, Repositories, ShopCommand, ShopQuery, Versioned};
use super::quests::QuestMetric;
use super::shop::{
    PurchaseReceipt, ShopCategory, ShopCategoryDraft, ShopItem, ShopItemDraft, UserPurchase,
    apply_effect, validate_purchase,
};
use super::user::User;

/// Shop service over the shop and progress repositories.
#[derive(Clone)]
pub struct ShopService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    quest_events: Arc<dyn QuestEvents>,
}

impl ShopService {
    /// Create a service that reports purchases to `quest_events`.
    pub fn new(
        repos: Repositories,
        clock: Arc<dyn Clock>,
        quest_events: Arc<dyn QuestEvents>,
    ) -> Self {
        Self {
            repos,
            clock,
            quest_events,
        }
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> Result<(), Error> {
        let taken = find_values(
            self.repos.shop_categories.as_ref(),
            &Query::all().eq("slug", slug),
        )
        .await?
        .into_iter()
        .any(|category| Some(category.id) != except);
        if taken {
            return Err(Error::conflict_with_code(
                "duplicate_slug",
                format!("category slug {slug} is already in use"),
            ));
        }
        Ok(())
    }

    async fn bought_before(&self, user_id: Uuid, item_id: Uuid) -> Result<u64, Error> {
        let purchases = find_values(
            self.repos.purchases.as_ref(),
            &Query::all().eq("userId", user_id).eq("itemId", item_id),
        )
        .await?;
        Ok(purchases
            .iter()
            .fold(0_u64, |sum, purchase| sum.saturating_add(purchase.quantity)))
    }

    /// Take `quantity` units out of tracked stock.
    async fn reserve_stock(
        &self,
        mut stored: Versioned<ShopItem>,
        quantity: u64,
    ) -> Result<ShopItem, Error> {
        let Some(stock) = stored.value.stock else {
            return Ok(stored.value);
        };
        let remaining = stock.checked_sub(quantity).ok_or_else(|| {
            Error::conflict_with_code("out_of_stock", "not enough stock left")
        })?;
        stored.value.stock = Some(remaining);
        replace(self.repos.shop_items.as_ref(), stored)
            .await
            .map(Versioned::into_inner)
    }

    /// Put reserved units back after a failed payment.
    async fn release_stock(&self, item_id: Uuid, quantity: u64) {
        let result = async {
            let mut stored = require(self.repos.shop_items.as_ref(), item_id, "item").await?;
            if let Some(stock) = stored.value.stock {
                stored.value.stock = Some(stock.saturating_add(quantity));
                replace(self.repos.shop_items.as_ref(), stored).await?;
            }
            Ok::<_, Error>(())
        }
        .await;
        if let Err(error) = result {
            warn!(%item_id, quantity, error = %error, "reserved stock not released");
        }
    }
}

#[async_trait]
impl ShopCommand for ShopService {
    async fn create_category(&self, draft: ShopCategoryDraft) -> Result<ShopCategory, Error> {
        let category = draft.into_category(Uuid::new_v4())?;
        self.ensure_slug_free(&category.slug, None).await?;
        let category = insert(self.repos.shop_categories.as_ref(), category).await?;
        info!(category_id = %category.id, slug = %category.slug, "shop category created");
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        draft: ShopCategoryDraft,
    ) -> Result<ShopCategory, Error> {
        let current = require(self.repos.shop_categories.as_ref(), id, "category").await?;
        let category = draft.into_category(id)?;
        self.ensure_slug_free(&category.slug, Some(id)).await?;
        replace(
            self.repos.shop_categories.as_ref(),
            Versioned::new(category, current.revision),
        )
        .await
        .map(Versioned::into_inner)
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.shop_categories.as_ref(), id, "category").await?;
        ensure_no_children(
            self.repos.shop_items.as_ref(),
            &Query::all().eq("categoryId", id),
            "category",
        )
        .await?;
        delete(self.repos.shop_categories.as_ref(), id, "category").await?;
        info!(category_id = %id, "shop category deleted");
        Ok(())
    }

    async fn create_item(&self, draft: ShopItemDraft) -> Result<ShopItem, Error> {
        let item = draft.into_item(Uuid::new_v4())?;
        require(
            self.repos.shop_categories.as_ref(),
            item.category_id,
            "category",
        )
        .await?;
        let item = insert(self.repos.shop_items.as_ref(), item).await?;
        info!(item_id = %item.id, price = item.price, "shop item created");
        Ok(item)
    }

    async fn update_item(&self, id: Uuid, draft: ShopItemDraft) -> Result<ShopItem, Error> {
        let current = require(self.repos.shop_items.as_ref(), id, "item").await?;
        let item = draft.into_item(id)?;
        if item.category_id != current.value.category_id {
            require(
                self.repos.shop_categories.as_ref(),
                item.category_id,
                "category",
            )
            .await?;
        }
        replace(
            self.repos.shop_items.as_ref(),
            Versioned::new(item, current.revision),
        )
        .await
        .map(Versioned::into_inner)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), Error> {
        delete(self.repos.shop_items.as_ref(), id, "item").await?;
        info!(item_id = %id, "shop item deleted");
        Ok(())
    }

    async fn purchase(
        &self,
        user: &User,
        item_id: Uuid,
        quantity: u64,
    ) -> Result<PurchaseReceipt, Error> {
        let stored = require(self.repos.shop_items.as_ref(), item_id, "item").await?;
        let previously = self.bought_before(user.id, item_id).await?;
        let total = validate_purchase(&stored.value, quantity, previously)?;

        let wallet = progress_of(self.repos.progress.as_ref(), user.id).await?;
        if wallet.value.coins < total {
            debug!(user_id = %user.id, %item_id, total, coins = wallet.value.coins, "purchase rejected");
            return Err(Error::conflict_with_code(
                "insufficient_coins",
                format!("needs {total} coins but only {} available", wallet.value.coins),
            ));
        }

        // Stock is reserved before coins move so oversell loses on revision.
        let effect = stored.value.effect;
        let item = self.reserve_stock(stored, quantity).await?;
        let progress = match update_progress(self.repos.progress.as_ref(), user.id, |progress| {
            progress.spend_coins(total)?;
            apply_effect(progress, effect, quantity);
            Ok(())
        })
        .await
        {
            Ok(progress) => progress,
            Err(error) => {
                if item.stock.is_some() {
                    self.release_stock(item_id, quantity).await;
                }
                return Err(error);
            }
        };

        let purchase = insert(
            self.repos.purchases.as_ref(),
            UserPurchase {
                id: Uuid::new_v4(),
                user_id: user.id,
                item_id,
                item_name: item.name.clone(),
                quantity,
                unit_price: item.price,
                total_price: total,
                purchased_at: self.clock.utc(),
            },
        )
        .await?;
        info!(user_id = %user.id, %item_id, quantity, total, "item purchased");

        if let Err(error) = self
            .quest_events
            .record_event(user.id, QuestMetric::ItemsPurchased, quantity)
            .await
        {
            warn!(user_id = %user.id, error = %error, "quest event dropped");
        }

        Ok(PurchaseReceipt {
            purchase,
            item,
            progress,
        })
    }
}

#[async_trait]
impl ShopQuery for ShopService {
    async fn list_categories(&self) -> Result<Vec<ShopCategory>, Error> {
        let mut categories =
            find_values(self.repos.shop_categories.as_ref(), &Query::all()).await?;
        categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn list_items(
        &self,
        category_id: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<ShopItem>, Error> {
        let mut query = Query::all();
        if let Some(category_id) = category_id {
            query = query.eq("categoryId", category_id);
        }
        if !include_inactive {
            query = query.eq("active", true);
        }
        let mut items = find_values(self.repos.shop_items.as_ref(), &query).await?;
        items.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn get_item(&self, id: Uuid) -> Result<ShopItem, Error> {
        require(self.repos.shop_items.as_ref(), id, "item")
            .await
            .map(Versioned::into_inner)
    }

    async fn list_purchases(
        &self,
        user_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<UserPurchase>, Error> {
        let query = match user_id {
            Some(user_id) => Query::all().eq("userId", user_id),
            None => Query::all(),
        };
        find_page(self.repos.purchases.as_ref(), query, &page).await
    }
}
