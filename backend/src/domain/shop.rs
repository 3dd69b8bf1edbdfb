//! Coin shop: categories, items and purchases.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Error;
use super::ports::Entity;
use super::user::{MAX_HEARTS, UserProgress};

/// Largest quantity accepted in one purchase.
pub const MAX_PURCHASE_QUANTITY: u64 = 100;

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_RE.get_or_init(|| {
        Regex::new("^[a-z0-9]+(-[a-z0-9]+)*$")
            .unwrap_or_else(|error| panic!("slug regex failed to compile: {error}"))
    })
}

fn required(field: &str, raw: &str, max: usize) -> Result<String, Error> {
    let value = raw.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(Error::invalid_field(
            field,
            "invalid_length",
            format!("{field} must be between 1 and {max} characters"),
        ));
    }
    Ok(value.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopCategory {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "power-ups")]
    pub slug: String,
    pub order: u32,
}

impl Entity for ShopCategory {
    const COLLECTION: &'static str = "shop_categories";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Create or replace payload for a [`ShopCategory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopCategoryDraft {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub order: u32,
}

impl ShopCategoryDraft {
    pub fn into_category(self, id: Uuid) -> Result<ShopCategory, Error> {
        let slug = self.slug.trim().to_ascii_lowercase();
        if slug.len() > 64 || !slug_regex().is_match(&slug) {
            return Err(Error::invalid_field(
                "slug",
                "invalid_slug",
                "slug must be lowercase words joined by hyphens",
            ));
        }
        Ok(ShopCategory {
            id,
            name: required("name", &self.name, 80)?,
            slug,
            order: self.order,
        })
    }
}

/// What an item does once bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    /// Refill hearts to the maximum.
    HeartRefill,
    /// One streak freeze per unit bought.
    StreakFreeze,
    /// No gameplay effect.
    Cosmetic,
}

/// Apply the effect of `quantity` units of an item.
pub fn apply_effect(progress: &mut UserProgress, effect: ItemEffect, quantity: u64) {
    match effect {
        ItemEffect::HeartRefill => progress.hearts = MAX_HEARTS,
        ItemEffect::StreakFreeze => {
            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            progress.streak_freezes = progress.streak_freezes.saturating_add(quantity);
        }
        ItemEffect::Cosmetic => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in coins.
    pub price: u64,
    pub effect: ItemEffect,
    /// Remaining stock; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u64>,
    /// Lifetime purchase cap per learner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_user_limit: Option<u64>,
    pub active: bool,
}

impl Entity for ShopItem {
    const COLLECTION: &'static str = "shop_items";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Create or replace payload for a [`ShopItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopItemDraft {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: u64,
    pub effect: ItemEffect,
    #[serde(default)]
    pub stock: Option<u64>,
    #[serde(default)]
    pub per_user_limit: Option<u64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ShopItemDraft {
    pub fn into_item(self, id: Uuid) -> Result<ShopItem, Error> {
        if self.price == 0 {
            return Err(Error::invalid_field(
                "price",
                "out_of_range",
                "price must be positive",
            ));
        }
        if self.per_user_limit == Some(0) {
            return Err(Error::invalid_field(
                "perUserLimit",
                "out_of_range",
                "perUserLimit must be positive when set",
            ));
        }
        Ok(ShopItem {
            id,
            category_id: self.category_id,
            name: required("name", &self.name, 80)?,
            description: match self.description {
                Some(text) if !text.trim().is_empty() => Some(required("description", &text, 500)?),
                _ => None,
            },
            price: self.price,
            effect: self.effect,
            stock: self.stock,
            per_user_limit: self.per_user_limit,
            active: self.active,
        })
    }
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    /// Item name at purchase time.
    pub item_name: String,
    pub quantity: u64,
    pub unit_price: u64,
    pub total_price: u64,
    pub purchased_at: DateTime<Utc>,
}

impl Entity for UserPurchase {
    const COLLECTION: &'static str = "user_purchases";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Result of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchase: UserPurchase,
    pub item: ShopItem,
    pub progress: UserProgress,
}

/// Check a purchase request against item state and the learner's history.
///
/// Returns the total price in coins.
pub fn validate_purchase(
    item: &ShopItem,
    quantity: u64,
    previously_bought: u64,
) -> Result<u64, Error> {
    if quantity == 0 || quantity > MAX_PURCHASE_QUANTITY {
        return Err(Error::invalid_field(
            "quantity",
            "out_of_range",
            format!("quantity must be between 1 and {MAX_PURCHASE_QUANTITY}"),
        ));
    }
    if !item.active {
        return Err(Error::conflict_with_code(
            "item_unavailable",
            "item is not for sale",
        ));
    }
    if item.stock.is_some_and(|stock| stock < quantity) {
        return Err(Error::conflict_with_code(
            "out_of_stock",
            "not enough stock left",
        ));
    }
    if let Some(limit) = item.per_user_limit
        && previously_bought.saturating_add(quantity) > limit
    {
        return Err(Error::conflict_with_code(
            "purchase_limit_reached",
            format!("at most {limit} per learner"),
        ));
    }
    item.price.checked_mul(quantity).ok_or_else(|| {
        Error::invalid_field("quantity", "out_of_range", "total price is too large")
    })
}
