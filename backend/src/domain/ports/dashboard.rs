//! Driving port for the admin dashboard.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;

/// Net revenue in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotal {
    pub currency: String,
    /// Minor units after refunds.
    pub amount: u64,
}

/// Platform-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub learners: u64,
    pub admins: u64,
    pub active_subscribers: u64,
    pub languages: u64,
    pub published_languages: u64,
    pub lessons: u64,
    pub open_quests: u64,
    pub completed_quests: u64,
    pub purchases: u64,
    pub coins_spent: u64,
    /// One entry per currency, sorted by currency code.
    pub revenue: Vec<RevenueTotal>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardQuery: Send + Sync {
    async fn totals(&self) -> Result<DashboardTotals, Error>;
}
