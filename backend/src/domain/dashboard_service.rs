//! Admin dashboard aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use super::Error;
use super::billing::PaymentTransaction;
use super::lookup::{count, find_values};
use super::ports::{DashboardQuery, DashboardTotals, Query, Repositories, RevenueTotal};
use super::quests::UserQuestStatus;
use super::user::Role;

/// Group net revenue per currency.
pub fn revenue_by_currency(transactions: &[PaymentTransaction]) -> Vec<RevenueTotal> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for transaction in transactions {
        let net = transaction.net_revenue();
        if net > 0 {
            let entry = totals.entry(transaction.currency.as_str()).or_default();
            *entry = entry.saturating_add(net);
        }
    }
    totals
        .into_iter()
        .map(|(currency, amount)| RevenueTotal {
            currency: currency.to_owned(),
            amount,
        })
        .collect()
}

#[derive(Clone)]
pub struct DashboardService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }
}

#[async_trait]
impl DashboardQuery for DashboardService {
    async fn totals(&self) -> Result<DashboardTotals, Error> {
        let now = self.clock.utc();
        let repos = &self.repos;

        let users = find_values(repos.users.as_ref(), &Query::all()).await?;
        let admins = users.iter().filter(|user| user.role == Role::Admin).count();
        let active_subscribers = users
            .iter()
            .filter(|user| user.has_active_subscription(now))
            .count();
        let learners = users.len() - admins;

        let quests = find_values(repos.quests.as_ref(), &Query::all().eq("active", true)).await?;
        let open_quests = quests.iter().filter(|quest| quest.is_open(now)).count();

        let purchases = find_values(repos.purchases.as_ref(), &Query::all()).await?;
        let coins_spent = purchases
            .iter()
            .fold(0_u64, |sum, purchase| sum.saturating_add(purchase.total_price));

        let transactions = find_values(repos.transactions.as_ref(), &Query::all()).await?;

        Ok(DashboardTotals {
            learners: learners as u64,
            admins: admins as u64,
            active_subscribers: active_subscribers as u64,
            languages: count(repos.languages.as_ref(), &Query::all()).await?,
            published_languages: count(
                repos.languages.as_ref(),
                &Query::all().eq("published", true),
            )
            .await?,
            lessons: count(repos.lessons.as_ref(), &Query::all()).await?,
            open_quests: open_quests as u64,
            completed_quests: count(
                repos.user_quests.as_ref(),
                &Query::all().eq("status", UserQuestStatus::Completed),
            )
            .await?,
            purchases: purchases.len() as u64,
            coins_spent,
            revenue: revenue_by_currency(&transactions),
        })
    }
}
