//! Subscription plans and subscription extension.

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::Entity;
use crate::domain::user::Subscription;

const MAX_TRIAL_DAYS: u32 = 90;
const MAX_FEATURES: usize = 20;

/// Billing period of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
}

impl BillingInterval {
    fn months(self) -> Months {
        match self {
            Self::Month => Months::new(1),
            Self::Year => Months::new(12),
        }
    }

    /// `from` plus one interval, clamped to the end of shorter months.
    pub fn after(self, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_months(self.months())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price per interval in minor units of the settings currency.
    pub price: u64,
    pub interval: BillingInterval,
    pub trial_days: u32,
    #[serde(default)]
    pub features: Vec<String>,
    pub active: bool,
}

impl Entity for SubscriptionPlan {
    const COLLECTION: &'static str = "subscription_plans";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Create or replace payload for a [`SubscriptionPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlanDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: u64,
    pub interval: BillingInterval,
    #[serde(default)]
    pub trial_days: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SubscriptionPlanDraft {
    pub fn into_plan(self, id: Uuid) -> Result<SubscriptionPlan, Error> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > 80 {
            return Err(Error::invalid_field(
                "name",
                "invalid_length",
                "name must be between 1 and 80 characters",
            ));
        }
        if self.price == 0 {
            return Err(Error::invalid_field(
                "price",
                "out_of_range",
                "price must be positive",
            ));
        }
        if self.trial_days > MAX_TRIAL_DAYS {
            return Err(Error::invalid_field(
                "trialDays",
                "out_of_range",
                format!("trialDays must be at most {MAX_TRIAL_DAYS}"),
            ));
        }
        let features: Vec<String> = self
            .features
            .iter()
            .map(|feature| feature.trim().to_owned())
            .filter(|feature| !feature.is_empty())
            .collect();
        if features.len() > MAX_FEATURES || features.iter().any(|f| f.chars().count() > 120) {
            return Err(Error::invalid_field(
                "features",
                "invalid_length",
                format!("at most {MAX_FEATURES} features of up to 120 characters"),
            ));
        }
        Ok(SubscriptionPlan {
            id,
            name: name.to_owned(),
            description: self
                .description
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            price: self.price,
            interval: self.interval,
            trial_days: self.trial_days,
            features,
            active: self.active,
        })
    }
}

/// Subscription after paying for one more interval of `plan`.
///
/// Paid time starts at the later of `now` and the current expiry. A learner
/// who never subscribed also receives the plan's trial days.
pub fn extend_subscription(
    current: Option<&Subscription>,
    plan: &SubscriptionPlan,
    now: DateTime<Utc>,
) -> Subscription {
    match current {
        Some(existing) => {
            let from = existing.expires_at.max(now);
            let started_at = if existing.is_active(now) {
                existing.started_at
            } else {
                now
            };
            Subscription {
                plan_id: plan.id,
                started_at,
                expires_at: plan.interval.after(from),
            }
        }
        None => Subscription {
            plan_id: plan.id,
            started_at: now,
            expires_at: plan
                .interval
                .after(now)
                .checked_add_signed(TimeDelta::days(i64::from(plan.trial_days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        },
    }
}
