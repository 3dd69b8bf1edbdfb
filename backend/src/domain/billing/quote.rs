//! Price quotes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PaymentSettings, PromoCode, SubscriptionPlan};

const BPS_SCALE: u128 = 10_000;

/// Tax on `net` at `rate_bps`, rounded half up to the minor unit.
///
/// # Examples
/// ```
/// use lingo::domain::billing::tax_amount;
///
/// // 19.99 at 7.25% is 1.449275, which rounds to 1.45.
/// assert_eq!(tax_amount(1999, 725), 145);
/// assert_eq!(tax_amount(1000, 0), 0);
/// ```
pub fn tax_amount(net: u64, rate_bps: u32) -> u64 {
    let scaled = u128::from(net) * u128::from(rate_bps) + BPS_SCALE / 2;
    u64::try_from(scaled / BPS_SCALE).unwrap_or(u64::MAX)
}

/// Price breakdown for one interval of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub currency: String,
    pub subtotal: u64,
    pub discount: u64,
    pub tax_rate_bps: u32,
    pub tax: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl Quote {
    /// Price `plan` with an already-validated promo code.
    pub fn compute(
        plan: &SubscriptionPlan,
        promo: Option<&PromoCode>,
        settings: &PaymentSettings,
    ) -> Self {
        let subtotal = plan.price;
        let discount = promo.map_or(0, |promo| promo.discount.amount_off(subtotal));
        let net = subtotal - discount;
        let tax = tax_amount(net, settings.tax_rate_bps);
        Self {
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            currency: settings.currency.clone(),
            subtotal,
            discount,
            tax_rate_bps: settings.tax_rate_bps,
            tax,
            total: net.saturating_add(tax),
            promo_code: promo.map(|promo| promo.code.clone()),
        }
    }
}
