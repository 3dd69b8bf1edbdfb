//! Promotional discount codes.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::Entity;

static CODE_RE: OnceLock<Regex> = OnceLock::new();

/// Uppercase and validate a promo code.
///
/// # Examples
/// ```
/// use lingo::domain::billing::normalize_promo_code;
///
/// assert_eq!(normalize_promo_code(" spring-25 ").as_deref(), Ok("SPRING-25"));
/// assert!(normalize_promo_code("no").is_err());
/// ```
pub fn normalize_promo_code(raw: &str) -> Result<String, Error> {
    let code = raw.trim().to_ascii_uppercase();
    let re = CODE_RE.get_or_init(|| {
        Regex::new("^[A-Z0-9_-]{3,32}$")
            .unwrap_or_else(|error| panic!("promo code regex failed to compile: {error}"))
    });
    if re.is_match(&code) {
        Ok(code)
    } else {
        Err(Error::invalid_field(
            "code",
            "invalid_code",
            "code must be 3 to 32 letters, digits, '-' or '_'",
        ))
    }
}

/// Discount granted by a promo code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Whole-number percentage, 1 to 100.
    Percent { percent: u8 },
    /// Fixed amount in minor units.
    Fixed { amount: u64 },
}

impl Discount {
    /// Discount on `subtotal`, never more than the subtotal itself.
    pub fn amount_off(self, subtotal: u64) -> u64 {
        let off = match self {
            Self::Percent { percent } => {
                let scaled = u128::from(subtotal) * u128::from(percent) / 100;
                u64::try_from(scaled).unwrap_or(u64::MAX)
            }
            Self::Fixed { amount } => amount,
        };
        off.min(subtotal)
    }

    fn validate(self) -> Result<Self, Error> {
        match self {
            Self::Percent { percent } if !(1..=100).contains(&percent) => Err(
                Error::invalid_field("discount", "out_of_range", "percent must be 1 to 100"),
            ),
            Self::Fixed { amount: 0 } => Err(Error::invalid_field(
                "discount",
                "out_of_range",
                "fixed discount must be positive",
            )),
            valid => Ok(valid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: Uuid,
    /// Uppercase, unique.
    pub code: String,
    pub discount: Discount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redemptions: Option<u32>,
    pub redemptions: u32,
    pub valid_from: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Plans the code applies to; empty means every plan.
    #[serde(default)]
    pub plan_ids: Vec<Uuid>,
    pub active: bool,
}

impl Entity for PromoCode {
    const COLLECTION: &'static str = "promo_codes";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Why a promo code cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    Inactive,
    NotYetValid,
    Expired,
    Exhausted,
    NotApplicable,
}

impl PromoRejection {
    fn code(self) -> &'static str {
        match self {
            Self::Inactive => "promo_inactive",
            Self::NotYetValid => "promo_not_started",
            Self::Expired => "promo_expired",
            Self::Exhausted => "promo_exhausted",
            Self::NotApplicable => "promo_not_applicable",
        }
    }
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inactive => "promo code is not active",
            Self::NotYetValid => "promo code is not valid yet",
            Self::Expired => "promo code has expired",
            Self::Exhausted => "promo code has no redemptions left",
            Self::NotApplicable => "promo code does not apply to this plan",
        })
    }
}

impl From<PromoRejection> for Error {
    fn from(rejection: PromoRejection) -> Self {
        Self::invalid_field("promoCode", rejection.code(), rejection.to_string())
    }
}

impl PromoCode {
    /// Check the code can be redeemed for `plan_id` at `now`.
    pub fn check_redeemable(&self, plan_id: Uuid, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(PromoRejection::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| now >= until) {
            return Err(PromoRejection::Expired);
        }
        if self
            .max_redemptions
            .is_some_and(|max| self.redemptions >= max)
        {
            return Err(PromoRejection::Exhausted);
        }
        if !self.plan_ids.is_empty() && !self.plan_ids.contains(&plan_id) {
            return Err(PromoRejection::NotApplicable);
        }
        Ok(())
    }

    /// Count one settled redemption, refusing to go past `max_redemptions`.
    ///
    /// Only the cap is re-checked: the validity window and plan scope were
    /// checked when the code was quoted at checkout.
    pub fn redeem(&mut self) -> Result<(), PromoRejection> {
        if self
            .max_redemptions
            .is_some_and(|max| self.redemptions >= max)
        {
            return Err(PromoRejection::Exhausted);
        }
        self.redemptions = self.redemptions.saturating_add(1);
        Ok(())
    }
}

/// Create or replace payload for a [`PromoCode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeDraft {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub max_redemptions: Option<u32>,
    /// Defaults to the moment of creation.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan_ids: Vec<Uuid>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl PromoCodeDraft {
    /// Build a code, keeping `redemptions` from an existing one.
    pub fn into_promo(
        self,
        id: Uuid,
        redemptions: u32,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        let code = normalize_promo_code(&self.code)?;
        let discount = self.discount.validate()?;
        if self.max_redemptions == Some(0) {
            return Err(Error::invalid_field(
                "maxRedemptions",
                "out_of_range",
                "maxRedemptions must be positive when set",
            ));
        }
        let valid_from = self.valid_from.unwrap_or(now);
        if self.valid_until.is_some_and(|until| until <= valid_from) {
            return Err(Error::invalid_field(
                "validUntil",
                "invalid_range",
                "validUntil must be after validFrom",
            ));
        }
        let mut plan_ids = self.plan_ids;
        plan_ids.sort_unstable();
        plan_ids.dedup();
        Ok(PromoCode {
            id,
            code,
            discount,
            max_redemptions: self.max_redemptions,
            redemptions,
            valid_from,
            valid_until: self.valid_until,
            plan_ids,
            active: self.active,
        })
    }
}
