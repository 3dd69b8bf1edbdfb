//! Singleton payment configuration.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::Entity;

/// Id of the single settings document.
pub const SETTINGS_ID: Uuid = Uuid::nil();

const MAX_TAX_RATE_BPS: u32 = 10_000;

static CURRENCY_RE: OnceLock<Regex> = OnceLock::new();
static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern).unwrap_or_else(|error| panic!("{pattern} failed to compile: {error}"))
    })
}

/// Payment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettings {
    pub id: Uuid,
    /// ISO-4217 code used for every price.
    #[schema(example = "USD")]
    pub currency: String,
    /// Tax rate in basis points (1/100 of a percent).
    pub tax_rate_bps: u32,
    pub payments_enabled: bool,
    #[schema(example = "INV")]
    pub invoice_prefix: String,
    pub company_name: String,
    /// Last issued invoice sequence number.
    #[serde(default)]
    pub invoice_sequence: u64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            id: SETTINGS_ID,
            currency: "USD".to_owned(),
            tax_rate_bps: 0,
            payments_enabled: true,
            invoice_prefix: "INV".to_owned(),
            company_name: "Lingo".to_owned(),
            invoice_sequence: 0,
        }
    }
}

impl Entity for PaymentSettings {
    const COLLECTION: &'static str = "payment_settings";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Admin update of [`PaymentSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettingsUpdate {
    pub currency: String,
    pub tax_rate_bps: u32,
    pub payments_enabled: bool,
    pub invoice_prefix: String,
    pub company_name: String,
}

impl PaymentSettingsUpdate {
    /// Validate and apply on top of `current`, keeping the invoice sequence.
    pub fn apply_to(self, current: &PaymentSettings) -> Result<PaymentSettings, Error> {
        let currency = self.currency.trim().to_ascii_uppercase();
        if !compiled(&CURRENCY_RE, "^[A-Z]{3}$").is_match(&currency) {
            return Err(Error::invalid_field(
                "currency",
                "invalid_currency",
                "currency must be a three-letter ISO-4217 code",
            ));
        }
        if self.tax_rate_bps > MAX_TAX_RATE_BPS {
            return Err(Error::invalid_field(
                "taxRateBps",
                "out_of_range",
                format!("taxRateBps must be at most {MAX_TAX_RATE_BPS}"),
            ));
        }
        let invoice_prefix = self.invoice_prefix.trim().to_ascii_uppercase();
        if !compiled(&PREFIX_RE, "^[A-Z0-9]{1,10}$").is_match(&invoice_prefix) {
            return Err(Error::invalid_field(
                "invoicePrefix",
                "invalid_prefix",
                "invoicePrefix must be 1 to 10 letters or digits",
            ));
        }
        let company_name = self.company_name.trim();
        if company_name.is_empty() || company_name.chars().count() > 120 {
            return Err(Error::invalid_field(
                "companyName",
                "invalid_length",
                "companyName must be between 1 and 120 characters",
            ));
        }
        Ok(PaymentSettings {
            id: SETTINGS_ID,
            currency,
            tax_rate_bps: self.tax_rate_bps,
            payments_enabled: self.payments_enabled,
            invoice_prefix,
            company_name: company_name.to_owned(),
            invoice_sequence: current.invoice_sequence,
        })
    }
}
