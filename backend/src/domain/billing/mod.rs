//! Subscriptions and payments.
//!
//! Money is carried as integer minor units alongside an ISO-4217 currency
//! code. Nothing in this module uses floating point: percentages are whole
//! numbers and tax rates are basis points, rounded half up on the final
//! minor unit.
//!
//! A checkout produces a [`Quote`] and a pending [`PaymentTransaction`].
//! Confirmation moves the transaction to `succeeded`, assigns an invoice
//! number and extends the learner's subscription. Refunds are recorded as
//! separate [`Refund`] entities and accumulate on the transaction until the
//! full total has been returned.

mod invoice;
mod plans;
mod promo;
mod quote;
mod settings;
mod transactions;

pub use invoice::{Invoice, InvoiceLine, format_invoice_number};
pub use plans::{BillingInterval, SubscriptionPlan, SubscriptionPlanDraft, extend_subscription};
pub use promo::{Discount, PromoCode, PromoCodeDraft, PromoRejection, normalize_promo_code};
pub use quote::{Quote, tax_amount};
pub use settings::{PaymentSettings, PaymentSettingsUpdate, SETTINGS_ID};
pub use transactions::{
    CheckoutRequest, ConfirmRequest, PaymentTransaction, Refund, RefundRequest,
    TransactionStatus,
};

#[cfg(test)]
mod tests;
