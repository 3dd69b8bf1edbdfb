//! Driving ports for subscriptions and payments.

use async_trait::async_trait;
use pagination::{Page, PageRequest};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::billing::{
    CheckoutRequest, Invoice, PaymentSettings, PaymentSettingsUpdate, PaymentTransaction,
    PromoCode, PromoCodeDraft, Quote, Refund, RefundRequest, SubscriptionPlan,
    SubscriptionPlanDraft, TransactionStatus,
};
use crate::domain::user::User;

/// Billing configuration and catalogue management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingAdminCommand: Send + Sync {
    async fn update_settings(&self, update: PaymentSettingsUpdate)
    -> Result<PaymentSettings, Error>;

    async fn create_plan(&self, draft: SubscriptionPlanDraft) -> Result<SubscriptionPlan, Error>;

    async fn update_plan(
        &self,
        id: Uuid,
        draft: SubscriptionPlanDraft,
    ) -> Result<SubscriptionPlan, Error>;

    /// Fails with `has_children` once transactions reference the plan.
    async fn delete_plan(&self, id: Uuid) -> Result<(), Error>;

    async fn create_promo_code(&self, draft: PromoCodeDraft) -> Result<PromoCode, Error>;

    async fn update_promo_code(&self, id: Uuid, draft: PromoCodeDraft)
    -> Result<PromoCode, Error>;

    async fn delete_promo_code(&self, id: Uuid) -> Result<(), Error>;
}

/// Payment lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentCommand: Send + Sync {
    /// Quote a plan and open a pending transaction.
    async fn checkout(
        &self,
        user: &User,
        request: CheckoutRequest,
    ) -> Result<PaymentTransaction, Error>;

    /// Settle a pending transaction and extend the buyer's subscription.
    async fn confirm(
        &self,
        transaction_id: Uuid,
        provider_reference: String,
    ) -> Result<PaymentTransaction, Error>;

    async fn fail(&self, transaction_id: Uuid) -> Result<PaymentTransaction, Error>;

    /// Refund part or all of a settled transaction on behalf of `admin`.
    async fn refund(
        &self,
        admin: &User,
        transaction_id: Uuid,
        request: RefundRequest,
    ) -> Result<PaymentTransaction, Error>;
}

/// Billing reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingQuery: Send + Sync {
    /// Stored settings, or the defaults when none were saved.
    async fn settings(&self) -> Result<PaymentSettings, Error>;

    async fn list_plans(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, Error>;

    async fn get_plan(&self, id: Uuid) -> Result<SubscriptionPlan, Error>;

    async fn list_promo_codes(&self) -> Result<Vec<PromoCode>, Error>;

    async fn get_promo_code(&self, id: Uuid) -> Result<PromoCode, Error>;

    /// Price `plan_id` with `code` applied.
    async fn validate_promo_code(&self, code: String, plan_id: Uuid) -> Result<Quote, Error>;

    /// Transactions, optionally for one user and one status.
    async fn list_transactions(
        &self,
        user_id: Option<Uuid>,
        status: Option<TransactionStatus>,
        page: PageRequest,
    ) -> Result<Page<PaymentTransaction>, Error>;

    /// A transaction visible to `viewer`; learners only see their own.
    async fn get_transaction(
        &self,
        viewer: &User,
        transaction_id: Uuid,
    ) -> Result<PaymentTransaction, Error>;

    async fn list_refunds(&self, transaction_id: Uuid) -> Result<Vec<Refund>, Error>;

    /// Invoices, optionally for one user.
    async fn list_invoices(
        &self,
        user_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Invoice>, Error>;

    /// Invoice of a transaction visible to `viewer`.
    async fn get_invoice(&self, viewer: &User, transaction_id: Uuid) -> Result<Invoice, Error>;
}
