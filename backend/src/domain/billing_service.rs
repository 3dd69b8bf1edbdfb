//! Subscription plans, promo codes, checkout, settlement and refunds.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use mockable::Clock;
use pagination::{Page, PageRequest};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Error, ErrorCode};
use super::billing::{
    CheckoutRequest, Invoice, PaymentSettings, PaymentSettingsUpdate, PaymentTransaction,
    PromoCode, PromoCodeDraft, Quote, Refund, RefundRequest, SETTINGS_ID, SubscriptionPlan,
    SubscriptionPlanDraft, TransactionStatus, extend_subscription, format_invoice_number,
    normalize_promo_code,
};
use super::lookup::{
    WRITE_ATTEMPTS, delete, ensure_no_children, find_page, find_values, insert, modify, page_of,
    replace, require,
};
use super::ports::{
    BillingAdminCommand, BillingQuery, PaymentCommand, Query, Repositories, RepositoryError,
    Versioned, map_repository_error,
};
use super::user::{Subscription, User};

/// Billing service over the payment repositories and user accounts.
#[derive(Clone)]
pub struct BillingService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl BillingService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn stored_settings(&self) -> Result<Option<Versioned<PaymentSettings>>, Error> {
        self.repos
            .payment_settings
            .get(SETTINGS_ID)
            .await
            .map_err(map_repository_error)
    }

    /// Reserve the next invoice number.
    async fn next_invoice_number(&self, now: DateTime<Utc>) -> Result<String, Error> {
        let mut attempt = 1;
        loop {
            let written = match self.stored_settings().await? {
                Some(mut stored) => {
                    stored.value.invoice_sequence += 1;
                    self.repos.payment_settings.replace(stored).await
                }
                None => {
                    let settings = PaymentSettings {
                        invoice_sequence: 1,
                        ..PaymentSettings::default()
                    };
                    self.repos.payment_settings.insert(settings).await
                }
            };
            match written {
                Ok(stored) => {
                    return Ok(format_invoice_number(
                        &stored.value.invoice_prefix,
                        now.year(),
                        stored.value.invoice_sequence,
                    ));
                }
                Err(RepositoryError::RevisionMismatch { .. } | RepositoryError::Duplicate { .. })
                    if attempt < WRITE_ATTEMPTS =>
                {
                    debug!(attempt, "invoice sequence lost a race, retrying");
                    attempt += 1;
                }
                Err(error) => return Err(map_repository_error(error)),
            }
        }
    }

    async fn promo_by_code(&self, code: &str) -> Result<Versioned<PromoCode>, Error> {
        let code = normalize_promo_code(code)?;
        self.repos
            .promo_codes
            .find(&Query::all().eq("code", &code))
            .await
            .map_err(map_repository_error)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("promo code {code} not found")))
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), Error> {
        let taken = find_values(
            self.repos.promo_codes.as_ref(),
            &Query::all().eq("code", code),
        )
        .await?
        .into_iter()
        .any(|promo| Some(promo.id) != except);
        if taken {
            return Err(Error::conflict_with_code(
                "duplicate_code",
                format!("promo code {code} already exists"),
            ));
        }
        Ok(())
    }

    async fn purchasable_plan(&self, plan_id: Uuid) -> Result<SubscriptionPlan, Error> {
        let plan = require(self.repos.plans.as_ref(), plan_id, "plan")
            .await?
            .into_inner();
        if !plan.active {
            return Err(Error::conflict_with_code(
                "plan_unavailable",
                format!("plan {plan_id} is not on sale"),
            ));
        }
        Ok(plan)
    }

    /// Look up and check a promo code for a plan.
    async fn redeemable_promo(
        &self,
        code: &str,
        plan_id: Uuid,
    ) -> Result<PromoCode, Error> {
        let promo = self.promo_by_code(code).await?.into_inner();
        promo.check_redeemable(plan_id, self.clock.utc())?;
        Ok(promo)
    }

    async fn visible_transaction(
        &self,
        viewer: &User,
        transaction_id: Uuid,
    ) -> Result<PaymentTransaction, Error> {
        let transaction =
            require(self.repos.transactions.as_ref(), transaction_id, "transaction")
                .await?
                .into_inner();
        if !viewer.is_admin() && transaction.user_id != viewer.id {
            return Err(Error::not_found(format!(
                "transaction {transaction_id} not found"
            )));
        }
        Ok(transaction)
    }

    /// Count a settled redemption of `code`; `None` when the code was
    /// deleted after checkout.
    async fn redeem_promo(&self, code: &str) -> Result<Option<Uuid>, Error> {
        let promo = match self.promo_by_code(code).await {
            Ok(promo) => promo,
            Err(error) if error.code() == ErrorCode::NotFound => {
                warn!(promo_code = %code, "promo code removed before settlement");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };
        let promo_id = promo.value.id;
        modify(
            self.repos.promo_codes.as_ref(),
            promo_id,
            "promo code",
            |promo| promo.redeem().map_err(Error::from),
        )
        .await?;
        Ok(Some(promo_id))
    }

    async fn release_redemption(&self, promo_id: Option<Uuid>) {
        let Some(promo_id) = promo_id else {
            return;
        };
        let released = modify(
            self.repos.promo_codes.as_ref(),
            promo_id,
            "promo code",
            |promo| {
                promo.redemptions = promo.redemptions.saturating_sub(1);
                Ok(())
            },
        )
        .await;
        if let Err(error) = released {
            error!(%promo_id, error = %error, "promo redemption not released");
        }
    }

    /// Apply `change` to a user's subscription, remembering what it replaced.
    async fn change_subscription<F>(
        &self,
        user_id: Uuid,
        mut change: F,
    ) -> Result<SubscriptionChange, Error>
    where
        F: FnMut(Option<&Subscription>) -> Option<Subscription> + Send,
    {
        let mut previous = None;
        let user = modify(self.repos.users.as_ref(), user_id, "user", |user| {
            previous.clone_from(&user.subscription);
            user.subscription = change(user.subscription.as_ref());
            Ok(())
        })
        .await?;
        Ok(SubscriptionChange {
            user_id,
            previous,
            written: user.subscription,
        })
    }

    /// Undo `change` unless the subscription moved on since.
    async fn restore_subscription(&self, change: SubscriptionChange) {
        let SubscriptionChange {
            user_id,
            previous,
            written,
        } = change;
        let restored = modify(self.repos.users.as_ref(), user_id, "user", |user| {
            if user.subscription == written {
                user.subscription.clone_from(&previous);
            }
            Ok(())
        })
        .await;
        if let Err(error) = restored {
            error!(%user_id, error = %error, "subscription change not rolled back");
        }
    }

    async fn discard_refund(&self, refund_id: Uuid) {
        if let Err(error) = self.repos.refunds.delete(refund_id).await {
            error!(%refund_id, error = %error, "refund record left behind");
        }
    }
}

/// Subscription before and after a write, for rolling it back.
struct SubscriptionChange {
    user_id: Uuid,
    previous: Option<Subscription>,
    written: Option<Subscription>,
}

#[async_trait]
impl BillingAdminCommand for BillingService {
    async fn update_settings(
        &self,
        update: PaymentSettingsUpdate,
    ) -> Result<PaymentSettings, Error> {
        let settings = match self.stored_settings().await? {
            Some(current) => {
                let settings = update.apply_to(&current.value)?;
                replace(
                    self.repos.payment_settings.as_ref(),
                    Versioned::new(settings, current.revision),
                )
                .await?
                .into_inner()
            }
            None => {
                let settings = update.apply_to(&PaymentSettings::default())?;
                insert(self.repos.payment_settings.as_ref(), settings).await?
            }
        };
        info!(
            currency = %settings.currency,
            tax_rate_bps = settings.tax_rate_bps,
            payments_enabled = settings.payments_enabled,
            "payment settings updated"
        );
        Ok(settings)
    }

    async fn create_plan(&self, draft: SubscriptionPlanDraft) -> Result<SubscriptionPlan, Error> {
        let plan = insert(self.repos.plans.as_ref(), draft.into_plan(Uuid::new_v4())?).await?;
        info!(plan_id = %plan.id, price = plan.price, "plan created");
        Ok(plan)
    }

    async fn update_plan(
        &self,
        id: Uuid,
        draft: SubscriptionPlanDraft,
    ) -> Result<SubscriptionPlan, Error> {
        let current = require(self.repos.plans.as_ref(), id, "plan").await?;
        replace(
            self.repos.plans.as_ref(),
            Versioned::new(draft.into_plan(id)?, current.revision),
        )
        .await
        .map(Versioned::into_inner)
    }

    async fn delete_plan(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.plans.as_ref(), id, "plan").await?;
        ensure_no_children(
            self.repos.transactions.as_ref(),
            &Query::all().eq("planId", id),
            "plan",
        )
        .await?;
        delete(self.repos.plans.as_ref(), id, "plan").await?;
        info!(plan_id = %id, "plan deleted");
        Ok(())
    }

    async fn create_promo_code(&self, draft: PromoCodeDraft) -> Result<PromoCode, Error> {
        let promo = draft.into_promo(Uuid::new_v4(), 0, self.clock.utc())?;
        self.ensure_code_free(&promo.code, None).await?;
        let promo = insert(self.repos.promo_codes.as_ref(), promo).await?;
        info!(promo_id = %promo.id, code = %promo.code, "promo code created");
        Ok(promo)
    }

    async fn update_promo_code(
        &self,
        id: Uuid,
        draft: PromoCodeDraft,
    ) -> Result<PromoCode, Error> {
        let current = require(self.repos.promo_codes.as_ref(), id, "promo code").await?;
        let promo = draft.into_promo(id, current.value.redemptions, self.clock.utc())?;
        self.ensure_code_free(&promo.code, Some(id)).await?;
        replace(
            self.repos.promo_codes.as_ref(),
            Versioned::new(promo, current.revision),
        )
        .await
        .map(Versioned::into_inner)
    }

    async fn delete_promo_code(&self, id: Uuid) -> Result<(), Error> {
        delete(self.repos.promo_codes.as_ref(), id, "promo code").await?;
        info!(promo_id = %id, "promo code deleted");
        Ok(())
    }
}

#[async_trait]
impl PaymentCommand for BillingService {
    async fn checkout(
        &self,
        user: &User,
        request: CheckoutRequest,
    ) -> Result<PaymentTransaction, Error> {
        let settings = self.settings().await?;
        if !settings.payments_enabled {
            debug!(user_id = %user.id, "checkout rejected while payments are disabled");
            return Err(Error::conflict_with_code(
                "payments_disabled",
                "payments are currently disabled",
            ));
        }
        let plan = self.purchasable_plan(request.plan_id).await?;
        let promo = match request.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(self.redeemable_promo(code, plan.id).await?),
            _ => None,
        };
        let quote = Quote::compute(&plan, promo.as_ref(), &settings);
        let transaction = insert(
            self.repos.transactions.as_ref(),
            PaymentTransaction::pending(user, quote, self.clock.utc()),
        )
        .await?;
        info!(
            transaction_id = %transaction.id,
            user_id = %user.id,
            plan_id = %plan.id,
            total = transaction.total,
            currency = %transaction.currency,
            "checkout started"
        );
        Ok(transaction)
    }

    async fn confirm(
        &self,
        transaction_id: Uuid,
        provider_reference: String,
    ) -> Result<PaymentTransaction, Error> {
        let provider_reference = provider_reference.trim().to_owned();
        if provider_reference.is_empty() {
            return Err(Error::invalid_field(
                "providerReference",
                "required",
                "providerReference must not be empty",
            ));
        }
        let now = self.clock.utc();
        let mut stored =
            require(self.repos.transactions.as_ref(), transaction_id, "transaction").await?;
        stored.value.ensure_pending("confirm")?;
        let plan = require(self.repos.plans.as_ref(), stored.value.plan_id, "plan")
            .await?
            .into_inner();

        // Side effects land first and are rolled back if settling fails, so
        // a transaction only leaves `pending` once the learner holds the plan.
        let redeemed = match stored.value.promo_code.as_deref() {
            Some(code) => self.redeem_promo(code).await?,
            None => None,
        };
        let granted = match self
            .change_subscription(stored.value.user_id, |current| {
                Some(extend_subscription(current, &plan, now))
            })
            .await
        {
            Ok(granted) => granted,
            Err(error) => {
                self.release_redemption(redeemed).await;
                return Err(error);
            }
        };
        let settled = async {
            let invoice_number = self.next_invoice_number(now).await?;
            stored
                .value
                .confirm(provider_reference, invoice_number, now)?;
            replace(self.repos.transactions.as_ref(), stored)
                .await
                .map(Versioned::into_inner)
        }
        .await;
        let transaction = match settled {
            Ok(transaction) => transaction,
            Err(error) => {
                warn!(%transaction_id, error = %error, "settlement failed, rolling back");
                self.restore_subscription(granted).await;
                self.release_redemption(redeemed).await;
                return Err(error);
            }
        };
        info!(
            %transaction_id,
            user_id = %transaction.user_id,
            invoice_number = transaction.invoice_number.as_deref().unwrap_or_default(),
            expires_at = ?granted.written.as_ref().map(|s| s.expires_at),
            "payment confirmed"
        );
        Ok(transaction)
    }

    async fn fail(&self, transaction_id: Uuid) -> Result<PaymentTransaction, Error> {
        let mut stored =
            require(self.repos.transactions.as_ref(), transaction_id, "transaction").await?;
        stored.value.fail(self.clock.utc())?;
        let transaction = replace(self.repos.transactions.as_ref(), stored)
            .await?
            .into_inner();
        info!(%transaction_id, "payment failed");
        Ok(transaction)
    }

    async fn refund(
        &self,
        admin: &User,
        transaction_id: Uuid,
        request: RefundRequest,
    ) -> Result<PaymentTransaction, Error> {
        let now = self.clock.utc();
        let mut stored =
            require(self.repos.transactions.as_ref(), transaction_id, "transaction").await?;
        let full = stored.value.apply_refund(request.amount)?;
        let user_id = stored.value.user_id;
        let plan_id = stored.value.plan_id;

        let refund = insert(
            self.repos.refunds.as_ref(),
            Refund {
                id: Uuid::new_v4(),
                transaction_id,
                amount: request.amount,
                reason: request
                    .reason
                    .map(|reason| reason.trim().to_owned())
                    .filter(|reason| !reason.is_empty()),
                created_by: admin.id,
                created_at: now,
            },
        )
        .await?;
        let revoked = if full {
            let revoked = self
                .change_subscription(user_id, |current| {
                    current.cloned().map(|mut subscription| {
                        if subscription.plan_id == plan_id {
                            subscription.expires_at = subscription.expires_at.min(now);
                        }
                        subscription
                    })
                })
                .await;
            match revoked {
                Ok(change) => Some(change),
                Err(error) => {
                    self.discard_refund(refund.id).await;
                    return Err(error);
                }
            }
        } else {
            None
        };
        // The revision check on the transaction serialises concurrent refunds.
        let transaction = match replace(self.repos.transactions.as_ref(), stored).await {
            Ok(stored) => stored.into_inner(),
            Err(error) => {
                if let Some(change) = revoked {
                    self.restore_subscription(change).await;
                }
                self.discard_refund(refund.id).await;
                return Err(error);
            }
        };
        info!(
            %transaction_id,
            admin_id = %admin.id,
            amount = request.amount,
            refunded = transaction.refunded,
            status = ?transaction.status,
            "refund issued"
        );
        Ok(transaction)
    }
}

#[async_trait]
impl BillingQuery for BillingService {
    async fn settings(&self) -> Result<PaymentSettings, Error> {
        Ok(self
            .stored_settings()
            .await?
            .map(Versioned::into_inner)
            .unwrap_or_default())
    }

    async fn list_plans(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, Error> {
        let query = if include_inactive {
            Query::all()
        } else {
            Query::all().eq("active", true)
        };
        let mut plans = find_values(self.repos.plans.as_ref(), &query).await?;
        plans.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn get_plan(&self, id: Uuid) -> Result<SubscriptionPlan, Error> {
        require(self.repos.plans.as_ref(), id, "plan")
            .await
            .map(Versioned::into_inner)
    }

    async fn list_promo_codes(&self) -> Result<Vec<PromoCode>, Error> {
        let mut codes = find_values(self.repos.promo_codes.as_ref(), &Query::all()).await?;
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(codes)
    }

    async fn get_promo_code(&self, id: Uuid) -> Result<PromoCode, Error> {
        require(self.repos.promo_codes.as_ref(), id, "promo code")
            .await
            .map(Versioned::into_inner)
    }

    async fn validate_promo_code(&self, code: String, plan_id: Uuid) -> Result<Quote, Error> {
        let plan = self.purchasable_plan(plan_id).await?;
        let promo = self.redeemable_promo(&code, plan.id).await?;
        let settings = self.settings().await?;
        Ok(Quote::compute(&plan, Some(&promo), &settings))
    }

    async fn list_transactions(
        &self,
        user_id: Option<Uuid>,
        status: Option<TransactionStatus>,
        page: PageRequest,
    ) -> Result<Page<PaymentTransaction>, Error> {
        let mut query = Query::all();
        if let Some(user_id) = user_id {
            query = query.eq("userId", user_id);
        }
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        find_page(self.repos.transactions.as_ref(), query, &page).await
    }

    async fn get_transaction(
        &self,
        viewer: &User,
        transaction_id: Uuid,
    ) -> Result<PaymentTransaction, Error> {
        self.visible_transaction(viewer, transaction_id).await
    }

    async fn list_refunds(&self, transaction_id: Uuid) -> Result<Vec<Refund>, Error> {
        require(self.repos.transactions.as_ref(), transaction_id, "transaction").await?;
        let mut refunds = find_values(
            self.repos.refunds.as_ref(),
            &Query::all().eq("transactionId", transaction_id),
        )
        .await?;
        refunds.sort_by_key(|refund| refund.created_at);
        Ok(refunds)
    }

    async fn list_invoices(
        &self,
        user_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Invoice>, Error> {
        let query = match user_id {
            Some(user_id) => Query::all().eq("userId", user_id),
            None => Query::all(),
        };
        let settings = self.settings().await?;
        let invoices: Vec<Invoice> = find_values(self.repos.transactions.as_ref(), &query)
            .await?
            .iter()
            .filter_map(|transaction| Invoice::from_transaction(transaction, &settings.company_name))
            .collect();
        Ok(page_of(invoices, &page))
    }

    async fn get_invoice(&self, viewer: &User, transaction_id: Uuid) -> Result<Invoice, Error> {
        let transaction = self.visible_transaction(viewer, transaction_id).await?;
        let settings = self.settings().await?;
        Invoice::from_transaction(&transaction, &settings.company_name).ok_or_else(|| {
            Error::not_found(format!("no invoice for transaction {transaction_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::billing::{BillingInterval, Discount};
    use crate::domain::ports::MockRepository;
    use crate::domain::test_doubles::{FailReplace, StoredRepository};
    use crate::domain::user::{DisplayName, Role};
    use crate::test_support::MutableClock;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn learner() -> User {
        User {
            id: Uuid::new_v4(),
            external_id: "sub".to_owned(),
            email: None,
            display_name: DisplayName::default_name(),
            role: Role::Learner,
            subscription: None,
            created_at: now(),
        }
    }

    fn plan(active: bool) -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Plus".to_owned(),
            description: None,
            price: 1000,
            interval: BillingInterval::Month,
            trial_days: 0,
            features: Vec::new(),
            active,
        }
    }

    fn plans_repo(plan: SubscriptionPlan) -> MockRepository<SubscriptionPlan> {
        let mut plans = MockRepository::<SubscriptionPlan>::new();
        plans
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(plan.clone(), 1))));
        plans
    }

    fn service(repos: Repositories) -> BillingService {
        BillingService::new(repos, Arc::new(MutableClock::new(now())))
    }

    fn conflict_code(error: &Error) -> Option<&str> {
        error
            .details()
            .and_then(|details| details.get("code"))
            .and_then(|code| code.as_str())
    }

    #[rstest]
    #[tokio::test]
    async fn checkout_is_refused_while_payments_are_disabled(learner: User) {
        let mut settings = MockRepository::<PaymentSettings>::new();
        settings.expect_get().returning(|_| {
            Ok(Some(Versioned::new(
                PaymentSettings {
                    payments_enabled: false,
                    ..PaymentSettings::default()
                },
                1,
            )))
        });
        let mut transactions = MockRepository::<PaymentTransaction>::new();
        transactions.expect_insert().never();
        let mut repos = Repositories::fixtures();
        repos.payment_settings = Arc::new(settings);
        repos.transactions = Arc::new(transactions);

        let err = service(repos)
            .checkout(
                &learner,
                CheckoutRequest {
                    plan_id: Uuid::new_v4(),
                    promo_code: None,
                },
            )
            .await
            .expect_err("payments disabled");
        assert_eq!(conflict_code(&err), Some("payments_disabled"));
    }

    #[rstest]
    #[tokio::test]
    async fn checkout_applies_promo_and_opens_pending_transaction(learner: User) {
        let plan = plan(true);
        let plan_id = plan.id;
        let promo = PromoCode {
            id: Uuid::new_v4(),
            code: "HALF".to_owned(),
            discount: Discount::Percent { percent: 50 },
            max_redemptions: None,
            redemptions: 0,
            valid_from: now() - chrono::TimeDelta::days(1),
            valid_until: None,
            plan_ids: vec![plan_id],
            active: true,
        };
        let mut promos = MockRepository::<PromoCode>::new();
        promos
            .expect_find()
            .returning(move |_| Ok(vec![Versioned::new(promo.clone(), 1)]));
        let mut repos = Repositories::fixtures();
        repos.plans = Arc::new(plans_repo(plan));
        repos.promo_codes = Arc::new(promos);

        let transaction = service(repos)
            .checkout(
                &learner,
                CheckoutRequest {
                    plan_id,
                    promo_code: Some(" half ".to_owned()),
                },
            )
            .await
            .expect("checkout succeeds");
        assert_eq!(transaction.status, TransactionStatus::Pending);
        assert_eq!(transaction.discount, 500);
        assert_eq!(transaction.total, 500);
        assert_eq!(transaction.promo_code.as_deref(), Some("HALF"));
    }

    #[rstest]
    #[tokio::test]
    async fn inactive_plans_cannot_be_bought(learner: User) {
        let plan = plan(false);
        let plan_id = plan.id;
        let mut repos = Repositories::fixtures();
        repos.plans = Arc::new(plans_repo(plan));
        let err = service(repos)
            .checkout(
                &learner,
                CheckoutRequest {
                    plan_id,
                    promo_code: None,
                },
            )
            .await
            .expect_err("inactive plan");
        assert_eq!(conflict_code(&err), Some("plan_unavailable"));
    }

    #[rstest]
    #[tokio::test]
    async fn learners_cannot_see_foreign_transactions(learner: User) {
        let other = User {
            id: Uuid::new_v4(),
            ..learner.clone()
        };
        let quote = Quote::compute(&plan(true), None, &PaymentSettings::default());
        let transaction = PaymentTransaction::pending(&other, quote, now());
        let transaction_id = transaction.id;
        let mut transactions = MockRepository::<PaymentTransaction>::new();
        transactions
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(transaction.clone(), 1))));
        let mut repos = Repositories::fixtures();
        repos.transactions = Arc::new(transactions);

        let err = service(repos)
            .get_transaction(&learner, transaction_id)
            .await
            .expect_err("not visible");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn first_invoice_number_seeds_settings() {
        let mut settings = MockRepository::<PaymentSettings>::new();
        settings.expect_get().returning(|_| Ok(None));
        settings
            .expect_insert()
            .withf(|settings| settings.invoice_sequence == 1)
            .returning(|settings| Ok(Versioned::new(settings, 1)));
        let mut repos = Repositories::fixtures();
        repos.payment_settings = Arc::new(settings);

        let number = service(repos)
            .next_invoice_number(now())
            .await
            .expect("number allocated");
        assert_eq!(number, "INV-2026-000001");
    }

    /// Stateful repositories holding one learner, one plan, a promo code
    /// capped at a single redemption and two pending checkouts using it.
    struct Ledger {
        service: BillingService,
        learner: User,
        checkouts: [Uuid; 2],
        users: Arc<StoredRepository<User>>,
        promos: Arc<StoredRepository<PromoCode>>,
        transactions: Arc<StoredRepository<PaymentTransaction>>,
        refunds: Arc<StoredRepository<Refund>>,
    }

    impl Ledger {
        fn redemptions(&self) -> u32 {
            self.promos.values()[0].redemptions
        }

        fn subscription(&self) -> Option<Subscription> {
            self.users
                .value(self.learner.id)
                .and_then(|user| user.subscription)
        }

        fn transaction(&self, id: Uuid) -> PaymentTransaction {
            self.transactions.value(id).expect("transaction stored")
        }

        fn admin(&self) -> User {
            User {
                id: Uuid::new_v4(),
                role: Role::Admin,
                ..self.learner.clone()
            }
        }
    }

    #[fixture]
    fn ledger(learner: User) -> Ledger {
        let plan = plan(true);
        let promo = PromoCode {
            id: Uuid::new_v4(),
            code: "SPRING".to_owned(),
            discount: Discount::Fixed { amount: 200 },
            max_redemptions: Some(1),
            redemptions: 0,
            valid_from: now() - chrono::TimeDelta::days(1),
            valid_until: None,
            plan_ids: Vec::new(),
            active: true,
        };
        let pending = || {
            let quote = Quote::compute(&plan, Some(&promo), &PaymentSettings::default());
            PaymentTransaction::pending(&learner, quote, now())
        };
        let (first, second) = (pending(), pending());
        let checkouts = [first.id, second.id];
        let users = Arc::new(StoredRepository::with([learner.clone()]));
        let promos = Arc::new(StoredRepository::with([promo]));
        let transactions = Arc::new(StoredRepository::with([first, second]));
        let refunds = Arc::new(StoredRepository::empty());
        let mut repos = Repositories::fixtures();
        repos.users = users.clone();
        repos.plans = Arc::new(StoredRepository::with([plan]));
        repos.promo_codes = promos.clone();
        repos.transactions = transactions.clone();
        repos.payment_settings = Arc::new(StoredRepository::empty());
        repos.refunds = refunds.clone();
        Ledger {
            service: service(repos),
            learner,
            checkouts,
            users,
            promos,
            transactions,
            refunds,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn confirm_leaves_nothing_behind_when_granting_fails(ledger: Ledger) {
        let [checkout, _] = ledger.checkouts;
        ledger.users.fail_replace(FailReplace::Call(1));

        let err = ledger
            .service
            .confirm(checkout, "ch_1".to_owned())
            .await
            .expect_err("user write fails");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert_eq!(ledger.transaction(checkout).status, TransactionStatus::Pending);
        assert_eq!(ledger.redemptions(), 0);
        assert_eq!(ledger.subscription(), None);

        ledger.users.fail_replace(FailReplace::Never);
        let settled = ledger
            .service
            .confirm(checkout, "ch_1".to_owned())
            .await
            .expect("retry settles");
        assert_eq!(settled.status, TransactionStatus::Succeeded);
        assert_eq!(ledger.redemptions(), 1);
        assert!(ledger.subscription().is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn confirm_rolls_back_the_grant_when_settling_fails(ledger: Ledger) {
        let [checkout, _] = ledger.checkouts;
        ledger.transactions.fail_replace(FailReplace::Call(1));

        ledger
            .service
            .confirm(checkout, "ch_1".to_owned())
            .await
            .expect_err("transaction write fails");
        assert_eq!(ledger.transaction(checkout).status, TransactionStatus::Pending);
        assert_eq!(ledger.subscription(), None);
        assert_eq!(ledger.redemptions(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn confirm_respects_the_redemption_cap(ledger: Ledger) {
        let [first, second] = ledger.checkouts;
        ledger
            .service
            .confirm(first, "ch_1".to_owned())
            .await
            .expect("first redemption settles");

        let err = ledger
            .service
            .confirm(second, "ch_2".to_owned())
            .await
            .expect_err("cap reached");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(conflict_code(&err), Some("promo_exhausted"));
        assert_eq!(ledger.transaction(second).status, TransactionStatus::Pending);
        assert_eq!(ledger.redemptions(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn refund_is_undone_when_the_transaction_write_fails(ledger: Ledger) {
        let [checkout, _] = ledger.checkouts;
        let settled = ledger
            .service
            .confirm(checkout, "ch_1".to_owned())
            .await
            .expect("settles");
        let granted = ledger.subscription();
        ledger.transactions.fail_replace(FailReplace::Call(2));

        let err = ledger
            .service
            .refund(
                &ledger.admin(),
                checkout,
                RefundRequest {
                    amount: settled.total,
                    reason: Some("duplicate charge".to_owned()),
                },
            )
            .await
            .expect_err("transaction write fails");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert!(ledger.refunds.values().is_empty());
        assert_eq!(ledger.subscription(), granted);
        let transaction = ledger.transaction(checkout);
        assert_eq!(transaction.refunded, 0);
        assert_eq!(transaction.status, TransactionStatus::Succeeded);
    }
}
