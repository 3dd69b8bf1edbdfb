//! Tests for billing arithmetic and lifecycle rules.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::user::{DisplayName, Role, Subscription, User};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn plan() -> SubscriptionPlan {
    SubscriptionPlan {
        id: Uuid::new_v4(),
        name: "Plus".to_owned(),
        description: None,
        price: 1999,
        interval: BillingInterval::Month,
        trial_days: 7,
        features: vec!["Unlimited hearts".to_owned()],
        active: true,
    }
}

#[fixture]
fn promo() -> PromoCode {
    PromoCode {
        id: Uuid::new_v4(),
        code: "SPRING".to_owned(),
        discount: Discount::Percent { percent: 25 },
        max_redemptions: Some(2),
        redemptions: 0,
        valid_from: at(2026, 3, 1),
        valid_until: Some(at(2026, 6, 1)),
        plan_ids: Vec::new(),
        active: true,
    }
}

fn learner() -> User {
    User {
        id: Uuid::new_v4(),
        external_id: "sub".to_owned(),
        email: Some("ada@example.com".to_owned()),
        display_name: DisplayName::new("Ada").expect("valid name"),
        role: Role::Learner,
        subscription: None,
        created_at: at(2026, 1, 1),
    }
}

#[rstest]
#[case(1000, 0, 0)]
#[case(1000, 825, 83)]
#[case(200, 25, 1)]
#[case(199, 25, 0)]
#[case(1000, 10_000, 1000)]
fn tax_rounds_half_up(#[case] net: u64, #[case] bps: u32, #[case] expected: u64) {
    assert_eq!(tax_amount(net, bps), expected);
}

#[rstest]
#[case(Discount::Percent { percent: 25 }, 1999, 499)]
#[case(Discount::Percent { percent: 100 }, 1999, 1999)]
#[case(Discount::Fixed { amount: 500 }, 1999, 500)]
#[case(Discount::Fixed { amount: 5000 }, 1999, 1999)]
fn discount_never_exceeds_subtotal(
    #[case] discount: Discount,
    #[case] subtotal: u64,
    #[case] expected: u64,
) {
    assert_eq!(discount.amount_off(subtotal), expected);
}

#[rstest]
fn quote_applies_discount_before_tax(plan: SubscriptionPlan, promo: PromoCode) {
    let settings = PaymentSettings {
        tax_rate_bps: 2000,
        ..PaymentSettings::default()
    };
    let quote = Quote::compute(&plan, Some(&promo), &settings);
    assert_eq!(quote.subtotal, 1999);
    assert_eq!(quote.discount, 499);
    assert_eq!(quote.tax, 300);
    assert_eq!(quote.total, 1800);
    assert_eq!(quote.currency, "USD");
    assert_eq!(quote.promo_code.as_deref(), Some("SPRING"));
}

#[rstest]
#[case(at(2026, 2, 1), Some(PromoRejection::NotYetValid))]
#[case(at(2026, 4, 1), None)]
#[case(at(2026, 6, 1), Some(PromoRejection::Expired))]
fn promo_validity_window(
    promo: PromoCode,
    #[case] now: DateTime<Utc>,
    #[case] expected: Option<PromoRejection>,
) {
    assert_eq!(promo.check_redeemable(Uuid::new_v4(), now).err(), expected);
}

#[rstest]
fn exhausted_and_scoped_promos_are_rejected(mut promo: PromoCode) {
    let now = at(2026, 4, 1);
    let plan_id = Uuid::new_v4();
    promo.plan_ids = vec![Uuid::new_v4()];
    assert_eq!(
        promo.check_redeemable(plan_id, now),
        Err(PromoRejection::NotApplicable)
    );
    promo.plan_ids = vec![plan_id];
    promo.redemptions = 2;
    assert_eq!(
        promo.check_redeemable(plan_id, now),
        Err(PromoRejection::Exhausted)
    );
}

#[rstest]
fn redemptions_stop_at_the_cap(mut promo: PromoCode) {
    promo.redeem().expect("first");
    promo.redeem().expect("second");
    assert_eq!(promo.redeem(), Err(PromoRejection::Exhausted));
    assert_eq!(promo.redemptions, 2);

    promo.max_redemptions = None;
    promo.redeem().expect("uncapped");
    assert_eq!(promo.redemptions, 3);
}

#[rstest]
#[case(Discount::Percent { percent: 0 })]
#[case(Discount::Percent { percent: 101 })]
#[case(Discount::Fixed { amount: 0 })]
fn promo_draft_rejects_empty_discounts(#[case] discount: Discount) {
    let draft = PromoCodeDraft {
        code: "spring".to_owned(),
        discount,
        max_redemptions: None,
        valid_from: None,
        valid_until: None,
        plan_ids: Vec::new(),
        active: true,
    };
    let err = draft
        .into_promo(Uuid::new_v4(), 0, at(2026, 1, 1))
        .expect_err("invalid discount");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn first_subscription_includes_trial(plan: SubscriptionPlan) {
    let now = at(2026, 1, 31);
    let subscription = extend_subscription(None, &plan, now);
    // Jan 31 plus one month clamps to Feb 28, then seven trial days.
    assert_eq!(subscription.expires_at, at(2026, 3, 7));
}

#[rstest]
fn renewal_extends_from_current_expiry(plan: SubscriptionPlan) {
    let now = at(2026, 3, 1);
    let current = Subscription {
        plan_id: plan.id,
        started_at: at(2026, 2, 1),
        expires_at: at(2026, 3, 10),
    };
    let renewed = extend_subscription(Some(&current), &plan, now);
    assert_eq!(renewed.started_at, current.started_at);
    assert_eq!(renewed.expires_at, at(2026, 4, 10));
}

#[rstest]
fn lapsed_subscription_restarts_without_trial(plan: SubscriptionPlan) {
    let now = at(2026, 5, 1);
    let lapsed = Subscription {
        plan_id: plan.id,
        started_at: at(2026, 1, 1),
        expires_at: at(2026, 2, 1),
    };
    let renewed = extend_subscription(Some(&lapsed), &plan, now);
    assert_eq!(renewed.started_at, now);
    assert_eq!(renewed.expires_at, at(2026, 6, 1));
}

fn settled(plan: &SubscriptionPlan) -> PaymentTransaction {
    let quote = Quote::compute(plan, None, &PaymentSettings::default());
    let mut transaction = PaymentTransaction::pending(&learner(), quote, at(2026, 4, 1));
    transaction
        .confirm(
            "pi_1".to_owned(),
            format_invoice_number("INV", 2026, 1),
            at(2026, 4, 1) + TimeDelta::minutes(2),
        )
        .expect("pending confirms");
    transaction
}

#[rstest]
fn refunds_accumulate_until_full(plan: SubscriptionPlan) {
    let mut transaction = settled(&plan);
    assert_eq!(transaction.apply_refund(999), Ok(false));
    assert_eq!(transaction.status, TransactionStatus::PartiallyRefunded);
    let err = transaction.apply_refund(1001).expect_err("over refund");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(transaction.apply_refund(1000), Ok(true));
    assert_eq!(transaction.status, TransactionStatus::Refunded);
    assert_eq!(transaction.net_revenue(), 0);
}

#[rstest]
fn settled_transactions_cannot_be_confirmed_again(plan: SubscriptionPlan) {
    let mut transaction = settled(&plan);
    let err = transaction
        .confirm("pi_2".to_owned(), "INV-2026-000002".to_owned(), at(2026, 4, 2))
        .expect_err("already settled");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(transaction.invoice_number.as_deref(), Some("INV-2026-000001"));
}

#[rstest]
fn pending_transactions_are_not_refundable_or_invoiced(plan: SubscriptionPlan) {
    let quote = Quote::compute(&plan, None, &PaymentSettings::default());
    let mut transaction = PaymentTransaction::pending(&learner(), quote, at(2026, 4, 1));
    assert_eq!(
        transaction.apply_refund(1).expect_err("pending").code(),
        ErrorCode::Conflict
    );
    assert!(Invoice::from_transaction(&transaction, "Lingo").is_none());
}

#[rstest]
fn invoice_lists_plan_and_discount(plan: SubscriptionPlan, promo: PromoCode) {
    let quote = Quote::compute(&plan, Some(&promo), &PaymentSettings::default());
    let mut transaction = PaymentTransaction::pending(&learner(), quote, at(2026, 4, 1));
    transaction
        .confirm("pi_1".to_owned(), "INV-2026-000007".to_owned(), at(2026, 4, 2))
        .expect("confirm");
    let invoice = Invoice::from_transaction(&transaction, "Lingo").expect("invoice");
    assert_eq!(invoice.number, "INV-2026-000007");
    assert_eq!(invoice.customer_name, "Ada");
    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(invoice.total, 1500);
    assert_eq!(invoice.issued_at, at(2026, 4, 2));
}

#[rstest]
fn settings_update_validates_fields() {
    let update = PaymentSettingsUpdate {
        currency: "eur".to_owned(),
        tax_rate_bps: 2100,
        payments_enabled: false,
        invoice_prefix: "lg".to_owned(),
        company_name: "Lingo GmbH".to_owned(),
    };
    let current = PaymentSettings {
        invoice_sequence: 12,
        ..PaymentSettings::default()
    };
    let updated = update.clone().apply_to(&current).expect("valid update");
    assert_eq!(updated.currency, "EUR");
    assert_eq!(updated.invoice_prefix, "LG");
    assert_eq!(updated.invoice_sequence, 12);

    let err = PaymentSettingsUpdate {
        tax_rate_bps: 10_001,
        ..update
    }
    .apply_to(&current)
    .expect_err("tax too high");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
